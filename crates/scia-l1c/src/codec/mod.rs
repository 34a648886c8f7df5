//! Big-endian binary record codec.
//!
//! Every binary aggregate in a Level-1C product is described by a
//! declarative [`Layout`]: an ordered table of fields with their byte
//! offset, scalar kind and element count. One generic routine walks the
//! table and brings each multi-byte element into host byte order; typed
//! decoders then read fields by name through a [`NativeView`]. Nothing
//! relies on the in-memory layout or padding of Rust structs.
//!
//! Variable-length scalar arrays (pixel ids, signals, ...) go through
//! [`decode_array`], which applies the same per-element swap.

pub mod layouts;

use std::io::Read;

use crate::error::{L1cError, L1cResult};
use crate::time::Mjd;

/// Scalar kind of a declared field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    F32,
    F64,
    /// Single-byte ASCII characters, never swapped.
    Ascii,
    /// A nested aggregate with its own field table.
    Nested(&'static Layout),
}

impl FieldKind {
    /// Width in bytes of one element.
    pub const fn width(&self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 | FieldKind::Ascii => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 | FieldKind::F32 => 4,
            FieldKind::U64 | FieldKind::F64 => 8,
            FieldKind::Nested(layout) => layout.size,
        }
    }
}

/// One entry of a field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
    pub count: usize,
}

impl FieldSpec {
    /// Total bytes occupied by the field.
    pub const fn size(&self) -> usize {
        self.kind.width() * self.count
    }
}

/// Scalar field.
pub const fn field(name: &'static str, offset: usize, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        kind,
        count: 1,
    }
}

/// Fixed-length array field.
pub const fn array(name: &'static str, offset: usize, kind: FieldKind, count: usize) -> FieldSpec {
    FieldSpec {
        name,
        offset,
        kind,
        count,
    }
}

/// Declared layout of a fixed-size big-endian aggregate.
#[derive(Debug)]
pub struct Layout {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [FieldSpec],
}

impl Layout {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check that fields are ordered, in bounds, non-overlapping and cover
    /// the whole aggregate.
    pub fn validate(&self) -> Result<(), String> {
        let mut expected_offset = 0;
        for f in self.fields {
            if f.offset != expected_offset {
                return Err(format!(
                    "{}.{}: offset {} but previous field ends at {}",
                    self.name, f.name, f.offset, expected_offset
                ));
            }
            if let FieldKind::Nested(inner) = f.kind {
                inner.validate()?;
            }
            expected_offset = f.offset + f.size();
        }
        if expected_offset != self.size {
            return Err(format!(
                "{}: fields cover {} bytes, declared size {}",
                self.name, expected_offset, self.size
            ));
        }
        Ok(())
    }

    /// Convert a raw big-endian record to host byte order in place.
    ///
    /// Fails without touching the buffer when it is shorter than the
    /// declared size.
    pub fn to_native(&self, raw: &mut [u8]) -> L1cResult<()> {
        if raw.len() < self.size {
            return Err(L1cError::TruncatedRecord {
                aggregate: self.name,
                expected: self.size,
                available: raw.len(),
            });
        }
        if cfg!(target_endian = "little") {
            swap_fields(self, &mut raw[..self.size]);
        }
        Ok(())
    }

    /// Decode a raw big-endian record into a host-order view.
    pub fn decode<'a>(&'static self, raw: &'a mut [u8]) -> L1cResult<NativeView<'a>> {
        self.to_native(raw)?;
        Ok(NativeView {
            layout: self,
            bytes: &raw[..self.size],
        })
    }

    /// Read exactly one record from `reader` and decode it.
    pub fn read(&'static self, reader: &mut impl Read) -> L1cResult<Vec<u8>> {
        let mut buf = read_exact_or_truncated(reader, self.size, self.name)?;
        self.to_native(&mut buf)?;
        Ok(buf)
    }
}

fn swap_fields(layout: &Layout, raw: &mut [u8]) {
    for f in layout.fields {
        let width = f.kind.width();
        for i in 0..f.count {
            let at = f.offset + i * width;
            match f.kind {
                FieldKind::Nested(inner) => swap_fields(inner, &mut raw[at..at + width]),
                FieldKind::U8 | FieldKind::I8 | FieldKind::Ascii => {}
                _ => raw[at..at + width].reverse(),
            }
        }
    }
}

/// Read `len` bytes, reporting a short read as [`L1cError::TruncatedRecord`].
pub fn read_exact_or_truncated(
    reader: &mut impl Read,
    len: usize,
    aggregate: &'static str,
) -> L1cResult<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(L1cError::TruncatedRecord {
                    aggregate,
                    expected: len,
                    available: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(buf)
}

/// Host-order view over a decoded record.
#[derive(Debug, Clone, Copy)]
pub struct NativeView<'a> {
    layout: &'static Layout,
    bytes: &'a [u8],
}

impl<'a> NativeView<'a> {
    /// Wrap a buffer that has already been converted with [`Layout::to_native`].
    pub fn over(layout: &'static Layout, bytes: &'a [u8]) -> L1cResult<Self> {
        if bytes.len() < layout.size {
            return Err(L1cError::TruncatedRecord {
                aggregate: layout.name,
                expected: layout.size,
                available: bytes.len(),
            });
        }
        Ok(Self {
            layout,
            bytes: &bytes[..layout.size],
        })
    }

    fn locate(&self, name: &str, index: usize) -> (usize, &'static FieldSpec) {
        let Some(spec) = self.layout.fields.iter().find(|f| f.name == name) else {
            unreachable!("field {} is not declared in layout {}", name, self.layout.name)
        };
        debug_assert!(index < spec.count, "{}.{}[{}] out of range", self.layout.name, name, index);
        (spec.offset + index * spec.kind.width(), spec)
    }

    fn scalar<const N: usize>(&self, name: &str, index: usize) -> [u8; N] {
        let (at, _) = self.locate(name, index);
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[at..at + N]);
        out
    }

    pub fn u8(&self, name: &str) -> u8 {
        self.u8_at(name, 0)
    }

    pub fn u8_at(&self, name: &str, index: usize) -> u8 {
        let (at, _) = self.locate(name, index);
        self.bytes[at]
    }

    pub fn i8(&self, name: &str) -> i8 {
        self.u8(name) as i8
    }

    pub fn u16(&self, name: &str) -> u16 {
        self.u16_at(name, 0)
    }

    pub fn u16_at(&self, name: &str, index: usize) -> u16 {
        u16::from_ne_bytes(self.scalar(name, index))
    }

    pub fn i16(&self, name: &str) -> i16 {
        i16::from_ne_bytes(self.scalar(name, 0))
    }

    pub fn u32(&self, name: &str) -> u32 {
        u32::from_ne_bytes(self.scalar(name, 0))
    }

    pub fn i32(&self, name: &str) -> i32 {
        i32::from_ne_bytes(self.scalar(name, 0))
    }

    pub fn u64(&self, name: &str) -> u64 {
        u64::from_ne_bytes(self.scalar(name, 0))
    }

    pub fn f32(&self, name: &str) -> f32 {
        self.f32_at(name, 0)
    }

    pub fn f32_at(&self, name: &str, index: usize) -> f32 {
        f32::from_ne_bytes(self.scalar(name, index))
    }

    pub fn f64(&self, name: &str) -> f64 {
        f64::from_ne_bytes(self.scalar(name, 0))
    }

    /// All elements of an `f32` array field.
    pub fn f32_array<const N: usize>(&self, name: &str) -> [f32; N] {
        std::array::from_fn(|i| self.f32_at(name, i))
    }

    /// Every element of a variable-count `f32` array field.
    pub fn f32_vec(&self, name: &str) -> Vec<f32> {
        let (_, spec) = self.locate(name, 0);
        (0..spec.count).map(|i| self.f32_at(name, i)).collect()
    }

    /// ASCII field with trailing blanks and NULs removed.
    pub fn ascii(&self, name: &str) -> String {
        let (at, spec) = self.locate(name, 0);
        String::from_utf8_lossy(&self.bytes[at..at + spec.size()])
            .trim_end_matches(['\0', ' '])
            .to_string()
    }

    /// Nested MJD timestamp field.
    pub fn mjd(&self, name: &str) -> Mjd {
        let t = self.nested(name, 0);
        Mjd::new(t.i32("days"), t.u32("seconds"), t.u32("microseconds"))
    }

    /// View of the `index`-th element of a nested aggregate field.
    pub fn nested(&self, name: &str, index: usize) -> NativeView<'a> {
        let (at, spec) = self.locate(name, index);
        let FieldKind::Nested(inner) = spec.kind else {
            unreachable!("field {}.{} is not a nested aggregate", self.layout.name, name)
        };
        NativeView {
            layout: inner,
            bytes: &self.bytes[at..at + inner.size],
        }
    }
}

/// Scalar element of a variable-length big-endian array.
pub trait Scalar: Copy {
    const WIDTH: usize;
    fn from_ne(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            fn from_ne(bytes: &[u8]) -> Self {
                let mut b = [0u8; std::mem::size_of::<$t>()];
                b.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_ne_bytes(b)
            }
        }
    )*};
}

impl_scalar!(u16, i16, u32, i32, u64, f32, f64);

/// Decode `count` big-endian scalars from the start of `raw`, swapping in place.
pub fn decode_array<T: Scalar>(raw: &mut [u8], count: usize, name: &'static str) -> L1cResult<Vec<T>> {
    let needed = count * T::WIDTH;
    if raw.len() < needed {
        return Err(L1cError::TruncatedRecord {
            aggregate: name,
            expected: needed,
            available: raw.len(),
        });
    }
    if cfg!(target_endian = "little") {
        for chunk in raw[..needed].chunks_exact_mut(T::WIDTH) {
            chunk.reverse();
        }
    }
    Ok(raw[..needed].chunks_exact(T::WIDTH).map(T::from_ne).collect())
}
