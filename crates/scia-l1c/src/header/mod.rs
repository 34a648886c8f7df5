//! ASCII product header parsing.
//!
//! The Main Product Header, the Specific Product Header and each Dataset
//! Descriptor are fixed-width ASCII blocks of `KEY=VALUE` lines. Text
//! values are quoted and padded, numeric values are signed, zero-padded
//! and may carry a `<unit>` suffix. ASCII is never byte-swapped.
//!
//! [`HeaderBlock`] keeps every line (including padding) in order so that
//! encoding a decoded block reproduces it exactly.

pub mod dsd;
pub mod mph;
pub mod sph;

pub use dsd::{parse_descriptor_table, DatasetDescriptor, DescriptorKind};
pub use mph::{MainProductHeader, MPH_SIZE, PRODUCT_SIGNATURE};
pub use sph::SpecificProductHeader;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_until, take_while1},
    character::complete::{char, digit1, one_of, space0},
    combinator::{all_consuming, map, opt, recognize},
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::error::{L1cError, L1cResult};

/// Value of a header entry.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Quoted text, padding preserved.
    Text(String),
    /// Signed number as written, with optional unit.
    Number { digits: String, unit: Option<String> },
    /// Anything else (single-letter flags and the like).
    Raw(String),
}

impl HeaderValue {
    fn encode(&self) -> String {
        match self {
            HeaderValue::Text(s) => format!("\"{}\"", s),
            HeaderValue::Number { digits, unit: Some(u) } => format!("{}<{}>", digits, u),
            HeaderValue::Number { digits, unit: None } => digits.clone(),
            HeaderValue::Raw(s) => s.clone(),
        }
    }
}

/// One `KEY=VALUE` line.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: HeaderValue,
    /// Whitespace after the value, kept for exact re-encoding.
    pub trailing: String,
}

#[derive(Debug, Clone, PartialEq)]
enum HeaderLine {
    Entry(HeaderEntry),
    /// Blank padding line of the given width.
    Blank(usize),
}

/// Ordered set of header lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderBlock {
    lines: Vec<HeaderLine>,
}

fn key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')(input)
}

fn quoted(input: &str) -> IResult<&str, HeaderValue> {
    map(delimited(char('"'), take_until("\""), char('"')), |s: &str| {
        HeaderValue::Text(s.to_string())
    })(input)
}

fn number(input: &str) -> IResult<&str, HeaderValue> {
    let digits = recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), opt(digit1))),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )));
    let unit = delimited(char('<'), take_until(">"), char('>'));
    map(pair(digits, opt(unit)), |(d, u): (&str, Option<&str>)| {
        HeaderValue::Number {
            digits: d.to_string(),
            unit: u.map(str::to_string),
        }
    })(input)
}

fn raw(input: &str) -> IResult<&str, HeaderValue> {
    map(take_till(|c: char| c == ' '), |s: &str| HeaderValue::Raw(s.to_string()))(input)
}

fn entry(input: &str) -> IResult<&str, HeaderEntry> {
    let (input, (k, _, value, trailing)) = all_consuming(tuple((
        key,
        tag("="),
        alt((quoted, number, raw)),
        space0,
    )))(input)?;
    Ok((
        input,
        HeaderEntry {
            key: k.to_string(),
            value,
            trailing: trailing.to_string(),
        },
    ))
}

impl HeaderBlock {
    /// Decode a block of `\n`-terminated lines.
    pub fn parse(text: &[u8], section: &'static str) -> L1cResult<Self> {
        let text = std::str::from_utf8(text)
            .map_err(|e| L1cError::header(section, format!("not ASCII: {}", e)))?;
        let body = text.strip_suffix('\n').unwrap_or(text);

        let mut lines = Vec::new();
        for (n, line) in body.split('\n').enumerate() {
            let line = line.trim_end_matches('\0');
            if line.trim().is_empty() {
                lines.push(HeaderLine::Blank(line.len()));
                continue;
            }
            let (_, e) = entry(line).map_err(|_| {
                L1cError::header(section, format!("line {}: cannot parse {:?}", n + 1, line))
            })?;
            lines.push(HeaderLine::Entry(e));
        }
        Ok(Self { lines })
    }

    /// Encode back to `\n`-terminated lines, space-padded to `width` bytes
    /// when given.
    pub fn encode(&self, width: Option<usize>) -> Vec<u8> {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                HeaderLine::Entry(e) => {
                    out.push_str(&e.key);
                    out.push('=');
                    out.push_str(&e.value.encode());
                    out.push_str(&e.trailing);
                }
                HeaderLine::Blank(n) => out.extend(std::iter::repeat(' ').take(*n)),
            }
            out.push('\n');
        }
        let mut bytes = out.into_bytes();
        if let Some(w) = width {
            if bytes.len() < w {
                // pad inside a final blank line so the block stays line-structured
                bytes.pop();
                bytes.resize(w - 1, b' ');
                bytes.push(b'\n');
            }
        }
        bytes
    }

    /// Append an entry.
    pub fn push(&mut self, key: &str, value: HeaderValue) {
        self.lines.push(HeaderLine::Entry(HeaderEntry {
            key: key.to_string(),
            value,
            trailing: String::new(),
        }));
    }

    pub fn entries(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.lines.iter().filter_map(|l| match l {
            HeaderLine::Entry(e) => Some(e),
            HeaderLine::Blank(_) => None,
        })
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.entries().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Text or raw value, trimmed.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            HeaderValue::Text(s) | HeaderValue::Raw(s) => Some(s.trim().to_string()),
            HeaderValue::Number { digits, .. } => Some(digits.clone()),
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            HeaderValue::Number { digits, .. } => digits.parse().ok(),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            HeaderValue::Number { digits, .. } => digits.parse().ok(),
            _ => None,
        }
    }

    /// Integer value that must be present.
    pub fn require_int(&self, key: &str, section: &'static str) -> L1cResult<i64> {
        self.int(key)
            .ok_or_else(|| L1cError::header(section, format!("missing numeric field {}", key)))
    }
}
