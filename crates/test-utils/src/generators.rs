//! Test data generators for synthetic spectra and geolocation.
//!
//! These generators create predictable, verifiable patterns so that a
//! co-added readout can be checked against a closed-form value.

/// Number of detector pixels in a Level-1C wavelength grid.
pub const GRID_PIXELS: usize = 8192;

/// Creates an ascending wavelength grid over all eight channels.
///
/// Pixel `p` has wavelength `start + p * step`.
///
/// # Example
///
/// ```
/// use test_utils::linear_wavelength_grid;
///
/// let grid = linear_wavelength_grid(200.0, 0.25);
/// assert_eq!(grid.len(), 8192);
/// assert_eq!(grid[4], 201.0);
/// ```
pub fn linear_wavelength_grid(start: f32, step: f32) -> Vec<f32> {
    (0..GRID_PIXELS).map(|p| start + p as f32 * step).collect()
}

/// Creates a signal block with predictable values.
///
/// Value of readout `obs`, pixel `pix` is `obs * 1000 + pix`, laid out
/// readout-major like a cluster record.
///
/// # Example
///
/// ```
/// use test_utils::ramp_signal;
///
/// let signal = ramp_signal(3, 4);
/// assert_eq!(signal.len(), 12);
/// assert_eq!(signal[5], 1001.0); // obs=1, pix=1
/// ```
pub fn ramp_signal(num_obs: usize, num_pixels: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(num_obs * num_pixels);
    for obs in 0..num_obs {
        for pix in 0..num_pixels {
            data.push((obs * 1000 + pix) as f32);
        }
    }
    data
}

/// Creates a constant block, e.g. for signal errors.
pub fn constant_signal(num_obs: usize, num_pixels: usize, value: f32) -> Vec<f32> {
    vec![value; num_obs * num_pixels]
}

/// Sub-satellite track in micro-degrees: readout `i` sits at
/// `(lat0 + i * dlat, lon0 + i * dlon)`, longitudes wrapped to ±180°.
pub fn ground_track(count: usize, lat0: i32, lon0: i32, dlat: i32, dlon: i32) -> Vec<(i32, i32)> {
    (0..count)
        .map(|i| {
            let lat = lat0 as i64 + i as i64 * dlat as i64;
            let mut lon = lon0 as i64 + i as i64 * dlon as i64;
            while lon > 180_000_000 {
                lon -= 360_000_000;
            }
            while lon < -180_000_000 {
                lon += 360_000_000;
            }
            (lat as i32, lon as i32)
        })
        .collect()
}
