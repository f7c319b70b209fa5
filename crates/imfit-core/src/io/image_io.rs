//! PNG/TIFF visualization I/O for data/model/residual grids, for cases where
//! the caller doesn't want the raw format of [`crate::io::raw`]. Grids are
//! linearly rescaled into the target bit depth at save time; `load_image`
//! reports pixel values as raw 16-bit counts, unscaled.

use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::Result;

fn min_max(data: &Array2<f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in data.iter() {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !(lo.is_finite() && hi.is_finite()) || lo == hi {
        (0.0, 1.0)
    } else {
        (lo, hi)
    }
}

/// Save a grid as 16-bit grayscale TIFF, linearly rescaled to its own min/max.
pub fn save_tiff(data: &Array2<f64>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let (lo, hi) = min_max(data);
    let scale = 65535.0 / (hi - lo);

    let mut pixels: Vec<u16> = Vec::with_capacity(h * w);
    for row in 0..h {
        for col in 0..w {
            let v = data[[row, col]];
            let scaled = if v.is_finite() { (v - lo) * scale } else { 0.0 };
            pixels.push(scaled.clamp(0.0, 65535.0) as u16);
        }
    }

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .expect("buffer size matches dimensions");
    img.save(path)?;
    Ok(())
}

/// Save a grid as 8-bit grayscale PNG, linearly rescaled to its own min/max.
pub fn save_png(data: &Array2<f64>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let (lo, hi) = min_max(data);
    let scale = 255.0 / (hi - lo);

    let mut img = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let v = data[[row, col]];
            let scaled = if v.is_finite() { (v - lo) * scale } else { 0.0 };
            img.put_pixel(col as u32, row as u32, Luma([scaled.clamp(0.0, 255.0) as u8]));
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a grid, choosing format from the file extension (TIFF if unrecognized).
pub fn save_image(data: &Array2<f64>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(data, path),
        _ => save_tiff(data, path),
    }
}

/// Load a grayscale image file as raw 16-bit counts (no normalization).
pub fn load_image(path: &Path) -> Result<Array2<f64>> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f64>::zeros((h as usize, w as usize));

    for row in 0..h as usize {
        for col in 0..w as usize {
            data[[row, col]] = gray.get_pixel(col as u32, row as u32).0[0] as f64;
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip_preserves_relative_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let data = Array2::from_shape_fn((8, 8), |(r, c)| (r * 8 + c) as f64);
        save_png(&data, &path).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.dim(), (8, 8));
        assert!(loaded[[7, 7]] > loaded[[0, 0]]);
    }

    #[test]
    fn constant_grid_does_not_divide_by_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.tiff");
        let data = Array2::from_elem((4, 4), 7.0);
        save_tiff(&data, &path).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.dim(), (4, 4));
    }
}
