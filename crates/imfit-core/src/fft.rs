//! 2D FFT helpers shared by the [`crate::convolver`] and [`crate::oversampled_region`]
//! modules. Row/column-separable, Rayon-parallel above [`PARALLEL_PIXEL_THRESHOLD`],
//! operating on `f64` throughout since the engine's buffers are never downcast to
//! single precision.

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Forward 2D FFT of a real-valued array, row-then-column.
pub fn fft2d_forward(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v, 0.0));

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        transform_rows_parallel(&mut result, &fft_row, h, w);
        transform_cols_parallel(&mut result, &fft_col, h, w);
    } else {
        transform_rows_sequential(&mut result, &fft_row, h, w);
        transform_cols_sequential(&mut result, &fft_col, h, w);
    }

    result
}

/// Inverse 2D FFT, returning the full complex result unnormalized (caller rescales).
pub fn ifft2d_inverse_complex(data: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        transform_cols_parallel(&mut work, &ifft_col, h, w);
        transform_rows_parallel(&mut work, &ifft_row, h, w);
    } else {
        transform_cols_sequential(&mut work, &ifft_col, h, w);
        transform_rows_sequential(&mut work, &ifft_row, h, w);
    }
    work
}

/// Inverse 2D FFT, returning the real part rescaled by `1/(h*w)`.
pub fn ifft2d_inverse(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let work = ifft2d_inverse_complex(data);
    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

fn transform_rows_parallel(
    arr: &mut Array2<Complex<f64>>,
    plan: &Arc<dyn Fft<f64>>,
    h: usize,
    w: usize,
) {
    let processed: Vec<Vec<Complex<f64>>> = (0..h)
        .into_par_iter()
        .map(|row| {
            let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| arr[[row, c]]).collect();
            plan.process(&mut row_data);
            row_data
        })
        .collect();
    for (row, row_data) in processed.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            arr[[row, col]] = val;
        }
    }
}

fn transform_rows_sequential(
    arr: &mut Array2<Complex<f64>>,
    plan: &Arc<dyn Fft<f64>>,
    h: usize,
    w: usize,
) {
    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| arr[[row, c]]).collect();
        plan.process(&mut row_data);
        for (col, val) in row_data.into_iter().enumerate() {
            arr[[row, col]] = val;
        }
    }
}

fn transform_cols_parallel(
    arr: &mut Array2<Complex<f64>>,
    plan: &Arc<dyn Fft<f64>>,
    h: usize,
    w: usize,
) {
    let processed: Vec<Vec<Complex<f64>>> = (0..w)
        .into_par_iter()
        .map(|col| {
            let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| arr[[r, col]]).collect();
            plan.process(&mut col_data);
            col_data
        })
        .collect();
    for (col, col_data) in processed.into_iter().enumerate() {
        for (row, val) in col_data.into_iter().enumerate() {
            arr[[row, col]] = val;
        }
    }
}

fn transform_cols_sequential(
    arr: &mut Array2<Complex<f64>>,
    plan: &Arc<dyn Fft<f64>>,
    h: usize,
    w: usize,
) {
    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| arr[[r, col]]).collect();
        plan.process(&mut col_data);
        for (row, val) in col_data.into_iter().enumerate() {
            arr[[row, col]] = val;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_ramp() {
        let data = Array2::from_shape_fn((16, 16), |(r, c)| (r * 16 + c) as f64);
        let spectrum = fft2d_forward(&data);
        let recovered = ifft2d_inverse(&spectrum);
        for r in 0..16 {
            for c in 0..16 {
                assert!((recovered[[r, c]] - data[[r, c]]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn roundtrip_large_parallel() {
        let data = Array2::from_shape_fn((300, 300), |(r, c)| ((r + c) % 7) as f64);
        let spectrum = fft2d_forward(&data);
        let recovered = ifft2d_inverse(&spectrum);
        for r in (0..300).step_by(17) {
            for c in (0..300).step_by(13) {
                assert!((recovered[[r, c]] - data[[r, c]]).abs() < 1e-7);
            }
        }
    }
}
