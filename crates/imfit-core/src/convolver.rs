//! C2: FFT-based 2D convolution of a padded image with a fixed PSF.

use ndarray::Array2;
use num_complex::Complex;

use crate::error::{Error, Result};
use crate::fft::{fft2d_forward, ifft2d_inverse_complex};

/// Holds a persistent forward-FFT of a PSF, set up once for a fixed padded
/// working size. `convolve` is infallible after `new` succeeds (§4.2).
#[derive(Debug)]
pub struct Convolver {
    n_rows_pad: usize,
    n_cols_pad: usize,
    psf_transform: Array2<Complex<f64>>,
}

impl Convolver {
    /// Attach `psf` (renormalized to unit sum) and build its persistent
    /// forward transform over a `n_rows_pad x n_cols_pad` working grid.
    pub fn new(psf: &Array2<f64>, n_rows_pad: usize, n_cols_pad: usize) -> Result<Self> {
        let (ph, pw) = psf.dim();
        if ph == 0 || pw == 0 || ph > n_rows_pad || pw > n_cols_pad {
            return Err(Error::FftSetup(n_rows_pad, n_cols_pad));
        }

        let sum: f64 = psf.iter().sum();
        if !sum.is_finite() || sum == 0.0 {
            return Err(Error::FftSetup(n_rows_pad, n_cols_pad));
        }
        let norm = 1.0 / sum;

        let wrapped = wrap_psf_into_padded(psf, norm, n_rows_pad, n_cols_pad);
        let psf_transform = fft2d_forward(&wrapped);

        Ok(Convolver {
            n_rows_pad,
            n_cols_pad,
            psf_transform,
        })
    }

    pub fn padded_rows(&self) -> usize {
        self.n_rows_pad
    }

    pub fn padded_cols(&self) -> usize {
        self.n_cols_pad
    }

    /// Forward-FFT `image` in place, multiply by the PSF transform,
    /// inverse-FFT, rescale, and write the real part back.
    pub fn convolve(&self, image: &mut Array2<f64>) -> Result<()> {
        let (h, w) = image.dim();
        if h != self.n_rows_pad || w != self.n_cols_pad {
            return Err(Error::InvalidDimensions {
                width: w,
                height: h,
            });
        }

        let image_transform = fft2d_forward(image);
        let product = &image_transform * &self.psf_transform;
        let spatial = ifft2d_inverse_complex(&product);
        let scale = 1.0 / (h * w) as f64;

        for ((r, c), v) in image.indexed_iter_mut() {
            *v = spatial[[r, c]].re * scale;
        }
        Ok(())
    }

}

/// Embed `psf` (already scaled by `norm`) into a zero `n_rows_pad x
/// n_cols_pad` buffer such that the PSF's center lands at index `(0,0)` of
/// the padded buffer, wrapping around each edge — the "periodic with the
/// pad" convention of §4.2.
fn wrap_psf_into_padded(
    psf: &Array2<f64>,
    norm: f64,
    n_rows_pad: usize,
    n_cols_pad: usize,
) -> Array2<f64> {
    let (ph, pw) = psf.dim();
    let cy = ph / 2;
    let cx = pw / 2;

    let mut out = Array2::<f64>::zeros((n_rows_pad, n_cols_pad));
    for i in 0..ph {
        let wrapped_row = ((i as isize - cy as isize).rem_euclid(n_rows_pad as isize)) as usize;
        for j in 0..pw {
            let wrapped_col = ((j as isize - cx as isize).rem_euclid(n_cols_pad as isize)) as usize;
            out[[wrapped_row, wrapped_col]] = psf[[i, j]] * norm;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_psf(size: usize) -> Array2<f64> {
        let mut psf = Array2::<f64>::zeros((size, size));
        psf[[size / 2, size / 2]] = 1.0;
        psf
    }

    #[test]
    fn identity_psf_leaves_image_unchanged() {
        let psf = delta_psf(3);
        let conv = Convolver::new(&psf, 9, 9).unwrap();
        let mut image = Array2::from_shape_fn((9, 9), |(r, c)| (r * 9 + c) as f64);
        let original = image.clone();
        conv.convolve(&mut image).unwrap();
        for r in 0..9 {
            for c in 0..9 {
                assert!((image[[r, c]] - original[[r, c]]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn unit_sum_psf_preserves_constant_image() {
        let mut psf = Array2::<f64>::zeros((5, 5));
        psf.fill(1.0 / 25.0);
        let conv = Convolver::new(&psf, 16, 16).unwrap();
        let mut image = Array2::<f64>::from_elem((16, 16), 7.0);
        conv.convolve(&mut image).unwrap();
        for r in 3..13 {
            for c in 3..13 {
                let rel_err = (image[[r, c]] - 7.0).abs() / 7.0;
                assert!(rel_err < 1e-9, "rel_err={rel_err} at ({r},{c})");
            }
        }
    }

    #[test]
    fn mismatched_padded_size_is_rejected() {
        let psf = delta_psf(3);
        let conv = Convolver::new(&psf, 9, 9).unwrap();
        let mut wrong = Array2::<f64>::zeros((8, 8));
        assert!(conv.convolve(&mut wrong).is_err());
    }
}
