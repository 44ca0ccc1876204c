//! In-place 2D radix-2 FFT backing the template bandpass filter.
//!
//! Works on a pair of `f64` slices (real and imaginary parts) of length
//! `n * n` with `n` a power of two. The forward transform leaves raw DFT
//! coefficients; the inverse divides by `n` per axis so that forward
//! followed by inverse reproduces the input.

use std::f64::consts::TAU;
use thiserror::Error;

/// Errors from the 2D FFT entry point.
#[derive(Error, Debug)]
pub enum FftError {
    /// Transform size must be a power of two for the radix-2 kernel.
    #[error("transform size {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// A buffer does not hold `n * n` samples.
    #[error("{name} buffer holds {actual} samples, expected {expected} ({n}x{n})")]
    BadLength {
        /// Which buffer was mis-sized.
        name: &'static str,
        /// Transform size per axis.
        n: usize,
        /// Required sample count.
        expected: usize,
        /// Provided sample count.
        actual: usize,
    },
}

/// 1D radix-2 decimation-in-time FFT on a contiguous complex buffer.
///
/// Bit-reversal permutation followed by butterfly stages with twiddle
/// factors `exp(-2*pi*i/len)` (sign flipped when `invert`). The inverse
/// pass divides by the length. Length must be a power of two.
fn fft_1d(re: &mut [f64], im: &mut [f64], invert: bool) {
    let n = re.len();
    if n < 2 {
        return;
    }

    // Bit-reversal permutation.
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    // Butterfly stages.
    let mut len = 2;
    while len <= n {
        let ang = TAU / len as f64 * if invert { 1.0 } else { -1.0 };
        let (w_im, w_re) = ang.sin_cos();
        let mut start = 0;
        while start < n {
            let mut cur_re = 1.0;
            let mut cur_im = 0.0;
            for k in 0..len / 2 {
                let a = start + k;
                let b = a + len / 2;
                let t_re = re[b] * cur_re - im[b] * cur_im;
                let t_im = re[b] * cur_im + im[b] * cur_re;
                re[b] = re[a] - t_re;
                im[b] = im[a] - t_im;
                re[a] += t_re;
                im[a] += t_im;
                let next_re = cur_re * w_re - cur_im * w_im;
                cur_im = cur_re * w_im + cur_im * w_re;
                cur_re = next_re;
            }
            start += len;
        }
        len <<= 1;
    }

    if invert {
        let scale = 1.0 / n as f64;
        for v in re.iter_mut() {
            *v *= scale;
        }
        for v in im.iter_mut() {
            *v *= scale;
        }
    }
}

/// In-place 2D FFT over an `n x n` complex image stored row-major.
///
/// Transforms each row, then each column. The only per-call allocation is
/// one pair of length-`n` scratch buffers for the column pass. With
/// `invert` both axes divide by `n`, so the 2D inverse divides by `n^2`
/// overall.
pub fn fft2d(re: &mut [f64], im: &mut [f64], n: usize, invert: bool) -> Result<(), FftError> {
    if !n.is_power_of_two() {
        return Err(FftError::NotPowerOfTwo(n));
    }
    let expected = n * n;
    if re.len() != expected {
        return Err(FftError::BadLength {
            name: "real",
            n,
            expected,
            actual: re.len(),
        });
    }
    if im.len() != expected {
        return Err(FftError::BadLength {
            name: "imaginary",
            n,
            expected,
            actual: im.len(),
        });
    }

    for row in 0..n {
        let s = row * n;
        fft_1d(&mut re[s..s + n], &mut im[s..s + n], invert);
    }

    let mut col_re = vec![0.0; n];
    let mut col_im = vec![0.0; n];
    for col in 0..n {
        for row in 0..n {
            col_re[row] = re[row * n + col];
            col_im[row] = im[row * n + col];
        }
        fft_1d(&mut col_re, &mut col_im, invert);
        for row in 0..n {
            re[row * n + col] = col_re[row];
            im[row * n + col] = col_im[row];
        }
    }

    Ok(())
}
