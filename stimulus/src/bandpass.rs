//! Raised-cosine annular bandpass filter in 2D DFT space.
//!
//! Optotype templates are filtered around a centre frequency expressed in
//! cycles per object (the drawn letter spans the raster), with a log2
//! raised-cosine falloff. The DC bin is always nulled, so filtered output
//! is zero-mean by construction.

use crate::fft::{fft2d, FftError};
use std::f64::consts::PI;
use thiserror::Error;

/// Errors from filter construction or application.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Centre frequency must be positive.
    #[error("centre frequency must be positive, got {0} cycles/object")]
    NonPositiveCenter(f64),

    /// Bandwidth must be positive.
    #[error("octave bandwidth must be positive, got {0}")]
    NonPositiveBandwidth(f64),

    #[error(transparent)]
    Fft(#[from] FftError),
}

/// Precomputed annular mask for one `(n, centre, bandwidth)` configuration.
///
/// Construction builds the mask once; `apply` reuses it for every image of
/// the configuration, so filtering a 10-letter template set costs ten FFT
/// pairs and no further setup.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    n: usize,
    center_freq: f64,
    octave_bandwidth: f64,
    mask: Vec<f64>,
}

impl BandpassFilter {
    /// Build the raised-cosine annulus for an `n x n` transform.
    ///
    /// Bin `(u, v)` maps to signed frequencies `fx, fy` (negative above
    /// `n/2`); the mask is `0.5 * (1 + cos(pi * delta / half_bw))` for
    /// `delta = |log2(rho / f_c)| <= half_bw`, zero elsewhere, and zero at
    /// DC.
    pub fn new(n: usize, center_freq: f64, octave_bandwidth: f64) -> Result<Self, FilterError> {
        if !n.is_power_of_two() {
            return Err(FilterError::Fft(FftError::NotPowerOfTwo(n)));
        }
        if !(center_freq > 0.0) {
            return Err(FilterError::NonPositiveCenter(center_freq));
        }
        if !(octave_bandwidth > 0.0) {
            return Err(FilterError::NonPositiveBandwidth(octave_bandwidth));
        }

        let half_bw = octave_bandwidth / 2.0;
        let mut mask = vec![0.0; n * n];
        for v in 0..n {
            let fy = signed_bin_freq(v, n);
            for u in 0..n {
                let fx = signed_bin_freq(u, n);
                let rho = (fx * fx + fy * fy).sqrt();
                if rho == 0.0 {
                    continue; // DC removed
                }
                let delta = (rho / center_freq).log2().abs();
                if delta <= half_bw {
                    mask[v * n + u] = 0.5 * (1.0 + (PI * delta / half_bw).cos());
                }
            }
        }

        Ok(Self {
            n,
            center_freq,
            octave_bandwidth,
            mask,
        })
    }

    /// Transform size per axis.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Centre frequency in cycles per object.
    pub fn center_freq(&self) -> f64 {
        self.center_freq
    }

    /// Bandwidth in octaves.
    pub fn octave_bandwidth(&self) -> f64 {
        self.octave_bandwidth
    }

    /// Filter a signed image in place and peak-normalize.
    ///
    /// Forward FFT, bin-wise multiply of both parts by the mask, inverse
    /// FFT, then division of the real part by `max |re|` when positive so
    /// the result lies in `[-1, 1]`. The imaginary part carries only FFT
    /// round-off after filtering and is left for the caller to discard.
    pub fn apply(&self, re: &mut [f64], im: &mut [f64]) -> Result<(), FilterError> {
        fft2d(re, im, self.n, false)?;
        for (i, &m) in self.mask.iter().enumerate() {
            re[i] *= m;
            im[i] *= m;
        }
        fft2d(re, im, self.n, true)?;

        // Below this peak the pass band carried no signal, only transform
        // round-off; normalizing would amplify noise to full scale.
        const PEAK_EPS: f64 = 1e-12;
        let peak = re.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        if peak > PEAK_EPS {
            for v in re.iter_mut() {
                *v /= peak;
            }
        }
        Ok(())
    }
}

/// Signed DFT bin frequency: bins above `n/2` alias to negative frequencies.
fn signed_bin_freq(bin: usize, n: usize) -> f64 {
    if bin <= n / 2 {
        bin as f64
    } else {
        bin as f64 - n as f64
    }
}
