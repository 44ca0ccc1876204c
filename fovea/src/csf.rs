//! Truncated log-parabola contrast sensitivity model (Lesmes et al. 2010)
//! and the scalar summaries derived from it.

use serde::{Deserialize, Serialize};
use stimulus::algo::numeric::linspace;

/// log10(2): both the parabola scale constant and the octave-to-decade
/// conversion factor.
const KAPPA: f64 = std::f64::consts::LOG10_2;

/// Smallest spatial frequency fed to the logarithm.
pub const MIN_FREQ_CPD: f64 = 0.05;

/// AULCSF integration band in cycles per degree.
pub const AULCSF_BAND_CPD: (f64, f64) = (0.5, 36.0);

/// Trapezoid panel count for the AULCSF integral.
const AULCSF_PANELS: usize = 500;

/// Frequency band for plotted curves, as log10 cpd.
pub const CURVE_BAND_LOG10: (f64, f64) = (-0.3, 1.7);

/// Sample count for plotted curves.
pub const CURVE_SAMPLES: usize = 120;

/// One point of the 4-parameter CSF model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CsfParams {
    /// Peak log10 sensitivity.
    pub gain: f64,
    /// Peak spatial frequency in cycles per degree.
    pub peak_freq: f64,
    /// Full bandwidth at half maximum, in octaves.
    pub bandwidth: f64,
    /// Low-frequency truncation depth in log10 units.
    pub truncation: f64,
}

/// One sample of a CSF curve prepared for plotting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CsfSample {
    /// Spatial frequency in cycles per degree.
    pub freq: f64,
    /// log10 sensitivity at that frequency.
    pub log_sensitivity: f64,
}

/// log10 sensitivity at `freq` cycles per degree.
///
/// Truncated log-parabola: `gain - kappa * (delta / (beta'/2))^2` with
/// `beta' = log10(2^bandwidth)` and `delta` the log10 distance from the
/// peak. Below the peak the curve is floored at `gain - truncation`.
pub fn log_sensitivity(freq: f64, p: &CsfParams) -> f64 {
    let freq = freq.max(MIN_FREQ_CPD);
    let peak = p.peak_freq.max(MIN_FREQ_CPD);
    let half_width = p.bandwidth * KAPPA / 2.0;
    let delta = freq.log10() - peak.log10();
    let parabola = p.gain - KAPPA * (delta / half_width).powi(2);
    if freq <= peak {
        parabola.max(p.gain - p.truncation)
    } else {
        parabola
    }
}

/// Area under `max(0, logS)` over `log10 f` across [`AULCSF_BAND_CPD`].
///
/// Trapezoidal rule with [`AULCSF_PANELS`] panels: endpoint weight 0.5,
/// interior weight 1. Unitless area, always >= 0.
pub fn aulcsf(p: &CsfParams) -> f64 {
    let lo = AULCSF_BAND_CPD.0.log10();
    let hi = AULCSF_BAND_CPD.1.log10();
    let h = (hi - lo) / AULCSF_PANELS as f64;
    let mut area = 0.0;
    for i in 0..=AULCSF_PANELS {
        let weight = if i == 0 || i == AULCSF_PANELS { 0.5 } else { 1.0 };
        let freq = 10f64.powf(lo + h * i as f64);
        area += weight * log_sensitivity(freq, p).max(0.0);
    }
    area * h
}

/// Log-spaced CSF samples over [`CURVE_BAND_LOG10`] for downstream plotting.
pub fn csf_curve(p: &CsfParams) -> Vec<CsfSample> {
    linspace(CURVE_BAND_LOG10.0, CURVE_BAND_LOG10.1, CURVE_SAMPLES)
        .into_iter()
        .map(|x| {
            let freq = 10f64.powf(x);
            CsfSample {
                freq,
                log_sensitivity: log_sensitivity(freq, p),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_params() -> CsfParams {
        CsfParams {
            gain: 2.0,
            peak_freq: 4.0,
            bandwidth: 1.3,
            truncation: 1.8,
        }
    }

    #[test]
    fn test_peak_value_equals_gain() {
        let p = reference_params();
        assert_relative_eq!(log_sensitivity(4.0, &p), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_monotone_decreasing_above_peak() {
        let p = reference_params();
        let mut prev = log_sensitivity(p.peak_freq, &p);
        for i in 1..200 {
            let freq = p.peak_freq + 0.25 * i as f64;
            let s = log_sensitivity(freq, &p);
            assert!(s <= prev + 1e-12, "not monotone at {freq}");
            prev = s;
        }
    }

    #[test]
    fn test_low_frequency_plateau() {
        let p = reference_params();
        // Far below the peak the parabola is deep underwater; the floor
        // gain - truncation = 0.2 holds instead.
        assert_relative_eq!(log_sensitivity(0.5, &p), 0.2, epsilon = 1e-12);
        assert_relative_eq!(log_sensitivity(0.1, &p), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_frequency_clamped_before_logarithm() {
        let p = reference_params();
        assert_eq!(log_sensitivity(1e-6, &p), log_sensitivity(MIN_FREQ_CPD, &p));
    }

    #[test]
    fn test_aulcsf_regression_value() {
        // Analytic value for the reference parameters: plateau segment
        // 0.2 * 0.42462 plus parabola segment 1.34231.
        let area = aulcsf(&reference_params());
        assert_relative_eq!(area, 1.4272, epsilon = 1e-3);
    }

    #[test]
    fn test_aulcsf_non_negative() {
        let weak = CsfParams {
            gain: 0.5,
            peak_freq: 0.5,
            bandwidth: 0.8,
            truncation: 2.6,
        };
        assert!(aulcsf(&weak) >= 0.0);
        let blind = CsfParams {
            gain: -1.0,
            peak_freq: 4.0,
            bandwidth: 2.0,
            truncation: 0.0,
        };
        assert_eq!(aulcsf(&blind), 0.0);
    }

    #[test]
    fn test_curve_band_and_density() {
        let curve = csf_curve(&reference_params());
        assert!(curve.len() >= 100);
        assert_relative_eq!(curve[0].freq, 10f64.powf(-0.3), epsilon = 1e-9);
        assert_relative_eq!(
            curve.last().unwrap().freq,
            10f64.powf(1.7),
            epsilon = 1e-9
        );
    }
}
