//! Per-pixel Gabor patch renderer.

use crate::calibration::Calibration;
use crate::frame::Frame;
use std::f64::consts::TAU;

/// Parameters for one Gabor presentation.
///
/// Contract: `contrast` in `(0, 1]` and `cpd > 0`; callers clamp before
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaborParams {
    /// Grating spatial frequency in cycles per degree.
    pub cpd: f64,
    /// Michelson contrast.
    pub contrast: f64,
    /// Grating orientation in degrees (0 = vertical bars).
    pub orientation_deg: f64,
}

/// Draw a Gaussian-windowed sinusoidal grating centred on the frame.
///
/// Luminance per pixel:
/// `mid + mid * contrast * sin((dx cos t + dy sin t) * cpp) * exp(-r^2 / (2 sigma^2))`
/// with `cpp = 2 pi cpd / pix_per_deg` and `sigma = width / 7`, clamped to
/// `[0, 255]` and written as opaque grey.
pub fn draw_gabor(frame: &mut Frame<'_>, params: &GaborParams, cal: &Calibration) {
    let w = frame.width();
    let h = frame.height();
    let mid = cal.mid_point as f64;
    let cpp = TAU * params.cpd / cal.pix_per_deg();
    let sigma = w as f64 / 7.0;
    let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);
    let (sin_t, cos_t) = params.orientation_deg.to_radians().sin_cos();
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;

    for y in 0..h {
        let dy = y as f64 - cy;
        for x in 0..w {
            let dx = x as f64 - cx;
            let carrier = ((dx * cos_t + dy * sin_t) * cpp).sin();
            let envelope = (-(dx * dx + dy * dy) * inv_two_sigma_sq).exp();
            let lum = mid + mid * params.contrast * carrier * envelope;
            frame.put_luma(x, y, lum.round().clamp(0.0, 255.0) as u8);
        }
    }
}
