//! Display calibration shared by all renderers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a calibration record fails validation.
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// Pixel pitch must be a positive density.
    #[error("pixel density must be positive, got {0} px/mm")]
    NonPositivePixelDensity(f64),

    /// Viewing distance outside the supported range.
    #[error("viewing distance {0:.0} mm outside supported range [{min:.0}, {max:.0}] mm",
        min = Calibration::MIN_DIST_MM, max = Calibration::MAX_DIST_MM)]
    DistanceOutOfRange(f64),
}

/// Screen calibration for one measurement session.
///
/// Produced by the external calibration flow (gamma, ruler, distance) and
/// treated as immutable for the lifetime of a session. All renderers take it
/// by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Physical pixel density of the display in pixels per millimetre.
    pub px_per_mm: f64,
    /// Observer viewing distance in millimetres.
    pub dist_mm: f64,
    /// Gamma-corrected mid-grey level of the display.
    pub mid_point: u8,
    /// Whether the display is viewed through a mirror; renderers pre-flip
    /// horizontally so the observer sees stimuli with correct chirality.
    pub mirror: bool,
}

impl Calibration {
    /// Closest supported viewing distance.
    pub const MIN_DIST_MM: f64 = 200.0;
    /// Farthest supported viewing distance.
    pub const MAX_DIST_MM: f64 = 30_000.0;

    /// Validate and construct a calibration record.
    pub fn new(
        px_per_mm: f64,
        dist_mm: f64,
        mid_point: u8,
        mirror: bool,
    ) -> Result<Self, CalibrationError> {
        if !(px_per_mm > 0.0) {
            return Err(CalibrationError::NonPositivePixelDensity(px_per_mm));
        }
        if !(Self::MIN_DIST_MM..=Self::MAX_DIST_MM).contains(&dist_mm) {
            return Err(CalibrationError::DistanceOutOfRange(dist_mm));
        }
        Ok(Self {
            px_per_mm,
            dist_mm,
            mid_point,
            mirror,
        })
    }

    /// Pixels subtended by one degree of visual angle at the calibrated
    /// distance: `dist_mm * tan(1 deg) * px_per_mm`.
    pub fn pix_per_deg(&self) -> f64 {
        self.dist_mm * 1f64.to_radians().tan() * self.px_per_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pix_per_deg() {
        let cal = Calibration::new(5.0, 1000.0, 128, false).unwrap();
        // 1000 * tan(1 deg) * 5 = 87.27 px/deg
        assert_relative_eq!(cal.pix_per_deg(), 87.27, epsilon = 0.01);
    }

    #[test]
    fn test_rejects_bad_pixel_density() {
        assert!(matches!(
            Calibration::new(0.0, 1000.0, 128, false),
            Err(CalibrationError::NonPositivePixelDensity(_))
        ));
        assert!(matches!(
            Calibration::new(-3.0, 1000.0, 128, false),
            Err(CalibrationError::NonPositivePixelDensity(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_distance() {
        assert!(matches!(
            Calibration::new(5.0, 150.0, 128, false),
            Err(CalibrationError::DistanceOutOfRange(_))
        ));
        assert!(matches!(
            Calibration::new(5.0, 40_000.0, 128, false),
            Err(CalibrationError::DistanceOutOfRange(_))
        ));
        assert!(Calibration::new(5.0, 200.0, 128, false).is_ok());
        assert!(Calibration::new(5.0, 30_000.0, 128, false).is_ok());
    }
}
