//! Scalar metrics derived from a binary mask: area conversion and severity
//! banding.

use std::fmt;

use serde::Serialize;

use crate::errors::{Result, SpillError};

/// Ground area covered by one pixel of the resized model input, in m².
///
/// Only holds for the imaging resolution the bundled model was trained on
/// (10 m × 10 m per pixel after resizing to the model input). It is not
/// derived from image metadata.
pub const DEFAULT_PIXEL_GROUND_AREA_M2: f64 = 100.0;

pub const DEFAULT_THRESHOLD: f32 = 0.05;

const M2_PER_KM2: f64 = 1_000_000.0;

/// Decision threshold applied to the probability map, validated to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Threshold(f32);

impl Threshold {
    pub fn new(value: f32) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SpillError::InvalidThreshold { value })
        }
    }

    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityTier {
    Clear,
    Moderate,
    High,
    Critical,
}

impl SeverityTier {
    /// Operator-facing banner for this tier.
    pub const fn banner(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL SEVERITY: Large scale cleanup required.",
            Self::High => "HIGH SEVERITY: Containment booms advised.",
            Self::Moderate => "MODERATE SEVERITY: Minor leakage detected.",
            Self::Clear => "NO SPILL DETECTED: Area is clear.",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "CLEAR",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Area breakpoints (km²) for severity banding.
///
/// Both bounds are exclusive: an area exactly equal to a breakpoint falls in
/// the lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeverityPolicy {
    pub high_above_km2: f64,
    pub critical_above_km2: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            high_above_km2: 0.1,
            critical_above_km2: 1.0,
        }
    }
}

impl SeverityPolicy {
    pub fn validate(&self) -> Result<()> {
        let Self {
            high_above_km2: high,
            critical_above_km2: critical,
        } = *self;
        if !high.is_finite() || !critical.is_finite() || high < 0.0 {
            return Err(SpillError::Configuration {
                message: format!(
                    "severity breakpoints must be finite and non-negative ({high}, {critical})"
                ),
            });
        }
        if high >= critical {
            return Err(SpillError::Configuration {
                message: format!(
                    "high breakpoint {high} km² must be below critical breakpoint {critical} km²"
                ),
            });
        }
        Ok(())
    }

    pub fn classify(&self, area_km2: f64) -> SeverityTier {
        if area_km2 > self.critical_above_km2 {
            SeverityTier::Critical
        } else if area_km2 > self.high_above_km2 {
            SeverityTier::High
        } else if area_km2 > 0.0 {
            SeverityTier::Moderate
        } else {
            SeverityTier::Clear
        }
    }
}

/// How the red tint is blended into the forensic overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Blend only where the mask is set; clear pixels keep their original value.
    #[default]
    MaskedOnly,
    /// Blend every pixel, which dims clear pixels to 70 % brightness.
    FullFrame,
}

/// Fixed policy values the pipeline needs beyond the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsConfig {
    pub pixel_ground_area_m2: f64,
    pub severity: SeverityPolicy,
    pub blend: BlendMode,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pixel_ground_area_m2: DEFAULT_PIXEL_GROUND_AREA_M2,
            severity: SeverityPolicy::default(),
            blend: BlendMode::default(),
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.pixel_ground_area_m2.is_finite() || self.pixel_ground_area_m2 <= 0.0 {
            return Err(SpillError::Configuration {
                message: format!(
                    "pixel ground area must be a positive number of m², got {}",
                    self.pixel_ground_area_m2
                ),
            });
        }
        self.severity.validate()
    }

    pub fn area_km2(&self, oil_pixels: u64) -> f64 {
        oil_pixels as f64 * self.pixel_ground_area_m2 / M2_PER_KM2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_rejects_out_of_range() {
        for value in [-0.1, 1.5, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                Threshold::new(value),
                Err(SpillError::InvalidThreshold { .. })
            ));
        }
        assert_eq!(Threshold::new(0.0).unwrap().value(), 0.0);
        assert_eq!(Threshold::new(1.0).unwrap().value(), 1.0);
        assert_eq!(Threshold::default().value(), 0.05);
    }

    #[test]
    fn threshold_display_keeps_precision() {
        assert_eq!(Threshold::new(0.125).unwrap().to_string(), "0.125");
        assert_eq!(Threshold::new(0.005).unwrap().to_string(), "0.005");
        assert_eq!(Threshold::default().to_string(), "0.05");
    }

    #[test]
    fn severity_boundaries_are_exclusive() {
        let policy = SeverityPolicy::default();
        assert_eq!(policy.classify(0.0), SeverityTier::Clear);
        assert_eq!(policy.classify(0.0001), SeverityTier::Moderate);
        assert_eq!(policy.classify(0.1), SeverityTier::Moderate);
        assert_eq!(policy.classify(0.1001), SeverityTier::High);
        assert_eq!(policy.classify(1.0), SeverityTier::High);
        assert_eq!(policy.classify(1.0001), SeverityTier::Critical);
    }

    #[test]
    fn area_is_linear_in_pixel_count() {
        let config = MetricsConfig::default();
        assert_eq!(config.area_km2(0), 0.0);
        assert!((config.area_km2(1) - 0.0001).abs() < 1e-12);
        assert!((config.area_km2(65_536) - 6.5536).abs() < 1e-9);
        assert!(config.area_km2(10) < config.area_km2(11));
    }

    #[test]
    fn config_validation() {
        assert!(MetricsConfig::default().validate().is_ok());

        let config = MetricsConfig {
            pixel_ground_area_m2: 0.0,
            ..MetricsConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MetricsConfig {
            severity: SeverityPolicy {
                high_above_km2: 2.0,
                critical_above_km2: 1.0,
            },
            ..MetricsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SpillError::Configuration { .. })
        ));
    }

    #[test]
    fn banners_follow_tier() {
        assert!(SeverityTier::Critical.banner().starts_with("CRITICAL"));
        assert!(SeverityTier::Clear.banner().contains("NO SPILL"));
        assert_eq!(SeverityTier::High.to_string(), "HIGH");
    }
}
