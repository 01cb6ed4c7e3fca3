use std::fmt;
use std::str::FromStr;

use descale_fast_types::{FrameError, FrameResult};

/// Detail mask tuning. `threshold` is a fraction of the peak value; negative
/// expand counts erode instead of dilating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailMaskParams {
    pub threshold: f32,
    pub inflate: u32,
    /// Iterations before and after inflating.
    pub expand: (i32, i32),
}

impl Default for DetailMaskParams {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            inflate: 2,
            expand: (4, 0),
        }
    }
}

impl DetailMaskParams {
    pub fn validate(&self) -> FrameResult<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(FrameError::configuration(format!(
                "detail mask threshold must lie in [0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Final smoothing applied to the error mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlurSpec {
    /// Box blur with an integer radius.
    Box(u32),
    /// Gaussian blur with the given sigma.
    Gauss(f32),
}

impl BlurSpec {
    fn validate(&self) -> FrameResult<()> {
        match self {
            BlurSpec::Gauss(sigma) if !sigma.is_finite() || *sigma < 0.0 => {
                Err(FrameError::configuration(format!(
                    "gaussian blur sigma must be non-negative, got {sigma}"
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for BlurSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlurSpec::Box(radius) => write!(f, "{radius}"),
            BlurSpec::Gauss(sigma) => write!(f, "{sigma:?}"),
        }
    }
}

/// Integer text selects a box blur, anything with a fraction a gaussian.
impl FromStr for BlurSpec {
    type Err = FrameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(radius) = trimmed.parse::<u32>() {
            return Ok(BlurSpec::Box(radius));
        }
        let sigma = trimmed.parse::<f32>().map_err(|_| {
            FrameError::configuration(format!("invalid blur '{value}', expected a number"))
        })?;
        let spec = BlurSpec::Gauss(sigma);
        spec.validate()?;
        Ok(spec)
    }
}

/// Error mask tuning, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMaskParams {
    thresholds: Vec<f32>,
    expands: (u32, u32, u32),
    blur: BlurSpec,
    bw_bias: f32,
    temporal_radius: u32,
}

impl Default for ErrorMaskParams {
    fn default() -> Self {
        Self {
            thresholds: vec![0.38],
            expands: (2, 2, 3),
            blur: BlurSpec::Box(3),
            bw_bias: 1.0,
            temporal_radius: 1,
        }
    }
}

impl ErrorMaskParams {
    /// `thresholds` use a 0 to 10 scale. `expands` are the rectangle, first
    /// ellipse and second ellipse iteration counts.
    pub fn new(
        thresholds: Vec<f32>,
        expands: (u32, u32, u32),
        blur: BlurSpec,
        bw_bias: f32,
        temporal_radius: u32,
    ) -> FrameResult<Self> {
        let params = Self {
            thresholds,
            expands,
            blur,
            bw_bias,
            temporal_radius,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> FrameResult<()> {
        if self.thresholds.is_empty() || self.thresholds.len() > 3 {
            return Err(FrameError::configuration(format!(
                "error mask takes 1 to 3 thresholds, got {}",
                self.thresholds.len()
            )));
        }
        if let Some(bad) = self
            .thresholds
            .iter()
            .find(|t| !t.is_finite() || !(0.0..=10.0).contains(*t))
        {
            return Err(FrameError::configuration(format!(
                "error mask thresholds must lie in [0, 10], got {bad}"
            )));
        }
        if self.thresholds[0] <= 0.0 {
            return Err(FrameError::configuration(
                "the first error mask threshold must be non-zero",
            ));
        }
        if !self.bw_bias.is_finite() || self.bw_bias <= 0.0 {
            return Err(FrameError::configuration(format!(
                "bw_bias must be positive, got {}",
                self.bw_bias
            )));
        }
        self.blur.validate()
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    pub fn expands(&self) -> (u32, u32, u32) {
        self.expands
    }

    pub fn blur(&self) -> BlurSpec {
        self.blur
    }

    pub fn bw_bias(&self) -> f32 {
        self.bw_bias
    }

    pub fn temporal_radius(&self) -> u32 {
        self.temporal_radius
    }

    /// Temporal stabilization only kicks in above a radius of one.
    pub fn is_temporal(&self) -> bool {
        self.temporal_radius > 1
    }
}
