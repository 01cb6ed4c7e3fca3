use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use descale_fast_types::FrameError;

/// Separable resampling filters shipped with the workspace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKernel {
    Point,
    Bilinear,
    Bicubic { b: f64, c: f64 },
    Lanczos { taps: u32 },
    Spline16,
    Spline36,
}

impl FilterKernel {
    pub const CATROM: Self = Self::Bicubic { b: 0.0, c: 0.5 };
    pub const MITCHELL: Self = Self::Bicubic {
        b: 1.0 / 3.0,
        c: 1.0 / 3.0,
    };
    pub const HERMITE: Self = Self::Bicubic { b: 0.0, c: 0.0 };

    pub fn label(&self) -> &'static str {
        match *self {
            FilterKernel::Point => "point",
            FilterKernel::Bilinear => "bilinear",
            k if k == Self::CATROM => "catrom",
            k if k == Self::MITCHELL => "mitchell",
            k if k == Self::HERMITE => "hermite",
            FilterKernel::Bicubic { .. } => "bicubic",
            FilterKernel::Lanczos { .. } => "lanczos",
            FilterKernel::Spline16 => "spline16",
            FilterKernel::Spline36 => "spline36",
        }
    }

    /// Radius of the filter in source pixels before any stretching.
    pub fn support(&self) -> f64 {
        match self {
            FilterKernel::Point => 0.5,
            FilterKernel::Bilinear => 1.0,
            FilterKernel::Bicubic { .. } | FilterKernel::Spline16 => 2.0,
            FilterKernel::Lanczos { taps } => f64::from(*taps),
            FilterKernel::Spline36 => 3.0,
        }
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let ax = x.abs();
        match *self {
            FilterKernel::Point => {
                if (-0.5..0.5).contains(&x) {
                    1.0
                } else {
                    0.0
                }
            }
            FilterKernel::Bilinear => (1.0 - ax).max(0.0),
            FilterKernel::Bicubic { b, c } => bicubic(ax, b, c),
            FilterKernel::Lanczos { taps } => {
                let taps = f64::from(taps);
                if ax >= taps {
                    0.0
                } else {
                    sinc(x) * sinc(x / taps)
                }
            }
            FilterKernel::Spline16 => spline16(ax),
            FilterKernel::Spline36 => spline36(ax),
        }
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

fn bicubic(x: f64, b: f64, c: f64) -> f64 {
    if x < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * x * x * x
            + (-18.0 + 12.0 * b + 6.0 * c) * x * x
            + (6.0 - 2.0 * b))
            / 6.0
    } else if x < 2.0 {
        ((-b - 6.0 * c) * x * x * x
            + (6.0 * b + 30.0 * c) * x * x
            + (-12.0 * b - 48.0 * c) * x
            + (8.0 * b + 24.0 * c))
            / 6.0
    } else {
        0.0
    }
}

fn spline16(x: f64) -> f64 {
    if x < 1.0 {
        ((x - 9.0 / 5.0) * x - 1.0 / 5.0) * x + 1.0
    } else if x < 2.0 {
        let x = x - 1.0;
        ((-1.0 / 3.0 * x + 4.0 / 5.0) * x - 7.0 / 15.0) * x
    } else {
        0.0
    }
}

fn spline36(x: f64) -> f64 {
    if x < 1.0 {
        ((13.0 / 11.0 * x - 453.0 / 209.0) * x - 3.0 / 209.0) * x + 1.0
    } else if x < 2.0 {
        let x = x - 1.0;
        ((-6.0 / 11.0 * x + 270.0 / 209.0) * x - 156.0 / 209.0) * x
    } else if x < 3.0 {
        let x = x - 2.0;
        ((1.0 / 11.0 * x - 45.0 / 209.0) * x + 26.0 / 209.0) * x
    } else {
        0.0
    }
}

impl fmt::Display for FilterKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKernel::Bicubic { b, c } if self.label() == "bicubic" => {
                write!(f, "bicubic(b={b}, c={c})")
            }
            FilterKernel::Lanczos { taps } => write!(f, "lanczos{taps}"),
            _ => f.write_str(self.label()),
        }
    }
}

impl FromStr for FilterKernel {
    type Err = FrameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim().to_ascii_lowercase();
        let kernel = match name.as_str() {
            "point" | "nearest" => FilterKernel::Point,
            "bilinear" => FilterKernel::Bilinear,
            "bicubic" | "catrom" => Self::CATROM,
            "mitchell" => Self::MITCHELL,
            "hermite" => Self::HERMITE,
            "spline16" => FilterKernel::Spline16,
            "spline36" => FilterKernel::Spline36,
            "lanczos" => FilterKernel::Lanczos { taps: 3 },
            other => {
                let taps = other
                    .strip_prefix("lanczos")
                    .and_then(|taps| taps.parse::<u32>().ok())
                    .filter(|taps| (1..=16).contains(taps));
                match taps {
                    Some(taps) => FilterKernel::Lanczos { taps },
                    None => {
                        return Err(FrameError::configuration(format!(
                            "unknown kernel '{value}' (expected point, bilinear, bicubic, \
                             catrom, mitchell, hermite, lanczos[N], spline16 or spline36)"
                        )));
                    }
                }
            }
        };
        Ok(kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolating_filters_hit_one_at_zero() {
        for kernel in [
            FilterKernel::Bilinear,
            FilterKernel::CATROM,
            FilterKernel::Lanczos { taps: 3 },
            FilterKernel::Spline16,
            FilterKernel::Spline36,
        ] {
            assert!((kernel.evaluate(0.0) - 1.0).abs() < 1e-12, "{kernel}");
            assert!(kernel.evaluate(1.0).abs() < 1e-12, "{kernel}");
        }
    }

    #[test]
    fn mitchell_is_not_interpolating() {
        assert!((FilterKernel::MITCHELL.evaluate(0.0) - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("Catrom".parse::<FilterKernel>().unwrap(), FilterKernel::CATROM);
        assert_eq!(
            "lanczos4".parse::<FilterKernel>().unwrap(),
            FilterKernel::Lanczos { taps: 4 }
        );
        assert_eq!(FilterKernel::MITCHELL.label(), "mitchell");
        assert!("sinc".parse::<FilterKernel>().is_err());
        assert!("lanczos0".parse::<FilterKernel>().is_err());
    }
}
