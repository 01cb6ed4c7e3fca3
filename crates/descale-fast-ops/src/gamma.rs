use descale_fast_types::{Frame, FrameError, FrameResult, Transfer};

use crate::arith::pointwise;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    k0: f32,
    phi: f32,
    alpha: f32,
    gamma: f32,
}

impl Coefficients {
    fn for_transfer(transfer: Transfer) -> FrameResult<Self> {
        match transfer {
            Transfer::Bt709 | Transfer::Bt601 | Transfer::Bt2020_10 | Transfer::Bt2020_12 => {
                Ok(Self {
                    k0: 0.081,
                    phi: 4.5,
                    alpha: 0.099,
                    gamma: 1.0 / 0.45,
                })
            }
            Transfer::Smpte240m => Ok(Self {
                k0: 0.0912,
                phi: 4.0,
                alpha: 0.1115,
                gamma: 1.0 / 0.45,
            }),
            Transfer::Srgb => Ok(Self {
                k0: 0.04045,
                phi: 12.92,
                alpha: 0.055,
                gamma: 2.4,
            }),
            Transfer::Linear => Err(FrameError::configuration(
                "linear is not a gamma curve; pick the curve the clip was encoded with",
            )),
        }
    }
}

/// Tuning shared by both directions of the conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaOptions {
    /// Extra exponent applied on the linear side.
    pub gcor: f32,
    /// Use a sigmoidal contrast curve around `threshold`.
    pub sigmoid: bool,
    pub threshold: f32,
    pub cont: f32,
    pub epsilon: f32,
}

impl Default for GammaOptions {
    fn default() -> Self {
        Self {
            gcor: 1.0,
            sigmoid: false,
            threshold: 0.5,
            cont: 6.5,
            epsilon: 1e-6,
        }
    }
}

impl GammaOptions {
    fn logistic(&self, x: f32) -> f32 {
        1.0 / (1.0 + (self.cont * (self.threshold - x)).exp())
    }

    /// Logistic values at 0 and 1, used to normalize the sigmoid to `[0, 1]`.
    fn sigmoid_bounds(&self) -> (f32, f32) {
        (self.logistic(0.0), self.logistic(1.0))
    }
}

fn ensure_float(frame: &Frame, op: &str) -> FrameResult<()> {
    if !frame.format().is_float() {
        return Err(FrameError::configuration(format!(
            "{op}: clip must be 32 bit float, got {}",
            frame.format()
        )));
    }
    Ok(())
}

fn map_planes(frame: &Frame, f: impl Fn(f32) -> f32 + Send + Sync + Copy) -> FrameResult<Frame> {
    let planes = frame
        .planes()
        .iter()
        .map(|plane| pointwise(plane, move |v| f(v).clamp(0.0, 1.0)))
        .collect::<FrameResult<Vec<_>>>()?;
    Ok(Frame::new(frame.format(), planes)?
        .with_props(frame.props().clone())
        .with_frame_index(frame.frame_index()))
}

/// Decodes `curve` into linear light. Samples are clamped to `[0, 1]` and the
/// result is tagged [`Transfer::Linear`].
pub fn gamma_to_linear(
    frame: &Frame,
    curve: Transfer,
    options: GammaOptions,
) -> FrameResult<Frame> {
    ensure_float(frame, "gamma_to_linear")?;
    let c = Coefficients::for_transfer(curve)?;
    let (x0, x1) = options.sigmoid_bounds();

    let mut out = map_planes(frame, move |x| {
        let linear = if x <= c.k0 {
            x / c.phi
        } else {
            ((x + c.alpha) / (1.0 + c.alpha)).powf(c.gamma)
        };
        let linear = linear.powf(options.gcor);
        if !options.sigmoid {
            return linear;
        }
        let logistic = (linear * (x1 - x0) + x0).max(options.epsilon);
        let odds = (1.0 / logistic - 1.0).max(options.epsilon);
        options.threshold - odds.ln() / options.cont
    })?;
    out.props_mut().transfer = Some(Transfer::Linear);
    Ok(out)
}

/// Encodes linear light with `curve`, the inverse of [`gamma_to_linear`].
pub fn linear_to_gamma(
    frame: &Frame,
    curve: Transfer,
    options: GammaOptions,
) -> FrameResult<Frame> {
    ensure_float(frame, "linear_to_gamma")?;
    let c = Coefficients::for_transfer(curve)?;
    let (x0, x1) = options.sigmoid_bounds();

    let mut out = map_planes(frame, move |x| {
        let lin = if options.sigmoid {
            ((options.logistic(x) - x0) / (x1 - x0)).powf(options.gcor)
        } else {
            x.powf(options.gcor)
        };
        if lin <= c.k0 / c.phi {
            lin * c.phi
        } else {
            lin.powf(1.0 / c.gamma) * (c.alpha + 1.0) - c.alpha
        }
    })?;
    out.props_mut().transfer = Some(curve);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use descale_fast_types::{FrameFormat, Plane};

    use super::*;

    fn ramp() -> Frame {
        let plane = Plane::from_fn(11, 1, |x, _| x as f32 / 10.0).unwrap();
        Frame::gray(FrameFormat::GRAYS, plane).unwrap()
    }

    #[test]
    fn round_trip_restores_the_ramp() {
        for curve in [Transfer::Bt709, Transfer::Srgb, Transfer::Smpte240m] {
            let linear = gamma_to_linear(&ramp(), curve, GammaOptions::default()).unwrap();
            assert_eq!(linear.props().transfer, Some(Transfer::Linear));
            let back = linear_to_gamma(&linear, curve, GammaOptions::default()).unwrap();
            assert_eq!(back.props().transfer, Some(curve));
            for (a, b) in back.luma().data().iter().zip(ramp().luma().data()) {
                assert!((a - b).abs() < 1e-4, "{curve}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn sigmoid_round_trip_is_close() {
        let options = GammaOptions {
            sigmoid: true,
            ..GammaOptions::default()
        };
        let linear = gamma_to_linear(&ramp(), Transfer::Bt709, options).unwrap();
        let back = linear_to_gamma(&linear, Transfer::Bt709, options).unwrap();
        for (a, b) in back.luma().data().iter().zip(ramp().luma().data()) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn linear_segment_matches_bt709() {
        let linear = gamma_to_linear(&ramp(), Transfer::Bt709, GammaOptions::default()).unwrap();
        assert!((linear.luma().get(0, 0)).abs() < 1e-7);
        assert!(linear.luma().get(10, 0) <= 1.0);
        assert!(linear.luma().get(5, 0) < 0.5);
    }

    #[test]
    fn integer_clips_are_rejected() {
        let gray = Frame::gray(FrameFormat::GRAY8, Plane::filled(2, 2, 0.0).unwrap()).unwrap();
        assert!(gamma_to_linear(&gray, Transfer::Bt709, GammaOptions::default()).is_err());
        assert!(linear_to_gamma(&ramp(), Transfer::Linear, GammaOptions::default()).is_err());
    }
}
