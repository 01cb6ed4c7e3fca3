use descale_fast_types::{FrameError, FrameResult, Plane, mirror};

use crate::rows::fill_rows;

fn convolve_separable(plane: &Plane, taps: &[f32]) -> FrameResult<Plane> {
    let (width, height) = plane.dimensions();
    let radius = (taps.len() / 2) as isize;
    let src = plane.data();

    let mut horizontal = vec![0.0f32; plane.len()];
    fill_rows(&mut horizontal, width, |y, row| {
        let src_row = &src[y * width..(y + 1) * width];
        for (x, dst) in row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &weight) in taps.iter().enumerate() {
                let sx = mirror(x as isize + k as isize - radius, width);
                acc += src_row[sx] * weight;
            }
            *dst = acc;
        }
    });

    let mut out = vec![0.0f32; plane.len()];
    fill_rows(&mut out, width, |y, row| {
        for (k, &weight) in taps.iter().enumerate() {
            let sy = mirror(y as isize + k as isize - radius, height);
            let src_row = &horizontal[sy * width..(sy + 1) * width];
            for (dst, &value) in row.iter_mut().zip(src_row) {
                *dst += value * weight;
            }
        }
    });
    plane.with_data(out)
}

/// Mean over a `(2r + 1)` square window, edges mirrored. A radius of 0 is a
/// copy.
pub fn box_blur(plane: &Plane, radius: u32) -> FrameResult<Plane> {
    if radius == 0 {
        return Ok(plane.clone());
    }
    let size = 2 * radius as usize + 1;
    let taps = vec![1.0 / size as f32; size];
    convolve_separable(plane, &taps)
}

/// Gaussian blur with taps out to `ceil(3 * sigma)`.
pub fn gauss_blur(plane: &Plane, sigma: f32) -> FrameResult<Plane> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(FrameError::configuration(format!(
            "gaussian sigma must be a non-negative number, got {sigma}"
        )));
    }
    let radius = (3.0 * sigma).ceil() as usize;
    if radius == 0 {
        return Ok(plane.clone());
    }
    let denom = 2.0 * sigma * sigma;
    let mut taps: Vec<f32> = (0..=2 * radius)
        .map(|k| {
            let d = k as f32 - radius as f32;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.iter_mut().for_each(|w| *w /= sum);
    convolve_separable(plane, &taps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_blur_preserves_flat_planes() {
        let plane = Plane::filled(7, 5, 3.0).unwrap();
        let out = box_blur(&plane, 2).unwrap();
        assert!(out.data().iter().all(|&v| (v - 3.0).abs() < 1e-5));
    }

    #[test]
    fn box_blur_spreads_an_impulse_evenly() {
        let plane = Plane::from_fn(7, 7, |x, y| if x == 3 && y == 3 { 9.0 } else { 0.0 }).unwrap();
        let out = box_blur(&plane, 1).unwrap();
        assert!((out.get(2, 2) - 1.0).abs() < 1e-5);
        assert!((out.get(3, 3) - 1.0).abs() < 1e-5);
        assert_eq!(out.get(0, 0), 0.0);
    }

    #[test]
    fn gauss_blur_conserves_mass_away_from_edges() {
        let plane =
            Plane::from_fn(15, 15, |x, y| if x == 7 && y == 7 { 1.0 } else { 0.0 }).unwrap();
        let out = gauss_blur(&plane, 1.0).unwrap();
        let total: f32 = out.data().iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(out.get(7, 7) > out.get(8, 7));
    }

    #[test]
    fn gauss_blur_rejects_negative_sigma() {
        let plane = Plane::filled(3, 3, 0.0).unwrap();
        assert!(gauss_blur(&plane, -1.0).is_err());
    }
}
