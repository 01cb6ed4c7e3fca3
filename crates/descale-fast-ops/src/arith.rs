use descale_fast_types::{FrameError, FrameResult, Plane};

use crate::rows::fill_rows;

pub fn pointwise(plane: &Plane, f: impl Fn(f32) -> f32 + Send + Sync) -> FrameResult<Plane> {
    let width = plane.width();
    let src = plane.data();
    let mut out = vec![0.0f32; plane.len()];
    fill_rows(&mut out, width, |y, row| {
        let src_row = &src[y * width..(y + 1) * width];
        for (dst, &value) in row.iter_mut().zip(src_row) {
            *dst = f(value);
        }
    });
    plane.with_data(out)
}

/// Applies `f` to co-located samples of two planes of the same size.
pub fn combine(
    a: &Plane,
    b: &Plane,
    f: impl Fn(f32, f32) -> f32 + Send + Sync,
) -> FrameResult<Plane> {
    a.ensure_same_size(b)?;
    let width = a.width();
    let (da, db) = (a.data(), b.data());
    let mut out = vec![0.0f32; a.len()];
    fill_rows(&mut out, width, |y, row| {
        let base = y * width;
        for (x, dst) in row.iter_mut().enumerate() {
            *dst = f(da[base + x], db[base + x]);
        }
    });
    a.with_data(out)
}

fn fold_planes(
    planes: &[&Plane],
    f: impl Fn(&mut dyn Iterator<Item = f32>) -> f32 + Send + Sync,
) -> FrameResult<Plane> {
    let first = planes
        .first()
        .ok_or_else(|| FrameError::configuration("at least one plane is required"))?;
    for plane in &planes[1..] {
        first.ensure_same_size(plane)?;
    }
    let width = first.width();
    let mut out = vec![0.0f32; first.len()];
    fill_rows(&mut out, width, |y, row| {
        let base = y * width;
        for (x, dst) in row.iter_mut().enumerate() {
            let idx = base + x;
            let mut values = planes.iter().map(|plane| plane.data()[idx]);
            *dst = f(&mut values);
        }
    });
    first.with_data(out)
}

/// `|a - b|` per sample.
pub fn abs_diff(a: &Plane, b: &Plane) -> FrameResult<Plane> {
    combine(a, b, |x, y| (x - y).abs())
}

pub fn multiply(a: &Plane, b: &Plane) -> FrameResult<Plane> {
    combine(a, b, |x, y| x * y)
}

/// Samples at or above `threshold` become `high`, everything else `low`.
pub fn binarize(plane: &Plane, threshold: f32, low: f32, high: f32) -> FrameResult<Plane> {
    pointwise(plane, move |v| if v >= threshold { high } else { low })
}

pub fn limiter(plane: &Plane, min: f32, max: f32) -> FrameResult<Plane> {
    pointwise(plane, move |v| v.clamp(min, max))
}

pub fn min_planes(planes: &[&Plane]) -> FrameResult<Plane> {
    fold_planes(planes, |values| values.fold(f32::INFINITY, f32::min))
}

pub fn max_planes(planes: &[&Plane]) -> FrameResult<Plane> {
    fold_planes(planes, |values| values.fold(f32::NEG_INFINITY, f32::max))
}

pub fn average_planes(planes: &[&Plane]) -> FrameResult<Plane> {
    let count = planes.len() as f32;
    fold_planes(planes, move |values| values.sum::<f32>() / count)
}

/// Blends `base` toward `overlay` by `mask / peak`.
pub fn masked_merge(base: &Plane, overlay: &Plane, mask: &Plane, peak: f32) -> FrameResult<Plane> {
    base.ensure_same_size(overlay)?;
    base.ensure_same_size(mask)?;
    let width = base.width();
    let (db, dov, dm) = (base.data(), overlay.data(), mask.data());
    let inv_peak = if peak > 0.0 { 1.0 / peak } else { 0.0 };
    let mut out = vec![0.0f32; base.len()];
    fill_rows(&mut out, width, |y, row| {
        let offset = y * width;
        for (x, dst) in row.iter_mut().enumerate() {
            let idx = offset + x;
            let weight = (dm[idx] * inv_peak).clamp(0.0, 1.0);
            *dst = db[idx] + (dov[idx] - db[idx]) * weight;
        }
    });
    base.with_data(out)
}

/// Mean sample value normalized by `peak` into `[0, 1]`.
pub fn plane_stats_average(plane: &Plane, peak: f32) -> f64 {
    if plane.is_empty() || peak <= 0.0 {
        return 0.0;
    }
    let sum: f64 = plane.data().iter().map(|&v| f64::from(v)).sum();
    sum / plane.len() as f64 / f64::from(peak)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(values: &[f32]) -> Plane {
        Plane::from_vec(values.len(), 1, values.to_vec()).unwrap()
    }

    #[test]
    fn binarize_is_inclusive() {
        let out = binarize(&plane(&[0.1, 0.5, 0.7]), 0.5, 0.0, 1.0).unwrap();
        assert_eq!(out.data(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn abs_diff_requires_matching_sizes() {
        let a = plane(&[1.0, 2.0]);
        let b = Plane::filled(1, 2, 0.0).unwrap();
        assert!(abs_diff(&a, &b).is_err());
        assert_eq!(abs_diff(&a, &plane(&[3.0, 1.0])).unwrap().data(), &[2.0, 1.0]);
    }

    #[test]
    fn fold_helpers_work_elementwise() {
        let a = plane(&[1.0, 4.0]);
        let b = plane(&[3.0, 2.0]);
        assert_eq!(min_planes(&[&a, &b]).unwrap().data(), &[1.0, 2.0]);
        assert_eq!(max_planes(&[&a, &b]).unwrap().data(), &[3.0, 4.0]);
        assert_eq!(average_planes(&[&a, &b]).unwrap().data(), &[2.0, 3.0]);
        assert!(min_planes(&[]).is_err());
    }

    #[test]
    fn masked_merge_interpolates() {
        let base = plane(&[0.0, 0.0, 0.0]);
        let overlay = plane(&[10.0, 10.0, 10.0]);
        let mask = plane(&[0.0, 127.5, 255.0]);
        let out = masked_merge(&base, &overlay, &mask, 255.0).unwrap();
        assert_eq!(out.data(), &[0.0, 5.0, 10.0]);
    }

    #[test]
    fn stats_average_is_normalized() {
        let avg = plane_stats_average(&plane(&[0.0, 255.0]), 255.0);
        assert!((avg - 0.5).abs() < 1e-12);
    }
}
