#[cfg(feature = "parallel")]
use rayon::prelude::*;

use descale_fast_types::{FrameResult, Plane};

use crate::weights::WeightMatrix;

pub(crate) fn fill_rows<F>(out: &mut [f32], width: usize, fill: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    if width == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        out.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| fill(y, row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (y, row) in out.chunks_mut(width).enumerate() {
            fill(y, row);
        }
    }
}

pub(crate) fn transpose(plane: &Plane) -> FrameResult<Plane> {
    let (width, height) = plane.dimensions();
    let src = plane.data();
    let mut out = vec![0.0f32; plane.len()];
    fill_rows(&mut out, height, |x, row| {
        for (y, dst) in row.iter_mut().enumerate() {
            *dst = src[y * width + x];
        }
    });
    Plane::from_vec(height, width, out)
}

pub(crate) fn resample_horizontal(plane: &Plane, matrix: &WeightMatrix) -> FrameResult<Plane> {
    let (width, height) = plane.dimensions();
    let out_width = matrix.out_len();
    let src = plane.data();
    let mut out = vec![0.0f32; out_width * height];
    fill_rows(&mut out, out_width, |y, row| {
        matrix.apply(&src[y * width..(y + 1) * width], row);
    });
    Plane::from_vec(out_width, height, out)
}

pub(crate) fn resample_vertical(plane: &Plane, matrix: &WeightMatrix) -> FrameResult<Plane> {
    let width = plane.width();
    let src = plane.data();
    let out_height = matrix.out_len();
    let mut out = vec![0.0f32; width * out_height];
    fill_rows(&mut out, width, |y, row| {
        let weights = &matrix.rows[y];
        let mut acc = vec![0.0f64; width];
        for (k, &w) in weights.weights.iter().enumerate() {
            let sy = weights.start + k;
            for (a, &v) in acc.iter_mut().zip(&src[sy * width..(sy + 1) * width]) {
                *a += f64::from(v) * w;
            }
        }
        for (dst, a) in row.iter_mut().zip(acc) {
            *dst = a as f32;
        }
    });
    Plane::from_vec(width, out_height, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKernel;

    #[test]
    fn transpose_swaps_axes() {
        let plane = Plane::from_fn(3, 2, |x, y| (y * 3 + x) as f32).unwrap();
        let t = transpose(&plane).unwrap();
        assert_eq!(t.dimensions(), (2, 3));
        assert_eq!(t.get(1, 2), plane.get(2, 1));
    }

    #[test]
    fn flat_planes_stay_flat() {
        let plane = Plane::filled(6, 4, 0.25).unwrap();
        let h = WeightMatrix::new(FilterKernel::Spline36, 6, 9, 0.0).unwrap();
        let v = WeightMatrix::new(FilterKernel::Spline36, 4, 3, 0.0).unwrap();
        let out = resample_vertical(&resample_horizontal(&plane, &h).unwrap(), &v).unwrap();
        assert_eq!(out.dimensions(), (9, 3));
        assert!(out.data().iter().all(|&v| (v - 0.25).abs() < 1e-6));
    }
}
