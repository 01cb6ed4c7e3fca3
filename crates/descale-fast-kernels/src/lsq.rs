use descale_fast_types::{FrameError, FrameResult, Plane};

use crate::filter::FilterKernel;
use crate::resample::fill_rows;
use crate::weights::WeightMatrix;

/// Cholesky factor of a symmetric positive definite band matrix, lower band
/// stored row by row: `l[i * (bw + 1) + d]` holds `L[i][i - d]`.
struct BandedCholesky {
    n: usize,
    bw: usize,
    l: Vec<f64>,
}

impl BandedCholesky {
    fn factor(n: usize, bw: usize, mut a: Vec<f64>) -> FrameResult<Self> {
        let stride = bw + 1;
        for i in 0..n {
            let lo = i.saturating_sub(bw);
            for j in lo..=i {
                let mut sum = a[i * stride + (i - j)];
                let k_lo = lo.max(j.saturating_sub(bw));
                for k in k_lo..j {
                    sum -= a[i * stride + (i - k)] * a[j * stride + (j - k)];
                }
                if i == j {
                    if sum <= 1e-12 {
                        return Err(FrameError::configuration(
                            "descale system is singular for this kernel and size",
                        ));
                    }
                    a[i * stride] = sum.sqrt();
                } else {
                    a[i * stride + (i - j)] = sum / a[j * stride];
                }
            }
        }
        Ok(Self { n, bw, l: a })
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        self.l[row * (self.bw + 1) + (row - col)]
    }

    fn solve_in_place(&self, b: &mut [f64]) {
        for i in 0..self.n {
            let mut sum = b[i];
            for k in i.saturating_sub(self.bw)..i {
                sum -= self.at(i, k) * b[k];
            }
            b[i] = sum / self.at(i, i);
        }
        for i in (0..self.n).rev() {
            let mut sum = b[i];
            for k in i + 1..(i + self.bw + 1).min(self.n) {
                sum -= self.at(k, i) * b[k];
            }
            b[i] = sum / self.at(i, i);
        }
    }
}

/// Least-squares inverse of an upscale from `small` to `big` samples.
pub(crate) struct LeastSquares {
    upscale: WeightMatrix,
    factor: BandedCholesky,
}

impl LeastSquares {
    pub fn new(kernel: FilterKernel, small: usize, big: usize, shift: f64) -> FrameResult<Self> {
        let upscale = WeightMatrix::new(kernel, small, big, shift)?;
        let bw = upscale.bandwidth();
        let stride = bw + 1;
        let mut normal = vec![0.0f64; small * stride];
        for row in &upscale.rows {
            for (a, &wa) in row.weights.iter().enumerate() {
                for (b, &wb) in row.weights[..=a].iter().enumerate() {
                    let j = row.start + a;
                    normal[j * stride + (a - b)] += wa * wb;
                }
            }
        }
        let factor = BandedCholesky::factor(small, bw, normal)?;
        log::trace!(
            "{} descale system {big}->{small} bandwidth {bw}",
            kernel.label()
        );
        Ok(Self { upscale, factor })
    }

    pub fn solve(&self, observed: &[f32], out: &mut [f32]) {
        let mut rhs = vec![0.0f64; self.upscale.in_len];
        for (row, &y) in self.upscale.rows.iter().zip(observed) {
            for (k, &w) in row.weights.iter().enumerate() {
                rhs[row.start + k] += w * f64::from(y);
            }
        }
        self.factor.solve_in_place(&mut rhs);
        for (dst, value) in out.iter_mut().zip(rhs) {
            *dst = value as f32;
        }
    }
}

pub(crate) fn descale_horizontal(
    plane: &Plane,
    kernel: FilterKernel,
    width: usize,
    shift: f64,
) -> FrameResult<Plane> {
    let (src_width, height) = plane.dimensions();
    let system = LeastSquares::new(kernel, width, src_width, shift)?;
    let src = plane.data();
    let mut out = vec![0.0f32; width * height];
    fill_rows(&mut out, width, |y, row| {
        system.solve(&src[y * src_width..(y + 1) * src_width], row);
    });
    Plane::from_vec(width, height, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::resample_horizontal;

    #[test]
    fn banded_solver_matches_dense_answer() {
        // [[4, 1, 0], [1, 3, 1], [0, 1, 2]] x = [1, 2, 3]
        let a = vec![4.0, 0.0, 3.0, 1.0, 2.0, 1.0];
        let chol = BandedCholesky::factor(3, 1, a).unwrap();
        let mut b = vec![1.0, 2.0, 3.0];
        chol.solve_in_place(&mut b);
        let expected = [2.0 / 9.0, 1.0 / 9.0, 13.0 / 9.0];
        for (got, want) in b.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
    }

    #[test]
    fn descale_inverts_an_exact_upscale() {
        let small = Plane::from_fn(8, 2, |x, y| ((x * 7 + y * 3) % 11) as f32 / 11.0).unwrap();
        let up = WeightMatrix::new(FilterKernel::CATROM, 8, 13, 0.0).unwrap();
        let big = resample_horizontal(&small, &up).unwrap();
        let back = descale_horizontal(&big, FilterKernel::CATROM, 8, 0.0).unwrap();
        for (a, b) in back.data().iter().zip(small.data()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }
}
