use descale_fast_types::{FrameError, FrameResult, mirror};

use crate::filter::FilterKernel;

/// Non-zero weights of one output sample over a contiguous input span.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WeightRow {
    pub start: usize,
    pub weights: Vec<f64>,
}

impl WeightRow {
    pub fn end(&self) -> usize {
        self.start + self.weights.len()
    }
}

/// Sparse `out_len x in_len` resampling matrix, one normalized row per output
/// sample.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WeightMatrix {
    pub in_len: usize,
    pub rows: Vec<WeightRow>,
}

impl WeightMatrix {
    /// Weights mapping `in_len` samples onto `out_len`. Output sample `i` is
    /// centred on input position `(i + 0.5) * in/out - 0.5 + shift`.
    pub fn new(
        kernel: FilterKernel,
        in_len: usize,
        out_len: usize,
        shift: f64,
    ) -> FrameResult<Self> {
        if in_len == 0 || out_len == 0 {
            return Err(FrameError::configuration(format!(
                "cannot resample {in_len} samples to {out_len}"
            )));
        }
        if !shift.is_finite() {
            return Err(FrameError::configuration("shift must be finite"));
        }

        let ratio = in_len as f64 / out_len as f64;
        let stretch = ratio.max(1.0);
        let support = kernel.support() * stretch;

        let rows = (0..out_len)
            .map(|i| {
                let centre = (i as f64 + 0.5) * ratio - 0.5 + shift;
                let first = (centre - support).floor() as i64;
                let last = (centre + support).ceil() as i64;

                let mut taps: Vec<(usize, f64)> = Vec::new();
                for j in first..=last {
                    let weight = kernel.evaluate((j as f64 - centre) / stretch);
                    if weight != 0.0 {
                        taps.push((mirror(j as isize, in_len), weight));
                    }
                }
                if taps.is_empty() {
                    let nearest = mirror(centre.round() as isize, in_len);
                    taps.push((nearest, 1.0));
                }

                let start = taps.iter().map(|(idx, _)| *idx).min().unwrap_or(0);
                let end = taps.iter().map(|(idx, _)| *idx).max().unwrap_or(0) + 1;
                let mut weights = vec![0.0f64; end - start];
                let mut sum = 0.0;
                for (idx, weight) in taps {
                    weights[idx - start] += weight;
                    sum += weight;
                }
                if sum.abs() > f64::EPSILON {
                    weights.iter_mut().for_each(|w| *w /= sum);
                }
                WeightRow { start, weights }
            })
            .collect();

        Ok(Self { in_len, rows })
    }

    pub fn out_len(&self) -> usize {
        self.rows.len()
    }

    /// Largest `|j - k|` between two inputs sharing an output row.
    pub fn bandwidth(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.weights.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    pub fn apply(&self, input: &[f32], output: &mut [f32]) {
        for (row, dst) in self.rows.iter().zip(output.iter_mut()) {
            let span = &input[row.start..row.end()];
            let acc: f64 = span
                .iter()
                .zip(&row.weights)
                .map(|(&v, &w)| f64::from(v) * w)
                .sum();
            *dst = acc as f32;
        }
    }
}
