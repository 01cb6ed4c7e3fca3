#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fills `out` row by row; `fill(y, row)` receives the destination row.
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

/// Clamps a coordinate into `0..len`, repeating the edge sample.
pub(crate) fn replicate(index: isize, len: usize) -> usize {
    index.clamp(0, len as isize - 1) as usize
}
