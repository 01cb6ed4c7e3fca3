use std::fmt;
use std::sync::Arc;

use crate::error::{FrameError, FrameResult};

/// A single channel of samples, row-major without padding.
#[derive(Clone)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Arc<[f32]>,
}

impl fmt::Debug for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plane")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("samples", &self.data.len())
            .finish()
    }
}

impl PartialEq for Plane {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.data == other.data
    }
}

impl Plane {
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> FrameResult<Self> {
        let required = width
            .checked_mul(height)
            .ok_or_else(|| FrameError::invalid_frame("calculated plane length overflowed"))?;
        if width == 0 || height == 0 {
            return Err(FrameError::invalid_frame(format!(
                "plane dimensions must be non-zero, got {width}x{height}"
            )));
        }
        if data.len() != required {
            return Err(FrameError::invalid_frame(format!(
                "plane sample count mismatch: got {} expected {}",
                data.len(),
                required
            )));
        }
        Ok(Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
        })
    }

    pub fn filled(width: usize, height: usize, value: f32) -> FrameResult<Self> {
        Self::from_vec(width, height, vec![value; width.saturating_mul(height)])
    }

    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> f32,
    ) -> FrameResult<Self> {
        let mut data = Vec::with_capacity(width.saturating_mul(height));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::from_vec(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.to_vec()
    }

    /// Builds a plane of the same size from already computed samples.
    pub fn with_data(&self, data: Vec<f32>) -> FrameResult<Self> {
        Self::from_vec(self.width, self.height, data)
    }

    pub fn ensure_same_size(&self, other: &Plane) -> FrameResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(FrameError::invalid_frame(format!(
                "plane size mismatch: {}x{} vs {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        Ok(())
    }
}

/// Reflects an out-of-range coordinate back into `0..len` without repeating
/// the edge sample.
pub fn mirror(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut idx = index;
    while idx < 0 || idx > last {
        if idx < 0 {
            idx = -idx;
        }
        if idx > last {
            idx = 2 * last - idx;
        }
    }
    idx as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffers() {
        let err = Plane::from_vec(4, 2, vec![0.0; 7]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrame { .. }));
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(Plane::from_vec(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn from_fn_is_row_major() {
        let plane = Plane::from_fn(3, 2, |x, y| (y * 10 + x) as f32).unwrap();
        assert_eq!(plane.row(1), &[10.0, 11.0, 12.0]);
        assert_eq!(plane.get(2, 0), 2.0);
    }

    #[test]
    fn mirror_reflects_without_edge_repeat() {
        assert_eq!(mirror(-1, 5), 1);
        assert_eq!(mirror(-2, 5), 2);
        assert_eq!(mirror(5, 5), 3);
        assert_eq!(mirror(6, 5), 2);
        assert_eq!(mirror(3, 1), 0);
    }
}
