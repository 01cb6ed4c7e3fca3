use descale_fast_types::{FrameResult, Plane, mirror};

use crate::rows::{fill_rows, replicate};

/// Neighbourhood used by a single 3x3 maximum/minimum pass. The centre pixel
/// always participates and edge pixels are replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinates {
    Rectangle,
    Losange,
    Horizontal,
    Vertical,
}

impl Coordinates {
    fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Coordinates::Rectangle => &[
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 0),
                (1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
            ],
            Coordinates::Losange => &[(0, -1), (-1, 0), (1, 0), (0, 1)],
            Coordinates::Horizontal => &[(-1, 0), (1, 0)],
            Coordinates::Vertical => &[(0, -1), (0, 1)],
        }
    }
}

/// Structuring shape for multi-iteration expand/inpand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XxpandMode {
    Rectangle,
    Losange,
    /// Alternates square and cross passes to approximate a disc.
    Ellipse,
}

impl XxpandMode {
    fn coordinates_for(&self, remaining: u32) -> Coordinates {
        match self {
            XxpandMode::Rectangle => Coordinates::Rectangle,
            XxpandMode::Losange => Coordinates::Losange,
            XxpandMode::Ellipse if remaining % 3 == 1 => Coordinates::Rectangle,
            XxpandMode::Ellipse => Coordinates::Losange,
        }
    }
}

fn neighbourhood(
    plane: &Plane,
    coords: Coordinates,
    reduce: impl Fn(f32, f32) -> f32 + Send + Sync,
) -> FrameResult<Plane> {
    let (width, height) = plane.dimensions();
    let src = plane.data();
    let offsets = coords.offsets();
    let mut out = vec![0.0f32; plane.len()];
    fill_rows(&mut out, width, |y, row| {
        for (x, dst) in row.iter_mut().enumerate() {
            let mut acc = src[y * width + x];
            for &(dx, dy) in offsets {
                let sx = replicate(x as isize + dx, width);
                let sy = replicate(y as isize + dy, height);
                acc = reduce(acc, src[sy * width + sx]);
            }
            *dst = acc;
        }
    });
    plane.with_data(out)
}

pub fn maximum(plane: &Plane, coords: Coordinates) -> FrameResult<Plane> {
    neighbourhood(plane, coords, f32::max)
}

pub fn minimum(plane: &Plane, coords: Coordinates) -> FrameResult<Plane> {
    neighbourhood(plane, coords, f32::min)
}

fn average_of_neighbours(
    plane: &Plane,
    pick: impl Fn(f32, f32) -> f32 + Send + Sync,
) -> FrameResult<Plane> {
    let (width, height) = plane.dimensions();
    let src = plane.data();
    let offsets = Coordinates::Rectangle.offsets();
    let mut out = vec![0.0f32; plane.len()];
    fill_rows(&mut out, width, |y, row| {
        for (x, dst) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for &(dx, dy) in offsets {
                let sx = mirror(x as isize + dx, width);
                let sy = mirror(y as isize + dy, height);
                sum += src[sy * width + sx];
            }
            *dst = pick(src[y * width + x], sum / 8.0);
        }
    });
    plane.with_data(out)
}

/// Replaces a pixel with the mean of its eight neighbours when that raises it.
pub fn inflate(plane: &Plane) -> FrameResult<Plane> {
    average_of_neighbours(plane, f32::max)
}

/// Replaces a pixel with the mean of its eight neighbours when that lowers it.
pub fn deflate(plane: &Plane) -> FrameResult<Plane> {
    average_of_neighbours(plane, f32::min)
}

/// Grows bright regions by `iterations` pixels using the given shape.
pub fn expand(plane: &Plane, iterations: u32, mode: XxpandMode) -> FrameResult<Plane> {
    let mut current = plane.clone();
    for remaining in (1..=iterations).rev() {
        current = maximum(&current, mode.coordinates_for(remaining))?;
    }
    Ok(current)
}

/// Shrinks bright regions by `iterations` pixels using the given shape.
pub fn inpand(plane: &Plane, iterations: u32, mode: XxpandMode) -> FrameResult<Plane> {
    let mut current = plane.clone();
    for remaining in (1..=iterations).rev() {
        current = minimum(&current, mode.coordinates_for(remaining))?;
    }
    Ok(current)
}
