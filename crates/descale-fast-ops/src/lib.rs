//! Plane-level primitives used by the mask and engine crates.
//!
//! Every operation is a pure function returning a fresh plane; nothing here
//! mutates its inputs.

pub mod arith;
pub mod blur;
pub mod depth;
pub mod gamma;
pub mod hysteresis;
pub mod morpho;

mod rows;

pub use arith::{
    abs_diff, average_planes, binarize, combine, limiter, masked_merge, max_planes, min_planes,
    multiply, plane_stats_average, pointwise,
};
pub use blur::{box_blur, gauss_blur};
pub use depth::{convert_depth, join_planes, split_planes};
pub use gamma::{GammaOptions, gamma_to_linear, linear_to_gamma};
pub use hysteresis::hysteresis;
pub use morpho::{Coordinates, XxpandMode, deflate, expand, inflate, inpand, maximum, minimum};
