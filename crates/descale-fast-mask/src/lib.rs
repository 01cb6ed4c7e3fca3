//! Confidence masks for descaled output.
//!
//! The detail mask flags pixels a rescale cannot reproduce; the error mask
//! flags spatially coherent (and optionally temporally stable) reconstruction
//! error. Both exist as per-frame functions and as lazy clip nodes.

mod config;
mod detail;
mod error_mask;
mod source;
mod temporal;

pub use config::{BlurSpec, DetailMaskParams, ErrorMaskParams};
pub use detail::{DetailMaskNode, build_detail_mask};
pub use error_mask::{ErrorMaskNode, build_error_mask, build_error_mask_base};
pub use source::{MaskFn, MaskSource};
pub use temporal::stabilize;
