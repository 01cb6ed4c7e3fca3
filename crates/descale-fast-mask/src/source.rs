use std::fmt;
use std::sync::Arc;

use descale_fast_types::{FrameResult, SharedSource};

use crate::config::{DetailMaskParams, ErrorMaskParams};
use crate::detail::DetailMaskNode;
use crate::error_mask::ErrorMaskNode;

/// Builds a mask clip from the source clip and the rescaled reference clip.
pub type MaskFn = dyn Fn(&SharedSource, &SharedSource) -> FrameResult<SharedSource> + Send + Sync;

/// Where the protection mask of a descale comes from.
#[derive(Clone)]
pub enum MaskSource {
    None,
    DefaultDetail(DetailMaskParams),
    DefaultError(ErrorMaskParams),
    Custom(Arc<MaskFn>),
}

impl Default for MaskSource {
    fn default() -> Self {
        MaskSource::DefaultDetail(DetailMaskParams::default())
    }
}

impl fmt::Debug for MaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskSource::None => f.write_str("None"),
            MaskSource::DefaultDetail(params) => {
                f.debug_tuple("DefaultDetail").field(params).finish()
            }
            MaskSource::DefaultError(params) => {
                f.debug_tuple("DefaultError").field(params).finish()
            }
            MaskSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl MaskSource {
    pub fn custom(
        build: impl Fn(&SharedSource, &SharedSource) -> FrameResult<SharedSource>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        MaskSource::Custom(Arc::new(build))
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaskSource::None => "none",
            MaskSource::DefaultDetail(_) => "detail",
            MaskSource::DefaultError(_) => "error",
            MaskSource::Custom(_) => "custom",
        }
    }

    /// Validates the parameters and collapses the variant into a single
    /// builder. `None` resolves to no mask at all.
    pub fn resolve(&self) -> FrameResult<Option<Arc<MaskFn>>> {
        let builder: Arc<MaskFn> = match self {
            MaskSource::None => return Ok(None),
            MaskSource::DefaultDetail(params) => {
                params.validate()?;
                let params = *params;
                Arc::new(move |source: &SharedSource, rescaled: &SharedSource| {
                    DetailMaskNode::shared(source.clone(), rescaled.clone(), params)
                })
            }
            MaskSource::DefaultError(params) => {
                params.validate()?;
                let params = params.clone();
                Arc::new(move |source: &SharedSource, rescaled: &SharedSource| {
                    ErrorMaskNode::shared(source.clone(), rescaled.clone(), params.clone())
                })
            }
            MaskSource::Custom(build) => build.clone(),
        };
        log::debug!("resolved {} mask", self.label());
        Ok(Some(builder))
    }
}
