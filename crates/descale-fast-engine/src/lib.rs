//! Multi-candidate descale selection.
//!
//! [`CandidateGenerator`] turns a [`DescaleRequest`] into lazily evaluated
//! candidate clips, [`ScoreSelector`] picks one per frame and [`descale`]
//! wires both to the mask builders and the final merge. Nothing here touches
//! pixels until a frame of the output clip is requested.

mod candidate;
mod pipeline;
mod selector;
mod stream;

pub use candidate::{Candidate, CandidateGenerator, DescaleRequest};
pub use pipeline::{DescaleConfig, DescaleOutput, descale};
pub use selector::{
    CandidateStat, ScoreSelector, Selection, SelectionRecord, score, select_best,
};
pub use stream::{OutputStream, into_stream, spawn_stream_from_channel};
