//! Summary synthesis and the artifacts derived from it.

pub mod citation;
pub mod derived;
pub mod prompts;
pub mod summary;

pub use citation::CitedText;
pub use derived::{ConsensusLevel, Derived, derive_all};
pub use summary::{SUMMARY_FAILED, summarize, top_citations};
