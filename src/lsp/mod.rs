//! LSP protocol feature implementations.
//!
//! This module provides:
//! - request routing to the mode owning a position or range
//! - aggregators merging the answers of several modes: folding ranges,
//!   selection ranges, semantic tokens and range formatting

pub mod dispatch;
mod folding;
mod formatting;
mod selection_ranges;
pub mod semantic_tokens;

pub use folding::folding_ranges;
pub use formatting::format_range;
pub use selection_ranges::selection_ranges;
pub use semantic_tokens::{flatten, LegendResponse, SemanticTokenProvider};
