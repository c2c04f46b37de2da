//! Document state management and text utilities.
//!
//! This module provides:
//! - `LineIndex` for efficient byte offset <-> LSP position conversion
//! - `DocumentRegions` and `OffsetMapper` for CSS and JavaScript embedded in HTML
//! - `EmbeddedDocument` virtual documents for one embedded language
//! - `DocumentState` and `DocumentStore` for document lifecycle management

mod embedded;
mod region;
mod state;
mod text;

pub use embedded::EmbeddedDocument;
pub use region::{
    script_language, DocumentRegions, Insertion, LanguageId, LanguageRegion, LanguageSpan,
    OffsetMapper,
};
pub use state::{DocumentState, DocumentStore};
pub use text::{apply_content_changes, before_or_same, inside_range_but_not_same, LineIndex};
