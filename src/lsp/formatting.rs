//! Range formatting split across the modes owning the range.

use tower_lsp::lsp_types::{FormattingOptions, Range, TextEdit};

use crate::document::{DocumentState, LanguageId};
use crate::error::Result;
use crate::modes::{Capability, LanguageModes};
use crate::settings::{HtmlSettings, Settings};

/// Host tag whose listing in `html.format.unformatted` disables a language.
fn guarding_tag(language: LanguageId) -> Option<&'static str> {
    match language {
        LanguageId::Css => Some("style"),
        LanguageId::JavaScript | LanguageId::TypeScript => Some("script"),
        LanguageId::Html => None,
    }
}

fn is_disabled(language: LanguageId, html: &HtmlSettings) -> bool {
    guarding_tag(language).is_some_and(|tag| html.format.is_unformatted(tag))
}

/// Edits for `range`, concatenated in span order.
pub async fn format_range(
    modes: &LanguageModes,
    doc: &DocumentState,
    range: Range,
    options: &FormattingOptions,
    settings: &Settings,
) -> Result<Vec<TextEdit>> {
    let html = settings.html_or_default();
    let mut edits = Vec::new();
    for span in modes.modes_in_range(doc, range) {
        if span.attribute_value {
            continue;
        }
        let Some(mode) = span.mode else {
            continue;
        };
        if !mode.supports(Capability::Format) {
            continue;
        }
        if is_disabled(mode.id(), &html) {
            tracing::debug!(
                language = %mode.id(),
                "formatting disabled by html.format.unformatted"
            );
            continue;
        }
        edits.extend(mode.format(doc, span.range, options, settings).await?);
    }
    Ok(edits)
}
