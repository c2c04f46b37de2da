//! Mode registry and position/range dispatch.

use std::sync::Arc;

use tower_lsp::lsp_types::{Position, Range, Url};

use crate::document::{DocumentState, LanguageId};
use crate::settings::EmbeddedLanguages;

use super::{CssMode, HtmlMode, JavaScriptMode, LanguageMode};

/// A piece of a requested range together with the mode that owns it.
#[derive(Clone)]
pub struct LanguageModeRange {
    pub range: Range,
    /// `None` when the region's language has no configured mode.
    pub mode: Option<Arc<dyn LanguageMode>>,
    pub language: Option<LanguageId>,
    pub attribute_value: bool,
}

impl std::fmt::Debug for LanguageModeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModeRange")
            .field("range", &self.range)
            .field("mode", &self.mode.as_ref().map(|m| m.id()))
            .field("language", &self.language)
            .field("attribute_value", &self.attribute_value)
            .finish()
    }
}

/// Registration-ordered set of modes for one session.
pub struct LanguageModes {
    modes: Vec<Arc<dyn LanguageMode>>,
}

impl LanguageModes {
    /// HTML, then every enabled embedded language.
    pub fn new(embedded: &EmbeddedLanguages) -> Self {
        let mut modes: Vec<Arc<dyn LanguageMode>> = vec![Arc::new(HtmlMode::new())];
        if embedded.css {
            modes.push(Arc::new(CssMode::new()));
        }
        if embedded.javascript {
            modes.push(Arc::new(JavaScriptMode::new(LanguageId::JavaScript)));
            modes.push(Arc::new(JavaScriptMode::new(LanguageId::TypeScript)));
        }
        Self { modes }
    }

    /// Registry over an explicit mode list, first one being the host.
    pub fn from_modes(modes: Vec<Arc<dyn LanguageMode>>) -> Self {
        Self { modes }
    }

    pub fn all_modes(&self) -> &[Arc<dyn LanguageMode>] {
        &self.modes
    }

    pub fn mode(&self, id: LanguageId) -> Option<Arc<dyn LanguageMode>> {
        self.modes.iter().find(|m| m.id() == id).cloned()
    }

    /// Mode owning `position`, or the host mode outside every region.
    pub fn mode_at_position(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Option<Arc<dyn LanguageMode>> {
        let offset = doc.offset_at(position);
        let language = doc.regions().language_at_offset(offset)?;
        self.mode(language)
    }

    /// `range` split at region boundaries, in document order.
    pub fn modes_in_range(&self, doc: &DocumentState, range: Range) -> Vec<LanguageModeRange> {
        let index = doc.line_index();
        doc.regions()
            .language_spans(index.range_to_span(&range))
            .into_iter()
            .map(|span| LanguageModeRange {
                range: index.span_to_range(&span.span),
                mode: span.language.and_then(|language| self.mode(language)),
                language: span.language,
                attribute_value: span.attribute_value,
            })
            .collect()
    }

    /// Modes whose language appears in `doc`, host included, in
    /// registration order.
    pub fn all_modes_in_document(&self, doc: &DocumentState) -> Vec<Arc<dyn LanguageMode>> {
        let languages = doc.regions().languages_in_document();
        self.modes
            .iter()
            .filter(|m| languages.contains(&m.id()))
            .cloned()
            .collect()
    }

    pub fn on_document_removed(&self, uri: &Url) {
        for mode in &self.modes {
            mode.on_document_removed(uri);
        }
    }

    pub fn dispose(&self) {
        for mode in &self.modes {
            mode.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> DocumentState {
        DocumentState::new(Url::parse("file:///t.html").unwrap(), "html", 1, text.to_string())
    }

    fn all() -> EmbeddedLanguages {
        EmbeddedLanguages {
            css: true,
            javascript: true,
        }
    }

    fn ids(modes: &[Arc<dyn LanguageMode>]) -> Vec<LanguageId> {
        modes.iter().map(|m| m.id()).collect()
    }

    #[test]
    fn registration_order_follows_options() {
        let modes = LanguageModes::new(&all());
        assert_eq!(
            ids(modes.all_modes()),
            vec![
                LanguageId::Html,
                LanguageId::Css,
                LanguageId::JavaScript,
                LanguageId::TypeScript
            ]
        );
        let css_only = LanguageModes::new(&EmbeddedLanguages {
            css: true,
            javascript: false,
        });
        assert_eq!(ids(css_only.all_modes()), vec![LanguageId::Html, LanguageId::Css]);
        assert!(css_only.mode(LanguageId::JavaScript).is_none());
    }

    #[test]
    fn mode_at_position_picks_owning_region() {
        let modes = LanguageModes::new(&all());
        let doc = doc("<html><style>.a{}</style><script>var x=1;</script></html>");
        let at = |character| {
            modes
                .mode_at_position(&doc, Position::new(0, character))
                .map(|m| m.id())
        };
        assert_eq!(at(2), Some(LanguageId::Html));
        assert_eq!(at(14), Some(LanguageId::Css));
        assert_eq!(at(36), Some(LanguageId::JavaScript));
        assert_eq!(at(52), Some(LanguageId::Html));
    }

    #[test]
    fn unknown_script_type_has_no_mode() {
        let modes = LanguageModes::new(&all());
        let doc = doc("<script type=\"text/template\">{{x}}</script>");
        assert!(modes.mode_at_position(&doc, Position::new(0, 31)).is_none());
    }

    #[test]
    fn disabled_language_has_no_mode() {
        let modes = LanguageModes::new(&EmbeddedLanguages {
            css: false,
            javascript: true,
        });
        let doc = doc("<style>a{}</style>");
        assert!(modes.mode_at_position(&doc, Position::new(0, 8)).is_none());
        assert_eq!(ids(&modes.all_modes_in_document(&doc)), vec![LanguageId::Html]);
    }

    #[test]
    fn splits_ranges_at_region_boundaries() {
        let modes = LanguageModes::new(&all());
        let doc = doc("<p style=\"color:red\">x</p>");
        let parts = modes.modes_in_range(&doc, doc.line_index().full_range());
        let summary: Vec<_> = parts
            .iter()
            .map(|p| {
                (
                    p.range.start.character,
                    p.range.end.character,
                    p.language,
                    p.attribute_value,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, 10, Some(LanguageId::Html), false),
                (10, 19, Some(LanguageId::Css), true),
                (19, 26, Some(LanguageId::Html), false),
            ]
        );
        assert!(parts.iter().all(|p| p.mode.is_some()));
    }

    #[test]
    fn modes_in_document_keep_registration_order() {
        let modes = LanguageModes::new(&all());
        let doc = doc("<script>a()</script><style>b{}</style>");
        assert_eq!(
            ids(&modes.all_modes_in_document(&doc)),
            vec![LanguageId::Html, LanguageId::Css, LanguageId::JavaScript]
        );
    }
}
