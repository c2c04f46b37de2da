//! Semantic tokens merged from every mode.
//!
//! Each mode reports tokens against its own legend. The server advertises the
//! union of all legends and remaps every token into it before encoding.

use std::ops::Range as Span;

use serde::Serialize;
use tower_lsp::lsp_types::{Position, Range, SemanticToken, SemanticTokensLegend};

use crate::document::{DocumentState, LanguageId};
use crate::error::Result;
use crate::modes::{Capability, LanguageModes};

/// A token in host coordinates, before delta encoding. `token_type` and
/// `modifiers` refer to the legend of the mode that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticTokenData {
    pub start: Position,
    pub length: u32,
    pub token_type: u32,
    pub modifiers: u32,
}

/// Answer to `html/semanticTokenLegend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendResponse {
    pub types: Vec<String>,
    pub modifiers: Vec<String>,
}

/// Index translation from one mode's legend into the global one.
#[derive(Debug, Clone)]
struct LegendMapping {
    types: Vec<u32>,
    /// Global bit index of each local modifier bit.
    modifiers: Vec<u32>,
}

impl LegendMapping {
    fn modifiers(&self, local: u32) -> u32 {
        self.modifiers
            .iter()
            .enumerate()
            .filter(|(bit, _)| local & (1 << bit) != 0)
            .fold(0, |acc, (_, global)| acc | (1 << global))
    }
}

#[derive(Debug, Clone)]
pub struct SemanticTokenProvider {
    legend: SemanticTokensLegend,
    mappings: Vec<(LanguageId, LegendMapping)>,
}

impl SemanticTokenProvider {
    /// Build the global legend from the modes' legends in registration order.
    pub fn new(modes: &LanguageModes) -> Self {
        let mut legend = SemanticTokensLegend {
            token_types: Vec::new(),
            token_modifiers: Vec::new(),
        };
        let mut mappings = Vec::new();
        for mode in modes.all_modes() {
            let Some(local) = mode.semantic_token_legend() else {
                continue;
            };
            let types = local
                .token_types
                .iter()
                .map(|t| intern(&mut legend.token_types, t))
                .collect();
            let modifiers = local
                .token_modifiers
                .iter()
                .map(|m| intern(&mut legend.token_modifiers, m))
                .collect();
            mappings.push((mode.id(), LegendMapping { types, modifiers }));
        }
        Self { legend, mappings }
    }

    pub fn legend(&self) -> &SemanticTokensLegend {
        &self.legend
    }

    pub fn legend_response(&self) -> LegendResponse {
        LegendResponse {
            types: self
                .legend
                .token_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            modifiers: self
                .legend
                .token_modifiers
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
        }
    }

    fn mapping(&self, language: LanguageId) -> Option<&LegendMapping> {
        self.mappings
            .iter()
            .find(|(id, _)| *id == language)
            .map(|(_, mapping)| mapping)
    }

    /// Encoded tokens for `ranges`, or for the whole document.
    pub async fn tokens(
        &self,
        modes: &LanguageModes,
        doc: &DocumentState,
        ranges: Option<&[Range]>,
    ) -> Result<Vec<SemanticToken>> {
        let index = doc.line_index();
        let regions = doc.regions();
        let spans = match ranges {
            Some(ranges) => ranges
                .iter()
                .flat_map(|r| regions.language_spans(index.range_to_span(r)))
                .collect(),
            None => regions.language_spans(0..doc.text().len()),
        };

        let mut tokens = Vec::new();
        for mode in modes.all_modes_in_document(doc) {
            if !mode.supports(Capability::SemanticTokens) {
                continue;
            }
            let Some(mapping) = self.mapping(mode.id()) else {
                continue;
            };
            let own: Vec<&Span<usize>> = spans
                .iter()
                .filter(|s| s.language == Some(mode.id()))
                .map(|s| &s.span)
                .collect();
            if own.is_empty() {
                continue;
            }
            for token in mode.get_semantic_tokens(doc).await? {
                let offset = index.clamped_offset(token.start);
                if !own.iter().any(|s| s.start <= offset && offset < s.end) {
                    continue;
                }
                let Some(&token_type) = mapping.types.get(token.token_type as usize) else {
                    continue;
                };
                tokens.push(SemanticTokenData {
                    token_type,
                    modifiers: mapping.modifiers(token.modifiers),
                    ..token
                });
            }
        }
        tokens.sort_by_key(|t| (t.start.line, t.start.character));
        Ok(encode_tokens(&tokens))
    }
}

fn intern<T: PartialEq + Clone>(list: &mut Vec<T>, value: &T) -> u32 {
    match list.iter().position(|v| v == value) {
        Some(i) => i as u32,
        None => {
            list.push(value.clone());
            (list.len() - 1) as u32
        }
    }
}

/// Convert sorted tokens to delta-encoded semantic tokens.
pub fn encode_tokens(tokens: &[SemanticTokenData]) -> Vec<SemanticToken> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;

    for token in tokens {
        let pos = token.start;
        let delta_line = pos.line - prev_line;
        let delta_start = if delta_line == 0 {
            pos.character - prev_start
        } else {
            pos.character
        };

        result.push(SemanticToken {
            delta_line,
            delta_start,
            length: token.length,
            token_type: token.token_type,
            token_modifiers_bitset: token.modifiers,
        });

        prev_line = pos.line;
        prev_start = pos.character;
    }

    result
}

/// Flatten encoded tokens into the `number[]` wire shape.
pub fn flatten(tokens: &[SemanticToken]) -> Vec<u32> {
    tokens
        .iter()
        .flat_map(|t| {
            [
                t.delta_line,
                t.delta_start,
                t.length,
                t.token_type,
                t.token_modifiers_bitset,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EmbeddedLanguages;
    use tower_lsp::lsp_types::Url;

    fn modes() -> LanguageModes {
        LanguageModes::new(&EmbeddedLanguages {
            css: true,
            javascript: true,
        })
    }

    fn doc(text: &str) -> DocumentState {
        DocumentState::new(Url::parse("file:///t.html").unwrap(), "html", 1, text.to_string())
    }

    #[test]
    fn legend_is_union_in_registration_order() {
        let provider = SemanticTokenProvider::new(&modes());
        let legend = provider.legend_response();
        assert_eq!(
            legend.types,
            vec![
                "property",
                "variable",
                "keyword",
                "number",
                "string",
                "class",
                "function",
                "method",
                "parameter"
            ]
        );
        assert_eq!(legend.modifiers, vec!["declaration", "readonly", "defaultLibrary"]);
    }

    #[test]
    fn modifier_bits_are_remapped() {
        let mapping = LegendMapping {
            types: vec![],
            modifiers: vec![0, 2, 5],
        };
        assert_eq!(mapping.modifiers(0b011), 0b101);
        assert_eq!(mapping.modifiers(0b100), 1 << 5);
        assert_eq!(mapping.modifiers(0), 0);
    }

    #[test]
    fn encodes_deltas() {
        let token = |line, character, length| SemanticTokenData {
            start: Position::new(line, character),
            length,
            token_type: 0,
            modifiers: 0,
        };
        let encoded = encode_tokens(&[token(0, 4, 2), token(0, 10, 1), token(2, 3, 5)]);
        let deltas: Vec<_> = encoded
            .iter()
            .map(|t| (t.delta_line, t.delta_start, t.length))
            .collect();
        assert_eq!(deltas, vec![(0, 4, 2), (0, 6, 1), (2, 3, 5)]);
        assert_eq!(flatten(&encoded[..1]), vec![0, 4, 2, 0, 0]);
    }

    #[tokio::test]
    async fn merges_modes_in_document_order() {
        let modes = modes();
        let provider = SemanticTokenProvider::new(&modes);
        let doc = doc("<script>let a;</script>\n<style>.b{color:red}</style>");
        let tokens = provider.tokens(&modes, &doc, None).await.unwrap();
        let types: Vec<_> = tokens
            .iter()
            .map(|t| (t.token_type, t.token_modifiers_bitset))
            .collect();
        // variable `a` (js), then class `b` and property `color` (css)
        assert_eq!(types, vec![(1, 1), (5, 0), (0, 0)]);
        assert_eq!(tokens[1].delta_line, 1);
    }

    #[tokio::test]
    async fn ranges_restrict_output() {
        let modes = modes();
        let provider = SemanticTokenProvider::new(&modes);
        let doc = doc("<script>let a;</script>\n<style>.b{color:red}</style>");
        let second_line = Range::new(Position::new(1, 0), Position::new(1, 30));
        let tokens = provider
            .tokens(&modes, &doc, Some(&[second_line]))
            .await
            .unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].delta_line, 1);
    }
}
