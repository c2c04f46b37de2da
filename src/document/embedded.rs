//! Virtual documents holding one embedded language.

use std::ops::Range as Span;
use std::sync::Arc;

use tower_lsp::lsp_types::{Position, Range, Url};

use super::region::{DocumentRegions, Insertion, LanguageId, LanguageRegion, OffsetMapper};
use super::text::LineIndex;

/// A copy of a host document where everything outside one language has been
/// blanked out.
///
/// Every host byte stays at its offset: line breaks are kept and all other
/// bytes outside the language become spaces. Positions are converted through
/// the host line index, so lines and UTF-16 columns match the host exactly.
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    uri: Url,
    language: LanguageId,
    version: i32,
    text: String,
    mapper: OffsetMapper,
    host: Arc<LineIndex>,
}

impl EmbeddedDocument {
    /// Build the embedded document for `language`.
    ///
    /// With `ignore_attribute_values` set, attribute-value regions are blanked
    /// like host text.
    pub fn build(
        uri: Url,
        version: i32,
        host: Arc<LineIndex>,
        regions: &DocumentRegions,
        language: LanguageId,
        ignore_attribute_values: bool,
    ) -> Self {
        let source = host.source();
        let mut builder = Builder {
            source,
            text: String::with_capacity(source.len()),
            insertions: Vec::new(),
        };

        let mut pos = 0;
        let mut suffix = "";
        for region in regions.regions() {
            if region.language != Some(language)
                || (ignore_attribute_values && region.attribute_value)
            {
                continue;
            }
            builder.gap(pos, region.start, suffix, prefix(language, region));
            builder.text.push_str(&source[region.start..region.end]);
            pos = region.end;
            suffix = self::suffix(language, region);
        }
        builder.gap(pos, source.len(), suffix, "");

        Self {
            uri,
            language,
            version,
            text: builder.text,
            mapper: OffsetMapper::new(builder.insertions),
            host,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mapper(&self) -> &OffsetMapper {
        &self.mapper
    }

    /// Host line index backing position conversion.
    pub fn host_index(&self) -> &LineIndex {
        &self.host
    }

    /// Position of an embedded offset.
    pub fn position_at(&self, offset: usize) -> Position {
        self.host.offset_to_position(self.mapper.to_host(offset))
    }

    /// Embedded offset of a position, clamped to the document.
    pub fn offset_at(&self, position: Position) -> usize {
        self.mapper
            .to_embedded(self.host.clamped_offset(position))
            .min(self.text.len())
    }

    pub fn span_to_range(&self, span: &Span<usize>) -> Range {
        Range::new(self.position_at(span.start), self.position_at(span.end))
    }

    pub fn range_to_span(&self, range: &Range) -> Span<usize> {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        start..end
    }
}

fn prefix(language: LanguageId, region: &LanguageRegion) -> &'static str {
    match (language, region.attribute_value) {
        (LanguageId::Css, true) => "__{",
        _ => "",
    }
}

fn suffix(language: LanguageId, region: &LanguageRegion) -> &'static str {
    match (language, region.attribute_value) {
        (LanguageId::Css, true) => "}",
        (LanguageId::JavaScript | LanguageId::TypeScript, true) => ";",
        _ => "",
    }
}

struct Builder<'a> {
    source: &'a str,
    text: String,
    insertions: Vec<Insertion>,
}

impl Builder<'_> {
    /// Blank `source[start..end]`, placing `suffix` at the start of the gap
    /// and `prefix` at its end. Affixes that do not fit on the gap's first or
    /// last line are inserted instead.
    fn gap(&mut self, start: usize, end: usize, suffix: &str, prefix: &str) {
        let mut blank: Vec<u8> = self.source.as_bytes()[start..end]
            .iter()
            .map(|&b| if b == b'\n' || b == b'\r' { b } else { b' ' })
            .collect();

        let first_line = blank
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(blank.len());
        let last_line = blank
            .iter()
            .rposition(|&b| b == b'\n' || b == b'\r')
            .map_or(0, |i| i + 1);

        let suffix_fits = suffix.len() <= first_line;
        if suffix_fits {
            blank[..suffix.len()].copy_from_slice(suffix.as_bytes());
        }
        let free_from = if suffix_fits {
            last_line.max(suffix.len())
        } else {
            last_line
        };
        let prefix_fits = blank.len() - free_from >= prefix.len();
        if prefix_fits {
            let at = blank.len() - prefix.len();
            blank[at..].copy_from_slice(prefix.as_bytes());
        }

        if !suffix_fits {
            self.insert(suffix, false);
        }
        // Only ASCII spaces, line breaks and ASCII affixes were written.
        self.text.extend(blank.iter().map(|&b| b as char));
        if !prefix_fits {
            self.insert(prefix, true);
        }
    }

    fn insert(&mut self, affix: &str, leading: bool) {
        self.insertions.push(Insertion {
            at: self.text.len(),
            len: affix.len(),
            leading,
        });
        self.text.push_str(affix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse;

    fn embedded(text: &str, language: LanguageId, ignore_attributes: bool) -> EmbeddedDocument {
        let host = Arc::new(LineIndex::new(text.to_string()));
        let regions = DocumentRegions::new(&parse(text));
        EmbeddedDocument::build(
            Url::parse("file:///test.html").expect("valid url"),
            1,
            host,
            &regions,
            language,
            ignore_attributes,
        )
    }

    fn spaces(n: usize) -> String {
        " ".repeat(n)
    }

    #[test]
    fn blanks_everything_outside_the_language() {
        let doc = embedded(
            "<html><style>.a{}</style><script>var x=1;</script></html>",
            LanguageId::Css,
            false,
        );
        assert_eq!(doc.text(), format!("{}.a{{}}{}", spaces(13), spaces(40)));
        assert!(doc.mapper().is_identity());
    }

    #[test]
    fn keeps_line_breaks() {
        let text = "<style>\r\n  a { }\n</style>\n<p></p>";
        let doc = embedded(text, LanguageId::Css, false);
        assert_eq!(doc.text().len(), text.len());
        assert_eq!(
            doc.text(),
            format!("{}\r\n  a {{ }}\n{}\n{}", spaces(7), spaces(8), spaces(7))
        );
    }

    #[test]
    fn attribute_affixes_are_written_into_the_gap() {
        let doc = embedded(r#"<div style="color:red"></div>"#, LanguageId::Css, false);
        assert_eq!(doc.text(), format!("{}__{{color:red}}{}", spaces(9), spaces(7)));
        assert!(doc.mapper().is_identity());

        let js = embedded(r#"<b onclick="go()"></b>"#, LanguageId::JavaScript, false);
        assert_eq!(js.text(), format!("{}go();{}", spaces(12), spaces(5)));
    }

    #[test]
    fn attribute_values_can_be_ignored() {
        let doc = embedded(r#"<p style="a:b"></p><style>p{}</style>"#, LanguageId::Css, true);
        assert_eq!(doc.text().trim(), "p{}");
    }

    #[test]
    fn short_gap_falls_back_to_insertion() {
        // The line holding the value has no room for the prefix.
        let text = "<p style=\n\"a:b\"></p>";
        let doc = embedded(text, LanguageId::Css, false);
        assert!(!doc.mapper().is_identity());
        assert!(doc.text().contains("__{a:b}"));

        let value = text.find("a:b").expect("value present");
        let embedded_value = doc.text().find("a:b").expect("value present");
        assert_eq!(doc.offset_at(doc.host_index().offset_to_position(value)), embedded_value);
        assert_eq!(embedded_value, value + 3);
        assert_eq!(doc.position_at(embedded_value), Position::new(1, 1));
    }

    #[test]
    fn positions_round_trip() {
        let text = "<html>\n<style>\n  .a { color: red }\n</style>\n\
                    <script>\nlet é = 1;\n</script>\n</html>";
        for language in [LanguageId::Css, LanguageId::JavaScript] {
            let doc = embedded(text, language, false);
            let host = LineIndex::new(text.to_string());
            for offset in (0..=text.len()).filter(|o| text.is_char_boundary(*o)) {
                let position = host.offset_to_position(offset);
                let back = doc.position_at(doc.offset_at(position));
                assert_eq!(back, position, "{language} at {offset}");
            }
        }
    }
}
