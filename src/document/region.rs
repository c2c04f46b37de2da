//! Language region extraction and offset mapping for embedded languages.
//!
//! This module provides types for tracking CSS and JavaScript embedded within
//! an HTML document, and for mapping between embedded-document coordinates and
//! host document coordinates.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::html::{HtmlDocument, Node};

/// Languages that can appear in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageId {
    Html,
    Css,
    JavaScript,
    TypeScript,
}

impl LanguageId {
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageId::Html => "html",
            LanguageId::Css => "css",
            LanguageId::JavaScript => "javascript",
            LanguageId::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(LanguageId::Html),
            "css" => Ok(LanguageId::Css),
            "javascript" => Ok(LanguageId::JavaScript),
            "typescript" => Ok(LanguageId::TypeScript),
            _ => Err(()),
        }
    }
}

/// Language of a `<script>` element given its `type` attribute.
///
/// `None` means the script holds something this server does not understand
/// (templates, JSON data blocks and so on).
pub fn script_language(script_type: Option<&str>) -> Option<LanguageId> {
    let Some(ty) = script_type else {
        return Some(LanguageId::JavaScript);
    };
    match ty.trim().to_ascii_lowercase().as_str() {
        "" | "module" | "text/javascript" | "application/javascript" | "text/ecmascript"
        | "application/ecmascript" | "text/babel" => Some(LanguageId::JavaScript),
        "text/typescript" => Some(LanguageId::TypeScript),
        _ => None,
    }
}

/// A run of embedded text within the host document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRegion {
    /// Byte offset where the region starts.
    pub start: usize,
    /// Byte offset just past the region.
    pub end: usize,
    /// Language of the region, `None` when unrecognised.
    pub language: Option<LanguageId>,
    /// `true` for attribute values (`style="..."`, `onclick="..."`).
    pub attribute_value: bool,
}

/// A piece of a requested range, attributed to one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpan {
    pub span: Range<usize>,
    /// `None` for a region whose language is unrecognised.
    pub language: Option<LanguageId>,
    pub attribute_value: bool,
}

/// Ordered, non-overlapping language regions of one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentRegions {
    regions: Vec<LanguageRegion>,
    imported_scripts: Vec<String>,
}

impl DocumentRegions {
    /// Extract regions from a parsed document.
    pub fn new(html: &HtmlDocument) -> Self {
        let mut out = Self::default();
        for node in &html.roots {
            out.visit(node);
        }
        out.regions.sort_by_key(|r| r.start);
        out
    }

    fn visit(&mut self, node: &Node) {
        for attribute in &node.attributes {
            let Some(value) = &attribute.value else {
                continue;
            };
            let name = attribute.name.to_ascii_lowercase();
            let language = if name == "style" {
                LanguageId::Css
            } else if name.len() > 2 && name.starts_with("on") {
                LanguageId::JavaScript
            } else {
                continue;
            };
            let range = value.inner_range();
            self.regions.push(LanguageRegion {
                start: range.start,
                end: range.end,
                language: Some(language),
                attribute_value: true,
            });
        }

        if node.is_same_tag("style") {
            if let Some(content) = node.content_range() {
                self.regions.push(LanguageRegion {
                    start: content.start,
                    end: content.end,
                    language: Some(LanguageId::Css),
                    attribute_value: false,
                });
            }
        } else if node.is_same_tag("script") {
            if let Some(src) = node.attribute_value("src") {
                self.imported_scripts.push(src.to_string());
            }
            if let Some(content) = node.content_range() {
                self.regions.push(LanguageRegion {
                    start: content.start,
                    end: content.end,
                    language: script_language(node.attribute_value("type")),
                    attribute_value: false,
                });
            }
        }

        for child in &node.children {
            self.visit(child);
        }
    }

    pub fn regions(&self) -> &[LanguageRegion] {
        &self.regions
    }

    /// Values of `<script src>` attributes in document order.
    pub fn imported_scripts(&self) -> &[String] {
        &self.imported_scripts
    }

    /// Region containing `offset`. The end bound is inclusive so that a cursor
    /// right after the last embedded character still belongs to the region.
    pub fn region_at_offset(&self, offset: usize) -> Option<&LanguageRegion> {
        let idx = self.regions.partition_point(|r| r.start <= offset);
        let region = self.regions.get(idx.checked_sub(1)?)?;
        (offset <= region.end).then_some(region)
    }

    /// Language at `offset`: the owning region's language, or HTML outside
    /// every region.
    pub fn language_at_offset(&self, offset: usize) -> Option<LanguageId> {
        match self.region_at_offset(offset) {
            Some(region) => region.language,
            None => Some(LanguageId::Html),
        }
    }

    /// Distinct languages present, HTML first.
    pub fn languages_in_document(&self) -> Vec<LanguageId> {
        let mut languages = vec![LanguageId::Html];
        for language in self.regions.iter().filter_map(|r| r.language) {
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        languages
    }

    /// Split `span` at region boundaries.
    pub fn language_spans(&self, span: Range<usize>) -> Vec<LanguageSpan> {
        let mut out = Vec::new();
        let mut current = span.start;
        for region in &self.regions {
            if region.end <= current || region.start >= span.end {
                continue;
            }
            if current < region.start {
                out.push(LanguageSpan {
                    span: current..region.start,
                    language: Some(LanguageId::Html),
                    attribute_value: false,
                });
            }
            let end = region.end.min(span.end);
            out.push(LanguageSpan {
                span: region.start.max(current)..end,
                language: region.language,
                attribute_value: region.attribute_value,
            });
            current = end;
        }
        if current < span.end {
            out.push(LanguageSpan {
                span: current..span.end,
                language: Some(LanguageId::Html),
                attribute_value: false,
            });
        }
        out
    }
}

/// Text inserted into an embedded document that has no host counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Embedded offset where the inserted text starts.
    pub at: usize,
    pub len: usize,
    /// `true` when the text opens the following region (a prefix), `false`
    /// when it closes the previous one (a suffix).
    pub leading: bool,
}

/// Maps between embedded document offsets and host document offsets.
///
/// Embedded documents keep every host byte in place. The only difference
/// comes from synthetic prefixes and suffixes that did not fit into the
/// blanked text around an attribute value and had to be inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMapper {
    /// Insertions in ascending embedded order.
    insertions: Vec<Insertion>,
}

impl OffsetMapper {
    pub fn new(insertions: Vec<Insertion>) -> Self {
        Self { insertions }
    }

    /// `true` when embedded and host offsets are identical.
    pub fn is_identity(&self) -> bool {
        self.insertions.is_empty()
    }

    /// Convert an embedded offset to a host offset.
    ///
    /// Offsets inside inserted text collapse onto the host point where the
    /// text was inserted.
    pub fn to_host(&self, embedded: usize) -> usize {
        let mut shift = 0;
        for ins in &self.insertions {
            if embedded >= ins.at + ins.len {
                shift += ins.len;
            } else if embedded > ins.at {
                shift += embedded - ins.at;
                break;
            } else {
                break;
            }
        }
        embedded - shift
    }

    /// Convert a host offset to an embedded offset.
    pub fn to_embedded(&self, host: usize) -> usize {
        let mut shift = 0;
        for ins in &self.insertions {
            let point = ins.at - shift;
            if host > point || (ins.leading && host == point) {
                shift += ins.len;
            } else {
                break;
            }
        }
        host + shift
    }

    /// Convert an embedded span to a host span.
    pub fn span_to_host(&self, span: &Range<usize>) -> Range<usize> {
        self.to_host(span.start)..self.to_host(span.end)
    }
}
