//! CSS language service.
//!
//! Works on a tolerant parse of the embedded stylesheet. Style attributes
//! arrive wrapped as `__{ ... }`; that synthetic rule is parsed like any other
//! but never reported as a symbol or an empty rule.

use std::ops::Range as Span;

use serde_json::json;
use tower_lsp::lsp_types::{
    Color, ColorInformation, ColorPresentation, CompletionItem, CompletionItemKind, CompletionList,
    CompletionTextEdit, Diagnostic, DiagnosticSeverity, DocumentHighlight, DocumentHighlightKind,
    Documentation, FoldingRange, Hover, HoverContents, InsertTextFormat, Location, MarkupContent,
    MarkupKind, NumberOrString, Range, SelectionRange, SemanticTokenModifier, SemanticTokenType,
    SemanticTokensLegend, SymbolInformation, SymbolKind, TextEdit,
};

use crate::document::EmbeddedDocument;
use crate::lsp::semantic_tokens::SemanticTokenData;

use super::{bracket_pairs, folding_ranges, region_marker, reindent, selection_chain, word_at};

mod data;
mod parser;

pub use parser::{tokenize, CssToken, CssTokenKind, Declaration, Rule, Stylesheet};

use parser::{is_ident_byte, ProblemKind};

const SOURCE: &str = "css";
const SPECIFICITY_DOCS: &str = "https://developer.mozilla.org/docs/Web/CSS/Specificity";

/// Tokens and parse tree of one embedded stylesheet.
#[derive(Debug, Clone)]
pub struct CssAnalysis {
    tokens: Vec<CssToken>,
    stylesheet: Stylesheet,
}

impl CssAnalysis {
    pub fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let stylesheet = parser::parse(text, &tokens);
        Self { tokens, stylesheet }
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    /// Identifier touching `offset`.
    fn ident_at(&self, offset: usize) -> Option<&CssToken> {
        self.tokens.iter().find(|t| {
            t.kind == CssTokenKind::Ident && t.span.start <= offset && offset <= t.span.end
        })
    }

    /// Tokens lying inside `span`.
    fn tokens_in(&self, span: &Span<usize>) -> &[CssToken] {
        let from = self.tokens.partition_point(|t| t.span.start < span.start);
        let to = self.tokens.partition_point(|t| t.span.end <= span.end);
        &self.tokens[from..to.max(from)]
    }
}

fn is_synthetic(rule: &Rule) -> bool {
    rule.prelude.starts_with("__")
}

fn is_known_property(name: &str) -> bool {
    name.starts_with('-') || data::property(name).is_some()
}

fn diagnostic(
    doc: &EmbeddedDocument,
    span: &Span<usize>,
    severity: DiagnosticSeverity,
    code: &str,
    message: String,
) -> Diagnostic {
    Diagnostic {
        range: doc.span_to_range(span),
        severity: Some(severity),
        code: Some(NumberOrString::String(code.to_string())),
        source: Some(SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

/// Syntax errors, unknown properties and empty rulesets.
pub fn validate(doc: &EmbeddedDocument, analysis: &CssAnalysis) -> Vec<Diagnostic> {
    let stylesheet = analysis.stylesheet();
    let mut diagnostics: Vec<Diagnostic> = stylesheet
        .problems
        .iter()
        .map(|p| {
            let code = match p.kind {
                ProblemKind::RBraceExpected => "css-rcurlyexpected",
                ProblemKind::LBraceExpected => "css-lcurlyexpected",
                ProblemKind::ColonExpected => "css-colonexpected",
                ProblemKind::UnexpectedRBrace => "css-ruleorselectorexpected",
                ProblemKind::UnterminatedString => "css-unterminatedstring",
            };
            diagnostic(doc, &p.span, DiagnosticSeverity::ERROR, code, p.kind.message().to_string())
        })
        .collect();

    for (rule, _) in stylesheet.all_rules() {
        if !rule.at_rule
            && !is_synthetic(rule)
            && rule.declarations.is_empty()
            && rule.children.is_empty()
        {
            diagnostics.push(diagnostic(
                doc,
                &rule.prelude_span,
                DiagnosticSeverity::WARNING,
                "emptyRules",
                "Do not use empty rulesets".to_string(),
            ));
        }
        for declaration in &rule.declarations {
            if !is_known_property(&declaration.property) {
                diagnostics.push(diagnostic(
                    doc,
                    &declaration.property_span,
                    DiagnosticSeverity::WARNING,
                    "unknownProperties",
                    format!("Unknown property: '{}'", declaration.property),
                ));
            }
        }
    }
    diagnostics.sort_by_key(|d| (d.range.start.line, d.range.start.character));
    diagnostics
}

enum CompletionContext<'a> {
    Property,
    Value(&'a str),
    Selector,
}

fn completion_context<'a>(
    text: &'a str,
    analysis: &'a CssAnalysis,
    word_start: usize,
) -> CompletionContext<'a> {
    let block = analysis
        .stylesheet()
        .rules_at(word_start)
        .into_iter()
        .rev()
        .find(|r| r.body.start < word_start && word_start <= r.inner().end);
    let Some(block) = block else {
        return CompletionContext::Selector;
    };
    if !block.holds_declarations() {
        return CompletionContext::Selector;
    }

    let tokens = analysis.tokens_in(&(block.body.start + 1..word_start));
    let mut significant = tokens
        .iter()
        .rev()
        .filter(|t| !matches!(t.kind, CssTokenKind::Whitespace | CssTokenKind::Comment));
    while let Some(token) = significant.next() {
        match token.kind {
            CssTokenKind::Colon => {
                return match significant.next() {
                    Some(t) if t.kind == CssTokenKind::Ident => {
                        CompletionContext::Value(&text[t.span.clone()])
                    }
                    _ => CompletionContext::Value(""),
                };
            }
            CssTokenKind::Semicolon | CssTokenKind::LBrace | CssTokenKind::RBrace => break,
            _ => {}
        }
    }
    CompletionContext::Property
}

fn item(
    label: &str,
    kind: CompletionItemKind,
    range: Range,
    new_text: String,
    snippet: bool,
) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit { range, new_text })),
        insert_text_format: snippet.then_some(InsertTextFormat::SNIPPET),
        data: Some(json!({ "languageId": SOURCE })),
        ..Default::default()
    }
}

/// Completion at `offset`: properties, property values or selectors.
pub fn complete(doc: &EmbeddedDocument, analysis: &CssAnalysis, offset: usize) -> CompletionList {
    let text = doc.text();
    let word = word_at(text, offset, is_ident_byte).unwrap_or(offset..offset);
    let range = doc.span_to_range(&word);

    let mut items = Vec::new();
    match completion_context(text, analysis, word.start) {
        CompletionContext::Property => {
            for property in data::PROPERTIES {
                items.push(item(
                    property.name,
                    CompletionItemKind::PROPERTY,
                    range,
                    format!("{}: $0;", property.name),
                    true,
                ));
            }
        }
        CompletionContext::Value(property) => {
            let known = data::property(property);
            for value in known.map_or(&[][..], |p| p.values).iter().chain(data::GLOBAL_VALUES) {
                match value.strip_suffix("()") {
                    Some(function) => items.push(item(
                        value,
                        CompletionItemKind::FUNCTION,
                        range,
                        format!("{function}($1)"),
                        true,
                    )),
                    None => items.push(item(
                        value,
                        CompletionItemKind::VALUE,
                        range,
                        value.to_string(),
                        false,
                    )),
                }
            }
            if data::takes_color(property) {
                for (name, r, g, b) in data::NAMED_COLORS {
                    let insert = name.to_string();
                    let mut color = item(name, CompletionItemKind::COLOR, range, insert, false);
                    let hex = format!("#{r:02x}{g:02x}{b:02x}");
                    color.documentation = Some(Documentation::String(hex));
                    items.push(color);
                }
            }
        }
        CompletionContext::Selector => {
            if word.start > 0 && text.as_bytes()[word.start - 1] == b'@' {
                let range = doc.span_to_range(&(word.start - 1..word.end));
                for at_rule in data::AT_RULES {
                    let insert = at_rule.to_string();
                    items.push(item(at_rule, CompletionItemKind::KEYWORD, range, insert, false));
                }
            } else {
                for tag in crate::html::data::TAGS {
                    let insert = tag.name.to_string();
                    items.push(item(tag.name, CompletionItemKind::KEYWORD, range, insert, false));
                }
            }
        }
    }
    CompletionList {
        is_incomplete: false,
        items,
    }
}

/// Fill in property documentation left out of the completion list.
pub fn resolve(mut item: CompletionItem) -> CompletionItem {
    if item.documentation.is_none() && item.kind == Some(CompletionItemKind::PROPERTY) {
        if let Some(property) = data::property(&item.label) {
            item.documentation = Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: property.description.to_string(),
            }));
        }
    }
    item
}

fn markdown_hover(value: String, range: Range) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: Some(range),
    }
}

/// Property documentation or selector specificity.
pub fn hover(doc: &EmbeddedDocument, analysis: &CssAnalysis, offset: usize) -> Option<Hover> {
    let stylesheet = analysis.stylesheet();
    if let Some(declaration) = stylesheet.declaration_at(offset) {
        if offset > declaration.property_span.end {
            return None;
        }
        let property = data::property(&declaration.property)?;
        return Some(markdown_hover(
            format!("**{}**\n\n{}", property.name, property.description),
            doc.span_to_range(&declaration.property_span),
        ));
    }

    let rule = stylesheet
        .rules_at(offset)
        .into_iter()
        .rev()
        .find(|r| r.prelude_span.start <= offset && offset <= r.prelude_span.end)?;
    if rule.at_rule || is_synthetic(rule) {
        return None;
    }
    let text = doc.text();
    let (selector, span) = selector_at(text, &rule.prelude_span, offset);
    let (a, b, c) = specificity(selector);
    Some(markdown_hover(
        format!(
            "```css\n{selector}\n```\n[Selector Specificity]({SPECIFICITY_DOCS}): ({a}, {b}, {c})"
        ),
        doc.span_to_range(&span),
    ))
}

/// The comma-separated selector of a prelude that contains `offset`.
fn selector_at<'a>(text: &'a str, prelude: &Span<usize>, offset: usize) -> (&'a str, Span<usize>) {
    let mut start = prelude.start;
    for (i, b) in text[prelude.clone()].bytes().enumerate() {
        let at = prelude.start + i;
        if b == b',' {
            if offset <= at {
                break;
            }
            start = at + 1;
        }
    }
    let end = text[start..prelude.end].find(',').map_or(prelude.end, |i| start + i);
    let raw = &text[start..end];
    let trimmed = raw.trim();
    let lead = raw.len() - raw.trim_start().len();
    (trimmed, start + lead..start + lead + trimmed.len())
}

/// Selector specificity as (ids, classes, elements).
pub fn specificity(selector: &str) -> (u32, u32, u32) {
    let bytes = selector.as_bytes();
    let (mut a, mut b, mut c) = (0, 0, 0);
    let skip_ident = |mut i: usize| {
        while i < bytes.len() && is_ident_byte(bytes[i]) {
            i += 1;
        }
        i
    };
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                a += 1;
                i = skip_ident(i + 1);
            }
            b'.' => {
                b += 1;
                i = skip_ident(i + 1);
            }
            b'[' => {
                b += 1;
                i = selector[i..].find(']').map_or(bytes.len(), |p| i + p + 1);
            }
            b':' if bytes.get(i + 1) == Some(&b':') => {
                c += 1;
                i = skip_ident(i + 2);
            }
            b':' => {
                let name_end = skip_ident(i + 1);
                let name = selector[i + 1..name_end].to_ascii_lowercase();
                i = name_end;
                let mut argument = None;
                if bytes.get(i) == Some(&b'(') {
                    let close = matching_paren(bytes, i);
                    argument = Some(&selector[i + 1..close.min(bytes.len())]);
                    i = (close + 1).min(bytes.len());
                }
                match (name.as_str(), argument) {
                    ("not" | "is" | "has", Some(argument)) => {
                        let max = argument.split(',').map(specificity).max().unwrap_or_default();
                        a += max.0;
                        b += max.1;
                        c += max.2;
                    }
                    ("where", _) => {}
                    _ => b += 1,
                }
            }
            x if x.is_ascii_alphabetic() => {
                c += 1;
                i = skip_ident(i);
            }
            _ => i += 1,
        }
    }
    (a, b, c)
}

fn matching_paren(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    bytes.len()
}

#[allow(deprecated)]
fn symbol(
    name: String,
    kind: SymbolKind,
    location: Location,
    container_name: Option<String>,
) -> SymbolInformation {
    SymbolInformation {
        name,
        kind,
        tags: None,
        deprecated: None,
        location,
        container_name,
    }
}

/// Rules and custom property declarations.
pub fn symbols(doc: &EmbeddedDocument, analysis: &CssAnalysis) -> Vec<SymbolInformation> {
    fn visit(
        doc: &EmbeddedDocument,
        rules: &[Rule],
        container: Option<&str>,
        out: &mut Vec<SymbolInformation>,
    ) {
        for rule in rules.iter().filter(|r| !is_synthetic(r)) {
            let kind = if rule.at_rule {
                SymbolKind::MODULE
            } else {
                SymbolKind::CLASS
            };
            out.push(symbol(
                rule.prelude.clone(),
                kind,
                Location::new(doc.uri().clone(), doc.span_to_range(&rule.span())),
                container.map(str::to_string),
            ));
            for declaration in rule.declarations.iter().filter(|d| d.property.starts_with("--")) {
                out.push(symbol(
                    declaration.property.clone(),
                    SymbolKind::VARIABLE,
                    Location::new(doc.uri().clone(), doc.span_to_range(&declaration.span)),
                    Some(rule.prelude.clone()),
                ));
            }
            visit(doc, &rule.children, Some(&rule.prelude), out);
        }
    }
    let mut out = Vec::new();
    visit(doc, &analysis.stylesheet().rules, None, &mut out);
    out
}

fn declaration_names(analysis: &CssAnalysis) -> Vec<Span<usize>> {
    analysis
        .stylesheet()
        .all_rules()
        .into_iter()
        .flat_map(|(rule, _)| rule.declarations.iter().map(|d| d.property_span.clone()))
        .collect()
}

/// Every identifier equal to the one at `offset`.
pub fn highlights(
    doc: &EmbeddedDocument,
    analysis: &CssAnalysis,
    offset: usize,
) -> Vec<DocumentHighlight> {
    let text = doc.text();
    let Some(target) = analysis.ident_at(offset) else {
        return Vec::new();
    };
    let name = &text[target.span.clone()];
    let declared = declaration_names(analysis);
    analysis
        .tokens
        .iter()
        .filter(|t| t.kind == CssTokenKind::Ident && &text[t.span.clone()] == name)
        .map(|t| {
            let write = name.starts_with("--") && declared.contains(&t.span);
            DocumentHighlight {
                range: doc.span_to_range(&t.span),
                kind: Some(if write {
                    DocumentHighlightKind::WRITE
                } else {
                    DocumentHighlightKind::READ
                }),
            }
        })
        .collect()
}

fn custom_property_at<'a>(text: &'a str, analysis: &CssAnalysis, offset: usize) -> Option<&'a str> {
    let token = analysis.ident_at(offset)?;
    let name = &text[token.span.clone()];
    name.starts_with("--").then_some(name)
}

/// Declaration of the custom property at `offset`.
pub fn definition(doc: &EmbeddedDocument, analysis: &CssAnalysis, offset: usize) -> Vec<Location> {
    let Some(name) = custom_property_at(doc.text(), analysis, offset) else {
        return Vec::new();
    };
    analysis
        .stylesheet()
        .all_rules()
        .into_iter()
        .flat_map(|(rule, _)| rule.declarations.iter())
        .find(|d| d.property == name)
        .map(|d| Location::new(doc.uri().clone(), doc.span_to_range(&d.property_span)))
        .into_iter()
        .collect()
}

/// Every use and declaration of the custom property at `offset`.
pub fn references(doc: &EmbeddedDocument, analysis: &CssAnalysis, offset: usize) -> Vec<Location> {
    let text = doc.text();
    let Some(name) = custom_property_at(text, analysis, offset) else {
        return Vec::new();
    };
    analysis
        .tokens
        .iter()
        .filter(|t| t.kind == CssTokenKind::Ident && &text[t.span.clone()] == name)
        .map(|t| Location::new(doc.uri().clone(), doc.span_to_range(&t.span)))
        .collect()
}

/// Hex, `rgb()`/`rgba()`, `hsl()`/`hsla()` and named colors in values.
pub fn colors(doc: &EmbeddedDocument, analysis: &CssAnalysis) -> Vec<ColorInformation> {
    let text = doc.text();
    let mut out = Vec::new();
    for (rule, _) in analysis.stylesheet().all_rules() {
        for declaration in &rule.declarations {
            let tokens = analysis.tokens_in(&declaration.value_span);
            let mut i = 0;
            while i < tokens.len() {
                let token = &tokens[i];
                let word = &text[token.span.clone()];
                let followed_by_paren =
                    tokens.get(i + 1).is_some_and(|t| t.kind == CssTokenKind::LParen);
                match token.kind {
                    CssTokenKind::Hash => {
                        if let Some(color) = parse_hex(&word[1..]) {
                            out.push(ColorInformation {
                                range: doc.span_to_range(&token.span),
                                color,
                            });
                        }
                    }
                    CssTokenKind::Ident if followed_by_paren => {
                        let close = tokens[i..]
                            .iter()
                            .position(|t| t.kind == CssTokenKind::RParen)
                            .map(|p| i + p);
                        if let Some(close) = close {
                            let arguments: Vec<&str> = tokens[i + 2..close]
                                .iter()
                                .filter(|t| t.kind == CssTokenKind::Number)
                                .map(|t| &text[t.span.clone()])
                                .collect();
                            if let Some(color) = function_color(word, &arguments) {
                                out.push(ColorInformation {
                                    range: doc.span_to_range(
                                        &(token.span.start..tokens[close].span.end),
                                    ),
                                    color,
                                });
                            }
                            i = close;
                        }
                    }
                    CssTokenKind::Ident => {
                        if let Some((r, g, b)) = data::named_color(word) {
                            out.push(ColorInformation {
                                range: doc.span_to_range(&token.span),
                                color: rgb(
                                    f32::from(r) / 255.0,
                                    f32::from(g) / 255.0,
                                    f32::from(b) / 255.0,
                                    1.0,
                                ),
                            });
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
        }
    }
    out
}

fn rgb(red: f32, green: f32, blue: f32, alpha: f32) -> Color {
    Color {
        red: red.clamp(0.0, 1.0),
        green: green.clamp(0.0, 1.0),
        blue: blue.clamp(0.0, 1.0),
        alpha: alpha.clamp(0.0, 1.0),
    }
}

fn parse_hex(digits: &str) -> Option<Color> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| f32::from(v) / 255.0);
    let short = |i: usize| channel(digits[i..=i].repeat(2).as_str());
    let long = |i: usize| channel(&digits[2 * i..2 * i + 2]);
    match digits.len() {
        3 => Some(rgb(short(0)?, short(1)?, short(2)?, 1.0)),
        4 => Some(rgb(short(0)?, short(1)?, short(2)?, short(3)?)),
        6 => Some(rgb(long(0)?, long(1)?, long(2)?, 1.0)),
        8 => Some(rgb(long(0)?, long(1)?, long(2)?, long(3)?)),
        _ => None,
    }
}

/// Numeric value of a CSS number token, and whether it is a percentage.
fn number(token: &str) -> Option<(f32, bool)> {
    let numeric_end = token
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
        .unwrap_or(token.len());
    let value = token[..numeric_end].parse::<f32>().ok()?;
    Some((value, token[numeric_end..].starts_with('%')))
}

fn function_color(name: &str, arguments: &[&str]) -> Option<Color> {
    let values: Vec<(f32, bool)> = arguments.iter().map(|a| number(a)).collect::<Option<_>>()?;
    if values.len() < 3 || values.len() > 4 {
        return None;
    }
    let alpha = values.get(3).map_or(1.0, |&(v, pct)| if pct { v / 100.0 } else { v });
    match name.to_ascii_lowercase().as_str() {
        "rgb" | "rgba" => {
            let channel = |(v, pct): (f32, bool)| if pct { v / 100.0 } else { v / 255.0 };
            Some(rgb(channel(values[0]), channel(values[1]), channel(values[2]), alpha))
        }
        "hsl" | "hsla" => {
            let (r, g, b) = hsl_to_rgb(values[0].0, values[1].0 / 100.0, values[2].0 / 100.0);
            Some(rgb(r, g, b, alpha))
        }
        _ => None,
    }
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (f32, f32, f32) {
    let h = hue.rem_euclid(360.0) / 60.0;
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    (r + m, g + m, b + m)
}

fn rgb_to_hsl(color: &Color) -> (f32, f32, f32) {
    let (r, g, b) = (color.red, color.green, color.blue);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;
    let delta = max - min;
    if delta == 0.0 {
        return (0.0, 0.0, lightness);
    }
    let saturation = delta / (1.0 - (2.0 * lightness - 1.0).abs());
    let hue = if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    (hue, saturation, lightness)
}

/// `rgb()`, hex and `hsl()` renderings of `color` replacing `range`.
pub fn color_presentations(color: Color, range: Range) -> Vec<ColorPresentation> {
    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let (r, g, b, a) = (
        to_byte(color.red),
        to_byte(color.green),
        to_byte(color.blue),
        to_byte(color.alpha),
    );
    let opaque = a == 255;
    let alpha = (color.alpha * 100.0).round() / 100.0;

    let rgb = if opaque {
        format!("rgb({r}, {g}, {b})")
    } else {
        format!("rgba({r}, {g}, {b}, {alpha})")
    };
    let hex = if opaque {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    };
    let (h, s, l) = rgb_to_hsl(&color);
    let (h, s, l) = (h.round(), (s * 100.0).round(), (l * 100.0).round());
    let hsl = if opaque {
        format!("hsl({h}, {s}%, {l}%)")
    } else {
        format!("hsla({h}, {s}%, {l}%, {alpha})")
    };

    [rgb, hex, hsl]
        .into_iter()
        .map(|label| ColorPresentation {
            text_edit: Some(TextEdit {
                range,
                new_text: label.clone(),
            }),
            label,
            additional_text_edits: None,
        })
        .collect()
}

/// Folds for blocks, block comments and `/* #region */` markers.
pub fn folding(doc: &EmbeddedDocument, analysis: &CssAnalysis) -> Vec<FoldingRange> {
    let text = doc.text();
    let braces = analysis.tokens.iter().filter_map(|t| match t.kind {
        CssTokenKind::LBrace => Some((t.span.start, b'{')),
        CssTokenKind::RBrace => Some((t.span.start, b'}')),
        _ => None,
    });
    let pairs = bracket_pairs(braces);
    let comments: Vec<Span<usize>> = analysis
        .tokens
        .iter()
        .filter(|t| t.kind == CssTokenKind::Comment)
        .map(|t| t.span.clone())
        .collect();
    let mut markers = Vec::new();
    let mut block_comments = Vec::new();
    for comment in comments {
        match region_marker(text[comment.clone()].trim_start_matches("/*")) {
            Some(is_start) => markers.push((comment.start, is_start)),
            None => block_comments.push(comment),
        }
    }
    folding_ranges(|offset| doc.position_at(offset).line, &pairs, &block_comments, &markers)
}

/// Selection chains: token, value, declaration, block, rule and outward.
pub fn selection_ranges(
    doc: &EmbeddedDocument,
    analysis: &CssAnalysis,
    offsets: &[usize],
) -> Vec<SelectionRange> {
    let stylesheet = analysis.stylesheet();
    offsets
        .iter()
        .map(|&offset| {
            let mut spans: Vec<Span<usize>> = Vec::new();
            if let Some(token) = analysis.tokens.iter().find(|t| {
                !matches!(t.kind, CssTokenKind::Whitespace | CssTokenKind::Comment)
                    && t.span.start <= offset
                    && offset <= t.span.end
            }) {
                spans.push(token.span.clone());
            }
            if let Some(declaration) = stylesheet.declaration_at(offset) {
                if declaration.value_span.start <= offset {
                    spans.push(declaration.value_span.clone());
                }
                spans.push(declaration.span.clone());
            }
            for rule in stylesheet.rules_at(offset).into_iter().rev() {
                let inner = rule.inner();
                if inner.start <= offset && offset <= inner.end {
                    spans.push(inner);
                }
                spans.push(rule.span());
            }
            let ranges = spans.iter().map(|s| doc.span_to_range(s));
            selection_chain(ranges).unwrap_or_else(|| {
                let position = doc.position_at(offset);
                SelectionRange {
                    range: Range::new(position, position),
                    parent: None,
                }
            })
        })
        .collect()
}

/// Re-indent lines of `span` by brace depth counted from `block_start`.
pub fn format(
    doc: &EmbeddedDocument,
    analysis: &CssAnalysis,
    span: Span<usize>,
    block_start: usize,
    base: &str,
    unit: &str,
) -> Vec<TextEdit> {
    let brackets: Vec<(usize, u8)> = analysis
        .tokens
        .iter()
        .filter_map(|t| match t.kind {
            CssTokenKind::LBrace => Some((t.span.start, b'{')),
            CssTokenKind::RBrace => Some((t.span.start, b'}')),
            _ => None,
        })
        .collect();
    reindent(doc, span, block_start, &brackets, base, unit)
}

mod token_types {
    pub const PROPERTY: u32 = 0;
    pub const VARIABLE: u32 = 1;
    pub const KEYWORD: u32 = 2;
    pub const NUMBER: u32 = 3;
    pub const STRING: u32 = 4;
    pub const CLASS: u32 = 5;
}

mod token_modifiers {
    pub const DECLARATION: u32 = 1 << 0;
}

/// Legend of the tokens produced by [`semantic_tokens`].
pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: vec![
            SemanticTokenType::PROPERTY,
            SemanticTokenType::VARIABLE,
            SemanticTokenType::KEYWORD,
            SemanticTokenType::NUMBER,
            SemanticTokenType::STRING,
            SemanticTokenType::CLASS,
        ],
        token_modifiers: vec![SemanticTokenModifier::DECLARATION],
    }
}

/// Properties, custom properties, at-keywords, numbers, strings and class
/// selectors.
pub fn semantic_tokens(doc: &EmbeddedDocument, analysis: &CssAnalysis) -> Vec<SemanticTokenData> {
    let text = doc.text();
    let declared = declaration_names(analysis);
    let mut out = Vec::new();
    let mut previous: Option<&CssToken> = None;
    for token in &analysis.tokens {
        let classified = match token.kind {
            CssTokenKind::Ident if declared.contains(&token.span) => {
                if text[token.span.clone()].starts_with("--") {
                    Some((token_types::VARIABLE, token_modifiers::DECLARATION))
                } else {
                    Some((token_types::PROPERTY, 0))
                }
            }
            CssTokenKind::Ident if text[token.span.clone()].starts_with("--") => {
                Some((token_types::VARIABLE, 0))
            }
            CssTokenKind::Ident
                if previous.is_some_and(|p| {
                    p.kind == CssTokenKind::Delim && &text[p.span.clone()] == "."
                }) =>
            {
                Some((token_types::CLASS, 0))
            }
            CssTokenKind::AtKeyword => Some((token_types::KEYWORD, 0)),
            CssTokenKind::Number => Some((token_types::NUMBER, 0)),
            CssTokenKind::String => Some((token_types::STRING, 0)),
            _ => None,
        };
        if let Some((token_type, modifiers)) = classified {
            out.push(SemanticTokenData {
                start: doc.position_at(token.span.start),
                length: text[token.span.clone()].encode_utf16().count() as u32,
                token_type,
                modifiers,
            });
        }
        previous = Some(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentState, LanguageId};
    use std::sync::Arc;
    use tower_lsp::lsp_types::{Position, Url};

    fn css(html: &str) -> (Arc<EmbeddedDocument>, CssAnalysis) {
        let uri = Url::parse("file:///a.html").unwrap();
        let state = DocumentState::new(uri, "html", 1, html.to_string());
        let doc = state.embedded(LanguageId::Css, false);
        let analysis = CssAnalysis::new(doc.text());
        (doc, analysis)
    }

    fn at(html: &str, needle: &str) -> usize {
        html.find(needle).unwrap()
    }

    fn labels(list: &CompletionList) -> Vec<&str> {
        list.items.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn validation_reports_unknown_property_and_missing_colon() {
        let html = "<style>.a { colr: red; }\n.b { top 0 }</style>";
        let (doc, analysis) = css(html);
        let messages: Vec<_> = validate(&doc, &analysis).into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["Unknown property: 'colr'", "colon expected"]);
    }

    #[test]
    fn style_attributes_validate_cleanly() {
        let (doc, analysis) = css(r#"<p style="color: red; --x: 1"></p><b style=""></b>"#);
        assert!(validate(&doc, &analysis).is_empty());
    }

    #[test]
    fn empty_ruleset_warning() {
        let (doc, analysis) = css("<style>.a {}</style>");
        let diagnostics = validate(&doc, &analysis);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diagnostics[0].message, "Do not use empty rulesets");
    }

    #[test]
    fn completes_properties_in_blocks() {
        let html = "<style>.a { co }</style>";
        let (doc, analysis) = css(html);
        let offset = at(html, "co }") + 2;
        let list = complete(&doc, &analysis, offset);
        assert!(labels(&list).contains(&"color"));
        let color = list.items.iter().find(|i| i.label == "color").unwrap();
        let Some(CompletionTextEdit::Edit(edit)) = &color.text_edit else {
            panic!("expected a text edit");
        };
        assert_eq!(edit.range, Range::new(Position::new(0, 12), Position::new(0, 14)));
        assert_eq!(edit.new_text, "color: $0;");
        assert!(color.documentation.is_none());
        assert!(resolve(color.clone()).documentation.is_some());
    }

    #[test]
    fn completes_values_after_colon() {
        let html = "<style>.a { display: f }</style>";
        let (doc, analysis) = css(html);
        let list = complete(&doc, &analysis, at(html, "f }") + 1);
        let labels = labels(&list);
        assert!(labels.contains(&"flex"));
        assert!(labels.contains(&"inherit"));
        assert!(!labels.contains(&"red"));

        let html = "<style>.a { color: }</style>";
        let (doc, analysis) = css(html);
        let list = complete(&doc, &analysis, at(html, ": }") + 2);
        assert!(labels_of(&list).contains(&"red".to_string()));
    }

    fn labels_of(list: &CompletionList) -> Vec<String> {
        list.items.iter().map(|i| i.label.clone()).collect()
    }

    #[test]
    fn completes_selectors_and_at_rules() {
        let html = "<style>di</style>";
        let (doc, analysis) = css(html);
        assert!(labels(&complete(&doc, &analysis, at(html, "di") + 2)).contains(&"div"));

        let html = "<style>@me</style>";
        let (doc, analysis) = css(html);
        assert!(labels(&complete(&doc, &analysis, at(html, "@me") + 3)).contains(&"@media"));
    }

    #[test]
    fn hover_shows_property_docs_and_specificity() {
        let html = "<style>#a.b p { color: red }</style>";
        let (doc, analysis) = css(html);
        let hover_text = |offset| match hover(&doc, &analysis, offset).map(|h| h.contents) {
            Some(HoverContents::Markup(m)) => m.value,
            other => panic!("unexpected hover {other:?}"),
        };
        assert!(hover_text(at(html, "color") + 1).starts_with("**color**"));
        assert!(hover_text(at(html, "p {")).ends_with("(1, 1, 1)"));
        assert!(hover(&doc, &analysis, at(html, "red")).is_none());
    }

    #[test]
    fn specificity_of_pseudo_classes() {
        assert_eq!(specificity("a:hover"), (0, 1, 1));
        assert_eq!(specificity("li::before"), (0, 0, 2));
        assert_eq!(specificity(":not(#x) [type]"), (1, 1, 0));
        assert_eq!(specificity(":where(.a) *"), (0, 0, 0));
    }

    #[test]
    fn symbols_skip_style_attributes() {
        let html = "<style>@media print { .a { --c: 1 } }</style><p style=\"color:red\"></p>";
        let (doc, analysis) = css(html);
        let names: Vec<_> = symbols(&doc, &analysis)
            .into_iter()
            .map(|s| (s.name, s.container_name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("@media print".to_string(), None),
                (".a".to_string(), Some("@media print".to_string())),
                ("--c".to_string(), Some(".a".to_string())),
            ]
        );
    }

    #[test]
    fn custom_property_navigation() {
        let html = "<style>:root { --main: red }\n.a { color: var(--main) }</style>";
        let (doc, analysis) = css(html);
        let use_site = html.rfind("--main").unwrap() + 2;
        let definition = definition(&doc, &analysis, use_site);
        assert_eq!(definition.len(), 1);
        assert_eq!(definition[0].range.start, Position::new(0, 15));
        assert_eq!(references(&doc, &analysis, use_site).len(), 2);

        let highlights = highlights(&doc, &analysis, use_site);
        let kinds: Vec<_> = highlights.iter().map(|h| h.kind).collect();
        assert_eq!(
            kinds,
            vec![Some(DocumentHighlightKind::WRITE), Some(DocumentHighlightKind::READ)]
        );
    }

    #[test]
    fn finds_colors_in_values() {
        let html = "<style>.a { color: #f00; background: rgb(0, 128, 255); border-color: blue; \
                    outline-color: rgba(0, 0, 0, 50%) }</style>";
        let (doc, analysis) = css(html);
        let found = colors(&doc, &analysis);
        assert_eq!(found.len(), 4);
        assert_eq!(found[0].color, rgb(1.0, 0.0, 0.0, 1.0));
        assert!((found[1].color.green - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(found[2].color, rgb(0.0, 0.0, 1.0, 1.0));
        assert!((found[3].color.alpha - 0.5).abs() < 1e-6);
    }

    #[test]
    fn presentations() {
        let range = Range::new(Position::new(0, 0), Position::new(0, 4));
        let labels: Vec<_> = color_presentations(rgb(1.0, 0.0, 0.0, 1.0), range)
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels, vec!["rgb(255, 0, 0)", "#ff0000", "hsl(0, 100%, 50%)"]);

        let labels: Vec<_> = color_presentations(rgb(0.0, 0.0, 1.0, 0.5), range)
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels[0], "rgba(0, 0, 255, 0.5)");
        assert_eq!(labels[1], "#0000ff80");
    }

    #[test]
    fn folds_multiline_blocks_and_regions() {
        let html = "<style>\n/* #region */\n.a {\n  color: red;\n}\n/* #endregion */\n</style>";
        let (doc, analysis) = css(html);
        let folds: Vec<_> = folding(&doc, &analysis)
            .into_iter()
            .map(|f| (f.start_line, f.end_line))
            .collect();
        assert_eq!(folds, vec![(1, 5), (2, 3)]);
    }

    #[test]
    fn selection_grows_from_value_to_rule() {
        let html = "<style>.a { color: red }</style>";
        let (doc, analysis) = css(html);
        let chains = selection_ranges(&doc, &analysis, &[at(html, "red") + 1]);
        let mut widths = Vec::new();
        let mut current = chains.first();
        while let Some(range) = current {
            widths.push(range.range.end.character - range.range.start.character);
            current = range.parent.as_deref();
        }
        assert_eq!(widths, vec![3, 10, 12, 17]);
    }

    #[test]
    fn reindents_block_lines() {
        let html = "<style>\n.a {\ncolor: red;\n    }\n</style>";
        let (doc, analysis) = css(html);
        let start = at(html, ".a");
        let end = at(html, "</style>");
        let edits = format(&doc, &analysis, start..end, start, "  ", "  ");
        let summary: Vec<_> = edits
            .iter()
            .map(|e| (e.range.start.line, e.new_text.as_str()))
            .collect();
        assert_eq!(summary, vec![(1, "  "), (2, "    "), (3, "  ")]);
    }

    #[test]
    fn classifies_semantic_tokens() {
        let html = "<style>.a { --w: 2px; width: var(--w) }</style>";
        let (doc, analysis) = css(html);
        let tokens: Vec<_> = semantic_tokens(&doc, &analysis)
            .into_iter()
            .map(|t| (t.start.character, t.length, t.token_type, t.modifiers))
            .collect();
        assert_eq!(
            tokens,
            vec![
                (8, 1, token_types::CLASS, 0),
                (12, 3, token_types::VARIABLE, token_modifiers::DECLARATION),
                (17, 3, token_types::NUMBER, 0),
                (22, 5, token_types::PROPERTY, 0),
                (33, 3, token_types::VARIABLE, 0),
            ]
        );
        assert_eq!(legend().token_types.len(), 6);
    }
}
