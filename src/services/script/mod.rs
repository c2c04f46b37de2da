//! JavaScript language service.
//!
//! A token-level analysis: declarations are recognised from their keywords
//! (`function`, `class`, `let`, `const`, `var`, class methods and
//! parameters) and names resolve to the nearest enclosing declaration.

use std::ops::Range as Span;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, CompletionTextEdit, Diagnostic,
    DiagnosticSeverity, DocumentHighlight, DocumentHighlightKind, FoldingRange, Hover,
    HoverContents, Location, MarkupContent, MarkupKind, NumberOrString, ParameterInformation,
    ParameterLabel, Range, SelectionRange, SemanticTokenModifier, SemanticTokenType,
    SemanticTokensLegend, SignatureHelp, SignatureInformation, SymbolInformation, SymbolKind,
    TextEdit,
};

use crate::document::EmbeddedDocument;
use crate::lsp::semantic_tokens::SemanticTokenData;

use super::{
    bracket_pairs, folding_ranges, matching_close, matching_open, region_marker, reindent,
    selection_chain, word_at,
};

mod data;
mod lexer;

pub use lexer::{tokenize, JsToken, JsTokenKind};

use lexer::{is_ident_byte, is_keyword, KEYWORDS};

const SOURCE: &str = "js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Function,
    Class,
    Method,
    Variable,
    Constant,
    Parameter,
}

/// A declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsDeclaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// The name itself.
    pub name_span: Span<usize>,
    /// The whole declaration, keyword through body or statement end.
    pub span: Span<usize>,
    /// Where the name is visible. Only parameters are scoped.
    pub scope: Option<Span<usize>>,
    pub parameters: Vec<String>,
    pub container: Option<String>,
}

impl JsDeclaration {
    fn signature(&self) -> String {
        let parameters = self.parameters.join(", ");
        match self.kind {
            DeclarationKind::Function => format!("function {}({parameters})", self.name),
            DeclarationKind::Method => match &self.container {
                Some(class) => format!("(method) {class}.{}({parameters})", self.name),
                None => format!("(method) {}({parameters})", self.name),
            },
            DeclarationKind::Class => format!("class {}", self.name),
            DeclarationKind::Variable => format!("let {}", self.name),
            DeclarationKind::Constant => format!("const {}", self.name),
            DeclarationKind::Parameter => format!("(parameter) {}", self.name),
        }
    }
}

/// Tokens, declarations and syntax problems of one embedded script.
#[derive(Debug, Clone)]
pub struct ScriptAnalysis {
    text: String,
    tokens: Vec<JsToken>,
    /// Indices into `tokens` of the non-trivia tokens.
    significant: Vec<usize>,
    declarations: Vec<JsDeclaration>,
    /// Matched bracket pairs (open, close) as offsets.
    pairs: Vec<(usize, usize)>,
    brackets: Vec<(usize, u8)>,
    problems: Vec<(Span<usize>, &'static str, String)>,
}

impl ScriptAnalysis {
    pub fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let significant: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_trivia())
            .map(|(i, _)| i)
            .collect();
        let mut analysis = Self {
            text: text.to_string(),
            tokens,
            significant,
            declarations: Vec::new(),
            pairs: Vec::new(),
            brackets: Vec::new(),
            problems: Vec::new(),
        };
        analysis.check_literals();
        analysis.match_brackets();
        analysis.collect_declarations();
        analysis
    }

    pub fn declarations(&self) -> &[JsDeclaration] {
        &self.declarations
    }

    fn word(&self, token: &JsToken) -> &str {
        &self.text[token.span.clone()]
    }

    /// The `n`th significant token.
    fn sig(&self, n: usize) -> Option<&JsToken> {
        self.significant.get(n).map(|&i| &self.tokens[i])
    }

    fn sig_word(&self, n: usize) -> Option<&str> {
        self.sig(n).map(|t| self.word(t))
    }

    fn is_punct(&self, n: usize, punct: &str) -> bool {
        self.sig(n)
            .is_some_and(|t| t.kind == JsTokenKind::Punct && self.word(t) == punct)
    }

    fn check_literals(&mut self) {
        for token in &self.tokens {
            if token.terminated {
                continue;
            }
            let (code, message) = match token.kind {
                JsTokenKind::String => ("1002", "Unterminated string literal."),
                JsTokenKind::Template => ("1160", "Unterminated template literal."),
                JsTokenKind::BlockComment => ("1010", "'*/' expected."),
                JsTokenKind::Regex => ("1161", "Unterminated regular expression literal."),
                _ => continue,
            };
            self.problems.push((token.span.clone(), code, message.to_string()));
        }
    }

    fn match_brackets(&mut self) {
        let mut stack: Vec<(usize, u8)> = Vec::new();
        for &i in &self.significant {
            let token = &self.tokens[i];
            if token.kind != JsTokenKind::Punct {
                continue;
            }
            let b = self.text.as_bytes()[token.span.start];
            match b {
                b'{' | b'[' | b'(' => {
                    self.brackets.push((token.span.start, b));
                    stack.push((token.span.start, b));
                }
                b'}' | b']' | b')' => {
                    self.brackets.push((token.span.start, b));
                    match stack.last() {
                        Some(&(open, o)) if o == matching_open(b) => {
                            stack.pop();
                            self.pairs.push((open, token.span.start));
                        }
                        _ => self.problems.push((
                            token.span.clone(),
                            "1128",
                            format!("Unexpected '{}'.", b as char),
                        )),
                    }
                }
                _ => {}
            }
        }
        for (open, b) in stack {
            self.problems.push((
                open..open + 1,
                "1005",
                format!("'{}' expected.", matching_close(b) as char),
            ));
        }
        self.pairs.sort_unstable();
        self.problems.sort_by_key(|(span, ..)| span.start);
    }

    /// Offset of the closer matching the opener at `open`, if any.
    fn closer_of(&self, open: usize) -> Option<usize> {
        self.pairs
            .binary_search_by_key(&open, |(o, _)| *o)
            .ok()
            .map(|i| self.pairs[i].1)
    }

    /// Significant index of the token starting at `offset`.
    fn sig_at_offset(&self, offset: usize) -> Option<usize> {
        self.significant
            .binary_search_by_key(&offset, |&i| self.tokens[i].span.start)
            .ok()
    }

    /// End offset of the block starting with the `{` at significant index
    /// `n`, or of the name when there is none.
    fn block_end(&self, n: usize) -> Option<usize> {
        let open = self.sig(n)?;
        if self.word(open) != "{" {
            return None;
        }
        self.closer_of(open.span.start).map(|close| close + 1)
    }

    fn collect_declarations(&mut self) {
        let mut declarations = Vec::new();
        let mut classes: Vec<(String, usize)> = Vec::new();
        let count = self.significant.len();
        let mut n = 0;
        while n < count {
            let Some(token) = self.sig(n) else {
                break;
            };
            let start = token.span.start;
            classes.retain(|(_, end)| start < *end);
            if token.kind != JsTokenKind::Ident || self.is_punct(n.wrapping_sub(1), ".") {
                n += 1;
                continue;
            }
            match self.word(token) {
                "function" => {
                    let mut m = n + 1;
                    if self.is_punct(m, "*") {
                        m += 1;
                    }
                    let name = self
                        .sig(m)
                        .filter(|t| t.kind == JsTokenKind::Ident && !is_keyword(self.word(t)));
                    let name_span = name.map(|t| t.span.clone());
                    if name_span.is_some() {
                        m += 1;
                    }
                    let (parameters, mut params, after) = self.parameter_list(m);
                    let end = self.block_end(after);
                    if let Some(name_span) = name_span {
                        declarations.push(JsDeclaration {
                            name: self.text[name_span.clone()].to_string(),
                            kind: DeclarationKind::Function,
                            span: start..end.unwrap_or(name_span.end),
                            name_span,
                            scope: None,
                            parameters,
                            container: None,
                        });
                    }
                    let scope = start..end.unwrap_or(self.text.len());
                    for p in &mut params {
                        p.scope = Some(scope.clone());
                    }
                    declarations.extend(params);
                }
                "class" => {
                    let name = self
                        .sig(n + 1)
                        .filter(|t| t.kind == JsTokenKind::Ident && !is_keyword(self.word(t)));
                    if let Some(name) = name {
                        let mut m = n + 2;
                        while m < count && !self.is_punct(m, "{") {
                            m += 1;
                        }
                        let end = self.block_end(m).unwrap_or(name.span.end);
                        let name_text = self.word(name).to_string();
                        classes.push((name_text.clone(), end));
                        declarations.push(JsDeclaration {
                            name: name_text,
                            kind: DeclarationKind::Class,
                            name_span: name.span.clone(),
                            span: start..end,
                            scope: None,
                            parameters: Vec::new(),
                            container: None,
                        });
                    }
                }
                keyword @ ("let" | "const" | "var") => {
                    let kind = if keyword == "const" {
                        DeclarationKind::Constant
                    } else {
                        DeclarationKind::Variable
                    };
                    declarations.extend(self.variable_declarations(n, kind));
                }
                word => {
                    let in_class_body = classes.last().is_some_and(|_| {
                        self.is_punct(n.wrapping_sub(1), "{")
                            || self.is_punct(n.wrapping_sub(1), "}")
                            || self.is_punct(n.wrapping_sub(1), ";")
                            || matches!(
                                self.sig_word(n.wrapping_sub(1)),
                                Some("static" | "async" | "get" | "set")
                            )
                    });
                    if in_class_body && !is_keyword(word) && self.is_punct(n + 1, "(") {
                        let (parameters, mut params, after) = self.parameter_list(n + 1);
                        if let Some(end) = self.block_end(after) {
                            let container = classes.last().map(|(name, _)| name.clone());
                            declarations.push(JsDeclaration {
                                name: word.to_string(),
                                kind: DeclarationKind::Method,
                                name_span: token.span.clone(),
                                span: start..end,
                                scope: None,
                                parameters,
                                container,
                            });
                            for p in &mut params {
                                p.scope = Some(start..end);
                            }
                            declarations.extend(params);
                        }
                    }
                }
            }
            n += 1;
        }
        declarations.sort_by_key(|d| d.name_span.start);
        self.declarations = declarations;
    }

    /// Parameters of the list opening at significant index `n`.
    ///
    /// Returns the parameter names, their declarations (unscoped) and the
    /// significant index just past the closing parenthesis.
    fn parameter_list(&self, n: usize) -> (Vec<String>, Vec<JsDeclaration>, usize) {
        let Some(open) = self.sig(n).filter(|t| self.word(t) == "(") else {
            return (Vec::new(), Vec::new(), n);
        };
        let close = self.closer_of(open.span.start).unwrap_or(self.text.len());
        let mut names = Vec::new();
        let mut declarations = Vec::new();
        let mut m = n + 1;
        let mut expect_name = true;
        let mut depth = 0usize;
        while let Some(token) = self.sig(m) {
            if token.span.start >= close {
                break;
            }
            let word = self.word(token);
            match word {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "," if depth == 0 => expect_name = true,
                _ if expect_name && depth == 0 && token.kind == JsTokenKind::Ident => {
                    names.push(word.to_string());
                    declarations.push(JsDeclaration {
                        name: word.to_string(),
                        kind: DeclarationKind::Parameter,
                        name_span: token.span.clone(),
                        span: token.span.clone(),
                        scope: None,
                        parameters: Vec::new(),
                        container: None,
                    });
                    expect_name = false;
                }
                _ => {}
            }
            m += 1;
        }
        let after = self
            .sig_at_offset(close)
            .map_or(m, |i| i + 1);
        (names, declarations, after)
    }

    /// Names declared by the `let`/`const`/`var` at significant index `n`.
    fn variable_declarations(&self, n: usize, kind: DeclarationKind) -> Vec<JsDeclaration> {
        let start = self.sig(n).map_or(0, |t| t.span.start);
        let mut out = Vec::new();
        let mut m = n + 1;
        let mut depth = 0usize;
        let mut expect_name = true;
        while let Some(token) = self.sig(m) {
            let word = self.word(token);
            match word {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" if depth == 0 => break,
                ")" | "]" | "}" => depth -= 1,
                ";" if depth == 0 => break,
                "," if depth == 0 => expect_name = true,
                _ if expect_name
                    && depth == 0
                    && token.kind == JsTokenKind::Ident
                    && !is_keyword(word) =>
                {
                    let mut declaration = JsDeclaration {
                        name: word.to_string(),
                        kind,
                        name_span: token.span.clone(),
                        span: start..token.span.end,
                        scope: None,
                        parameters: Vec::new(),
                        container: None,
                    };
                    if let Some((parameters, end)) = self.function_initializer(m + 1) {
                        declaration.kind = DeclarationKind::Function;
                        declaration.parameters = parameters;
                        declaration.span.end = end;
                    }
                    out.push(declaration);
                    expect_name = false;
                }
                _ if depth == 0 && !expect_name && self.ends_statement(m) => {
                    if let Some(last) = out.last_mut() {
                        last.span.end = token.span.end;
                    }
                    break;
                }
                _ => {}
            }
            if let Some(last) = out.last_mut() {
                last.span.end = last.span.end.max(token.span.end);
            }
            m += 1;
        }
        out
    }

    /// `true` when significant token `m` is followed by a line break and the
    /// next token cannot continue the expression.
    fn ends_statement(&self, m: usize) -> bool {
        let (Some(&here), Some(&next)) = (self.significant.get(m), self.significant.get(m + 1))
        else {
            return true;
        };
        let gap = &self.text[self.tokens[here].span.end..self.tokens[next].span.start];
        if !gap.contains('\n') {
            return false;
        }
        let word = self.word(&self.tokens[here]);
        let next_word = self.word(&self.tokens[next]);
        !matches!(word, "=" | "," | "+" | "-" | "*" | "/" | "&" | "|" | "?" | ":" | ">" | "<" | ".")
            && !matches!(
                next_word,
                "." | "?" | ":" | "+" | "-" | "*" | "/" | "&" | "|" | "," | ")" | "]" | "}"
            )
    }

    /// Parameters and end offset when the initializer after the name at
    /// significant index `m - 1` is a function or arrow function.
    fn function_initializer(&self, m: usize) -> Option<(Vec<String>, usize)> {
        if !self.is_punct(m, "=") {
            return None;
        }
        let mut k = m + 1;
        if self.sig_word(k) == Some("async") {
            k += 1;
        }
        if self.sig_word(k) == Some("function") {
            k += 1;
            if self.sig(k).is_some_and(|t| t.kind == JsTokenKind::Ident) {
                k += 1;
            }
            let (parameters, _, after) = self.parameter_list(k);
            let end = self.block_end(after)?;
            return Some((parameters, end));
        }
        let (parameters, after) = if self.is_punct(k, "(") {
            let (parameters, _, after) = self.parameter_list(k);
            (parameters, after)
        } else if self.sig(k).is_some_and(|t| t.kind == JsTokenKind::Ident) {
            (vec![self.sig_word(k)?.to_string()], k + 1)
        } else {
            return None;
        };
        if !(self.is_punct(after, "=") && self.is_punct(after + 1, ">")) {
            return None;
        }
        let body = after + 2;
        let end = self
            .block_end(body)
            .or_else(|| self.sig(body).map(|t| t.span.end))?;
        Some((parameters, end))
    }

    /// Identifier token touching `offset`.
    fn ident_at(&self, offset: usize) -> Option<(usize, &JsToken)> {
        let n = self
            .significant
            .partition_point(|&i| self.tokens[i].span.end < offset);
        [n, n + 1]
            .into_iter()
            .filter_map(|k| self.sig(k).map(|t| (k, t)))
            .find(|(_, t)| {
                t.kind == JsTokenKind::Ident && t.span.start <= offset && offset <= t.span.end
            })
    }

    /// `true` when significant token `n` is a property name (`a.n`).
    fn is_member(&self, n: usize) -> bool {
        n > 0 && self.is_punct(n - 1, ".")
    }

    /// Declaration a use of `name` at `offset` refers to.
    fn resolve(&self, name: &str, offset: usize) -> Option<&JsDeclaration> {
        let scoped = self
            .declarations
            .iter()
            .filter(|d| d.name == name)
            .filter(|d| d.scope.as_ref().is_some_and(|s| s.start <= offset && offset <= s.end))
            .min_by_key(|d| d.scope.as_ref().map_or(usize::MAX, |s| s.end - s.start));
        scoped.or_else(|| {
            self.declarations
                .iter()
                .find(|d| d.name == name && d.scope.is_none() && d.kind != DeclarationKind::Method)
        })
    }

    /// Declaration under the cursor, either at its name or at a use.
    fn declaration_at(&self, offset: usize) -> Option<&JsDeclaration> {
        let (n, token) = self.ident_at(offset)?;
        if let Some(declaration) = self.declarations.iter().find(|d| d.name_span == token.span) {
            return Some(declaration);
        }
        if self.is_member(n) {
            return None;
        }
        self.resolve(self.word(token), token.span.start)
    }

    /// Identifier tokens referring to `declaration`.
    fn occurrences<'a>(
        &'a self,
        declaration: &'a JsDeclaration,
    ) -> impl Iterator<Item = &'a JsToken> + 'a {
        (0..self.significant.len()).filter_map(move |n| {
            let token = self.sig(n)?;
            if token.kind != JsTokenKind::Ident || self.word(token) != declaration.name {
                return None;
            }
            if token.span == declaration.name_span {
                return Some(token);
            }
            if declaration.kind == DeclarationKind::Method {
                return None;
            }
            if self.is_member(n) {
                return None;
            }
            let resolved = self.resolve(&declaration.name, token.span.start)?;
            (resolved.name_span == declaration.name_span).then_some(token)
        })
    }

    /// `true` when the identifier at significant index `n` is assigned to.
    fn is_assigned(&self, n: usize) -> bool {
        let Some(next) = self.sig(n + 1) else {
            return false;
        };
        let word = self.word(next);
        let following = self.sig_word(n + 2);
        (word == "=" && !matches!(following, Some("=" | ">")))
            || matches!(word, "+" | "-") && following == Some(word)
    }
}

fn diagnostic(
    doc: &EmbeddedDocument,
    span: &Span<usize>,
    code: &str,
    message: String,
) -> Diagnostic {
    Diagnostic {
        range: doc.span_to_range(span),
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::String(code.to_string())),
        source: Some(SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

/// Unbalanced brackets and unterminated literals.
pub fn validate(doc: &EmbeddedDocument, analysis: &ScriptAnalysis) -> Vec<Diagnostic> {
    let mut problems: Vec<_> = analysis.problems.iter().collect();
    problems.sort_by_key(|(span, ..)| span.start);
    problems
        .into_iter()
        .map(|(span, code, message)| diagnostic(doc, span, code, message.clone()))
        .collect()
}

fn completion_kind(kind: DeclarationKind) -> CompletionItemKind {
    match kind {
        DeclarationKind::Function => CompletionItemKind::FUNCTION,
        DeclarationKind::Class => CompletionItemKind::CLASS,
        DeclarationKind::Method => CompletionItemKind::METHOD,
        DeclarationKind::Variable | DeclarationKind::Parameter => CompletionItemKind::VARIABLE,
        DeclarationKind::Constant => CompletionItemKind::CONSTANT,
    }
}

fn completion(
    label: &str,
    kind: CompletionItemKind,
    detail: Option<String>,
    range: Range,
) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        detail,
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range,
            new_text: label.to_string(),
        })),
        ..Default::default()
    }
}

/// `true` when `offset` is inside a string, template, comment or regex.
fn in_literal(analysis: &ScriptAnalysis, offset: usize) -> bool {
    analysis.tokens.iter().any(|t| {
        matches!(
            t.kind,
            JsTokenKind::String
                | JsTokenKind::Template
                | JsTokenKind::Regex
                | JsTokenKind::LineComment
                | JsTokenKind::BlockComment
        ) && t.span.start < offset
            && (offset < t.span.end || (!t.terminated && offset == t.span.end))
    })
}

/// Members after `.`, otherwise declarations, globals and keywords.
pub fn complete(
    doc: &EmbeddedDocument,
    analysis: &ScriptAnalysis,
    offset: usize,
) -> CompletionList {
    let text = doc.text();
    if in_literal(analysis, offset) {
        return CompletionList::default();
    }
    let word = word_at(text, offset, is_ident_byte)
        .map_or(offset..offset, |w| w.start..w.end.max(offset));
    let range = doc.span_to_range(&word);
    let mut items: Vec<CompletionItem> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut push = |items: &mut Vec<CompletionItem>, item: CompletionItem| {
        if !seen.contains(&item.label) {
            seen.push(item.label.clone());
            items.push(item);
        }
    };

    let before = text[..word.start].trim_end_matches([' ', '\t']);
    if let Some(object_end) = before.strip_suffix('.').map(str::len) {
        let object = word_at(text, object_end, is_ident_byte)
            .map(|w| &text[w])
            .unwrap_or("");
        for (_, member, signature) in data::members(object) {
            let detail = Some(signature.to_string());
            push(&mut items, completion(member, CompletionItemKind::METHOD, detail, range));
        }
        for n in 1..analysis.significant.len() {
            let Some(token) = analysis.sig(n) else {
                continue;
            };
            if analysis.is_member(n) && token.kind == JsTokenKind::Ident && token.span != word {
                let name = analysis.word(token);
                push(&mut items, completion(name, CompletionItemKind::PROPERTY, None, range));
            }
        }
        return CompletionList {
            is_incomplete: false,
            items,
        };
    }

    for declaration in analysis.declarations() {
        let visible = match &declaration.scope {
            Some(scope) => scope.start <= offset && offset <= scope.end,
            None => declaration.kind != DeclarationKind::Method,
        };
        if visible && declaration.name_span != word {
            push(
                &mut items,
                completion(
                    &declaration.name,
                    completion_kind(declaration.kind),
                    Some(declaration.signature()),
                    range,
                ),
            );
        }
    }
    for global in data::GLOBALS {
        let kind = if global.is_class {
            CompletionItemKind::CLASS
        } else if global.declaration.starts_with("function") {
            CompletionItemKind::FUNCTION
        } else {
            CompletionItemKind::VARIABLE
        };
        let detail = Some(global.declaration.to_string());
        push(&mut items, completion(global.name, kind, detail, range));
    }
    for keyword in KEYWORDS {
        push(&mut items, completion(keyword, CompletionItemKind::KEYWORD, None, range));
    }
    CompletionList {
        is_incomplete: false,
        items,
    }
}

fn code_hover(code: String, range: Range) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("```js\n{code}\n```"),
        }),
        range: Some(range),
    }
}

/// Declaration signature of the identifier at `offset`.
pub fn hover(doc: &EmbeddedDocument, analysis: &ScriptAnalysis, offset: usize) -> Option<Hover> {
    let (n, token) = analysis.ident_at(offset)?;
    let range = doc.span_to_range(&token.span);
    if let Some(declaration) = analysis.declaration_at(offset) {
        return Some(code_hover(declaration.signature(), range));
    }
    let name = analysis.word(token);
    if analysis.is_member(n) {
        let object = analysis.sig_word(n.checked_sub(2)?)?;
        let signature = data::member(object, name)?;
        return Some(code_hover(format!("(method) {object}.{signature}"), range));
    }
    let global = data::global_data(name)?;
    Some(code_hover(global.declaration.to_string(), range))
}

/// Signature of the call enclosing `offset`, with the active parameter.
pub fn signature_help(analysis: &ScriptAnalysis, offset: usize) -> Option<SignatureHelp> {
    let last = analysis
        .significant
        .partition_point(|&i| analysis.tokens[i].span.end <= offset);
    let mut depth = 0usize;
    let mut commas = 0u32;
    let mut open = None;
    for n in (0..last).rev() {
        let word = analysis.sig_word(n)?;
        match word {
            ")" | "]" | "}" => depth += 1,
            "(" | "[" | "{" if depth > 0 => depth -= 1,
            "(" => {
                open = Some(n);
                break;
            }
            "[" | "{" | ";" => return None,
            "," if depth == 0 => commas += 1,
            _ => {}
        }
    }
    let open = open?;
    let callee = open.checked_sub(1)?;
    let callee_token = analysis.sig(callee).filter(|t| t.kind == JsTokenKind::Ident)?;
    let name = analysis.word(callee_token);

    let (label, parameters) = if analysis.is_member(callee) {
        let object = analysis.sig_word(callee.checked_sub(2)?)?;
        let signature = data::member(object, name)?;
        (signature.to_string(), data::parameters(signature))
    } else if let Some(declaration) = analysis
        .resolve(name, callee_token.span.start)
        .filter(|d| matches!(d.kind, DeclarationKind::Function | DeclarationKind::Method))
    {
        (
            format!("{}({})", declaration.name, declaration.parameters.join(", ")),
            declaration.parameters.clone(),
        )
    } else {
        let global = data::global_data(name)?;
        let signature = global.declaration.strip_prefix("function ")?;
        (signature.to_string(), data::parameters(signature))
    };

    let active = if parameters.is_empty() {
        0
    } else {
        let last_index = parameters.len() as u32 - 1;
        let rest = parameters.last().is_some_and(|p| p.starts_with("..."));
        if rest {
            commas.min(last_index)
        } else {
            commas
        }
    };
    Some(SignatureHelp {
        signatures: vec![SignatureInformation {
            label,
            documentation: None,
            parameters: Some(
                parameters
                    .into_iter()
                    .map(|p| ParameterInformation {
                        label: ParameterLabel::Simple(p),
                        documentation: None,
                    })
                    .collect(),
            ),
            active_parameter: None,
        }],
        active_signature: Some(0),
        active_parameter: Some(active),
    })
}

/// Uses of the declaration under the cursor; assignments are writes.
pub fn highlights(
    doc: &EmbeddedDocument,
    analysis: &ScriptAnalysis,
    offset: usize,
) -> Vec<DocumentHighlight> {
    let Some(declaration) = analysis.declaration_at(offset) else {
        return Vec::new();
    };
    analysis
        .occurrences(declaration)
        .map(|token| {
            let n = analysis.sig_at_offset(token.span.start);
            let write = token.span == declaration.name_span
                || n.is_some_and(|n| analysis.is_assigned(n));
            DocumentHighlight {
                range: doc.span_to_range(&token.span),
                kind: Some(if write {
                    DocumentHighlightKind::WRITE
                } else {
                    DocumentHighlightKind::READ
                }),
            }
        })
        .collect()
}

pub fn definition(
    doc: &EmbeddedDocument,
    analysis: &ScriptAnalysis,
    offset: usize,
) -> Vec<Location> {
    analysis
        .declaration_at(offset)
        .map(|d| Location::new(doc.uri().clone(), doc.span_to_range(&d.name_span)))
        .into_iter()
        .collect()
}

pub fn references(
    doc: &EmbeddedDocument,
    analysis: &ScriptAnalysis,
    offset: usize,
) -> Vec<Location> {
    let Some(declaration) = analysis.declaration_at(offset) else {
        return Vec::new();
    };
    analysis
        .occurrences(declaration)
        .map(|t| Location::new(doc.uri().clone(), doc.span_to_range(&t.span)))
        .collect()
}

/// Functions, classes, methods and variables.
#[allow(deprecated)]
pub fn symbols(doc: &EmbeddedDocument, analysis: &ScriptAnalysis) -> Vec<SymbolInformation> {
    analysis
        .declarations()
        .iter()
        .filter(|d| d.kind != DeclarationKind::Parameter)
        .map(|d| SymbolInformation {
            name: d.name.clone(),
            kind: match d.kind {
                DeclarationKind::Function => SymbolKind::FUNCTION,
                DeclarationKind::Class => SymbolKind::CLASS,
                DeclarationKind::Method => SymbolKind::METHOD,
                DeclarationKind::Constant => SymbolKind::CONSTANT,
                _ => SymbolKind::VARIABLE,
            },
            tags: None,
            deprecated: None,
            location: Location::new(doc.uri().clone(), doc.span_to_range(&d.span)),
            container_name: d.container.clone(),
        })
        .collect()
}

/// Folds for bracket blocks, block comments and `// #region` markers.
pub fn folding(doc: &EmbeddedDocument, analysis: &ScriptAnalysis) -> Vec<FoldingRange> {
    let pairs = bracket_pairs(analysis.brackets.iter().copied());
    let mut comments = Vec::new();
    let mut markers = Vec::new();
    for token in &analysis.tokens {
        match token.kind {
            JsTokenKind::BlockComment => comments.push(token.span.clone()),
            JsTokenKind::LineComment => {
                let comment = analysis.word(token).trim_start_matches('/');
                if let Some(is_start) = region_marker(comment) {
                    markers.push((token.span.start, is_start));
                }
            }
            _ => {}
        }
    }
    folding_ranges(|offset| doc.position_at(offset).line, &pairs, &comments, &markers)
}

/// Selection chains: token, then each enclosing bracket's content and the
/// brackets themselves.
pub fn selection_ranges(
    doc: &EmbeddedDocument,
    analysis: &ScriptAnalysis,
    offsets: &[usize],
) -> Vec<SelectionRange> {
    offsets
        .iter()
        .map(|&offset| {
            let mut spans: Vec<Span<usize>> = Vec::new();
            if let Some(token) = analysis.tokens.iter().find(|t| {
                t.kind != JsTokenKind::Whitespace && t.span.start <= offset && offset < t.span.end
            }) {
                if matches!(token.kind, JsTokenKind::String | JsTokenKind::Template)
                    && token.span.len() >= 2
                {
                    spans.push(token.span.start + 1..token.span.end - 1);
                }
                spans.push(token.span.clone());
            }
            let mut enclosing: Vec<&(usize, usize)> = analysis
                .pairs
                .iter()
                .filter(|(open, close)| *open < offset && offset <= *close)
                .collect();
            enclosing.sort_by_key(|(open, close)| close - open);
            for (open, close) in enclosing {
                spans.push(open + 1..*close);
                spans.push(*open..close + 1);
            }
            selection_chain(spans.iter().map(|s| doc.span_to_range(s))).unwrap_or_else(|| {
                let position = doc.position_at(offset);
                SelectionRange {
                    range: Range::new(position, position),
                    parent: None,
                }
            })
        })
        .collect()
}

/// Re-indent lines of `span` by bracket depth counted from `block_start`.
pub fn format(
    doc: &EmbeddedDocument,
    analysis: &ScriptAnalysis,
    span: Span<usize>,
    block_start: usize,
    base: &str,
    unit: &str,
) -> Vec<TextEdit> {
    reindent(doc, span, block_start, &analysis.brackets, base, unit)
}

mod token_types {
    pub const CLASS: u32 = 0;
    pub const FUNCTION: u32 = 1;
    pub const METHOD: u32 = 2;
    pub const VARIABLE: u32 = 3;
    pub const PARAMETER: u32 = 4;
    pub const PROPERTY: u32 = 5;
}

mod token_modifiers {
    pub const DECLARATION: u32 = 1 << 0;
    pub const READONLY: u32 = 1 << 1;
    pub const DEFAULT_LIBRARY: u32 = 1 << 2;
}

pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: vec![
            SemanticTokenType::CLASS,
            SemanticTokenType::FUNCTION,
            SemanticTokenType::METHOD,
            SemanticTokenType::VARIABLE,
            SemanticTokenType::PARAMETER,
            SemanticTokenType::PROPERTY,
        ],
        token_modifiers: vec![
            SemanticTokenModifier::DECLARATION,
            SemanticTokenModifier::READONLY,
            SemanticTokenModifier::DEFAULT_LIBRARY,
        ],
    }
}

fn declaration_token_type(kind: DeclarationKind) -> (u32, u32) {
    match kind {
        DeclarationKind::Class => (token_types::CLASS, 0),
        DeclarationKind::Function => (token_types::FUNCTION, 0),
        DeclarationKind::Method => (token_types::METHOD, 0),
        DeclarationKind::Variable => (token_types::VARIABLE, 0),
        DeclarationKind::Constant => (token_types::VARIABLE, token_modifiers::READONLY),
        DeclarationKind::Parameter => (token_types::PARAMETER, 0),
    }
}

/// Classify identifiers by what they resolve to.
pub fn semantic_tokens(
    doc: &EmbeddedDocument,
    analysis: &ScriptAnalysis,
) -> Vec<SemanticTokenData> {
    let mut out = Vec::new();
    for n in 0..analysis.significant.len() {
        let Some(token) = analysis.sig(n) else {
            continue;
        };
        let word = analysis.word(token);
        if token.kind != JsTokenKind::Ident || is_keyword(word) {
            continue;
        }
        let declared = analysis.declarations.iter().find(|d| d.name_span == token.span);
        let classified = if let Some(declaration) = declared {
            let (token_type, modifiers) = declaration_token_type(declaration.kind);
            Some((token_type, modifiers | token_modifiers::DECLARATION))
        } else if analysis.is_member(n) {
            let object = n.checked_sub(2).and_then(|k| analysis.sig_word(k)).unwrap_or("");
            match data::member(object, word) {
                Some(_) => Some((token_types::METHOD, token_modifiers::DEFAULT_LIBRARY)),
                None => Some((token_types::PROPERTY, 0)),
            }
        } else if let Some(declaration) = analysis.resolve(word, token.span.start) {
            Some(declaration_token_type(declaration.kind))
        } else {
            data::global_data(word).map(|global| {
                let token_type = if global.is_class {
                    token_types::CLASS
                } else if global.declaration.starts_with("function") {
                    token_types::FUNCTION
                } else {
                    token_types::VARIABLE
                };
                (token_type, token_modifiers::DEFAULT_LIBRARY)
            })
        };
        if let Some((token_type, modifiers)) = classified {
            out.push(SemanticTokenData {
                start: doc.position_at(token.span.start),
                length: word.encode_utf16().count() as u32,
                token_type,
                modifiers,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentState, LanguageId};
    use std::sync::Arc;
    use tower_lsp::lsp_types::{Position, Url};

    fn script(html: &str) -> (Arc<EmbeddedDocument>, ScriptAnalysis) {
        let uri = Url::parse("file:///a.html").unwrap();
        let state = DocumentState::new(uri, "html", 1, html.to_string());
        let doc = state.embedded(LanguageId::JavaScript, false);
        let analysis = ScriptAnalysis::new(doc.text());
        (doc, analysis)
    }

    fn wrap(js: &str) -> String {
        format!("<script>{js}</script>")
    }

    /// Offset of `needle` in the wrapped document, plus `delta`.
    fn at(html: &str, needle: &str, delta: usize) -> usize {
        html.find(needle).unwrap() + delta
    }

    #[test]
    fn collects_declarations() {
        let html = wrap(
            "function add(a, b = 1) { return a + b }\nconst twice = (x) => x * 2;\n\
             let n = 0, m;\nclass Box { open(lid) { return lid } }",
        );
        let (_, analysis) = script(&html);
        let found: Vec<_> = analysis
            .declarations()
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("add", DeclarationKind::Function),
                ("a", DeclarationKind::Parameter),
                ("b", DeclarationKind::Parameter),
                ("twice", DeclarationKind::Function),
                ("n", DeclarationKind::Variable),
                ("m", DeclarationKind::Variable),
                ("Box", DeclarationKind::Class),
                ("open", DeclarationKind::Method),
                ("lid", DeclarationKind::Parameter),
            ]
        );
        let twice = &analysis.declarations()[3];
        assert_eq!(twice.parameters, vec!["x"]);
    }

    #[test]
    fn validation_reports_brackets_and_literals() {
        let html = wrap("if (a { x = 'open\n}\n]");
        let (doc, analysis) = script(&html);
        let messages: Vec<_> = validate(&doc, &analysis).into_iter().map(|d| d.message).collect();
        assert_eq!(
            messages,
            vec!["')' expected.", "Unterminated string literal.", "Unexpected ']'."]
        );
    }

    #[test]
    fn event_handler_attributes_validate() {
        let (doc, analysis) = script("<button onclick=\"go(1)\">x</button>");
        assert!(validate(&doc, &analysis).is_empty());
        let (doc, analysis) = script("<button onclick=\"go(1\">x</button>");
        assert_eq!(validate(&doc, &analysis).len(), 1);
    }

    #[test]
    fn completes_declarations_globals_and_members() {
        let html = wrap("function greet(name) { }\nlet count = 1;\nco");
        let (doc, analysis) = script(&html);
        let list = complete(&doc, &analysis, at(&html, "co<", 2));
        let labels: Vec<_> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"greet"));
        assert!(labels.contains(&"count"));
        assert!(labels.contains(&"console"));
        assert!(labels.contains(&"const"));
        assert!(!labels.contains(&"name"));

        let html = wrap("console.");
        let (doc, analysis) = script(&html);
        let list = complete(&doc, &analysis, at(&html, ".", 1));
        let labels: Vec<_> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["error", "info", "log", "warn"]);

        let html = wrap("let s = 'co");
        let (doc, analysis) = script(&html);
        assert!(complete(&doc, &analysis, at(&html, "co", 2)).items.is_empty());
    }

    #[test]
    fn hover_shows_signatures() {
        let html = wrap("function add(a, b) { return a }\nadd(1, 2); console.log(add)");
        let (doc, analysis) = script(&html);
        let text = |offset| match hover(&doc, &analysis, offset).map(|h| h.contents) {
            Some(HoverContents::Markup(m)) => m.value,
            _ => String::new(),
        };
        assert_eq!(text(at(&html, "add(1", 1)), "```js\nfunction add(a, b)\n```");
        assert_eq!(text(at(&html, "a }", 0)), "```js\n(parameter) a\n```");
        assert_eq!(text(at(&html, "console", 1)), "```js\nvar console: Console\n```");
        assert_eq!(
            text(at(&html, "log", 1)),
            "```js\n(method) console.log(...data: any[]): void\n```"
        );
    }

    #[test]
    fn signature_help_tracks_active_parameter() {
        let html = wrap("function add(a, b) {}\nadd(1, f(2), ");
        let (_, analysis) = script(&html);
        let help = signature_help(&analysis, html.len() - "</script>".len()).unwrap();
        assert_eq!(help.signatures[0].label, "add(a, b)");
        assert_eq!(help.active_parameter, Some(2));

        let html = wrap("localStorage.setItem('k', ");
        let (_, analysis) = script(&html);
        let help = signature_help(&analysis, html.len() - "</script>".len()).unwrap();
        assert_eq!(help.signatures[0].label, "setItem(key: string, value: string): void");
        assert_eq!(help.active_parameter, Some(1));

        let html = wrap("Math.max(1, 2, 3, ");
        let (_, analysis) = script(&html);
        let help = signature_help(&analysis, html.len() - "</script>".len()).unwrap();
        assert_eq!(help.active_parameter, Some(0));
    }

    #[test]
    fn highlights_respect_parameter_scope() {
        let html = wrap("let x = 1;\nfunction f(x) { return x }\nx = 2; x++");
        let (doc, analysis) = script(&html);
        let outer = highlights(&doc, &analysis, at(&html, "x = 1", 0));
        let kinds: Vec<_> = outer
            .iter()
            .map(|h| (h.range.start.line, h.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (0, Some(DocumentHighlightKind::WRITE)),
                (2, Some(DocumentHighlightKind::WRITE)),
                (2, Some(DocumentHighlightKind::WRITE)),
            ]
        );
        let inner = references(&doc, &analysis, at(&html, "x }", 0));
        assert_eq!(inner.len(), 2);
        assert!(inner.iter().all(|l| l.range.start.line == 1));
    }

    #[test]
    fn definition_of_use() {
        let html = wrap("const limit = 3;\nif (n > limit) {}");
        let (doc, analysis) = script(&html);
        let found = definition(&doc, &analysis, at(&html, "limit)", 2));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range.start, Position::new(0, 14));
    }

    #[test]
    fn symbols_include_methods_with_container() {
        let html = wrap("class A { run() {} }\nvar v;");
        let (doc, analysis) = script(&html);
        let found: Vec<_> = symbols(&doc, &analysis)
            .into_iter()
            .map(|s| (s.name, s.kind, s.container_name))
            .collect();
        assert_eq!(
            found,
            vec![
                ("A".to_string(), SymbolKind::CLASS, None),
                ("run".to_string(), SymbolKind::METHOD, Some("A".to_string())),
                ("v".to_string(), SymbolKind::VARIABLE, None),
            ]
        );
    }

    #[test]
    fn folds_blocks_and_regions() {
        let html = "<script>\n// #region setup\nfunction f() {\n  a();\n  b();\n}\n\
                    // #endregion\n</script>";
        let (doc, analysis) = script(html);
        let folds: Vec<_> = folding(&doc, &analysis)
            .into_iter()
            .map(|f| (f.start_line, f.end_line))
            .collect();
        assert_eq!(folds, vec![(1, 6), (2, 4)]);
    }

    #[test]
    fn selection_expands_through_brackets() {
        let html = wrap("f(a, [b])");
        let (doc, analysis) = script(&html);
        let chain = selection_ranges(&doc, &analysis, &[at(&html, "b]", 0)]).remove(0);
        let mut widths = Vec::new();
        let mut current = Some(&chain);
        while let Some(range) = current {
            widths.push(range.range.end.character - range.range.start.character);
            current = range.parent.as_deref();
        }
        assert_eq!(widths, vec![1, 3, 6, 8]);
    }

    #[test]
    fn reindents_nested_blocks() {
        let html = "<script>\nif (a) {\nb();\n}\n</script>";
        let (doc, analysis) = script(html);
        let start = html.find("if").unwrap();
        let end = html.find("</script>").unwrap();
        let edits = format(&doc, &analysis, start..end, start, "", "\t");
        let summary: Vec<_> = edits
            .iter()
            .map(|e| (e.range.start.line, e.new_text.as_str()))
            .collect();
        assert_eq!(summary, vec![(2, "\t")]);
    }

    #[test]
    fn classifies_identifiers() {
        let html = wrap("const k = 1; function f(p) { return p + k } Math.max(k)");
        let (doc, analysis) = script(&html);
        let tokens: Vec<_> = semantic_tokens(&doc, &analysis)
            .into_iter()
            .map(|t| (t.length, t.token_type, t.modifiers))
            .collect();
        use token_modifiers::*;
        use token_types::*;
        assert_eq!(
            tokens,
            vec![
                (1, VARIABLE, READONLY | DECLARATION),
                (1, FUNCTION, DECLARATION),
                (1, PARAMETER, DECLARATION),
                (1, PARAMETER, 0),
                (1, VARIABLE, READONLY),
                (4, VARIABLE, DEFAULT_LIBRARY),
                (3, METHOD, DEFAULT_LIBRARY),
                (1, VARIABLE, READONLY),
            ]
        );
    }
}
