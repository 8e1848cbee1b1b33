//! Expression translation.
//!
//! Rewrites a template-language expression fragment into runtime JavaScript:
//! sigils are stripped, `->`/`::` become member access, string concatenation
//! becomes `+`, array literals become JS arrays or objects, and bare function
//! calls are routed to `App.View` or `App.Helper`.
//!
//! The rewrite is a single left-to-right pass over a character buffer and is
//! idempotent: feeding its output back in yields the same text.

use crate::scanner;
use lazy_static::lazy_static;
use std::collections::HashSet;

// ═══════════════════════════════════════════════════════════════════════════════
// FUNCTION NAMESPACES
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime operations owned by the view engine. Everything else is a helper.
pub const VIEW_FUNCTIONS: [&str; 46] = [
    "generateViewId",
    "execute",
    "evaluate",
    "escString",
    "text",
    "templateToDom",
    "view",
    "loadView",
    "renderView",
    "include",
    "includeIf",
    "extendView",
    "setSuperViewPath",
    "addViewEngine",
    "callViewEngineMounted",
    "startWrapper",
    "endWrapper",
    "registerSubscribe",
    "section",
    "yield",
    "yieldContent",
    "renderSections",
    "hasSection",
    "getChangedSections",
    "resetChangedSections",
    "isChangedSection",
    "emitChangedSections",
    "push",
    "stack",
    "once",
    "route",
    "on",
    "off",
    "emit",
    "init",
    "setApp",
    "setContainer",
    "clearOldRendering",
    "isAuth",
    "can",
    "cannot",
    "hasError",
    "firstError",
    "csrfToken",
    "foreach",
    "foreachTemplate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionNamespace {
    View,
    Helper,
}

impl FunctionNamespace {
    pub fn classify(name: &str) -> Self {
        if VIEW_FUNCTIONS.contains(&name) {
            FunctionNamespace::View
        } else {
            FunctionNamespace::Helper
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            FunctionNamespace::View => "App.View",
            FunctionNamespace::Helper => "App.Helper",
        }
    }

    /// `name` qualified with its namespace, e.g. `App.Helper.url`.
    pub fn qualify(name: &str) -> String {
        format!("{}.{}", Self::classify(name).prefix(), name)
    }
}

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = [
        "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "finally",
        "function", "return", "typeof", "instanceof", "new", "delete", "void", "in", "of",
        "await", "async", "yield", "with", "super", "this", "import", "export", "class",
        "let", "const", "var", "throw", "true", "false", "null", "undefined",
    ]
    .into_iter()
    .collect();

    pub static ref JS_GLOBALS: HashSet<&'static str> = [
        "App", "Math", "console", "JSON", "Date", "String", "Number", "Boolean", "Array",
        "Object", "Promise", "Map", "Set", "Error", "RegExp", "Symbol", "parseInt",
        "parseFloat", "isNaN", "isFinite", "encodeURIComponent", "decodeURIComponent",
        "encodeURI", "decodeURI", "setTimeout", "clearTimeout", "setInterval",
        "clearInterval", "requestAnimationFrame", "alert", "confirm", "prompt", "fetch",
        "window", "document", "localStorage", "sessionStorage", "structuredClone",
        "queueMicrotask",
    ]
    .into_iter()
    .collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Names declared by the template itself. Calls to these stay unqualified.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: HashSet<String>,
    frozen: bool,
}

impl BindingTable {
    pub fn new() -> Self {
        BindingTable::default()
    }

    /// Returns false once the table is frozen.
    pub fn add(&mut self, name: &str) -> bool {
        if self.frozen {
            return false;
        }
        self.bindings.insert(name.to_string());
        true
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains(name)
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn bindings(&self) -> &HashSet<String> {
        &self.bindings
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSLATOR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum Prev {
    Nothing,
    Word(String),
    Punct(char),
    Literal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Translator<'a> {
    bindings: Option<&'a BindingTable>,
}

/// Translates with no template-local bindings.
pub fn translate(expr: &str) -> String {
    Translator::default().translate(expr)
}

impl<'a> Translator<'a> {
    pub fn new(bindings: &'a BindingTable) -> Self {
        Translator {
            bindings: Some(bindings),
        }
    }

    pub fn translate(&self, expr: &str) -> String {
        let chars: Vec<char> = expr.trim().chars().collect();
        self.translate_chars(&chars)
    }

    fn is_local(&self, name: &str) -> bool {
        self.bindings.map(|b| b.has(name)).unwrap_or(false)
    }

    fn routable(&self, word: &str, prev: &Prev) -> bool {
        if word.contains('$') || KEYWORDS.contains(word) || JS_GLOBALS.contains(word) {
            return false;
        }
        match prev {
            Prev::Punct('.') => return false,
            Prev::Word(text) if text == "new" || text == "function" => return false,
            _ => {}
        }
        !self.is_local(word)
    }

    fn translate_chars(&self, chars: &[char]) -> String {
        let mut out = String::with_capacity(chars.len() + 16);
        let mut prev = Prev::Nothing;
        let mut i = 0;
        let n = chars.len();

        while i < n {
            let c = chars[i];
            match c {
                '\\' => {
                    out.push(c);
                    if i + 1 < n {
                        out.push(chars[i + 1]);
                    }
                    i += 2;
                }
                '\'' | '"' | '`' => {
                    let end = string_end(chars, i);
                    push_string(&mut out, &chars[i..end]);
                    prev = Prev::Literal;
                    i = end;
                }
                '$' if i + 1 < n && is_start(chars[i + 1]) && !ends_with_ident(&out) => {
                    let (word, next) = read_ident(chars, i + 1);
                    out.push_str(&word);
                    prev = Prev::Word(word);
                    i = next;
                }
                c if is_ident(c) && ends_with_ident(&out) => {
                    out.push(c);
                    i += 1;
                }
                c if is_start(c) && !ends_with_ident(&out) => {
                    let (word, next) = read_ident(chars, i);
                    let call_at = skip_ws(chars, next);
                    let is_call = call_at < n && chars[call_at] == '(';

                    if word == "fn" && is_call {
                        // arrow shorthand: fn($x) => ... becomes ($x) => ...
                        i = call_at;
                        continue;
                    }
                    if is_call && self.routable(&word, &prev) {
                        out.push_str(&FunctionNamespace::qualify(&word));
                    } else {
                        out.push_str(&word);
                    }
                    prev = Prev::Word(word);
                    i = next;
                }
                c if c.is_ascii_digit() && !ends_with_ident(&out) => {
                    let end = number_end(chars, i);
                    out.extend(&chars[i..end]);
                    prev = Prev::Literal;
                    i = end;
                }
                '-' if peek(chars, i + 1) == Some('>') => {
                    out.push('.');
                    prev = Prev::Punct('.');
                    i += 2;
                }
                '?' if peek(chars, i + 1) == Some('-') && peek(chars, i + 2) == Some('>') => {
                    out.push_str("?.");
                    prev = Prev::Punct('.');
                    i += 3;
                }
                '?' if peek(chars, i + 1) == Some('.') => {
                    out.push_str("?.");
                    prev = Prev::Punct('.');
                    i += 2;
                }
                ':' if peek(chars, i + 1) == Some(':') => {
                    out.push('.');
                    prev = Prev::Punct('.');
                    i += 2;
                }
                '.' => {
                    if peek(chars, i + 1) == Some('.') && peek(chars, i + 2) == Some('.') {
                        out.push_str("...");
                        prev = Prev::Punct(',');
                        i += 3;
                    } else if peek(chars, i + 1) == Some('=') {
                        out.push_str("+=");
                        prev = Prev::Punct('=');
                        i += 2;
                    } else if is_concat(chars, i) {
                        let trimmed = out.trim_end().len();
                        out.truncate(trimmed);
                        out.push_str(" + ");
                        prev = Prev::Punct('+');
                        i = skip_ws(chars, i + 1);
                    } else {
                        out.push('.');
                        prev = Prev::Punct('.');
                        i += 1;
                    }
                }
                '[' => {
                    let text: String = chars[i..].iter().collect();
                    let Some(span) = scanner::scan_balanced(&text, 0) else {
                        // Unbalanced: keep the bracket and translate what follows.
                        out.push('[');
                        prev = Prev::Punct('[');
                        i += 1;
                        continue;
                    };
                    let inner = span.inner(&text);
                    let consumed = inner.chars().count() + 2;
                    if is_index_position(&prev) {
                        out.push('[');
                        out.push_str(&self.translate(inner));
                        out.push(']');
                    } else {
                        out.push_str(&self.translate_array(inner));
                    }
                    prev = Prev::Punct(']');
                    i += consumed;
                }
                c if c.is_whitespace() => {
                    out.push(c);
                    i += 1;
                }
                _ => {
                    out.push(c);
                    prev = Prev::Punct(c);
                    i += 1;
                }
            }
        }
        out
    }

    /// `[...]` in value position. Any top-level `=>` with a key-shaped left
    /// side turns the literal into an object.
    fn translate_array(&self, inner: &str) -> String {
        let items = scanner::split_top_level(inner, b',');
        let pairs: Vec<Option<(&str, &str)>> = items.iter().map(|item| split_pair(item)).collect();

        if pairs.iter().any(|p| p.is_some()) {
            let mut auto_index = 0usize;
            let entries: Vec<String> = items
                .iter()
                .zip(pairs)
                .map(|(item, pair)| match pair {
                    Some((key, value)) => {
                        format!("{}: {}", self.object_key(key), self.translate(value))
                    }
                    None => {
                        let entry = format!("\"{}\": {}", auto_index, self.translate(item));
                        auto_index += 1;
                        entry
                    }
                })
                .collect();
            format!("{{{}}}", entries.join(", "))
        } else {
            let entries: Vec<String> = items.iter().map(|item| self.translate(item)).collect();
            format!("[{}]", entries.join(", "))
        }
    }

    fn object_key(&self, key: &str) -> String {
        let key = key.trim();
        if scanner::unquote(key).is_some() {
            return self.translate(key);
        }
        if key.chars().all(|c| c.is_ascii_digit()) {
            return format!("\"{}\"", key);
        }
        if let Some(var) = key.strip_prefix('$') {
            return format!("[{}]", self.translate(&format!("${}", var)));
        }
        format!("\"{}\"", key)
    }
}

/// `key => value` split for array items; the key must look like a key.
fn split_pair(item: &str) -> Option<(&str, &str)> {
    let at = scanner::find_top_level(item, "=>")?;
    let key = item[..at].trim();
    let value = item[at + 2..].trim();
    let key_like = scanner::unquote(key).is_some()
        || (!key.is_empty()
            && key
                .trim_start_matches('$')
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-'));
    if key_like && !key.is_empty() {
        Some((key, value))
    } else {
        None
    }
}

fn is_index_position(prev: &Prev) -> bool {
    match prev {
        Prev::Word(text) => !KEYWORDS.contains(text.as_str()) || text == "this",
        Prev::Punct(c) => matches!(c, ')' | ']'),
        Prev::Literal => true,
        Prev::Nothing => false,
    }
}

fn is_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn ends_with_ident(out: &str) -> bool {
    out.chars().last().map(is_ident).unwrap_or(false)
}

fn peek(chars: &[char], i: usize) -> Option<char> {
    chars.get(i).copied()
}

fn read_ident(chars: &[char], from: usize) -> (String, usize) {
    let mut end = from;
    while end < chars.len() && is_ident(chars[end]) {
        end += 1;
    }
    (chars[from..end].iter().collect(), end)
}

fn skip_ws(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn number_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() {
        let c = chars[i];
        let decimal_dot = c == '.' && chars.get(i + 1).map(|d| d.is_ascii_digit()).unwrap_or(false);
        if c.is_ascii_alphanumeric() || c == '_' || decimal_dot {
            i += 1;
        } else {
            break;
        }
    }
    i
}

/// Index just past the closing quote, or end of input if unterminated.
fn string_end(chars: &[char], open: usize) -> usize {
    let quote = chars[open];
    let mut i = open + 1;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Single-quoted strings without escapes or embedded double quotes are
/// normalized to double quotes; everything else is copied as written.
fn push_string(out: &mut String, literal: &[char]) {
    let closed = literal.len() >= 2 && literal[literal.len() - 1] == literal[0];
    if literal[0] == '\'' && closed {
        let body = &literal[1..literal.len() - 1];
        if !body.iter().any(|&c| c == '"' || c == '\\') {
            out.push('"');
            out.extend(body);
            out.push('"');
            return;
        }
    }
    out.extend(literal);
}

/// A `.` is concatenation when it touches a quote or sigil, or is spaced on
/// both sides.
fn is_concat(chars: &[char], i: usize) -> bool {
    let before = if i > 0 { chars.get(i - 1).copied() } else { None };
    let after = chars.get(i + 1).copied();
    let quote = |c: Option<char>| matches!(c, Some('\'') | Some('"'));
    if quote(before) || quote(after) || after == Some('$') {
        return true;
    }
    let space = |c: Option<char>| c.map(|c| c.is_whitespace()).unwrap_or(false);
    space(before) && space(after)
}
