//! Template preprocessing and lexing.
//!
//! The body handed to the directive machine is produced in three steps:
//! comments are stripped, `@verbatim` regions are swapped for placeholders,
//! and every backtick is escaped. View-level directives that are handled
//! elsewhere are then removed, and the remainder is lexed into a stream of
//! [`Token`]s that does not depend on physical line layout.

use crate::js;
use crate::scanner::{self, read_word};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref BLADE_COMMENT: Regex = Regex::new(r"(?s)\{\{--.*?--\}\}").unwrap();
    static ref VERBATIM: Regex = Regex::new(r"(?s)@verbatim\b(.*?)@endverbatim").unwrap();
    static ref VERBATIM_PLACEHOLDER: Regex = Regex::new(r"__VERBATIM_BLOCK_(\d+)__").unwrap();
    static ref SETUP_SCRIPT: Regex = Regex::new(
        r"(?is)<script\b[^>]*\b(?:setup|import|imports|scope|scoped)\b[^>]*>.*?</script>"
    )
    .unwrap();
    static ref VIEW_REGIONS: Regex = Regex::new(
        r"(?is)@oninit\b.*?@endoninit|@register\b.*?@endregister|@setup\b.*?@endsetup|@script\b.*?@endscript"
    )
    .unwrap();
    static ref DONT_SUBSCRIBE: Regex = Regex::new(r"(?i)@dontsubscribe\b").unwrap();

    /// Directives that are only recognised at the start of a line.
    static ref BLOCK_DIRECTIVES: HashSet<&'static str> = [
        "if", "elseif", "else", "endif",
        "unless", "endunless", "isset", "endisset", "empty", "endempty",
        "auth", "endauth", "guest", "endguest", "can", "endcan", "cannot", "endcannot",
        "error", "enderror", "hasSection", "hassection", "endhasSection", "endhassection",
        "switch", "case", "default", "break", "endswitch",
        "foreach", "endforeach", "for", "endfor", "while", "endwhile",
        "section", "endsection", "show", "stop", "overwrite", "append",
        "block", "endblock", "php", "endphp", "register", "endregister",
        "wrapper", "endwrapper", "wrap", "endwrap", "template", "endtemplate",
        "follow", "endfollow", "watch", "endwatch",
    ]
    .into_iter()
    .collect();

    /// Directives whose argument list is mandatory; without one they are text.
    static ref REQUIRES_ARGS: HashSet<&'static str> = [
        "if", "elseif", "unless", "isset", "empty", "can", "cannot", "error",
        "hasSection", "hassection", "switch", "case", "foreach", "for", "while",
        "section", "block", "follow", "watch",
    ]
    .into_iter()
    .collect();

    /// Directives that may take an argument list.
    static ref ACCEPTS_ARGS: HashSet<&'static str> = [
        "auth", "guest", "php", "wrapper", "wrap", "template",
    ]
    .into_iter()
    .collect();

    static ref SERVER_START: HashSet<&'static str> =
        ["serverside", "serverSide", "ssr", "SSR", "useSSR", "useSsr"].into_iter().collect();
    static ref SERVER_END: HashSet<&'static str> = [
        "endserverside", "endServerSide", "endSSR", "endSsr", "EndSSR", "EndSsr", "endssr",
        "endusessr", "endUseSSR", "endUseSsr",
    ]
    .into_iter()
    .collect();
    static ref CLIENT_START: HashSet<&'static str> =
        ["clientside", "clientSide", "csr", "CSR", "useCSR", "useCsr"].into_iter().collect();
    static ref CLIENT_END: HashSet<&'static str> = [
        "endclientside", "endClientSide", "endcsr", "endCSR", "endCsr", "endusecsr",
        "endUseCSR", "endUseCsr",
    ]
    .into_iter()
    .collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// PREPROCESSING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preprocessed {
    pub body: String,
    /// Original contents of `@verbatim` regions, by placeholder index.
    pub verbatim: Vec<String>,
}

pub fn strip_comments(source: &str) -> String {
    BLADE_COMMENT.replace_all(source, "").into_owned()
}

/// Protects verbatim regions, escapes backticks and removes every view-level
/// directive that is consumed by another pass.
pub fn preprocess(source: &str) -> Preprocessed {
    let mut verbatim = Vec::new();
    let protected = VERBATIM.replace_all(source, |caps: &regex::Captures| {
        verbatim.push(caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default());
        format!("__VERBATIM_BLOCK_{}__", verbatim.len() - 1)
    });

    let mut body = js::escape_backticks(&protected);
    body = SETUP_SCRIPT.replace_all(&body, "").into_owned();
    body = VIEW_REGIONS.replace_all(&body, "").into_owned();
    body = DONT_SUBSCRIBE.replace_all(&body, "").into_owned();
    body = remove_directives(
        &body,
        &[
            "pageStart", "pageOpen", "pageEnd", "pageClose", "docStart", "docEnd", "await",
        ],
        ArgMode::Optional,
    );
    body = remove_directives(
        &body,
        &[
            "extends", "vars", "let", "const", "useState", "fetch", "viewType", "viewtype",
        ],
        ArgMode::Required,
    );
    body = remove_standalone_subscribe(&body);

    Preprocessed { body, verbatim }
}

pub fn restore_verbatim(text: &str, verbatim: &[String]) -> String {
    VERBATIM_PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures| {
            caps.get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .and_then(|i| verbatim.get(i))
                .map(|content| js::escape_template_text(content))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgMode {
    Optional,
    Required,
}

/// Removes `@name(...)` occurrences. An unbalanced argument list leaves the
/// directive in place. A directive that fills its whole line takes the line
/// break with it.
fn remove_directives(text: &str, names: &[&str], mode: ArgMode) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'@' || (i > 0 && (bytes[i - 1] == b'@' || scanner::is_ident_char(bytes[i - 1]))) {
            i += 1;
            continue;
        }
        let name = read_word(text, i + 1);
        if name.is_empty() || !names.contains(&name) {
            i += 1;
            continue;
        }
        let after_name = i + 1 + name.len();
        let end = match scanner::scan_args(text, after_name) {
            Some(span) => span.end(),
            None if next_non_blank(text, after_name) == Some(b'(') => {
                i = after_name;
                continue;
            }
            None if mode == ArgMode::Optional => after_name,
            None => {
                i = after_name;
                continue;
            }
        };

        let line_start = text[..i].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let line_end = text[end..].find('\n').map(|p| end + p).unwrap_or(text.len());
        let whole_line = text[line_start..i].trim().is_empty()
            && text[end..line_end].trim().is_empty()
            && line_start >= copied;
        if whole_line {
            out.push_str(&text[copied..line_start]);
            copied = (line_end + 1).min(text.len());
        } else {
            out.push_str(&text[copied..i]);
            copied = end;
        }
        i = copied.max(end);
    }
    out.push_str(&text[copied.min(text.len())..]);
    out
}

fn next_non_blank(text: &str, from: usize) -> Option<u8> {
    text.as_bytes()[from..]
        .iter()
        .copied()
        .find(|b| *b != b' ' && *b != b'\t')
}

/// A `@subscribe(...)` alone on its line configures the view and is removed.
/// One inside a tag is an attribute subscription and stays.
fn remove_standalone_subscribe(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let base = line.trim_end();
        let t = base.trim_start();
        if let Some(rest) = t.strip_prefix("@subscribe") {
            let ident_follows = rest.bytes().next().map(scanner::is_ident_char) == Some(true);
            if !ident_follows {
                let rest_start = base.len() - rest.len();
                if let Some(span) = scanner::scan_args(base, rest_start) {
                    if base[span.end()..].trim().is_empty() {
                        continue;
                    }
                } else if rest.trim().is_empty() {
                    continue;
                }
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEXER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveToken {
    pub name: String,
    pub args: Option<String>,
    /// Source text of the directive, for pass-through when it is malformed.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Directive(DirectiveToken),
}

struct Lexer<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    text: Vec<String>,
    in_pre: bool,
}

/// Lexes a preprocessed body.
pub fn lex(body: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        src: body,
        tokens: Vec::new(),
        text: Vec::new(),
        in_pre: false,
    };
    lexer.run();
    lexer.tokens
}

impl<'a> Lexer<'a> {
    fn run(&mut self) {
        let src = self.src;
        let mut pos = 0;
        while pos < src.len() {
            let line_end = src[pos..].find('\n').map(|p| pos + p).unwrap_or(src.len());
            let line = &src[pos..line_end];
            let indent = line.len() - line.trim_start().len();
            let at = pos + indent;

            if src.as_bytes().get(at) == Some(&b'@') {
                let name = read_word(src, at + 1);
                if SERVER_START.contains(name) {
                    pos = self.skip_region(line_end, &SERVER_END, false);
                    continue;
                }
                if CLIENT_START.contains(name) {
                    pos = self.skip_region(line_end, &CLIENT_END, true);
                    continue;
                }
                if let Some(next) = self.directive(at, name) {
                    pos = next;
                    continue;
                }
            }

            self.push_text_line(line);
            pos = line_end + 1;
        }
        self.flush_text();
    }

    /// Tries to lex a block directive at `at`. Returns the offset to resume
    /// from, or `None` if this is not a well-formed directive.
    fn directive(&mut self, at: usize, name: &str) -> Option<usize> {
        if !BLOCK_DIRECTIVES.contains(name) {
            return None;
        }
        let src = self.src;
        let after_name = at + 1 + name.len();
        if src.as_bytes().get(after_name).map(|b| scanner::is_ident_char(*b)) == Some(true) {
            return None;
        }

        let takes_args = REQUIRES_ARGS.contains(name) || ACCEPTS_ARGS.contains(name);
        let (args, end) = if takes_args {
            match scanner::scan_args(src, after_name) {
                Some(span) if args_stay_in_directive(span.inner(src)) => {
                    (Some(span.inner(src).to_string()), span.end())
                }
                Some(_) => return None,
                None if REQUIRES_ARGS.contains(name) => return None,
                None if next_non_blank(src, after_name) == Some(b'(') => return None,
                None => (None, after_name),
            }
        } else {
            (None, after_name)
        };

        self.flush_text();
        self.tokens.push(Token::Directive(DirectiveToken {
            name: name.to_string(),
            args,
            raw: src[at..end].to_string(),
        }));

        // Whatever follows on the same line is lexed as a line of its own.
        let line_end = src[end..].find('\n').map(|p| end + p).unwrap_or(src.len());
        if src[end..line_end].trim().is_empty() {
            Some(line_end + 1)
        } else {
            Some(end)
        }
    }

    /// Skips past a server-only or client-only region. Client-only content is
    /// kept as plain text with its markers removed.
    fn skip_region(&mut self, from: usize, end_markers: &HashSet<&str>, keep: bool) -> usize {
        let src = self.src;
        let mut pos = from + 1;
        while pos < src.len() {
            let line_end = src[pos..].find('\n').map(|p| pos + p).unwrap_or(src.len());
            let line = &src[pos..line_end];
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix('@') {
                if end_markers.contains(read_word(rest, 0)) {
                    return line_end + 1;
                }
            }
            if keep {
                self.push_text_line(line);
            }
            pos = line_end + 1;
        }
        src.len()
    }

    fn push_text_line(&mut self, line: &str) {
        let trimmed = if self.in_pre {
            line.trim_end()
        } else {
            line.trim()
        };
        self.text.push(trimmed.to_string());
        if line.contains("</pre>") {
            self.in_pre = false;
        } else if line.contains("<pre") {
            self.in_pre = true;
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text).join("\n");
            self.tokens.push(Token::Text(text));
        }
    }
}

/// Argument lists may span lines, but never swallow a line that starts
/// another directive.
fn args_stay_in_directive(args: &str) -> bool {
    args.lines()
        .skip(1)
        .all(|l| !l.trim_start().starts_with('@') || l.trim_start().starts_with("@{"))
}
