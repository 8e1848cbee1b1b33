//! View-level configuration directives.
//!
//! These are read from the comment-stripped source once per view and feed
//! the module metadata rather than the rendered template: layout
//! inheritance (`@extends`), deferred data (`@await`, `@fetch`), explicit
//! subscription, view type and `@onInit` bodies.

use crate::js::{self, Expr};
use crate::scanner;
use crate::transform::Translator;
use crate::validate::Subscription;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXTENDS: Regex = Regex::new(r"@extends\s*\(").unwrap();
    static ref FETCH: Regex = Regex::new(r"@fetch\s*\(").unwrap();
    static ref AWAIT: Regex = Regex::new(r"@await\b").unwrap();
    static ref VIEW_TYPE: Regex =
        Regex::new(r#"(?i)@viewtype\s*\(\s*['"]?([\w-]+)['"]?\s*\)"#).unwrap();
    static ref INIT_BLOCK: Regex = Regex::new(r"(?is)@oninit\b(.*?)@endoninit").unwrap();
    static ref DONT_SUBSCRIBE: Regex = Regex::new(r"(?i)@dontsubscribe\b").unwrap();
    static ref INTERPOLATED_VAR: Regex = Regex::new(r"\$([A-Za-z_]\w*)").unwrap();
}

/// Parent layout reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperView {
    /// A plain view name such as `layouts.app`.
    Literal(String),
    /// A JavaScript expression computing the name.
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extends {
    pub view: SuperView,
    pub data: Option<String>,
}

impl Extends {
    /// Value for the `superView` metadata key.
    pub fn metadata_value(&self) -> String {
        match &self.view {
            SuperView::Literal(name) => js::quote_single(name),
            SuperView::Expr(expr) => expr.clone(),
        }
    }
}

/// First balanced argument list of a directive matched by `pattern`.
fn first_args<'s>(pattern: &Regex, source: &'s str) -> Option<&'s str> {
    let m = pattern.find(source)?;
    scanner::scan_balanced(source, m.end() - 1).map(|span| span.inner(source))
}

pub fn has_await(source: &str) -> bool {
    AWAIT.is_match(source)
}

pub fn has_fetch(source: &str) -> bool {
    FETCH.is_match(source)
}

pub fn parse_extends(source: &str, translator: &Translator) -> Option<Extends> {
    let args = first_args(&EXTENDS, source)?;
    let parts = scanner::split_top_level(args, b',');
    let first = parts.first()?.trim();

    let view = if first.starts_with('"') && first.contains('$') {
        let inner = scanner::unquote(first).unwrap_or(first);
        let body = INTERPOLATED_VAR.replace_all(inner, "$${$1}");
        SuperView::Expr(format!("`{}`", js::escape_backticks(&body)))
    } else {
        match scanner::unquote(first) {
            Some(name) if !name.contains('$') => SuperView::Literal(name.to_string()),
            _ => SuperView::Expr(translator.translate(first)),
        }
    };
    let data = parts.get(1).map(|d| translator.translate(d));
    Some(Extends { view, data })
}

/// `@fetch([...])` as a request config object, or any other argument as a
/// translated expression.
pub fn parse_fetch(source: &str, translator: &Translator) -> Option<String> {
    let args = first_args(&FETCH, source)?.trim();
    if !(args.starts_with('[') && args.ends_with(']')) {
        return Some(translator.translate(args));
    }

    let mut url = Expr::Null;
    let mut method = "GET".to_string();
    let mut data = Expr::raw("{}");
    let mut headers = Expr::raw("{}");
    let mut positional = 0;
    for item in scanner::split_top_level(&args[1..args.len() - 1], b',') {
        let (key, value) = match scanner::find_top_level(item, "=>") {
            Some(at) => (scanner::bare_name(&item[..at]), item[at + 2..].trim()),
            None => {
                positional += 1;
                let key = if positional == 1 { "url" } else { "method" };
                (key.to_string(), item)
            }
        };
        match key.as_str() {
            "url" => url = Expr::raw(translator.translate(value)),
            "method" => method = scanner::bare_name(value).to_uppercase(),
            "data" | "params" | "body" => data = Expr::raw(translator.translate(value)),
            "headers" => headers = Expr::raw(translator.translate(value)),
            _ => {}
        }
    }
    let config = Expr::Object(vec![
        ("url".to_string(), url),
        ("method".to_string(), Expr::Json(method)),
        ("data".to_string(), data),
        ("headers".to_string(), headers),
    ]);
    Some(js::print_inline(&config))
}

/// Interprets a subscription argument: `true`/`@all`, `false`, a key list or
/// a single `$key`.
pub fn parse_subscription(value: &str) -> Subscription {
    let v = value.trim();
    match v {
        "" | "true" | "@all" | "'@all'" | "\"@all\"" | "'all'" | "\"all\"" => {
            return Subscription::All
        }
        "false" => return Subscription::Off,
        _ => {}
    }
    let list = if v.starts_with('[') && v.ends_with(']') {
        &v[1..v.len() - 1]
    } else {
        v
    };
    let keys: Vec<String> = scanner::split_top_level(list, b',')
        .into_iter()
        .map(scanner::bare_name)
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        Subscription::Off
    } else {
        Subscription::Keys(keys)
    }
}

/// Explicit view-level subscription: a `@subscribe(...)` alone on its line,
/// or `@dontsubscribe`.
pub fn parse_subscribe(source: &str) -> Option<Subscription> {
    if DONT_SUBSCRIBE.is_match(source) {
        return Some(Subscription::Off);
    }
    for line in source.lines() {
        let t = line.trim();
        let Some(rest) = t.strip_prefix("@subscribe") else {
            continue;
        };
        if rest.bytes().next().map(scanner::is_ident_char) == Some(true) {
            continue;
        }
        if rest.trim().is_empty() {
            return Some(Subscription::All);
        }
        let offset = t.len() - rest.len();
        if let Some(span) = scanner::scan_args(t, offset) {
            if t[span.end()..].trim().is_empty() {
                return Some(parse_subscription(span.inner(t)));
            }
        }
    }
    None
}

pub fn parse_view_type(source: &str) -> String {
    VIEW_TYPE
        .captures(source)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "view".to_string())
}

/// Bodies of every `@onInit ... @endOnInit` block, joined.
pub fn parse_init(source: &str) -> String {
    INIT_BLOCK
        .captures_iter(source)
        .map(|c| c[1].trim().to_string())
        .filter(|body| !body.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
