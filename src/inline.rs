//! Directives and echoes that may appear anywhere inside a text run.

use crate::events;
use crate::js::{self, quote_single, Expr};
use crate::scanner::{self, read_word};
use crate::transform::{FunctionNamespace, Translator};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RAW_VARIABLE: Regex =
        Regex::new(r"\{\s*\$([A-Za-z_]\w*(?:(?:->|\.)[A-Za-z_]\w*)*)\s*\}").unwrap();
    static ref YIELD_ATTR_GROUP: Regex = Regex::new(r#"\s*data-yield-attr="([^"]*)""#).unwrap();
    static ref INDEX_ACCESS: Regex = Regex::new(r#"\[\s*['"]?([\w-]+)['"]?\s*\]"#).unwrap();
}

const YIELD_ATTR: &str = "data-yield-attr";

/// Applies every inline rewrite to one text run.
pub fn process_text(text: &str, translator: &Translator) -> String {
    let mut out = events::process_events(text, translator);
    out = process_bindings(&out);
    out = process_attribute_subscriptions(&out);
    out = process_blocks(&out, translator);
    out = process_yield_attributes(&out);
    out = process_includes(&out, translator);
    out = process_simple(&out, translator);
    process_echoes(&out, translator)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVE REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

/// Calls `rewrite(name, args)` for every `@name` in `text` and substitutes the
/// returned text. `args` is `None` when no argument list follows. Returning
/// `None` leaves the directive untouched, as does an unbalanced argument
/// list.
pub fn rewrite_directives<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str, Option<&str>) -> Option<String>,
{
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        let boundary = i == 0 || !(bytes[i - 1] == b'@' || scanner::is_ident_char(bytes[i - 1]));
        if bytes[i] != b'@' || !boundary {
            i += 1;
            continue;
        }
        let name = read_word(text, i + 1);
        if name.is_empty() {
            i += 1;
            continue;
        }
        let after_name = i + 1 + name.len();
        let (args, end) = match scanner::scan_args(text, after_name) {
            Some(span) => (Some(span.inner(text)), span.end()),
            None => (None, after_name),
        };
        let unbalanced = args.is_none()
            && text[after_name..].trim_start_matches([' ', '\t']).starts_with('(');
        if unbalanced {
            i = after_name;
            continue;
        }
        match rewrite(name, args) {
            Some(replacement) => {
                out.push_str(&text[copied..i]);
                out.push_str(&replacement);
                copied = end;
                i = end;
            }
            None => i = after_name,
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// A quoted literal without interpolation is kept single-quoted; anything
/// else is translated.
fn literal_or_expr(arg: &str, translator: &Translator) -> String {
    match scanner::unquote(arg) {
        Some(inner) if !inner.contains('$') => quote_single(inner),
        _ => translator.translate(arg),
    }
}

fn translate_args(args: &str, translator: &Translator) -> Vec<String> {
    scanner::split_top_level(args, b',')
        .into_iter()
        .map(|a| literal_or_expr(a, translator))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTE DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

/// `@val($user->name)` / `@bind(...)` become `data-binding="user.name"`.
fn process_bindings(text: &str) -> String {
    rewrite_directives(text, |name, args| match name {
        "val" | "bind" => {
            let path = args?.trim().replace('$', "").replace("->", ".");
            let path = INDEX_ACCESS.replace_all(&path, ".$1");
            Some(format!("data-binding=\"{}\"", path))
        }
        _ => None,
    })
}

/// In-tag `@subscribe(...)` registers attribute-level subscriptions.
fn process_attribute_subscriptions(text: &str) -> String {
    rewrite_directives(text, |name, args| {
        if name != "subscribe" {
            return None;
        }
        let args = args?.trim();
        let mut targets: Vec<(String, Vec<String>)> = Vec::new();
        let mut add = |attr: String, key: String| {
            match targets.iter_mut().find(|(a, _)| *a == attr) {
                Some((_, keys)) => keys.push(key),
                None => targets.push((attr, vec![key])),
            }
        };

        let parts = scanner::split_top_level(args, b',');
        if parts.len() == 2 && scanner::unquote(parts[1]).is_some() {
            let attr = scanner::bare_name(parts[1]);
            for key in state_keys(parts[0]) {
                add(attr.clone(), key);
            }
        } else if args.starts_with('[') && args.ends_with(']') {
            for item in scanner::split_top_level(&args[1..args.len() - 1], b',') {
                match scanner::find_top_level(item, "=>") {
                    Some(at) => {
                        let (left, right) = (item[..at].trim(), item[at + 2..].trim());
                        if left.starts_with('$') {
                            add(scanner::bare_name(right), scanner::bare_name(left));
                        } else {
                            add(scanner::bare_name(left), scanner::bare_name(right));
                        }
                    }
                    None => add("#all".to_string(), scanner::bare_name(item)),
                }
            }
        } else {
            for part in parts {
                add("#all".to_string(), scanner::bare_name(part));
            }
        }

        let object = Expr::Object(
            targets
                .into_iter()
                .map(|(attr, keys)| (attr, Expr::string_list(keys)))
                .collect(),
        );
        Some(format!("${{this.__subscribe({})}}", js::print_inline(&object)))
    })
}

fn state_keys(arg: &str) -> Vec<String> {
    let arg = arg.trim();
    if arg.starts_with('[') && arg.ends_with(']') {
        scanner::split_top_level(&arg[1..arg.len() - 1], b',')
            .into_iter()
            .map(scanner::bare_name)
            .collect()
    } else {
        vec![scanner::bare_name(arg)]
    }
}

/// `@onBlock` subscribes to a named block; `@useBlock`/`@mount`/`@mountBlock`
/// render one in place.
fn process_blocks(text: &str, translator: &Translator) -> String {
    rewrite_directives(text, |name, args| match name {
        "onBlock" | "onblock" => Some(format!(
            "${{this.__subscribeBlock({})}}",
            translate_args(args?, translator).join(", ")
        )),
        "useBlock" | "mount" | "mountBlock" => Some(format!(
            "${{this.__useBlock({})}}",
            translate_args(args?, translator).join(", ")
        )),
        _ => None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// YIELD ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

fn process_yield_attributes(text: &str) -> String {
    let rewritten = rewrite_directives(text, |name, args| {
        let lower = name.to_ascii_lowercase();
        if !matches!(
            lower.as_str(),
            "yieldon" | "onyield" | "yieldlisten" | "yieldwatch" | "yieldattr"
        ) {
            return None;
        }
        let args = args?.trim();
        if args.starts_with('[') && args.ends_with(']') {
            return Some(yield_array(&args[1..args.len() - 1]));
        }
        let parts = scanner::split_top_level(args, b',');
        if parts.len() < 2 {
            return None;
        }
        let attr = scanner::bare_name(parts[0]);
        let key = scanner::bare_name(parts[1]);
        let default = parts
            .get(2)
            .map(|d| quote_single(&scanner::bare_name(d)))
            .unwrap_or_else(|| "null".to_string());
        Some(format!(
            "{}=\"${{App.View.yieldContent({}, {})}}\" {}=\"{}:{}\"",
            attr,
            quote_single(&key),
            default,
            YIELD_ATTR,
            attr,
            key
        ))
    });
    merge_yield_attr_groups(&rewritten)
}

fn yield_array(items: &str) -> String {
    let mut attrs = Vec::new();
    let mut subscribed = Vec::new();
    for item in scanner::split_top_level(items, b',') {
        let Some(at) = scanner::find_top_level(item, "=>") else {
            continue;
        };
        let key = scanner::bare_name(&item[..at]);
        let value = scanner::bare_name(&item[at + 2..]);
        match key.as_str() {
            "#content" => attrs.push(format!("data-yield-content=\"{}\"", value)),
            "#children" => attrs.push(format!("data-yield-children=\"{}\"", value)),
            _ => {
                attrs.push(format!(
                    "{}=\"${{App.View.yieldContent({}, null)}}\"",
                    key,
                    quote_single(&value)
                ));
                subscribed.push(format!("{}:{}", key, value));
            }
        }
    }
    if !subscribed.is_empty() {
        attrs.push(format!("{}=\"{}\"", YIELD_ATTR, subscribed.join(",")));
    }
    attrs.join(" ")
}

/// Several yield attributes on one tag collapse into a single
/// `data-yield-attr` list.
fn merge_yield_attr_groups(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (n, line) in text.split('\n').enumerate() {
        if n > 0 {
            out.push('\n');
        }
        let groups: Vec<String> = YIELD_ATTR_GROUP
            .captures_iter(line)
            .map(|c| c[1].to_string())
            .collect();
        if groups.len() < 2 {
            out.push_str(line);
            continue;
        }
        let stripped = YIELD_ATTR_GROUP.replace_all(line, "");
        let merged = format!(" {}=\"{}\"", YIELD_ATTR, groups.join(","));
        match stripped.find('>') {
            Some(at) => {
                let at = if stripped[..at].ends_with('/') { at - 1 } else { at };
                out.push_str(&stripped[..at]);
                out.push_str(&merged);
                out.push_str(&stripped[at..]);
            }
            None => {
                out.push_str(&stripped);
                out.push_str(&merged);
            }
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// INCLUDES AND SIMPLE DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

fn process_includes(text: &str, translator: &Translator) -> String {
    rewrite_directives(text, |name, args| {
        let method = match name {
            "include" => "__include",
            "includeIf" | "includeif" => "__includeif",
            "includeWhen" | "includewhen" => "__includewhen",
            _ => return None,
        };
        let mut parts = translate_args(args?, translator);
        if parts.is_empty() {
            return None;
        }
        let view_args = if method == "__includewhen" { 3 } else { 2 };
        if parts.len() < view_args {
            parts.push("{}".to_string());
        }
        Some(format!(
            "${{App.View.renderView(this.{}({}))}}",
            method,
            parts.join(", ")
        ))
    })
}

fn process_simple(text: &str, translator: &Translator) -> String {
    rewrite_directives(text, |name, args| match name {
        "yield" => Some(format!(
            "${{App.View.yield({})}}",
            translate_args(args?, translator).join(", ")
        )),
        "viewId" | "viewid" => Some("${App.View.generateViewId()}".to_string()),
        "csrf" => Some(
            "<input type=\"hidden\" name=\"_token\" value=\"${App.View.csrfToken()}\">".to_string(),
        ),
        "method" => Some(format!(
            "<input type=\"hidden\" name=\"_method\" value=\"{}\">",
            scanner::bare_name(args?).to_uppercase()
        )),
        "json" | "lang" | "choice" => Some(format!(
            "${{{}({})}}",
            FunctionNamespace::qualify(name),
            translate_args(args?, translator).join(", ")
        )),
        _ => None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// ECHOES
// ═══════════════════════════════════════════════════════════════════════════════

/// `{!! e !!}` raw, `{{ e }}` escaped, `{$v}` raw variable. `@{{ ... }}`
/// is emitted literally without the `@`; raw variables are only replaced in
/// the text between echoes.
fn process_echoes(text: &str, translator: &Translator) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let raw_at = rest.find("{!!");
        let esc_at = rest.find("{{");
        let (at, raw) = match (raw_at, esc_at) {
            (Some(r), Some(e)) if r < e => (r, true),
            (_, Some(e)) => (e, false),
            (Some(r), None) => (r, true),
            (None, None) => break,
        };
        let (close, skip) = if raw { ("!!}", 3) } else { ("}}", 2) };
        let Some(len) = rest[at + skip..].find(close) else {
            break;
        };
        let expr = rest[at + skip..at + skip + len].trim();
        let end = at + skip + len + close.len();

        if !raw && rest[..at].ends_with('@') {
            out.push_str(&replace_raw_variables(&rest[..at - 1], translator));
            out.push_str(&rest[at..end]);
        } else {
            out.push_str(&replace_raw_variables(&rest[..at], translator));
            let js = translator.translate(expr);
            if raw || js.starts_with('[') || js.starts_with('{') {
                out.push_str(&format!("${{{}}}", js));
            } else {
                out.push_str(&format!("${{App.View.escString({})}}", js));
            }
        }
        rest = &rest[end..];
    }
    out.push_str(&replace_raw_variables(rest, translator));
    out
}

fn replace_raw_variables(text: &str, translator: &Translator) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for caps in RAW_VARIABLE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if m.start() > 0 && text.as_bytes()[m.start() - 1] == b'$' {
            continue;
        }
        out.push_str(&text[copied..m.start()]);
        out.push_str(&format!("${{{}}}", translator.translate(&format!("${}", &caps[1]))));
        copied = m.end();
    }
    out.push_str(&text[copied..]);
    out
}
