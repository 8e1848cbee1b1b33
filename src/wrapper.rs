//! Wrapper extraction.
//!
//! `@wrap(...)` compiles to a `__WRAPPER_CONFIG__ = {...};` marker and
//! `@endwrap` to [`WRAPPER_END`]. After the directive machine has run, the
//! body is split at those markers: the config object is lifted into the
//! view metadata, the region between the markers becomes the rendered
//! template, and only structural directive fragments survive from the
//! regions outside it.
//!
//! Shared wrapper boilerplate is read from a resources file once per
//! process (or once per [`crate::Compiler`]) and never mutated.

use crate::layout;
use crate::scanner;
use crate::transform::Translator;
use crate::validate::{Subscription, WrapperConfig, WrapperSplit};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const WRAPPER_CONFIG: &str = "__WRAPPER_CONFIG__";
pub const WRAPPER_END: &str = "__WRAPPER_END__";
pub const DEFAULT_WRAPPER_FILE: &str = "resources/js/templates/wraper.js";

/// Fragments that keep their side effects when they sit outside the
/// wrapped region.
const STRUCTURAL_PREFIXES: [&str; 6] = [
    "App.View.execute(",
    "App.View.section(",
    "this.__section(",
    "this.__useBlock(",
    "App.View.useBlock(",
    "this.__subscribeBlock(",
];

lazy_static! {
    static ref CONFIG_MARKER: Regex = Regex::new(r"__WRAPPER_CONFIG__\s*=\s*\{").unwrap();
    static ref CONFIG_SUBSCRIBE: Regex =
        Regex::new(r"(?s)\s*\bsubscribe\s*:\s*(true|false|\[[^\]]*\])\s*,?").unwrap();
    static ref FUNCTION_REGION: Regex = Regex::new(
        r"(?s)//[ \t]*start wrapper[ \t]*\r?\n(.*?)//[ \t]*end wrapper[ \t]*(?:\r?\n|$)"
    )
    .unwrap();
    static ref CONFIG_REGION: Regex = Regex::new(
        r"(?s)//[ \t]*start wrapper config[ \t]*\r?\n(.*?)//[ \t]*end wrapper config"
    )
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// @wrap ARGUMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses `@wrap` arguments.
///
/// Accepted shapes, freely mixed: a positional tag, a positional attribute
/// array, `key => value` pairs (bare or inside `[...]`), `key: value` and
/// `$key = value`. Keys other than `tag`, `follow`, `subscribe` and
/// `attributes` become attributes.
pub fn parse_wrap_args(args: &str, translator: &Translator) -> WrapperConfig {
    let mut config = WrapperConfig::default();
    let args = args.trim();
    let items: Vec<&str> = if args.starts_with('[') && args.ends_with(']') {
        scanner::split_top_level(&args[1..args.len() - 1], b',')
    } else {
        scanner::split_top_level(args, b',')
    };

    let mut positional = 0;
    for item in items {
        match split_pair(item) {
            Some((key, value)) => apply_option(&mut config, &key, value, translator),
            None => {
                positional += 1;
                if positional == 1 && !item.starts_with('[') {
                    config.tag = Some(scanner::bare_name(item));
                } else {
                    collect_attributes(&mut config, item, translator);
                }
            }
        }
    }
    config
}

fn split_pair(item: &str) -> Option<(String, &str)> {
    if let Some(at) = scanner::find_top_level(item, "=>") {
        return Some((scanner::bare_name(&item[..at]), item[at + 2..].trim()));
    }
    if item.starts_with('$') {
        if let Some(at) = scanner::find_assignment(item) {
            return Some((scanner::bare_name(&item[..at]), item[at + 1..].trim()));
        }
    }
    let at = scanner::find_top_level(item, ":")?;
    let key = item[..at].trim();
    let simple = scanner::unquote(key).is_some() || scanner::read_word(key, 0) == key;
    if key.is_empty() || !simple {
        return None;
    }
    Some((scanner::bare_name(key), item[at + 1..].trim()))
}

fn apply_option(config: &mut WrapperConfig, key: &str, value: &str, translator: &Translator) {
    match key {
        "tag" => config.tag = Some(scanner::bare_name(value)),
        "follow" => config.follow = layout::parse_subscription(value),
        "subscribe" => config.subscribe = Some(layout::parse_subscription(value)),
        "attributes" | "attrs" => collect_attributes(config, value, translator),
        other => config
            .attributes
            .push((other.to_string(), translator.translate(value))),
    }
}

fn collect_attributes(config: &mut WrapperConfig, value: &str, translator: &Translator) {
    let v = value.trim();
    let body = if (v.starts_with('[') && v.ends_with(']')) || (v.starts_with('{') && v.ends_with('}'))
    {
        &v[1..v.len() - 1]
    } else {
        v
    };
    for item in scanner::split_top_level(body, b',') {
        if let Some((key, value)) = split_pair(item) {
            config.attributes.push((key, translator.translate(value)));
        }
    }
}

/// The marker statement `@wrap` compiles to.
pub fn config_assignment(config: &WrapperConfig) -> String {
    let tag = config
        .tag
        .as_deref()
        .map(crate::js::quote_double)
        .unwrap_or_else(|| "null".to_string());
    let attributes: Vec<String> = config
        .attributes
        .iter()
        .map(|(k, v)| format!("{}: {}", crate::js::quote_double(k), v))
        .collect();
    let subscribe = config
        .subscribe
        .as_ref()
        .map(|s| format!(" subscribe: {},", s.to_js()))
        .unwrap_or_default();
    format!(
        "{} = {{ enable: {}, tag: {}, follow: {},{} attributes: {{{}}} }};",
        WRAPPER_CONFIG,
        config.enabled,
        tag,
        config.follow.to_js(),
        subscribe,
        attributes.join(", ")
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPLITTING
// ═══════════════════════════════════════════════════════════════════════════════

/// Splits a compiled body around its wrapper config, if it has one.
///
/// Without a [`WRAPPER_END`] marker the wrapped region runs to the end of the
/// body.
pub fn split_wrapper(body: &str) -> Option<WrapperSplit> {
    let m = CONFIG_MARKER.find(body)?;
    let span = scanner::scan_balanced(body, m.end() - 1)?;
    let config = body[span.open..span.end()].to_string();

    let mut rest = &body[span.end()..];
    if let Some(stripped) = rest.trim_start_matches([' ', '\t']).strip_prefix(';') {
        rest = stripped;
    }
    let (inner, after) = match rest.find(WRAPPER_END) {
        Some(at) => (&rest[..at], &rest[at + WRAPPER_END.len()..]),
        None => (rest, ""),
    };

    Some(WrapperSplit {
        config,
        before: filter_directives_only(&body[..m.start()]),
        inner: inner.trim_matches('\n').to_string(),
        after: filter_directives_only(after),
    })
}

/// Keeps only the structural `${...}` fragments of `text`, one per line.
pub fn filter_directives_only(text: &str) -> String {
    let mut kept = Vec::new();
    let mut pos = 0;
    while let Some(found) = text[pos..].find("${") {
        let open = pos + found + 1;
        match scanner::scan_balanced(text, open) {
            Some(span) => {
                let inner = span.inner(text).trim_start();
                if STRUCTURAL_PREFIXES.iter().any(|p| inner.starts_with(p)) {
                    kept.push(&text[open - 1..span.end()]);
                }
                pos = span.end();
            }
            None => pos = open,
        }
    }
    kept.join("\n")
}

/// Removes a `subscribe:` entry from wrapper config text and returns it
/// separately.
pub fn take_subscribe(config: &str) -> (String, Option<Subscription>) {
    match CONFIG_SUBSCRIBE.captures(config) {
        Some(caps) => {
            let subscription = layout::parse_subscription(&caps[1]);
            let stripped = CONFIG_SUBSCRIBE.replace(config, "").into_owned();
            (stripped, Some(subscription))
        }
        None => (config.to_string(), None),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED RESOURCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Boilerplate shared by every compiled view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapperResources {
    /// Statements placed at the top of every view function.
    pub function_content: String,
    /// Object entries merged into every view's metadata.
    pub config_content: String,
}

impl WrapperResources {
    /// Reads the resources file. A missing or unreadable file degrades to
    /// empty content with a warning.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(target: "blade_spa", path = %path.display(), "loaded wrapper resources");
                Self::parse(&text)
            }
            Err(err) => {
                warn!(
                    target: "blade_spa",
                    path = %path.display(),
                    error = %err,
                    "wrapper resources not found, using empty wrapper"
                );
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let region = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };
        WrapperResources {
            function_content: region(&FUNCTION_REGION),
            config_content: region(&CONFIG_REGION),
        }
    }
}
