//! Register block parsing.
//!
//! `@register ... @endregister` (and its `@setup`/`@script` spellings)
//! declares what a view needs besides markup: setup code placed at module
//! level, a lifecycle object, scripts, styles and other head resources.
//! `<script setup>` elements anywhere in the template feed the same setup
//! code.

use crate::js::{self, Expr};
use crate::scanner;
use crate::transform::Translator;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref REGISTER_REGION: Regex = Regex::new(
        r"(?is)@register\b(.*?)@endregister|@setup\b(.*?)@endsetup|@script\b(.*?)@endscript"
    )
    .unwrap();
    static ref ELEMENT: Regex = Regex::new(
        r"(?is)<(script|style)\b([^>]*)>(.*?)</(?:script|style)\s*>|<([a-zA-Z][\w-]*)\b([^>]*?)/?>"
    )
    .unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"([^\s="'/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#).unwrap();
    static ref SETUP_ATTR: Regex = Regex::new(r"(?i)\b(?:setup|import|imports|scope|scoped)\b").unwrap();
    static ref SETUP_SCRIPT: Regex =
        Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").unwrap();
    static ref IMPORT: Regex = Regex::new(
        r#"(?m)^[ \t]*import\s+(?:[^;'"]*?\s+from\s+)?['"][^'"\n]+['"][ \t]*;?"#
    )
    .unwrap();
    static ref EXPORT_DEFAULT: Regex = Regex::new(r"export\s+default\s*\{").unwrap();
    static ref ECHO: Regex = Regex::new(r"(?s)\{\{\s*(.*?)\s*\}\}").unwrap();
}

/// Where a script or style comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSource {
    /// Inline code.
    Code(String),
    /// External URL (`src` for scripts, `href` for styles).
    Url(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub source: AssetSource,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub attributes: Vec<(String, Expr)>,
}

impl Asset {
    pub fn to_expr(&self, url_key: &str) -> Expr {
        let mut entries = Vec::new();
        match &self.source {
            AssetSource::Code(code) => {
                entries.push(("type".to_string(), Expr::Json("code".to_string())));
                entries.push(("content".to_string(), Expr::Json(code.clone())));
            }
            AssetSource::Url(url) => {
                entries.push(("type".to_string(), Expr::Json(url_key.to_string())));
                entries.push((url_key.to_string(), url.clone()));
            }
        }
        if let Some(id) = &self.id {
            entries.push(("id".to_string(), Expr::Json(id.clone())));
        }
        if let Some(class) = &self.class_name {
            entries.push(("className".to_string(), Expr::Json(class.clone())));
        }
        if !self.attributes.is_empty() {
            entries.push(("attributes".to_string(), Expr::Object(self.attributes.clone())));
        }
        Expr::Object(entries)
    }
}

/// A head element registered by tag name.
#[derive(Debug, Clone, PartialEq)]
pub struct TagResource {
    pub tag: String,
    pub uuid: String,
    pub attrs: Vec<(String, Expr)>,
}

impl TagResource {
    pub fn to_expr(&self) -> Expr {
        Expr::Object(vec![
            ("tag".to_string(), Expr::Json(self.tag.clone())),
            ("uuid".to_string(), Expr::Json(self.uuid.clone())),
            ("attrs".to_string(), Expr::Object(self.attrs.clone())),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisterBlock {
    /// Import statements followed by leftover setup code.
    pub setup_content: String,
    /// Lifecycle object literal from `export default {...}`.
    pub user_defined: Option<String>,
    pub scripts: Vec<Asset>,
    pub styles: Vec<Asset>,
    pub resources: Vec<TagResource>,
    /// `<script section="name">` bodies keyed by section name.
    pub section_scripts: Vec<(String, String)>,
}

impl RegisterBlock {
    /// Inline script code that runs at module level.
    pub fn code_scripts(&self) -> impl Iterator<Item = &str> {
        self.scripts.iter().filter_map(|s| match &s.source {
            AssetSource::Code(code) if !code.trim().is_empty() => Some(code.as_str()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == RegisterBlock::default()
    }
}

/// Collects every register region plus `<script setup>` elements found
/// outside them.
pub fn extract_register(source: &str) -> Option<String> {
    let mut parts: Vec<String> = REGISTER_REGION
        .captures_iter(source)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .collect();

    let outside = REGISTER_REGION.replace_all(source, "");
    for caps in SETUP_SCRIPT.captures_iter(&outside) {
        if SETUP_ATTR.is_match(&caps[1]) {
            parts.push(caps[0].to_string());
        }
    }
    parts.retain(|p| !p.is_empty());
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Parses register content for `view_name`.
pub fn parse_register(content: &str, view_name: &str, translator: &Translator) -> RegisterBlock {
    let mut block = RegisterBlock::default();
    let mut imports: Vec<String> = Vec::new();
    let mut setup_code: Vec<String> = Vec::new();
    let mut resource_index = 0;

    for caps in ELEMENT.captures_iter(content) {
        if let Some(kind) = caps.get(1) {
            let attrs = parse_attributes(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
            let body = caps.get(3).map(|m| m.as_str()).unwrap_or("").trim();
            if kind.as_str().eq_ignore_ascii_case("style") {
                block.styles.push(asset(AssetSource::Code(body.to_string()), &attrs, &[], translator));
                continue;
            }

            let raw_attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            if let Some(section) = attr_value(&attrs, "section") {
                block.section_scripts.push((section.to_string(), body.to_string()));
            } else if SETUP_ATTR.is_match(raw_attrs) && attr_value(&attrs, "src").is_none() {
                let code = split_setup(body, &mut imports, &mut block.user_defined);
                if !code.is_empty() {
                    setup_code.push(code);
                }
            } else if let Some(src) = attr_value(&attrs, "src") {
                let url = attribute_expr(src, translator);
                block.scripts.push(asset(AssetSource::Url(url), &attrs, &["src"], translator));
            } else {
                let code = split_setup(body, &mut imports, &mut block.user_defined);
                block.scripts.push(asset(AssetSource::Code(code), &attrs, &[], translator));
            }
            continue;
        }

        let tag = caps.get(4).map(|m| m.as_str()).unwrap_or("");
        let attrs = parse_attributes(caps.get(5).map(|m| m.as_str()).unwrap_or(""));
        let is_stylesheet = tag.eq_ignore_ascii_case("link")
            && attr_value(&attrs, "rel")
                .map(|r| r.eq_ignore_ascii_case("stylesheet"))
                .unwrap_or(false);
        if is_stylesheet {
            let href = attribute_expr(attr_value(&attrs, "href").unwrap_or(""), translator);
            block
                .styles
                .push(asset(AssetSource::Url(href), &attrs, &["href", "rel"], translator));
        } else {
            block.resources.push(TagResource {
                tag: tag.to_lowercase(),
                uuid: resource_uuid(view_name, resource_index, tag),
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), attribute_expr(v, translator)))
                    .collect(),
            });
            resource_index += 1;
        }
    }

    let mut setup = Vec::new();
    if !imports.is_empty() {
        setup.push(imports.join("\n"));
    }
    setup.extend(setup_code);
    block.setup_content = setup.join("\n\n");
    block
}

/// Pulls imports and the `export default` object out of a script body and
/// returns what is left.
fn split_setup(body: &str, imports: &mut Vec<String>, user_defined: &mut Option<String>) -> String {
    for m in IMPORT.find_iter(body) {
        imports.push(m.as_str().trim().to_string());
    }
    let mut code = IMPORT.replace_all(body, "").into_owned();

    if let Some(m) = EXPORT_DEFAULT.find(&code) {
        if let Some(span) = scanner::scan_balanced(&code, m.end() - 1) {
            if user_defined.is_none() {
                *user_defined = Some(code[span.open..span.end()].to_string());
            }
            let mut end = span.end();
            if code[end..].starts_with(';') {
                end += 1;
            }
            code.replace_range(m.start()..end, "");
        }
    }
    code.trim().to_string()
}

fn asset(source: AssetSource, attrs: &[(String, String)], skip: &[&str], translator: &Translator) -> Asset {
    Asset {
        source,
        id: attr_value(attrs, "id").map(str::to_string),
        class_name: attr_value(attrs, "class").map(str::to_string),
        attributes: attrs
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "id" | "class" | "section") && !skip.contains(&k.as_str()))
            .filter(|(k, _)| !SETUP_ATTR.is_match(k))
            .map(|(k, v)| (k.clone(), attribute_expr(v, translator)))
            .collect(),
    }
}

pub fn parse_attributes(text: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(text)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (c[1].to_string(), value)
        })
        .collect()
}

fn attr_value<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// An attribute value as JS: a JSON string, or a template literal when it
/// contains `{{ }}` echoes.
pub fn attribute_expr(value: &str, translator: &Translator) -> Expr {
    if !ECHO.is_match(value) {
        return Expr::Json(value.to_string());
    }
    let mut body = String::new();
    let mut last = 0;
    for caps in ECHO.captures_iter(value) {
        let Some(whole) = caps.get(0) else { continue };
        body.push_str(&js::escape_template_text(&value[last..whole.start()]));
        body.push_str(&format!(
            "${{App.View.escString({})}}",
            translator.translate(&caps[1])
        ));
        last = whole.end();
    }
    body.push_str(&js::escape_template_text(&value[last..]));
    Expr::Template(body)
}

/// Stable id for the `index`-th resource of a view.
fn resource_uuid(view_name: &str, index: usize, tag: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", view_name, index, tag).as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
