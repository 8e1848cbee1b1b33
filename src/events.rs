//! Event directives (`@click(...)`, `@input(...)`, ...).
//!
//! Each directive becomes a runtime event config. A handler written as a call
//! keeps its name and parameter list so the runtime can bind it lazily; any
//! other expression is wrapped in an `(event) => ...` closure.

use crate::inline::rewrite_directives;
use crate::js::quote_double;
use crate::scanner;
use crate::transform::Translator;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    pub static ref EVENT_DIRECTIVES: HashSet<&'static str> = [
        "click", "dblclick", "mousedown", "mouseup", "mouseover", "mouseout", "mousemove",
        "mouseenter", "mouseleave", "contextmenu", "wheel",
        "keydown", "keyup", "keypress",
        "input", "change", "submit", "reset", "focus", "blur", "focusin", "focusout",
        "select", "invalid", "search", "toggle",
        "scroll", "resize", "load", "unload", "error", "abort",
        "drag", "dragstart", "dragend", "dragover", "dragenter", "dragleave", "drop",
        "touchstart", "touchmove", "touchend", "touchcancel",
        "pointerdown", "pointerup", "pointermove", "pointerenter", "pointerleave",
        "pointercancel",
        "copy", "cut", "paste",
        "play", "pause", "ended", "timeupdate", "volumechange",
        "animationstart", "animationend", "transitionend",
    ]
    .into_iter()
    .collect();

    static ref HANDLER_CALL: Regex =
        Regex::new(r"^\$?[A-Za-z_][\w$]*(?:\s*(?:->|\.|::)\s*[A-Za-z_][\w$]*)*\s*\(").unwrap();
    static ref PARAM_MARKER: Regex =
        Regex::new(r"^@(attr|prop|val|value)\s*\(\s*(.*?)\s*\)$").unwrap();
}

/// Rewrites every event directive in `text`.
pub fn process_events(text: &str, translator: &Translator) -> String {
    rewrite_directives(text, |name, args| {
        if !EVENT_DIRECTIVES.contains(name) {
            return None;
        }
        let args = args?;
        // `@error('field')` is the validation guard, not the DOM event.
        if name == "error" && scanner::unquote(args.trim()).is_some() {
            return None;
        }
        let joined = args.replace(['\n', '\r'], " ");
        let handlers: Vec<String> = scanner::split_top_level(&joined, b',')
            .into_iter()
            .map(|item| handler_entry(item, translator))
            .collect();
        Some(format!(
            "${{this.__addEventConfig({}, [{}])}}",
            quote_double(name),
            handlers.join(", ")
        ))
    })
}

fn handler_entry(item: &str, translator: &Translator) -> String {
    let item = item.trim();
    if let Some(m) = HANDLER_CALL.find(item) {
        let open = m.end() - 1;
        if let Some(span) = scanner::scan_balanced(item, open) {
            if span.end() == item.len() {
                let name = translator.translate(item[..open].trim());
                let params: Vec<String> = scanner::split_top_level(span.inner(item), b',')
                    .into_iter()
                    .map(|p| handler_param(p, translator))
                    .collect();
                return format!(
                    "{{\"handler\":{},\"params\":[{}]}}",
                    quote_double(&name),
                    params.join(",")
                );
            }
        }
    }

    if scanner::find_top_level(item, "=>").is_some() {
        return translator.translate(item);
    }
    format!("(event) => {}", translator.translate(item))
}

fn handler_param(param: &str, translator: &Translator) -> String {
    let p = param.trim();
    match p {
        "$event" | "@event" | "Event" | "event" => return quote_double("@EVENT"),
        _ => {}
    }
    if let Some(caps) = PARAM_MARKER.captures(p) {
        let kind = match &caps[1] {
            "attr" => "ATTR",
            "prop" => "PROP",
            _ => "VALUE",
        };
        return quote_double(&format!("#{}:{}", kind, scanner::bare_name(&caps[2])));
    }
    translator.translate(p)
}
