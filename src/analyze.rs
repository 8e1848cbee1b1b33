//! Section and conditional analysis.
//!
//! Decides which sections depend on injected data, whether those sections
//! need a loading placeholder while deferred data is outstanding, and
//! whether the view needs a prerender pass at all.

use crate::scanner;
use crate::scope::DeclarationList;
use crate::validate::{SectionDescriptor, SectionKind};

/// Inputs to the prerender decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrerenderInputs {
    /// `@await` or `@fetch` present.
    pub deferred: bool,
    /// At least one `@vars` name declared.
    pub injected: bool,
    pub section_uses_vars: bool,
    pub body_uses_vars: bool,
    pub declaration_uses_vars: bool,
}

/// A prerender pass is needed when data arrives late, the view has injected
/// variables, and something visible depends on them.
pub fn needs_prerender(inputs: PrerenderInputs) -> bool {
    inputs.deferred
        && inputs.injected
        && (inputs.section_uses_vars || inputs.body_uses_vars || inputs.declaration_uses_vars)
}

/// Whether `name` occurs in `text` as a whole identifier (not a property).
pub fn mentions(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(found) = text[from..].find(name) {
        let start = from + found;
        let end = start + name.len();
        let before_ok = start == 0 || {
            let b = bytes[start - 1];
            !scanner::is_ident_char(b) && b != b'.'
        };
        let after_ok = end >= bytes.len() || !scanner::is_ident_char(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

/// Whether any `${...}` interpolation in `text` references one of `names`.
pub fn interpolates_any(text: &str, names: &[String]) -> bool {
    let mut pos = 0;
    while let Some(found) = text[pos..].find("${") {
        let open = pos + found + 1;
        match scanner::scan_balanced(text, open) {
            Some(span) => {
                let inner = span.inner(text);
                if names.iter().any(|n| mentions(inner, n)) {
                    return true;
                }
                pos = open + 1;
            }
            None => pos = open,
        }
    }
    false
}

/// Fills `uses_injected_vars` and `needs_placeholder` on every section.
pub fn analyze_sections(sections: &mut [SectionDescriptor], injected: &[String], deferred: bool) {
    for section in sections.iter_mut() {
        section.uses_injected_vars = match section.kind {
            SectionKind::Short => injected.iter().any(|n| mentions(&section.content, n)),
            SectionKind::Long => interpolates_any(&section.content, injected),
        };
        section.needs_placeholder = section.uses_injected_vars && deferred;
    }
}

/// Whether a conditional closure outside every section tests injected data.
pub fn conditional_uses_vars(template: &str, sections: &[SectionDescriptor], injected: &[String]) -> bool {
    let mut outside = template.to_string();
    for section in sections.iter().filter(|s| !s.fragment.is_empty()) {
        outside = outside.replace(&section.fragment, "");
    }
    let marker = "App.View.execute(() => { if(";
    let mut pos = 0;
    while let Some(found) = outside[pos..].find(marker) {
        let open = pos + found + marker.len() - 1;
        if let Some(span) = scanner::scan_balanced(&outside, open) {
            if injected.iter().any(|n| mentions(span.inner(&outside), n)) {
                return true;
            }
        }
        pos = open + 1;
    }
    false
}

/// Collects the prerender decision inputs for a compiled template.
pub fn prerender_inputs(
    declarations: &DeclarationList,
    sections: &[SectionDescriptor],
    template: &str,
    deferred: bool,
) -> PrerenderInputs {
    let injected = declarations.injected_names();
    PrerenderInputs {
        deferred,
        injected: declarations.has_injected(),
        section_uses_vars: sections.iter().any(|s| s.uses_injected_vars),
        body_uses_vars: interpolates_any(template, &injected),
        declaration_uses_vars: declarations.locals().any(|d| {
            d.value
                .as_deref()
                .map(|v| injected.iter().any(|n| mentions(v, n)))
                .unwrap_or(false)
                || d
                    .stateful
                    .as_ref()
                    .map(|s| injected.iter().any(|n| mentions(&s.initial_value, n)))
                    .unwrap_or(false)
        }),
    }
}

/// Section names whose fragment is emitted by `template`.
pub fn rendered_section_names(template: &str, sections: &[SectionDescriptor]) -> Vec<String> {
    let mut names = Vec::new();
    for section in sections {
        let present = !section.fragment.is_empty() && template.contains(&section.fragment);
        if present && !names.contains(&section.name) {
            names.push(section.name.clone());
        }
    }
    names
}

pub fn long_section_names(sections: &[SectionDescriptor]) -> Vec<String> {
    let mut names = Vec::new();
    for section in sections.iter().filter(|s| s.kind == SectionKind::Long) {
        if !names.contains(&section.name) {
            names.push(section.name.clone());
        }
    }
    names
}
