//! Declaration tracking.
//!
//! One forward pass over the whole template collects `@vars`, `@let`,
//! `@const` and `@useState` directives in document order. Regions that are
//! never template markup (`<script>` elements and `@verbatim` blocks) are
//! skipped.

use crate::scanner;
use crate::transform::{translate, BindingTable};
use crate::validate::{Declaration, DeclarationSource, StatefulBinding};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BINDING_DIRECTIVE: Regex = Regex::new(r"@(vars|let|const|useState)\s*\(").unwrap();
    static ref OPAQUE_REGION: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script>|@verbatim\b.*?@endverbatim").unwrap();
    static ref USE_STATE_CALL: Regex = Regex::new(r"^useState\s*\(").unwrap();
}

/// Ordered declarations of one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationList {
    pub items: Vec<Declaration>,
}

impl DeclarationList {
    /// Names injected through `@vars`, in declaration order.
    pub fn injected_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for decl in self.items.iter().filter(|d| d.source == DeclarationSource::Vars) {
            for name in &decl.names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    pub fn has_injected(&self) -> bool {
        self.items
            .iter()
            .any(|d| d.source == DeclarationSource::Vars && !d.names.is_empty())
    }

    pub fn stateful(&self) -> impl Iterator<Item = &StatefulBinding> {
        self.items.iter().filter_map(|d| d.stateful.as_ref())
    }

    pub fn has_stateful(&self) -> bool {
        self.stateful().next().is_some()
    }

    /// Non-`@vars` declarations, whose right-hand sides may reference
    /// injected data.
    pub fn locals(&self) -> impl Iterator<Item = &Declaration> {
        self.items
            .iter()
            .filter(|d| d.source != DeclarationSource::Vars)
    }

    /// Every name the template binds, including setters, frozen.
    pub fn binding_table(&self) -> BindingTable {
        let mut table = BindingTable::new();
        for decl in &self.items {
            for name in &decl.names {
                table.add(name);
            }
            if let Some(state) = &decl.stateful {
                table.add(&state.state_key);
                table.add(&state.setter_name);
            }
        }
        table.freeze();
        table
    }
}

/// Collects all binding directives of `source` in document order.
/// Malformed argument lists are skipped.
pub fn track_declarations(source: &str) -> DeclarationList {
    let opaque: Vec<(usize, usize)> = OPAQUE_REGION
        .find_iter(source)
        .map(|m| (m.start(), m.end()))
        .collect();
    let in_opaque = |at: usize| opaque.iter().any(|&(s, e)| at >= s && at < e);

    let mut list = DeclarationList::default();
    let mut pos = 0;
    while let Some(caps) = BINDING_DIRECTIVE.captures_at(source, pos) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((pos, pos + 1));
        pos = whole.1;
        if in_opaque(whole.0) || (whole.0 > 0 && source.as_bytes()[whole.0 - 1] == b'@') {
            continue;
        }
        let Some(span) = scanner::scan_balanced(source, whole.1 - 1) else {
            continue;
        };
        let args = span.inner(source);
        let kind = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        match kind {
            "vars" => list.items.extend(parse_vars(args)),
            "let" => list.items.extend(parse_bindings(args, DeclarationSource::Let)),
            "const" => list.items.extend(parse_bindings(args, DeclarationSource::Const)),
            _ => list.items.extend(parse_use_state(args)),
        }
        pos = span.end();
    }
    list
}

// ═══════════════════════════════════════════════════════════════════════════════
// @vars
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_vars(args: &str) -> Option<Declaration> {
    let mut body = args.trim();
    if body.starts_with('{') && body.ends_with('}') {
        body = &body[1..body.len() - 1];
    } else if body.starts_with('[') && body.ends_with(']') {
        body = &body[1..body.len() - 1];
    }

    let mut names = Vec::new();
    let mut defaults = Vec::new();
    for part in scanner::split_top_level(body, b',') {
        let (name, default) = if let Some(at) = scanner::find_top_level(part, "=>") {
            (scanner::bare_name(&part[..at]), Some(translate(&part[at + 2..])))
        } else if let Some(at) = scanner::find_assignment(part) {
            (scanner::bare_name(&part[..at]), Some(translate(&part[at + 1..])))
        } else {
            (scanner::bare_name(part), None)
        };
        if is_identifier(&name) {
            names.push(name);
            defaults.push(default);
        }
    }
    if names.is_empty() {
        return None;
    }

    let has_default = defaults.iter().any(|d| d.is_some());
    Some(Declaration {
        source: DeclarationSource::Vars,
        is_destructuring: true,
        target: format!("{{{}}}", names.join(", ")),
        names,
        defaults,
        value: None,
        has_default,
        is_stateful: false,
        stateful: None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// @let / @const
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_bindings(args: &str, source: DeclarationSource) -> Vec<Declaration> {
    scanner::split_top_level(args, b',')
        .into_iter()
        .filter_map(|part| parse_binding(part, source))
        .collect()
}

fn parse_binding(part: &str, source: DeclarationSource) -> Option<Declaration> {
    let (lhs, rhs) = match scanner::find_assignment(part) {
        Some(at) => (part[..at].trim(), Some(part[at + 1..].trim())),
        None => (part.trim(), None),
    };

    let is_destructuring = lhs.starts_with('[') || lhs.starts_with('{');
    let names: Vec<String> = if is_destructuring {
        // An unclosed pattern declares nothing.
        let inner = lhs
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .or_else(|| lhs.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')))?;
        scanner::split_top_level(inner, b',')
            .into_iter()
            .map(|n| {
                let n = n.split('=').next().unwrap_or(n);
                let n = n.rsplit(':').next().unwrap_or(n);
                scanner::bare_name(n)
            })
            .filter(|n| is_identifier(n))
            .collect()
    } else {
        vec![scanner::bare_name(lhs)]
    };
    if names.is_empty() || !names.iter().all(|n| is_identifier(n)) {
        return None;
    }

    let stateful = match rhs {
        Some(value) if is_destructuring && names.len() == 2 && USE_STATE_CALL.is_match(value) => {
            state_initializer(value).map(|initial| stateful_pair(&names[0], &names[1], initial))
        }
        _ => None,
    };

    Some(Declaration {
        source,
        is_destructuring,
        target: translate(lhs),
        defaults: vec![None; names.len()],
        names,
        value: rhs.map(translate),
        has_default: rhs.is_some(),
        is_stateful: stateful.is_some(),
        stateful,
    })
}

/// Argument text of a leading `useState(...)` call, translated.
fn state_initializer(value: &str) -> Option<String> {
    let open = value.find('(')?;
    let span = scanner::scan_balanced(value, open)?;
    let arg = span.inner(value).trim();
    Some(if arg.is_empty() {
        "null".to_string()
    } else {
        translate(arg)
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// @useState
// ═══════════════════════════════════════════════════════════════════════════════

/// `@useState($value, 'key', 'setter')`, `@useState($value, 'key')` or the
/// assignment form `@useState([$a, $setA] = useState(0))`.
fn parse_use_state(args: &str) -> Option<Declaration> {
    if let Some(at) = scanner::find_assignment(args) {
        if args[..at].trim().starts_with('[') {
            let mut decl = parse_binding(args, DeclarationSource::UseState)?;
            decl.stateful.as_ref()?;
            decl.is_stateful = true;
            return Some(decl);
        }
    }

    let parts = scanner::split_top_level(args, b',');
    if parts.len() < 2 {
        return None;
    }
    let key = scanner::bare_name(parts[1]);
    if !is_identifier(&key) {
        return None;
    }
    let setter = match parts.get(2) {
        Some(raw) => scanner::bare_name(raw),
        None => format!("set{}", capitalize(&key)),
    };
    if !is_identifier(&setter) {
        return None;
    }
    let initial = translate(parts[0]);
    let binding = stateful_pair(&key, &setter, initial.clone());

    Some(Declaration {
        source: DeclarationSource::UseState,
        is_destructuring: false,
        target: format!("[{}, {}]", key, setter),
        defaults: vec![None, None],
        names: vec![key, setter],
        value: Some(initial),
        has_default: true,
        is_stateful: true,
        stateful: Some(binding),
    })
}

/// The internal register setter is always `set$<stateKey>`, so the key shape
/// does not depend on how the public setter is spelled.
fn stateful_pair(state_key: &str, setter_name: &str, initial_value: String) -> StatefulBinding {
    StatefulBinding {
        state_key: state_key.to_string(),
        setter_name: setter_name.to_string(),
        register_setter: format!("set${}", state_key),
        initial_value,
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn is_identifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty()
        && scanner::is_ident_start(bytes[0])
        && bytes.iter().all(|&b| scanner::is_ident_char(b))
}
