//! Module code generation.
//!
//! Assembles one exported view function: declaration and state wiring, the
//! metadata object handed to `self.setup(...)`, and the `render`,
//! `virtualRender`, `prerender`, `init` and `loadServerData` bodies.

use crate::analyze;
use crate::js::{self, Expr, Function, Printer, Stmt};
use crate::layout::{Extends, SuperView};
use crate::parse;
use crate::register::RegisterBlock;
use crate::renamer;
use crate::scope::DeclarationList;
use crate::validate::{
    CompiledModule, DeclarationSource, SectionDescriptor, StatefulBinding, Subscription,
};
use crate::wrapper::WrapperResources;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref UPDATE_STATE_BY_KEY: Regex =
        Regex::new(r#"updateStateByKey\(\s*['"]([A-Za-z_$][\w$]*)['"]\s*,\s*"#).unwrap();
}

const OUTPUT: &str = "__outputRenderedContent__";
const JUNK: &str = "__junkContent__";
const DEFAULT_WRAPPER_CONFIG: &str = "{ enable: false, tag: null, follow: true, attributes: {} }";
const PRELOADER: &str = "<div class=\"data-preloader\" ref=\"${__VIEW_ID__}\" data-view-name=\"${__VIEW_PATH__}\">${App.View.text('loading')}</div>";

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything the earlier passes learned about one view.
#[derive(Debug)]
pub struct ViewParts<'a> {
    pub view_name: &'a str,
    pub declarations: &'a DeclarationList,
    /// Rendered template (the wrapped region when a wrapper is present).
    pub template: String,
    /// Structural fragments found before and after the wrapped region.
    pub before: String,
    pub after: String,
    pub wrapper_config: Option<String>,
    pub sections: Vec<SectionDescriptor>,
    pub extends: Option<Extends>,
    pub fetch: Option<String>,
    pub subscribe: Subscription,
    pub view_type: String,
    pub init: String,
    pub register: RegisterBlock,
    pub has_await: bool,
    pub has_fetch: bool,
    pub has_prerender: bool,
    /// The prerender pass shows a page-level placeholder when no section
    /// carries one.
    pub body_placeholder: bool,
    pub verbatim: &'a [String],
    pub resources: &'a WrapperResources,
}

/// `web.user-profile` becomes `WebUserProfile`.
pub fn function_name(view_name: &str) -> String {
    let name: String = view_name
        .split(['.', '-', '_', '/'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("View{}", name),
        Some(_) => name,
        None => "View".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATIONS AND STATE
// ═══════════════════════════════════════════════════════════════════════════════

fn state_wiring(state: &StatefulBinding) -> Vec<Stmt> {
    let key = &state.state_key;
    vec![
        Stmt::Const(
            state.register_setter.clone(),
            Expr::raw(format!("__STATE__.__register({})", js::quote_single(key))),
        ),
        Stmt::Let(key.clone(), Some(Expr::Null)),
        Stmt::Const(
            state.setter_name.clone(),
            Expr::raw(format!(
                "(state) => {{\n        {} = state;\n        {}(state);\n    }}",
                key, state.register_setter
            )),
        ),
        Stmt::Assign(
            format!("__STATE__.__setters__.{}", state.setter_name),
            Expr::raw(state.setter_name.clone()),
        ),
        Stmt::Const(
            format!("update${}", key),
            Expr::raw(format!(
                "(value) => {{\n        if(__STATE__._canUpdateStateByKey){{\n            updateStateByKey({}, value);\n            {} = value;\n        }}\n    }}",
                js::quote_single(key),
                key
            )),
        ),
    ]
}

/// Module-level declarations, update traits, the variable list and state
/// wiring, in declaration order.
pub fn declaration_stmts(declarations: &DeclarationList) -> Vec<Stmt> {
    let mut stmts = vec![Stmt::Const("__UPDATE_DATA_TRAIT__".to_string(), Expr::raw("{}"))];
    let mut traits = Vec::new();
    let mut variables: Vec<String> = Vec::new();
    let mut states = Vec::new();

    for decl in &declarations.items {
        if let Some(state) = &decl.stateful {
            states.push(state);
            continue;
        }
        match decl.source {
            DeclarationSource::Vars => {
                let parts: Vec<String> = decl
                    .names
                    .iter()
                    .zip(&decl.defaults)
                    .map(|(name, default)| match default {
                        Some(value) => format!("{} = {}", name, value),
                        None => name.clone(),
                    })
                    .collect();
                stmts.push(Stmt::Let(
                    format!("{{{}}}", parts.join(", ")),
                    Some(Expr::raw("$$$DATA$$$")),
                ));
                variables.extend(decl.names.iter().cloned());
            }
            DeclarationSource::Let => {
                stmts.push(Stmt::Let(decl.target.clone(), decl.value.clone().map(Expr::Raw)));
                variables.extend(decl.names.iter().cloned());
            }
            DeclarationSource::Const => {
                if let Some(value) = &decl.value {
                    stmts.push(Stmt::Const(decl.target.clone(), Expr::raw(value.clone())));
                }
            }
            DeclarationSource::UseState => {}
        }
    }

    for name in &variables {
        traits.push(Stmt::Raw(format!(
            "__UPDATE_DATA_TRAIT__.{} = value => {} = value;",
            name, name
        )));
    }
    stmts.extend(traits);
    stmts.push(Stmt::Const(
        "__VARIABLE_LIST__".to_string(),
        Expr::string_list(&variables),
    ));
    for state in states {
        stmts.extend(state_wiring(state));
    }
    stmts
}

/// `update$key(initial);` for every state, then the update lock.
fn state_updates(declarations: &DeclarationList) -> Vec<Stmt> {
    let mut stmts: Vec<Stmt> = declarations
        .stateful()
        .map(|s| Stmt::Raw(format!("update${}({});", s.state_key, s.initial_value)))
        .collect();
    if !stmts.is_empty() {
        stmts.push(Stmt::Raw("lockUpdateRealState();".to_string()));
    }
    stmts
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE REWRITES
// ═══════════════════════════════════════════════════════════════════════════════

/// Restores verbatim regions and applies the render-time call renames.
fn finish_template(text: &str, verbatim: &[String]) -> String {
    let restored = parse::restore_verbatim(text, verbatim);
    let renamed = restored
        .replace("App.View.section(", "this.__section(")
        .replace("App.View.text(", "this.__text(");
    UPDATE_STATE_BY_KEY
        .replace_all(&renamed, "update$$$1(")
        .into_owned()
}

/// Removes sections the prerender pass already emits.
fn without_static_sections(template: &str, sections: &[SectionDescriptor]) -> String {
    let mut out = template.to_string();
    for section in sections.iter().filter(|s| !s.uses_injected_vars) {
        if !section.fragment.is_empty() {
            out = out.replace(&section.fragment, "");
        }
    }
    out
}

fn guarded_assign(target: &str, body: String, with_error: bool) -> Stmt {
    let mut handler = Vec::new();
    if with_error {
        handler.push(Stmt::Assign(
            target.to_string(),
            Expr::raw("this.__showError(e.message)"),
        ));
    }
    handler.push(Stmt::Raw("console.warn(e);".to_string()));
    Stmt::Try {
        body: vec![Stmt::Assign(target.to_string(), Expr::Template(body))],
        catch_param: "e".to_string(),
        handler,
    }
}

fn return_stmt(extends: Option<&Extends>) -> Stmt {
    let Some(extends) = extends else {
        return Stmt::Return(Expr::raw(OUTPUT));
    };
    let data = extends
        .data
        .as_deref()
        .map(|d| format!(", {}", d))
        .unwrap_or_default();
    let view = match &extends.view {
        SuperView::Literal(name) => js::quote_single(name),
        SuperView::Expr(expr) => expr.clone(),
    };
    Stmt::Return(Expr::raw(format!("this.__extends({}{})", view, data)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Template text used by `render`.
fn render_template(parts: &ViewParts) -> String {
    let template = if parts.has_prerender {
        without_static_sections(&parts.template, &parts.sections)
    } else {
        parts.template.clone()
    };
    finish_template(&template, parts.verbatim)
}

pub fn render_function(parts: &ViewParts) -> Function {
    let mut body = state_updates(parts.declarations);
    body.push(Stmt::Let(OUTPUT.to_string(), Some(Expr::Str(String::new()))));
    let has_outer = !parts.before.is_empty() || !parts.after.is_empty();
    if has_outer {
        body.push(Stmt::Let(JUNK.to_string(), Some(Expr::Str(String::new()))));
    }
    if !parts.before.is_empty() {
        body.push(guarded_assign(JUNK, finish_template(&parts.before, parts.verbatim), false));
    }
    body.push(guarded_assign(OUTPUT, render_template(parts), true));
    if !parts.after.is_empty() {
        body.push(guarded_assign(JUNK, finish_template(&parts.after, parts.verbatim), false));
    }
    body.push(return_stmt(parts.extends.as_ref()));
    Function::new(&[], body)
}

fn placeholder_section(name: &str) -> String {
    format!(
        "${{App.View.section({}, `{}`, 'html')}}",
        js::quote_single(name),
        PRELOADER
    )
}

/// Template text emitted by `prerender`: static sections verbatim and a
/// placeholder for every section waiting on data. A prerender that would
/// otherwise be empty shows the page-level placeholder.
fn prerender_template(parts: &ViewParts) -> (String, Vec<String>) {
    let mut pieces = Vec::new();
    let mut names = Vec::new();
    for section in &parts.sections {
        if section.needs_placeholder {
            pieces.push(placeholder_section(&section.name));
            if !names.contains(&section.name) {
                names.push(section.name.clone());
            }
        } else if !section.uses_injected_vars && !section.fragment.is_empty() {
            pieces.push(section.fragment.clone());
        }
    }
    if pieces.is_empty() || (names.is_empty() && parts.body_placeholder) {
        pieces.push(PRELOADER.to_string());
    }
    (finish_template(&pieces.join("\n"), parts.verbatim), names)
}

pub fn prerender_function(parts: &ViewParts) -> Function {
    if !parts.has_prerender {
        return Function::new(&[], vec![Stmt::Return(Expr::Null)]);
    }
    let (template, _) = prerender_template(parts);
    let mut body = state_updates(parts.declarations);
    body.push(Stmt::Let(OUTPUT.to_string(), Some(Expr::Str(String::new()))));
    body.push(guarded_assign(OUTPUT, template, true));
    body.push(return_stmt(parts.extends.as_ref()));
    Function::new(&[], body)
}

pub fn init_function(init: &str) -> Function {
    let body = init
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| Stmt::Raw(l.to_string()))
        .collect();
    Function::new(&[], body)
}

/// Runs the declaration side effects of `render` without producing markup.
pub fn load_server_data_function(parts: &ViewParts) -> Function {
    let mut body = state_updates(parts.declarations);
    body.push(Stmt::Return(Expr::Bool(true)));
    Function::new(&[], body)
}

// ═══════════════════════════════════════════════════════════════════════════════
// METADATA
// ═══════════════════════════════════════════════════════════════════════════════

fn sections_expr(sections: &[SectionDescriptor]) -> Expr {
    let mut entries: Vec<(String, Expr)> = Vec::new();
    for section in sections {
        let script = match &section.inline_script {
            Some(code) => Expr::Object(vec![
                ("type".to_string(), Expr::Json("code".to_string())),
                ("content".to_string(), Expr::Json(code.clone())),
            ]),
            None => Expr::raw("{}"),
        };
        let value = Expr::Object(vec![
            ("type".to_string(), Expr::Json(section.kind.as_str().to_string())),
            ("preloader".to_string(), Expr::Bool(section.needs_placeholder)),
            ("useVars".to_string(), Expr::Bool(section.uses_injected_vars)),
            ("script".to_string(), script),
        ]);
        match entries.iter_mut().find(|(name, _)| *name == section.name) {
            Some(entry) => entry.1 = value,
            None => entries.push((section.name.clone(), value)),
        }
    }
    Expr::Object(entries)
}

fn state_helper(params: &[&str], head: Vec<Stmt>, parts: &ViewParts) -> Expr {
    let mut body = head;
    body.extend(state_updates(parts.declarations));
    Expr::Function(Function::new(params, body))
}

fn metadata(parts: &ViewParts, render: &Function, virtual_render: &str, prerender: &Function) -> Expr {
    let uses_vars = parts.declarations.has_injected();
    let render_text = render_template(parts);
    let prerender_names = if parts.has_prerender {
        prerender_template(parts).1
    } else {
        Vec::new()
    };

    let mut entries: Vec<(String, Expr)> = vec![
        (
            "superView".to_string(),
            parts
                .extends
                .as_ref()
                .map(|e| Expr::raw(e.metadata_value()))
                .unwrap_or(Expr::Null),
        ),
        ("hasSuperView".to_string(), Expr::Bool(parts.extends.is_some())),
        ("viewType".to_string(), Expr::Str(parts.view_type.clone())),
        ("sections".to_string(), sections_expr(&parts.sections)),
        (
            "wrapperConfig".to_string(),
            Expr::raw(
                parts
                    .wrapper_config
                    .clone()
                    .unwrap_or_else(|| DEFAULT_WRAPPER_CONFIG.to_string()),
            ),
        ),
    ];
    let wrapper_props = parts.resources.config_content.trim().trim_end_matches(',');
    if !wrapper_props.is_empty() {
        entries.push((String::new(), Expr::raw(wrapper_props)));
    }

    let finished_sections: Vec<SectionDescriptor> = parts
        .sections
        .iter()
        .map(|s| {
            let mut s = s.clone();
            s.fragment = finish_template(&s.fragment, parts.verbatim);
            s
        })
        .collect();

    entries.extend([
        ("hasAwaitData".to_string(), Expr::Bool(parts.has_await)),
        ("hasFetchData".to_string(), Expr::Bool(parts.has_fetch)),
        ("subscribe".to_string(), Expr::raw(parts.subscribe.to_js())),
        (
            "fetch".to_string(),
            parts.fetch.clone().map(Expr::Raw).unwrap_or(Expr::Null),
        ),
        ("data".to_string(), Expr::raw("$$$DATA$$$")),
        ("viewId".to_string(), Expr::raw("__VIEW_ID__")),
        ("path".to_string(), Expr::raw("__VIEW_PATH__")),
        ("usesVars".to_string(), Expr::Bool(uses_vars)),
        ("hasSections".to_string(), Expr::Bool(!parts.sections.is_empty())),
        (
            "hasSectionPreload".to_string(),
            Expr::Bool(parts.sections.iter().any(|s| s.needs_placeholder)),
        ),
        ("hasPrerender".to_string(), Expr::Bool(parts.has_prerender)),
        (
            "renderLongSections".to_string(),
            Expr::string_list(analyze::long_section_names(&parts.sections)),
        ),
        (
            "renderSections".to_string(),
            Expr::string_list(analyze::rendered_section_names(&render_text, &finished_sections)),
        ),
        ("prerenderSections".to_string(), Expr::string_list(prerender_names)),
        (
            "userDefined".to_string(),
            Expr::raw(
                parts
                    .register
                    .user_defined
                    .clone()
                    .unwrap_or_else(|| "{}".to_string()),
            ),
        ),
        (
            "scripts".to_string(),
            Expr::Array(parts.register.scripts.iter().map(|s| s.to_expr("src")).collect()),
        ),
        (
            "styles".to_string(),
            Expr::Array(parts.register.styles.iter().map(|s| s.to_expr("href")).collect()),
        ),
        (
            "resources".to_string(),
            Expr::Array(parts.register.resources.iter().map(|r| r.to_expr()).collect()),
        ),
        ("commitConstructorData".to_string(), state_helper(&[], Vec::new(), parts)),
        (
            "updateVariableData".to_string(),
            state_helper(
                &["data"],
                vec![Stmt::Raw(
                    "for (const key in data) {\n                if (data.hasOwnProperty(key)) {\n                    this.updateVariableItem(key, data[key]);\n                }\n            }"
                        .to_string(),
                )],
                parts,
            ),
        ),
        (
            "updateVariableItem".to_string(),
            Expr::Function(Function::new(
                &["key", "value"],
                vec![
                    Stmt::Raw("this.data[key] = value;".to_string()),
                    Stmt::Raw(
                        "if (typeof __UPDATE_DATA_TRAIT__[key] === \"function\") {\n                __UPDATE_DATA_TRAIT__[key](value);\n            }"
                            .to_string(),
                    ),
                ],
            )),
        ),
        (
            "loadServerData".to_string(),
            Expr::Function(load_server_data_function(parts)),
        ),
        ("prerender".to_string(), Expr::Function(prerender.clone())),
        ("render".to_string(), Expr::Function(render.clone())),
        ("virtualRender".to_string(), Expr::raw(virtual_render)),
        ("init".to_string(), Expr::Function(init_function(&parts.init))),
        ("destroy".to_string(), Expr::raw("function() {}")),
    ]);
    Expr::Object(entries)
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE
// ═══════════════════════════════════════════════════════════════════════════════

fn setup_prelude(register: &RegisterBlock) -> String {
    let mut blocks: Vec<&str> = Vec::new();
    if !register.setup_content.trim().is_empty() {
        blocks.push(register.setup_content.trim());
    }
    blocks.extend(register.code_scripts().map(str::trim));
    if blocks.is_empty() {
        String::new()
    } else {
        format!("{}\n\n", blocks.join("\n\n"))
    }
}

/// Generates the complete module for one view.
pub fn generate(parts: &ViewParts) -> CompiledModule {
    let name = function_name(parts.view_name);
    let printer = Printer::new(1);

    let render = render_function(parts);
    let prerender = prerender_function(parts);
    let render_text = printer.render_function(&render, 2);
    let virtual_render = renamer::scan_variant(&render_text);
    let prerender_text = printer.render_function(&prerender, 2);
    let init_text = printer.render_function(&init_function(&parts.init), 2);
    let load_text = printer.render_function(&load_server_data_function(parts), 2);

    let mut body = Printer::new(1);
    body.stmt(&Stmt::Raw(
        "const {App, View, __base__, __layout__, __page__, __component__, __partial__, __system__, __env = {}, __helper = {}} = systemData;"
            .to_string(),
    ));
    body.stmt(&Stmt::Const(
        "__VIEW_PATH__".to_string(),
        Expr::Str(parts.view_name.to_string()),
    ));
    body.stmt(&Stmt::Const(
        "__VIEW_ID__".to_string(),
        Expr::raw("$$$DATA$$$.__SSR_VIEW_ID__ || App.View.generateViewId()"),
    ));
    body.stmt(&Stmt::Const(
        "__VIEW_TYPE__".to_string(),
        Expr::Str(parts.view_type.clone()),
    ));
    for line in parts.resources.function_content.lines() {
        body.stmt(&Stmt::Raw(line.trim_end().to_string()));
    }
    for stmt in declaration_stmts(parts.declarations) {
        body.stmt(&stmt);
    }
    let meta = metadata(parts, &render, &virtual_render, &prerender);
    body.stmt(&Stmt::Expr(Expr::raw(format!(
        "self.setup({}, {})",
        js::quote_single(parts.view_name),
        printer.render_expr(&meta, 1)
    ))));
    body.stmt(&Stmt::Return(Expr::raw("self")));

    let source = format!(
        "{}export function {}($$$DATA$$$ = {{}}, systemData = {{}}) {{\n{}}}",
        setup_prelude(&parts.register),
        name,
        body.finish()
    );

    CompiledModule {
        function_name: name,
        view_name: parts.view_name.to_string(),
        has_prerender: parts.has_prerender,
        render: render_text,
        virtual_render,
        prerender: prerender_text,
        init: init_text,
        load_server_data: load_text,
        source,
    }
}

