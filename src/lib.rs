//! # Blade SPA Compiler
//!
//! Compiles Blade-style view templates into JavaScript view modules for a
//! client-side rendering runtime.
//!
//! ## Pipeline
//!
//! 1. **Declarations**: `@vars`, `@let`, `@const` and `@useState` are collected
//!    from the comment-stripped source (see [`scope`]).
//! 2. **Preprocess and lex**: verbatim regions are protected, backticks are
//!    escaped, view-level directives are removed and the body is lexed into
//!    tokens (see [`parse`]).
//! 3. **Directive machine**: block directives drive an explicit frame stack
//!    and emit template-literal fragments; inline directives and echoes are
//!    rewritten in text runs (see [`directives`], [`inline`]).
//! 4. **Analysis**: sections are classified and the prerender decision is
//!    made (see [`analyze`]).
//! 5. **Extraction**: the wrapper config and register block are lifted out
//!    (see [`wrapper`], [`register`]).
//! 6. **Codegen**: the module text is assembled (see [`codegen`]).
//!
//! [`compile`] never fails: malformed directives are left in the output
//! unchanged and unbalanced blocks stay open.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod analyze;
pub mod cache;
pub mod codegen;
pub mod config;
pub mod directives;
pub mod discovery;
pub mod events;
pub mod inline;
pub mod js;
pub mod layout;
pub mod parse;
pub mod register;
pub mod renamer;
pub mod scanner;
pub mod scope;
pub mod transform;
pub mod validate;
pub mod wrapper;

#[cfg(test)]
mod analyze_tests;
#[cfg(test)]
mod discovery_tests;
#[cfg(test)]
mod expression_tests;
#[cfg(test)]
mod layout_tests;
#[cfg(test)]
mod parse_tests;
#[cfg(test)]
mod safety_tests;
#[cfg(test)]
mod scanner_tests;
#[cfg(test)]
mod scope_tests;
#[cfg(test)]
mod wrapper_tests;

pub use cache::CompileCache;
pub use config::CompilerConfig;
pub use discovery::{compile_batch, discover_views, view_name_for, write_outputs};
pub use transform::{BindingTable, FunctionNamespace, Translator};
pub use validate::*;
pub use wrapper::WrapperResources;

use lazy_static::lazy_static;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    static ref DEFAULT_RESOURCES: Arc<WrapperResources> =
        Arc::new(WrapperResources::load(wrapper::DEFAULT_WRAPPER_FILE));
}

/// Compiles one template into module text, using the wrapper resources at
/// the default location (read once per process).
pub fn compile(source: &str, view_name: &str) -> String {
    Compiler::with_resources(Arc::clone(&DEFAULT_RESOURCES))
        .compile_module(source, view_name)
        .source
}

/// A compiler bound to one set of wrapper resources. Cheap to clone and safe
/// to share across threads; every call builds its own working state.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    resources: Arc<WrapperResources>,
}

impl Compiler {
    pub fn new(resources: WrapperResources) -> Self {
        Self::with_resources(Arc::new(resources))
    }

    pub fn with_resources(resources: Arc<WrapperResources>) -> Self {
        Compiler { resources }
    }

    pub fn from_wrapper_file(path: impl AsRef<Path>) -> Self {
        Self::new(WrapperResources::load(path))
    }

    pub fn resources(&self) -> &WrapperResources {
        &self.resources
    }

    pub fn compile(&self, source: &str, view_name: &str) -> String {
        self.compile_module(source, view_name).source
    }

    pub fn compile_module(&self, source: &str, view_name: &str) -> CompiledModule {
        let stripped = parse::strip_comments(source.trim());

        let declarations = scope::track_declarations(&stripped);
        let bindings = declarations.binding_table();
        let translator = Translator::new(&bindings);

        let has_await = layout::has_await(&stripped);
        let has_fetch = layout::has_fetch(&stripped);
        let deferred = has_await || has_fetch;
        let extends = layout::parse_extends(&stripped, &translator);
        let fetch = layout::parse_fetch(&stripped, &translator);
        let explicit_subscribe = layout::parse_subscribe(&stripped);
        let view_type = layout::parse_view_type(&stripped);
        let init = layout::parse_init(&stripped);
        let register = register::extract_register(&stripped)
            .map(|content| register::parse_register(&content, view_name, &translator))
            .unwrap_or_default();

        let preprocessed = parse::preprocess(&stripped);
        let tokens = parse::lex(&preprocessed.body);
        let output = directives::run(&tokens, translator);
        if output.unclosed > 0 {
            debug!(
                target: "blade_spa",
                view = view_name,
                unclosed = output.unclosed,
                "template ends with open blocks"
            );
        }
        let body = output.template();

        let (template, before, after, wrapper_config, wrapper_subscribe) =
            match wrapper::split_wrapper(&body) {
                Some(split) => {
                    let (config, subscribe) = wrapper::take_subscribe(&split.config);
                    (split.inner, split.before, split.after, Some(config), subscribe)
                }
                None => (body, String::new(), String::new(), None, None),
            };

        let mut sections = output.sections;
        for (name, script) in &register.section_scripts {
            match sections.iter_mut().find(|s| &s.name == name) {
                Some(section) => section.inline_script = Some(script.clone()),
                None => {
                    let mut section =
                        SectionDescriptor::new(name, SectionKind::Short, String::new());
                    section.inline_script = Some(script.clone());
                    sections.push(section);
                }
            }
        }

        let injected = declarations.injected_names();
        analyze::analyze_sections(&mut sections, &injected, deferred);
        let inputs = analyze::prerender_inputs(&declarations, &sections, &template, deferred);
        let has_prerender = analyze::needs_prerender(inputs);
        let body_placeholder =
            inputs.body_uses_vars || analyze::conditional_uses_vars(&template, &sections, &injected);

        let subscribe = explicit_subscribe
            .or(wrapper_subscribe)
            .unwrap_or_else(|| {
                if declarations.has_injected() || declarations.has_stateful() {
                    Subscription::All
                } else {
                    Subscription::Off
                }
            });

        debug!(
            target: "blade_spa",
            view = view_name,
            sections = sections.len(),
            has_prerender,
            "compiled view"
        );

        codegen::generate(&codegen::ViewParts {
            view_name,
            declarations: &declarations,
            template,
            before,
            after,
            wrapper_config,
            sections,
            extends,
            fetch,
            subscribe,
            view_type,
            init,
            register,
            has_await,
            has_fetch,
            has_prerender,
            body_placeholder,
            verbatim: &preprocessed.verbatim,
            resources: &self.resources,
        })
    }
}

/// Node entry point for build orchestrators running in-process.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_view(source: String, view_name: String) -> String {
    compile(&source, &view_name)
}
