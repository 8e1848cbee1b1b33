//! Data model shared by every compilation pass.
//!
//! Everything in here lives for exactly one `compile` call, except the
//! error type which is also used by the batch orchestration layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK FRAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Conditional guards that compile to the same closure shape as `@if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardKind {
    Auth,
    Guest,
    Can,
    Cannot,
    Error,
    HasSection,
    Unless,
}

impl GuardKind {
    pub fn from_directive(name: &str) -> Option<Self> {
        match name {
            "auth" => Some(GuardKind::Auth),
            "guest" => Some(GuardKind::Guest),
            "can" => Some(GuardKind::Can),
            "cannot" => Some(GuardKind::Cannot),
            "error" => Some(GuardKind::Error),
            "hasSection" | "hassection" => Some(GuardKind::HasSection),
            "unless" => Some(GuardKind::Unless),
            _ => None,
        }
    }

    /// The directive names allowed to close this guard.
    pub fn closers(&self) -> &'static [&'static str] {
        match self {
            GuardKind::Auth => &["endauth"],
            GuardKind::Guest => &["endguest"],
            GuardKind::Can => &["endcan"],
            GuardKind::Cannot => &["endcannot"],
            GuardKind::Error => &["enderror"],
            GuardKind::HasSection => &["endif", "endhasSection", "endhassection"],
            GuardKind::Unless => &["endunless"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    If,
    Switch,
    Case,
    Default,
    Foreach,
    For,
    While,
    Section,
    Block,
    Php,
    Register,
    Wrapper,
    Empty,
    Isset,
    Guard(GuardKind),
    Follow,
}

impl FrameKind {
    /// Frames whose body is a `return \`...\`` branch of a conditional closure.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            FrameKind::If | FrameKind::Empty | FrameKind::Isset | FrameKind::Guard(_)
        )
    }

    pub fn is_switch_group(&self) -> bool {
        matches!(self, FrameKind::Switch | FrameKind::Case | FrameKind::Default)
    }

    /// Loops whose body is collected into a string accumulator.
    pub fn accumulates(&self) -> bool {
        matches!(self, FrameKind::For | FrameKind::While)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFrame {
    pub kind: FrameKind,
    /// Index into the output list of the fragment that opened this frame.
    pub open_index: usize,
}

/// Explicit stack of open block frames.
///
/// Pops are conditional: a closer that does not match the frame on top is a
/// no-op and leaves the stack untouched.
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<BlockFrame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: FrameKind, open_index: usize) {
        self.frames.push(BlockFrame { kind, open_index });
    }

    pub fn top(&self) -> Option<&BlockFrame> {
        self.frames.last()
    }

    pub fn top_kind(&self) -> Option<FrameKind> {
        self.frames.last().map(|f| f.kind)
    }

    pub fn pop_if<F>(&mut self, accept: F) -> Option<BlockFrame>
    where
        F: Fn(FrameKind) -> bool,
    {
        match self.frames.last() {
            Some(frame) if accept(frame.kind) => self.frames.pop(),
            _ => None,
        }
    }

    pub fn contains(&self, kind: FrameKind) -> bool {
        self.frames.iter().any(|f| f.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationSource {
    Vars,
    Let,
    Const,
    UseState,
}

/// Wiring data for a `[value, setValue] = useState(init)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulBinding {
    pub state_key: String,
    /// Public setter, exactly as the author named it.
    pub setter_name: String,
    /// Internal setter returned by `__STATE__.__register`.
    pub register_setter: String,
    pub initial_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub source: DeclarationSource,
    pub is_destructuring: bool,
    pub names: Vec<String>,
    /// Per-name defaults, parallel to `names` (only `@vars` fills these).
    pub defaults: Vec<Option<String>>,
    /// Translated binding target, e.g. `[a, b]` or `total`.
    pub target: String,
    /// Translated right-hand side.
    pub value: Option<String>,
    pub has_default: bool,
    pub is_stateful: bool,
    pub stateful: Option<StatefulBinding>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Short,
    Long,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Short => "short",
            SectionKind::Long => "long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDescriptor {
    pub name: String,
    pub kind: SectionKind,
    pub uses_injected_vars: bool,
    pub needs_placeholder: bool,
    pub inline_script: Option<String>,
    /// Captured body (long) or translated value expression (short).
    pub content: String,
    /// The complete template fragment this section compiled to.
    #[serde(skip)]
    pub fragment: String,
}

impl SectionDescriptor {
    pub fn new(name: &str, kind: SectionKind, content: String) -> Self {
        SectionDescriptor {
            name: name.to_string(),
            kind,
            uses_injected_vars: false,
            needs_placeholder: false,
            inline_script: None,
            content,
            fragment: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRAPPER / SUBSCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A boolean-or-key-list switch, printed as `true`, `false` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Subscription {
    All,
    Off,
    Keys(Vec<String>),
}

impl Subscription {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Subscription::Off)
    }

    pub fn to_js(&self) -> String {
        match self {
            Subscription::All => "true".to_string(),
            Subscription::Off => "false".to_string(),
            Subscription::Keys(keys) => {
                serde_json::to_string(keys).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperConfig {
    pub enabled: bool,
    pub tag: Option<String>,
    pub follow: Subscription,
    pub subscribe: Option<Subscription>,
    /// Attribute name to JS expression, in source order.
    pub attributes: Vec<(String, String)>,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        WrapperConfig {
            enabled: true,
            tag: None,
            follow: Subscription::All,
            subscribe: None,
            attributes: Vec::new(),
        }
    }
}

/// Result of splitting a processed body around its wrapper config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WrapperSplit {
    /// Object literal text of the config, braces included.
    pub config: String,
    pub before: String,
    pub inner: String,
    pub after: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg_attr(feature = "napi", napi_derive::napi(object))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledModule {
    pub function_name: String,
    pub view_name: String,
    pub has_prerender: bool,
    pub render: String,
    pub virtual_render: String,
    pub prerender: String,
    pub init: String,
    pub load_server_data: String,
    /// Complete module text.
    pub source: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
