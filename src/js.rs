//! Target-language IR and its printer.
//!
//! All quoting and template-literal escaping of generated JavaScript goes
//! through this module.

use crate::scanner::is_ident_char;
use std::fmt::Write;

// ═══════════════════════════════════════════════════════════════════════════════
// ESCAPING
// ═══════════════════════════════════════════════════════════════════════════════

const ESCAPED_BACKTICK_GUARD: &str = "\u{0}BT\u{0}";

/// Escapes every backtick for use inside a template literal. Backticks that
/// are already escaped stay escaped exactly once.
pub fn escape_backticks(text: &str) -> String {
    text.replace("\\`", ESCAPED_BACKTICK_GUARD)
        .replace('`', "\\`")
        .replace(ESCAPED_BACKTICK_GUARD, "\\`")
}

/// Escaping for text that must come out of a template literal verbatim.
pub fn escape_template_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

/// `'text'` with `\` and `'` escaped and newlines folded.
pub fn quote_single(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `"text"` with JSON escaping.
pub fn quote_double(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Already valid JavaScript.
    Raw(String),
    /// Single-quoted string literal.
    Str(String),
    /// Double-quoted (JSON) string literal.
    Json(String),
    Bool(bool),
    Null,
    Array(Vec<Expr>),
    /// Entries in order. An empty key splices the value in as raw entries.
    Object(Vec<(String, Expr)>),
    /// Template literal whose body is already escaped.
    Template(String),
    Function(Function),
}

impl Expr {
    pub fn raw(code: impl Into<String>) -> Self {
        Expr::Raw(code.into())
    }

    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Expr::Array(items.into_iter().map(|s| Expr::Json(s.as_ref().to_string())).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Printed as-is; continuation lines are not re-indented.
    Raw(String),
    Let(String, Option<Expr>),
    Const(String, Expr),
    Assign(String, Expr),
    Expr(Expr),
    Return(Expr),
    Try {
        body: Vec<Stmt>,
        catch_param: String,
        handler: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

impl Function {
    pub fn new(params: &[&str], body: Vec<Stmt>) -> Self {
        Function {
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTER
// ═══════════════════════════════════════════════════════════════════════════════

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct Printer {
    out: String,
    level: usize,
}

impl Printer {
    pub fn new(level: usize) -> Self {
        Printer {
            out: String::new(),
            level,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn pad(&self, level: usize) -> String {
        INDENT.repeat(level)
    }

    pub fn expr(&mut self, expr: &Expr) {
        let text = self.render_expr(expr, self.level);
        self.out.push_str(&text);
    }

    pub fn render_expr(&self, expr: &Expr, level: usize) -> String {
        match expr {
            Expr::Raw(code) => code.clone(),
            Expr::Str(s) => quote_single(s),
            Expr::Json(s) => quote_double(s),
            Expr::Bool(b) => b.to_string(),
            Expr::Null => "null".to_string(),
            Expr::Template(body) => format!("`{}`", body),
            Expr::Array(items) => {
                let parts: Vec<String> = items.iter().map(|e| self.render_expr(e, level)).collect();
                format!("[{}]", parts.join(", "))
            }
            Expr::Object(entries) if entries.is_empty() => "{}".to_string(),
            Expr::Object(entries) => {
                let mut s = String::from("{\n");
                for (i, (key, value)) in entries.iter().enumerate() {
                    let sep = if i + 1 < entries.len() { "," } else { "" };
                    if key.is_empty() {
                        let _ = writeln!(s, "{}{}{}", self.pad(level + 1), self.render_expr(value, level + 1), sep);
                        continue;
                    }
                    let _ = writeln!(
                        s,
                        "{}{}: {}{}",
                        self.pad(level + 1),
                        object_key(key),
                        self.render_expr(value, level + 1),
                        sep
                    );
                }
                s.push_str(&self.pad(level));
                s.push('}');
                s
            }
            Expr::Function(f) => self.render_function(f, level),
        }
    }

    pub fn render_function(&self, f: &Function, level: usize) -> String {
        let mut s = format!("function({}) {{\n", f.params.join(", "));
        for stmt in &f.body {
            s.push_str(&self.render_stmt(stmt, level + 1));
        }
        s.push_str(&self.pad(level));
        s.push('}');
        s
    }

    pub fn stmt(&mut self, stmt: &Stmt) {
        let text = self.render_stmt(stmt, self.level);
        self.out.push_str(&text);
    }

    pub fn render_stmt(&self, stmt: &Stmt, level: usize) -> String {
        let pad = self.pad(level);
        match stmt {
            Stmt::Raw(code) if code.is_empty() => "\n".to_string(),
            Stmt::Raw(code) => format!("{}{}\n", pad, code),
            Stmt::Let(name, None) => format!("{}let {};\n", pad, name),
            Stmt::Let(name, Some(value)) => {
                format!("{}let {} = {};\n", pad, name, self.render_expr(value, level))
            }
            Stmt::Const(name, value) => {
                format!("{}const {} = {};\n", pad, name, self.render_expr(value, level))
            }
            Stmt::Assign(name, value) => {
                format!("{}{} = {};\n", pad, name, self.render_expr(value, level))
            }
            Stmt::Expr(value) => format!("{}{};\n", pad, self.render_expr(value, level)),
            Stmt::Return(value) => format!("{}return {};\n", pad, self.render_expr(value, level)),
            Stmt::Try {
                body,
                catch_param,
                handler,
            } => {
                let mut s = format!("{}try {{\n", pad);
                for inner in body {
                    s.push_str(&self.render_stmt(inner, level + 1));
                }
                let _ = writeln!(s, "{}}} catch({}) {{", pad, catch_param);
                for inner in handler {
                    s.push_str(&self.render_stmt(inner, level + 1));
                }
                let _ = writeln!(s, "{}}}", pad);
                s
            }
        }
    }
}

/// Identifier keys are printed bare, everything else as a JSON string.
fn object_key(key: &str) -> String {
    let bytes = key.as_bytes();
    let bare = !bytes.is_empty()
        && !bytes[0].is_ascii_digit()
        && bytes.iter().all(|&b| is_ident_char(b));
    if bare {
        key.to_string()
    } else {
        quote_double(key)
    }
}

/// Renders an expression at indentation level zero.
pub fn print_expr(expr: &Expr) -> String {
    Printer::new(0).render_expr(expr, 0)
}

/// Renders an expression compactly on one line (objects included).
pub fn print_inline(expr: &Expr) -> String {
    match expr {
        Expr::Object(entries) if !entries.is_empty() => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| match k.is_empty() {
                    true => print_inline(v),
                    false => format!("{}: {}", object_key(k), print_inline(v)),
                })
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        Expr::Array(items) => {
            let parts: Vec<String> = items.iter().map(print_inline).collect();
            format!("[{}]", parts.join(", "))
        }
        other => print_expr(other),
    }
}
