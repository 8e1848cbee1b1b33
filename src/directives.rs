//! Directive stack machine.
//!
//! Consumes the token stream produced by [`crate::parse::lex`] and builds an
//! ordered list of output lines: literal markup interleaved with the
//! template-literal fragments each directive compiles to. Open blocks are
//! tracked on a [`FrameStack`]; a closer that does not match the frame on
//! top is ignored, and frames left open at the end stay open.

use crate::inline;
use crate::js::quote_single;
use crate::parse::{DirectiveToken, Token};
use crate::scanner;
use crate::transform::Translator;
use crate::validate::{FrameKind, FrameStack, GuardKind, SectionDescriptor, SectionKind};
use crate::wrapper;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FOREACH: Regex =
        Regex::new(r"(?s)^\s*(.*?)\s+as\s+\$?(\w+)(?:\s*=>\s*\$?(\w+))?\s*$").unwrap();
    static ref FOR_HEADER: Regex = Regex::new(
        r"^\s*(?:let\s+|var\s+)?\$?(\w+)\s*=\s*(.*?);\s*\$?(\w+)\s*([<>=!]+)\s*(.*?);\s*\$?(\w+)\s*(\+\+|--)\s*$"
    )
    .unwrap();
}

const P: &str = "App.View";

/// Result of running the machine over one template body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineOutput {
    pub lines: Vec<String>,
    pub sections: Vec<SectionDescriptor>,
    /// Frames still open at end of input.
    pub unclosed: usize,
}

impl MachineOutput {
    pub fn template(&self) -> String {
        self.lines.join("\n")
    }
}

pub struct DirectiveMachine<'a> {
    translator: Translator<'a>,
    stack: FrameStack,
    out: Vec<String>,
    sections: Vec<SectionDescriptor>,
    /// Names of open long sections, innermost last.
    section_names: Vec<String>,
}

/// Runs a fresh machine over `tokens`.
pub fn run(tokens: &[Token], translator: Translator) -> MachineOutput {
    let mut machine = DirectiveMachine::new(translator);
    for token in tokens {
        machine.feed(token);
    }
    machine.finish()
}

impl<'a> DirectiveMachine<'a> {
    pub fn new(translator: Translator<'a>) -> Self {
        DirectiveMachine {
            translator,
            stack: FrameStack::new(),
            out: Vec::new(),
            sections: Vec::new(),
            section_names: Vec::new(),
        }
    }

    pub fn stack(&self) -> &FrameStack {
        &self.stack
    }

    pub fn feed(&mut self, token: &Token) {
        match token {
            Token::Text(text) => self.text(text),
            Token::Directive(d) => self.directive(d),
        }
    }

    pub fn finish(self) -> MachineOutput {
        MachineOutput {
            unclosed: self.stack.len(),
            lines: self.out,
            sections: self.sections,
        }
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.out.push(line.into());
    }

    fn tr(&self, expr: &str) -> String {
        self.translator.translate(expr)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TEXT
    // ═══════════════════════════════════════════════════════════════════════════

    fn text(&mut self, text: &str) {
        match self.stack.top_kind() {
            Some(FrameKind::Switch) | Some(FrameKind::Register) => {}
            Some(FrameKind::Php) => {
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    let code = self.tr(line);
                    self.emit(format!("    {}", code));
                }
            }
            top => {
                let in_loop = top.map(|k| k.accumulates()).unwrap_or(false);
                let processed = inline::process_text(text, &self.translator);
                for line in processed.split('\n') {
                    if in_loop && line.trim().is_empty() {
                        continue;
                    }
                    self.emit(line);
                }
            }
        }
    }

    /// Emits a directive's source unchanged.
    fn passthrough(&mut self, d: &DirectiveToken) {
        let raw = d.raw.clone();
        self.text(&raw);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DISPATCH
    // ═══════════════════════════════════════════════════════════════════════════

    fn directive(&mut self, d: &DirectiveToken) {
        if self.stack.top_kind() == Some(FrameKind::Register) && d.name != "endregister" {
            return;
        }
        let args = d.args.as_deref().unwrap_or("").trim();
        match d.name.as_str() {
            "if" => {
                let cond = self.tr(args);
                self.open_conditional(FrameKind::If, &cond)
            }
            "elseif" => self.else_if(args),
            "else" => self.else_branch(),
            "endif" => self.close_conditional(|k| {
                k == FrameKind::If || k == FrameKind::Guard(GuardKind::HasSection)
            }),
            "isset" => {
                let cond = format!("{}.isSet({})", P, self.tr(args));
                self.open_conditional(FrameKind::Isset, &cond)
            }
            "endisset" => self.close_conditional(|k| k == FrameKind::Isset),
            "empty" => {
                let cond = format!("{}.isEmpty({})", P, self.tr(args));
                self.open_conditional(FrameKind::Empty, &cond)
            }
            "endempty" => self.close_conditional(|k| k == FrameKind::Empty),

            "switch" => self.switch(args),
            "case" => self.case(Some(args)),
            "default" => self.case(None),
            "break" => self.break_case(),
            "endswitch" => self.end_switch(),

            "foreach" => self.foreach(d, args),
            "endforeach" => self.close_simple(FrameKind::Foreach, "`)}"),
            "for" => self.for_loop(args),
            "endfor" => self.end_loop(FrameKind::For, "__forOutputContent__"),
            "while" => self.while_loop(args),
            "endwhile" => self.end_loop(FrameKind::While, "__whileOutputContent__"),

            "section" => self.section(d, args),
            "endsection" | "show" | "stop" | "overwrite" | "append" => self.end_section(),
            "block" => self.block(args),
            "endblock" => self.close_simple(FrameKind::Block, "`)}"),
            "follow" | "watch" => self.follow(args),
            "endfollow" | "endwatch" => self.close_simple(FrameKind::Follow, "`)}"),

            "php" => self.php(d),
            "endphp" => {
                if self.stack.pop_if(|k| k == FrameKind::Php).is_some() {
                    self.emit("    return '';");
                    self.emit("})}");
                }
            }
            "register" => {
                let at = self.out.len();
                self.stack.push(FrameKind::Register, at);
            }
            "endregister" => {
                self.stack.pop_if(|k| k == FrameKind::Register);
            }

            "wrapper" => self.runtime_wrapper(args),
            "endwrapper" => {
                if self.stack.pop_if(|k| k == FrameKind::Wrapper).is_some() {
                    self.emit(format!("${{{}.endWrapper(__VIEW_ID__)}}", P));
                }
            }
            "wrap" | "template" => {
                let config = wrapper::parse_wrap_args(args, &self.translator);
                self.emit(wrapper::config_assignment(&config));
            }
            "endwrap" | "endtemplate" => self.emit(wrapper::WRAPPER_END),

            name => match GuardKind::from_directive(name) {
                Some(guard) => self.guard(guard, args),
                None => self.close_guard(name),
            },
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONDITIONALS
    // ═══════════════════════════════════════════════════════════════════════════

    fn open_conditional(&mut self, kind: FrameKind, cond: &str) {
        let at = self.out.len();
        self.stack.push(kind, at);
        self.emit(format!("${{{}.execute(() => {{ if({}){{ return `", P, cond));
    }

    fn else_if(&mut self, args: &str) {
        if self.stack.top_kind().map(|k| k.is_conditional()) == Some(true) {
            let cond = self.tr(args);
            self.emit(format!("`; }} else if({}){{ return `", cond));
        }
    }

    fn else_branch(&mut self) {
        if self.stack.top_kind().map(|k| k.is_conditional()) == Some(true) {
            self.emit("`; } else { return `");
        }
    }

    fn close_conditional<F>(&mut self, accept: F)
    where
        F: Fn(FrameKind) -> bool,
    {
        if self.stack.pop_if(accept).is_some() {
            self.emit("`; }");
            self.emit("return '';");
            self.emit("})}");
        }
    }

    fn guard(&mut self, guard: GuardKind, args: &str) {
        let arg = self.tr(args);
        let cond = match guard {
            GuardKind::Auth if arg.is_empty() => format!("{}.isAuth()", P),
            GuardKind::Auth => format!("{}.isAuth({})", P, arg),
            GuardKind::Guest if arg.is_empty() => format!("!{}.isAuth()", P),
            GuardKind::Guest => format!("!{}.isAuth({})", P, arg),
            GuardKind::Can => format!("{}.can({})", P, arg),
            GuardKind::Cannot => format!("{}.cannot({})", P, arg),
            GuardKind::Error => format!("{}.hasError({})", P, arg),
            GuardKind::HasSection => format!("{}.hasSection({})", P, arg),
            GuardKind::Unless => format!("!({})", arg),
        };
        self.open_conditional(FrameKind::Guard(guard), &cond);
    }

    /// Any remaining directive name is a guard closer or unknown (ignored).
    fn close_guard(&mut self, name: &str) {
        self.close_conditional(|k| match k {
            FrameKind::Guard(g) => g.closers().contains(&name),
            _ => false,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SWITCH
    // ═══════════════════════════════════════════════════════════════════════════

    fn switch(&mut self, args: &str) {
        let at = self.out.len();
        self.stack.push(FrameKind::Switch, at);
        let subject = self.tr(args);
        self.emit(format!(
            "${{{}.execute(() => {{\nlet __switchOutputContent__ = '';\nswitch({}) {{",
            P, subject
        ));
    }

    /// Closes the case or default branch on top, if any.
    fn close_case(&mut self) -> bool {
        let closed = self
            .stack
            .pop_if(|k| matches!(k, FrameKind::Case | FrameKind::Default))
            .is_some();
        if closed {
            self.emit("`;");
        }
        closed
    }

    fn case(&mut self, args: Option<&str>) {
        self.close_case();
        if self.stack.top_kind() != Some(FrameKind::Switch) {
            return;
        }
        let at = self.out.len();
        match args {
            Some(value) => {
                self.stack.push(FrameKind::Case, at);
                let value = self.tr(value);
                self.emit(format!("\ncase {}:\n__switchOutputContent__ += `", value));
            }
            None => {
                self.stack.push(FrameKind::Default, at);
                self.emit("\ndefault:\n__switchOutputContent__ += `");
            }
        }
    }

    fn break_case(&mut self) {
        if self
            .stack
            .pop_if(|k| matches!(k, FrameKind::Case | FrameKind::Default))
            .is_some()
        {
            self.emit("`;\nbreak;");
        }
    }

    fn end_switch(&mut self) {
        if !self.stack.top_kind().map(|k| k.is_switch_group()).unwrap_or(false) {
            return;
        }
        self.close_case();
        if self.stack.pop_if(|k| k == FrameKind::Switch).is_some() {
            self.emit("\n}\nreturn __switchOutputContent__;\n})}");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOPS
    // ═══════════════════════════════════════════════════════════════════════════

    fn close_simple(&mut self, kind: FrameKind, closer: &str) {
        if self.stack.pop_if(|k| k == kind).is_some() {
            self.emit(closer);
        }
    }

    fn foreach(&mut self, d: &DirectiveToken, args: &str) {
        let Some(caps) = FOREACH.captures(args) else {
            self.passthrough(d);
            return;
        };
        let subject = self.tr(&caps[1]);
        let (key, value) = match caps.get(3) {
            Some(value) => (caps[2].to_string(), value.as_str().to_string()),
            None => ("__loopKey".to_string(), caps[2].to_string()),
        };
        let at = self.out.len();
        self.stack.push(FrameKind::Foreach, at);
        self.emit(format!(
            "${{{}.foreach({}, ({}, {}, __loopIndex, loop) => `",
            P, subject, value, key
        ));
    }

    fn for_loop(&mut self, args: &str) {
        let header = match FOR_HEADER.captures(args) {
            Some(c) if c[1] == c[3] && c[1] == c[6] => format!(
                "let {} = {}; {} {} {}; {}{}",
                &c[1],
                self.tr(&c[2]),
                &c[1],
                &c[4],
                self.tr(&c[5]),
                &c[1],
                &c[7]
            ),
            _ => self.tr(args),
        };
        let at = self.out.len();
        self.stack.push(FrameKind::For, at);
        self.emit(format!(
            "${{{}.execute(() => {{\nlet __forOutputContent__ = ``;\nfor({}) {{",
            P, header
        ));
    }

    fn while_loop(&mut self, args: &str) {
        let cond = self.tr(args);
        let at = self.out.len();
        self.stack.push(FrameKind::While, at);
        self.emit(format!(
            "${{{}.execute(() => {{\nlet __whileOutputContent__ = ``;\nwhile({}) {{",
            P, cond
        ));
    }

    /// Collects everything emitted since the loop opened into a single
    /// accumulator statement, then closes the closure.
    fn end_loop(&mut self, kind: FrameKind, accumulator: &str) {
        let Some(frame) = self.stack.pop_if(|k| k == kind) else {
            return;
        };
        let body: Vec<String> = self
            .out
            .split_off(frame.open_index + 1)
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect();
        if !body.is_empty() {
            self.emit(format!("{} += `{}`;", accumulator, body.join("\n")));
        }
        self.emit(format!("}}\nreturn {};\n}})}}", accumulator));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SECTIONS AND BLOCKS
    // ═══════════════════════════════════════════════════════════════════════════

    fn section_name(&self, arg: &str) -> (String, String) {
        match scanner::unquote(arg) {
            Some(name) if !name.contains('$') => (name.to_string(), quote_single(name)),
            _ => {
                let expr = self.tr(arg);
                (expr.clone(), expr)
            }
        }
    }

    fn section(&mut self, d: &DirectiveToken, args: &str) {
        let parts = scanner::split_top_level(args, b',');
        let Some(first) = parts.first() else {
            self.passthrough(d);
            return;
        };
        let (name, name_js) = self.section_name(first);

        if parts.len() >= 2 {
            let value = self.tr(parts[1]);
            let fragment = format!("${{{}.section({}, {}, 'string')}}", P, name_js, value);
            let mut section = SectionDescriptor::new(&name, SectionKind::Short, value);
            section.fragment = fragment.clone();
            self.sections.push(section);
            self.emit(fragment);
            return;
        }

        let at = self.out.len();
        self.stack.push(FrameKind::Section, at);
        self.section_names.push(name);
        self.emit(format!("${{{}.section({}, `", P, name_js));
    }

    fn end_section(&mut self) {
        let Some(frame) = self.stack.pop_if(|k| k == FrameKind::Section) else {
            return;
        };
        let name = self.section_names.pop().unwrap_or_default();
        let content = self.out[frame.open_index + 1..].join("\n");
        self.emit("`, 'html')}");
        let mut section = SectionDescriptor::new(&name, SectionKind::Long, content);
        section.fragment = self.out[frame.open_index..].join("\n");
        self.sections.push(section);
    }

    fn block(&mut self, args: &str) {
        let parts = scanner::split_top_level(args, b',');
        let (_, name_js) = self.section_name(parts.first().copied().unwrap_or("''"));
        let attrs = parts
            .get(1)
            .map(|a| self.tr(a))
            .unwrap_or_else(|| "{}".to_string());
        let at = self.out.len();
        self.stack.push(FrameKind::Block, at);
        self.emit(format!("${{this.__block({}, {}, () => `", name_js, attrs));
    }

    fn follow(&mut self, args: &str) {
        let keys: Vec<String> = scanner::split_top_level(args.trim_matches(['[', ']']), b',')
            .into_iter()
            .map(|k| crate::js::quote_double(&scanner::bare_name(k)))
            .collect();
        let at = self.out.len();
        self.stack.push(FrameKind::Follow, at);
        self.emit(format!("${{this.__follow([{}], () => `", keys.join(", ")));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PHP AND WRAPPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn php(&mut self, d: &DirectiveToken) {
        match d.args.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => {
                let code = self.tr(expr);
                self.emit(format!(
                    "${{{}.execute(() => {{ {}; return ''; }})}}",
                    P,
                    code.trim_end_matches(';')
                ));
            }
            _ => {
                let at = self.out.len();
                self.stack.push(FrameKind::Php, at);
                self.emit(format!("${{{}.execute(() => {{", P));
            }
        }
    }

    fn runtime_wrapper(&mut self, args: &str) {
        let parts = scanner::split_top_level(args, b',');
        let tag = parts
            .first()
            .map(|t| self.tr(t))
            .unwrap_or_else(|| "'div'".to_string());
        let attrs = parts
            .get(1)
            .map(|a| self.tr(a))
            .unwrap_or_else(|| "{}".to_string());
        let at = self.out.len();
        self.stack.push(FrameKind::Wrapper, at);
        self.emit(format!(
            "${{{}.startWrapper({}, {}, __VIEW_ID__)}}",
            P, tag, attrs
        ));
    }
}
