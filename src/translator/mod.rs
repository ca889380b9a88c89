use log::{debug, trace};

use crate::ast::{ArithOp, Command, Segment, SourceCommand};
use crate::error::{InvalidOperandSnafu, Result};
use crate::labels::{self, LabelTable, ScopedLabel};
use crate::parser::Parser;

macro_rules! svec {
    ($($x:expr),* $(,)?) => (vec![$($x.to_string()),*]);
}

mod calls;

/// First and last RAM words of the static region.
const STATIC_START: u16 = 16;
const STATIC_END: u16 = 255;
const TEMP_BASE: u16 = 5;

fn at_c(arg: u16) -> String {
    format!("@{}", arg)
}

fn at_s(arg: &str) -> String {
    format!("@{}", arg)
}

fn pointer_arg(arg: u16) -> &'static str {
    if arg == 0 {
        "THIS"
    } else {
        "THAT"
    }
}

/// Push D onto the stack.
fn push_d() -> Vec<String> {
    svec![
        "@SP",
        "M=M+1",
        "A=M-1", // Don't need to refetch SP; this is safe
        "M=D"
    ]
}

fn push_constant(value: u16) -> Vec<String> {
    let mut out = if value <= 0x7fff {
        svec![at_c(value), "D=A"]
    } else {
        // Address instructions only carry 15 bits; load the complement.
        svec![at_c(!value & 0x7fff), "D=!A"]
    };
    out.extend(push_d());
    out
}

/// Push microcode for the four pointer-based segments
fn seg_push(seg: &str, arg: u16) -> Vec<String> {
    let mut out = svec![
        at_s(seg),
        "D=M",
        at_c(arg),
        "A=D+A", // A = SEG+arg
        "D=M"    // D = value to push
    ];
    out.extend(push_d());
    out
}

fn seg_push_direct(label: &str) -> Vec<String> {
    let mut out = svec![at_s(label), "D=M"];
    out.extend(push_d());
    out
}

fn seg_pop(seg: &str, arg: u16) -> Vec<String> {
    svec![
        at_s(seg),
        "D=M",
        at_c(arg),
        "D=D+A", // D = SEG+arg
        "@R13",
        "M=D", // Store target addr in R13
        "@SP",
        "AM=M-1", // SP--, A <- new SP (val to be popped)
        "D=M",
        "@R13",
        "A=M", // At the target address...
        "M=D"  // ... store the popped val
    ]
}

fn seg_pop_direct(label: &str) -> Vec<String> {
    svec!["@SP", "AM=M-1", "D=M", at_s(label), "M=D"]
}

fn simple_un_op(op: char) -> Vec<String> {
    svec!["@SP", "A=M-1", format!("M={}M", op)]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(comp: &str) -> Vec<String> {
    svec![
        "@SP",
        "AM=M-1", // SP--, looking at top of stack now
        "D=M",    // Right arg in D
        "A=A-1",  // Looking at second arg of stack, will overwrite
        format!("M={}", comp)
    ]
}

/// Code generator state for one translation run. Units are fed in order and
/// all output accumulates in a single instruction stream.
pub struct Translator {
    annotate: bool,
    label_counter: usize,
    call_site_counter: usize,
    unit: String,
    current_function: Option<String>,
    static_base: u16,
    next_static: u16,
    labels: LabelTable,
    instructions: Vec<String>,
}

impl Translator {
    pub fn new(annotate: bool) -> Self {
        Translator {
            annotate,
            label_counter: 0,
            call_site_counter: 0,
            unit: String::new(),
            current_function: None,
            static_base: STATIC_START,
            next_static: STATIC_START,
            labels: LabelTable::new(),
            instructions: vec![],
        }
    }

    fn next_label(&mut self) -> usize {
        let tmp = self.label_counter;
        self.label_counter += 1;
        tmp
    }

    fn next_call_site(&mut self) -> usize {
        let tmp = self.call_site_counter;
        self.call_site_counter += 1;
        tmp
    }

    /// Scope for labels: the enclosing function, or the unit before the
    /// first function.
    fn scope(&self) -> &str {
        self.current_function.as_deref().unwrap_or(&self.unit)
    }

    pub fn static_base(&self) -> u16 {
        self.static_base
    }

    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    pub fn finish(self) -> Vec<String> {
        self.instructions
    }

    fn emit(&mut self, lines: Vec<String>) {
        self.instructions.extend(lines);
    }

    /// Reserve a disjoint slice of the static region for the unit.
    fn allocate_statics(&mut self, parser: &mut Parser) -> Result<()> {
        parser.reset();
        let mut widest: Option<(u16, usize, String)> = None;
        while let Some(command) = parser.advance() {
            if let Command::Push(Segment::Static, i) | Command::Pop(Segment::Static, i) = command.command {
                if widest.as_ref().map_or(true, |(max, _, _)| i > *max) {
                    widest = Some((i, command.line, command.raw.clone()));
                }
            }
        }
        parser.reset();

        self.static_base = self.next_static;
        if let Some((max, line, raw)) = widest {
            let end = u32::from(self.static_base) + u32::from(max);
            if end > u32::from(STATIC_END) {
                return InvalidOperandSnafu {
                    unit: parser.unit(),
                    line,
                    raw,
                    reason: format!("static region exhausted ({} words in use)", end - u32::from(STATIC_START)),
                }
                .fail();
            }
            self.next_static = self.static_base + max + 1;
        }
        debug!("{}: static base {}", parser.unit(), self.static_base);
        Ok(())
    }

    /// Translate every command of one source unit.
    pub fn translate_unit(&mut self, parser: &mut Parser) -> Result<()> {
        self.unit = parser.unit().to_string();
        self.current_function = None;
        self.allocate_statics(parser)?;

        let before = self.instructions.len();
        while let Some(command) = parser.advance() {
            self.translate_command(command)?;
        }
        self.labels.resolve(&self.unit)?;
        trace!("{}: emitted {} lines", self.unit, self.instructions.len() - before);
        Ok(())
    }

    pub fn translate_command(&mut self, command: &SourceCommand) -> Result<()> {
        debug!("{}:{}: {}", self.unit, command.line, command.raw);
        if self.annotate {
            self.instructions.push(format!("// {}", command.raw));
        }

        let translated = match &command.command {
            Command::Push(seg, arg) => self.push(*seg, *arg),
            Command::Pop(seg, arg) => self.pop(command, *seg, *arg)?,
            Command::Arithmetic(op) => self.arithmetic(*op),
            Command::Label(sym) => self.label(command, sym)?,
            Command::Goto(sym) => self.goto(command, sym)?,
            Command::IfGoto(sym) => self.if_goto(command, sym)?,
            Command::Function(name, n_vars) => self.function(command, name, *n_vars)?,
            Command::Call(name, n_args) => {
                let scope = self.user_scope(command)?;
                self.call(&scope, name, *n_args)
            }
            Command::Return => Self::return_(),
        };
        self.emit(translated);
        Ok(())
    }

    fn arithmetic(&mut self, op: ArithOp) -> Vec<String> {
        match op {
            ArithOp::Not => simple_un_op('!'),
            ArithOp::Neg => simple_un_op('-'),
            ArithOp::Add => simple_bin_op("D+M"),
            ArithOp::Sub => simple_bin_op("M-D"),
            ArithOp::And => simple_bin_op("D&M"),
            ArithOp::Or => simple_bin_op("D|M"),
            ArithOp::Eq => self.compare("JEQ"),
            ArithOp::Gt => self.compare("JGT"),
            ArithOp::Lt => self.compare("JLT"),
        }
    }

    fn static_label(&self, arg: u16) -> String {
        (self.static_base + arg).to_string()
    }

    fn push(&self, segment: Segment, arg: u16) -> Vec<String> {
        match segment {
            Segment::Constant => push_constant(arg),
            Segment::Local => seg_push("LCL", arg),
            Segment::Argument => seg_push("ARG", arg),
            Segment::This => seg_push("THIS", arg),
            Segment::That => seg_push("THAT", arg),
            Segment::Static => seg_push_direct(&self.static_label(arg)),
            Segment::Temp => seg_push_direct(&format!("R{}", arg + TEMP_BASE)),
            Segment::Pointer => seg_push_direct(pointer_arg(arg)),
        }
    }

    fn pop(&self, command: &SourceCommand, segment: Segment, arg: u16) -> Result<Vec<String>> {
        let translated = match segment {
            Segment::Constant => return self.invalid(command, "cannot pop into constant"),
            Segment::Local => seg_pop("LCL", arg),
            Segment::Argument => seg_pop("ARG", arg),
            Segment::This => seg_pop("THIS", arg),
            Segment::That => seg_pop("THAT", arg),
            Segment::Static => seg_pop_direct(&self.static_label(arg)),
            Segment::Temp => seg_pop_direct(&format!("R{}", arg + TEMP_BASE)),
            Segment::Pointer => seg_pop_direct(pointer_arg(arg)),
        };
        Ok(translated)
    }

    fn compare(&mut self, jump: &str) -> Vec<String> {
        let (true_sym, end_sym) = labels::comparison_labels(self.next_label());
        svec![
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg in D
            "A=A-1",  // Looking at second arg of stack, will overwrite
            "D=M-D",
            at_s(&true_sym),
            format!("D;{}", jump),
            "D=0",
            at_s(&end_sym),
            "0;JMP",
            format!("({})", true_sym),
            "D=-1",
            format!("({})", end_sym),
            "@SP",
            "A=M-1",
            "M=D"
        ]
    }

    fn invalid<T>(&self, command: &SourceCommand, reason: &str) -> Result<T> {
        InvalidOperandSnafu {
            unit: self.unit.as_str(),
            line: command.line,
            raw: command.raw.as_str(),
            reason,
        }
        .fail()
    }

    /// Scope for a user command's labels. Top-level code of a unit whose
    /// name clashes with generated symbols has none.
    fn user_scope(&self, command: &SourceCommand) -> Result<String> {
        if self.current_function.is_none() {
            if let Some(reason) = labels::reserved_scope(&self.unit) {
                return self.invalid(command, &format!("unit name cannot scope labels: {}", reason));
            }
        }
        Ok(self.scope().to_string())
    }

    fn scoped(&self, command: &SourceCommand, label: &str) -> Result<ScopedLabel> {
        if let Some(reason) = labels::reserved_label(label) {
            return self.invalid(command, reason);
        }
        Ok(ScopedLabel::new(&self.user_scope(command)?, label))
    }

    fn label(&mut self, command: &SourceCommand, label: &str) -> Result<Vec<String>> {
        let target = self.scoped(command, label)?;
        let symbol = target.symbol();
        self.labels.define(&self.unit, command.line, &command.raw, target)?;
        Ok(svec![format!("({})", symbol)])
    }

    fn goto(&mut self, command: &SourceCommand, label: &str) -> Result<Vec<String>> {
        let target = self.scoped(command, label)?;
        let symbol = target.symbol();
        self.labels.reference(command.line, target);
        Ok(svec![
            at_s(&symbol),
            "0;JMP" // Unconditional jump
        ])
    }

    fn if_goto(&mut self, command: &SourceCommand, label: &str) -> Result<Vec<String>> {
        let target = self.scoped(command, label)?;
        let symbol = target.symbol();
        self.labels.reference(command.line, target);
        Ok(svec![
            "@SP",
            "AM=M-1",
            "D=M", // Stack popped into D
            at_s(&symbol),
            "D;JNE" // False is 0, anything else is true
        ])
    }
}
