use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Segment {
    Constant,
    Local,
    Static,
    Argument,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn from_name(name: &str) -> Option<Segment> {
        let seg = match name {
            "constant" => Segment::Constant,
            "local" => Segment::Local,
            "static" => Segment::Static,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "pointer" => Segment::Pointer,
            "temp" => Segment::Temp,
            _ => return None,
        };
        Some(seg)
    }

    pub fn name(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stack arithmetic and logic operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Neg => "neg",
            ArithOp::Eq => "eq",
            ArithOp::Gt => "gt",
            ArithOp::Lt => "lt",
            ArithOp::And => "and",
            ArithOp::Or => "or",
            ArithOp::Not => "not",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    // Stack basics
    Arithmetic(ArithOp),
    Push(Segment, u16),
    Pop(Segment, u16),

    // Control
    Label(String),
    Goto(String),
    IfGoto(String),

    // Functions
    Function(String, u16),
    Call(String, u16),
    Return,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CommandKind {
    Arithmetic,
    Push,
    Pop,
    Label,
    Goto,
    IfGoto,
    Function,
    Return,
    Call,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Arithmetic(_) => CommandKind::Arithmetic,
            Command::Push(..) => CommandKind::Push,
            Command::Pop(..) => CommandKind::Pop,
            Command::Label(_) => CommandKind::Label,
            Command::Goto(_) => CommandKind::Goto,
            Command::IfGoto(_) => CommandKind::IfGoto,
            Command::Function(..) => CommandKind::Function,
            Command::Call(..) => CommandKind::Call,
            Command::Return => CommandKind::Return,
        }
    }

    /// Operator, segment, label or function name, depending on the kind.
    pub fn arg1(&self) -> Option<&str> {
        match self {
            Command::Arithmetic(op) => Some(op.mnemonic()),
            Command::Push(seg, _) | Command::Pop(seg, _) => Some(seg.name()),
            Command::Label(name)
            | Command::Goto(name)
            | Command::IfGoto(name)
            | Command::Function(name, _)
            | Command::Call(name, _) => Some(name),
            Command::Return => None,
        }
    }

    /// Index or count; only present for push, pop, function and call.
    pub fn arg2(&self) -> Option<u16> {
        match self {
            Command::Push(_, n) | Command::Pop(_, n) => Some(*n),
            Command::Function(_, n) | Command::Call(_, n) => Some(*n),
            _ => None,
        }
    }
}

/// A parsed command together with where it came from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SourceCommand {
    pub raw: String,
    /// 1-based line number in the source unit.
    pub line: usize,
    pub command: Command,
}

impl SourceCommand {
    pub fn kind(&self) -> CommandKind {
        self.command.kind()
    }

    pub fn arg1(&self) -> Option<&str> {
        self.command.arg1()
    }

    pub fn arg2(&self) -> Option<u16> {
        self.command.arg2()
    }
}

#[test]
fn test_command_args() {
    let call = Command::Call("Math.multiply".to_string(), 2);
    assert_eq!(call.kind(), CommandKind::Call);
    assert_eq!(call.arg1(), Some("Math.multiply"));
    assert_eq!(call.arg2(), Some(2));

    assert_eq!(Command::Arithmetic(ArithOp::Lt).arg1(), Some("lt"));
    assert_eq!(Command::Return.arg1(), None);
    assert_eq!(Command::Goto("LOOP".to_string()).arg2(), None);
}
