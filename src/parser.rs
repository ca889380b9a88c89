use nom::{
    branch::alt,
    bytes::complete::{is_a, tag},
    character::{
        complete::{alpha1, char, digit1, space1},
        is_digit,
    },
    combinator::{map, map_res, opt, recognize, value, verify},
    sequence::{pair, tuple},
    IResult,
};

use crate::ast::{ArithOp, Command, Segment, SourceCommand};
use crate::error::{InvalidOperandSnafu, MalformedCommandSnafu, Result};

/// Largest value an address instruction can load directly.
const MAX_ADDRESS: u16 = 0x7fff;
/// `call` adds the five saved frame words to its argument count.
const MAX_COUNT: u16 = MAX_ADDRESS - 5;
const TEMP_SLOTS: u16 = 8;

/// A line that is shaped like a command but whose operands are unchecked.
#[derive(Debug, PartialEq, Clone)]
enum Shape<'a> {
    Arithmetic(ArithOp),
    Push(&'a str, i64),
    Pop(&'a str, i64),
    Label(&'a str),
    Goto(&'a str),
    IfGoto(&'a str),
    Function(&'a str, i64),
    Call(&'a str, i64),
    Return,
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |c: &str| c.parse())(input)
}

#[test]
fn test_integer() {
    assert_eq!(integer("17"), Ok(("", 17)));
    assert_eq!(integer("-3"), Ok(("", -3)));
    assert!(integer("99999999999999999999").is_err());
    assert!(integer("x1").is_err());
}

fn symbol(input: &str) -> IResult<&str, &str> {
    verify(
        is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
        |c: &str| !is_digit(c.as_bytes()[0]),
    )(input)
}

fn access(input: &str) -> IResult<&str, Shape<'_>> {
    map(
        tuple((alt((tag("push"), tag("pop"))), space1, alpha1, space1, integer)),
        |(op, _, segment, _, index)| match op {
            "push" => Shape::Push(segment, index),
            _ => Shape::Pop(segment, index),
        },
    )(input)
}

#[test]
fn test_access() {
    assert_eq!(access("push  pointer  1"), Ok(("", Shape::Push("pointer", 1))));
    assert_eq!(access("pop local -2"), Ok(("", Shape::Pop("local", -2))));
    assert!(access("push local").is_err());
}

fn prim(input: &str) -> IResult<&str, Shape<'_>> {
    map(
        alt((
            value(ArithOp::Add, tag("add")),
            value(ArithOp::Sub, tag("sub")),
            value(ArithOp::Neg, tag("neg")),
            value(ArithOp::Eq, tag("eq")),
            value(ArithOp::Gt, tag("gt")),
            value(ArithOp::Lt, tag("lt")),
            value(ArithOp::And, tag("and")),
            value(ArithOp::Or, tag("or")),
            value(ArithOp::Not, tag("not")),
        )),
        Shape::Arithmetic,
    )(input)
}

#[test]
fn test_prim() {
    assert_eq!(prim("neg"), Ok(("", Shape::Arithmetic(ArithOp::Neg))));
}

fn branching(input: &str) -> IResult<&str, Shape<'_>> {
    map(
        tuple((
            alt((tag("label"), tag("goto"), tag("if-goto"))),
            space1,
            symbol,
        )),
        |(op, _, sym)| match op {
            "label" => Shape::Label(sym),
            "goto" => Shape::Goto(sym),
            _ => Shape::IfGoto(sym),
        },
    )(input)
}

fn function_call(input: &str) -> IResult<&str, Shape<'_>> {
    map(
        tuple((alt((tag("function"), tag("call"))), space1, symbol, space1, integer)),
        |(op, _, name, _, count)| match op {
            "function" => Shape::Function(name, count),
            _ => Shape::Call(name, count),
        },
    )(input)
}

#[test]
fn test_function_call() {
    assert_eq!(
        function_call("function Main.fibonacci 2"),
        Ok(("", Shape::Function("Main.fibonacci", 2)))
    );
    assert_eq!(
        function_call("call Math.multiply 2"),
        Ok(("", Shape::Call("Math.multiply", 2)))
    );
}

fn command(input: &str) -> IResult<&str, Shape<'_>> {
    alt((
        access,
        branching,
        function_call,
        value(Shape::Return, tag("return")),
        prim,
    ))(input)
}

fn index(n: i64) -> std::result::Result<u16, String> {
    if n < 0 {
        return Err(format!("negative index {}", n));
    }
    u16::try_from(n).map_err(|_| format!("index {} out of range", n))
}

fn address_offset(segment: Segment, n: i64) -> std::result::Result<u16, String> {
    let n = index(n)?;
    let limit = match segment {
        Segment::Constant => u16::MAX,
        Segment::Temp => TEMP_SLOTS - 1,
        Segment::Pointer => 1,
        _ => MAX_ADDRESS,
    };
    if n > limit {
        return Err(format!("{} index {} exceeds {}", segment, n, limit));
    }
    Ok(n)
}

fn count(n: i64) -> std::result::Result<u16, String> {
    let n = index(n)?;
    if n > MAX_COUNT {
        return Err(format!("count {} exceeds {}", n, MAX_COUNT));
    }
    Ok(n)
}

fn segment(name: &str) -> std::result::Result<Segment, String> {
    Segment::from_name(name).ok_or_else(|| format!("unknown segment '{}'", name))
}

/// Check operands and produce the final command.
fn resolve(shape: Shape<'_>) -> std::result::Result<Command, String> {
    let command = match shape {
        Shape::Arithmetic(op) => Command::Arithmetic(op),
        Shape::Push(seg, n) => {
            let seg = segment(seg)?;
            Command::Push(seg, address_offset(seg, n)?)
        }
        Shape::Pop(seg, n) => {
            let seg = segment(seg)?;
            if seg == Segment::Constant {
                return Err("cannot pop into constant".to_string());
            }
            Command::Pop(seg, address_offset(seg, n)?)
        }
        Shape::Label(name) => Command::Label(name.to_string()),
        Shape::Goto(name) => Command::Goto(name.to_string()),
        Shape::IfGoto(name) => Command::IfGoto(name.to_string()),
        Shape::Function(name, n) => Command::Function(name.to_string(), count(n)?),
        Shape::Call(name, n) => Command::Call(name.to_string(), count(n)?),
        Shape::Return => Command::Return,
    };
    Ok(command)
}

fn parse_line(unit: &str, line: usize, text: &str) -> Result<SourceCommand> {
    let shape = match command(text) {
        Ok(("", shape)) => shape,
        _ => {
            return MalformedCommandSnafu { unit, line, raw: text }.fail();
        }
    };

    match resolve(shape) {
        Ok(command) => Ok(SourceCommand {
            raw: text.to_string(),
            line,
            command,
        }),
        Err(reason) => InvalidOperandSnafu {
            unit,
            line,
            raw: text,
            reason,
        }
        .fail(),
    }
}

/// Remove `//` and `/* */` comments, returning the non-blank lines with
/// their 1-based line numbers. Block comments may span lines; the state
/// lives only for the duration of one call.
fn strip_comments(unit: &str, source: &str) -> Result<Vec<(usize, String)>> {
    let mut lines = vec![];
    let mut block_start: Option<(usize, &str)> = None;

    for (n, raw) in source.lines().enumerate() {
        let mut kept = String::new();
        let mut rest = raw;

        while !rest.is_empty() {
            if block_start.is_some() {
                match rest.find("*/") {
                    Some(end) => {
                        block_start = None;
                        kept.push(' ');
                        rest = &rest[end + 2..];
                    }
                    None => rest = "",
                }
                continue;
            }

            let line_comment = rest.find("//");
            let block_comment = rest.find("/*");
            match (line_comment, block_comment) {
                (Some(l), Some(b)) if b < l => {
                    kept.push_str(&rest[..b]);
                    block_start = Some((n + 1, raw));
                    rest = &rest[b + 2..];
                }
                (None, Some(b)) => {
                    kept.push_str(&rest[..b]);
                    block_start = Some((n + 1, raw));
                    rest = &rest[b + 2..];
                }
                (Some(l), _) => {
                    kept.push_str(&rest[..l]);
                    rest = "";
                }
                (None, None) => {
                    kept.push_str(rest);
                    rest = "";
                }
            }
        }

        let kept = kept.trim();
        if !kept.is_empty() {
            lines.push((n + 1, kept.to_string()));
        }
    }

    if let Some((line, raw)) = block_start {
        return MalformedCommandSnafu {
            unit,
            line,
            raw: raw.trim(),
        }
        .fail();
    }

    Ok(lines)
}

#[test]
fn test_strip_comments() {
    let source = "push constant 1 // one\n\n/* header\n   still header */ add\n// whole line\nneg /* a */ /* b";
    let lines = strip_comments("Test", source);
    assert!(lines.is_err());

    let source = "push constant 1 // one\n\n/* header\n   still header */ add\n// whole line\nneg /* a */\n";
    let lines = strip_comments("Test", source).unwrap();
    assert_eq!(
        lines,
        vec![
            (1, "push constant 1".to_string()),
            (4, "add".to_string()),
            (6, "neg".to_string()),
        ]
    );
}

/// Parse a whole source unit.
pub fn parse(unit: &str, source: &str) -> Result<Vec<SourceCommand>> {
    strip_comments(unit, source)?
        .into_iter()
        .map(|(line, text)| parse_line(unit, line, &text))
        .collect()
}

/// Forward cursor over the commands of one source unit.
#[derive(Debug, Clone)]
pub struct Parser {
    unit: String,
    commands: Vec<SourceCommand>,
    pos: usize,
}

impl Parser {
    pub fn new(unit: impl Into<String>, source: &str) -> Result<Parser> {
        let unit = unit.into();
        let commands = parse(&unit, source)?;
        log::debug!("{}: parsed {} commands", unit, commands.len());
        Ok(Parser {
            unit,
            commands,
            pos: 0,
        })
    }

    /// Name of the source unit, e.g. `Main` for `Main.vm`.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn has_more_commands(&self) -> bool {
        self.pos < self.commands.len()
    }

    pub fn current(&self) -> Option<&SourceCommand> {
        self.commands.get(self.pos)
    }

    /// Return the current command and move past it.
    pub fn advance(&mut self) -> Option<&SourceCommand> {
        let command = self.commands.get(self.pos)?;
        self.pos += 1;
        Some(command)
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn commands(&self) -> &[SourceCommand] {
        &self.commands
    }
}
