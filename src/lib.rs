//! Translator from stack-machine VM code to Hack assembly.
//!
//! - `parser` turns one source unit into a cursor over typed commands.
//! - `translator` expands commands into assembly, owning the run-wide state
//!   (comparison labels, call sites, static allocation, label scopes).
//! - `units` finds source files and names the output.
//!
//! Calls into functions that are never defined are not detected here; the
//! assembler reports them as unresolved symbols.

pub mod ast;
pub mod error;
pub mod labels;
pub mod parser;
pub mod translator;
pub mod units;

use std::path::{Path, PathBuf};

use log::info;

pub use error::{Result, TranslateError};
pub use parser::Parser;
pub use translator::Translator;

pub(crate) const ENTRY_POINT: &str = "Sys.init";

/// When to emit the bootstrap prologue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bootstrap {
    /// Only when some unit defines `Sys.init`.
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub bootstrap: Bootstrap,
    /// Precede each command's expansion with a `// <command>` line.
    pub annotate: bool,
}

fn defines_entry_point(parser: &Parser) -> bool {
    parser
        .commands()
        .iter()
        .any(|c| matches!(&c.command, ast::Command::Function(name, _) if name == ENTRY_POINT))
}

/// Translate already-parsed units, in the given order, into one stream.
pub fn translate_units(units: &mut [Parser], options: &Options) -> Result<Vec<String>> {
    let mut translator = Translator::new(options.annotate);

    let bootstrap = match options.bootstrap {
        Bootstrap::Always => true,
        Bootstrap::Never => false,
        Bootstrap::Auto => units.iter().any(defines_entry_point),
    };
    if bootstrap {
        translator.bootstrap();
    }

    for unit in units.iter_mut() {
        translator.translate_unit(unit)?;
    }
    Ok(translator.finish())
}

/// Translate a single in-memory unit.
pub fn translate_source(unit: &str, source: &str, options: &Options) -> Result<Vec<String>> {
    let mut units = [Parser::new(unit, source)?];
    translate_units(&mut units, options)
}

/// Result of translating a file or directory.
#[derive(Debug)]
pub struct Translation {
    pub sources: Vec<PathBuf>,
    pub output: PathBuf,
    pub instructions: Vec<String>,
}

/// Parse and translate every unit under `input`. Nothing is written; see
/// [`Translation::write`].
pub fn translate_path(input: &Path, output: Option<&Path>, options: &Options) -> Result<Translation> {
    let sources = units::discover(input)?;
    let mut parsers = sources
        .iter()
        .map(|path| Parser::new(units::unit_name(path), &units::read(path)?))
        .collect::<Result<Vec<_>>>()?;

    let instructions = translate_units(&mut parsers, options)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| units::output_path(input));
    info!("translated {} units from {}", sources.len(), input.display());

    Ok(Translation {
        sources,
        output,
        instructions,
    })
}

impl Translation {
    pub fn write(&self) -> Result<()> {
        units::write(&self.output, &self.instructions)
    }
}
