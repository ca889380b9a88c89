//! Failures surfaced by parsing, code generation and file handling.
//!
//! Every variant carries enough context (unit, line, command text) to point
//! at the offending source line. Nothing here is recovered from: the first
//! error aborts the run.

use std::path::PathBuf;

use snafu::Snafu;

pub type Result<T, E = TranslateError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TranslateError {
    #[snafu(display("{unit}:{line}: malformed command '{raw}'"))]
    MalformedCommand {
        unit: String,
        line: usize,
        raw: String,
    },

    #[snafu(display("{unit}:{line}: invalid operand in '{raw}': {reason}"))]
    InvalidOperand {
        unit: String,
        line: usize,
        raw: String,
        reason: String,
    },

    #[snafu(display("{unit}:{line}: label '{label}' is not defined in '{function}'"))]
    UnresolvedLabel {
        unit: String,
        line: usize,
        function: String,
        label: String,
    },

    #[snafu(display("{}: no .vm source units found", path.display()))]
    NoSourceUnits { path: PathBuf },

    #[snafu(display("{}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
