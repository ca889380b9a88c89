use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use hackvm_translator::{translate_path, Bootstrap, Options};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BootstrapArg {
    Auto,
    Always,
    Never,
}

impl From<BootstrapArg> for Bootstrap {
    fn from(arg: BootstrapArg) -> Self {
        match arg {
            BootstrapArg::Auto => Bootstrap::Auto,
            BootstrapArg::Always => Bootstrap::Always,
            BootstrapArg::Never => Bootstrap::Never,
        }
    }
}

/// Translate VM code into Hack assembly.
#[derive(Debug, Parser)]
#[command(name = "hackvm", version)]
struct Cli {
    /// A `.vm` file, or a directory searched recursively for `.vm` files
    input: PathBuf,

    /// Output path (default: `Foo.asm` for `Foo.vm`, `Dir/Dir.asm` for a directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Whether to emit the `Sys.init` bootstrap
    #[arg(long, value_enum, default_value = "auto")]
    bootstrap: BootstrapArg,

    /// Precede each command's expansion with the command as a comment
    #[arg(long)]
    annotate: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let options = Options {
        bootstrap: cli.bootstrap.into(),
        annotate: cli.annotate,
    };

    let translation = translate_path(&cli.input, cli.output.as_deref(), &options)
        .with_context(|| format!("translating {}", cli.input.display()))?;
    translation
        .write()
        .with_context(|| format!("writing {}", translation.output.display()))?;

    println!(
        "{} -> {} ({} lines)",
        cli.input.display(),
        translation.output.display(),
        translation.instructions.len()
    );
    Ok(())
}
