//! `esovm` command line front end.
//!
//! Usage: `esovm [--lang LANG] <file>` or `esovm --lang LANG -e '<source>'`

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use esovm::diagnostic::ansi::AnsiRenderer;
use esovm::diagnostic::{json, registry};
use esovm::source::strip_code_fence;
use esovm::{Diagnostic, Evaluation, Language, Options, evaluate};

#[derive(Parser, Debug)]
#[command(name = "esovm", version)]
#[command(about = "Run Brainfuck, COW, Befunge-93 and Whitespace programs with bounded execution")]
struct Args {
    /// Program file; the language is guessed from its extension unless --lang is given
    #[arg(conflicts_with = "eval")]
    file: Option<PathBuf>,

    /// Inline program source (a surrounding Markdown code fence is removed)
    #[arg(short = 'e', long = "eval", value_name = "SOURCE")]
    eval: Option<String>,

    /// Language of the program
    #[arg(short, long, value_enum)]
    lang: Option<Language>,

    /// Text fed to the program's read instructions
    #[arg(long, default_value = "")]
    input: String,

    /// Seed for Befunge's random direction
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many fetch cycles
    #[arg(long)]
    max_steps: Option<u64>,

    /// Wall-clock limit in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Disable ANSI colour in diagnostics
    #[arg(long)]
    no_color: bool,

    /// Print the long explanation of an error code and exit
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,

    /// List every error code and exit
    #[arg(long)]
    list_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,esovm=info"));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn main() {
    init_logging();
    let args = Args::parse();

    if args.list_errors {
        for entry in registry::REGISTRY {
            println!("{:<10} {}", entry.code, entry.short);
        }
        return;
    }

    if let Some(code) = &args.explain {
        match registry::lookup(code) {
            Some(entry) => print!("{}", entry.long),
            None => {
                eprintln!("Unknown error code: {code}");
                eprintln!("Run `esovm --list-errors` to see every code.");
                process::exit(1);
            }
        }
        return;
    }

    let (source, filename, guessed) = match (&args.eval, &args.file) {
        (Some(inline), _) => (strip_code_fence(inline).to_string(), None, None),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(text) => (text, Some(path.display().to_string()), language_of(path)),
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                process::exit(2);
            }
        },
        (None, None) => {
            eprintln!("Usage: esovm [--lang LANG] <file> | esovm --lang LANG -e <source>");
            process::exit(2);
        }
    };

    let Some(language) = args.lang.or(guessed) else {
        eprintln!("Cannot tell which language this is; pass --lang (brainfuck, cow, befunge, whitespace)");
        process::exit(2);
    };

    let mut options = Options::new().input(args.input.as_bytes());
    if let Some(name) = filename {
        options = options.filename(name);
    }
    if let Some(seed) = args.seed {
        options = options.seed(seed);
    }
    if let Some(steps) = args.max_steps {
        options = options.max_steps(steps);
    }
    if let Some(ms) = args.timeout_ms {
        options = options.timeout(Duration::from_millis(ms));
    }

    debug!(%language, len = source.len(), "running program");
    let result = evaluate(language, &source, &options);
    match args.format {
        Format::Text => report_text(result, !args.no_color && std::io::stderr().is_terminal()),
        Format::Json => report_json(result),
    }
}

fn language_of(path: &Path) -> Option<Language> {
    path.extension().and_then(|e| e.to_str()).and_then(Language::from_extension)
}

fn report_text(result: Result<Evaluation, Diagnostic>, use_color: bool) {
    match result {
        Ok(run) => print!("{}", run.output),
        Err(d) => {
            eprint!("{}", AnsiRenderer { use_color }.render(&d));
            process::exit(1);
        }
    }
}

fn report_json(result: Result<Evaluation, Diagnostic>) {
    match result {
        Ok(run) => {
            let value = serde_json::json!({ "ok": true, "result": run });
            println!("{value}");
        }
        Err(d) => {
            let value = serde_json::json!({ "ok": false, "error": json::to_value(&d) });
            println!("{value}");
            process::exit(1);
        }
    }
}
