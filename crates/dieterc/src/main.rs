//! The Dieter analyzer CLI.
//!
//! `dieter [-a] [-s] [-v] <file.dtr>...`
//!
//! For each file: scan and parse, report parse errors, typecheck, report
//! typing errors. Exits non-zero if any file failed to parse or
//! typecheck.
//!
//! - `-a` dumps the AST (as JSON) after parsing.
//! - `-s` dumps the global symbol table after typechecking.
//! - `-v` traces unification and binding decisions.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser)]
#[command(
    name = "dieter",
    version,
    about = "Parser and typechecker for the Dieter programming language"
)]
struct Cli {
    /// Dump the AST after parsing
    #[arg(short = 'a', long = "dump-ast")]
    dump_ast: bool,

    /// Dump the global symbol table after typechecking
    #[arg(short = 's', long = "dump-symtab")]
    dump_symtab: bool,

    /// Trace actions taken internally (e.g. type unification)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Dieter source files to analyze
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let mut failed = false;
    for file in &cli.files {
        match analyze(file, &cli) {
            Ok(clean) => {
                if !clean {
                    failed = true;
                }
            }
            Err(message) => {
                eprintln!("error: {message}");
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}

/// Run the pipeline on one file. `Ok(false)` means diagnostics were
/// reported; `Err` means the file could not be processed at all.
fn analyze(path: &Path, cli: &Cli) -> Result<bool, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;

    let parse = dieter_parser::parse(&source);

    if cli.dump_ast {
        let json = serde_json::to_string_pretty(parse.program())
            .map_err(|e| format!("failed to render AST: {e}"))?;
        println!("{json}");
    }

    if !parse.ok() {
        report_parse_errors(&source, &parse);
        return Ok(false);
    }

    let result = dieter_typeck::check(parse.program());
    for error in &result.errors {
        eprintln!("{}: typing error: {error}", path.display());
    }

    if cli.dump_symtab {
        for (name, ty) in &result.globals {
            println!("{name} : {ty}");
        }
    }

    Ok(result.ok())
}

/// Render parse errors with ariadne source labels.
fn report_parse_errors(source: &str, parse: &dieter_parser::Parse) {
    use ariadne::{Label, Report, ReportKind, Source};
    for error in parse.errors() {
        let start = error.span.start as usize;
        let end = (error.span.end as usize).max(start + 1);
        let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
            .with_message("Parse error")
            .with_label(Label::new(start..end).with_message(&error.message))
            .finish()
            .eprint(Source::from(source));
    }
}
