//! `dwq` — grep for DWARF debugging information.
//!
//! Exit codes follow grep: 0 if any match was found, 1 if none was, 2 on a
//! fatal error (bad expression, unreadable input when not suppressed, or a
//! runtime fault in the query).

use std::process::ExitCode;

use clap::Parser;
use fallible_iterator::FallibleIterator;

use dwquery_dwarf::{dwarf_vocabulary, Doneness, DwarfContext, DwarfValue};
use dwquery_lang::value::Brevity;
use dwquery_lang::{core_vocabulary, Expr, Stack};

#[derive(Debug, Parser)]
#[command(
    name = "dwq",
    about = "Query DWARF debugging information",
    disable_help_flag = true
)]
struct Cli {
    /// The query to run. When absent, the first positional argument is
    /// taken as the query.
    #[arg(short = 'e', long = "expr", value_name = "EXPR")]
    expr: Option<String>,

    /// Print a count of matches per file instead of the matches.
    #[arg(short = 'c', long = "count")]
    count: bool,

    /// Always prefix output lines with the file name.
    #[arg(short = 'H', long = "with-filename")]
    with_filename: bool,

    /// Never prefix output lines with the file name.
    #[arg(short = 'h', long = "no-filename")]
    no_filename: bool,

    /// Suppress all normal output; exit 0 as soon as any match is found.
    #[arg(short = 'q', long = "quiet", alias = "silent")]
    quiet: bool,

    /// Suppress error messages about unreadable files.
    #[arg(short = 's', long = "no-messages")]
    no_messages: bool,

    /// Print help.
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// The query (unless -e was given), followed by the input files.
    #[arg(value_name = "ARG")]
    args: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut args = cli.args.clone();

    let query = match &cli.expr {
        Some(expr) => expr.clone(),
        None => {
            if args.is_empty() {
                eprintln!("dwq: no query expression given.");
                return ExitCode::from(2);
            }
            args.remove(0)
        }
    };

    if args.is_empty() {
        eprintln!("No input files.");
        return ExitCode::from(2);
    }

    let mut voc = core_vocabulary();
    voc.extend(dwarf_vocabulary());

    let expr = match Expr::parse(&query, &voc) {
        Ok(expr) => expr,
        Err(err) => {
            eprintln!("dwq: {err}");
            return ExitCode::from(2);
        }
    };

    let with_filename = (args.len() > 1 || cli.with_filename) && !cli.no_filename;

    let mut errors = false;
    let mut matched = false;

    for file in &args {
        let ctx = match DwarfContext::open(file) {
            Ok(ctx) => ctx,
            Err(err) => {
                if !cli.no_messages {
                    eprintln!("dwq: {file}: {err}");
                }
                if !cli.quiet {
                    errors = true;
                }
                continue;
            }
        };

        let mut seed = Stack::new();
        seed.push(Box::new(DwarfValue::new(ctx, Doneness::Cooked, 0)));

        let mut results = match expr.query(seed) {
            Ok(results) => results,
            Err(err) => {
                eprintln!("dwq: {err}");
                return ExitCode::from(2);
            }
        };

        let mut count: u64 = 0;
        loop {
            match results.next() {
                Ok(Some(stack)) => {
                    // grep: exit immediately with zero status on any match,
                    // even if an error was detected.
                    if cli.quiet {
                        return ExitCode::SUCCESS;
                    }

                    matched = true;
                    if cli.count {
                        count += 1;
                    } else {
                        if with_filename {
                            print!("{file}:");
                        }
                        if stack.is_empty() {
                            println!();
                        } else {
                            println!("{}", stack.top().display(Brevity::Brief));
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    eprintln!("dwq: {err}");
                    return ExitCode::from(2);
                }
            }
        }

        if cli.count {
            if with_filename {
                print!("{file}:");
            }
            println!("{count}");
        }
    }

    if errors {
        ExitCode::from(2)
    } else if matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
