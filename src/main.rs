use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::info;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use tryp::diag::Reporter;
use tryp::lexer::Lexer;
use tryp::parser::{ParseCtx, Parser};
use tryp::printer::AstPrinter;
use tryp::session::Session;
use tryp::token::Location;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tryp language interpreter", long_about = None)]
struct Cli {
    /// Defaults to the REPL when no subcommand is given
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print tokens as JSON instead of one per line
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints its AST
    Parse { filename: PathBuf },

    /// Runs a file as a Tryp program
    Run { filename: PathBuf },

    /// Starts an interactive session
    Repl,
}

fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    std::fs::read_to_string(filename).context(format!("Failed to read file {:?}", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("tryp::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source = read_file(&filename)?;
            let display = filename.display().to_string();

            match Lexer::new(&source, Location::start(&display)).tokenize() {
                Ok(tokens) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&tokens)?);
                    } else {
                        for token in &tokens {
                            println!("{token}");
                        }
                    }
                    info!("Tokenization completed successfully");
                }
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(65);
                }
            }
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source = read_file(&filename)?;
            let display = filename.display().to_string();

            let tokens = match Lexer::new(&source, Location::start(&display)).tokenize() {
                Ok(tokens) => tokens,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(65);
                }
            };

            let mut reporter = Reporter::new();
            let loader = tryp::parser::FsLoader;
            let mut next_id = 0;
            let statements = {
                let mut ctx = ParseCtx::new(&mut reporter, &loader, &mut next_id, &display);
                Parser::new(&mut ctx, tokens).parse()
            };

            print!("{}", AstPrinter::new().print(&statements));
            if reporter.had_error() {
                std::process::exit(65);
            }
            info!("Parse subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");
            let source = read_file(&filename)?;
            let display = filename.display().to_string();

            let mut session = Session::new();
            session.run(&source, &display);

            if session.static_errors() > 0 {
                std::process::exit(65);
            }
            if session.runtime_errors() > 0 {
                std::process::exit(70);
            }
            info!("Program executed successfully");
        }

        Commands::Repl => {
            info!("Starting REPL");
            repl()?;
        }
    }

    Ok(())
}

/// Interactive loop. One session lives for the whole loop, so definitions
/// persist across inputs; the value of an expression input is echoed in its
/// quoted form.
fn repl() -> Result<()> {
    let mut session = Session::new();
    let mut editor = DefaultEditor::new()?;

    println!("tryp {} (exit with Ctrl-D)", env!("CARGO_PKG_VERSION"));
    loop {
        match editor.readline("tryp> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(&line)?;
                if let Some(value) = session.run(&line, "<stdin>") {
                    println!("{}", value.stringify());
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
