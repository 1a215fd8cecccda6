//! Mino - class-based teaching language: static checker and interpreter
//!
//! # Usage
//!
//! ```bash
//! # Check and run a program
//! mino run program.mino
//!
//! # Static check only, printing the dispatch tables
//! mino check --dump-vtables program.mino
//!
//! # Read the program from standard input
//! cat program.mino | mino run -
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use compiler::printer::{format_dispatch_tables, format_subtype_tables, reports_to_json};
use compiler::{FrontendError, MinoPipeline, PipelineOptions, Program};
use diagnostics::{Diagnostic, ErrorFormatter, SourceMap};
use log::LevelFilter;
use runtime::{Interpreter, InterpreterError, InterpreterOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "mino")]
#[command(version = "0.1.0")]
#[command(about = "Mino - static checker and tree-walking interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a program and interpret it
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Maximum nesting of method calls
        #[arg(long, default_value_t = runtime::DEFAULT_MAX_CALL_DEPTH)]
        max_call_depth: usize,
    },

    /// Check a program without running it
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Path to the Mino source file, or `-` for standard input
    file: PathBuf,

    /// Do not load the bundled built-in class declarations
    #[arg(long)]
    no_prelude: bool,

    /// Print every class's virtual table after checking
    #[arg(long)]
    dump_vtables: bool,

    /// Print every class's subtype table after checking
    #[arg(long)]
    dump_subtypes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Colored diagnostics
    #[arg(long)]
    color: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

/// Every way a run can fail, one per exit status
#[derive(Debug, thiserror::Error)]
enum MinoError {
    #[error("{path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("{}", .0.message)]
    Syntax(Box<Diagnostic>),
    #[error("{}", .0.message)]
    Semantic(Box<Diagnostic>),
    #[error("{0}")]
    Interpreter(Box<InterpreterFailure>),
}

#[derive(Debug)]
struct InterpreterFailure {
    error: InterpreterError,
    trace: Vec<String>,
    diagnostic: Diagnostic,
}

impl std::fmt::Display for InterpreterFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl MinoError {
    fn exit_code(&self) -> i32 {
        match self {
            MinoError::Io { .. } => 1,
            MinoError::Syntax(_) => 2,
            MinoError::Semantic(_) => 3,
            MinoError::Interpreter(_) => 4,
        }
    }

    fn report(&self, formatter: &ErrorFormatter, source_map: &SourceMap) {
        match self {
            MinoError::Io { .. } => eprintln!("INPUT ERROR: {}.", self),
            MinoError::Syntax(diagnostic) => {
                eprintln!("SYNTAX ERROR: {}.", diagnostic.message);
                eprint!("{}", formatter.format_diagnostic(diagnostic, source_map));
            }
            MinoError::Semantic(diagnostic) => {
                eprintln!("SEMANTIC ERROR: {}.", diagnostic.message);
                eprint!("{}", formatter.format_diagnostic(diagnostic, source_map));
            }
            MinoError::Interpreter(failure) => {
                eprintln!("INTERPRETER ERROR: {}.", failure.error);
                for line in &failure.trace {
                    eprintln!("{}", line);
                }
                eprint!("{}", formatter.format_diagnostic(&failure.diagnostic, source_map));
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let input = match &cli.command {
        Commands::Run { input, .. } | Commands::Check { input, .. } => input,
    };

    if input.verbose {
        compiler::logging::init_with_level(LevelFilter::Debug);
    } else {
        compiler::logging::init_from_env();
    }
    let formatter = if input.color {
        ErrorFormatter::with_colors()
    } else {
        ErrorFormatter::new()
    };

    let mut source_map = SourceMap::new();
    let result = match &cli.command {
        Commands::Run {
            input,
            max_call_depth,
        } => run_file(&mut source_map, input, *max_call_depth),
        Commands::Check { input, format } => check_file(&mut source_map, input, *format),
    };

    if let Err(e) = result {
        e.report(&formatter, &source_map);
        process::exit(e.exit_code());
    }
}

fn read_source(path: &Path) -> Result<(String, String), MinoError> {
    let name = path.display().to_string();
    let io_error = |source| MinoError::Io {
        path: name.clone(),
        source,
    };
    if name == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map_err(io_error)?;
        Ok(("<stdin>".to_string(), source))
    } else {
        let source = std::fs::read_to_string(path).map_err(io_error)?;
        Ok((name, source))
    }
}

/// Parse and check; the prelude is added unless disabled
fn compile(source_map: &mut SourceMap, input: &InputArgs) -> Result<Program, MinoError> {
    let (name, source) = read_source(&input.file)?;
    let options = PipelineOptions {
        use_prelude: !input.no_prelude,
    };
    let mut pipeline = MinoPipeline::with_config(options);
    let program = pipeline
        .compile_source(source_map, &name, &source)
        .map_err(|error| {
            let diagnostic = Box::new(error.to_diagnostic(source_map));
            match error {
                FrontendError::Syntax { .. } => MinoError::Syntax(diagnostic),
                FrontendError::Semantic(_) => MinoError::Semantic(diagnostic),
            }
        })?;

    let stats = pipeline.stats();
    log::info!(
        "checked {} classes and {} methods (parse {:?}, analysis {:?})",
        stats.classes,
        stats.methods,
        stats.parse_time,
        stats.analysis_time
    );

    if input.dump_subtypes {
        print!("{}", format_subtype_tables(&program.registry));
    }
    if input.dump_vtables {
        print!("{}", format_dispatch_tables(&program.registry));
    }
    Ok(program)
}

fn check_file(source_map: &mut SourceMap, input: &InputArgs, format: OutputFormat) -> Result<(), MinoError> {
    let program = compile(source_map, input)?;
    if format == OutputFormat::Json {
        let json = reports_to_json(&program.registry).map_err(|e| MinoError::Io {
            path: "<stdout>".to_string(),
            source: e.into(),
        })?;
        println!("{}", json);
    }
    Ok(())
}

fn run_file(source_map: &mut SourceMap, input: &InputArgs, max_call_depth: usize) -> Result<(), MinoError> {
    let program = compile(source_map, input)?;
    let options = InterpreterOptions {
        max_call_depth,
        ..InterpreterOptions::default()
    };

    let stdout = io::stdout();
    let mut interpreter = Interpreter::with_options(&program, stdout.lock(), options);
    interpreter.run().map_err(|error| {
        let _ = io::stdout().flush();
        let trace = error.render_trace(source_map);
        let diagnostic = error.to_diagnostic(source_map);
        MinoError::Interpreter(Box::new(InterpreterFailure {
            error,
            trace,
            diagnostic,
        }))
    })
}
