// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Run an Intcode program, using queued inputs from the command line, then prompting on stdin
//! for more whenever the program needs it

use intcode_vm::prelude::*;
use itertools::Itertools;
use std::error::Error;
use std::fmt::{self, Display};
use std::fs::{File, read_to_string};
use std::io::{self, BufRead, Read, Write, stderr, stdin};
use std::num::ParseIntError;
use std::path::PathBuf;

use clap::Parser;

const VERSION: &str = concat!(env!("CARGO_CRATE_NAME"), '-', env!("CARGO_PKG_VERSION"));

const PROGRAM_HELP: &str =
    "File containing comma-separated intcode\nuses stdin if set to '-', in which case --batch is implied";

/// The first line of a long help message
fn short_help(long_help: &'static str) -> &'static str {
    long_help.split_once('\n').map_or(long_help, |(short, _)| short)
}

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = VERSION)]
#[command(about = "Intcode Runner", long_about = None)]
struct Args {
    #[arg(help = short_help(PROGRAM_HELP))]
    #[arg(long_help = PROGRAM_HELP)]
    program: PathBuf,
    #[arg(short, long = "input", value_name = "N", allow_negative_numbers = true)]
    #[arg(help = "Value to queue for the program's input (repeatable)")]
    inputs: Vec<i64>,
    #[arg(long, help = "Fail instead of prompting when the queued inputs run out")]
    batch: bool,
    #[arg(short, long, help = "Print a trace of executed instructions to stderr")]
    trace: bool,
    #[arg(long, value_name = "PATH", help = "Log each executed instruction to a file")]
    log_file: Option<PathBuf>,
    #[arg(long, help = "Print the final memory after the program halts")]
    dump: bool,
}

#[derive(Debug)]
enum RunError {
    IoError(io::Error),
    BadInteger(String, ParseIntError),
    InputClosed,
    InterpreterError(InterpreterError),
}

impl Error for RunError {}
impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::IoError(e) => write!(f, "an I/O error occured: {e}"),
            RunError::BadInteger(s, e) => write!(f, "{s:?} is not a valid integer: {e}"),
            RunError::InputClosed => write!(f, "input closed while the program was awaiting input"),
            RunError::InterpreterError(e) => Display::fmt(e, f),
        }
    }
}

impl From<InterpreterError> for RunError {
    fn from(e: InterpreterError) -> Self {
        Self::InterpreterError(e)
    }
}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        Self::IoError(e)
    }
}

/// Parse comma-separated decimal integers, tolerating surrounding whitespace and a single
/// trailing comma. Empty fields between commas are rejected.
fn parse_program(source: &str) -> Result<Vec<i64>, RunError> {
    let source = source.trim();
    let source = source.strip_suffix(',').unwrap_or(source);
    if source.is_empty() {
        return Ok(Vec::new());
    }
    source
        .split(',')
        .map(str::trim)
        .map(|s| s.parse::<i64>().map_err(|e| RunError::BadInteger(s.to_owned(), e)))
        .collect()
}

/// Prompt for and read a single integer from stdin, retrying on unparsable lines
fn prompt_for_input() -> Result<i64, RunError> {
    let mut stdin = stdin().lock();
    loop {
        eprint!("Enter a value to store: ");
        stderr().flush()?;
        let mut buf = String::new();
        if stdin.read_line(&mut buf)? == 0 {
            return Err(RunError::InputClosed);
        }
        match buf.trim().parse::<i64>() {
            Ok(i) => return Ok(i),
            Err(e) => eprintln!("{}", RunError::BadInteger(buf.trim().to_owned(), e)),
        }
    }
}

fn print_outputs(outputs: Vec<i64>) {
    for output in outputs {
        println!("{output}");
    }
}

fn run(interp: &mut Interpreter, inputs: Vec<i64>, interactive: bool) -> Result<(), RunError> {
    let (output, mut state) = interp.run_through_inputs(inputs)?;
    print_outputs(output);
    while state == State::Awaiting {
        if !interactive {
            return Err(InterpreterError::InputExhausted.into());
        }
        let (output, new_state) = interp.run_through_inputs([prompt_for_input()?])?;
        print_outputs(output);
        state = new_state;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let from_stdin = args.program.as_os_str() == "-";
    let source = if from_stdin {
        let mut s = String::new();
        stdin().read_to_string(&mut s)?;
        s
    } else {
        read_to_string(&args.program)
            .map_err(|e| format!("failed to read {}: {e}", args.program.display()))?
    };

    let mut interp = Interpreter::new(parse_program(&source)?);
    if let Some(path) = args.log_file.as_deref() {
        let f = File::create(path)
            .map_err(|e| format!("failed to create {}: {e}", path.display()))?;
        interp.log_with(io::BufWriter::new(f));
    }
    if args.trace {
        interp.start_trace();
    }

    let result = run(&mut interp, args.inputs, !(args.batch || from_stdin));

    if let Some(trace) = interp.end_trace() {
        eprint!("{trace}");
    }
    result?;

    if args.dump {
        println!("{}", interp.memory().iter().format(","));
    }
    Ok(())
}
