use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;

use infinibf::cli_util::{init_logging, print_run_error};
use infinibf::config;
use infinibf::console::EditorCommands;
use infinibf::ports::{SharedReader, SharedWriter};
use infinibf::{
    CellModel, CommandSource, DebugConsole, Dialect, Engine, InputEncoding, Interpreter, Interrupt, LineCommands, LoopEntry,
    OutputEncoding, Program, RunError, Streams,
};

/// Run a Brainfuck program on an unbounded tape of arbitrary-precision cells.
#[derive(Parser, Debug)]
#[command(name = "bf", version)]
struct Cli {
    /// File containing the program (read from stdin when neither this nor --program is given)
    #[arg(value_name = "PROGRAM_FILE", conflicts_with = "program")]
    file: Option<PathBuf>,

    /// Program text given directly on the command line
    #[arg(short = 'p', long = "program", value_name = "CODE", allow_hyphen_values = true)]
    program: Option<String>,

    /// Check the program and print it without comments instead of running it
    #[arg(short = 'X', long = "no-execute")]
    no_execute: bool,

    /// Read program input from FILE instead of stdin
    #[arg(short = 'i', long = "in", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Write program output to FILE instead of stdout
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Read input as integers of BASE (2-36), one per line
    #[arg(short = 'r', long = "read-int", value_name = "BASE", num_args = 0..=1, default_missing_value = "10")]
    read_int: Option<u32>,

    /// Write output as integers of BASE (2-36 or 64), each followed by ';'
    #[arg(short = 'w', long = "write-int", value_name = "BASE", num_args = 0..=1, default_missing_value = "10")]
    write_int: Option<u32>,

    /// Run under the interactive step debugger
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Read debugger commands from FILE
    #[arg(long = "dbgin", value_name = "FILE", requires = "debug")]
    dbgin: Option<PathBuf>,

    /// Write debugger responses to FILE
    #[arg(long = "dbgout", value_name = "FILE", requires = "debug")]
    dbgout: Option<PathBuf>,

    /// Use cells of BITS bits that wrap around instead of unbounded integers
    #[arg(long = "wrap", value_name = "BITS", value_parser = clap::value_parser!(u32).range(1..=4096))]
    wrap: Option<u32>,

    /// Skip a loop entirely when its '[' sees a zero cell
    #[arg(long = "skip-zero-loops")]
    skip_zero_loops: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let code = run(cli);

    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    std::process::exit(code);
}

fn run(cli: Cli) -> i32 {
    // One buffer over stdin for everything that reads it
    let stdin: SharedReader = Rc::new(RefCell::new(BufReader::new(io::stdin())));
    let prompts = io::stderr().is_terminal();

    let interrupt = Interrupt::new();
    let handle = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        // Nobody is going to poll the request, so leave now
        if handle.request() {
            let _ = io::stdout().flush();
            eprintln!("\nERROR: Caught interrupt. Exiting...");
            std::process::exit(RunError::Interrupted.exit_code());
        }
    }) {
        tracing::warn!(error = %e, "failed to set ctrl+c handler");
    }

    let source = if let Some(code) = &cli.program {
        code.clone()
    } else if let Some(path) = &cli.file {
        match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("bf: failed to read program file {}: {e}", path.display());
                return 1;
            }
        }
    } else {
        if prompts {
            eprint!("prog> ");
            let _ = io::stderr().flush();
        }
        interrupt.blocking(|| read_submission(&mut *stdin.borrow_mut())).unwrap_or_default()
    };

    let program = match Program::parse(&source) {
        Ok(program) => program,
        Err(e) => {
            let err = RunError::from(e);
            print_run_error(&source, &err);
            return err.exit_code();
        }
    };
    tracing::debug!(instructions = program.len(), "program validated");

    if cli.no_execute {
        println!("{program}");
        return 0;
    }

    let settings = config::settings();

    let streams = match open_streams(&cli, stdin.clone(), prompts) {
        Ok(streams) => streams,
        Err(e) => {
            eprintln!("bf: {e}");
            return 1;
        }
    };

    let read_base = cli.read_int.or(settings.io.read_base);
    let write_base = cli.write_int.or(settings.io.write_base);
    let input_encoding = read_base.map_or(InputEncoding::Char, |base| InputEncoding::Int { base });
    let output_encoding = write_base.map_or(OutputEncoding::Char, |base| OutputEncoding::Int { base });

    let ports = streams
        .input_port(input_encoding)
        .and_then(|input| Ok((input, streams.output_port(output_encoding)?)));
    let (input, output) = match ports {
        Ok(ports) => ports,
        Err(e) => {
            eprintln!("bf: {e}");
            return 2;
        }
    };

    let dialect = Dialect {
        cells: cli.wrap.map_or(CellModel::Unbounded, |bits| CellModel::Wrapping { bits }),
        loops: if cli.skip_zero_loops { LoopEntry::SkipIfZero } else { LoopEntry::Always },
    };
    let mut engine = Engine::with_ports(program, output, input).with_dialect(dialect);
    engine.set_interrupt(interrupt);

    let mut interpreter = Interpreter::from_engine(engine);
    if cli.debug {
        match debug_console(&cli, stdin, streams, settings) {
            Ok(console) => interpreter.set_driver(Box::new(console)),
            Err(e) => {
                eprintln!("bf: {e}");
                return 1;
            }
        }
    }

    match interpreter.run() {
        Ok(()) => 0,
        Err(err) => {
            let _ = io::stdout().flush();
            print_run_error(&source, &err);
            err.exit_code()
        }
    }
}

fn open_streams(cli: &Cli, stdin: SharedReader, prompts: bool) -> io::Result<Streams> {
    let input: SharedReader = match &cli.input {
        Some(path) => Rc::new(RefCell::new(BufReader::new(open(path)?))),
        None => stdin,
    };
    let output: SharedWriter = match &cli.output {
        Some(path) => Rc::new(RefCell::new(BufWriter::new(create(path)?))),
        None => Rc::new(RefCell::new(io::stdout())),
    };

    let streams = Streams::new(input, output);
    // Hints only make sense for someone typing at the terminal
    Ok(if cli.input.is_none() && prompts {
        streams.with_prompt(Rc::new(RefCell::new(io::stderr())))
    } else {
        streams
    })
}

fn debug_console(
    cli: &Cli,
    stdin: SharedReader,
    streams: Streams,
    settings: &config::Settings,
) -> io::Result<DebugConsole> {
    let commands: Box<dyn CommandSource> = match &cli.dbgin {
        Some(path) => {
            let file: SharedReader = Rc::new(RefCell::new(BufReader::new(open(path)?)));
            Box::new(LineCommands::new(file))
        }
        None if io::stdin().is_terminal() => Box::new(EditorCommands::new()?),
        None => Box::new(LineCommands::new(stdin)),
    };

    let (out, styled): (SharedWriter, bool) = match &cli.dbgout {
        Some(path) => (Rc::new(RefCell::new(BufWriter::new(create(path)?))), false),
        None => (Rc::new(RefCell::new(io::stdout())), io::stdout().is_terminal()),
    };

    Ok(DebugConsole::new(commands, out, streams)
        .with_settings(settings.debugger.clone())
        .with_styling(styled))
}

fn open(path: &Path) -> io::Result<File> {
    File::open(path).map_err(|e| io::Error::new(e.kind(), format!("cannot open {}: {e}", path.display())))
}

fn create(path: &Path) -> io::Result<File> {
    File::create(path).map_err(|e| io::Error::new(e.kind(), format!("cannot create {}: {e}", path.display())))
}

/// Collect all lines until EOF.
fn read_submission(stdin: &mut dyn BufRead) -> Option<String> {
    let mut buffer = String::new();

    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => buffer.push_str(&line),
            Err(e) => {
                tracing::warn!(error = %e, "failed reading program from stdin");
                return None;
            }
        }
    }

    if buffer.is_empty() { None } else { Some(buffer) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_submission_reads_until_eof_multiple_lines() {
        let input = b"+++\n>+.\n";
        let mut cursor = Cursor::new(&input[..]);
        let got = read_submission(&mut cursor);
        assert_eq!(got.as_deref(), Some("+++\n>+.\n"));
    }

    #[test]
    fn read_submission_empty_returns_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let got = read_submission(&mut cursor);
        assert!(got.is_none());
    }

    #[test]
    fn int_flags_default_to_base_ten() {
        let cli = Cli::parse_from(["bf", "-p", ",.", "-r", "-w", "16"]);
        assert_eq!(cli.read_int, Some(10));
        assert_eq!(cli.write_int, Some(16));
    }

    #[test]
    fn program_file_and_inline_program_conflict() {
        assert!(Cli::try_parse_from(["bf", "prog.bf", "-p", "+"]).is_err());
    }
}
