use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bf_tape::cli_util::{print_init_fault, print_runtime_fault};
use bf_tape::config::Environment;
use bf_tape::interpreter::Interpreter;
use bf_tape::pacing::StepRate;
use bf_tape::tui;

#[derive(Parser, Debug)]
#[command(
    name = "bftape",
    version,
    about = "A bounded-tape Brainfuck machine with a stepping terminal visualizer"
)]
struct Cli {
    /// Program source file (commands `><+-.,[]` only)
    #[arg(short = 's', long = "src-file", value_name = "PATH")]
    src_file: PathBuf,

    /// Environment file describing the memory bank (JSON)
    #[arg(short = 'e', long = "env-file", value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Initial auto-run rate in steps per second (1-32)
    #[arg(long, value_name = "HZ", default_value_t = 1)]
    hertz: u32,

    /// Step to completion without the terminal UI, reading input from stdin
    #[arg(long)]
    headless: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    process::exit(run(cli));
}

fn init_logging(verbose: bool) {
    // Quiet by default so traces never scribble over the alternate screen
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> i32 {
    let environment = match cli.env_file {
        Some(path) => match Environment::load(&path) {
            Ok(environment) => environment,
            Err(err) => {
                eprintln!("bftape: {err}");
                return 1;
            }
        },
        None => Environment::default(),
    };

    let source = match fs::read_to_string(&cli.src_file) {
        // Editors append a trailing newline; the machine itself stays strict
        Ok(raw) => raw.trim_end().to_string(),
        Err(err) => {
            eprintln!("bftape: failed to read source file: {err}");
            return 1;
        }
    };

    let mut machine = match environment.build_interpreter() {
        Ok(machine) => machine,
        Err(err) => {
            eprintln!("bftape: {err}");
            return 1;
        }
    };

    if let Err(err) = machine.set_tape(&source) {
        print_init_fault(Some("bftape"), &source, &err);
        return 1;
    }

    if cli.headless {
        run_headless(machine, &source)
    } else {
        match tui::run(machine, StepRate::new(cli.hertz)) {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("bftape: terminal error: {err}");
                1
            }
        }
    }
}

/// Drive the machine to completion on stdin/stdout: `.` prints through the
/// machine's default sink, `,` prompts for a decimal value per line.
fn run_headless(mut machine: Interpreter, source: &str) -> i32 {
    let stdin = io::stdin();

    loop {
        if machine.can_step() {
            if let Err(err) = machine.step() {
                print_runtime_fault(Some("bftape"), source, &err);
                return 1;
            }
        } else if machine.waiting_for_input() {
            print!("Cell Value: ");
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => {
                    eprintln!("bftape: end of input while the program was waiting for a value");
                    return 1;
                }
                Ok(_) => {}
                Err(err) => {
                    eprintln!("bftape: failed reading input: {err}");
                    return 1;
                }
            }

            let value = match line.trim().parse::<u32>() {
                Ok(value) => value,
                Err(_) => {
                    eprintln!("bftape: input must be a non-negative integer");
                    return 1;
                }
            };

            if let Err(err) = machine.read_byte(value) {
                print_runtime_fault(Some("bftape"), source, &err);
                return 1;
            }
        } else {
            break;
        }
    }

    0
}
