//! A bounded-tape Brainfuck machine with a stepping terminal visualizer.
//!
//! The heart of the crate is [`Interpreter`]: a strict interpreter over a
//! fixed-size memory bank whose cells are bounded to `0..=max_value`. There
//! is no wrapping anywhere; pointer and cell violations are terminal faults
//! that park the machine in an inspectable `Error` state. Execution is
//! driven one command at a time by an external loop, and the `,` command
//! suspends the machine until that loop delivers a value.
//!
//! Around the core:
//! - [`config`] loads the JSON environment document describing the memory
//!   bank (cell count, per-cell bound, seed values).
//! - [`tui`] is the interactive driver: a terminal UI that paces execution,
//!   follows the pointer across the tape, and prompts for input.
//! - [`pacing`] and [`cli_util`] carry the auto-run rate and the CLI fault
//!   reporting shared by the drivers.
//!
//! Quick start:
//!
//! ```
//! use bf_tape::{Interpreter, ProgramState};
//!
//! let mut bf = Interpreter::new(8, 16).unwrap();
//! bf.set_memory(&[3], 0).unwrap();
//! bf.set_tape("[-]").unwrap();
//! while bf.can_step() {
//!     bf.step().unwrap();
//! }
//! assert_eq!(bf.state(), ProgramState::Halted);
//! assert_eq!(bf.memory()[0], 0);
//! ```

pub mod cli_util;
pub mod config;
pub mod interpreter;
pub mod pacing;
pub mod tui;

pub use config::{ConfigError, Environment};
pub use interpreter::{Command, InitError, Interpreter, ProgramState, RuntimeError};
pub use pacing::StepRate;
