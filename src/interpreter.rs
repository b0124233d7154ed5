//! The bounded-tape Brainfuck machine.
//!
//! Unlike the classic 30,000-cell wrapping interpreter, this machine is
//! strict everywhere: the memory bank has a fixed cell count, every cell is
//! bounded to `0..=max_value`, and any violation is a terminal fault rather
//! than a wrap. Execution is single-stepped by an external driver; the `,`
//! command suspends the machine in [`ProgramState::WaitingForInput`] until
//! the driver delivers a value with [`Interpreter::read_byte`].
//!
//! Quick start:
//!
//! ```
//! use bf_tape::Interpreter;
//!
//! let mut bf = Interpreter::new(1, 256).unwrap();
//! bf.set_tape("+[-]").unwrap();
//! while bf.can_step() {
//!     bf.step().unwrap();
//! }
//! assert!(bf.halted());
//! ```

use std::fmt;

use tracing::{debug, info, warn};

/// Faults raised while constructing or configuring a machine.
///
/// Besides being returned to the caller, a fault raised by a method on an
/// existing instance parks that instance in [`ProgramState::Error`] with the
/// fault's message recorded as the state detail.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The memory bank needs at least one cell.
    #[error("memory must be at least 1 cell")]
    NoCells,

    /// The per-cell bound needs at least two representable values.
    #[error("maximum cell value must be at least 1")]
    MaxValueTooSmall,

    /// More seed values were supplied than the bank has cells.
    #[error("attempting to initialize {provided} values in memory size {cell_count}")]
    TooManySeedValues { provided: usize, cell_count: usize },

    /// A seed value lies outside `0..=max_value`.
    #[error("illegal initial cell value {value}: must be in range 0..={max_value}")]
    SeedValueOutOfRange { value: u32, max_value: u32 },

    /// The fill value for unseeded cells lies outside `0..=max_value`.
    #[error("illegal default cell value {value}: must be in range 0..={max_value}")]
    DefaultValueOutOfRange { value: u32, max_value: u32 },

    /// A program must contain at least one command.
    #[error("tape must contain at least one command")]
    EmptyTape,

    /// The source contained a character outside the instruction set `><+-.,[]`.
    #[error("unrecognized command '{symbol}' at offset {index}")]
    UnknownSymbol { symbol: char, index: usize },
}

/// Faults raised during execution.
///
/// Every variant is terminal: the machine moves to [`ProgramState::Error`]
/// with the message recorded as the state detail, and stays there.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// `<` attempted to move the pointer below cell 0.
    #[error("memory pointer less than 0 at command {pc}")]
    PointerUnderflow { pc: usize },

    /// `>` attempted to move the pointer past the last cell.
    #[error("memory pointer out of bounds at command {pc}: maximum allowed {max}")]
    PointerOverflow { pc: usize, max: usize },

    /// `+` pushed the current cell past `max_value`.
    #[error("cell overflow at command {pc}: maximum value {max_value}")]
    CellOverflow { pc: usize, max_value: u32 },

    /// `-` attempted to take the current cell below 0.
    #[error("cell underflow at command {pc}: minimum value 0")]
    CellUnderflow { pc: usize },

    /// `[` with no matching `]` before the end of the tape.
    #[error("no close found for loop start at command {pc}")]
    UnmatchedLoopStart { pc: usize },

    /// `]` with no loop currently open.
    #[error("end of loop with no matching start at command {pc}")]
    UnmatchedLoopEnd { pc: usize },

    /// [`Interpreter::step`] called while the machine was not steppable.
    #[error("attempting to step program in state {state}")]
    NotSteppable { state: ProgramState },

    /// [`Interpreter::step`] called before any program was loaded.
    #[error("attempting to step with no program loaded")]
    NoProgram,

    /// [`Interpreter::read_byte`] called while the machine was not suspended.
    #[error("attempting to accept input in state {state}")]
    NotAwaitingInput { state: ProgramState },

    /// The delivered input value lies outside `0..=max_value`.
    #[error("provided byte input {value} must be in range 0..={max_value}")]
    InputOutOfRange { value: u32, max_value: u32 },
}

/// The eight commands of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `+`
    IncrementCell,
    /// `-`
    DecrementCell,
    /// `<`
    PointerLeft,
    /// `>`
    PointerRight,
    /// `[`
    LoopStart,
    /// `]`
    LoopEnd,
    /// `,`
    ReadByte,
    /// `.`
    PrintByte,
}

impl Command {
    /// Map a source character to its command, or `None` for anything else.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Command::IncrementCell),
            '-' => Some(Command::DecrementCell),
            '<' => Some(Command::PointerLeft),
            '>' => Some(Command::PointerRight),
            '[' => Some(Command::LoopStart),
            ']' => Some(Command::LoopEnd),
            ',' => Some(Command::ReadByte),
            '.' => Some(Command::PrintByte),
            _ => None,
        }
    }

    /// The source character for this command.
    pub fn symbol(&self) -> char {
        match self {
            Command::IncrementCell => '+',
            Command::DecrementCell => '-',
            Command::PointerLeft => '<',
            Command::PointerRight => '>',
            Command::LoopStart => '[',
            Command::LoopEnd => ']',
            Command::ReadByte => ',',
            Command::PrintByte => '.',
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Lifecycle states of a machine.
///
/// Transitions are one-directional toward the terminal states; `Halted` and
/// `Error` cannot be exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// Constructed, no step taken yet.
    Ready,
    /// At least one step taken, not halted, not waiting.
    Running,
    /// Suspended on `,` until the driver calls [`Interpreter::read_byte`].
    WaitingForInput,
    /// Ran past the end of the tape. Terminal, successful.
    Halted,
    /// A fault occurred. Terminal; see [`Interpreter::state_detail`].
    Error,
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgramState::Ready => "Ready",
            ProgramState::Running => "Running",
            ProgramState::WaitingForInput => "WaitingForInput",
            ProgramState::Halted => "Halted",
            ProgramState::Error => "Error",
        };
        write!(f, "{name}")
    }
}

/// A bounded-tape Brainfuck machine.
///
/// The machine owns its program, memory bank, and execution state; it is
/// driven one command at a time via [`step`](Interpreter::step) and resumed
/// from input suspension via [`read_byte`](Interpreter::read_byte). All
/// bounds are hard runtime faults, never wraps.
pub struct Interpreter {
    state: ProgramState,
    state_detail: String,

    ptr: usize,
    pc: usize,

    tape: Vec<Command>,
    loop_stack: Vec<usize>,

    max_value: u32,
    memory: Vec<u32>,

    step_count: u64,

    output_sink: Option<Box<dyn FnMut(usize, u32) + Send>>,
}

impl Interpreter {
    /// Create a machine with `cell_count` cells bounded to `0..=max_value`.
    ///
    /// All cells start at 0, the pointer and program counter at 0, and no
    /// program is loaded. Fails when either dimension is below 1.
    pub fn new(cell_count: usize, max_value: u32) -> Result<Self, InitError> {
        if cell_count < 1 {
            return Err(InitError::NoCells);
        }
        if max_value < 1 {
            return Err(InitError::MaxValueTooSmall);
        }

        Ok(Self {
            state: ProgramState::Ready,
            state_detail: String::new(),
            ptr: 0,
            pc: 0,
            tape: Vec::new(),
            loop_stack: Vec::new(),
            max_value,
            memory: vec![0; cell_count],
            step_count: 0,
            output_sink: None,
        })
    }

    /// Seed the memory bank: cells `0..values.len()` take `values`, the rest
    /// take `default`.
    ///
    /// Intended to be called before stepping begins; calling it later
    /// overwrites memory mid-run and is the caller's responsibility.
    pub fn set_memory(&mut self, values: &[u32], default: u32) -> Result<(), InitError> {
        if values.len() > self.memory.len() {
            let err = InitError::TooManySeedValues {
                provided: values.len(),
                cell_count: self.memory.len(),
            };
            return Err(self.init_fault(err));
        }

        if let Some(&value) = values.iter().find(|&&v| v > self.max_value) {
            let err = InitError::SeedValueOutOfRange {
                value,
                max_value: self.max_value,
            };
            return Err(self.init_fault(err));
        }

        if default > self.max_value {
            let err = InitError::DefaultValueOutOfRange {
                value: default,
                max_value: self.max_value,
            };
            return Err(self.init_fault(err));
        }

        debug!("seeding memory with {values:?}, default {default}");

        for (i, cell) in self.memory.iter_mut().enumerate() {
            *cell = values.get(i).copied().unwrap_or(default);
        }

        Ok(())
    }

    /// Parse `source` and replace the program.
    ///
    /// Every character must be one of the eight command symbols; pointer and
    /// execution state are left untouched.
    pub fn set_tape(&mut self, source: &str) -> Result<(), InitError> {
        if source.is_empty() {
            return Err(self.init_fault(InitError::EmptyTape));
        }

        let mut tape = Vec::with_capacity(source.len());
        for (index, symbol) in source.chars().enumerate() {
            match Command::from_symbol(symbol) {
                Some(cmd) => tape.push(cmd),
                None => {
                    let err = InitError::UnknownSymbol { symbol, index };
                    return Err(self.init_fault(err));
                }
            }
        }

        info!("loaded program with {} commands", tape.len());
        self.tape = tape;
        Ok(())
    }

    /// Provide an observer for `.` commands, receiving `(pointer, value)`.
    /// Without a sink, `.` prints `Cell[<ptr>]: <value>` to stdout.
    pub fn set_output_sink<F>(&mut self, sink: F)
    where
        F: FnMut(usize, u32) + Send + 'static,
    {
        self.output_sink = Some(Box::new(sink));
    }

    /// True once the machine is in a terminal state (`Halted` or `Error`).
    pub fn halted(&self) -> bool {
        matches!(self.state, ProgramState::Halted | ProgramState::Error)
    }

    /// True while the machine is suspended on a `,` command.
    pub fn waiting_for_input(&self) -> bool {
        self.state == ProgramState::WaitingForInput
    }

    /// True while [`step`](Interpreter::step) may be called (`Ready` or
    /// `Running`).
    pub fn can_step(&self) -> bool {
        !(self.halted() || self.waiting_for_input())
    }

    /// Execute exactly one command.
    ///
    /// Faults are terminal: the machine parks in `Error` with the detail
    /// recorded, and the error is returned. A bounds-violating `+` commits
    /// the out-of-range value before faulting; `-` at 0 leaves the cell at
    /// 0, the one spot where an unsigned cell cannot hold the committed
    /// value.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        // Kick off program execution
        if self.state == ProgramState::Ready {
            self.state = ProgramState::Running;
        }

        debug!("{}", self.tape_string());
        debug!("{}", self.memory_string());

        if self.state != ProgramState::Running {
            let err = RuntimeError::NotSteppable { state: self.state };
            return Err(self.runtime_fault(err));
        }

        let Some(&cmd) = self.tape.get(self.pc) else {
            // Only reachable when no program was ever loaded; a loaded tape
            // halts the machine before pc can run off the end.
            return Err(self.runtime_fault(RuntimeError::NoProgram));
        };

        match cmd {
            Command::PointerLeft => {
                if self.ptr == 0 {
                    let err = RuntimeError::PointerUnderflow { pc: self.pc };
                    return Err(self.runtime_fault(err));
                }
                self.ptr -= 1;
                self.pc += 1;
            }

            Command::PointerRight => {
                if self.ptr + 1 >= self.memory.len() {
                    let err = RuntimeError::PointerOverflow {
                        pc: self.pc,
                        max: self.memory.len() - 1,
                    };
                    return Err(self.runtime_fault(err));
                }
                self.ptr += 1;
                self.pc += 1;
            }

            Command::IncrementCell => {
                match self.memory[self.ptr].checked_add(1) {
                    Some(after) => {
                        self.memory[self.ptr] = after;
                        if after > self.max_value {
                            let err = RuntimeError::CellOverflow {
                                pc: self.pc,
                                max_value: self.max_value,
                            };
                            return Err(self.runtime_fault(err));
                        }
                    }
                    // Cell already at the representation limit; nothing to commit.
                    None => {
                        let err = RuntimeError::CellOverflow {
                            pc: self.pc,
                            max_value: self.max_value,
                        };
                        return Err(self.runtime_fault(err));
                    }
                }
                self.pc += 1;
            }

            Command::DecrementCell => {
                if self.memory[self.ptr] == 0 {
                    let err = RuntimeError::CellUnderflow { pc: self.pc };
                    return Err(self.runtime_fault(err));
                }
                self.memory[self.ptr] -= 1;
                self.pc += 1;
            }

            Command::PrintByte => {
                let value = self.memory[self.ptr];
                if let Some(sink) = self.output_sink.as_mut() {
                    sink(self.ptr, value);
                } else {
                    println!("Cell[{}]: {}", self.ptr, value);
                }
                self.pc += 1;
            }

            Command::LoopStart => match self.find_loop_end(self.pc) {
                None => {
                    let err = RuntimeError::UnmatchedLoopStart { pc: self.pc };
                    return Err(self.runtime_fault(err));
                }
                Some(close) => {
                    // A zero cell skips the body without marking a re-entry point.
                    if self.memory[self.ptr] == 0 {
                        self.pc = close + 1;
                    } else {
                        self.loop_stack.push(self.pc);
                        self.pc += 1;
                    }
                }
            },

            Command::LoopEnd => match self.loop_stack.pop() {
                None => {
                    let err = RuntimeError::UnmatchedLoopEnd { pc: self.pc };
                    return Err(self.runtime_fault(err));
                }
                // Return to the loop start so the condition is re-tested.
                Some(open) => self.pc = open,
            },

            Command::ReadByte => {
                self.state = ProgramState::WaitingForInput;
                info!("waiting for input at command {}", self.pc);
                // The suspend still counts as a step; pc advances on delivery.
                self.step_count += 1;
                return Ok(());
            }
        }

        if self.pc >= self.tape.len() {
            self.state = ProgramState::Halted;
            self.state_detail = String::from("End of Tape");
        }

        self.step_count += 1;
        Ok(())
    }

    /// Deliver the value a suspended `,` command is waiting for.
    ///
    /// The machine must be exactly in `WaitingForInput` and `value` must lie
    /// in `0..=max_value`; this is the only way execution resumes from the
    /// suspended state.
    pub fn read_byte(&mut self, value: u32) -> Result<(), RuntimeError> {
        if self.state != ProgramState::WaitingForInput {
            let err = RuntimeError::NotAwaitingInput { state: self.state };
            return Err(self.runtime_fault(err));
        }

        if value > self.max_value {
            let err = RuntimeError::InputOutOfRange {
                value,
                max_value: self.max_value,
            };
            return Err(self.runtime_fault(err));
        }

        self.memory[self.ptr] = value;

        self.state = ProgramState::Running;
        self.pc += 1;

        if self.pc >= self.tape.len() {
            self.state = ProgramState::Halted;
            self.state_detail = String::from("End of Tape");
        }

        Ok(())
    }

    /// Scan forward from the `[` at `pc` for its matching `]`.
    ///
    /// Nesting is tracked with a counter; the first position where it drops
    /// to zero is the match. `None` when the tape ends first. Calling this on
    /// anything but a `[` is a contract violation, not a runtime fault.
    fn find_loop_end(&self, pc: usize) -> Option<usize> {
        debug_assert!(
            matches!(self.tape.get(pc), Some(Command::LoopStart)),
            "find_loop_end called on a non-LoopStart command"
        );

        let mut depth = 1usize;
        let mut scan = pc;
        while depth > 0 {
            scan += 1;
            match self.tape.get(scan) {
                Some(Command::LoopStart) => depth += 1,
                Some(Command::LoopEnd) => depth -= 1,
                Some(_) => {}
                None => return None,
            }
        }
        Some(scan)
    }

    fn runtime_fault(&mut self, err: RuntimeError) -> RuntimeError {
        self.state = ProgramState::Error;
        self.state_detail = err.to_string();
        warn!("runtime fault: {}", self.state_detail);
        err
    }

    fn init_fault(&mut self, err: InitError) -> InitError {
        self.state = ProgramState::Error;
        self.state_detail = err.to_string();
        warn!("initialization fault: {}", self.state_detail);
        err
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProgramState {
        self.state
    }

    /// Human-readable detail recorded on halt or fault, empty otherwise.
    pub fn state_detail(&self) -> &str {
        &self.state_detail
    }

    /// Index of the currently active cell.
    pub fn pointer(&self) -> usize {
        self.ptr
    }

    /// Index of the next command to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Current cell values.
    pub fn memory(&self) -> &[u32] {
        &self.memory
    }

    /// The loaded program.
    pub fn tape(&self) -> &[Command] {
        &self.tape
    }

    /// Steps executed so far, input suspensions included.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Number of cells in the memory bank.
    pub fn cell_count(&self) -> usize {
        self.memory.len()
    }

    /// Inclusive upper bound on cell values.
    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    /// The tape with the current command parenthesized, for trace logs.
    pub fn tape_string(&self) -> String {
        let mut out = String::from("Tape:");
        for (i, cmd) in self.tape.iter().enumerate() {
            if i == self.pc {
                out.push_str(&format!(" ({cmd})"));
            } else {
                out.push_str(&format!(" {cmd}"));
            }
        }
        if self.pc >= self.tape.len() {
            out.push_str(" (HALT)");
        } else {
            out.push_str(" HALT");
        }
        out
    }

    /// The memory bank with the pointed-at cell parenthesized, for trace logs.
    pub fn memory_string(&self) -> String {
        let mut out = String::from("Memory Map:");
        for (i, cell) in self.memory.iter().enumerate() {
            if i == self.ptr {
                out.push_str(&format!(" ({cell})"));
            } else {
                out.push_str(&format!(" {cell}"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn initialization_defaults() {
        let bf = Interpreter::new(5, 256).unwrap();

        assert_eq!(bf.pointer(), 0);
        assert_eq!(bf.pc(), 0);
        assert_eq!(bf.state(), ProgramState::Ready);
        assert_eq!(bf.step_count(), 0);
        assert!(bf.memory().iter().all(|&cell| cell == 0));
    }

    #[test]
    fn zero_cell_count_is_an_init_error() {
        assert!(matches!(Interpreter::new(0, 256), Err(InitError::NoCells)));
    }

    #[test]
    fn zero_max_value_is_an_init_error() {
        assert!(matches!(
            Interpreter::new(1, 0),
            Err(InitError::MaxValueTooSmall)
        ));
    }

    #[test]
    fn set_tape_maps_every_symbol() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+-<>[].,").unwrap();

        let tape = bf.tape();
        assert_eq!(tape.len(), 8);
        assert_eq!(tape[0], Command::IncrementCell);
        assert_eq!(tape[1], Command::DecrementCell);
        assert_eq!(tape[2], Command::PointerLeft);
        assert_eq!(tape[3], Command::PointerRight);
        assert_eq!(tape[4], Command::LoopStart);
        assert_eq!(tape[5], Command::LoopEnd);
        assert_eq!(tape[6], Command::PrintByte);
        assert_eq!(tape[7], Command::ReadByte);
    }

    #[test]
    fn empty_tape_is_an_init_error() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        assert!(matches!(bf.set_tape(""), Err(InitError::EmptyTape)));
        assert_eq!(bf.state(), ProgramState::Error);
        assert!(!bf.state_detail().is_empty());
    }

    #[test]
    fn unknown_symbol_is_an_init_error() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        let result = bf.set_tape("+a+");
        assert!(matches!(
            result,
            Err(InitError::UnknownSymbol { symbol: 'a', index: 1 })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn step_to_halt() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+++").unwrap();

        assert_eq!(bf.state(), ProgramState::Ready);

        bf.step().unwrap();
        assert_eq!(bf.pc(), 1);
        assert_eq!(bf.state(), ProgramState::Running);

        bf.step().unwrap();
        assert_eq!(bf.pc(), 2);

        bf.step().unwrap();
        assert_eq!(bf.pc(), 3);
        assert_eq!(bf.state(), ProgramState::Halted);
        assert_eq!(bf.state_detail(), "End of Tape");
        assert_eq!(bf.memory()[0], 3);
        assert_eq!(bf.step_count(), 3);
    }

    #[test]
    fn stepping_a_halted_machine_faults() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+").unwrap();
        bf.step().unwrap();
        assert_eq!(bf.state(), ProgramState::Halted);

        let result = bf.step();
        assert!(matches!(
            result,
            Err(RuntimeError::NotSteppable { state: ProgramState::Halted })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn stepping_without_a_program_faults() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        assert!(matches!(bf.step(), Err(RuntimeError::NoProgram)));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn pointer_commands_move_both_ways() {
        let mut bf = Interpreter::new(2, 256).unwrap();
        bf.set_tape("><").unwrap();

        assert_eq!(bf.pointer(), 0);
        bf.step().unwrap();
        assert_eq!(bf.pointer(), 1);
        bf.step().unwrap();
        assert_eq!(bf.pointer(), 0);
    }

    #[test]
    fn increment_and_decrement() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+-").unwrap();

        bf.step().unwrap();
        assert_eq!(bf.memory()[0], 1);
        bf.step().unwrap();
        assert_eq!(bf.memory()[0], 0);
    }

    #[test]
    fn simple_loop_pc_sequence() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+[-]").unwrap();

        let mut seen = vec![bf.pc()];
        while bf.can_step() {
            bf.step().unwrap();
            seen.push(bf.pc());
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 1, 4]);
        assert_eq!(bf.state(), ProgramState::Halted);
    }

    #[test]
    fn nested_loop_pc_sequence() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+[[-]]").unwrap();

        let mut seen = vec![bf.pc()];
        while bf.can_step() {
            bf.step().unwrap();
            seen.push(bf.pc());
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 4, 2, 5, 1, 6]);
        assert_eq!(bf.state(), ProgramState::Halted);
    }

    #[test]
    fn empty_loop_on_zero_cell_skips_the_body() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("[]").unwrap();

        bf.step().unwrap();
        assert_eq!(bf.pc(), 2);
        assert_eq!(bf.state(), ProgramState::Halted);
    }

    #[test]
    fn unmatched_loop_start_faults_when_reached() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("[+").unwrap();

        let result = bf.step();
        assert!(matches!(
            result,
            Err(RuntimeError::UnmatchedLoopStart { pc: 0 })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn unmatched_loop_end_faults_when_reached() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("]").unwrap();

        let result = bf.step();
        assert!(matches!(
            result,
            Err(RuntimeError::UnmatchedLoopEnd { pc: 0 })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn pointer_underflow_faults() {
        let mut bf = Interpreter::new(10, 256).unwrap();
        bf.set_tape("<").unwrap();

        let result = bf.step();
        assert!(matches!(
            result,
            Err(RuntimeError::PointerUnderflow { pc: 0 })
        ));
        assert_eq!(bf.pointer(), 0);
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn pointer_overflow_faults() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape(">").unwrap();

        let result = bf.step();
        assert!(matches!(
            result,
            Err(RuntimeError::PointerOverflow { pc: 0, max: 0 })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn cell_underflow_faults_on_a_fresh_cell() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("-").unwrap();

        let result = bf.step();
        assert!(matches!(result, Err(RuntimeError::CellUnderflow { pc: 0 })));
        assert_eq!(bf.memory()[0], 0);
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn cell_overflow_commits_then_faults() {
        let mut bf = Interpreter::new(1, 1).unwrap();
        bf.set_tape("++").unwrap();

        bf.step().unwrap();
        assert_eq!(bf.memory()[0], 1);

        let result = bf.step();
        assert!(matches!(
            result,
            Err(RuntimeError::CellOverflow { pc: 1, max_value: 1 })
        ));
        // The out-of-range value stays stored; the machine is terminal anyway.
        assert_eq!(bf.memory()[0], 2);
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn input_cycle_suspends_and_resumes() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape(",").unwrap();

        bf.step().unwrap();
        assert_eq!(bf.state(), ProgramState::WaitingForInput);
        assert!(bf.waiting_for_input());
        assert!(!bf.can_step());
        assert!(!bf.halted());
        assert_eq!(bf.pc(), 0);
        assert_eq!(bf.step_count(), 1);

        bf.read_byte(5).unwrap();
        assert_eq!(bf.memory()[0], 5);
        assert_eq!(bf.pc(), 1);
        assert_eq!(bf.state(), ProgramState::Halted);
    }

    #[test]
    fn stepping_while_suspended_faults() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape(",").unwrap();
        bf.step().unwrap();

        let result = bf.step();
        assert!(matches!(
            result,
            Err(RuntimeError::NotSteppable {
                state: ProgramState::WaitingForInput
            })
        ));
    }

    #[test]
    fn read_byte_outside_suspension_faults() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+").unwrap();

        let result = bf.read_byte(5);
        assert!(matches!(
            result,
            Err(RuntimeError::NotAwaitingInput {
                state: ProgramState::Ready
            })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn out_of_range_input_faults() {
        let mut bf = Interpreter::new(1, 16).unwrap();
        bf.set_tape(",").unwrap();
        bf.step().unwrap();

        let result = bf.read_byte(17);
        assert!(matches!(
            result,
            Err(RuntimeError::InputOutOfRange { value: 17, max_value: 16 })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn set_memory_seeds_a_prefix_and_fills_the_rest() {
        let mut bf = Interpreter::new(8, 16).unwrap();
        bf.set_memory(&[1, 2, 3, 4], 8).unwrap();
        assert_eq!(bf.memory(), &[1, 2, 3, 4, 8, 8, 8, 8]);
    }

    #[test]
    fn set_memory_rejects_too_many_values() {
        let mut bf = Interpreter::new(2, 16).unwrap();
        let result = bf.set_memory(&[1, 2, 3], 0);
        assert!(matches!(
            result,
            Err(InitError::TooManySeedValues { provided: 3, cell_count: 2 })
        ));
        assert_eq!(bf.state(), ProgramState::Error);
    }

    #[test]
    fn set_memory_rejects_out_of_range_values() {
        let mut bf = Interpreter::new(2, 16).unwrap();
        assert!(matches!(
            bf.set_memory(&[17], 0),
            Err(InitError::SeedValueOutOfRange { value: 17, max_value: 16 })
        ));

        let mut bf = Interpreter::new(2, 16).unwrap();
        assert!(matches!(
            bf.set_memory(&[], 17),
            Err(InitError::DefaultValueOutOfRange { value: 17, max_value: 16 })
        ));
    }

    #[test]
    fn predicates_are_read_only() {
        let bf = {
            let mut bf = Interpreter::new(1, 256).unwrap();
            bf.set_tape("+").unwrap();
            bf
        };

        for _ in 0..3 {
            assert!(bf.can_step());
            assert!(!bf.halted());
            assert!(!bf.waiting_for_input());
        }
        assert_eq!(bf.state(), ProgramState::Ready);
        assert_eq!(bf.step_count(), 0);
    }

    #[test]
    fn print_byte_reaches_the_output_sink() {
        let mut bf = Interpreter::new(1, 256).unwrap();
        bf.set_tape("+.").unwrap();

        let (tx, rx) = mpsc::channel();
        bf.set_output_sink(move |ptr, value| {
            let _ = tx.send((ptr, value));
        });

        bf.step().unwrap();
        bf.step().unwrap();

        assert_eq!(rx.try_recv().unwrap(), (0, 1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn trace_strings_mark_the_active_positions() {
        let mut bf = Interpreter::new(2, 256).unwrap();
        bf.set_tape("+>").unwrap();
        bf.step().unwrap();

        assert_eq!(bf.tape_string(), "Tape: + (>) HALT");
        assert_eq!(bf.memory_string(), "Memory Map: (1) 0");
    }
}
