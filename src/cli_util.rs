//! CLI-side fault reporting with source context.

use std::io::{self, Write};

use crate::interpreter::{InitError, RuntimeError};

/// Print a runtime fault to stderr, with a caret window into the source when
/// the fault carries a command index.
/// If `program` is `Some("bftape")`, messages are prefixed with "bftape: ...".
pub fn print_runtime_fault(program: Option<&str>, source: &str, err: &RuntimeError) {
    let msg = prefix_program(program, &err.to_string());
    match runtime_fault_pc(err) {
        Some(pc) => print_error_with_context(&msg, source, pc),
        None => {
            eprintln!("{msg}");
            let _ = io::stderr().flush();
        }
    }
}

/// Print an initialization fault to stderr; an unrecognized-symbol fault gets
/// a caret window at the offending character.
pub fn print_init_fault(program: Option<&str>, source: &str, err: &InitError) {
    let msg = prefix_program(program, &err.to_string());
    match err {
        InitError::UnknownSymbol { index, .. } => print_error_with_context(&msg, source, *index),
        _ => {
            eprintln!("{msg}");
            let _ = io::stderr().flush();
        }
    }
}

fn prefix_program(program: Option<&str>, msg: &str) -> String {
    match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg.to_string(),
    }
}

fn runtime_fault_pc(err: &RuntimeError) -> Option<usize> {
    match err {
        RuntimeError::PointerUnderflow { pc }
        | RuntimeError::PointerOverflow { pc, .. }
        | RuntimeError::CellOverflow { pc, .. }
        | RuntimeError::CellUnderflow { pc }
        | RuntimeError::UnmatchedLoopStart { pc }
        | RuntimeError::UnmatchedLoopEnd { pc } => Some(*pc),
        _ => None,
    }
}

/// Print a concise error with a caret context window under position `pos`,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(msg: &str, code: &str, pos: usize) {
    eprintln!("{msg}");

    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let start_byte = char_to_byte_index(code, start_char);
    let end_byte = char_to_byte_index(code, end_char);
    let slice = &code[start_byte..end_byte];

    eprintln!("  {slice}");

    // Caret under the exact position
    let caret_offset_chars = pos.saturating_sub(start_char);
    let mut underline = String::new();
    for _ in 0..caret_offset_chars {
        underline.push(' ');
    }
    underline.push('^');
    eprintln!("  {underline}");
    let _ = io::stderr().flush();
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }

    let mut count = 0usize;
    let mut byte_idx = 0usize;

    for ch in s.chars() {
        if count == char_idx {
            break;
        }
        byte_idx += ch.len_utf8();
        count += 1;
    }

    byte_idx
}
