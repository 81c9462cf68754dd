//! A Brainfuck interpreter with an unbounded tape and a step debugger.
//!
//! This crate runs Brainfuck programs on a tape that grows without limit in
//! both directions, with cells that hold arbitrary-precision integers.
//!
//! Features and behaviors:
//! - Every tape position starts at 0; moving never fails.
//! - Cells never overflow unless a wrapping [`CellModel`] is chosen.
//! - Anything outside `+-.,<>[]` is a comment.
//! - Unbalanced brackets are rejected before anything runs.
//! - `.` and `,` go through swappable [`OutputPort`] / [`InputPort`]
//!   implementations (characters or integers in a chosen base).
//! - Execution is governed by a [`ControlDriver`], polled before every batch:
//!   [`Autorun`] runs straight through, [`DebugConsole`] is an interactive
//!   step debugger.
//!
//! Quick start:
//!
//! ```no_run
//! use infinibf::Interpreter;
//!
//! // Prints "65;" (integers, base 10, are the library default)
//! let code = "+++++++++++++[>+++++<-]>.";
//! let mut bf = Interpreter::new(code).expect("brackets are balanced");
//! bf.run().expect("program should run");
//! ```

pub mod cli_util;
pub mod config;
pub mod console;
pub mod debugger;
pub mod driver;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod ports;
pub mod program;
pub mod tape;
mod theme;

pub use debugger::{CommandSource, DebugConsole, LineCommands};
pub use driver::{Autorun, ControlDriver, Decision, Interpreter};
pub use engine::{Dialect, Engine, LoopEntry};
pub use error::{PortError, RunError};
pub use interrupt::Interrupt;
pub use ports::{InputEncoding, InputPort, OutputEncoding, OutputPort, Streams};
pub use program::{Instruction, Program, ProgramError, UnmatchedBracketKind};
pub use tape::{Cell, CellModel, Tape};
