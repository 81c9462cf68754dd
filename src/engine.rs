//! The execution engine: one instruction per step over a [`Program`] and a
//! [`Tape`], with I/O going through swappable ports.

use std::sync::Arc;

use num_traits::Zero;

use crate::error::RunError;
use crate::interrupt::Interrupt;
use crate::ports::{InputPort, IntInput, IntOutput, OutputPort, Streams};
use crate::program::{Instruction, Program};
use crate::tape::{CellModel, Tape};

/// What `[` does when the current cell is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopEntry {
    /// `[` always enters the loop; the test happens at `]`.
    #[default]
    Always,
    /// `[` on a zero cell jumps past its matching `]`.
    SkipIfZero,
}

/// Knobs that select a language dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dialect {
    pub cells: CellModel,
    pub loops: LoopEntry,
}

/// Executes a program one step at a time.
///
/// The engine holds:
/// - the validated program and an instruction pointer into it,
/// - the tape,
/// - a step counter,
/// - the loop-start stack (most recent loop on top),
/// - the output and input ports.
///
/// The pointer ranges over `0..=program.len()`; `program.len()` is terminal
/// and stepping there does nothing.
pub struct Engine {
    program: Program,
    tape: Tape,
    pointer: usize,
    counter: u64,
    loop_stack: Vec<usize>,
    output: Box<dyn OutputPort>,
    input: Box<dyn InputPort>,
    loops: LoopEntry,
    interrupt: Option<Arc<Interrupt>>,
}

impl Engine {
    /// An engine that reads and writes base-10 integers on stdin/stdout.
    pub fn new(program: Program) -> Self {
        let streams = Streams::stdio();
        Self::with_ports(
            program,
            Box::new(IntOutput::decimal(streams.output.clone())),
            Box::new(IntInput::decimal(streams.input.clone())),
        )
    }

    pub fn with_ports(program: Program, output: Box<dyn OutputPort>, input: Box<dyn InputPort>) -> Self {
        Self {
            program,
            tape: Tape::new(),
            pointer: 0,
            counter: 0,
            loop_stack: Vec::new(),
            output,
            input,
            loops: LoopEntry::default(),
            interrupt: None,
        }
    }

    /// Switch dialect. This replaces the tape, so call it before running.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.tape = Tape::with_model(dialect.cells);
        self.loops = dialect.loops;
        self
    }

    /// Abort with [`RunError::Interrupted`] once `interrupt` is requested.
    pub fn set_interrupt(&mut self, interrupt: Arc<Interrupt>) {
        self.interrupt = Some(interrupt);
    }

    pub fn interrupt(&self) -> Option<&Arc<Interrupt>> {
        self.interrupt.as_ref()
    }

    /// Replace the output port, returning the previous one.
    pub fn set_output_port(&mut self, port: Box<dyn OutputPort>) -> Box<dyn OutputPort> {
        tracing::debug!(port = %port.change_message(), "output port swapped");
        std::mem::replace(&mut self.output, port)
    }

    /// Replace the input port, returning the previous one.
    pub fn set_input_port(&mut self, port: Box<dyn InputPort>) -> Box<dyn InputPort> {
        tracing::debug!(port = %port.change_message(), "input port swapped");
        std::mem::replace(&mut self.input, port)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn tape_mut(&mut self) -> &mut Tape {
        &mut self.tape
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Start positions of the currently open loops, innermost last.
    pub fn loop_stack(&self) -> &[usize] {
        &self.loop_stack
    }

    pub fn is_terminal(&self) -> bool {
        self.pointer >= self.program.len()
    }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().is_some_and(|i| i.is_requested())
    }

    /// Execute the instruction under the pointer. A no-op once terminal.
    pub fn step(&mut self) -> Result<(), RunError> {
        let Some(instr) = self.program.get(self.pointer) else {
            return Ok(());
        };
        if self.interrupted() {
            return Err(RunError::Interrupted);
        }
        tracing::trace!(ip = self.pointer, step = self.counter, %instr, "step");

        match instr {
            Instruction::Increment => self.tape.increment(),
            Instruction::Decrement => self.tape.decrement(),
            Instruction::Right => self.tape.move_right(),
            Instruction::Left => self.tape.move_left(),
            Instruction::Output => self.output.send(self.tape.get()),
            Instruction::Input => {
                let received = match &self.interrupt {
                    Some(interrupt) => interrupt.blocking(|| self.input.receive()),
                    None => self.input.receive(),
                };
                // A blocked read may return (or fail) because of the interrupt.
                if self.interrupted() {
                    return Err(RunError::Interrupted);
                }
                self.tape.set(received?);
            }
            Instruction::LoopStart => {
                if self.loops == LoopEntry::SkipIfZero && self.tape.get().is_zero() {
                    if let Some(end) = self.program.matching(self.pointer) {
                        self.pointer = end;
                    }
                } else {
                    self.loop_stack.push(self.pointer);
                }
            }
            Instruction::LoopEnd => {
                if self.tape.get().is_zero() {
                    self.loop_stack.pop();
                } else if let Some(&start) = self.loop_stack.last() {
                    // Land on `start`; the advance below moves past the `[`.
                    self.pointer = start;
                }
            }
        }

        self.pointer += 1;
        self.counter += 1;
        Ok(())
    }

    /// Execute up to `n` steps, stopping early at the end of the program.
    /// Returns how many steps actually ran.
    pub fn run_steps(&mut self, n: usize) -> Result<usize, RunError> {
        let mut executed = 0;
        while executed < n && !self.is_terminal() {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Step while the pointer is below `min(target, program.len())`.
    pub fn run_until(&mut self, target: usize) -> Result<(), RunError> {
        let stop = target.min(self.program.len());
        while self.pointer < stop {
            self.step()?;
        }
        Ok(())
    }

    /// Run to the end of the program.
    pub fn run_to_end(&mut self) -> Result<(), RunError> {
        self.run_until(self.program.len())
    }

    /// Back to the first instruction with a fresh tape and no open loops.
    pub fn reset(&mut self) {
        tracing::debug!(ip = self.pointer, steps = self.counter, "engine reset");
        self.pointer = 0;
        self.counter = 0;
        self.loop_stack.clear();
        self.tape.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortError;
    use crate::tape::Cell;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<Cell>>>);

    impl OutputPort for Recorder {
        fn send(&mut self, value: &Cell) {
            self.0.borrow_mut().push(value.clone());
        }

        fn change_message(&self) -> String {
            "recording".to_string()
        }
    }

    struct Scripted(VecDeque<i64>);

    impl InputPort for Scripted {
        fn receive(&mut self) -> Result<Cell, PortError> {
            self.0.pop_front().map(Cell::from).ok_or(PortError::Exhausted)
        }

        fn change_message(&self) -> String {
            "scripted".to_string()
        }
    }

    fn engine(code: &str, inputs: &[i64]) -> (Engine, Rc<RefCell<Vec<Cell>>>) {
        let out = Rc::new(RefCell::new(Vec::new()));
        let engine = Engine::with_ports(
            Program::parse(code).unwrap(),
            Box::new(Recorder(out.clone())),
            Box::new(Scripted(inputs.iter().copied().collect())),
        );
        (engine, out)
    }

    fn cell(engine: &Engine) -> i64 {
        i64::try_from(engine.tape().get()).unwrap()
    }

    #[test]
    fn transfer_loop_moves_value() {
        let (mut bf, _) = engine("[->+<]", &[]);
        bf.tape_mut().set(Cell::from(3));
        bf.run_to_end().unwrap();
        assert_eq!(cell(&bf), 0);
        bf.tape_mut().move_right();
        assert_eq!(cell(&bf), 3);
        assert_eq!(bf.pointer(), 6);
        assert!(bf.loop_stack().is_empty());
    }

    #[test]
    fn echo_numeric_input() {
        let (mut bf, out) = engine(",.", &[65]);
        bf.run_to_end().unwrap();
        assert_eq!(*out.borrow(), vec![Cell::from(65)]);
    }

    #[test]
    fn loop_stack_tracks_nesting_depth() {
        let (mut bf, _) = engine("+[>+[-]<-]", &[]);
        bf.run_steps(2).unwrap();
        assert_eq!(bf.loop_stack(), &[1]);
        bf.run_steps(3).unwrap();
        assert_eq!(bf.loop_stack(), &[1, 4]);
        bf.run_to_end().unwrap();
        assert!(bf.loop_stack().is_empty());
    }

    #[test]
    fn jump_back_does_not_reexecute_loop_start() {
        let (mut bf, _) = engine("++[-]", &[]);
        // After the first ']' the second pass resumes at '-', not at '['.
        bf.run_steps(5).unwrap();
        assert_eq!(bf.pointer(), 3);
        assert_eq!(bf.loop_stack(), &[2]);
        bf.run_to_end().unwrap();
        assert_eq!(bf.counter(), 7);
    }

    #[test]
    fn loop_start_always_enters_by_default() {
        // The body runs once even though the cell starts at zero.
        let (mut bf, _) = engine("[+]", &[]);
        bf.run_steps(2).unwrap();
        assert_eq!(cell(&bf), 1);
    }

    #[test]
    fn skip_if_zero_dialect_skips_loop() {
        let (bf, out) = engine("[.]+.", &[]);
        let mut bf = bf.with_dialect(Dialect { loops: LoopEntry::SkipIfZero, ..Dialect::default() });
        bf.run_to_end().unwrap();
        assert_eq!(*out.borrow(), vec![Cell::from(1)]);
        assert_eq!(bf.counter(), 3);
        assert!(bf.loop_stack().is_empty());
    }

    #[test]
    fn wrapping_dialect_wraps_cells() {
        let (bf, out) = engine("-.", &[]);
        let mut bf = bf.with_dialect(Dialect { cells: CellModel::Wrapping { bits: 8 }, ..Dialect::default() });
        bf.run_to_end().unwrap();
        assert_eq!(*out.borrow(), vec![Cell::from(255)]);
    }

    #[test]
    fn run_steps_counts_only_executed_steps() {
        let (mut bf, _) = engine("+++", &[]);
        assert_eq!(bf.run_steps(2).unwrap(), 2);
        assert_eq!(bf.counter(), 2);
        assert_eq!(bf.run_steps(10).unwrap(), 1);
        assert_eq!(bf.counter(), 3);
        assert_eq!(bf.run_steps(10).unwrap(), 0);
        assert_eq!(bf.counter(), 3);
    }

    #[test]
    fn step_at_end_changes_nothing() {
        let (mut bf, _) = engine("+>", &[]);
        bf.run_to_end().unwrap();
        let (pointer, counter, position) = (bf.pointer(), bf.counter(), bf.tape().position());
        for _ in 0..5 {
            bf.step().unwrap();
        }
        assert_eq!(bf.pointer(), pointer);
        assert_eq!(bf.counter(), counter);
        assert_eq!(bf.tape().position(), position);
    }

    #[test]
    fn run_until_stops_at_target_or_end() {
        let (mut bf, _) = engine("+++++", &[]);
        bf.run_until(3).unwrap();
        assert_eq!(bf.pointer(), 3);
        bf.run_until(1).unwrap();
        assert_eq!(bf.pointer(), 3);
        bf.run_until(100).unwrap();
        assert_eq!(bf.pointer(), 5);
        assert_eq!(cell(&bf), 5);
    }

    #[test]
    fn reset_returns_to_fresh_state() {
        let (mut bf, _) = engine("+[>+<-]>>+", &[]);
        bf.run_steps(7).unwrap();
        bf.reset();
        assert_eq!(bf.pointer(), 0);
        assert_eq!(bf.counter(), 0);
        assert!(bf.loop_stack().is_empty());
        assert!(bf.tape().get().is_zero());
        assert_eq!(bf.tape().position(), 0);
        bf.run_to_end().unwrap();
        assert_eq!(cell(&bf), 1);
    }

    #[test]
    fn exhausted_input_is_reported() {
        let (mut bf, _) = engine(",,", &[1]);
        let err = bf.run_to_end().unwrap_err();
        assert!(matches!(err, RunError::Input(PortError::Exhausted)));
        assert_eq!(err.exit_code(), -2);
        assert_eq!(bf.pointer(), 1);
    }

    #[test]
    fn interrupt_request_aborts_before_next_step() {
        let (mut bf, _) = engine("+[]", &[]);
        let interrupt = Interrupt::new();
        bf.set_interrupt(interrupt.clone());
        bf.run_steps(10).unwrap();
        assert!(!interrupt.request());
        let err = bf.run_steps(1).unwrap_err();
        assert!(matches!(err, RunError::Interrupted));
    }

    #[test]
    fn swapping_ports_between_steps() {
        let (mut bf, first) = engine("+.+.", &[]);
        bf.run_steps(2).unwrap();
        let second = Rc::new(RefCell::new(Vec::new()));
        bf.set_output_port(Box::new(Recorder(second.clone())));
        bf.run_to_end().unwrap();
        assert_eq!(*first.borrow(), vec![Cell::from(1)]);
        assert_eq!(*second.borrow(), vec![Cell::from(2)]);
    }
}
