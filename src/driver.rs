//! The control protocol: a driver decides what the engine does next, and the
//! run loop carries it out.

use crate::engine::Engine;
use crate::error::RunError;
use crate::program::Program;

/// What to do with the engine before asking the driver again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Execute up to `n` steps.
    Step(usize),
    /// Execute until the pointer reaches `min(position, program length)`.
    RunUntil(usize),
    /// Reset the engine, then ask again.
    Reset,
    /// Leave the run loop.
    Halt,
}

/// Decides, batch by batch, how execution proceeds.
///
/// Drivers get mutable access to the engine so they can inspect its state
/// and swap ports between batches.
pub trait ControlDriver {
    fn decide(&mut self, engine: &mut Engine) -> Result<Decision, RunError>;
}

/// Runs the program straight through: one step at a time until the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autorun;

impl ControlDriver for Autorun {
    fn decide(&mut self, engine: &mut Engine) -> Result<Decision, RunError> {
        Ok(if engine.is_terminal() { Decision::Halt } else { Decision::Step(1) })
    }
}

/// An engine together with the driver that controls it.
pub struct Interpreter {
    engine: Engine,
    driver: Box<dyn ControlDriver>,
}

impl Interpreter {
    /// Sanitize and validate `source`, then build an engine with default
    /// ports and the [`Autorun`] driver.
    pub fn new(source: &str) -> Result<Self, RunError> {
        let program = Program::parse(source)?;
        Ok(Self::from_engine(Engine::new(program)))
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self { engine, driver: Box::new(Autorun) }
    }

    pub fn with_driver(mut self, driver: Box<dyn ControlDriver>) -> Self {
        self.driver = driver;
        self
    }

    pub fn set_driver(&mut self, driver: Box<dyn ControlDriver>) {
        self.driver = driver;
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Poll the driver and execute its decisions until it says
    /// [`Decision::Halt`] or something goes wrong.
    pub fn run(&mut self) -> Result<(), RunError> {
        loop {
            let decision = self.driver.decide(&mut self.engine)?;
            tracing::debug!(?decision, ip = self.engine.pointer(), "driver decision");
            match decision {
                Decision::Step(n) => {
                    self.engine.run_steps(n)?;
                }
                Decision::RunUntil(position) => self.engine.run_until(position)?,
                Decision::Reset => self.engine.reset(),
                Decision::Halt => {
                    tracing::debug!(steps = self.engine.counter(), "halted");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortError;
    use crate::ports::{InputPort, OutputPort};
    use crate::tape::Cell;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct Collect(Rc<RefCell<Vec<Cell>>>);

    impl OutputPort for Collect {
        fn send(&mut self, value: &Cell) {
            self.0.borrow_mut().push(value.clone());
        }

        fn change_message(&self) -> String {
            String::new()
        }
    }

    struct NoInput;

    impl InputPort for NoInput {
        fn receive(&mut self) -> Result<Cell, PortError> {
            Err(PortError::Exhausted)
        }

        fn change_message(&self) -> String {
            String::new()
        }
    }

    /// Replays a fixed list of decisions, recording the pointer each time.
    struct Script {
        decisions: VecDeque<Decision>,
        seen: Rc<RefCell<Vec<(usize, u64)>>>,
    }

    impl ControlDriver for Script {
        fn decide(&mut self, engine: &mut Engine) -> Result<Decision, RunError> {
            self.seen.borrow_mut().push((engine.pointer(), engine.counter()));
            Ok(self.decisions.pop_front().unwrap_or(Decision::Halt))
        }
    }

    fn interpreter(code: &str) -> (Interpreter, Rc<RefCell<Vec<Cell>>>) {
        let out = Rc::new(RefCell::new(Vec::new()));
        let engine = Engine::with_ports(
            Program::parse(code).unwrap(),
            Box::new(Collect(out.clone())),
            Box::new(NoInput),
        );
        (Interpreter::from_engine(engine), out)
    }

    #[test]
    fn autorun_runs_to_completion() {
        let (mut bf, out) = interpreter("++[->+++<]>.");
        bf.run().unwrap();
        assert_eq!(*out.borrow(), vec![Cell::from(6)]);
        assert!(bf.engine().is_terminal());
    }

    #[test]
    fn autorun_halts_immediately_on_empty_program() {
        let (mut bf, out) = interpreter("no instructions");
        bf.run().unwrap();
        assert!(out.borrow().is_empty());
        assert_eq!(bf.engine().counter(), 0);
    }

    #[test]
    fn scripted_decisions_are_followed() {
        let (bf, out) = interpreter("+.+.+.");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let script = Script {
            decisions: VecDeque::from([
                Decision::Step(2),
                Decision::RunUntil(4),
                Decision::Reset,
                Decision::Step(0),
                Decision::RunUntil(usize::MAX),
            ]),
            seen: seen.clone(),
        };
        let mut bf = bf.with_driver(Box::new(script));
        bf.run().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![(0, 0), (2, 2), (4, 4), (0, 0), (0, 0), (6, 6)]
        );
        assert_eq!(
            *out.borrow(),
            vec![Cell::from(1), Cell::from(2), Cell::from(1), Cell::from(2), Cell::from(3)]
        );
    }

    #[test]
    fn driver_errors_end_the_run() {
        struct Broken;
        impl ControlDriver for Broken {
            fn decide(&mut self, _: &mut Engine) -> Result<Decision, RunError> {
                Err(RunError::Interrupted)
            }
        }
        let (bf, _) = interpreter("+");
        let mut bf = bf.with_driver(Box::new(Broken));
        assert!(matches!(bf.run(), Err(RunError::Interrupted)));
    }

    #[test]
    fn input_exhaustion_propagates_out_of_run() {
        let (mut bf, _) = interpreter("+,");
        let err = bf.run().unwrap_err();
        assert_eq!(err.exit_code(), -2);
    }

    #[test]
    fn unbalanced_source_never_builds() {
        let err = Interpreter::new("[[]").err().unwrap();
        assert_eq!(err.exit_code(), -1);
    }
}
