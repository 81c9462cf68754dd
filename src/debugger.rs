//! The interactive step debugger.
//!
//! [`DebugConsole`] is a [`ControlDriver`] that shows the machine state,
//! reads one command per line and turns it into a [`Decision`]. Commands are
//! single letters, optionally followed by an argument:
//!
//! ```text
//! s 10     step ten times
//! p 42     run until the program pointer reaches 42
//! p $      run to the end of the program
//! I 16     print output as base-16 integers
//! r        reset execution
//! q        quit
//! ```

use nu_ansi_term::Style;

use crate::config::DebugSettings;
use crate::driver::{Autorun, ControlDriver, Decision};
use crate::engine::Engine;
use crate::error::{PortError, RunError};
use crate::ports::{InputEncoding, OutputEncoding, SharedReader, SharedWriter, Streams};
use crate::tape::Cell;
use crate::theme::catppuccin::Mocha as P;

pub const HELP_MESSAGE: &str = "Debugger help:
    h, ?:    show this help
    i <n>:   expect input as ints of base n (default: 10)
                 allowed range: 2-36
                 if n < 2 then n will be set to 2
                 if n > 36 then n will be set to 36
    c:       expect input as chars
    I <n>:   print in ints of base n (default: 10)
                 allowed range: 2-36,64
                 if n < 2 then n will be set to 2
                 if n > 36 then n will be set to 64
    C:       print in chars
    s <n>:   step n times (default: 1)
    p <n>:   step until program pointer is at position n
    p $:     step until the end of the program (without exiting the debugger)
    t:       toggle show state
    > <n>:   set until how far the band is shown to the right (default: 25)
    < <n>:   set until how far the band is shown to the left (default: 25)
    ) <n>:   set until how far the program is shown to the right (default: 25)
    ( <n>:   set until how far the program is shown to the left (default: 25)
    r:       reset execution
    e:       exit debugger
    q:       exit
";

const DEFAULT_WINDOW: usize = 25;

/// Where debugger commands come from.
pub trait CommandSource {
    /// The next command line, or `None` once the source is exhausted.
    fn next_command(&mut self) -> Result<Option<String>, RunError>;
}

/// Reads commands line by line from a shared reader.
pub struct LineCommands {
    source: SharedReader,
    prompt: Option<SharedWriter>,
}

impl LineCommands {
    pub fn new(source: SharedReader) -> Self {
        Self { source, prompt: None }
    }

    /// Print `debug> ` to `prompt` before each read.
    pub fn with_prompt(mut self, prompt: SharedWriter) -> Self {
        self.prompt = Some(prompt);
        self
    }
}

impl CommandSource for LineCommands {
    fn next_command(&mut self) -> Result<Option<String>, RunError> {
        if let Some(prompt) = &self.prompt {
            let mut prompt = prompt.borrow_mut();
            let _ = write!(prompt, "debug> ");
            let _ = prompt.flush();
        }
        let mut line = String::new();
        let read = self.source.borrow_mut().read_line(&mut line).map_err(PortError::from)?;
        Ok(if read == 0 { None } else { Some(line) })
    }
}

/// A parsed debugger command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    InputInt(u32),
    InputChar,
    OutputInt(u32),
    OutputChar,
    Step(usize),
    RunUntil(usize),
    RunToEnd,
    BadPosition,
    ToggleState,
    BandRight(usize),
    BandLeft(usize),
    ProgRight(usize),
    ProgLeft(usize),
    Reset,
    Detach,
    Quit,
    Unknown,
}

impl Command {
    /// Parse one line. The first character selects the command; the rest
    /// is its argument.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(ch) = line.chars().next() else {
            return Command::Step(1);
        };
        let arg = line[ch.len_utf8()..].trim();
        let int_arg = || arg.parse::<i64>().ok();
        let window = || arg.parse::<usize>().unwrap_or(DEFAULT_WINDOW);

        match ch {
            '?' | 'h' => Command::Help,
            'i' => {
                let base = int_arg().unwrap_or(10).clamp(2, 36);
                Command::InputInt(base as u32)
            }
            'c' => Command::InputChar,
            'I' => {
                let base = int_arg().unwrap_or(10).max(2);
                Command::OutputInt(if base > 36 { 64 } else { base as u32 })
            }
            'C' => Command::OutputChar,
            's' => Command::Step(int_arg().map_or(1, |n| usize::try_from(n).unwrap_or(0))),
            'p' => {
                if arg.starts_with('$') {
                    Command::RunToEnd
                } else {
                    match int_arg() {
                        Some(n) => Command::RunUntil(usize::try_from(n).unwrap_or(0)),
                        None => Command::BadPosition,
                    }
                }
            }
            't' => Command::ToggleState,
            '>' => Command::BandRight(window()),
            '<' => Command::BandLeft(window()),
            ')' => Command::ProgRight(window()),
            '(' => Command::ProgLeft(window()),
            'r' => Command::Reset,
            'e' => Command::Detach,
            'q' => Command::Quit,
            _ => Command::Unknown,
        }
    }
}

/// Interactive debugger driver.
pub struct DebugConsole {
    commands: Box<dyn CommandSource>,
    out: SharedWriter,
    streams: Streams,
    settings: DebugSettings,
    styled: bool,
    detached: bool,
}

impl DebugConsole {
    /// `streams` is used to build ports when the encoding changes; `out`
    /// receives state dumps and command responses.
    pub fn new(commands: Box<dyn CommandSource>, out: SharedWriter, streams: Streams) -> Self {
        Self {
            commands,
            out,
            streams,
            settings: DebugSettings::default(),
            styled: false,
            detached: false,
        }
    }

    pub fn with_settings(mut self, settings: DebugSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Highlight the current cell with ANSI styling.
    pub fn with_styling(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    fn say(&self, text: &str) {
        let mut out = self.out.borrow_mut();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    /// The four `state:` lines shown before each prompt.
    pub fn render_state(&self, engine: &Engine) -> String {
        let tape = engine.tape();
        let mut left: Vec<&Cell> = tape.left_cells(self.settings.band_left).collect();
        left.reverse();
        let right: Vec<&Cell> = tape.right_cells(self.settings.band_right).collect();

        let current = format!("[{}]", tape.get());
        let current = if self.styled {
            Style::new().fg(P::YELLOW).bold().paint(current).to_string()
        } else {
            current
        };

        let code = engine.program().to_string();
        let ip = engine.pointer();
        let before = &code[ip.saturating_sub(self.settings.prog_left)..ip.min(code.len())];
        let here = code.get(ip..ip + 1).unwrap_or("");
        let after_start = (ip + 1).min(code.len());
        let after_end = (ip + 1).saturating_add(self.settings.prog_right).min(code.len());
        let after = &code[after_start..after_end];

        format!(
            "state: {} >>>{}<<< {}\nstate: {} ({}) {}\nstate: program pointer = {}\nstate: step counter = {}",
            cell_list(&left),
            current,
            cell_list(&right),
            before,
            here,
            after,
            ip,
            engine.counter(),
        )
    }

    fn apply(&mut self, command: Command, engine: &mut Engine) -> Result<Decision, RunError> {
        tracing::debug!(?command, "debugger command");
        let decision = match command {
            Command::Step(n) => Decision::Step(n),
            Command::RunUntil(position) => Decision::RunUntil(position),
            Command::RunToEnd => Decision::RunUntil(engine.program().len()),
            Command::Help => {
                let mut out = self.out.borrow_mut();
                let _ = write!(out, "{HELP_MESSAGE}");
                let _ = out.flush();
                Decision::Step(0)
            }
            Command::InputInt(base) => {
                let port = self.streams.input_port(InputEncoding::Int { base })?;
                self.say(&port.change_message());
                engine.set_input_port(port);
                Decision::Step(0)
            }
            Command::InputChar => {
                let port = self.streams.input_port(InputEncoding::Char)?;
                self.say(&port.change_message());
                engine.set_input_port(port);
                Decision::Step(0)
            }
            Command::OutputInt(base) => {
                let port = self.streams.output_port(OutputEncoding::Int { base })?;
                self.say(&port.change_message());
                engine.set_output_port(port);
                Decision::Step(0)
            }
            Command::OutputChar => {
                let port = self.streams.output_port(OutputEncoding::Char)?;
                self.say(&port.change_message());
                engine.set_output_port(port);
                Decision::Step(0)
            }
            Command::BadPosition => {
                self.say("Argument for command p has to be an integer in base 10 or $");
                Decision::Step(0)
            }
            Command::ToggleState => {
                self.settings.show_state = !self.settings.show_state;
                Decision::Step(0)
            }
            Command::BandRight(n) => {
                self.settings.band_right = n;
                Decision::Step(0)
            }
            Command::BandLeft(n) => {
                self.settings.band_left = n;
                Decision::Step(0)
            }
            Command::ProgRight(n) => {
                self.settings.prog_right = n;
                Decision::Step(0)
            }
            Command::ProgLeft(n) => {
                self.settings.prog_left = n;
                Decision::Step(0)
            }
            Command::Reset => {
                let _ = self.streams.output.borrow_mut().flush();
                let _ = self.out.borrow_mut().flush();
                Decision::Reset
            }
            Command::Detach => {
                self.detached = true;
                self.say("Exited debugger");
                Decision::Step(0)
            }
            Command::Quit => {
                self.say("Exiting...");
                Decision::Halt
            }
            Command::Unknown => {
                self.say("Not a recognized command");
                Decision::Step(0)
            }
        };
        Ok(decision)
    }
}

impl ControlDriver for DebugConsole {
    fn decide(&mut self, engine: &mut Engine) -> Result<Decision, RunError> {
        if self.detached {
            return Autorun.decide(engine);
        }

        if self.settings.show_state {
            let state = self.render_state(engine);
            self.say(&state);
        }

        let line = match engine.interrupt().cloned() {
            Some(interrupt) => interrupt.blocking(|| self.commands.next_command())?,
            None => self.commands.next_command()?,
        };
        let Some(line) = line else {
            return Err(PortError::Exhausted.into());
        };
        self.apply(Command::parse(&line), engine)
    }
}

fn cell_list(cells: &[&Cell]) -> String {
    let items: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
    format!("[{}]", items.join(", "))
}
