//! Input and output ports.
//!
//! The engine only knows two capabilities: something that consumes one cell
//! value per `.` ([`OutputPort`]) and something that produces one per `,`
//! ([`InputPort`]). The concrete encodings here all work on a shared set of
//! [`Streams`], so switching encodings in the middle of a run keeps reading
//! and writing the same underlying source and sink.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Num, ToPrimitive, Zero};

use crate::error::PortError;
use crate::tape::Cell;

/// Written in place of values that are not Unicode scalar values.
pub const FALLBACK_CHAR: char = '█';

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

pub type SharedReader = Rc<RefCell<dyn BufRead>>;
pub type SharedWriter = Rc<RefCell<dyn Write>>;

/// Consumes one value per output instruction.
///
/// Write failures are the port's own business; the engine never sees them.
pub trait OutputPort {
    fn send(&mut self, value: &Cell);

    /// Message shown when this port is switched in.
    fn change_message(&self) -> String;
}

/// Produces one value per input instruction.
///
/// Implementations retry internally on malformed input and only return an
/// error once the source is permanently exhausted.
pub trait InputPort {
    fn receive(&mut self) -> Result<Cell, PortError>;

    /// Message shown when this port is switched in.
    fn change_message(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEncoding {
    Char,
    Int { base: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    Char,
    Int { base: u32 },
}

/// The reader and writers ports are built on.
#[derive(Clone)]
pub struct Streams {
    pub input: SharedReader,
    pub output: SharedWriter,
    /// Where input prompts and retry hints go, if anywhere.
    pub prompt: Option<SharedWriter>,
}

impl Streams {
    pub fn new(input: SharedReader, output: SharedWriter) -> Self {
        Self { input, output, prompt: None }
    }

    /// Stdin for input, stdout for output, no prompts.
    pub fn stdio() -> Self {
        Self::new(
            Rc::new(RefCell::new(io::BufReader::new(io::stdin()))),
            Rc::new(RefCell::new(io::stdout())),
        )
    }

    pub fn with_prompt(mut self, prompt: SharedWriter) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn input_port(&self, encoding: InputEncoding) -> Result<Box<dyn InputPort>, PortError> {
        Ok(match encoding {
            InputEncoding::Char => Box::new(CharInput::new(self.input.clone())),
            InputEncoding::Int { base } => {
                let mut port = IntInput::new(self.input.clone(), base)?;
                if let Some(prompt) = &self.prompt {
                    port = port.with_prompt(prompt.clone());
                }
                Box::new(port)
            }
        })
    }

    pub fn output_port(&self, encoding: OutputEncoding) -> Result<Box<dyn OutputPort>, PortError> {
        Ok(match encoding {
            OutputEncoding::Char => Box::new(CharOutput::new(self.output.clone())),
            OutputEncoding::Int { base } => Box::new(IntOutput::new(self.output.clone(), base)?),
        })
    }
}

/// Prints each value as the character with that code point.
pub struct CharOutput {
    sink: SharedWriter,
}

impl CharOutput {
    pub fn new(sink: SharedWriter) -> Self {
        Self { sink }
    }
}

impl OutputPort for CharOutput {
    fn send(&mut self, value: &Cell) {
        let ch = value.to_u32().and_then(char::from_u32).unwrap_or(FALLBACK_CHAR);
        let mut sink = self.sink.borrow_mut();
        if let Err(e) = write!(sink, "{ch}").and_then(|_| sink.flush()) {
            tracing::warn!(error = %e, "failed to write output");
        }
    }

    fn change_message(&self) -> String {
        "Now printing characters".to_string()
    }
}

/// Prints each value as an integer followed by `;`.
pub struct IntOutput {
    sink: SharedWriter,
    base: u32,
}

impl IntOutput {
    /// `base` must be in `2..=36` or exactly 64.
    pub fn new(sink: SharedWriter, base: u32) -> Result<Self, PortError> {
        if !((2..=36).contains(&base) || base == 64) {
            return Err(PortError::UnsupportedBase { base, allowed: "2-36 or 64" });
        }
        Ok(Self { sink, base })
    }

    pub fn decimal(sink: SharedWriter) -> Self {
        Self { sink, base: 10 }
    }
}

impl OutputPort for IntOutput {
    fn send(&mut self, value: &Cell) {
        let text = format_in_base(value, self.base);
        let mut sink = self.sink.borrow_mut();
        if let Err(e) = write!(sink, "{text};").and_then(|_| sink.flush()) {
            tracing::warn!(error = %e, "failed to write output");
        }
    }

    fn change_message(&self) -> String {
        format!("Now printing integers (base {})", self.base)
    }
}

/// Render `value` in `base`: digits `0-9A-Z` up to base 36, and for base 64
/// the `A-Za-z0-9+/` alphabet with a trailing `=`.
pub fn format_in_base(value: &BigInt, base: u32) -> String {
    if base != 64 {
        return value.to_str_radix(base).to_uppercase();
    }
    if value.is_zero() {
        return "A".to_string();
    }

    let mut out = String::new();
    if value < &BigInt::zero() {
        out.push('-');
    }
    for digit in value.magnitude().to_radix_be(64) {
        out.push(BASE64_DIGITS[digit as usize] as char);
    }
    out.push('=');
    out
}

/// Reads one UTF-8 character per value.
pub struct CharInput {
    source: SharedReader,
}

impl CharInput {
    pub fn new(source: SharedReader) -> Self {
        Self { source }
    }
}

impl InputPort for CharInput {
    fn receive(&mut self) -> Result<Cell, PortError> {
        let mut source = self.source.borrow_mut();
        match read_char(&mut *source)? {
            Some(ch) => Ok(Cell::from(u32::from(ch))),
            None => Err(PortError::Exhausted),
        }
    }

    fn change_message(&self) -> String {
        "Now expecting characters".to_string()
    }
}

fn read_char(source: &mut dyn BufRead) -> io::Result<Option<char>> {
    let first = {
        let buf = source.fill_buf()?;
        let Some(&b) = buf.first() else {
            return Ok(None);
        };
        b
    };
    source.consume(1);

    let width = match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
    };

    // Take continuation bytes only while they really continue the sequence
    let mut bytes = [first, 0, 0, 0];
    for slot in bytes.iter_mut().take(width).skip(1) {
        let next = match source.fill_buf()?.first() {
            Some(&b) if b & 0xC0 == 0x80 => b,
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        };
        source.consume(1);
        *slot = next;
    }

    Ok(Some(
        std::str::from_utf8(&bytes[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER),
    ))
}

/// Reads one integer per line, re-reading until a line parses.
pub struct IntInput {
    source: SharedReader,
    prompt: Option<SharedWriter>,
    base: u32,
}

impl IntInput {
    /// `base` must be in `2..=36`.
    pub fn new(source: SharedReader, base: u32) -> Result<Self, PortError> {
        if !(2..=36).contains(&base) {
            return Err(PortError::UnsupportedBase { base, allowed: "2-36" });
        }
        Ok(Self { source, prompt: None, base })
    }

    pub fn decimal(source: SharedReader) -> Self {
        Self { source, prompt: None, base: 10 }
    }

    /// Print `int(<base>), ` before each attempt and a hint after bad input.
    pub fn with_prompt(mut self, prompt: SharedWriter) -> Self {
        self.prompt = Some(prompt);
        self
    }

    fn say(&self, text: &str) {
        if let Some(prompt) = &self.prompt {
            let mut prompt = prompt.borrow_mut();
            let _ = write!(prompt, "{text}");
            let _ = prompt.flush();
        }
    }
}

impl InputPort for IntInput {
    fn receive(&mut self) -> Result<Cell, PortError> {
        loop {
            self.say(&format!("int({}), ", self.base));

            let mut line = String::new();
            let read = self.source.borrow_mut().read_line(&mut line);
            match read {
                Ok(0) => return Err(PortError::Exhausted),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    self.say(&format!("Please enter an integer base {}\n", self.base));
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            match parse_int(line.trim(), self.base) {
                Some(value) => return Ok(value),
                None => {
                    tracing::debug!(input = line.trim(), base = self.base, "rejected integer input");
                    self.say(&format!("Please enter an integer base {}\n", self.base));
                }
            }
        }
    }

    fn change_message(&self) -> String {
        format!("Now expecting integers (base {}) one per line", self.base)
    }
}

/// Parse a signed integer in `base`, allowing a leading `+` or `-`.
pub fn parse_int(text: &str, base: u32) -> Option<Cell> {
    if text.is_empty() {
        return None;
    }
    Cell::from_str_radix(text, base).ok()
}
