//! Program text: filtering comments out and checking bracket balance.

use std::fmt;

/// One of the eight instruction symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Increment,
    Decrement,
    Output,
    Input,
    Left,
    Right,
    LoopStart,
    LoopEnd,
}

impl Instruction {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Instruction::Increment),
            '-' => Some(Instruction::Decrement),
            '.' => Some(Instruction::Output),
            ',' => Some(Instruction::Input),
            '<' => Some(Instruction::Left),
            '>' => Some(Instruction::Right),
            '[' => Some(Instruction::LoopStart),
            ']' => Some(Instruction::LoopEnd),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Instruction::Increment => '+',
            Instruction::Decrement => '-',
            Instruction::Output => '.',
            Instruction::Input => ',',
            Instruction::Left => '<',
            Instruction::Right => '>',
            Instruction::LoopStart => '[',
            Instruction::LoopEnd => ']',
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBracketKind {
    /// A `]` appeared while no loop was open.
    TooManyClose,
    /// The program ended with loops still open.
    TooManyOpen,
}

impl fmt::Display for UnmatchedBracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedBracketKind::TooManyClose => write!(f, "not enough opening '['"),
            UnmatchedBracketKind::TooManyOpen => write!(f, "not enough closing ']'"),
        }
    }
}

/// Errors found while building a [`Program`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    /// Loop brackets are not balanced. `ip` indexes the sanitized program:
    /// the stray `]` for [`UnmatchedBracketKind::TooManyClose`], the
    /// innermost unclosed `[` for [`UnmatchedBracketKind::TooManyOpen`].
    #[error("Loop brackets not balanced, {kind} (instruction {ip})")]
    BracketImbalance { ip: usize, kind: UnmatchedBracketKind },
}

/// Keep only instruction symbols; everything else is a comment.
pub fn sanitize(raw: &str) -> Vec<Instruction> {
    raw.chars().filter_map(Instruction::from_char).collect()
}

/// Check bracket balance with a single depth counter.
///
/// Fails as soon as the depth goes negative, or at the end if loops remain
/// open.
pub fn validate(code: &[Instruction]) -> Result<(), ProgramError> {
    let mut depth: usize = 0;
    for (ip, instr) in code.iter().enumerate() {
        match instr {
            Instruction::LoopStart => depth += 1,
            Instruction::LoopEnd => {
                let Some(d) = depth.checked_sub(1) else {
                    return Err(ProgramError::BracketImbalance {
                        ip,
                        kind: UnmatchedBracketKind::TooManyClose,
                    });
                };
                depth = d;
            }
            _ => {}
        }
    }

    if depth > 0 {
        // Report the innermost loop that was never closed.
        let ip = innermost_unclosed(code).unwrap_or_default();
        return Err(ProgramError::BracketImbalance {
            ip,
            kind: UnmatchedBracketKind::TooManyOpen,
        });
    }
    Ok(())
}

fn innermost_unclosed(code: &[Instruction]) -> Option<usize> {
    let mut stack = Vec::new();
    for (ip, instr) in code.iter().enumerate() {
        match instr {
            Instruction::LoopStart => stack.push(ip),
            Instruction::LoopEnd => {
                stack.pop();
            }
            _ => {}
        }
    }
    stack.last().copied()
}

/// A sanitized program with balanced brackets.
///
/// Construction is the only place validation happens; an engine can only be
/// built from a `Program`, so it never sees unbalanced brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    code: Vec<Instruction>,
    // jump_map[i] holds the matching bracket index for '[' or ']' at i.
    jump_map: Vec<Option<usize>>,
}

impl Program {
    /// Sanitize and validate `raw` source text.
    pub fn parse(raw: &str) -> Result<Self, ProgramError> {
        Self::from_instructions(sanitize(raw))
    }

    pub fn from_instructions(code: Vec<Instruction>) -> Result<Self, ProgramError> {
        validate(&code)?;

        let mut jump_map = vec![None; code.len()];
        let mut stack: Vec<usize> = Vec::new();
        for (i, instr) in code.iter().enumerate() {
            match instr {
                Instruction::LoopStart => stack.push(i),
                Instruction::LoopEnd => {
                    if let Some(open) = stack.pop() {
                        jump_map[open] = Some(i);
                        jump_map[i] = Some(open);
                    }
                }
                _ => {}
            }
        }

        Ok(Self { code, jump_map })
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn get(&self, ip: usize) -> Option<Instruction> {
        self.code.get(ip).copied()
    }

    /// Index of the bracket matching the one at `ip`.
    pub fn matching(&self, ip: usize) -> Option<usize> {
        self.jump_map.get(ip).copied().flatten()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.code {
            write!(f, "{instr}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_comments_and_keeps_order() {
        let code = sanitize("a+b-c[d]e.f,g<h>i 123\n");
        let text: String = code.iter().map(|i| i.as_char()).collect();
        assert_eq!(text, "+-[].,<>");
    }

    #[test]
    fn balanced_program_with_comments_is_accepted() {
        let program = Program::parse("loop: [ inner [ - ] > + < ] done").unwrap();
        assert_eq!(program.to_string(), "[[-]>+<]");
        assert_eq!(program.matching(0), Some(7));
        assert_eq!(program.matching(7), Some(0));
        assert_eq!(program.matching(1), Some(3));
        assert_eq!(program.matching(2), None);
    }

    #[test]
    fn stray_close_bracket_is_rejected_immediately() {
        let err = Program::parse("+]ignored[").unwrap_err();
        assert_eq!(
            err,
            ProgramError::BracketImbalance { ip: 1, kind: UnmatchedBracketKind::TooManyClose }
        );
    }

    #[test]
    fn unclosed_loop_is_rejected_after_scan() {
        let err = Program::parse("[[]+").unwrap_err();
        assert_eq!(
            err,
            ProgramError::BracketImbalance { ip: 0, kind: UnmatchedBracketKind::TooManyOpen }
        );
    }

    #[test]
    fn close_before_open_is_not_balanced() {
        // Equal counts are not enough; order matters.
        assert!(validate(&sanitize("][")).is_err());
        assert!(validate(&sanitize("[]][[]")).is_err());
    }

    #[test]
    fn empty_program_is_valid() {
        let program = Program::parse("only comments here").unwrap();
        assert!(program.is_empty());
        assert_eq!(program.get(0), None);
    }
}
