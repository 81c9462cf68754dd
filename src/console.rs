use std::io::{self, Write};
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, HistoryItem, Reedline, Signal, StyledText};
use nu_ansi_term::Style;
use crate::debugger::CommandSource;
use crate::error::RunError;

/// Debugger commands typed into a line editor, with in-memory history.
pub struct EditorCommands {
    editor: Reedline,
    prompt: DefaultPrompt,
}

impl EditorCommands {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            editor: init_line_editor()?,
            prompt: DefaultPrompt::new(
                DefaultPromptSegment::Basic("debug".to_string()),
                DefaultPromptSegment::Empty,
            ),
        })
    }
}

impl CommandSource for EditorCommands {
    fn next_command(&mut self) -> Result<Option<String>, RunError> {
        match self.editor.read_line(&self.prompt) {
            Ok(Signal::Success(buffer)) => {
                if !buffer.trim().is_empty() {
                    let _ = self.editor.history_mut().save(HistoryItem::from_command_line(buffer.clone()));
                }
                Ok(Some(buffer))
            }
            // The editor swallows SIGINT while it owns the terminal
            Ok(Signal::CtrlC) => Err(RunError::Interrupted),
            Ok(Signal::CtrlD) => Ok(None),
            Err(e) => {
                eprintln!("debug: editor error: {e}");
                let _ = io::stderr().flush();
                Ok(None)
            }
        }
    }
}

fn init_line_editor() -> io::Result<Reedline> {
    use reedline::{default_emacs_keybindings, Emacs, FileBackedHistory, KeyCode, KeyModifiers, ReedlineEvent};

    // Up/down browse earlier commands
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = FileBackedHistory::new(1_000).map_err(|e| io::Error::other(e.to_string()))?;

    let editor = Reedline::create()
        .with_highlighter(Box::new(CommandHighlighter::new_catppuccin_mocha()))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    Ok(editor)
}

#[derive(Default)]
struct CommandHighlighter {
    run: Style,
    encoding: Style,
    display: Style,
    control: Style,
    help: Style,
    argument: Style,
    other: Style,
}

impl CommandHighlighter {
    fn new_catppuccin_mocha() -> Self {
        use crate::theme::catppuccin::Mocha as P;

        // s p          => GREEN (execution)
        // i c I C      => PEACH (I/O encodings)
        // t < > ( )    => SKY (display)
        // r e q        => RED (session control)
        // h ?          => YELLOW
        let mut s = Self::default();
        s.run = Style::new().fg(P::GREEN).bold();
        s.encoding = Style::new().fg(P::PEACH).bold();
        s.display = Style::new().fg(P::SKY).bold();
        s.control = Style::new().fg(P::RED).bold();
        s.help = Style::new().fg(P::YELLOW).bold();
        s.argument = Style::new().fg(P::MAUVE);
        s.other = Style::new().fg(P::SURFACE2);
        s
    }

    #[inline]
    fn style_for_command(&self, ch: char) -> Style {
        match ch {
            's' | 'p' => self.run,
            'i' | 'c' | 'I' | 'C' => self.encoding,
            't' | '<' | '>' | '(' | ')' => self.display,
            'r' | 'e' | 'q' => self.control,
            'h' | '?' => self.help,
            _ => self.other,
        }
    }
}

impl Highlighter for CommandHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut out: StyledText = StyledText::new();
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        if !indent.is_empty() {
            out.push((self.other, indent.to_string()));
        }

        let mut chars = trimmed.chars();
        if let Some(cmd) = chars.next() {
            out.push((self.style_for_command(cmd), cmd.to_string()));
            let rest = chars.as_str();
            if !rest.is_empty() {
                out.push((self.argument, rest.to_string()));
            }
        }
        out
    }
}
