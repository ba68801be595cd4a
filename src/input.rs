use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::engine::Status;
use crate::session::{Intent, Snapshot};

/// What a key press asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Intent(Intent),
    Save,
    PlayAgain,
    Quit,
}

/// Translate a key press into a command for the current screen.
///
/// Letters pick the first free tile showing that letter, Backspace takes back
/// the last pick, digits take back the pick at that slot and Tab clears.
pub fn map_key(key: KeyEvent, snapshot: &Snapshot) -> Option<Command> {
    if key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
    {
        return Some(Command::Quit);
    }

    match snapshot.status {
        Status::NotStarted => match key.code {
            KeyCode::Enter => Some(Command::Start),
            _ => None,
        },
        Status::Playing => {
            let round = snapshot.round.as_ref()?;
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    let slot = c.to_digit(10)? as usize;
                    slot.checked_sub(1)
                        .map(|position| Command::Intent(Intent::DeselectAt(position)))
                }
                KeyCode::Char(c) if c.is_alphabetic() => round
                    .first_free_tile(c)
                    .map(|i| Command::Intent(Intent::SelectLetter(i))),
                KeyCode::Backspace => round
                    .guess_len()
                    .checked_sub(1)
                    .map(|last| Command::Intent(Intent::DeselectAt(last))),
                KeyCode::Tab | KeyCode::Delete => Some(Command::Intent(Intent::ClearSelection)),
                _ => None,
            }
        }
        Status::RoundCorrect | Status::RoundTimedOut => None,
        Status::Finished => match key.code {
            KeyCode::Char('s') => Some(Command::Save),
            KeyCode::Char('n') | KeyCode::Enter => Some(Command::PlayAgain),
            _ => None,
        },
    }
}
