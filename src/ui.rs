use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::engine::Status;
use crate::session::{SaveStatus, Snapshot};

const HORIZONTAL_MARGIN: u16 = 5;
const LOW_TIME_SECS: u32 = 2;

impl Widget for &Snapshot {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = match self.status {
            Status::NotStarted => title_lines(self),
            Status::Playing => playing_lines(self),
            Status::RoundCorrect => vec![
                Line::from(Span::styled("awesome!", bold().fg(Color::Green))),
                Line::from(format!("+{} points!", self.points_per_word)),
            ],
            Status::RoundTimedOut => vec![
                Line::from(Span::styled("time's up!", bold().fg(Color::Red))),
                Line::from(format!(
                    "the word was: {}",
                    self.round.as_ref().map_or("", |r| r.target.as_str())
                )),
            ],
            Status::Finished => finished_lines(self),
        };

        let height = lines.len() as u16;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(area.height.saturating_sub(height) / 2),
                Constraint::Length(height),
                Constraint::Min(0),
            ])
            .split(area);

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn title_lines(s: &Snapshot) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled("UNSCRAMBLE", bold().fg(Color::Cyan))),
        Line::from(""),
        Line::from(format!(
            "hi {}! unscramble {} words against the clock",
            s.player.name, s.total_rounds
        )),
        Line::from(""),
        Line::from(Span::styled("press enter to start, esc to quit", dim())),
    ]
}

fn playing_lines(s: &Snapshot) -> Vec<Line<'static>> {
    let Some(round) = s.round.as_ref() else {
        return Vec::new();
    };

    let timer_style = if round.remaining_secs <= LOW_TIME_SECS {
        bold().fg(Color::Red)
    } else {
        bold()
    };

    let guess: Vec<char> = round.guess.chars().collect();
    let slots = (0..round.target_len())
        .map(|i| guess.get(i).map_or('_', |c| c.to_ascii_uppercase()))
        .join(" ");
    let slot_style = if round.shake_active {
        bold().fg(Color::Red).add_modifier(Modifier::SLOW_BLINK)
    } else {
        bold().fg(Color::Yellow)
    };

    let tiles = round
        .scrambled
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            let style = if round.is_selected(i) {
                dim().add_modifier(Modifier::CROSSED_OUT)
            } else {
                bold()
            };
            [
                Span::styled(c.to_ascii_uppercase().to_string(), style),
                Span::raw(" "),
            ]
        })
        .collect::<Vec<_>>();

    vec![
        Line::from(Span::styled(round.remaining_secs.to_string(), timer_style)),
        Line::from(format!(
            "round {}/{}  score: {}",
            round.index + 1,
            s.total_rounds,
            s.score
        )),
        Line::from(""),
        Line::from(Span::styled(slots, slot_style)),
        Line::from(""),
        Line::from(tiles),
        Line::from(""),
        Line::from(Span::styled(
            "type letters to pick tiles · backspace undo · 1-9 take back a slot · tab clear",
            dim().add_modifier(Modifier::ITALIC),
        )),
    ]
}

fn finished_lines(s: &Snapshot) -> Vec<Line<'static>> {
    let save_line = match &s.save {
        SaveStatus::Idle => Line::from(""),
        SaveStatus::Saving => Line::from(Span::styled("saving…", dim())),
        SaveStatus::Saved => Line::from(Span::styled("score saved", Style::default().fg(Color::Green))),
        SaveStatus::Failed(reason) => Line::from(Span::styled(
            format!("could not save score: {reason} (press s to retry)"),
            Style::default().fg(Color::Red),
        )),
    };

    vec![
        Line::from(Span::styled("game over!", bold().fg(Color::Magenta))),
        Line::from("your final score:"),
        Line::from(Span::styled(s.score.to_string(), bold())),
        Line::from(format!(
            "you completed {} out of {} rounds",
            s.completed_rounds, s.total_rounds
        )),
        Line::from(""),
        save_line,
        Line::from(""),
        Line::from(Span::styled("n play again · esc quit", dim())),
    ]
}
