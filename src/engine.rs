//! The round state machine.
//!
//! `GameState` is a plain value. [`GameState::reduce`] takes an [`Action`] and
//! produces the next state together with the [`Effect`]s the session controller
//! has to act on (start a timer, schedule an advance, persist the score). The
//! engine itself never sleeps, spawns or performs I/O.
use crate::config::GameConfig;
use crate::round::Round;
use crate::scrambler::scramble;
use rand::RngCore;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Status {
    NotStarted,
    Playing,
    RoundCorrect,
    RoundTimedOut,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Outcome {
    Correct,
    TimedOut,
}

/// Everything that can move the state machine.
///
/// Timer-driven actions carry the epoch they were scheduled for; an action
/// whose epoch no longer matches the live round is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start { words: Vec<String> },
    SelectLetter(usize),
    DeselectAt(usize),
    ClearSelection,
    Tick { epoch: u64 },
    ShakeElapsed { epoch: u64 },
    Advance { epoch: u64 },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A round became active; keep the one-second tick running for it.
    RoundStarted { epoch: u64, index: usize },
    /// A wrong full-length guess; clear it after the feedback delay.
    ShakeStarted { epoch: u64 },
    /// The live round reached a terminal state; advance after the presentation delay.
    RoundEnded { epoch: u64, outcome: Outcome },
    SessionFinished { score: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub status: Status,
    pub words: Vec<String>,
    pub round: Option<Round>,
    pub score: u32,
    pub correct_rounds: usize,
    pub completed_rounds: usize,
    pub epoch: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            status: Status::NotStarted,
            words: Vec::new(),
            round: None,
            score: 0,
            correct_rounds: 0,
            completed_rounds: 0,
            epoch: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: GameState,
    pub effects: Vec<Effect>,
}

impl Transition {
    /// True when the action produced a different state.
    pub fn changed(&self, before: &GameState) -> bool {
        &self.state != before
    }
}

impl GameState {
    pub fn total_rounds(&self) -> usize {
        self.words.len()
    }

    pub fn round_index(&self) -> Option<usize> {
        self.round.as_ref().map(|r| r.index)
    }

    pub fn is_round_active(&self) -> bool {
        self.status == Status::Playing && self.round.is_some()
    }

    pub fn reduce(&self, action: &Action, config: &GameConfig, rng: &mut dyn RngCore) -> Transition {
        let transition = match action {
            Action::Start { words } => self.start(words, config, rng),
            Action::SelectLetter(index) => {
                self.edit_round(|round| round.with_selected(*index), config)
            }
            Action::DeselectAt(position) => {
                self.edit_round(|round| round.with_deselected(*position), config)
            }
            Action::ClearSelection => self.edit_round(|round| Some(round.cleared()), config),
            Action::Tick { epoch } => self.tick(*epoch),
            Action::ShakeElapsed { epoch } => self.end_shake(*epoch),
            Action::Advance { epoch } => self.advance(*epoch, config, rng),
            Action::Reset => self.reset(),
        };
        if transition.changed(self) {
            debug!(?action, status = %transition.state.status, epoch = transition.state.epoch, "reduced");
        }
        transition
    }

    fn ignored(&self) -> Transition {
        Transition {
            state: self.clone(),
            effects: Vec::new(),
        }
    }

    fn start(&self, words: &[String], config: &GameConfig, rng: &mut dyn RngCore) -> Transition {
        if self.status != Status::NotStarted || words.is_empty() {
            return self.ignored();
        }
        let epoch = self.epoch + 1;
        let round = build_round(0, &words[0], config, rng);
        Transition {
            state: GameState {
                status: Status::Playing,
                words: words.to_vec(),
                round: Some(round),
                score: 0,
                correct_rounds: 0,
                completed_rounds: 0,
                epoch,
            },
            effects: vec![Effect::RoundStarted { epoch, index: 0 }],
        }
    }

    fn edit_round<F>(&self, edit: F, config: &GameConfig) -> Transition
    where
        F: FnOnce(&Round) -> Option<Round>,
    {
        if !self.is_round_active() {
            return self.ignored();
        }
        let Some(round) = self.round.as_ref().and_then(edit) else {
            return self.ignored();
        };
        if self.round.as_ref() == Some(&round) {
            return self.ignored();
        }
        if round.is_full() {
            return self.check_completion(round, config);
        }
        Transition {
            state: GameState {
                round: Some(round),
                ..self.clone()
            },
            effects: Vec::new(),
        }
    }

    fn check_completion(&self, round: Round, config: &GameConfig) -> Transition {
        if round.guess == round.target {
            debug!(word = %round.target, "round solved");
            return Transition {
                state: GameState {
                    status: Status::RoundCorrect,
                    round: Some(round.with_shake(false)),
                    score: self.score + config.points_per_word,
                    correct_rounds: self.correct_rounds + 1,
                    ..self.clone()
                },
                effects: vec![Effect::RoundEnded {
                    epoch: self.epoch,
                    outcome: Outcome::Correct,
                }],
            };
        }
        Transition {
            state: GameState {
                round: Some(round.with_shake(true)),
                ..self.clone()
            },
            effects: vec![Effect::ShakeStarted { epoch: self.epoch }],
        }
    }

    fn tick(&self, epoch: u64) -> Transition {
        if !self.is_round_active() || epoch != self.epoch {
            return self.ignored();
        }
        let Some(round) = self.round.as_ref().map(Round::ticked) else {
            return self.ignored();
        };
        if round.remaining_secs > 0 {
            return Transition {
                state: GameState {
                    round: Some(round),
                    ..self.clone()
                },
                effects: Vec::new(),
            };
        }
        Transition {
            state: GameState {
                status: Status::RoundTimedOut,
                round: Some(round.with_shake(false)),
                ..self.clone()
            },
            effects: vec![Effect::RoundEnded {
                epoch,
                outcome: Outcome::TimedOut,
            }],
        }
    }

    fn end_shake(&self, epoch: u64) -> Transition {
        if !self.is_round_active() || epoch != self.epoch {
            return self.ignored();
        }
        match self.round.as_ref() {
            Some(round) if round.shake_active => Transition {
                state: GameState {
                    round: Some(round.with_shake(false).cleared()),
                    ..self.clone()
                },
                effects: Vec::new(),
            },
            _ => self.ignored(),
        }
    }

    fn advance(&self, epoch: u64, config: &GameConfig, rng: &mut dyn RngCore) -> Transition {
        let terminal = matches!(self.status, Status::RoundCorrect | Status::RoundTimedOut);
        if !terminal || epoch != self.epoch {
            return self.ignored();
        }
        let completed_rounds = self.completed_rounds + 1;
        let next_epoch = self.epoch + 1;
        let next_index = self.round_index().map_or(0, |i| i + 1);

        if next_index < self.total_rounds() {
            let round = build_round(next_index, &self.words[next_index], config, rng);
            return Transition {
                state: GameState {
                    status: Status::Playing,
                    round: Some(round),
                    completed_rounds,
                    epoch: next_epoch,
                    ..self.clone()
                },
                effects: vec![Effect::RoundStarted {
                    epoch: next_epoch,
                    index: next_index,
                }],
            };
        }

        Transition {
            state: GameState {
                status: Status::Finished,
                completed_rounds,
                epoch: next_epoch,
                ..self.clone()
            },
            effects: vec![Effect::SessionFinished { score: self.score }],
        }
    }

    fn reset(&self) -> Transition {
        Transition {
            state: GameState {
                epoch: self.epoch + 1,
                ..GameState::default()
            },
            effects: Vec::new(),
        }
    }
}

fn build_round(index: usize, word: &str, config: &GameConfig, rng: &mut dyn RngCore) -> Round {
    Round::new(index, word.to_string(), scramble(word, rng), config.time_per_round_secs)
}
