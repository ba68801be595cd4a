use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::engine::{Action, Effect, GameState, Status};
use crate::error::{GameError, Result};
use crate::persistence::{Player, SaveError, ScorePersistence, ScoreRecord};
use crate::round::Round;
use crate::runtime::{Clock, GameEvent};
use crate::timers::{TimerKind, Timers};
use crate::words::WordPool;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// What the player can ask for while a round is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    SelectLetter(usize),
    DeselectAt(usize),
    ClearSelection,
}

impl From<Intent> for Action {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::SelectLetter(i) => Action::SelectLetter(i),
            Intent::DeselectAt(p) => Action::DeselectAt(p),
            Intent::ClearSelection => Action::ClearSelection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Failed(String),
}

/// Result of a persistence call, tagged with the session that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCompletion {
    pub session: u64,
    pub result: std::result::Result<(), SaveError>,
}

/// Everything a renderer needs, captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub status: Status,
    pub round: Option<Round>,
    pub score: u32,
    pub correct_rounds: usize,
    pub completed_rounds: usize,
    pub total_rounds: usize,
    pub points_per_word: u32,
    pub save: SaveStatus,
    pub player: Player,
}

/// Drives one player's session: word draw, timers, round advance and the final save.
///
/// All mutation happens on the thread that owns the controller. The only
/// work handed elsewhere is the persistence call, whose result comes back as
/// [`GameEvent::SaveCompleted`] through the mailbox.
pub struct SessionController<P: ScorePersistence, C: Clock> {
    config: GameConfig,
    pool: WordPool,
    player: Player,
    state: GameState,
    timers: Timers,
    rng: StdRng,
    clock: C,
    persistence: Arc<P>,
    mailbox: Sender<GameEvent>,
    save: SaveStatus,
    session: u64,
}

impl<P: ScorePersistence, C: Clock> SessionController<P, C> {
    pub fn new(
        config: GameConfig,
        pool: WordPool,
        player: Player,
        persistence: Arc<P>,
        clock: C,
        mailbox: Sender<GameEvent>,
    ) -> Self {
        Self {
            config,
            pool,
            player,
            state: GameState::default(),
            timers: Timers::new(),
            rng: StdRng::from_entropy(),
            clock,
            persistence,
            mailbox,
            save: SaveStatus::Idle,
            session: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.state.status,
            round: self.state.round.clone(),
            score: self.state.score,
            correct_rounds: self.state.correct_rounds,
            completed_rounds: self.state.completed_rounds,
            total_rounds: self.config.total_rounds,
            points_per_word: self.config.points_per_word,
            save: self.save.clone(),
            player: self.player.clone(),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state.status != Status::NotStarted {
            return Err(GameError::AlreadyStarted);
        }
        self.config.validate()?;
        let words = self.pool.draw(self.config.total_rounds, &mut self.rng)?;
        self.session += 1;
        self.save = SaveStatus::Idle;
        info!(
            session = self.session,
            rounds = self.config.total_rounds,
            player = %self.player.name,
            "session started"
        );
        self.apply(Action::Start { words });
        Ok(())
    }

    /// Apply a player intent. Timers that fell due before it arrived fire first.
    pub fn dispatch(&mut self, intent: Intent) {
        self.fire_due_timers();
        self.apply(intent.into());
    }

    /// Handle one mailbox event. Terminal input is left to the presentation layer.
    pub fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::Intent(intent) => self.dispatch(intent),
            GameEvent::SaveCompleted(completion) => self.handle_save_completed(completion),
            GameEvent::Key(_) | GameEvent::Resize => {}
        }
    }

    /// Fire every timer that is due, in deadline order. Returns how many fired.
    pub fn fire_due_timers(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_due(now) {
            fired += 1;
            let action = match timer.kind {
                TimerKind::Tick => Action::Tick { epoch: timer.epoch },
                TimerKind::ShakeClear => Action::ShakeElapsed { epoch: timer.epoch },
                TimerKind::Advance => Action::Advance { epoch: timer.epoch },
            };
            self.apply_at(action, timer.due);

            if timer.kind == TimerKind::Tick
                && self.state.is_round_active()
                && self.state.epoch == timer.epoch
            {
                self.timers
                    .schedule(TimerKind::Tick, timer.epoch, timer.due + TICK_INTERVAL);
            }
        }
        fired
    }

    /// Retry the final save after a failure.
    pub fn save(&mut self) -> Result<()> {
        if self.state.status != Status::Finished {
            return Err(GameError::NotFinished);
        }
        match self.save {
            SaveStatus::Saving => Err(GameError::SaveInFlight),
            SaveStatus::Saved => Err(GameError::AlreadySaved),
            SaveStatus::Idle | SaveStatus::Failed(_) => {
                self.begin_save();
                Ok(())
            }
        }
    }

    /// Drop the session and every pending timer; back to `NotStarted`.
    pub fn reset(&mut self) {
        self.apply(Action::Reset);
        self.timers.cancel_all();
        self.save = SaveStatus::Idle;
        self.session += 1;
        info!(session = self.session, "session reset");
    }

    fn apply(&mut self, action: Action) {
        let now = self.clock.now();
        self.apply_at(action, now);
    }

    /// Reduce `action` as if it happened at `at`; follow-up timers are scheduled from there.
    fn apply_at(&mut self, action: Action, at: Instant) {
        let transition = self.state.reduce(&action, &self.config, &mut self.rng);
        self.state = transition.state;

        self.timers.retain_epoch(self.state.epoch);
        if !self.state.is_round_active() {
            self.timers.cancel_kind(TimerKind::Tick);
            self.timers.cancel_kind(TimerKind::ShakeClear);
        }

        for effect in transition.effects {
            self.run_effect(effect, at);
        }
    }

    fn run_effect(&mut self, effect: Effect, now: Instant) {
        match effect {
            Effect::RoundStarted { epoch, index } => {
                info!(round = index + 1, of = self.state.total_rounds(), "round started");
                self.timers.schedule(TimerKind::Tick, epoch, now + TICK_INTERVAL);
            }
            Effect::ShakeStarted { epoch } => {
                debug!("wrong guess");
                self.timers
                    .schedule(TimerKind::ShakeClear, epoch, now + self.config.shake_delay());
            }
            Effect::RoundEnded { epoch, outcome } => {
                info!(%outcome, score = self.state.score, "round ended");
                self.timers
                    .schedule(TimerKind::Advance, epoch, now + self.config.advance_delay());
            }
            Effect::SessionFinished { score } => {
                info!(
                    score,
                    completed = self.state.completed_rounds,
                    "session finished"
                );
                self.begin_save();
            }
        }
    }

    fn begin_save(&mut self) {
        self.save = SaveStatus::Saving;
        let record = ScoreRecord::new(&self.player, self.state.score);
        let persistence = Arc::clone(&self.persistence);
        let tx = self.mailbox.clone();
        let session = self.session;
        debug!(session, score = record.score, "saving score");
        std::thread::spawn(move || {
            let result = persistence.persist(&record);
            let _ = tx.send(GameEvent::SaveCompleted(SaveCompletion { session, result }));
        });
    }

    fn handle_save_completed(&mut self, completion: SaveCompletion) {
        if completion.session != self.session
            || self.save != SaveStatus::Saving
            || self.state.status != Status::Finished
        {
            debug!(session = completion.session, "ignoring stale save result");
            return;
        }
        self.save = match completion.result {
            Ok(()) => {
                info!("score saved");
                SaveStatus::Saved
            }
            Err(e) => {
                warn!(error = %e, "score save failed");
                SaveStatus::Failed(e.to_string())
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{mailbox, ManualClock};
    use assert_matches::assert_matches;
    use std::sync::mpsc::Receiver;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<ScoreRecord>>,
        fail_with: Mutex<Option<SaveError>>,
    }

    impl ScorePersistence for RecordingStore {
        fn persist(&self, record: &ScoreRecord) -> std::result::Result<(), SaveError> {
            self.calls.lock().unwrap().push(record.clone());
            match self.fail_with.lock().unwrap().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    struct Fixture {
        ctl: SessionController<RecordingStore, ManualClock>,
        clock: ManualClock,
        store: Arc<RecordingStore>,
        rx: Receiver<GameEvent>,
    }

    fn fixture(config: GameConfig, words: &[&str]) -> Fixture {
        let clock = ManualClock::new();
        let store = Arc::new(RecordingStore::default());
        let (tx, rx) = mailbox();
        let pool = WordPool::new("test", words.iter().copied()).unwrap();
        let ctl = SessionController::new(
            config,
            pool,
            Player::new("Ada", "0123456789"),
            Arc::clone(&store),
            clock.clone(),
            tx,
        )
        .with_seed(9);
        Fixture {
            ctl,
            clock,
            store,
            rx,
        }
    }

    fn small_config() -> GameConfig {
        GameConfig {
            total_rounds: 2,
            time_per_round_secs: 2,
            points_per_word: 10,
            shake_delay_ms: 500,
            advance_delay_ms: 2000,
        }
    }

    impl Fixture {
        fn advance(&mut self, ms: u64) {
            self.clock.advance(Duration::from_millis(ms));
            self.ctl.fire_due_timers();
        }

        fn time_out_round(&mut self) {
            let secs = self.ctl.config().time_per_round_secs as u64;
            self.advance(secs * 1000);
        }

        fn pump_save(&mut self) {
            let ev = self
                .rx
                .recv_timeout(Duration::from_secs(5))
                .expect("save result");
            self.ctl.handle_event(ev);
        }
    }

    #[test]
    fn start_requires_enough_words() {
        let mut f = fixture(small_config(), &["apple"]);
        assert_matches!(
            f.ctl.start(),
            Err(GameError::WordPoolExhausted {
                available: 1,
                required: 2
            })
        );
        assert_eq!(f.ctl.state().status, Status::NotStarted);
    }

    #[test]
    fn start_twice_is_an_error() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        assert_matches!(f.ctl.start(), Err(GameError::AlreadyStarted));
    }

    #[test]
    fn ticks_once_per_second_while_active() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        f.advance(999);
        assert_eq!(f.ctl.snapshot().round.unwrap().remaining_secs, 2);
        f.advance(1);
        assert_eq!(f.ctl.snapshot().round.unwrap().remaining_secs, 1);
        f.advance(1000);
        assert_eq!(f.ctl.state().status, Status::RoundTimedOut);
        // Only the advance is pending; no tick survives the timeout.
        assert_eq!(f.ctl.pending_timers(), 1);
    }

    #[test]
    fn intent_after_deadline_is_applied_after_the_timeout() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        let round = f.ctl.snapshot().round.unwrap();
        let picks: Vec<usize> = {
            let mut used = Vec::new();
            for c in round.target.chars() {
                let i = (0..round.scrambled.len())
                    .find(|i| round.scrambled[*i] == c && !used.contains(i))
                    .unwrap();
                used.push(i);
            }
            used
        };
        let (last, rest) = picks.split_last().unwrap();
        for &i in rest {
            f.ctl.dispatch(Intent::SelectLetter(i));
        }

        // Both ticks are overdue; nothing has fired them yet.
        f.clock.advance(Duration::from_millis(2500));
        f.ctl.dispatch(Intent::SelectLetter(*last));

        assert_eq!(f.ctl.state().status, Status::RoundTimedOut);
        assert_eq!(f.ctl.state().score, 0);
        assert_eq!(f.ctl.state().correct_rounds, 0);
    }

    #[test]
    fn timeout_advances_after_presentation_delay() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        f.time_out_round();
        f.advance(1999);
        assert_eq!(f.ctl.state().status, Status::RoundTimedOut);
        f.advance(1);
        assert_eq!(f.ctl.state().status, Status::Playing);
        assert_eq!(f.ctl.state().round_index(), Some(1));
        assert_eq!(f.ctl.state().completed_rounds, 1);
    }

    #[test]
    fn late_catch_up_does_not_double_advance() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        // One big jump covers both rounds' ticks and advances.
        f.advance(60_000);
        let s = f.ctl.state();
        assert_eq!(s.status, Status::Finished);
        assert_eq!(s.completed_rounds, 2);
        assert_eq!(s.score, 0);
    }

    #[test]
    fn reset_cancels_pending_advance() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        f.time_out_round();
        assert_eq!(f.ctl.pending_timers(), 1);
        f.ctl.reset();
        assert_eq!(f.ctl.pending_timers(), 0);
        f.advance(10_000);
        assert_eq!(f.ctl.state().status, Status::NotStarted);
        assert!(f.ctl.state().round.is_none());
    }

    #[test]
    fn finish_persists_once_and_reports_success() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        f.advance(60_000);
        assert_eq!(*f.ctl.save_status(), SaveStatus::Saving);
        assert_matches!(f.ctl.save(), Err(GameError::SaveInFlight));
        f.pump_save();
        assert_eq!(*f.ctl.save_status(), SaveStatus::Saved);
        assert_matches!(f.ctl.save(), Err(GameError::AlreadySaved));
        let calls = f.store.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].score, 0);
        assert_eq!(calls[0].name, "Ada");
    }

    #[test]
    fn failed_save_can_be_retried() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        *f.store.fail_with.lock().unwrap() = Some(SaveError::Unavailable("offline".into()));
        f.ctl.start().unwrap();
        f.advance(60_000);
        f.pump_save();
        assert_matches!(f.ctl.save_status(), SaveStatus::Failed(reason) if reason.contains("offline"));
        assert_eq!(f.ctl.state().status, Status::Finished);

        *f.store.fail_with.lock().unwrap() = None;
        f.ctl.save().unwrap();
        f.pump_save();
        assert_eq!(*f.ctl.save_status(), SaveStatus::Saved);
        assert_eq!(f.store.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn save_before_finish_is_rejected() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        assert_matches!(f.ctl.save(), Err(GameError::NotFinished));
    }

    #[test]
    fn save_result_after_reset_is_ignored() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        f.advance(60_000);
        f.ctl.reset();
        f.pump_save();
        assert_eq!(*f.ctl.save_status(), SaveStatus::Idle);
        assert_eq!(f.ctl.state().status, Status::NotStarted);
    }

    #[test]
    fn wrong_guess_clears_after_shake_delay() {
        let mut f = fixture(small_config(), &["apple", "lemon"]);
        f.ctl.start().unwrap();
        let round = f.ctl.snapshot().round.unwrap();
        // Select tiles in an order that does not spell the target.
        let order: Vec<usize> = (0..round.scrambled.len()).collect();
        let spelled: String = order.iter().map(|&i| round.scrambled[i]).collect();
        assert_ne!(spelled, round.target);
        for i in order {
            f.ctl.dispatch(Intent::SelectLetter(i));
        }
        assert!(f.ctl.snapshot().round.unwrap().shake_active);
        f.advance(499);
        assert!(f.ctl.snapshot().round.unwrap().shake_active);
        f.advance(1);
        let round = f.ctl.snapshot().round.unwrap();
        assert!(!round.shake_active);
        assert!(round.selection.is_empty());
        assert_eq!(f.ctl.state().status, Status::Playing);
    }
}
