use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use unscramble::persistence::{
    Player, RateLimiter, SaveError, ScorePersistence, ScoreRecord, SqliteScoreStore,
};
use unscramble::round::Round;
use unscramble::runtime::{mailbox, GameEvent, ManualClock};
use unscramble::words::WordPool;
use unscramble::{GameConfig, Intent, SaveStatus, SessionController, Status};

const FRUIT: [&str; 4] = ["apple", "grape", "mango", "lemon"];

#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<ScoreRecord>>,
    failures_left: Mutex<u32>,
}

impl RecordingStore {
    fn failing(times: u32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures_left: Mutex::new(times),
        }
    }

    fn scores(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|r| r.score).collect()
    }
}

impl ScorePersistence for RecordingStore {
    fn persist(&self, record: &ScoreRecord) -> Result<(), SaveError> {
        self.calls.lock().unwrap().push(record.clone());
        let mut left = self.failures_left.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            return Err(SaveError::RateLimited);
        }
        Ok(())
    }
}

struct Game<P: ScorePersistence> {
    ctl: SessionController<P, ManualClock>,
    clock: ManualClock,
    rx: Receiver<GameEvent>,
}

fn game<P: ScorePersistence>(store: Arc<P>) -> Game<P> {
    let clock = ManualClock::new();
    let (tx, rx) = mailbox();
    let pool = WordPool::new("fruit", FRUIT).unwrap();
    let ctl = SessionController::new(
        GameConfig::default(),
        pool,
        Player::new("Ada", "0123456789"),
        store,
        clock.clone(),
        tx,
    )
    .with_seed(42);
    Game { ctl, clock, rx }
}

/// Tile indices that spell the target, first free tile per letter.
fn solution(round: &Round) -> Vec<usize> {
    let mut used = Vec::new();
    for c in round.target.chars() {
        let i = (0..round.scrambled.len())
            .find(|i| round.scrambled[*i] == c && !used.contains(i))
            .unwrap();
        used.push(i);
    }
    used
}

impl<P: ScorePersistence> Game<P> {
    fn round(&self) -> Round {
        self.ctl.snapshot().round.unwrap()
    }

    fn advance_ms(&mut self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
        self.ctl.fire_due_timers();
    }

    fn solve(&mut self) {
        for i in solution(&self.round()) {
            self.ctl.dispatch(Intent::SelectLetter(i));
        }
    }

    fn wait_for_save(&mut self) {
        let ev = self.rx.recv_timeout(Duration::from_secs(5)).unwrap();
        self.ctl.handle_event(ev);
    }
}

#[test]
fn four_round_session_scores_solved_rounds_and_saves_once() {
    let store = Arc::new(RecordingStore::default());
    let mut g = game(Arc::clone(&store));
    g.ctl.start().unwrap();

    let mut seen = Vec::new();
    for expected_round in 0..3 {
        assert_eq!(g.ctl.state().round_index(), Some(expected_round));
        seen.push(g.round().target.clone());
        g.solve();
        assert_eq!(g.ctl.state().status, Status::RoundCorrect);
        g.advance_ms(2000);
    }

    assert_eq!(g.ctl.state().status, Status::Playing);
    seen.push(g.round().target.clone());
    for _ in 0..15 {
        g.advance_ms(1000);
    }
    assert_eq!(g.ctl.state().status, Status::RoundTimedOut);
    assert_eq!(g.round().remaining_secs, 0);
    g.advance_ms(2000);

    let state = g.ctl.state();
    assert_eq!(state.status, Status::Finished);
    assert_eq!(state.score, 75);
    assert_eq!(state.correct_rounds, 3);
    assert_eq!(state.completed_rounds, 4);

    seen.sort();
    let mut fruit = FRUIT.map(String::from).to_vec();
    fruit.sort();
    assert_eq!(seen, fruit);

    g.wait_for_save();
    assert_eq!(*g.ctl.save_status(), SaveStatus::Saved);
    assert_eq!(store.scores(), vec![75]);
    assert_eq!(g.ctl.pending_timers(), 0);
}

#[test]
fn wrong_guess_shakes_then_clears() {
    let mut g = game(Arc::new(RecordingStore::default()));
    g.ctl.start().unwrap();

    let len = g.round().target_len();
    for i in 0..len {
        g.ctl.dispatch(Intent::SelectLetter(i));
    }
    let round = g.round();
    assert!(round.shake_active);
    assert_eq!(round.guess_len(), len);
    assert_eq!(g.ctl.state().status, Status::Playing);
    assert_eq!(g.ctl.state().score, 0);

    // Picks while shaking are dropped.
    g.ctl.dispatch(Intent::DeselectAt(0));
    assert_eq!(g.round().guess_len(), len);

    g.advance_ms(500);
    let round = g.round();
    assert!(!round.shake_active);
    assert!(round.selection.is_empty());
    assert!(round.guess.is_empty());
    assert_eq!(g.ctl.state().status, Status::Playing);
}

#[test]
fn rate_limited_save_reports_failure_and_allows_retry() {
    let store = SqliteScoreStore::in_memory()
        .unwrap()
        .with_limiter(RateLimiter::new(Duration::from_secs(60), 0));
    let store = Arc::new(store);
    let mut g = game(Arc::clone(&store));
    g.ctl.start().unwrap();
    g.advance_ms(120_000);

    assert_eq!(g.ctl.state().status, Status::Finished);
    g.wait_for_save();
    assert_eq!(
        *g.ctl.save_status(),
        SaveStatus::Failed(SaveError::RateLimited.to_string())
    );
    assert_eq!(g.ctl.state().status, Status::Finished);
    assert!(store.list_entries().unwrap().is_empty());

    g.ctl.save().unwrap();
    assert_eq!(*g.ctl.save_status(), SaveStatus::Saving);
    g.wait_for_save();
    assert!(matches!(g.ctl.save_status(), SaveStatus::Failed(_)));
}

#[test]
fn retry_after_failure_persists_final_score() {
    let store = Arc::new(RecordingStore::failing(1));
    let mut g = game(Arc::clone(&store));
    g.ctl.start().unwrap();
    g.solve();
    g.advance_ms(120_000);

    assert_eq!(g.ctl.state().score, 25);
    g.wait_for_save();
    assert!(matches!(g.ctl.save_status(), SaveStatus::Failed(_)));

    g.ctl.save().unwrap();
    g.wait_for_save();
    assert_eq!(*g.ctl.save_status(), SaveStatus::Saved);
    assert_eq!(store.scores(), vec![25, 25]);
}

#[test]
fn sqlite_store_keeps_session_score() {
    let store = Arc::new(SqliteScoreStore::in_memory().unwrap());
    let mut g = game(Arc::clone(&store));
    g.ctl.start().unwrap();
    g.solve();
    g.advance_ms(2000);
    g.solve();
    g.advance_ms(120_000);
    g.wait_for_save();

    assert_eq!(*g.ctl.save_status(), SaveStatus::Saved);
    let entries = store.list_entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Ada");
    assert_eq!(entries[0].score, 50);
}

#[test]
fn reset_during_round_ends_discards_pending_work() {
    let store = Arc::new(RecordingStore::default());
    let mut g = game(Arc::clone(&store));
    g.ctl.start().unwrap();
    g.solve();
    assert_eq!(g.ctl.state().status, Status::RoundCorrect);

    g.ctl.reset();
    g.advance_ms(120_000);
    let state = g.ctl.state();
    assert_eq!(state.status, Status::NotStarted);
    assert_eq!(state.score, 0);
    assert!(state.round.is_none());
    assert!(store.scores().is_empty());

    // A fresh session starts from zero and plays normally.
    g.ctl.start().unwrap();
    assert_eq!(g.ctl.state().round_index(), Some(0));
    assert_eq!(g.round().remaining_secs, 15);
}

#[test]
fn score_tracks_solved_rounds_throughout() {
    let mut g = game(Arc::new(RecordingStore::default()));
    g.ctl.start().unwrap();
    let points = g.ctl.config().points_per_word;

    for round in 0..4usize {
        if round % 2 == 0 {
            g.solve();
        } else {
            g.advance_ms(15_000);
        }
        let s = g.ctl.state();
        assert_eq!(s.score, s.correct_rounds as u32 * points);
        assert!(s.score <= g.ctl.config().max_score());
        g.advance_ms(2000);
    }
    let s = g.ctl.state();
    assert_eq!(s.status, Status::Finished);
    assert_eq!(s.score, 50);
    assert_eq!(s.completed_rounds, 4);
}
