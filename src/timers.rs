use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TimerKind {
    Tick,
    ShakeClear,
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TimerId(u64);

/// A pending delayed action, bound to the round epoch it was scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    id: TimerId,
    pub kind: TimerKind,
    pub epoch: u64,
    pub due: Instant,
}

/// Cancellable one-shot timers.
///
/// Nothing fires on its own: the event loop asks for [`Timers::next_deadline`],
/// waits, then drains [`Timers::pop_due`]. A cancelled timer is simply gone.
#[derive(Debug, Default)]
pub struct Timers {
    next_id: u64,
    pending: Vec<Timer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: TimerKind, epoch: u64, due: Instant) {
        self.next_id += 1;
        self.pending.push(Timer {
            id: TimerId(self.next_id),
            kind,
            epoch,
            due,
        });
        tracing::debug!(%kind, epoch, "timer scheduled");
    }

    pub fn cancel_kind(&mut self, kind: TimerKind) {
        self.pending.retain(|t| t.kind != kind);
    }

    /// Drop every timer that does not belong to `epoch`.
    pub fn retain_epoch(&mut self, epoch: u64) {
        self.pending.retain(|t| t.epoch == epoch);
    }

    pub fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(count = self.pending.len(), "cancelling timers");
        }
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|t| t.due).min()
    }

    /// Remove and return the earliest timer due at `now`. Ties fire in scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        let pos = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;
        Some(self.pending.swap_remove(pos))
    }
}
