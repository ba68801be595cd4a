/// One live round: the target word, its scrambled tiles and the player's picks.
///
/// Rounds are values. Every edit returns a new `Round` and leaves `self` alone,
/// so a half-applied change can never be observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub index: usize,
    pub target: String,
    pub scrambled: Vec<char>,
    pub selection: Vec<usize>,
    pub guess: String,
    pub remaining_secs: u32,
    pub shake_active: bool,
}

impl Round {
    pub fn new(index: usize, target: String, scrambled: Vec<char>, time_per_round_secs: u32) -> Self {
        Self {
            index,
            target,
            scrambled,
            selection: Vec::new(),
            guess: String::new(),
            remaining_secs: time_per_round_secs,
            shake_active: false,
        }
    }

    pub fn target_len(&self) -> usize {
        self.target.chars().count()
    }

    pub fn guess_len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_full(&self) -> bool {
        self.guess_len() == self.target_len()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.contains(&index)
    }

    /// Rebuild the guess from the selection alone.
    pub fn decode_selection(&self) -> String {
        self.selection.iter().map(|&i| self.scrambled[i]).collect()
    }

    /// First unselected tile showing `letter`, ignoring case.
    pub fn first_free_tile(&self, letter: char) -> Option<usize> {
        let wanted = letter.to_lowercase().next()?;
        self.scrambled
            .iter()
            .enumerate()
            .find(|&(i, &c)| c.to_lowercase().next() == Some(wanted) && !self.is_selected(i))
            .map(|(i, _)| i)
    }

    pub(crate) fn with_selected(&self, index: usize) -> Option<Self> {
        if self.shake_active
            || index >= self.scrambled.len()
            || self.is_selected(index)
            || self.is_full()
        {
            return None;
        }
        let mut next = self.clone();
        next.selection.push(index);
        next.guess.push(self.scrambled[index]);
        Some(next)
    }

    pub(crate) fn with_deselected(&self, position: usize) -> Option<Self> {
        if self.shake_active || position >= self.selection.len() {
            return None;
        }
        let mut next = self.clone();
        next.selection.remove(position);
        next.guess = next.decode_selection();
        Some(next)
    }

    pub(crate) fn cleared(&self) -> Self {
        Self {
            selection: Vec::new(),
            guess: String::new(),
            ..self.clone()
        }
    }

    pub(crate) fn ticked(&self) -> Self {
        Self {
            remaining_secs: self.remaining_secs.saturating_sub(1),
            ..self.clone()
        }
    }

    pub(crate) fn with_shake(&self, shake_active: bool) -> Self {
        Self {
            shake_active,
            ..self.clone()
        }
    }
}
