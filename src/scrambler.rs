use rand::seq::SliceRandom;
use rand::Rng;

const MAX_SHUFFLES: usize = 16;

/// Shuffle the letters of `word`.
///
/// If the word has at least two distinct letters the result never equals the
/// word. Words with a single letter, or a single repeated letter, come back
/// unchanged since no other arrangement exists.
pub fn scramble<R: Rng + ?Sized>(word: &str, rng: &mut R) -> Vec<char> {
    scramble_with(word, |letters| letters.shuffle(rng))
}

fn scramble_with<F: FnMut(&mut [char])>(word: &str, mut shuffle: F) -> Vec<char> {
    let original: Vec<char> = word.chars().collect();
    if !has_distinct_letters(&original) {
        return original;
    }

    let mut letters = original.clone();
    for _ in 0..MAX_SHUFFLES {
        shuffle(&mut letters);
        if letters != original {
            return letters;
        }
    }

    // Rotating by one differs from the original unless every letter is equal.
    let mut rotated = original;
    rotated.rotate_left(1);
    rotated
}

fn has_distinct_letters(letters: &[char]) -> bool {
    match letters.first() {
        Some(first) => letters.iter().any(|c| c != first),
        None => false,
    }
}
