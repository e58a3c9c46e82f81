use std::iter::FusedIterator;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePolicy {
    /// Re-draw a uniform permutation at the start of every round.
    pub shuffle: bool,
    /// Start another round after the last one ends, forever.
    pub repeat: bool,
}

impl SequencePolicy {
    /// The policy every practice session runs with.
    pub const SESSION: Self = Self {
        shuffle: true,
        repeat: false,
    };
}

/// Pull-based review stream over a fixed item set.
///
/// A round is one pass over every item. With `repeat` off the stream ends
/// after the first round; with it on the stream never ends unless the item
/// set is empty. An empty set is exhausted on the first pull under any
/// policy. The stream cannot be rewound: build a new one for another pass.
#[derive(Debug)]
pub struct Sequencer<T, R = StdRng> {
    items: Vec<T>,
    policy: SequencePolicy,
    rng: R,
    order: Vec<usize>,
    cursor: usize,
    rounds: u64,
}

impl<T: Clone> Sequencer<T> {
    pub fn new(items: impl IntoIterator<Item = T>, policy: SequencePolicy) -> Self {
        Self::with_rng(items, policy, StdRng::from_entropy())
    }
}

impl<T: Clone, R: Rng> Sequencer<T, R> {
    pub fn with_rng(items: impl IntoIterator<Item = T>, policy: SequencePolicy, rng: R) -> Self {
        Self {
            items: items.into_iter().collect(),
            policy,
            rng,
            order: Vec::new(),
            cursor: 0,
            rounds: 0,
        }
    }

    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Number of rounds begun so far. Zero until the first pull.
    pub fn round(&self) -> u64 {
        self.rounds
    }

    pub fn len_per_round(&self) -> usize {
        self.items.len()
    }

    fn begin_round(&mut self) {
        self.order.clear();
        self.order.extend(0..self.items.len());
        if self.policy.shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self.cursor = 0;
        self.rounds += 1;
    }

    fn is_finished(&self) -> bool {
        self.items.is_empty()
            || (self.cursor == self.order.len() && self.rounds > 0 && !self.policy.repeat)
    }
}

impl<T: Clone, R: Rng> Iterator for Sequencer<T, R> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.is_finished() {
            return None;
        }
        if self.cursor == self.order.len() {
            self.begin_round();
        }
        let index = self.order[self.cursor];
        self.cursor += 1;
        Some(self.items[index].clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_finished() {
            return (0, Some(0));
        }
        if self.policy.repeat {
            return (usize::MAX, None);
        }
        let remaining = if self.rounds == 0 {
            self.items.len()
        } else {
            self.order.len() - self.cursor
        };
        (remaining, Some(remaining))
    }
}

impl<T: Clone, R: Rng> FusedIterator for Sequencer<T, R> {}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
