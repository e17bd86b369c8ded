use crate::allocator::BunchKind;
use crate::{DistError, Document};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashSet;

/// Hands out a freshly seeded generator for every draw.
///
/// Every sample starts from the same seed, so drawing twice from an unchanged
/// candidate list repeats the same picks. Reproducibility across runs depends
/// on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededRng {
    seed: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn reseeded(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }

    /// `amount` distinct positions out of `0..len`, in draw order.
    /// Caller guarantees `amount <= len`.
    pub fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        debug_assert!(amount <= len);
        let mut rng = self.reseeded();
        rand::seq::index::sample(&mut rng, len, amount).into_vec()
    }

    /// Picks `amount` items and removes them from `items`, keeping the
    /// survivors in order. Picks come back in draw order.
    pub fn take_sample<T>(&self, items: &mut Vec<T>, amount: usize) -> Vec<T> {
        let picked = self.sample_indices(items.len(), amount);
        let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
        let sample = picked
            .iter()
            .filter_map(|&i| slots[i].take())
            .collect();
        items.extend(slots.into_iter().flatten());
        sample
    }
}

/// Pool of documents not yet handed to any annotator
#[derive(Debug, Clone, Default)]
pub struct Spool {
    docs: Vec<Document>,
    members: FxHashSet<Document>,
}

impl Spool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, doc: &str) -> bool {
        self.members.contains(doc)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }

    /// Adds `doc` unless it is already pooled. Returns whether it was added.
    pub fn push(&mut self, doc: Document) -> bool {
        if !self.members.insert(doc.clone()) {
            return false;
        }
        self.docs.push(doc);
        true
    }

    /// Removes up to `count` documents from the end, last pooled first
    pub fn pop_tail(&mut self, count: usize) -> Vec<Document> {
        let keep = self.docs.len().saturating_sub(count);
        let tail: Vec<Document> = self.docs.drain(keep..).rev().collect();
        for doc in &tail {
            self.members.remove(doc);
        }
        tail
    }

    /// Draw `amount` documents for one bunch, removing them from the pool
    pub fn draw(
        &mut self,
        rng: &SeededRng,
        amount: usize,
        bunch: BunchKind,
        dir: &str,
    ) -> Result<Vec<Document>, DistError> {
        if amount > self.docs.len() {
            return Err(DistError::InsufficientSpool {
                bunch,
                dir: dir.to_string(),
                requested: amount,
                available: self.docs.len(),
            });
        }
        let picked = rng.take_sample(&mut self.docs, amount);
        for doc in &picked {
            self.members.remove(doc);
        }
        Ok(picked)
    }
}
