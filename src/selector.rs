//! Keeps the best `N` complete assignments seen during a search.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::data::{Class, ScoreBreakdown, Timetable};
use crate::scoring::Scorer;

/// A scored assignment. Orders by score, then by enumeration order with
/// earlier assignments ranking higher.
#[derive(Debug, Clone)]
struct Ranked<'a> {
    score: f64,
    breakdown: ScoreBreakdown,
    seq: usize,
    classes: Vec<&'a Class>,
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct ResultSelector<'a> {
    capacity: Option<usize>,
    // min-heap: the worst retained assignment sits on top
    kept: BinaryHeap<Reverse<Ranked<'a>>>,
    seen: usize,
}

impl<'a> ResultSelector<'a> {
    /// `capacity` of `None` keeps every assignment offered.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            kept: BinaryHeap::new(),
            seen: 0,
        }
    }

    /// Offers the next complete assignment in enumeration order.
    pub fn offer(&mut self, classes: &[&'a Class], breakdown: ScoreBreakdown) {
        let candidate = Ranked {
            score: breakdown.total(),
            breakdown,
            seq: self.seen,
            classes: classes.to_vec(),
        };
        self.seen += 1;

        match self.capacity {
            Some(0) => {}
            Some(capacity) if self.kept.len() >= capacity => {
                let beats_worst = self
                    .kept
                    .peek()
                    .is_some_and(|Reverse(worst)| candidate > *worst);
                if beats_worst {
                    self.kept.pop();
                    self.kept.push(Reverse(candidate));
                }
            }
            _ => self.kept.push(Reverse(candidate)),
        }
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    /// Best first. Slots are grouped by class, classes in enumeration level order.
    pub fn into_timetables(self, scorer: &Scorer<'_>) -> Vec<Timetable> {
        // ascending order of Reverse is descending order of rank
        self.kept
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(ranked)| Timetable {
                score: ranked.score,
                breakdown: ranked.breakdown,
                slots: ranked
                    .classes
                    .iter()
                    .flat_map(|class| class.slots.iter().cloned())
                    .collect(),
                unmet_preferences: scorer.unmet_preferences(&ranked.classes),
            })
            .collect()
    }
}
