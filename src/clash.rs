//! Interval clash detection.
//!
//! Two slots clash when they share a day and their half-open intervals
//! intersect with non-zero length. Touching endpoints (`a.end == b.start`)
//! never clash.

use crate::data::{Day, Minute, Slot};

/// True iff `a` and `b` are on the same day and overlap.
pub fn overlaps(a: &Slot, b: &Slot) -> bool {
    a.day == b.day && a.start_time < b.end_time && b.start_time < a.end_time
}

/// Minutes shared by two slots, 0 on different days.
pub fn overlap_minutes(a: &Slot, b: &Slot) -> Minute {
    if a.day != b.day {
        return 0;
    }
    let start = a.start_time.max(b.start_time);
    let end = a.end_time.min(b.end_time);
    end.saturating_sub(start)
}

/// True iff any two slots in the list overlap.
pub fn set_clashes<'a, I>(slots: I) -> bool
where
    I: IntoIterator<Item = &'a Slot>,
{
    let mut sorted: Vec<&Slot> = slots.into_iter().collect();
    sorted.sort_by_key(|s| s.sort_key());

    let mut reach: Option<(Day, Minute)> = None;
    for slot in sorted {
        match reach {
            Some((day, end)) if day == slot.day && slot.start_time < end => return true,
            Some((day, end)) if day == slot.day => reach = Some((day, end.max(slot.end_time))),
            _ => reach = Some((slot.day, slot.end_time)),
        }
    }
    false
}

/// Committed intervals of a partial assignment, bucketed per day and kept
/// sorted by start. Committed intervals never overlap each other.
#[derive(Debug, Default, Clone)]
pub struct DayOccupancy {
    days: [Vec<(Minute, Minute)>; 7],
}

impl DayOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `slot` can be committed without clashing.
    pub fn fits(&self, slot: &Slot) -> bool {
        let bucket = &self.days[slot.day.index()];
        let at = bucket.partition_point(|&(start, _)| start < slot.start_time);
        if at > 0 && bucket[at - 1].1 > slot.start_time {
            return false;
        }
        match bucket.get(at) {
            Some(&(start, _)) => start >= slot.end_time,
            None => true,
        }
    }

    /// Commits all of `slots` or none of them. Returns whether they were committed.
    pub fn try_place(&mut self, slots: &[Slot]) -> bool {
        for (placed, slot) in slots.iter().enumerate() {
            if !self.fits(slot) {
                self.release(&slots[..placed]);
                return false;
            }
            self.insert(slot);
        }
        true
    }

    /// Removes previously committed slots.
    pub fn release(&mut self, slots: &[Slot]) {
        for slot in slots {
            let bucket = &mut self.days[slot.day.index()];
            if let Ok(at) = bucket.binary_search(&(slot.start_time, slot.end_time)) {
                bucket.remove(at);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|bucket| bucket.is_empty())
    }

    fn insert(&mut self, slot: &Slot) {
        let bucket = &mut self.days[slot.day.index()];
        let at = bucket.partition_point(|&(start, _)| start < slot.start_time);
        bucket.insert(at, (slot.start_time, slot.end_time));
    }
}
