//! Depth-first enumeration of a user's complete, clash-free assignments.
//!
//! One level per lesson requirement, ordered by module code then lesson
//! type; candidates within a level are ordered by class number. The order
//! fixes which of several equally scored assignments is found first.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::clash::DayOccupancy;
use crate::data::{CandidateSet, Class};

/// One lesson requirement and the classes that may satisfy it.
#[derive(Debug, Clone)]
pub struct Level<'a> {
    pub module_code: &'a str,
    pub lesson_type: &'a str,
    pub candidates: Vec<&'a Class>,
}

/// The ordered levels of a search.
#[derive(Debug, Clone)]
pub struct SearchSpace<'a> {
    levels: Vec<Level<'a>>,
}

impl<'a> SearchSpace<'a> {
    pub fn new(candidates: &'a CandidateSet) -> Self {
        let levels = candidates
            .requirements()
            .map(|(module_code, lesson_type, classes)| {
                let mut candidates: Vec<&Class> = classes.iter().collect();
                candidates.sort_by(|a, b| a.class_no.cmp(&b.class_no));
                candidates.dedup_by(|a, b| a.class_no == b.class_no);
                Level {
                    module_code,
                    lesson_type,
                    candidates,
                }
            })
            .collect();
        Self { levels }
    }

    pub fn levels(&self) -> &[Level<'a>] {
        &self.levels
    }

    /// Number of raw combinations, `None` if it does not fit in `usize`.
    pub fn combinations(&self) -> Option<usize> {
        self.levels
            .iter()
            .try_fold(1usize, |acc, level| acc.checked_mul(level.candidates.len()))
    }
}

/// Caps on a single search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum number of class placements to attempt. `None` is unlimited.
    pub max_explored: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub explored: usize,
    pub complete: usize,
    pub truncated: bool,
    pub cancelled: bool,
}

pub struct Enumerator<'s, 'a> {
    space: &'s SearchSpace<'a>,
    limits: SearchLimits,
    cancel: Option<&'s AtomicBool>,
}

impl<'s, 'a> Enumerator<'s, 'a> {
    pub fn new(space: &'s SearchSpace<'a>, limits: SearchLimits) -> Self {
        Self {
            space,
            limits,
            cancel: None,
        }
    }

    /// Stops the search once `flag` is set. Checked before each placement.
    pub fn with_cancel(mut self, flag: &'s AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Runs the search, handing every complete assignment to `on_complete`
    /// in enumeration order. Classes are passed in level order.
    pub fn run<F>(&self, on_complete: F) -> SearchStats
    where
        F: FnMut(&[&'a Class]),
    {
        let levels = self.space.levels();
        let mut walk = Walk {
            levels,
            chosen: Vec::with_capacity(levels.len()),
            occupancy: DayOccupancy::new(),
            stats: SearchStats::default(),
            limits: self.limits,
            cancel: self.cancel,
            on_complete,
        };
        let _ = walk.descend(0);
        walk.stats
    }
}

struct Walk<'s, 'a, F> {
    levels: &'s [Level<'a>],
    chosen: Vec<&'a Class>,
    occupancy: DayOccupancy,
    stats: SearchStats,
    limits: SearchLimits,
    cancel: Option<&'s AtomicBool>,
    on_complete: F,
}

impl<'a, F> Walk<'_, 'a, F>
where
    F: FnMut(&[&'a Class]),
{
    fn descend(&mut self, depth: usize) -> ControlFlow<()> {
        let Some(level) = self.levels.get(depth) else {
            self.stats.complete += 1;
            (self.on_complete)(self.chosen.as_slice());
            return ControlFlow::Continue(());
        };

        for &class in &level.candidates {
            if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                self.stats.cancelled = true;
                return ControlFlow::Break(());
            }
            if self.limits.max_explored.is_some_and(|max| self.stats.explored >= max) {
                self.stats.truncated = true;
                return ControlFlow::Break(());
            }
            self.stats.explored += 1;

            // prune: nothing below a clashing prefix can be valid
            if !self.occupancy.try_place(&class.slots) {
                continue;
            }
            self.chosen.push(class);
            let flow = self.descend(depth + 1);
            self.chosen.pop();
            self.occupancy.release(&class.slots);
            flow?;
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clash::set_clashes;
    use crate::data::{Day, ModuleOptions, Slot};

    fn class(module_code: &str, lesson_type: &str, class_no: &str, slots: &[(Day, u32, u32)]) -> Class {
        Class {
            module_code: module_code.to_string(),
            lesson_type: lesson_type.to_string(),
            class_no: class_no.to_string(),
            slots: slots
                .iter()
                .map(|&(day, start, end)| Slot {
                    module_code: module_code.to_string(),
                    lesson_type: lesson_type.to_string(),
                    class_no: class_no.to_string(),
                    day,
                    start_time: start,
                    end_time: end,
                    venue: None,
                })
                .collect(),
        }
    }

    fn candidate_set(classes: Vec<Class>) -> CandidateSet {
        let mut set = CandidateSet::default();
        for class in classes {
            set.modules
                .entry(class.module_code.clone())
                .or_insert_with(ModuleOptions::new)
                .entry(class.lesson_type.clone())
                .or_default()
                .push(class);
        }
        set
    }

    fn collect(space: &SearchSpace<'_>, limits: SearchLimits) -> (Vec<Vec<String>>, SearchStats) {
        let mut found: Vec<Vec<String>> = Vec::new();
        let stats = Enumerator::new(space, limits).run(|chosen| {
            assert!(!set_clashes(chosen.iter().flat_map(|c| c.slots.iter())));
            found.push(chosen.iter().map(|c| format!("{}/{}", c.lesson_type, c.class_no)).collect());
        });
        (found, stats)
    }

    #[test]
    fn enumerates_in_level_then_class_order() {
        let set = candidate_set(vec![
            class("CS1010", "Tutorial", "T2", &[(Day::Tuesday, 600, 660)]),
            class("CS1010", "Lecture", "L1", &[(Day::Monday, 600, 720)]),
            class("CS1010", "Tutorial", "T1", &[(Day::Wednesday, 600, 660)]),
            class("CS1010", "Lecture", "L2", &[(Day::Thursday, 600, 720)]),
        ]);
        let space = SearchSpace::new(&set);
        assert_eq!(space.combinations(), Some(4));

        let (found, stats) = collect(&space, SearchLimits::default());
        assert_eq!(
            found,
            vec![
                vec!["Lecture/L1", "Tutorial/T1"],
                vec!["Lecture/L1", "Tutorial/T2"],
                vec!["Lecture/L2", "Tutorial/T1"],
                vec!["Lecture/L2", "Tutorial/T2"],
            ]
        );
        assert_eq!(stats.complete, 4);
        assert!(!stats.truncated);
    }

    #[test]
    fn prunes_clashing_prefixes() {
        let set = candidate_set(vec![
            class("CS1010", "Lecture", "L1", &[(Day::Monday, 600, 720)]),
            class("CS1010", "Tutorial", "T1", &[(Day::Monday, 660, 720)]),
            class("CS1010", "Tutorial", "T2", &[(Day::Monday, 720, 780)]),
        ]);
        let space = SearchSpace::new(&set);
        let (found, stats) = collect(&space, SearchLimits::default());
        assert_eq!(found, vec![vec!["Lecture/L1", "Tutorial/T2"]]);
        assert_eq!(stats.explored, 3);
    }

    #[test]
    fn unsatisfiable_input_yields_nothing() {
        let set = candidate_set(vec![
            class("CS1010", "Lecture", "L1", &[(Day::Monday, 600, 720)]),
            class("MA1521", "Lecture", "L1", &[(Day::Monday, 660, 780)]),
        ]);
        let space = SearchSpace::new(&set);
        let (found, stats) = collect(&space, SearchLimits::default());
        assert!(found.is_empty());
        assert_eq!(stats.complete, 0);
        assert!(!stats.truncated);
    }

    #[test]
    fn exploration_cap_truncates_but_keeps_results() {
        let set = candidate_set(vec![
            class("CS1010", "Lecture", "L1", &[(Day::Monday, 600, 720)]),
            class("CS1010", "Lecture", "L2", &[(Day::Tuesday, 600, 720)]),
            class("CS1010", "Tutorial", "T1", &[(Day::Wednesday, 600, 660)]),
            class("CS1010", "Tutorial", "T2", &[(Day::Thursday, 600, 660)]),
        ]);
        let space = SearchSpace::new(&set);
        let (found, stats) = collect(&space, SearchLimits { max_explored: Some(3) });
        assert_eq!(found.len(), 2);
        assert_eq!(stats.explored, 3);
        assert!(stats.truncated);
    }

    #[test]
    fn cancellation_stops_before_first_placement() {
        let set = candidate_set(vec![class("CS1010", "Lecture", "L1", &[(Day::Monday, 600, 720)])]);
        let space = SearchSpace::new(&set);
        let flag = AtomicBool::new(true);
        let mut calls = 0;
        let stats = Enumerator::new(&space, SearchLimits::default())
            .with_cancel(&flag)
            .run(|_| calls += 1);
        assert_eq!(calls, 0);
        assert!(stats.cancelled);
        assert_eq!(stats.explored, 0);
    }

    #[test]
    fn empty_candidate_set_has_one_empty_assignment() {
        let set = CandidateSet::default();
        let space = SearchSpace::new(&set);
        let (found, stats) = collect(&space, SearchLimits::default());
        assert_eq!(found, vec![Vec::<String>::new()]);
        assert_eq!(stats.complete, 1);
    }
}
