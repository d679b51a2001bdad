//! Soft-preference scoring of complete assignments. Higher is better.
//!
//! The score is a sum of independent terms, each switched off entirely when
//! its knob is disabled. Slots are always visited in `(day, start)` order so
//! the floating point sum does not depend on input order.

use crate::clash::overlap_minutes;
use crate::data::{
    Class, Day, GroupInput, Minute, PreferenceConfig, ScoreBreakdown, Slot, TimeRange, UnmetPreference,
    MINUTES_PER_DAY,
};
use crate::error::MalformedInput;

/// Bonus per occupied day, multiplied by how far from the bottom of the ranking the day sits.
pub const DAY_PREFERENCE_WEIGHT: f64 = 10.0;
/// Bonus per free stretch at least as long as the minimum break.
pub const BREAK_BONUS: f64 = 5.0;
/// Penalty per minute a same-day gap runs over the maximum.
pub const GAP_PENALTY_PER_MINUTE: f64 = 0.1;
/// Bonus per fixed slot of another member that falls in the target's free time on a day they both attend.
pub const GROUP_FREE_TIME_BONUS: f64 = 1.0;
/// Penalty per hour of the target's classes overlapping another member's fixed classes.
pub const GROUP_OVERLAP_PENALTY_PER_HOUR: f64 = 2.0;
/// Bonus when the target takes the very class another member is fixed to.
pub const SHARED_CLASS_BONUS: f64 = 3.0;

type DaySchedule<'a> = [Vec<&'a Slot>; 7];

fn day_schedule<'a>(assignment: &[&'a Class]) -> DaySchedule<'a> {
    let mut days: DaySchedule<'a> = std::array::from_fn(|_| Vec::new());
    for slot in assignment.iter().flat_map(|class| class.slots.iter()) {
        days[slot.day.index()].push(slot);
    }
    for slots in days.iter_mut() {
        slots.sort_by_key(|slot| slot.sort_key());
    }
    days
}

/// Gaps of positive length between consecutive slots of one day.
fn gaps<'a, 's>(slots: &'s [&'a Slot]) -> impl Iterator<Item = (&'a Slot, &'a Slot, Minute)> + 's {
    slots.windows(2).filter_map(|pair| {
        let gap = pair[1].start_time.saturating_sub(pair[0].end_time);
        (gap > 0).then_some((pair[0], pair[1], gap))
    })
}

/// Every free stretch of an occupied day, including before the first and after the last slot.
fn free_stretches(slots: &[&Slot]) -> Vec<(Minute, Minute)> {
    let mut free = Vec::new();
    let mut cursor = 0;
    for slot in slots {
        if slot.start_time > cursor {
            free.push((cursor, slot.start_time));
        }
        cursor = cursor.max(slot.end_time);
    }
    if cursor < MINUTES_PER_DAY {
        free.push((cursor, MINUTES_PER_DAY));
    }
    free
}

fn class_label(slot: &Slot) -> String {
    format!("{} {} {}", slot.module_code, slot.lesson_type, slot.class_no)
}

pub struct Scorer<'a> {
    day_bonus: [f64; 7],
    preferred: [bool; 7],
    ranked: bool,
    minimum_break: Option<Minute>,
    break_windows: Vec<TimeRange>,
    maximum_gap: Option<f64>,
    /// Fixed classes of the other members, with the member's index.
    context: Vec<(usize, &'a Class)>,
}

impl<'a> Scorer<'a> {
    pub fn new(preferences: &PreferenceConfig, group: &'a GroupInput) -> Result<Self, MalformedInput> {
        let ranking_len = preferences.preferred_day_ranking.len();
        let mut day_bonus = [0.0; 7];
        let mut preferred = [false; 7];
        for (rank, day) in preferences.preferred_day_ranking.iter().enumerate() {
            // a repeated day keeps its best rank
            if !preferred[day.index()] {
                preferred[day.index()] = true;
                day_bonus[day.index()] = DAY_PREFERENCE_WEIGHT * (ranking_len - rank) as f64;
            }
        }

        for window in &preferences.break_windows {
            if window.start >= window.end || window.end > MINUTES_PER_DAY {
                return Err(MalformedInput::InvalidPreference(format!(
                    "break window {}-{} is empty or extends past midnight",
                    window.start, window.end
                )));
            }
        }

        let maximum_gap = match preferences.maximum_gap_minutes {
            Some(gap) if !gap.is_finite() => {
                return Err(MalformedInput::InvalidPreference(format!("maximum gap {gap} is not a number")));
            }
            Some(gap) if gap < 0.0 => None,
            other => other,
        };

        let context = group
            .members
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != group.target_index)
            .flat_map(|(index, member)| member.fixed_classes().map(move |class| (index, class)))
            .collect();

        Ok(Self {
            day_bonus,
            preferred,
            ranked: ranking_len > 0,
            minimum_break: preferences.minimum_break_minutes,
            break_windows: preferences.break_windows.clone(),
            maximum_gap,
            context,
        })
    }

    pub fn score(&self, assignment: &[&Class]) -> ScoreBreakdown {
        let days = day_schedule(assignment);
        let mut breakdown = ScoreBreakdown::default();

        for day in Day::ALL {
            let slots = &days[day.index()];
            if slots.is_empty() {
                continue;
            }
            breakdown.day_preference += self.day_bonus[day.index()];

            if let Some(minimum) = self.minimum_break {
                breakdown.breaks += BREAK_BONUS * self.qualifying_breaks(slots, minimum) as f64;
            }

            if let Some(maximum) = self.maximum_gap {
                for (_, _, gap) in gaps(slots) {
                    let excess = gap as f64 - maximum;
                    if excess > 0.0 {
                        breakdown.gap_penalty -= GAP_PENALTY_PER_MINUTE * excess;
                    }
                }
            }
        }

        breakdown.group = self.group_term(assignment, &days);
        breakdown
    }

    /// Human-readable list of the preferences `assignment` does not meet.
    pub fn unmet_preferences(&self, assignment: &[&Class]) -> Vec<UnmetPreference> {
        let days = day_schedule(assignment);
        let mut unmet = Vec::new();

        for day in Day::ALL {
            let slots = &days[day.index()];
            if slots.is_empty() {
                continue;
            }

            if self.ranked && !self.preferred[day.index()] {
                unmet.push(UnmetPreference {
                    preference_type: "Preferred Days".to_string(),
                    description: format!("Classes on {day}, which is not a preferred day."),
                });
            }

            if let Some(minimum) = self.minimum_break {
                let considered = !self.break_windows.is_empty() || slots.len() > 1;
                if considered && self.qualifying_breaks(slots, minimum) == 0 {
                    unmet.push(UnmetPreference {
                        preference_type: "Minimum Break".to_string(),
                        description: format!("No free block of at least {minimum} minutes on {day}."),
                    });
                }
            }

            if let Some(maximum) = self.maximum_gap {
                for (before, after, gap) in gaps(slots) {
                    if gap as f64 > maximum {
                        unmet.push(UnmetPreference {
                            preference_type: "Maximum Gap".to_string(),
                            description: format!(
                                "{gap}-minute gap on {day} between {} and {} exceeds {maximum} minutes.",
                                class_label(before),
                                class_label(after)
                            ),
                        });
                    }
                }
            }
        }

        for &(member, other) in &self.context {
            if assignment.iter().any(|class| class.same_class(other)) {
                continue;
            }
            for busy in &other.slots {
                for slot in &days[busy.day.index()] {
                    let shared = overlap_minutes(slot, busy);
                    if shared > 0 {
                        unmet.push(UnmetPreference {
                            preference_type: "Group Overlap".to_string(),
                            description: format!(
                                "{} overlaps member {member}'s {} on {} for {shared} minutes.",
                                class_label(slot),
                                class_label(busy),
                                busy.day
                            ),
                        });
                    }
                }
            }
        }

        unmet
    }

    fn qualifying_breaks(&self, slots: &[&Slot], minimum: Minute) -> usize {
        if self.break_windows.is_empty() {
            return gaps(slots).filter(|&(_, _, gap)| gap >= minimum).count();
        }

        let free = free_stretches(slots);
        self.break_windows
            .iter()
            .map(|window| {
                free.iter()
                    .filter(|&&(start, end)| {
                        let clipped = end.min(window.end).saturating_sub(start.max(window.start));
                        clipped > 0 && clipped >= minimum
                    })
                    .count()
            })
            .sum()
    }

    fn group_term(&self, assignment: &[&Class], days: &DaySchedule<'_>) -> f64 {
        let mut term = 0.0;
        for &(_, other) in &self.context {
            if assignment.iter().any(|class| class.same_class(other)) {
                term += SHARED_CLASS_BONUS;
                continue;
            }
            for busy in &other.slots {
                let ours = &days[busy.day.index()];
                if ours.is_empty() {
                    continue;
                }
                let shared: Minute = ours.iter().map(|slot| overlap_minutes(slot, busy)).sum();
                if shared > 0 {
                    term -= GROUP_OVERLAP_PENALTY_PER_HOUR * shared as f64 / 60.0;
                } else {
                    term += GROUP_FREE_TIME_BONUS;
                }
            }
        }
        term
    }
}
