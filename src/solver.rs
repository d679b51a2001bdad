use log::{debug, info, trace};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::builder::{candidate_set_from_lessons, lesson_from_slot};
use crate::data::{CandidateSet, GroupInput, ModuleLesson, SolveOptions, SolveOutput};
use crate::enumerate::{Enumerator, SearchLimits, SearchSpace};
use crate::error::MalformedInput;
use crate::scoring::Scorer;
use crate::selector::ResultSelector;

/// Finds the best clash-free timetables for `input.target_index`, best first.
///
/// An empty `timetables` list means the target's own candidates admit no
/// clash-free combination; it is not an error.
pub fn solve(input: &GroupInput, options: &SolveOptions) -> Result<SolveOutput, MalformedInput> {
    run(input, options, None)
}

/// Like [`solve`], but stops early once `cancel` is set and returns what was
/// found so far.
pub fn solve_with_cancel(
    input: &GroupInput,
    options: &SolveOptions,
    cancel: &AtomicBool,
) -> Result<SolveOutput, MalformedInput> {
    run(input, options, Some(cancel))
}

fn run(input: &GroupInput, options: &SolveOptions, cancel: Option<&AtomicBool>) -> Result<SolveOutput, MalformedInput> {
    let start_time = Instant::now();

    if input.target_index >= input.members.len() {
        return Err(MalformedInput::TargetOutOfRange {
            index: input.target_index,
            members: input.members.len(),
        });
    }
    let input = GroupInput {
        members: input
            .members
            .iter()
            .map(CandidateSet::normalized)
            .collect::<Result<Vec<_>, _>>()?,
        target_index: input.target_index,
    };
    let target = &input.members[input.target_index];

    let scorer = Scorer::new(&options.preferences, &input)?;
    let space = SearchSpace::new(target);
    info!(
        "Optimising member {} of {}: {} lesson requirements, {} raw combinations.",
        input.target_index,
        input.members.len(),
        space.levels().len(),
        space
            .combinations()
            .map_or_else(|| "more than usize::MAX".to_string(), |n| n.to_string())
    );
    for level in space.levels() {
        trace!(
            "{} {}: {} candidate classes",
            level.module_code,
            level.lesson_type,
            level.candidates.len()
        );
    }

    let limits = SearchLimits {
        max_explored: options.exploration_cap(),
    };
    let mut enumerator = Enumerator::new(&space, limits);
    if let Some(flag) = cancel {
        enumerator = enumerator.with_cancel(flag);
    }

    let mut selector = ResultSelector::new(options.solution_cap());
    let stats = enumerator.run(|classes| selector.offer(classes, scorer.score(classes)));
    debug!(
        "Search explored {} placements, found {} complete timetables (truncated: {}, cancelled: {}).",
        stats.explored, stats.complete, stats.truncated, stats.cancelled
    );

    let timetables = selector.into_timetables(&scorer);
    info!(
        "Returning {} timetables in {:.2?}",
        timetables.len(),
        start_time.elapsed()
    );

    Ok(SolveOutput {
        timetables,
        explored: stats.explored,
        complete_found: stats.complete,
        truncated: stats.truncated,
        cancelled: stats.cancelled,
    })
}

/// Flat-lesson entry point: each member is a list of ticked lessons tagged
/// with their module. Returns one flat lesson list per timetable, best first.
pub fn optimise_lessons(
    timetables: &[Vec<ModuleLesson>],
    target_index: usize,
    options: &SolveOptions,
) -> Result<Vec<Vec<ModuleLesson>>, MalformedInput> {
    let members = timetables
        .iter()
        .map(|lessons| candidate_set_from_lessons(lessons))
        .collect::<Result<Vec<_>, _>>()?;
    let output = solve(&GroupInput { members, target_index }, options)?;

    Ok(output
        .timetables
        .iter()
        .map(|timetable| timetable.slots.iter().map(lesson_from_slot).collect())
        .collect())
}
