//! Group-aware weekly timetable optimiser.
//!
//! Each group member ticks candidate classes per lesson type; [`solver::solve`]
//! picks, for one member, the best clash-free combinations under a
//! preference profile while taking the other members' fixed classes into
//! account.

pub mod builder;
pub mod clash;
pub mod config;
pub mod data;
pub mod enumerate;
pub mod error;
pub mod scoring;
pub mod selector;
pub mod server;
pub mod solver;

pub use builder::{build_candidate_set, build_group, candidate_set_from_lessons};
pub use data::{CandidateSet, Day, GroupInput, PreferenceConfig, Slot, SolveOptions, SolveOutput, Timetable};
pub use error::MalformedInput;
pub use solver::{optimise_lessons, solve, solve_with_cancel};
