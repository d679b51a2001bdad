use thiserror::Error;

use crate::data::{Day, Minute};

/// Input the optimiser refuses to work with. The caller has to fix the
/// input and call again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedInput {
    #[error("target index {index} is out of range for a group of {members} members")]
    TargetOutOfRange { index: usize, members: usize },

    #[error("module {module_code} is not in the catalogue")]
    UnknownModule { module_code: String },

    #[error("module {module_code} has no {lesson_type} lessons")]
    UnknownLessonType { module_code: String, lesson_type: String },

    #[error("module {module_code} has no {lesson_type} class {class_no}")]
    UnknownClass {
        module_code: String,
        lesson_type: String,
        class_no: String,
    },

    #[error("no candidate classes selected for {module_code} {lesson_type}")]
    EmptyRequirement { module_code: String, lesson_type: String },

    #[error("invalid time {value:?}, expected HHMM")]
    InvalidTime { value: String },

    #[error("invalid day {value:?}")]
    InvalidDay { value: String },

    #[error("{module_code} {lesson_type} class {class_no} has an empty or inverted interval on {day} ({start}-{end})")]
    InvalidInterval {
        module_code: String,
        lesson_type: String,
        class_no: String,
        day: Day,
        start: Minute,
        end: Minute,
    },

    #[error(
        "slot of {slot_module} {slot_lesson_type} class {slot_class_no} is listed under {module_code} {lesson_type} class {class_no}"
    )]
    MismatchedSlot {
        module_code: String,
        lesson_type: String,
        class_no: String,
        slot_module: String,
        slot_lesson_type: String,
        slot_class_no: String,
    },

    #[error("{module_code} {lesson_type} class {class_no} meets twice at once on {day} ({first_start}-{first_end} and {second_start}-{second_end})")]
    OverlappingClassSlots {
        module_code: String,
        lesson_type: String,
        class_no: String,
        day: Day,
        first_start: Minute,
        first_end: Minute,
        second_start: Minute,
        second_end: Minute,
    },

    #[error("{module_code} {lesson_type} class {class_no} is listed twice with different slots")]
    ConflictingClass {
        module_code: String,
        lesson_type: String,
        class_no: String,
    },

    #[error("invalid preference: {0}")]
    InvalidPreference(String),
}

/// Environment configuration that could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}
