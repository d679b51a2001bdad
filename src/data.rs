use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Type aliases for clarity
pub type ModuleCode = String;
pub type LessonType = String;
pub type ClassNo = String;
/// Minutes since midnight.
pub type Minute = u32;

pub const MINUTES_PER_DAY: Minute = 24 * 60;

/// A weekday. Ordered in calendar order, Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Day {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Sunday,
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u64) -> Option<Day> {
        Day::ALL.get(usize::try_from(index).ok()?).copied()
    }

    /// Accepts full names and three-letter abbreviations, ignoring case.
    pub fn from_name(name: &str) -> Option<Day> {
        let lower = name.trim().to_ascii_lowercase();
        Day::ALL.into_iter().find(|day| {
            let full = day.name().to_ascii_lowercase();
            lower == full || (lower.len() == 3 && full.starts_with(&lower))
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Day::Sunday => "Sunday",
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Day {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DayVisitor;

        impl Visitor<'_> for DayVisitor {
            type Value = Day;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a weekday name or an index from 0 (Sunday) to 6 (Saturday)")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Day, E> {
                Day::from_name(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Day, E> {
                Day::from_index(v).ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Day, E> {
                u64::try_from(v)
                    .ok()
                    .and_then(Day::from_index)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(v), &self))
            }
        }

        deserializer.deserialize_any(DayVisitor)
    }
}

/// One weekly occupied interval `[start_time, end_time)` of a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub module_code: ModuleCode,
    pub lesson_type: LessonType,
    pub class_no: ClassNo,
    pub day: Day,
    pub start_time: Minute,
    pub end_time: Minute,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

impl Slot {
    /// Sort key used wherever slots must be visited in a stable order.
    pub fn sort_key(&self) -> (Day, Minute, Minute) {
        (self.day, self.start_time, self.end_time)
    }

    pub fn belongs_to(&self, class: &Class) -> bool {
        self.module_code == class.module_code
            && self.lesson_type == class.lesson_type
            && self.class_no == class.class_no
    }
}

/// A selectable meeting pattern. Always chosen or dropped as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub module_code: ModuleCode,
    pub lesson_type: LessonType,
    pub class_no: ClassNo,
    pub slots: Vec<Slot>,
}

impl Class {
    pub fn same_class(&self, other: &Class) -> bool {
        self.module_code == other.module_code
            && self.lesson_type == other.lesson_type
            && self.class_no == other.class_no
    }
}

/// Candidate classes of one module, keyed by lesson type.
pub type ModuleOptions = BTreeMap<LessonType, Vec<Class>>;

/// A user's search space: module code -> lesson type -> acceptable classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateSet {
    pub modules: BTreeMap<ModuleCode, ModuleOptions>,
}

impl CandidateSet {
    /// Iterates `(module, lesson type, candidates)` in module then lesson type order.
    pub fn requirements(&self) -> impl Iterator<Item = (&str, &str, &[Class])> + '_ {
        self.modules.iter().flat_map(|(module_code, options)| {
            options
                .iter()
                .map(move |(lesson_type, classes)| (module_code.as_str(), lesson_type.as_str(), classes.as_slice()))
        })
    }

    pub fn requirement_count(&self) -> usize {
        self.modules.values().map(|options| options.len()).sum()
    }

    /// Requirements already narrowed down to a single class.
    pub fn fixed_classes(&self) -> impl Iterator<Item = &Class> + '_ {
        self.requirements().filter_map(|(_, _, classes)| match classes {
            [only] => Some(only),
            _ => None,
        })
    }
}

/// Candidate sets of every group member plus the member being optimised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    pub members: Vec<CandidateSet>,
    pub target_index: usize,
}

/// A time-of-day range `[start, end)` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Minute,
    pub end: Minute,
}

/// Soft preferences. `None` disables a knob entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceConfig {
    #[serde(default)]
    pub preferred_day_ranking: Vec<Day>,
    #[serde(default)]
    pub minimum_break_minutes: Option<Minute>,
    /// Where breaks are looked for. Empty means between consecutive classes only.
    #[serde(default)]
    pub break_windows: Vec<TimeRange>,
    #[serde(default)]
    pub maximum_gap_minutes: Option<f64>,
}

/// A catalogue row as published by the upstream module catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLesson {
    pub class_no: ClassNo,
    pub lesson_type: LessonType,
    pub day: String,
    /// `HHMM`, e.g. `"0830"`.
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

/// A catalogue row tagged with its module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleLesson {
    pub module_code: ModuleCode,
    #[serde(flatten)]
    pub lesson: RawLesson,
}

/// Module code -> every lesson row the module offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalogue {
    pub modules: BTreeMap<ModuleCode, Vec<RawLesson>>,
}

/// A user's ticked class numbers: module code -> lesson type -> class numbers.
pub type Selection = BTreeMap<ModuleCode, BTreeMap<LessonType, Vec<ClassNo>>>;

/// Describes a soft preference that the returned timetable does not meet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetPreference {
    pub preference_type: String,
    pub description: String,
}

impl fmt::Display for UnmetPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.preference_type, self.description)
    }
}

/// Per-term contributions to a timetable's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub day_preference: f64,
    pub breaks: f64,
    pub gap_penalty: f64,
    pub group: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.day_preference + self.breaks + self.gap_penalty + self.group
    }
}

/// One complete, clash-free timetable for the target member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Grouped by class, classes in module then lesson type order.
    pub slots: Vec<Slot>,
    pub unmet_preferences: Vec<UnmetPreference>,
}

/// The final output of the optimiser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOutput {
    pub timetables: Vec<Timetable>,
    /// Class placements attempted during the search.
    pub explored: usize,
    pub complete_found: usize,
    /// The exploration cap stopped the search early.
    pub truncated: bool,
    pub cancelled: bool,
}

/// Per-call knobs of the optimiser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOptions {
    /// Non-positive or absent returns every complete timetable found.
    #[serde(default)]
    pub max_solutions: Option<i64>,
    #[serde(default)]
    pub preferences: PreferenceConfig,
    /// Cap on class placements attempted. Absent or `0` is unlimited.
    #[serde(default)]
    pub search_limit: Option<usize>,
}

impl SolveOptions {
    pub fn solution_cap(&self) -> Option<usize> {
        self.max_solutions
            .filter(|&n| n > 0)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
    }

    pub fn exploration_cap(&self) -> Option<usize> {
        self.search_limit.filter(|&n| n > 0)
    }
}
