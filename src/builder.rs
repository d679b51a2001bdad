//! Turns raw selections into per-user candidate sets.
//!
//! Two entry points exist. [`build_candidate_set`] resolves ticked class
//! numbers against a [`Catalogue`]; [`candidate_set_from_lessons`] takes a
//! flat list of already-resolved lessons and groups them into classes.
//! Both reject anything that would leave a lesson requirement without
//! candidates.

use itertools::Itertools;
use std::collections::BTreeMap;

use crate::clash::overlaps;
use crate::data::{
    CandidateSet, Catalogue, Class, ClassNo, Day, LessonType, Minute, ModuleCode, ModuleLesson,
    ModuleOptions, RawLesson, Selection, Slot, MINUTES_PER_DAY,
};
use crate::error::MalformedInput;

/// Parses `HHMM` (or `HH:MM`) into minutes since midnight. `2400` is accepted
/// as end of day.
pub fn parse_time(value: &str) -> Result<Minute, MalformedInput> {
    let invalid = || MalformedInput::InvalidTime { value: value.to_string() };
    let trimmed = value.trim();
    let digits = match trimmed.split_once(':') {
        Some((hh, mm)) if hh.len() == 2 => format!("{hh}{mm}"),
        Some(_) => return Err(invalid()),
        None => trimmed.to_string(),
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: Minute = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: Minute = digits[2..].parse().map_err(|_| invalid())?;
    let total = hours * 60 + minutes;
    if minutes >= 60 || total > MINUTES_PER_DAY {
        return Err(invalid());
    }
    Ok(total)
}

/// Formats minutes since midnight as `HHMM`.
pub fn format_time(minute: Minute) -> String {
    format!("{:02}{:02}", minute / 60, minute % 60)
}

fn parse_day(value: &str) -> Result<Day, MalformedInput> {
    Day::from_name(value).ok_or_else(|| MalformedInput::InvalidDay { value: value.to_string() })
}

fn slot_from_lesson(module_code: &str, lesson: &RawLesson) -> Result<Slot, MalformedInput> {
    let slot = Slot {
        module_code: module_code.to_string(),
        lesson_type: lesson.lesson_type.clone(),
        class_no: lesson.class_no.clone(),
        day: parse_day(&lesson.day)?,
        start_time: parse_time(&lesson.start_time)?,
        end_time: parse_time(&lesson.end_time)?,
        venue: lesson.venue.clone(),
    };
    check_interval(&slot)?;
    Ok(slot)
}

/// Converts a slot back into the catalogue's row format.
pub fn lesson_from_slot(slot: &Slot) -> ModuleLesson {
    ModuleLesson {
        module_code: slot.module_code.clone(),
        lesson: RawLesson {
            class_no: slot.class_no.clone(),
            lesson_type: slot.lesson_type.clone(),
            day: slot.day.to_string(),
            start_time: format_time(slot.start_time),
            end_time: format_time(slot.end_time),
            venue: slot.venue.clone(),
        },
    }
}

fn check_interval(slot: &Slot) -> Result<(), MalformedInput> {
    if slot.start_time < slot.end_time && slot.end_time <= MINUTES_PER_DAY {
        return Ok(());
    }
    Err(MalformedInput::InvalidInterval {
        module_code: slot.module_code.clone(),
        lesson_type: slot.lesson_type.clone(),
        class_no: slot.class_no.clone(),
        day: slot.day,
        start: slot.start_time,
        end: slot.end_time,
    })
}

/// Orders slots by day and time and drops repeated rows of the same meeting.
fn normalize_slots(slots: &mut Vec<Slot>) {
    slots.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()).then_with(|| a.venue.cmp(&b.venue)));
    slots.dedup_by(|a, b| a.sort_key() == b.sort_key());
}

/// Slots must be normalized first; then only neighbours can overlap.
fn check_class_slots(class: &Class) -> Result<(), MalformedInput> {
    match class.slots.iter().tuple_windows().find(|(a, b)| overlaps(a, b)) {
        Some((first, second)) => Err(MalformedInput::OverlappingClassSlots {
            module_code: class.module_code.clone(),
            lesson_type: class.lesson_type.clone(),
            class_no: class.class_no.clone(),
            day: first.day,
            first_start: first.start_time,
            first_end: first.end_time,
            second_start: second.start_time,
            second_end: second.end_time,
        }),
        None => Ok(()),
    }
}

fn mismatched(module_code: &str, lesson_type: &str, class_no: &str, slot: (&str, &str, &str)) -> MalformedInput {
    MalformedInput::MismatchedSlot {
        module_code: module_code.to_string(),
        lesson_type: lesson_type.to_string(),
        class_no: class_no.to_string(),
        slot_module: slot.0.to_string(),
        slot_lesson_type: slot.1.to_string(),
        slot_class_no: slot.2.to_string(),
    }
}

/// Builds a class from its slots, dropping repeated identical rows and
/// ordering slots by day and time.
fn assemble_class(module_code: &str, lesson_type: &str, class_no: &str, mut slots: Vec<Slot>) -> Class {
    normalize_slots(&mut slots);
    Class {
        module_code: module_code.to_string(),
        lesson_type: lesson_type.to_string(),
        class_no: class_no.to_string(),
        slots,
    }
}

/// Every class a module offers, keyed by lesson type then class number.
fn module_classes(
    module_code: &str,
    lessons: &[RawLesson],
) -> Result<BTreeMap<LessonType, BTreeMap<ClassNo, Class>>, MalformedInput> {
    let grouped = lessons
        .iter()
        .map(|lesson| {
            slot_from_lesson(module_code, lesson)
                .map(|slot| ((lesson.lesson_type.clone(), lesson.class_no.clone()), slot))
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .into_group_map();

    let mut classes: BTreeMap<LessonType, BTreeMap<ClassNo, Class>> = BTreeMap::new();
    for ((lesson_type, class_no), slots) in grouped {
        let class = assemble_class(module_code, &lesson_type, &class_no, slots);
        classes.entry(lesson_type).or_default().insert(class_no, class);
    }
    Ok(classes)
}

/// Resolves one user's selection against the catalogue.
///
/// Every lesson type the catalogue lists for a selected module becomes a
/// requirement and must have at least one ticked class number.
pub fn build_candidate_set(catalogue: &Catalogue, selection: &Selection) -> Result<CandidateSet, MalformedInput> {
    let mut modules = BTreeMap::new();

    for (module_code, ticked) in selection {
        let lessons = catalogue
            .modules
            .get(module_code)
            .ok_or_else(|| MalformedInput::UnknownModule { module_code: module_code.clone() })?;
        let mut offered = module_classes(module_code, lessons)?;

        if let Some(lesson_type) = ticked.keys().find(|lesson_type| !offered.contains_key(*lesson_type)) {
            return Err(MalformedInput::UnknownLessonType {
                module_code: module_code.clone(),
                lesson_type: lesson_type.clone(),
            });
        }

        let mut options = ModuleOptions::new();
        for (lesson_type, classes) in offered.iter_mut() {
            let class_nos = ticked.get(lesson_type).map(Vec::as_slice).unwrap_or_default();
            if class_nos.is_empty() {
                return Err(MalformedInput::EmptyRequirement {
                    module_code: module_code.clone(),
                    lesson_type: lesson_type.clone(),
                });
            }

            let mut candidates = Vec::with_capacity(class_nos.len());
            for class_no in class_nos.iter().sorted().dedup() {
                let class = classes.get(class_no).ok_or_else(|| MalformedInput::UnknownClass {
                    module_code: module_code.clone(),
                    lesson_type: lesson_type.clone(),
                    class_no: class_no.clone(),
                })?;
                candidates.push(class.clone());
            }
            options.insert(lesson_type.clone(), candidates);
        }
        modules.insert(module_code.clone(), options);
    }

    Ok(CandidateSet { modules })
}

/// Builds candidate sets for every member of a group, in order.
pub fn build_group(catalogue: &Catalogue, selections: &[Selection]) -> Result<Vec<CandidateSet>, MalformedInput> {
    selections
        .iter()
        .map(|selection| build_candidate_set(catalogue, selection))
        .collect()
}

/// Groups a flat list of a user's lessons into classes. The lesson types
/// present for a module are that module's requirements.
pub fn candidate_set_from_lessons(lessons: &[ModuleLesson]) -> Result<CandidateSet, MalformedInput> {
    let grouped: BTreeMap<(ModuleCode, LessonType, ClassNo), Vec<Slot>> = lessons
        .iter()
        .map(|l| {
            slot_from_lesson(&l.module_code, &l.lesson).map(|slot| {
                let key = (l.module_code.clone(), l.lesson.lesson_type.clone(), l.lesson.class_no.clone());
                (key, slot)
            })
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .fold(BTreeMap::new(), |mut acc, (key, slot)| {
            acc.entry(key).or_insert_with(Vec::new).push(slot);
            acc
        });

    let mut modules: BTreeMap<ModuleCode, ModuleOptions> = BTreeMap::new();
    for ((module_code, lesson_type, class_no), slots) in grouped {
        let class = assemble_class(&module_code, &lesson_type, &class_no, slots);
        modules
            .entry(module_code)
            .or_default()
            .entry(lesson_type)
            .or_default()
            .push(class);
    }
    Ok(CandidateSet { modules })
}

impl CandidateSet {
    /// Checks the invariants the optimiser relies on and returns the set in
    /// canonical form.
    ///
    /// Every requirement must have candidates, every slot must sit under its
    /// own class, and every interval must be non-empty. Slots come back sorted
    /// by day and time with repeated rows dropped, and candidates sorted by
    /// class number. A class whose own slots overlap, or a class number listed
    /// twice with different slots, is rejected.
    pub fn normalized(&self) -> Result<CandidateSet, MalformedInput> {
        let mut modules: BTreeMap<ModuleCode, ModuleOptions> = BTreeMap::new();
        for (module_code, lesson_type, classes) in self.requirements() {
            if classes.is_empty() {
                return Err(MalformedInput::EmptyRequirement {
                    module_code: module_code.to_string(),
                    lesson_type: lesson_type.to_string(),
                });
            }

            let mut cleaned = Vec::with_capacity(classes.len());
            for class in classes {
                if class.module_code != module_code || class.lesson_type != lesson_type {
                    return Err(mismatched(
                        module_code,
                        lesson_type,
                        &class.class_no,
                        (&class.module_code, &class.lesson_type, &class.class_no),
                    ));
                }
                if let Some(slot) = class.slots.iter().find(|slot| !slot.belongs_to(class)) {
                    return Err(mismatched(
                        module_code,
                        lesson_type,
                        &class.class_no,
                        (&slot.module_code, &slot.lesson_type, &slot.class_no),
                    ));
                }
                class.slots.iter().try_for_each(check_interval)?;

                let mut class = class.clone();
                normalize_slots(&mut class.slots);
                check_class_slots(&class)?;
                cleaned.push(class);
            }

            cleaned.sort_by(|a, b| a.class_no.cmp(&b.class_no));
            let mut candidates: Vec<Class> = Vec::with_capacity(cleaned.len());
            for class in cleaned {
                match candidates.last() {
                    Some(kept) if kept.class_no == class.class_no => {
                        if kept.slots != class.slots {
                            return Err(MalformedInput::ConflictingClass {
                                module_code: module_code.to_string(),
                                lesson_type: lesson_type.to_string(),
                                class_no: class.class_no,
                            });
                        }
                    }
                    _ => candidates.push(class),
                }
            }

            modules
                .entry(module_code.to_string())
                .or_default()
                .insert(lesson_type.to_string(), candidates);
        }
        Ok(CandidateSet { modules })
    }

    pub fn validate(&self) -> Result<(), MalformedInput> {
        self.normalized().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(class_no: &str, lesson_type: &str, day: &str, start: &str, end: &str) -> RawLesson {
        RawLesson {
            class_no: class_no.to_string(),
            lesson_type: lesson_type.to_string(),
            day: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            venue: None,
        }
    }

    fn catalogue() -> Catalogue {
        let mut modules = BTreeMap::new();
        modules.insert(
            "CS2030".to_string(),
            vec![
                lesson("1", "Lecture", "Monday", "1000", "1200"),
                lesson("1", "Lecture", "Thursday", "1000", "1100"),
                lesson("2", "Lecture", "Tuesday", "1400", "1600"),
                lesson("01", "Tutorial", "Wednesday", "0900", "1000"),
                lesson("02", "Tutorial", "Wednesday", "1000", "1100"),
            ],
        );
        Catalogue { modules }
    }

    fn selection(entries: &[(&str, &str, &[&str])]) -> Selection {
        let mut selection = Selection::new();
        for (module_code, lesson_type, class_nos) in entries {
            selection
                .entry(module_code.to_string())
                .or_default()
                .insert(lesson_type.to_string(), class_nos.iter().map(|c| c.to_string()).collect());
        }
        selection
    }

    #[test]
    fn parses_and_formats_times() {
        assert_eq!(parse_time("0830"), Ok(510));
        assert_eq!(parse_time("14:45"), Ok(885));
        assert_eq!(parse_time("2400"), Ok(1440));
        assert!(parse_time("2401").is_err());
        assert!(parse_time("0860").is_err());
        assert!(parse_time("830").is_err());
        assert!(parse_time("1:2:30").is_err());
        assert!(parse_time("1:230").is_err());
        assert!(parse_time("12:3:0").is_err());
        assert_eq!(format_time(510), "0830");
    }

    #[test]
    fn resolves_multi_slot_classes() {
        let set = build_candidate_set(
            &catalogue(),
            &selection(&[("CS2030", "Lecture", &["1"]), ("CS2030", "Tutorial", &["02", "01"])]),
        )
        .unwrap();

        let lectures = &set.modules["CS2030"]["Lecture"];
        assert_eq!(lectures.len(), 1);
        assert_eq!(lectures[0].slots.len(), 2);
        assert_eq!(lectures[0].slots[0].day, Day::Monday);

        let tutorials: Vec<&str> = set.modules["CS2030"]["Tutorial"].iter().map(|c| c.class_no.as_str()).collect();
        assert_eq!(tutorials, vec!["01", "02"]);
        assert_eq!(set.requirement_count(), 2);
        set.validate().unwrap();
    }

    #[test]
    fn unknown_class_is_malformed() {
        let err = build_candidate_set(
            &catalogue(),
            &selection(&[("CS2030", "Lecture", &["9"]), ("CS2030", "Tutorial", &["01"])]),
        )
        .unwrap_err();
        assert!(matches!(err, MalformedInput::UnknownClass { ref class_no, .. } if class_no == "9"));
    }

    #[test]
    fn missing_lesson_type_is_malformed() {
        let err = build_candidate_set(&catalogue(), &selection(&[("CS2030", "Lecture", &["1"])])).unwrap_err();
        assert_eq!(
            err,
            MalformedInput::EmptyRequirement {
                module_code: "CS2030".to_string(),
                lesson_type: "Tutorial".to_string(),
            }
        );

        let err = build_candidate_set(
            &catalogue(),
            &selection(&[("CS2030", "Lecture", &[]), ("CS2030", "Tutorial", &["01"])]),
        )
        .unwrap_err();
        assert!(matches!(err, MalformedInput::EmptyRequirement { .. }));
    }

    #[test]
    fn unknown_module_is_malformed() {
        let err = build_candidate_set(&catalogue(), &selection(&[("MA1521", "Lecture", &["1"])])).unwrap_err();
        assert!(matches!(err, MalformedInput::UnknownModule { .. }));
    }

    #[test]
    fn groups_flat_lessons_and_drops_repeated_rows() {
        let row = |class_no: &str, lesson_type: &str, day: &str| ModuleLesson {
            module_code: "GEA1000".to_string(),
            lesson: lesson(class_no, lesson_type, day, "1200", "1400"),
        };
        let set = candidate_set_from_lessons(&[
            row("1", "Lecture", "Friday"),
            row("1", "Lecture", "Friday"),
            row("E1", "Tutorial", "Monday"),
            row("E2", "Tutorial", "Tuesday"),
        ])
        .unwrap();

        assert_eq!(set.modules["GEA1000"]["Lecture"][0].slots.len(), 1);
        assert_eq!(set.modules["GEA1000"]["Tutorial"].len(), 2);
        assert_eq!(set.fixed_classes().count(), 1);
    }

    #[test]
    fn inverted_interval_is_malformed() {
        let bad = ModuleLesson {
            module_code: "GEA1000".to_string(),
            lesson: lesson("1", "Lecture", "Friday", "1400", "1200"),
        };
        assert!(matches!(
            candidate_set_from_lessons(&[bad]),
            Err(MalformedInput::InvalidInterval { .. })
        ));
    }

    #[test]
    fn slot_round_trips_to_catalogue_row() {
        let row = ModuleLesson {
            module_code: "GEA1000".to_string(),
            lesson: lesson("1", "Lecture", "Friday", "0900", "1030"),
        };
        let slot = slot_from_lesson(&row.module_code, &row.lesson).unwrap();
        assert_eq!(lesson_from_slot(&slot), row);
    }

    fn class_with(class_no: &str, slots: &[(Day, Minute, Minute)]) -> Class {
        Class {
            module_code: "CS2030".to_string(),
            lesson_type: "Lecture".to_string(),
            class_no: class_no.to_string(),
            slots: slots
                .iter()
                .map(|&(day, start_time, end_time)| Slot {
                    module_code: "CS2030".to_string(),
                    lesson_type: "Lecture".to_string(),
                    class_no: class_no.to_string(),
                    day,
                    start_time,
                    end_time,
                    venue: None,
                })
                .collect(),
        }
    }

    fn lectures(classes: Vec<Class>) -> CandidateSet {
        let mut set = CandidateSet::default();
        set.modules
            .entry("CS2030".to_string())
            .or_default()
            .insert("Lecture".to_string(), classes);
        set
    }

    #[test]
    fn normalizing_sorts_slots_and_collapses_repeats() {
        let set = lectures(vec![
            class_with("2", &[(Day::Tuesday, 840, 960)]),
            class_with("1", &[(Day::Thursday, 600, 660), (Day::Monday, 600, 720), (Day::Monday, 600, 720)]),
            class_with("1", &[(Day::Monday, 600, 720), (Day::Thursday, 600, 660)]),
        ]);
        let normalized = set.normalized().unwrap();

        let classes = &normalized.modules["CS2030"]["Lecture"];
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].class_no, "1");
        let days: Vec<Day> = classes[0].slots.iter().map(|s| s.day).collect();
        assert_eq!(days, vec![Day::Monday, Day::Thursday]);
    }

    #[test]
    fn class_overlapping_itself_is_malformed() {
        let set = lectures(vec![class_with("1", &[(Day::Monday, 660, 780), (Day::Monday, 600, 720)])]);
        assert_eq!(
            set.validate(),
            Err(MalformedInput::OverlappingClassSlots {
                module_code: "CS2030".to_string(),
                lesson_type: "Lecture".to_string(),
                class_no: "1".to_string(),
                day: Day::Monday,
                first_start: 600,
                first_end: 720,
                second_start: 660,
                second_end: 780,
            })
        );
    }

    #[test]
    fn same_class_number_with_other_slots_is_malformed() {
        let set = lectures(vec![
            class_with("1", &[(Day::Monday, 600, 720)]),
            class_with("1", &[(Day::Friday, 600, 720)]),
        ]);
        assert!(matches!(set.validate(), Err(MalformedInput::ConflictingClass { ref class_no, .. }) if class_no == "1"));
    }

    #[test]
    fn mismatched_slot_names_both_classes() {
        let mut class = class_with("1", &[(Day::Monday, 600, 720)]);
        class.slots[0].class_no = "2".to_string();
        let err = lectures(vec![class]).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "slot of CS2030 Lecture class 2 is listed under CS2030 Lecture class 1"
        );
    }
}
