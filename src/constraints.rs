//! The hard constraints of a timetable model.
//!
//! Which constraint families exist for a model is decided by [`POLICY`], a
//! table from [`ConstraintKind`] to the [`Condition`]s that must hold. Model
//! level conditions are evaluated once per build; tuple level conditions
//! once per generated tuple. Instances are stored in verification order.

use crate::model::{Cell, TimetableModel};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;

/// Named constraint families, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKind {
    WeeklyCoverage,
    ClassNoOverlap,
    DailyCap,
    TeacherAvailability,
    RoomExclusivity,
    RoomConsistency,
    RoomPreference,
    Contiguity,
    FirstLastExclusion,
    RoomContinuity,
    TeacherNoOverlap,
    ClassDailyLoad,
    DaySpread,
    FixedSlot,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::WeeklyCoverage => "Weekly coverage",
            ConstraintKind::ClassNoOverlap => "Class double-booking",
            ConstraintKind::DailyCap => "Daily cap",
            ConstraintKind::TeacherAvailability => "Teacher availability",
            ConstraintKind::RoomExclusivity => "Room exclusivity",
            ConstraintKind::RoomConsistency => "Room consistency",
            ConstraintKind::RoomPreference => "Room preference",
            ConstraintKind::Contiguity => "Contiguity",
            ConstraintKind::FirstLastExclusion => "First/last exclusion",
            ConstraintKind::RoomContinuity => "Room continuity",
            ConstraintKind::TeacherNoOverlap => "Teacher double-booking",
            ConstraintKind::ClassDailyLoad => "Class daily load",
            ConstraintKind::DaySpread => "Days per week",
            ConstraintKind::FixedSlot => "Fixed slot",
        };
        f.write_str(name)
    }
}

/// A predicate gating generation of a constraint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    // model level
    RoomsModeled,
    ContiguityEnabled,
    TeacherOverlapEnabled,
    MultipleSlots,
    // tuple level
    QuotaDeclared,
    TeacherUnavailable,
    RestrictedRooms,
    SharedTeacher,
    LoadCapDeclared,
    DayBoundsDeclared,
    CellFixed,
}

/// What a tuple level condition is evaluated against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target {
    pub course: Option<usize>,
    pub class: Option<usize>,
    pub teacher: Option<usize>,
    pub day: Option<usize>,
    pub cell: Option<Cell>,
}

impl Condition {
    /// `Some` for model level conditions, `None` for tuple level ones.
    fn at_model_level(self, model: &TimetableModel) -> Option<bool> {
        match self {
            Condition::RoomsModeled => Some(model.rooms_modeled()),
            Condition::ContiguityEnabled => Some(model.options().contiguity),
            Condition::TeacherOverlapEnabled => Some(model.options().teacher_overlap),
            Condition::MultipleSlots => Some(model.slots().len() > 1),
            _ => None,
        }
    }

    fn holds(self, model: &TimetableModel, target: &Target) -> bool {
        let course = target.course.map(|c| &model.courses()[c]);
        match self {
            Condition::QuotaDeclared => course.is_some_and(|c| c.hours.is_some()),
            Condition::TeacherUnavailable => match (course, target.day) {
                (Some(c), Some(day)) => !c.is_open_on(day),
                _ => false,
            },
            Condition::RestrictedRooms => course.is_some_and(|c| c.restricted_rooms),
            Condition::SharedTeacher => target
                .teacher
                .is_some_and(|t| model.teacher_courses(t).len() > 1),
            Condition::LoadCapDeclared => target
                .class
                .is_some_and(|c| model.classes()[c].max_hours_per_day.is_some()),
            Condition::DayBoundsDeclared => {
                course.is_some_and(|c| c.min_days.is_some() || c.max_days.is_some())
            }
            Condition::CellFixed => target.cell.is_some_and(|cell| model.fixed(cell).is_some()),
            other => other.at_model_level(model).unwrap_or(false),
        }
    }
}

/// The conditions under which a family is generated. An empty list means
/// "generate unconditionally".
pub type Policy = &'static [Condition];

pub const POLICY: [(ConstraintKind, Policy); 14] = [
    (ConstraintKind::WeeklyCoverage, &[Condition::QuotaDeclared]),
    (ConstraintKind::ClassNoOverlap, &[]),
    (ConstraintKind::DailyCap, &[]),
    (ConstraintKind::TeacherAvailability, &[Condition::TeacherUnavailable]),
    (ConstraintKind::RoomExclusivity, &[Condition::RoomsModeled]),
    (ConstraintKind::RoomConsistency, &[Condition::RoomsModeled]),
    (
        ConstraintKind::RoomPreference,
        &[Condition::RoomsModeled, Condition::RestrictedRooms],
    ),
    (ConstraintKind::Contiguity, &[Condition::ContiguityEnabled]),
    (ConstraintKind::FirstLastExclusion, &[Condition::MultipleSlots]),
    (
        ConstraintKind::RoomContinuity,
        &[Condition::RoomsModeled, Condition::MultipleSlots],
    ),
    (
        ConstraintKind::TeacherNoOverlap,
        &[Condition::TeacherOverlapEnabled, Condition::SharedTeacher],
    ),
    (ConstraintKind::ClassDailyLoad, &[Condition::LoadCapDeclared]),
    (ConstraintKind::DaySpread, &[Condition::DayBoundsDeclared]),
    (ConstraintKind::FixedSlot, &[Condition::CellFixed]),
];

/// A policy row resolved against one model.
struct Gate {
    enabled: bool,
    per_tuple: Vec<Condition>,
}

impl Gate {
    fn resolve(policy: Policy, model: &TimetableModel) -> Self {
        let mut enabled = true;
        let mut per_tuple = Vec::new();
        for condition in policy {
            match condition.at_model_level(model) {
                Some(holds) => enabled &= holds,
                None => per_tuple.push(*condition),
            }
        }
        Self { enabled, per_tuple }
    }

    fn admits(&self, model: &TimetableModel, target: &Target) -> bool {
        self.enabled && self.per_tuple.iter().all(|c| c.holds(model, target))
    }
}

/// One generated hard constraint, bound to its tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Σ over (day, slot) of the course's indicators equals `hours`.
    WeeklyCoverage { course: usize, hours: u32 },
    ClassNoOverlap { class: usize, day: usize, slot: usize },
    DailyCap { course: usize, day: usize, cap: u32 },
    /// Every indicator of the course on `day` is 0.
    TeacherAvailability { course: usize, day: usize },
    RoomExclusivity { day: usize, slot: usize, room: usize },
    /// Exactly one room when taught, none otherwise.
    RoomConsistency { course: usize, day: usize, slot: usize },
    /// Only rooms from the course's permitted list are used.
    RoomPreference { course: usize },
    Contiguity { course: usize, day: usize },
    /// First and last slot both taught implies the whole day is taught.
    FirstLastExclusion { course: usize, day: usize },
    /// `slot` and the next slot both taught implies the same room.
    RoomContinuity { course: usize, day: usize, slot: usize },
    TeacherNoOverlap { teacher: usize, day: usize, slot: usize },
    ClassDailyLoad { class: usize, day: usize, cap: u32 },
    DaySpread {
        course: usize,
        min: Option<u32>,
        max: Option<u32>,
    },
    FixedSlot { cell: Cell, value: bool },
}

impl Constraint {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::WeeklyCoverage { .. } => ConstraintKind::WeeklyCoverage,
            Constraint::ClassNoOverlap { .. } => ConstraintKind::ClassNoOverlap,
            Constraint::DailyCap { .. } => ConstraintKind::DailyCap,
            Constraint::TeacherAvailability { .. } => ConstraintKind::TeacherAvailability,
            Constraint::RoomExclusivity { .. } => ConstraintKind::RoomExclusivity,
            Constraint::RoomConsistency { .. } => ConstraintKind::RoomConsistency,
            Constraint::RoomPreference { .. } => ConstraintKind::RoomPreference,
            Constraint::Contiguity { .. } => ConstraintKind::Contiguity,
            Constraint::FirstLastExclusion { .. } => ConstraintKind::FirstLastExclusion,
            Constraint::RoomContinuity { .. } => ConstraintKind::RoomContinuity,
            Constraint::TeacherNoOverlap { .. } => ConstraintKind::TeacherNoOverlap,
            Constraint::ClassDailyLoad { .. } => ConstraintKind::ClassDailyLoad,
            Constraint::DaySpread { .. } => ConstraintKind::DaySpread,
            Constraint::FixedSlot { .. } => ConstraintKind::FixedSlot,
        }
    }
}

/// All hard constraints of a model, in verification order.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    items: Vec<Constraint>,
}

impl ConstraintSet {
    /// Generates every family admitted by [`POLICY`] for `model`.
    pub fn generate(model: &TimetableModel) -> Self {
        let mut items = Vec::new();
        for (kind, policy) in POLICY {
            let gate = Gate::resolve(policy, model);
            if !gate.enabled {
                continue;
            }
            generate_kind(kind, &gate, model, &mut items);
        }
        Self { items }
    }

    /// Swaps the fixed-slot family for the given pins/forbids.
    pub(crate) fn replace_fixed(&mut self, fixed: &BTreeMap<Cell, bool>) {
        self.items.retain(|c| c.kind() != ConstraintKind::FixedSlot);
        self.items.extend(
            fixed
                .iter()
                .map(|(cell, value)| Constraint::FixedSlot {
                    cell: *cell,
                    value: *value,
                }),
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: ConstraintKind) -> impl Iterator<Item = &Constraint> {
        self.items.iter().filter(move |c| c.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn counts(&self) -> BTreeMap<ConstraintKind, usize> {
        self.items.iter().map(Constraint::kind).counts().into_iter().collect()
    }
}

fn generate_kind(
    kind: ConstraintKind,
    gate: &Gate,
    model: &TimetableModel,
    out: &mut Vec<Constraint>,
) {
    let days = model.days().len();
    let slots = model.slots().len();
    let course_days = || {
        (0..model.courses().len()).flat_map(move |course| (0..days).map(move |day| (course, day)))
    };
    let for_course = |course: usize| Target {
        course: Some(course),
        ..Target::default()
    };
    let for_course_day = |course: usize, day: usize| Target {
        course: Some(course),
        day: Some(day),
        ..Target::default()
    };

    match kind {
        ConstraintKind::WeeklyCoverage => {
            for (course, c) in model.courses().iter().enumerate() {
                if let (true, Some(hours)) = (gate.admits(model, &for_course(course)), c.hours) {
                    out.push(Constraint::WeeklyCoverage { course, hours });
                }
            }
        }
        ConstraintKind::ClassNoOverlap => {
            for class in 0..model.classes().len() {
                for (day, slot) in (0..days).cartesian_product(0..slots) {
                    out.push(Constraint::ClassNoOverlap { class, day, slot });
                }
            }
        }
        ConstraintKind::DailyCap => {
            for (course, day) in course_days() {
                let cap = model.courses()[course].daily_cap;
                out.push(Constraint::DailyCap { course, day, cap });
            }
        }
        ConstraintKind::TeacherAvailability => {
            for (course, day) in course_days() {
                if gate.admits(model, &for_course_day(course, day)) {
                    out.push(Constraint::TeacherAvailability { course, day });
                }
            }
        }
        ConstraintKind::RoomExclusivity => {
            for (room, entry) in model.rooms().iter().enumerate() {
                if entry.overflow {
                    continue;
                }
                for (day, slot) in (0..days).cartesian_product(0..slots) {
                    out.push(Constraint::RoomExclusivity { day, slot, room });
                }
            }
        }
        ConstraintKind::RoomConsistency => {
            for (course, day) in course_days() {
                for slot in 0..slots {
                    out.push(Constraint::RoomConsistency { course, day, slot });
                }
            }
        }
        ConstraintKind::RoomPreference => {
            for course in 0..model.courses().len() {
                if gate.admits(model, &for_course(course)) {
                    out.push(Constraint::RoomPreference { course });
                }
            }
        }
        ConstraintKind::Contiguity => {
            for (course, day) in course_days() {
                out.push(Constraint::Contiguity { course, day });
            }
        }
        ConstraintKind::FirstLastExclusion => {
            for (course, day) in course_days() {
                out.push(Constraint::FirstLastExclusion { course, day });
            }
        }
        ConstraintKind::RoomContinuity => {
            for (course, day) in course_days() {
                for slot in 0..slots.saturating_sub(1) {
                    out.push(Constraint::RoomContinuity { course, day, slot });
                }
            }
        }
        ConstraintKind::TeacherNoOverlap => {
            for teacher in 0..model.teachers().len() {
                let target = Target {
                    teacher: Some(teacher),
                    ..Target::default()
                };
                if !gate.admits(model, &target) {
                    continue;
                }
                for (day, slot) in (0..days).cartesian_product(0..slots) {
                    out.push(Constraint::TeacherNoOverlap { teacher, day, slot });
                }
            }
        }
        ConstraintKind::ClassDailyLoad => {
            for (class, entry) in model.classes().iter().enumerate() {
                let target = Target {
                    class: Some(class),
                    ..Target::default()
                };
                if let (true, Some(cap)) = (gate.admits(model, &target), entry.max_hours_per_day) {
                    for day in 0..days {
                        out.push(Constraint::ClassDailyLoad { class, day, cap });
                    }
                }
            }
        }
        ConstraintKind::DaySpread => {
            for (course, c) in model.courses().iter().enumerate() {
                if gate.admits(model, &for_course(course)) {
                    out.push(Constraint::DaySpread {
                        course,
                        min: c.min_days,
                        max: c.max_days,
                    });
                }
            }
        }
        ConstraintKind::FixedSlot => {
            for (&cell, &value) in model.fixed_cells() {
                let target = Target {
                    cell: Some(cell),
                    ..Target::default()
                };
                if gate.admits(model, &target) {
                    out.push(Constraint::FixedSlot { cell, value });
                }
            }
        }
    }
}
