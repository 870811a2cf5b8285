//! Checking a concrete assignment against a model.
//!
//! [`verify`] walks the constraint set in its stored order and reports every
//! violated instance; [`objective`] evaluates the objective the backends
//! maximise. Solutions from either backend go through both before they are
//! reported.

use crate::constraints::{Constraint, ConstraintKind};
use crate::model::{Cell, TimetableModel};
use std::fmt;

/// A 0/1 value for every assignment indicator, plus the room chosen for each
/// taught cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    days: usize,
    slots: usize,
    taught: Vec<bool>,
    rooms: Vec<Option<usize>>,
}

impl Assignment {
    pub fn new(model: &TimetableModel) -> Self {
        let cells = model.num_cells();
        Self {
            days: model.days().len(),
            slots: model.slots().len(),
            taught: vec![false; cells],
            rooms: vec![None; cells],
        }
    }

    fn index(&self, cell: Cell) -> usize {
        (cell.course * self.days + cell.day) * self.slots + cell.slot
    }

    pub fn teach(&mut self, cell: Cell, room: Option<usize>) {
        let i = self.index(cell);
        self.taught[i] = true;
        self.rooms[i] = room;
    }

    pub fn clear(&mut self, cell: Cell) {
        let i = self.index(cell);
        self.taught[i] = false;
        self.rooms[i] = None;
    }

    pub fn is_taught(&self, cell: Cell) -> bool {
        self.taught[self.index(cell)]
    }

    pub fn room(&self, cell: Cell) -> Option<usize> {
        self.rooms[self.index(cell)]
    }

    /// Slots of `course` taught on `day`, in slot order.
    pub fn day_pattern(&self, course: usize, day: usize) -> impl Iterator<Item = bool> + '_ {
        (0..self.slots).map(move |slot| self.is_taught(Cell::new(course, day, slot)))
    }

    pub fn hours_on(&self, course: usize, day: usize) -> u32 {
        self.day_pattern(course, day).filter(|t| *t).count() as u32
    }

    pub fn hours(&self, course: usize) -> u32 {
        (0..self.days).map(|day| self.hours_on(course, day)).sum()
    }

    pub fn days_used(&self, course: usize) -> u32 {
        (0..self.days)
            .filter(|&day| self.hours_on(course, day) > 0)
            .count() as u32
    }

    /// Every taught cell with its room, course-major.
    pub fn taught_cells(&self) -> impl Iterator<Item = (Cell, Option<usize>)> + '_ {
        let per_course = self.days * self.slots;
        self.taught
            .iter()
            .enumerate()
            .filter(|(_, taught)| **taught)
            .map(move |(i, _)| {
                let cell = Cell::new(i / per_course, (i % per_course) / self.slots, i % self.slots);
                (cell, self.rooms[i])
            })
    }
}

/// One violated constraint instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: ConstraintKind,
    pub description: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.description)
    }
}

/// Number of maximal runs of taught slots in a day pattern.
pub fn count_runs(pattern: impl Iterator<Item = bool>) -> u32 {
    let mut runs = 0;
    let mut previous = false;
    for taught in pattern {
        if taught && !previous {
            runs += 1;
        }
        previous = taught;
    }
    runs
}

/// Checks `assignment` against every constraint of `model`, in order.
pub fn verify(model: &TimetableModel, assignment: &Assignment) -> Vec<Violation> {
    let slots = model.slots().len();
    let name = |course: usize| format!("{}/{}", model.class_of(course), model.subject_of(course));
    let at = |day: usize, slot: usize| format!("{} {}", model.days()[day], model.slots()[slot]);
    let mut violations = Vec::new();
    let mut fail = |kind: ConstraintKind, description: String| {
        violations.push(Violation { kind, description });
    };

    for constraint in model.constraints().iter() {
        let kind = constraint.kind();
        match *constraint {
            Constraint::WeeklyCoverage { course, hours } => {
                let taught = assignment.hours(course);
                if taught != hours {
                    fail(kind, format!("{} has {taught} hours, needs {hours}", name(course)));
                }
            }
            Constraint::ClassNoOverlap { class, day, slot } => {
                let taught = model
                    .class_courses(class)
                    .iter()
                    .filter(|&&c| assignment.is_taught(Cell::new(c, day, slot)))
                    .count();
                if taught > 1 {
                    fail(
                        kind,
                        format!(
                            "class {} has {taught} subjects at {}",
                            model.classes()[class].id,
                            at(day, slot)
                        ),
                    );
                }
            }
            Constraint::DailyCap { course, day, cap } => {
                let taught = assignment.hours_on(course, day);
                if taught > cap {
                    fail(
                        kind,
                        format!(
                            "{} has {taught} hours on {}, cap {cap}",
                            name(course),
                            model.days()[day]
                        ),
                    );
                }
            }
            Constraint::TeacherAvailability { course, day } => {
                if assignment.hours_on(course, day) > 0 {
                    fail(
                        kind,
                        format!(
                            "{} is taught on {} but its teacher is away",
                            name(course),
                            model.days()[day]
                        ),
                    );
                }
            }
            Constraint::RoomExclusivity { day, slot, room } => {
                let users = model
                    .room_courses(room)
                    .iter()
                    .filter(|&&c| {
                        let cell = Cell::new(c, day, slot);
                        assignment.is_taught(cell) && assignment.room(cell) == Some(room)
                    })
                    .count();
                if users > 1 {
                    fail(
                        kind,
                        format!(
                            "room {} hosts {users} sessions at {}",
                            model.rooms()[room].id,
                            at(day, slot)
                        ),
                    );
                }
            }
            Constraint::RoomConsistency { course, day, slot } => {
                let cell = Cell::new(course, day, slot);
                match (assignment.is_taught(cell), assignment.room(cell)) {
                    (true, None) => fail(
                        kind,
                        format!("{} at {} has no room", name(course), at(day, slot)),
                    ),
                    (false, Some(_)) => fail(
                        kind,
                        format!(
                            "{} holds a room at {} without being taught",
                            name(course),
                            at(day, slot)
                        ),
                    ),
                    _ => {}
                }
            }
            Constraint::RoomPreference { course } => {
                let permitted = &model.courses()[course].rooms;
                for day in 0..model.days().len() {
                    for slot in 0..slots {
                        let cell = Cell::new(course, day, slot);
                        if let Some(room) = assignment.room(cell) {
                            if !permitted.contains(&room) {
                                fail(
                                    kind,
                                    format!(
                                        "{} uses room {} at {}",
                                        name(course),
                                        model.rooms()[room].id,
                                        at(day, slot)
                                    ),
                                );
                            }
                        }
                    }
                }
            }
            Constraint::Contiguity { course, day } => {
                let runs = count_runs(assignment.day_pattern(course, day));
                if runs > 1 {
                    fail(
                        kind,
                        format!(
                            "{} is split into {runs} runs on {}",
                            name(course),
                            model.days()[day]
                        ),
                    );
                }
            }
            Constraint::FirstLastExclusion { course, day } => {
                let first = assignment.is_taught(Cell::new(course, day, 0));
                let last = assignment.is_taught(Cell::new(course, day, slots - 1));
                if first && last && assignment.hours_on(course, day) as usize != slots {
                    fail(
                        kind,
                        format!("{} bookends {} with a gap", name(course), model.days()[day]),
                    );
                }
            }
            Constraint::RoomContinuity { course, day, slot } => {
                let here = Cell::new(course, day, slot);
                let next = Cell::new(course, day, slot + 1);
                if assignment.is_taught(here)
                    && assignment.is_taught(next)
                    && assignment.room(here) != assignment.room(next)
                {
                    fail(
                        kind,
                        format!("{} changes room after {}", name(course), at(day, slot)),
                    );
                }
            }
            Constraint::TeacherNoOverlap { teacher, day, slot } => {
                let taught = model
                    .teacher_courses(teacher)
                    .iter()
                    .filter(|&&c| assignment.is_taught(Cell::new(c, day, slot)))
                    .count();
                if taught > 1 {
                    fail(
                        kind,
                        format!(
                            "teacher {} gives {taught} sessions at {}",
                            model.teachers()[teacher],
                            at(day, slot)
                        ),
                    );
                }
            }
            Constraint::ClassDailyLoad { class, day, cap } => {
                let load: u32 = model
                    .class_courses(class)
                    .iter()
                    .map(|&c| assignment.hours_on(c, day))
                    .sum();
                if load > cap {
                    fail(
                        kind,
                        format!(
                            "class {} has {load} sessions on {}, cap {cap}",
                            model.classes()[class].id,
                            model.days()[day]
                        ),
                    );
                }
            }
            Constraint::DaySpread { course, min, max } => {
                let used = assignment.days_used(course);
                if min.is_some_and(|m| used < m) || max.is_some_and(|m| used > m) {
                    fail(
                        kind,
                        format!("{} uses {used} days, bounds {min:?}..{max:?}", name(course)),
                    );
                }
            }
            Constraint::FixedSlot { cell, value } => {
                if assignment.is_taught(cell) != value {
                    let verb = if value { "pinned to" } else { "forbidden from" };
                    fail(
                        kind,
                        format!("{} is {verb} {}", name(cell.course), at(cell.day, cell.slot)),
                    );
                }
            }
        }
    }
    violations
}

/// Objective value: Σ weight · taught − penalty · Σ (days used − minimum days).
pub fn objective(model: &TimetableModel, assignment: &Assignment) -> f64 {
    let preference: f64 = assignment
        .taught_cells()
        .map(|(cell, _)| model.weight(cell))
        .sum();
    let extra_days: f64 = model
        .courses()
        .iter()
        .enumerate()
        .map(|(i, course)| f64::from(assignment.days_used(i)) - f64::from(course.min_days()))
        .sum();
    preference - model.day_penalty() * extra_days
}
