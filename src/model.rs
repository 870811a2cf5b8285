//! Model builder: turns a [`Catalog`] into an immutable [`TimetableModel`].
//!
//! Names are resolved to dense indices once. Every enrolled (class, subject)
//! pair becomes a [`Course`] carrying its quota, day availability, daily
//! ceiling and permitted rooms, so that constraint generation and both
//! solver backends only ever look at indices.

use crate::config::{ModelOptions, OverflowPolicy};
use crate::constraints::ConstraintSet;
use crate::data::{Catalog, FixedSlot, PreferenceWeight};
use crate::error::{EntityKind, ModelError};
use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

/// Default objective weight of a cell without an explicit preference.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// One (course, day, slot) position: "this course's subject is taught to its
/// class at this day/slot".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub course: usize,
    pub day: usize,
    pub slot: usize,
}

impl Cell {
    pub fn new(course: usize, day: usize, slot: usize) -> Self {
        Self { course, day, slot }
    }
}

/// A class as seen by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub id: String,
    pub headcount: u32,
    pub max_hours_per_day: Option<u32>,
}

/// A room as seen by the model. The overflow room has no capacity limit and
/// is never subject to exclusivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEntry {
    pub id: String,
    pub capacity: Option<u32>,
    pub overflow: bool,
}

/// An enrolled (class, subject) pair with everything resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub class: usize,
    pub subject: usize,
    pub teacher: Option<usize>,
    /// Exact weekly quota. `None` means the pair has no coverage requirement.
    pub hours: Option<u32>,
    pub daily_cap: u32,
    pub min_days: Option<u32>,
    pub max_days: Option<u32>,
    /// Rooms the course may use. Empty when rooms are not modeled.
    pub rooms: Vec<usize>,
    /// True when `rooms` is narrower than the full room pool.
    pub restricted_rooms: bool,
    /// Days on which the bound teacher can teach.
    pub open_days: Vec<bool>,
}

impl Course {
    /// Fewest distinct days the course can be spread over: the declared
    /// minimum, or what the quota needs under the daily ceiling.
    pub fn min_days(&self) -> u32 {
        let needed = self
            .hours
            .map(|h| h.div_ceil(self.daily_cap.max(1)))
            .unwrap_or(0);
        self.min_days.unwrap_or(0).max(needed)
    }

    pub fn is_open_on(&self, day: usize) -> bool {
        self.open_days[day]
    }
}

/// The decision variables, hard constraints and objective of one
/// timetabling problem.
#[derive(Debug, Clone)]
pub struct TimetableModel {
    days: Vec<String>,
    slots: Vec<String>,
    classes: Vec<ClassEntry>,
    subjects: Vec<String>,
    teachers: Vec<String>,
    rooms: Vec<RoomEntry>,
    courses: Vec<Course>,
    course_index: HashMap<(usize, usize), usize>,
    day_index: HashMap<String, usize>,
    slot_index: HashMap<String, usize>,
    class_index: HashMap<String, usize>,
    subject_index: HashMap<String, usize>,
    class_courses: Vec<Vec<usize>>,
    teacher_courses: Vec<Vec<usize>>,
    room_courses: Vec<Vec<usize>>,
    rooms_modeled: bool,
    options: ModelOptions,
    weights: HashMap<Cell, f64>,
    fixed: BTreeMap<Cell, bool>,
    constraints: ConstraintSet,
}

fn index_ids<'a, I>(ids: I, kind: EntityKind) -> Result<HashMap<String, usize>, ModelError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut index = HashMap::new();
    for (i, id) in ids.into_iter().enumerate() {
        if index.insert(id.clone(), i).is_some() {
            return Err(ModelError::DuplicateEntity {
                kind,
                name: id.clone(),
            });
        }
    }
    Ok(index)
}

fn lookup(
    index: &HashMap<String, usize>,
    name: &str,
    kind: EntityKind,
    context: impl FnOnce() -> String,
) -> Result<usize, ModelError> {
    index
        .get(name)
        .copied()
        .ok_or_else(|| ModelError::UnknownEntity {
            kind,
            name: name.to_string(),
            context: context(),
        })
}

impl TimetableModel {
    /// Builds the model. Pure and deterministic for identical input.
    pub fn build(catalog: &Catalog, options: &ModelOptions) -> Result<Self, ModelError> {
        options.validate()?;

        let day_index = index_ids(&catalog.days, EntityKind::Day)?;
        let slot_index = index_ids(&catalog.slots, EntityKind::Slot)?;
        let class_index = index_ids(catalog.classes.iter().map(|c| &c.id), EntityKind::Class)?;
        let subject_index =
            index_ids(catalog.subjects.iter().map(|s| &s.id), EntityKind::Subject)?;
        let room_index = index_ids(catalog.rooms.iter().map(|r| &r.id), EntityKind::Room)?;
        let teacher_index =
            index_ids(catalog.teachers.iter().map(|t| &t.id), EntityKind::Teacher)?;

        for subject in &catalog.subjects {
            for room in &subject.preferred_rooms {
                lookup(&room_index, room, EntityKind::Room, || {
                    format!("preferred rooms of subject '{}'", subject.id)
                })?;
            }
        }
        for teacher in &catalog.teachers {
            for day in teacher.available_days.iter().flatten() {
                lookup(&day_index, day, EntityKind::Day, || {
                    format!("availability of teacher '{}'", teacher.id)
                })?;
            }
        }

        let mut bound_teachers: HashMap<(usize, usize), usize> = HashMap::new();
        for binding in &catalog.bindings {
            let context = || {
                format!(
                    "binding of '{}' for '{}'/'{}'",
                    binding.teacher, binding.class, binding.subject
                )
            };
            let class = lookup(&class_index, &binding.class, EntityKind::Class, context)?;
            let subject = lookup(&subject_index, &binding.subject, EntityKind::Subject, context)?;
            let teacher = lookup(&teacher_index, &binding.teacher, EntityKind::Teacher, context)?;
            let enrolled = catalog.classes[class]
                .subjects
                .iter()
                .any(|e| e.subject == binding.subject);
            if !enrolled {
                return Err(ModelError::UnknownEntity {
                    kind: EntityKind::Enrollment,
                    name: format!("{}/{}", binding.class, binding.subject),
                    context: context(),
                });
            }
            if bound_teachers.insert((class, subject), teacher).is_some() {
                return Err(ModelError::DuplicateEntity {
                    kind: EntityKind::Binding,
                    name: format!("{}/{}", binding.class, binding.subject),
                });
            }
        }

        let rooms_modeled = options.assign_rooms && !catalog.rooms.is_empty();
        let mut rooms: Vec<RoomEntry> = catalog
            .rooms
            .iter()
            .map(|r| RoomEntry {
                id: r.id.clone(),
                capacity: Some(r.capacity),
                overflow: false,
            })
            .collect();
        let overflow_room = if rooms_modeled
            && options.capacity_aware
            && options.overflow == OverflowPolicy::TemporaryRoom
        {
            if room_index.contains_key(&options.overflow_room) {
                return Err(ModelError::DuplicateEntity {
                    kind: EntityKind::Room,
                    name: options.overflow_room.clone(),
                });
            }
            rooms.push(RoomEntry {
                id: options.overflow_room.clone(),
                capacity: None,
                overflow: true,
            });
            Some(rooms.len() - 1)
        } else {
            None
        };

        let mut courses = Vec::new();
        let mut course_index = HashMap::new();
        for (class_idx, class) in catalog.classes.iter().enumerate() {
            for enrollment in &class.subjects {
                let subject_idx =
                    lookup(&subject_index, &enrollment.subject, EntityKind::Subject, || {
                        format!("enrollments of class '{}'", class.id)
                    })?;
                if course_index
                    .insert((class_idx, subject_idx), courses.len())
                    .is_some()
                {
                    return Err(ModelError::DuplicateEntity {
                        kind: EntityKind::Enrollment,
                        name: format!("{}/{}", class.id, enrollment.subject),
                    });
                }
                let subject = &catalog.subjects[subject_idx];
                let empty = |reason: &str| ModelError::EmptyDomain {
                    class: class.id.clone(),
                    subject: subject.id.clone(),
                    reason: reason.to_string(),
                };

                let hours = enrollment.hours_per_week.or(subject.hours_per_week);
                match hours {
                    Some(0) => return Err(empty("weekly quota is 0")),
                    None => warn!(
                        "No weekly quota declared for '{}' in class '{}'; coverage constraint omitted",
                        subject.id, class.id
                    ),
                    Some(_) => {}
                }

                let daily_cap = subject.max_hours_per_day.unwrap_or(options.daily_cap);
                let teacher = bound_teachers.get(&(class_idx, subject_idx)).copied();
                let open_days: Vec<bool> = catalog
                    .days
                    .iter()
                    .map(|day| teacher.is_none_or(|t| catalog.teachers[t].is_available(day)))
                    .collect();

                if hours.is_some() {
                    if catalog.slots.is_empty() || !open_days.iter().any(|open| *open) {
                        return Err(empty("no day/slot is available to its teacher"));
                    }
                    if daily_cap == 0 {
                        return Err(empty("daily ceiling is 0"));
                    }
                }

                let (course_rooms, restricted_rooms) = if rooms_modeled {
                    let pool: Vec<usize> = if subject.preferred_rooms.is_empty() {
                        (0..catalog.rooms.len()).collect()
                    } else {
                        subject
                            .preferred_rooms
                            .iter()
                            .map(|r| room_index[r])
                            .unique()
                            .collect()
                    };
                    let fitting: Vec<usize> = if options.capacity_aware {
                        pool.iter()
                            .copied()
                            .filter(|&r| catalog.rooms[r].capacity >= class.headcount)
                            .collect()
                    } else {
                        pool
                    };
                    let usable = match (fitting.is_empty(), overflow_room) {
                        (false, _) => fitting,
                        (true, Some(overflow)) => {
                            debug!(
                                "Class '{}' ({} students) overflows every room for '{}'",
                                class.id, class.headcount, subject.id
                            );
                            vec![overflow]
                        }
                        (true, None) => {
                            return Err(empty(&format!(
                                "no permitted room holds {} students",
                                class.headcount
                            )));
                        }
                    };
                    let restricted = usable.len() != catalog.rooms.len()
                        || usable.iter().any(|&r| rooms[r].overflow);
                    (usable, restricted)
                } else {
                    (Vec::new(), false)
                };

                courses.push(Course {
                    class: class_idx,
                    subject: subject_idx,
                    teacher,
                    hours,
                    daily_cap,
                    min_days: subject.min_days_per_week,
                    max_days: subject.max_days_per_week,
                    rooms: course_rooms,
                    restricted_rooms,
                    open_days,
                });
            }
        }

        let mut class_courses = vec![Vec::new(); catalog.classes.len()];
        let mut teacher_courses = vec![Vec::new(); catalog.teachers.len()];
        let mut room_courses = vec![Vec::new(); rooms.len()];
        for (i, course) in courses.iter().enumerate() {
            class_courses[course.class].push(i);
            if let Some(t) = course.teacher {
                teacher_courses[t].push(i);
            }
            for &r in &course.rooms {
                room_courses[r].push(i);
            }
        }

        let mut model = Self {
            days: catalog.days.clone(),
            slots: catalog.slots.clone(),
            classes: catalog
                .classes
                .iter()
                .map(|c| ClassEntry {
                    id: c.id.clone(),
                    headcount: c.headcount,
                    max_hours_per_day: c.max_hours_per_day,
                })
                .collect(),
            subjects: catalog.subjects.iter().map(|s| s.id.clone()).collect(),
            teachers: catalog.teachers.iter().map(|t| t.id.clone()).collect(),
            rooms,
            courses,
            course_index,
            day_index,
            slot_index,
            class_index,
            subject_index,
            class_courses,
            teacher_courses,
            room_courses,
            rooms_modeled,
            options: options.clone(),
            weights: HashMap::new(),
            fixed: BTreeMap::new(),
            constraints: ConstraintSet::default(),
        };
        model.constraints = ConstraintSet::generate(&model);

        info!(
            "Built timetable model: {} classes, {} courses, {} days x {} slots, {} rooms, {} constraints",
            model.classes.len(),
            model.courses.len(),
            model.days.len(),
            model.slots.len(),
            model.rooms.len(),
            model.constraints.len()
        );
        debug!("Constraint counts by kind: {:?}", model.constraints.counts());
        Ok(model)
    }

    /// Overrides the default weight of specific cells. All entries are
    /// validated before any is applied.
    pub fn apply_preference_weights(
        &mut self,
        preferences: &[PreferenceWeight],
    ) -> Result<(), ModelError> {
        let mut resolved = Vec::with_capacity(preferences.len());
        for p in preferences {
            if !p.weight.is_finite() {
                return Err(ModelError::InvalidOptions(format!(
                    "preference weight for {}/{}/{}/{} is not a real number",
                    p.class, p.day, p.slot, p.subject
                )));
            }
            let cell = self.resolve_cell(&p.class, &p.day, &p.slot, &p.subject, "preference")?;
            resolved.push((cell, p.weight));
        }
        debug!("Applying {} preference weights", resolved.len());
        self.weights.extend(resolved);
        Ok(())
    }

    /// Pins or forbids cells. The whole batch is checked against itself and
    /// against previously fixed cells; on conflict the model is unchanged.
    pub fn apply_fixed_slots(&mut self, fixed: &[FixedSlot]) -> Result<(), ModelError> {
        let mut tentative = self.fixed.clone();
        for entry in fixed {
            let cell = self.resolve_cell(
                &entry.class,
                &entry.day,
                &entry.slot,
                &entry.subject,
                "fixed slot",
            )?;
            if let Some(&existing) = tentative.get(&cell) {
                if existing != entry.fixed {
                    return Err(self.fixed_conflict(cell, existing, cell, entry.fixed));
                }
                continue;
            }
            if entry.fixed {
                let class = self.courses[cell.course].class;
                let clash = self.class_courses[class].iter().find(|&&other| {
                    other != cell.course
                        && tentative.get(&Cell::new(other, cell.day, cell.slot)) == Some(&true)
                });
                if let Some(&other) = clash {
                    let existing = Cell::new(other, cell.day, cell.slot);
                    return Err(self.fixed_conflict(existing, true, cell, true));
                }
            }
            tentative.insert(cell, entry.fixed);
        }
        debug!(
            "Fixed cells: {} pinned, {} forbidden",
            tentative.values().filter(|v| **v).count(),
            tentative.values().filter(|v| !**v).count()
        );
        self.fixed = tentative;
        self.constraints.replace_fixed(&self.fixed);
        Ok(())
    }

    fn fixed_conflict(
        &self,
        existing: Cell,
        existing_pin: bool,
        incoming: Cell,
        incoming_pin: bool,
    ) -> ModelError {
        let describe = |cell: Cell, pin: bool| {
            let verb = if pin { "pin" } else { "forbid" };
            format!("{verb} {}", self.subject_of(cell.course))
        };
        ModelError::ConflictingFixedSlot {
            class: self.class_of(incoming.course).to_string(),
            day: self.days[incoming.day].clone(),
            slot: self.slots[incoming.slot].clone(),
            existing: describe(existing, existing_pin),
            incoming: describe(incoming, incoming_pin),
        }
    }

    /// Resolves catalog names into a cell of an enrolled course.
    pub fn resolve_cell(
        &self,
        class: &str,
        day: &str,
        slot: &str,
        subject: &str,
        what: &str,
    ) -> Result<Cell, ModelError> {
        let context = || format!("{what} {class}/{day}/{slot}/{subject}");
        let class_idx = lookup(&self.class_index, class, EntityKind::Class, context)?;
        let day_idx = lookup(&self.day_index, day, EntityKind::Day, context)?;
        let slot_idx = lookup(&self.slot_index, slot, EntityKind::Slot, context)?;
        let subject_idx = lookup(&self.subject_index, subject, EntityKind::Subject, context)?;
        let course = self
            .course_index
            .get(&(class_idx, subject_idx))
            .copied()
            .ok_or_else(|| ModelError::UnknownEntity {
                kind: EntityKind::Enrollment,
                name: format!("{class}/{subject}"),
                context: context(),
            })?;
        Ok(Cell::new(course, day_idx, slot_idx))
    }

    pub fn days(&self) -> &[String] {
        &self.days
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn classes(&self) -> &[ClassEntry] {
        &self.classes
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn teachers(&self) -> &[String] {
        &self.teachers
    }

    pub fn rooms(&self) -> &[RoomEntry] {
        &self.rooms
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn class_courses(&self, class: usize) -> &[usize] {
        &self.class_courses[class]
    }

    pub fn teacher_courses(&self, teacher: usize) -> &[usize] {
        &self.teacher_courses[teacher]
    }

    pub fn room_courses(&self, room: usize) -> &[usize] {
        &self.room_courses[room]
    }

    pub fn class_of(&self, course: usize) -> &str {
        &self.classes[self.courses[course].class].id
    }

    pub fn subject_of(&self, course: usize) -> &str {
        &self.subjects[self.courses[course].subject]
    }

    pub fn rooms_modeled(&self) -> bool {
        self.rooms_modeled
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn day_penalty(&self) -> f64 {
        self.options.day_penalty
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn weight(&self, cell: Cell) -> f64 {
        self.weights.get(&cell).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// Cells whose weight was set explicitly.
    pub fn weighted_cells(&self) -> impl Iterator<Item = (Cell, f64)> + '_ {
        self.weights.iter().map(|(c, w)| (*c, *w)).sorted_by_key(|(c, _)| *c)
    }

    pub fn fixed(&self, cell: Cell) -> Option<bool> {
        self.fixed.get(&cell).copied()
    }

    pub fn fixed_cells(&self) -> &BTreeMap<Cell, bool> {
        &self.fixed
    }

    /// Whether the cell may be taught at all: the teacher is available that
    /// day and the cell is not forbidden.
    pub fn is_open(&self, cell: Cell) -> bool {
        self.courses[cell.course].is_open_on(cell.day) && self.fixed(cell) != Some(false)
    }

    pub fn num_cells(&self) -> usize {
        self.courses.len() * self.days.len() * self.slots.len()
    }

    /// Dense position of a cell, course-major.
    pub fn cell_index(&self, cell: Cell) -> usize {
        (cell.course * self.days.len() + cell.day) * self.slots.len() + cell.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassGroup, Room, Subject, Teacher};

    fn catalog() -> Catalog {
        Catalog::new(["Mon", "Tue", "Wed"], ["9", "10", "11"])
            .with_subject(Subject::new("math", 3).with_preferred_rooms(["lab"]))
            .with_subject(Subject::new("art", 2))
            .with_room(Room::new("lab", 10))
            .with_room(Room::new("hall", 40))
            .with_teacher(Teacher::new("ana").available_on(["Mon", "Wed"]))
            .with_class(ClassGroup::new("c1", 20).enroll("math").enroll_for("art", 1))
            .bind("c1", "math", "ana")
    }

    #[test]
    fn builds_courses_with_resolved_quota_and_days() {
        let model = TimetableModel::build(&catalog(), &ModelOptions::default()).unwrap();
        assert_eq!(model.courses().len(), 2);

        let math = &model.courses()[0];
        assert_eq!(math.hours, Some(3));
        assert_eq!(math.open_days, vec![true, false, true]);
        assert_eq!(math.rooms, vec![0]);
        assert!(math.restricted_rooms);
        assert_eq!(math.min_days(), 2);

        let art = &model.courses()[1];
        assert_eq!(art.hours, Some(1));
        assert_eq!(art.teacher, None);
        assert!(!art.restricted_rooms);
    }

    #[test]
    fn unknown_preferred_room_is_reported() {
        let catalog = catalog().with_subject(Subject::new("bio", 1).with_preferred_rooms(["pool"]));
        let err = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownEntity { kind: EntityKind::Room, ref name, .. } if name == "pool"
        ));
    }

    #[test]
    fn zero_quota_is_an_empty_domain() {
        let catalog = Catalog::new(["Mon"], ["9"])
            .with_subject(Subject::new("math", 0))
            .with_class(ClassGroup::new("c1", 10).enroll("math"));
        let err = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDomain { .. }));
    }

    #[test]
    fn teacher_never_available_is_an_empty_domain() {
        let catalog = Catalog::new(["Mon"], ["9"])
            .with_subject(Subject::new("math", 1))
            .with_teacher(Teacher::new("ana").available_on(Vec::<String>::new()))
            .with_class(ClassGroup::new("c1", 10).enroll("math"))
            .bind("c1", "math", "ana");
        let err = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDomain { .. }));
    }

    #[test]
    fn capacity_check_rejects_or_overflows() {
        let options = ModelOptions::default().with_capacity_check(OverflowPolicy::Reject);
        let err = TimetableModel::build(&catalog(), &options).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDomain { ref subject, .. } if subject == "math"));

        let options = ModelOptions::default().with_capacity_check(OverflowPolicy::TemporaryRoom);
        let model = TimetableModel::build(&catalog(), &options).unwrap();
        let math = &model.courses()[0];
        assert_eq!(math.rooms.len(), 1);
        assert!(model.rooms()[math.rooms[0]].overflow);
        // art has no preference: only the hall holds 20 students
        assert_eq!(model.courses()[1].rooms, vec![1]);
    }

    #[test]
    fn duplicate_binding_is_rejected() {
        let catalog = catalog().with_teacher(Teacher::new("rui")).bind("c1", "math", "rui");
        let err = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DuplicateEntity { kind: EntityKind::Binding, .. }
        ));
    }

    #[test]
    fn missing_quota_is_not_zero() {
        let mut catalog = catalog();
        catalog.subjects[1].hours_per_week = None;
        catalog.classes[0].subjects[1].hours_per_week = None;
        let model = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap();
        assert_eq!(model.courses()[1].hours, None);
        assert_eq!(model.courses()[1].min_days(), 0);
    }

    #[test]
    fn preference_weights_resolve_and_override() {
        let mut model = TimetableModel::build(&catalog(), &ModelOptions::default()).unwrap();
        model
            .apply_preference_weights(&[PreferenceWeight::new("c1", "Tue", "10", "art", -3.0)])
            .unwrap();
        let cell = model.resolve_cell("c1", "Tue", "10", "art", "test").unwrap();
        assert_eq!(model.weight(cell), -3.0);
        assert_eq!(model.weight(Cell::new(0, 0, 0)), DEFAULT_WEIGHT);

        let err = model
            .apply_preference_weights(&[PreferenceWeight::new("c1", "Sun", "10", "art", 1.0)])
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownEntity { kind: EntityKind::Day, .. }));
    }

    #[test]
    fn pinning_two_subjects_in_one_cell_conflicts() {
        let mut model = TimetableModel::build(&catalog(), &ModelOptions::default()).unwrap();
        model
            .apply_fixed_slots(&[
                FixedSlot::pin("c1", "Mon", "9", "math"),
                FixedSlot::forbid("c1", "Mon", "9", "art"),
            ])
            .unwrap();

        let err = model
            .apply_fixed_slots(&[
                FixedSlot::pin("c1", "Tue", "9", "art"),
                FixedSlot::pin("c1", "Mon", "9", "art"),
            ])
            .unwrap_err();
        assert!(matches!(err, ModelError::ConflictingFixedSlot { .. }));
        // the batch was rejected as a whole
        let tue = model.resolve_cell("c1", "Tue", "9", "art", "test").unwrap();
        assert_eq!(model.fixed(tue), None);
        assert_eq!(model.fixed_cells().len(), 2);
    }

    #[test]
    fn pin_and_forbid_of_same_cell_conflicts() {
        let mut model = TimetableModel::build(&catalog(), &ModelOptions::default()).unwrap();
        let err = model
            .apply_fixed_slots(&[
                FixedSlot::pin("c1", "Mon", "9", "math"),
                FixedSlot::forbid("c1", "Mon", "9", "math"),
            ])
            .unwrap_err();
        assert!(matches!(err, ModelError::ConflictingFixedSlot { .. }));
    }

    #[test]
    fn fixed_slot_for_unenrolled_subject_is_unknown() {
        let catalog = catalog()
            .with_subject(Subject::new("bio", 1))
            .with_class(ClassGroup::new("c2", 5).enroll("bio"));
        let mut model = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap();
        let err = model
            .apply_fixed_slots(&[FixedSlot::pin("c1", "Mon", "9", "bio")])
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownEntity { kind: EntityKind::Enrollment, .. }
        ));
    }
}
