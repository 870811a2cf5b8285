use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type DayId = String;
pub type SlotId = String;
pub type ClassId = String;
pub type SubjectId = String;
pub type RoomId = String;
pub type TeacherId = String;

/// Represents a physical room with a given capacity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub capacity: u32,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
        }
    }
}

/// A subject a class is enrolled in.
///
/// `hours_per_week` overrides the subject's default quota for this class only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub subject: SubjectId,
    #[serde(default)]
    pub hours_per_week: Option<u32>,
}

/// A cohort of students ("turma") sharing one timetable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    pub id: ClassId,
    pub headcount: u32,
    /// Cap on the total number of sessions the class attends on one day.
    #[serde(default)]
    pub max_hours_per_day: Option<u32>,
    pub subjects: Vec<Enrollment>,
}

impl ClassGroup {
    pub fn new(id: impl Into<ClassId>, headcount: u32) -> Self {
        Self {
            id: id.into(),
            headcount,
            max_hours_per_day: None,
            subjects: Vec::new(),
        }
    }

    /// Enrolls the class in `subject` using the subject's default quota.
    pub fn enroll(mut self, subject: impl Into<SubjectId>) -> Self {
        self.subjects.push(Enrollment {
            subject: subject.into(),
            hours_per_week: None,
        });
        self
    }

    /// Enrolls the class in `subject` with a class-specific weekly quota.
    pub fn enroll_for(mut self, subject: impl Into<SubjectId>, hours_per_week: u32) -> Self {
        self.subjects.push(Enrollment {
            subject: subject.into(),
            hours_per_week: Some(hours_per_week),
        });
        self
    }

    pub fn with_max_hours_per_day(mut self, max: u32) -> Self {
        self.max_hours_per_day = Some(max);
        self
    }
}

/// A teachable unit. Quotas declared here apply to every enrolled class
/// unless the enrollment overrides them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub hours_per_week: Option<u32>,
    #[serde(default)]
    pub min_days_per_week: Option<u32>,
    #[serde(default)]
    pub max_days_per_week: Option<u32>,
    /// Per-day ceiling; falls back to `ModelOptions::daily_cap`.
    #[serde(default)]
    pub max_hours_per_day: Option<u32>,
    #[serde(default)]
    pub preferred_rooms: Vec<RoomId>,
}

impl Subject {
    pub fn new(id: impl Into<SubjectId>, hours_per_week: u32) -> Self {
        Self {
            id: id.into(),
            hours_per_week: Some(hours_per_week),
            min_days_per_week: None,
            max_days_per_week: None,
            max_hours_per_day: None,
            preferred_rooms: Vec::new(),
        }
    }

    pub fn with_preferred_rooms<I, R>(mut self, rooms: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoomId>,
    {
        self.preferred_rooms = rooms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_days_per_week(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_days_per_week = min;
        self.max_days_per_week = max;
        self
    }

    pub fn with_max_hours_per_day(mut self, max: u32) -> Self {
        self.max_hours_per_day = Some(max);
        self
    }
}

/// Represents a teacher with their day availability.
///
/// A teacher without an `available_days` list is available every day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    #[serde(default)]
    pub available_days: Option<Vec<DayId>>,
}

impl Teacher {
    pub fn new(id: impl Into<TeacherId>) -> Self {
        Self {
            id: id.into(),
            available_days: None,
        }
    }

    pub fn available_on<I, D>(mut self, days: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DayId>,
    {
        self.available_days = Some(days.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_available(&self, day: &str) -> bool {
        match &self.available_days {
            Some(days) => days.iter().any(|d| d == day),
            None => true,
        }
    }
}

/// Binds the teacher who gives `subject` to `class`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TeacherBinding {
    pub class: ClassId,
    pub subject: SubjectId,
    pub teacher: TeacherId,
}

/// The complete, validated input for one timetabling problem.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub days: Vec<DayId>,
    pub slots: Vec<SlotId>,
    pub classes: Vec<ClassGroup>,
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub bindings: Vec<TeacherBinding>,
}

impl Catalog {
    pub fn new<D, S>(days: D, slots: S) -> Self
    where
        D: IntoIterator,
        D::Item: Into<DayId>,
        S: IntoIterator,
        S::Item: Into<SlotId>,
    {
        Self {
            days: days.into_iter().map(Into::into).collect(),
            slots: slots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: ClassGroup) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }

    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    pub fn bind(
        mut self,
        class: impl Into<ClassId>,
        subject: impl Into<SubjectId>,
        teacher: impl Into<TeacherId>,
    ) -> Self {
        self.bindings.push(TeacherBinding {
            class: class.into(),
            subject: subject.into(),
            teacher: teacher.into(),
        });
        self
    }
}

/// Overrides the objective weight of one (class, day, slot, subject) cell.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PreferenceWeight {
    pub class: ClassId,
    pub day: DayId,
    pub slot: SlotId,
    pub subject: SubjectId,
    pub weight: f64,
}

impl PreferenceWeight {
    pub fn new(class: &str, day: &str, slot: &str, subject: &str, weight: f64) -> Self {
        Self {
            class: class.to_string(),
            day: day.to_string(),
            slot: slot.to_string(),
            subject: subject.to_string(),
            weight,
        }
    }
}

/// Pins (`fixed = true`) or forbids (`fixed = false`) a subject in a cell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FixedSlot {
    pub class: ClassId,
    pub day: DayId,
    pub slot: SlotId,
    pub subject: SubjectId,
    pub fixed: bool,
}

impl FixedSlot {
    pub fn pin(class: &str, day: &str, slot: &str, subject: &str) -> Self {
        Self::new(class, day, slot, subject, true)
    }

    pub fn forbid(class: &str, day: &str, slot: &str, subject: &str) -> Self {
        Self::new(class, day, slot, subject, false)
    }

    fn new(class: &str, day: &str, slot: &str, subject: &str, fixed: bool) -> Self {
        Self {
            class: class.to_string(),
            day: day.to_string(),
            slot: slot.to_string(),
            subject: subject.to_string(),
            fixed,
        }
    }
}

/// Describes a soft constraint that was not met in the final schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}
