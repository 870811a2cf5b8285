use crate::config::Engine;
use crate::data::UnmetSoftConstraint;
use crate::model::{Cell, TimetableModel};
use crate::verify::{self, Assignment};
use serde::Serialize;
use std::collections::HashMap;

/// One taught session in the final timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSession {
    pub class: String,
    pub day: String,
    pub slot: String,
    pub subject: String,
    pub room: Option<String>,
}

/// How far a backend got in proving its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Proof {
    Optimal,
    /// Search stopped once the remaining gap fell under the tolerance.
    WithinTolerance,
    Unproven,
}

/// Relative optimality gap, (bound - found) / max(|found|, 1).
pub fn relative_gap(bound: f64, found: f64) -> f64 {
    (bound - found).max(0.0) / found.abs().max(1.0)
}

/// The final output of a successful solve.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// Sessions ordered by class, then day, then slot, in catalog order.
    pub sessions: Vec<ScheduledSession>,
    pub objective: f64,
    pub is_optimal: bool,
    pub gap: f64,
    pub best_bound: f64,
    pub engine: Engine,
    pub solve_time_ms: u64,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
    #[serde(skip)]
    assignment: Assignment,
    #[serde(skip)]
    lookup: HashMap<(String, String, String), usize>,
}

impl Solution {
    pub(crate) fn new(
        model: &TimetableModel,
        assignment: Assignment,
        engine: Engine,
        proof: Proof,
        bound: f64,
        tolerance: f64,
        solve_time_ms: u64,
    ) -> Self {
        let objective = verify::objective(model, &assignment);
        let is_optimal = proof == Proof::Optimal || objective >= bound - 1e-9;
        let gap = match (is_optimal, proof) {
            (true, _) => 0.0,
            (false, Proof::WithinTolerance) => relative_gap(bound, objective).min(tolerance),
            (false, _) => relative_gap(bound, objective),
        };
        let best_bound = if is_optimal { objective } else { bound };

        let mut sessions = Vec::new();
        for (class_idx, class) in model.classes().iter().enumerate() {
            for day in 0..model.days().len() {
                for slot in 0..model.slots().len() {
                    let taught = model
                        .class_courses(class_idx)
                        .iter()
                        .map(|&course| Cell::new(course, day, slot))
                        .find(|cell| assignment.is_taught(*cell));
                    if let Some(cell) = taught {
                        sessions.push(ScheduledSession {
                            class: class.id.clone(),
                            day: model.days()[day].clone(),
                            slot: model.slots()[slot].clone(),
                            subject: model.subject_of(cell.course).to_string(),
                            room: assignment.room(cell).map(|r| model.rooms()[r].id.clone()),
                        });
                    }
                }
            }
        }
        let lookup = sessions
            .iter()
            .enumerate()
            .map(|(i, s)| ((s.class.clone(), s.day.clone(), s.slot.clone()), i))
            .collect();
        let unmet_soft_constraints = unmet_soft_constraints(model, &assignment);

        Self {
            sessions,
            objective,
            is_optimal,
            gap,
            best_bound,
            engine,
            solve_time_ms,
            unmet_soft_constraints,
            assignment,
            lookup,
        }
    }

    /// The session a class attends at (day, slot), if any.
    pub fn session_at(&self, class: &str, day: &str, slot: &str) -> Option<&ScheduledSession> {
        self.lookup
            .get(&(class.to_string(), day.to_string(), slot.to_string()))
            .map(|&i| &self.sessions[i])
    }

    pub fn subject_at(&self, class: &str, day: &str, slot: &str) -> Option<&str> {
        self.session_at(class, day, slot).map(|s| s.subject.as_str())
    }

    pub fn room_at(&self, class: &str, day: &str, slot: &str) -> Option<&str> {
        self.session_at(class, day, slot)
            .and_then(|s| s.room.as_deref())
    }

    /// Sessions of one class.
    pub fn sessions_of<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a ScheduledSession> {
        self.sessions.iter().filter(move |s| s.class == class)
    }

    /// The raw indicator values, for re-verification.
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }
}

// explicit preferences the schedule went against, plus spread beyond the minimum days
fn unmet_soft_constraints(
    model: &TimetableModel,
    assignment: &Assignment,
) -> Vec<UnmetSoftConstraint> {
    let mut unmet = Vec::new();
    let describe = |cell: Cell| {
        format!(
            "{} for class {} at {} {}",
            model.subject_of(cell.course),
            model.class_of(cell.course),
            model.days()[cell.day],
            model.slots()[cell.slot]
        )
    };

    for (cell, weight) in model.weighted_cells() {
        let taught = assignment.is_taught(cell);
        if weight > 0.0 && !taught {
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Preferred Slot".to_string(),
                description: format!("{} (weight {weight}) was not scheduled", describe(cell)),
            });
        } else if weight < 0.0 && taught {
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Avoided Slot".to_string(),
                description: format!("{} (weight {weight}) was scheduled anyway", describe(cell)),
            });
        }
    }

    for (i, course) in model.courses().iter().enumerate() {
        let used = assignment.days_used(i);
        let min = course.min_days();
        if used > min {
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Fewest Days".to_string(),
                description: format!(
                    "{} for class {} is spread over {used} days, minimum is {min}",
                    model.subject_of(i),
                    model.class_of(i)
                ),
            });
        }
    }
    unmet
}
