//! The MILP backend: the model is handed to HiGHS through good_lp.

use crate::constraints::Constraint;
use crate::error::SolveError;
use crate::model::{Cell, TimetableModel};
use crate::verify::Assignment;
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    default_solver,
};
use log::{info, trace};
use std::collections::BTreeMap;
use std::time::Duration;

/// What HiGHS returned, already mapped back onto cells.
pub(crate) enum MilpResult {
    Found(Assignment),
    Infeasible,
}

pub(crate) struct MilpSettings {
    pub time_limit: Option<Duration>,
    pub gap_tolerance: f64,
    pub seed: Option<u64>,
}

pub(crate) fn run(
    model: &TimetableModel,
    settings: &MilpSettings,
) -> Result<MilpResult, SolveError> {
    let days = model.days().len();
    let slots = model.slots().len();
    info!(
        "Setting up MILP model with {} courses, {} rooms, {} days x {} slots...",
        model.courses().len(),
        model.rooms().len(),
        days,
        slots
    );
    let mut problem = ProblemVariables::new();

    // x[cell] = 1 if the course is taught at (day, slot); only created on
    // days its teacher is present
    let mut taught: Vec<Option<Variable>> = vec![None; model.num_cells()];
    // z[(cell, room)] = 1 if that session uses the room
    let mut room_vars: BTreeMap<(Cell, usize), Variable> = BTreeMap::new();
    // y[(course, day)] = 1 if the course is taught at all that day
    let mut day_vars: BTreeMap<(usize, usize), Variable> = BTreeMap::new();
    // r[cell] = 1 if a run starts at this slot
    let mut run_starts: BTreeMap<Cell, Variable> = BTreeMap::new();

    for (course, c) in model.courses().iter().enumerate() {
        for day in (0..days).filter(|&d| c.is_open_on(d)) {
            day_vars.insert((course, day), problem.add(variable().binary()));
            for slot in 0..slots {
                let cell = Cell::new(course, day, slot);
                taught[model.cell_index(cell)] = Some(problem.add(variable().binary()));
                if model.rooms_modeled() {
                    for &room in &c.rooms {
                        room_vars.insert((cell, room), problem.add(variable().binary()));
                    }
                }
                if model.options().contiguity {
                    run_starts.insert(cell, problem.add(variable().binary()));
                }
            }
        }
    }
    let x = |cell: Cell| taught[model.cell_index(cell)];
    trace!(
        "Generated {} assignment variables out of a theoretical maximum of {}.",
        taught.iter().flatten().count(),
        model.num_cells()
    );

    let preference: Expression = taught
        .iter()
        .enumerate()
        .filter_map(|(i, var)| var.map(|v| (i, v)))
        .map(|(i, v)| {
            let cell = Cell::new(i / (days * slots), (i / slots) % days, i % slots);
            model.weight(cell) * v
        })
        .sum();
    let days_taught: Expression = day_vars.values().copied().sum();
    // Σ min days is constant and left out
    let objective = preference - model.day_penalty() * days_taught;

    let mut lp = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", 1)
        .set_option("random_seed", settings.seed.map_or(0, |s| (s % i32::MAX as u64) as i32))
        .set_option("mip_rel_gap", settings.gap_tolerance)
        .set_option("log_to_console", "false");
    if let Some(limit) = settings.time_limit {
        lp = lp.set_option("time_limit", limit.as_secs_f64());
    }

    // y is 1 exactly on the days with at least one taught slot
    for (&(course, day), &y) in &day_vars {
        let mut on_day = Vec::with_capacity(slots);
        for slot in 0..slots {
            if let Some(v) = x(Cell::new(course, day, slot)) {
                lp.add_constraint(constraint!(y >= v));
                on_day.push(v);
            }
        }
        let total: Expression = on_day.into_iter().sum();
        lp.add_constraint(constraint!(y <= total));
    }

    let sum_of = |cells: &mut dyn Iterator<Item = Cell>| -> Expression {
        cells.filter_map(|cell| x(cell)).sum()
    };

    info!("Adding {} hard constraints...", model.constraints().len());
    for constraint in model.constraints().iter() {
        match *constraint {
            Constraint::WeeklyCoverage { course, hours } => {
                let total = sum_of(&mut cells_of(course, days, slots));
                lp.add_constraint(constraint!(total == hours as f64));
            }
            Constraint::ClassNoOverlap { class, day, slot } => {
                let total = sum_of(
                    &mut model.class_courses(class).iter().map(|&c| Cell::new(c, day, slot)),
                );
                lp.add_constraint(constraint!(total <= 1));
            }
            Constraint::DailyCap { course, day, cap } => {
                let total = sum_of(&mut (0..slots).map(|s| Cell::new(course, day, s)));
                lp.add_constraint(constraint!(total <= cap as f64));
            }
            // no variables exist on those days
            Constraint::TeacherAvailability { .. } => {}
            Constraint::RoomExclusivity { day, slot, room } => {
                let users: Expression = model
                    .room_courses(room)
                    .iter()
                    .filter_map(|&c| room_vars.get(&(Cell::new(c, day, slot), room)).copied())
                    .sum();
                lp.add_constraint(constraint!(users <= 1));
            }
            Constraint::RoomConsistency { course, day, slot } => {
                let cell = Cell::new(course, day, slot);
                if let Some(v) = x(cell) {
                    let rooms: Expression = model.courses()[course]
                        .rooms
                        .iter()
                        .filter_map(|&r| room_vars.get(&(cell, r)).copied())
                        .sum();
                    lp.add_constraint(constraint!(rooms == v));
                }
            }
            // room variables only exist for permitted rooms
            Constraint::RoomPreference { .. } => {}
            Constraint::Contiguity { course, day } => {
                let Some(&y) = day_vars.get(&(course, day)) else {
                    continue;
                };
                let mut starts = Vec::with_capacity(slots);
                for slot in 0..slots {
                    let cell = Cell::new(course, day, slot);
                    let (Some(v), Some(&r)) = (x(cell), run_starts.get(&cell)) else {
                        continue;
                    };
                    let previous = slot
                        .checked_sub(1)
                        .and_then(|p| x(Cell::new(course, day, p)));
                    let rise: Expression = match previous {
                        Some(previous) => v - previous,
                        None => v.into(),
                    };
                    lp.add_constraint(constraint!(r >= rise));
                    starts.push(r);
                }
                let runs: Expression = starts.into_iter().sum();
                lp.add_constraint(constraint!(runs <= y));
            }
            Constraint::FirstLastExclusion { course, day } => {
                let (Some(first), Some(last)) = (
                    x(Cell::new(course, day, 0)),
                    x(Cell::new(course, day, slots - 1)),
                ) else {
                    continue;
                };
                let total = sum_of(&mut (0..slots).map(|s| Cell::new(course, day, s)));
                let ends = first + last;
                let n = slots as f64;
                lp.add_constraint(constraint!(n * ends - total <= n));
            }
            Constraint::RoomContinuity { course, day, slot } => {
                let here = Cell::new(course, day, slot);
                let next = Cell::new(course, day, slot + 1);
                let (Some(a), Some(b)) = (x(here), x(next)) else {
                    continue;
                };
                for &room in &model.courses()[course].rooms {
                    if let (Some(&za), Some(&zb)) =
                        (room_vars.get(&(here, room)), room_vars.get(&(next, room)))
                    {
                        let change = za - zb + a + b;
                        lp.add_constraint(constraint!(change <= 2));
                    }
                }
            }
            Constraint::TeacherNoOverlap { teacher, day, slot } => {
                let total = sum_of(
                    &mut model.teacher_courses(teacher).iter().map(|&c| Cell::new(c, day, slot)),
                );
                lp.add_constraint(constraint!(total <= 1));
            }
            Constraint::ClassDailyLoad { class, day, cap } => {
                let total = sum_of(&mut model.class_courses(class).iter().flat_map(|&c| {
                    (0..slots).map(move |s| Cell::new(c, day, s))
                }));
                lp.add_constraint(constraint!(total <= cap as f64));
            }
            Constraint::DaySpread { course, min, max } => {
                let used: Expression = (0..days)
                    .filter_map(|d| day_vars.get(&(course, d)).copied())
                    .sum();
                if let Some(min) = min {
                    lp.add_constraint(constraint!(used.clone() >= min as f64));
                }
                if let Some(max) = max {
                    lp.add_constraint(constraint!(used <= max as f64));
                }
            }
            Constraint::FixedSlot { cell, value } => match (x(cell), value) {
                (Some(v), true) => {
                    lp.add_constraint(constraint!(v == 1));
                }
                (Some(v), false) => {
                    lp.add_constraint(constraint!(v <= 0));
                }
                (None, true) => return Ok(MilpResult::Infeasible),
                (None, false) => {}
            },
        }
    }

    info!("Starting MILP solver...");
    let solution = match lp.solve() {
        Ok(s) => s,
        Err(e) => return map_resolution_error(e),
    };

    let mut assignment = Assignment::new(model);
    for (i, var) in taught.iter().enumerate() {
        let Some(v) = var else {
            continue;
        };
        if solution.value(*v) > 0.5 {
            let cell = Cell::new(i / (days * slots), (i / slots) % days, i % slots);
            let room = model.courses()[cell.course]
                .rooms
                .iter()
                .copied()
                .find(|&r| room_vars.get(&(cell, r)).is_some_and(|z| solution.value(*z) > 0.5));
            assignment.teach(cell, room);
        }
    }
    Ok(MilpResult::Found(assignment))
}

/// HiGHS reports "infeasible or unbounded" as `Unbounded`. A maximisation
/// over binaries is never unbounded, so both mean no timetable exists.
fn map_resolution_error(error: ResolutionError) -> Result<MilpResult, SolveError> {
    match error {
        ResolutionError::Infeasible | ResolutionError::Unbounded => Ok(MilpResult::Infeasible),
        other => Err(SolveError::Backend(other.to_string())),
    }
}

fn cells_of(course: usize, days: usize, slots: usize) -> impl Iterator<Item = Cell> {
    (0..days).flat_map(move |d| (0..slots).map(move |s| Cell::new(course, d, s)))
}
