//! Cheap necessary conditions checked before either backend runs, and the
//! combinatorial upper bound used for pruning and gap reporting.

use crate::model::{Cell, TimetableModel};
use itertools::Itertools;
use std::collections::BTreeMap;

/// Slots of `course` on `day` that are open for teaching.
pub(crate) fn open_cells(model: &TimetableModel, course: usize, day: usize) -> u32 {
    (0..model.slots().len())
        .filter(|&slot| model.is_open(Cell::new(course, day, slot)))
        .count() as u32
}

/// Hours `course` can take on `day` at most.
fn day_capacity(model: &TimetableModel, course: usize, day: usize) -> u32 {
    if model.courses()[course].is_open_on(day) {
        open_cells(model, course, day).min(model.courses()[course].daily_cap)
    } else {
        0
    }
}

/// Hours `course` can take over the whole week, honoring its day ceiling.
pub(crate) fn course_capacity(model: &TimetableModel, course: usize) -> u32 {
    let per_day = (0..model.days().len()).map(|day| day_capacity(model, course, day));
    match model.courses()[course].max_days {
        Some(max) => per_day.sorted_by(|a, b| b.cmp(a)).take(max as usize).sum(),
        None => per_day.sum(),
    }
}

/// Returns the reason the model cannot have a solution, if one of the cheap
/// necessary conditions already fails.
pub(crate) fn check(model: &TimetableModel) -> Result<(), String> {
    let days = model.days().len();
    let slots = model.slots().len();
    let name = |course: usize| format!("{}/{}", model.class_of(course), model.subject_of(course));

    let mut pinned: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for (&cell, &value) in model.fixed_cells() {
        if !value {
            continue;
        }
        if !model.courses()[cell.course].is_open_on(cell.day) {
            return Err(format!(
                "{} is pinned on {} but its teacher is away",
                name(cell.course),
                model.days()[cell.day]
            ));
        }
        pinned.entry((cell.course, cell.day)).or_default().push(cell.slot);
    }

    let mut class_pins: BTreeMap<(usize, usize), u32> = BTreeMap::new();
    let mut course_pins: BTreeMap<usize, u32> = BTreeMap::new();
    for (&(course, day), cells) in &pinned {
        let c = &model.courses()[course];
        let count = cells.len() as u32;
        if count > c.daily_cap {
            return Err(format!(
                "{} has {count} pinned slots on {}, daily ceiling is {}",
                name(course),
                model.days()[day],
                c.daily_cap
            ));
        }
        if let (true, Some(first), Some(last)) =
            (model.options().contiguity, cells.iter().min(), cells.iter().max())
        {
            if (last - first + 1) as u32 > c.daily_cap {
                return Err(format!(
                    "pinned slots of {} on {} cannot form one run within the daily ceiling",
                    name(course),
                    model.days()[day]
                ));
            }
        }
        *class_pins.entry((c.class, day)).or_default() += count;
        *course_pins.entry(course).or_default() += count;
    }
    for (&course, &count) in &course_pins {
        if let Some(hours) = model.courses()[course].hours {
            if count > hours {
                return Err(format!("{} has {count} pinned slots for {hours} hours", name(course)));
            }
        }
    }
    for (&(class, day), &count) in &class_pins {
        if let Some(cap) = model.classes()[class].max_hours_per_day {
            if count > cap {
                return Err(format!(
                    "class {} has {count} pinned slots on {}, daily load is {cap}",
                    model.classes()[class].id,
                    model.days()[day]
                ));
            }
        }
    }

    for (course, c) in model.courses().iter().enumerate() {
        let usable_days = (0..days)
            .filter(|&day| day_capacity(model, course, day) > 0)
            .count() as u32;
        if let Some(hours) = c.hours {
            let reachable = course_capacity(model, course);
            if reachable < hours {
                return Err(format!(
                    "{} needs {hours} hours but at most {reachable} fit in its open days",
                    name(course)
                ));
            }
            if c.min_days() > hours {
                return Err(format!(
                    "{} cannot spread {hours} hours over {} days",
                    name(course),
                    c.min_days()
                ));
            }
        }
        if let Some(min) = c.min_days {
            if min > usable_days {
                return Err(format!(
                    "{} needs {min} days but only {usable_days} are usable",
                    name(course)
                ));
            }
            if c.max_days.is_some_and(|max| min > max) {
                return Err(format!("{} has more minimum than maximum days", name(course)));
            }
        }
    }

    for (class, entry) in model.classes().iter().enumerate() {
        let per_day = entry
            .max_hours_per_day
            .map_or(slots as u32, |cap| cap.min(slots as u32));
        let needed: u32 = model
            .class_courses(class)
            .iter()
            .filter_map(|&c| model.courses()[c].hours)
            .sum();
        if needed > per_day * days as u32 {
            return Err(format!(
                "class {} needs {needed} hours but the week holds {}",
                entry.id,
                per_day * days as u32
            ));
        }
    }

    if model.options().teacher_overlap {
        for (teacher, id) in model.teachers().iter().enumerate() {
            let courses = model.teacher_courses(teacher);
            let Some(&first) = courses.first() else {
                continue;
            };
            let open = (0..days)
                .filter(|&d| model.courses()[first].is_open_on(d))
                .count() as u32;
            let needed: u32 = courses.iter().filter_map(|&c| model.courses()[c].hours).sum();
            if needed > open * slots as u32 {
                return Err(format!(
                    "teacher {id} is bound to {needed} hours but is present for {}",
                    open * slots as u32
                ));
            }
        }
    }
    Ok(())
}

/// Best weights each course can collect on each day, descending and at most
/// the daily ceiling long. Courses without a quota keep positive weights only.
#[derive(Debug, Clone)]
pub(crate) struct DayTops {
    days: usize,
    tops: Vec<Vec<f64>>,
    hours: Vec<Option<u32>>,
}

impl DayTops {
    pub(crate) fn new(model: &TimetableModel) -> Self {
        let days = model.days().len();
        let slots = model.slots().len();
        let mut tops = Vec::with_capacity(model.courses().len() * days);
        for (course, c) in model.courses().iter().enumerate() {
            for day in 0..days {
                let weights = (0..slots)
                    .map(|slot| Cell::new(course, day, slot))
                    .filter(|cell| model.is_open(*cell))
                    .map(|cell| model.weight(cell))
                    .filter(|w| c.hours.is_some() || *w > 0.0)
                    .sorted_by(|a, b| b.total_cmp(a))
                    .take(c.daily_cap as usize)
                    .collect();
                tops.push(weights);
            }
        }
        Self {
            days,
            tops,
            hours: model.courses().iter().map(|c| c.hours).collect(),
        }
    }

    /// Upper bound on what `course` can still add from `from_day` on, with
    /// `remaining` hours left to place (`None` when it has no quota).
    pub(crate) fn course_bound(
        &self,
        course: usize,
        from_day: usize,
        remaining: Option<u32>,
    ) -> f64 {
        let start = course * self.days + from_day.min(self.days);
        let days = &self.tops[start..(course + 1) * self.days];
        match remaining {
            Some(left) => days
                .iter()
                .flatten()
                .copied()
                .sorted_by(|a, b| b.total_cmp(a))
                .take(left as usize)
                .sum(),
            None => days.iter().flatten().sum(),
        }
    }

    /// Upper bound of the whole objective; the day penalty is never positive
    /// so it is left out.
    pub(crate) fn total(&self) -> f64 {
        (0..self.hours.len())
            .map(|course| self.course_bound(course, 0, self.hours[course]))
            .sum()
    }
}
