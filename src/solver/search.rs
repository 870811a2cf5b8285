//! Native depth-first branch and bound.
//!
//! Courses are scheduled one at a time, most constrained first. Each course
//! is built from blocks: a run of consecutive slots on one day in one room.
//! With contiguity on, a course gets at most one block per day; otherwise
//! further blocks on the same day must leave a gap. Occupancy grids keep
//! every hard constraint satisfied by construction, and the bound from
//! [`DayTops`] cuts branches that cannot beat the incumbent.

use super::presolve::{self, DayTops};
use super::tiebreak::{self, TieBreak};
use crate::model::{Cell, TimetableModel};
use crate::verify::Assignment;
use log::{debug, info};
use std::cmp::Reverse;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Block {
    course: usize,
    day: usize,
    start: usize,
    len: usize,
    room: Option<usize>,
}

/// First position of the current course still open for a new block.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    day: usize,
    slot: usize,
}

impl Cursor {
    const ORIGIN: Cursor = Cursor { day: 0, slot: 0 };
}

/// What the search ended with.
pub(crate) struct SearchResult {
    pub best: Option<Assignment>,
    /// Every branch was either explored or pruned by the bound.
    pub exhausted: bool,
    pub nodes: u64,
}

struct Search<'a> {
    model: &'a TimetableModel,
    tops: &'a DayTops,
    tie_break: &'a mut dyn TieBreak,
    days: usize,
    slots: usize,
    order: Vec<usize>,
    suffix: Vec<f64>,
    class_busy: Vec<Option<usize>>,
    reserved: Vec<Option<usize>>,
    teacher_busy: Vec<bool>,
    room_busy: Vec<bool>,
    class_load: Vec<u32>,
    course_hours: Vec<u32>,
    pins: Vec<Vec<usize>>,
    open: Vec<u32>,
    stack: Vec<Block>,
    value: f64,
    best: Option<(f64, Vec<Block>)>,
    tolerance: f64,
    deadline: Option<Instant>,
    nodes: u64,
    timed_out: bool,
}

pub(crate) fn run(
    model: &TimetableModel,
    tops: &DayTops,
    tolerance: f64,
    deadline: Option<Instant>,
    tie_break: &mut dyn TieBreak,
) -> SearchResult {
    let mut search = Search::new(model, tops, tolerance, deadline, tie_break);
    info!(
        "Starting branch and bound over {} courses (bound {:.3})",
        search.order.len(),
        search.suffix.first().copied().unwrap_or(0.0)
    );
    search.explore(0, Cursor::ORIGIN, 0, 0);
    debug!(
        "Search visited {} nodes, timed out: {}",
        search.nodes, search.timed_out
    );

    let best = search.best.take().map(|(_, blocks)| {
        let mut assignment = Assignment::new(model);
        for block in blocks {
            for slot in block.start..block.start + block.len {
                assignment.teach(Cell::new(block.course, block.day, slot), block.room);
            }
        }
        assignment
    });
    SearchResult {
        best,
        exhausted: !search.timed_out,
        nodes: search.nodes,
    }
}

impl<'a> Search<'a> {
    fn new(
        model: &'a TimetableModel,
        tops: &'a DayTops,
        tolerance: f64,
        deadline: Option<Instant>,
        tie_break: &'a mut dyn TieBreak,
    ) -> Self {
        let days = model.days().len();
        let slots = model.slots().len();
        let courses = model.courses().len();

        let mut pins = vec![Vec::new(); courses * days];
        let mut reserved = vec![None; model.classes().len() * days * slots];
        for (&cell, &value) in model.fixed_cells() {
            if value {
                pins[cell.course * days + cell.day].push(cell.slot);
                let class = model.courses()[cell.course].class;
                reserved[(class * days + cell.day) * slots + cell.slot] = Some(cell.course);
            }
        }
        let open = (0..courses)
            .flat_map(|c| (0..days).map(move |d| (c, d)))
            .map(|(c, d)| {
                if model.courses()[c].is_open_on(d) {
                    presolve::open_cells(model, c, d)
                } else {
                    0
                }
            })
            .collect();

        let mut order: Vec<usize> = (0..courses).collect();
        order.sort_by_key(|&c| {
            let course = &model.courses()[c];
            let pinned = (0..days).any(|d| !pins[c * days + d].is_empty());
            let slack = course
                .hours
                .map_or(u32::MAX, |h| presolve::course_capacity(model, c).saturating_sub(h));
            (!pinned, slack, Reverse(course.hours.unwrap_or(0)), c)
        });
        let mut suffix = vec![0.0; courses + 1];
        for i in (0..courses).rev() {
            let c = order[i];
            suffix[i] = suffix[i + 1] + tops.course_bound(c, 0, model.courses()[c].hours);
        }

        Self {
            model,
            tops,
            tie_break,
            days,
            slots,
            order,
            suffix,
            class_busy: vec![None; model.classes().len() * days * slots],
            reserved,
            teacher_busy: vec![false; model.teachers().len() * days * slots],
            room_busy: vec![false; model.rooms().len() * days * slots],
            class_load: vec![0; model.classes().len() * days],
            course_hours: vec![0; courses * days],
            pins,
            open,
            stack: Vec::new(),
            value: 0.0,
            best: None,
            tolerance,
            deadline,
            nodes: 0,
            timed_out: false,
        }
    }

    fn grid(&self, owner: usize, day: usize, slot: usize) -> usize {
        (owner * self.days + day) * self.slots + slot
    }

    fn tick(&mut self) -> bool {
        self.nodes += 1;
        if !self.timed_out && self.nodes % 1024 == 1 {
            if let Some(deadline) = self.deadline {
                self.timed_out = Instant::now() >= deadline;
            }
        }
        self.timed_out
    }

    fn explore(&mut self, i: usize, cursor: Cursor, placed: u32, days_used: u32) {
        if self.tick() {
            return;
        }
        let Some(&course) = self.order.get(i) else {
            self.record();
            return;
        };
        let model = self.model;
        let c = &model.courses()[course];
        let remaining = c.hours.map(|h| h - placed);

        if let Some((best, _)) = &self.best {
            let optimistic = self.value
                + self.tops.course_bound(course, cursor.day, remaining)
                + self.suffix[i + 1];
            if optimistic <= best + self.tolerance * best.abs().max(1.0) + 1e-9 {
                return;
            }
        }
        if !self.can_finish(course, cursor, placed, days_used) {
            return;
        }

        let mut candidates: Vec<(f64, Option<Block>)> = Vec::new();
        if self.can_close(course, cursor, placed, days_used) {
            candidates.push((0.0, None));
        }
        if remaining != Some(0) {
            self.collect_blocks(course, cursor, remaining, days_used, &mut candidates);
        }
        tiebreak::rank(&mut candidates, &mut *self.tie_break);

        for (_, candidate) in candidates {
            match candidate {
                None => {
                    let extra = days_used.saturating_sub(c.min_days());
                    let penalty = model.day_penalty() * f64::from(extra);
                    self.value -= penalty;
                    self.explore(i + 1, Cursor::ORIGIN, 0, 0);
                    self.value += penalty;
                }
                Some(block) => {
                    let new_day = self.course_hours[course * self.days + block.day] == 0;
                    self.place(block);
                    let next = if model.options().contiguity {
                        Cursor {
                            day: block.day + 1,
                            slot: 0,
                        }
                    } else {
                        Cursor {
                            day: block.day,
                            slot: block.start + block.len + 1,
                        }
                    };
                    self.explore(
                        i,
                        next,
                        placed + block.len as u32,
                        days_used + u32::from(new_day),
                    );
                    self.unplace(block);
                }
            }
            if self.timed_out {
                return;
            }
        }
    }

    fn record(&mut self) {
        if self.best.as_ref().is_none_or(|(best, _)| self.value > best + 1e-9) {
            debug!("New incumbent with objective {:.3} after {} nodes", self.value, self.nodes);
            self.best = Some((self.value, self.stack.clone()));
        }
    }

    /// Pinned slots of `course` at or after the cursor.
    fn pending_pin(&self, course: usize, cursor: Cursor) -> bool {
        (cursor.day..self.days).any(|day| {
            let from = if day == cursor.day { cursor.slot } else { 0 };
            self.pins[course * self.days + day].iter().any(|&p| p >= from)
        })
    }

    fn can_close(&self, course: usize, cursor: Cursor, placed: u32, days_used: u32) -> bool {
        let c = &self.model.courses()[course];
        c.hours.is_none_or(|h| placed == h)
            && c.min_days.is_none_or(|m| days_used >= m)
            && !self.pending_pin(course, cursor)
    }

    fn can_finish(&self, course: usize, cursor: Cursor, placed: u32, days_used: u32) -> bool {
        let c = &self.model.courses()[course];
        let mut capacity = 0;
        let mut fresh_days = 0;
        for day in cursor.day..self.days {
            let at = course * self.days + day;
            let room = if day == cursor.day {
                (c.daily_cap - self.course_hours[at])
                    .min(self.slots.saturating_sub(cursor.slot) as u32)
            } else {
                c.daily_cap
            };
            capacity += room.min(self.open[at]);
            if self.open[at] > 0 && self.course_hours[at] == 0 {
                fresh_days += 1;
            }
        }
        c.hours.is_none_or(|h| capacity >= h - placed)
            && c.min_days.is_none_or(|m| days_used + fresh_days >= m)
    }

    fn cell_free(&self, course: usize, day: usize, slot: usize) -> bool {
        let model = self.model;
        let c = &model.courses()[course];
        if !model.is_open(Cell::new(course, day, slot)) {
            return false;
        }
        let at = self.grid(c.class, day, slot);
        if self.class_busy[at].is_some() || self.reserved[at].is_some_and(|r| r != course) {
            return false;
        }
        match c.teacher {
            Some(t) if model.options().teacher_overlap => {
                !self.teacher_busy[self.grid(t, day, slot)]
            }
            _ => true,
        }
    }

    fn block_allowed(&self, course: usize, day: usize, start: usize, len: usize) -> bool {
        let model = self.model;
        let c = &model.courses()[course];
        let end = start + len - 1;
        if self.course_hours[course * self.days + day] + len as u32 > c.daily_cap {
            return false;
        }
        if let Some(cap) = model.classes()[c.class].max_hours_per_day {
            if self.class_load[c.class * self.days + day] + len as u32 > cap {
                return false;
            }
        }
        let pins = &self.pins[course * self.days + day];
        if model.options().contiguity {
            if pins.iter().any(|&p| p < start || p > end) {
                return false;
            }
        } else if pins.contains(&(end + 1)) {
            return false;
        }
        // a later block ending the day after an earlier one started it
        let first_taught = self.class_busy[self.grid(c.class, day, 0)] == Some(course);
        if self.slots > 1 && end == self.slots - 1 && start > 0 && first_taught {
            return false;
        }
        true
    }

    fn collect_blocks(
        &self,
        course: usize,
        cursor: Cursor,
        remaining: Option<u32>,
        days_used: u32,
        out: &mut Vec<(f64, Option<Block>)>,
    ) {
        let model = self.model;
        let c = &model.courses()[course];
        let max_len = remaining.map_or(c.daily_cap, |r| r.min(c.daily_cap)) as usize;
        let at_max_days = c.max_days.is_some_and(|m| days_used >= m);

        for day in cursor.day..self.days {
            let from = if day == cursor.day { cursor.slot } else { 0 };
            let first_pin = self.pins[course * self.days + day]
                .iter()
                .copied()
                .filter(|&p| p >= from)
                .min();
            let new_day = self.course_hours[course * self.days + day] == 0;

            if c.is_open_on(day) && from < self.slots && !(new_day && at_max_days) {
                let spread = if new_day && days_used + 1 > c.min_days() {
                    model.day_penalty()
                } else {
                    0.0
                };
                let last_start = first_pin.unwrap_or(self.slots - 1);
                for start in from..=last_start {
                    let mut score = -spread;
                    for len in 1..=max_len {
                        let slot = start + len - 1;
                        if slot >= self.slots || !self.cell_free(course, day, slot) {
                            break;
                        }
                        score += model.weight(Cell::new(course, day, slot));
                        if !self.block_allowed(course, day, start, len) {
                            continue;
                        }
                        let block = |room| Block {
                            course,
                            day,
                            start,
                            len,
                            room,
                        };
                        if model.rooms_modeled() {
                            for &room in &c.rooms {
                                let free = model.rooms()[room].overflow
                                    || (start..=slot)
                                        .all(|s| !self.room_busy[self.grid(room, day, s)]);
                                if free {
                                    out.push((score, Some(block(Some(room)))));
                                }
                            }
                        } else {
                            out.push((score, Some(block(None))));
                        }
                    }
                }
            }
            // a day holding unplaced pins cannot be skipped
            if first_pin.is_some() {
                break;
            }
        }
    }

    fn occupy(&mut self, block: Block, on: bool) {
        let model = self.model;
        let c = &model.courses()[block.course];
        let teacher = c.teacher.filter(|_| model.options().teacher_overlap);
        let room = block.room.filter(|&r| !model.rooms()[r].overflow);
        for slot in block.start..block.start + block.len {
            let at = self.grid(c.class, block.day, slot);
            self.class_busy[at] = on.then_some(block.course);
            if let Some(t) = teacher {
                let at = self.grid(t, block.day, slot);
                self.teacher_busy[at] = on;
            }
            if let Some(r) = room {
                let at = self.grid(r, block.day, slot);
                self.room_busy[at] = on;
            }
        }
        let len = block.len as u32;
        let weight: f64 = (block.start..block.start + block.len)
            .map(|slot| model.weight(Cell::new(block.course, block.day, slot)))
            .sum();
        let load = c.class * self.days + block.day;
        let hours = block.course * self.days + block.day;
        if on {
            self.class_load[load] += len;
            self.course_hours[hours] += len;
            self.value += weight;
        } else {
            self.class_load[load] -= len;
            self.course_hours[hours] -= len;
            self.value -= weight;
        }
    }

    fn place(&mut self, block: Block) {
        self.occupy(block, true);
        self.stack.push(block);
    }

    fn unplace(&mut self, block: Block) {
        self.stack.pop();
        self.occupy(block, false);
    }
}
