//! Solver engine: presolve, backend dispatch and outcome reporting.
//!
//! Two backends share one contract. The MILP backend hands the model to
//! HiGHS through good_lp; the search backend is a native branch and bound.
//! Whatever a backend returns is re-verified against the model before it is
//! reported as a [`Solution`].

mod milp;
mod presolve;
mod search;
mod tiebreak;

pub use tiebreak::{SeededTieBreak, TieBreak};

use crate::config::{Engine, ModelOptions, SolveOptions};
use crate::data::Catalog;
use crate::error::{SolveError, TimetableError};
use crate::model::TimetableModel;
use crate::solution::{Proof, Solution};
use crate::verify::{self, Assignment};
use itertools::Itertools;
use log::{info, warn};
use milp::{MilpResult, MilpSettings};
use presolve::DayTops;
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Result of one solve call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SolveOutcome {
    Solved(Solution),
    Infeasible { reason: String },
    /// The time limit passed before any feasible timetable was found.
    Timeout,
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolveOutcome::Infeasible { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SolveOutcome::Timeout)
    }
}

/// Solves `model` with the engine chosen in `options`. Ties between equally
/// scored candidates are broken by a generator seeded from `options.seed`.
pub fn solve(model: &TimetableModel, options: &SolveOptions) -> Result<SolveOutcome, SolveError> {
    solve_with_tie_break(model, options, &mut SeededTieBreak::new(options.seed))
}

/// Like [`solve`], with a caller-supplied tie-break for the search backend.
/// The MILP backend only sees `options.seed`.
pub fn solve_with_tie_break(
    model: &TimetableModel,
    options: &SolveOptions,
    tie_break: &mut dyn TieBreak,
) -> Result<SolveOutcome, SolveError> {
    options.validate()?;
    let started = Instant::now();

    if let Err(reason) = presolve::check(model) {
        info!("Presolve proved the model infeasible: {reason}");
        return Ok(SolveOutcome::Infeasible { reason });
    }
    let tops = DayTops::new(model);
    let bound = tops.total();
    info!("Upper bound on the objective: {bound:.3}");

    let run = Run {
        model,
        options,
        tops: &tops,
        bound,
        started,
    };
    let outcome = match options.engine {
        Engine::Milp => run.milp(),
        Engine::Search => run.search(tie_break),
        Engine::Auto => run.fall_back(run.milp(), tie_break),
    }?;
    info!("Solve finished in {:.2?}", started.elapsed());
    Ok(outcome)
}

/// Builds and solves each catalog independently on the rayon pool. Results
/// come back in input order.
pub fn solve_all(
    catalogs: &[Catalog],
    model_options: &ModelOptions,
    options: &SolveOptions,
) -> Vec<Result<SolveOutcome, TimetableError>> {
    info!("Solving {} independent timetables", catalogs.len());
    catalogs
        .par_iter()
        .map(|catalog| -> Result<SolveOutcome, TimetableError> {
            let model = TimetableModel::build(catalog, model_options)?;
            Ok(solve(&model, options)?)
        })
        .collect()
}

struct Run<'a> {
    model: &'a TimetableModel,
    options: &'a SolveOptions,
    tops: &'a DayTops,
    bound: f64,
    started: Instant,
}

impl Run<'_> {
    fn remaining(&self) -> Option<Duration> {
        self.options
            .time_limit()
            .map(|limit| limit.saturating_sub(self.started.elapsed()))
    }

    fn milp(&self) -> Result<SolveOutcome, SolveError> {
        let settings = MilpSettings {
            time_limit: self.remaining(),
            gap_tolerance: self.options.gap_tolerance,
            seed: self.options.seed,
        };
        let found = milp::run(self.model, &settings)?;
        // HiGHS stops quietly at its time limit; a late return is treated as one
        let hit_limit = self
            .options
            .time_limit()
            .is_some_and(|limit| self.started.elapsed() >= limit.mul_f64(0.95));
        self.settle_milp(found, hit_limit)
    }

    fn settle_milp(
        &self,
        found: MilpResult,
        hit_limit: bool,
    ) -> Result<SolveOutcome, SolveError> {
        let assignment = match found {
            MilpResult::Infeasible => {
                return Ok(SolveOutcome::Infeasible {
                    reason: "MILP backend proved the model infeasible".to_string(),
                });
            }
            MilpResult::Found(assignment) => assignment,
        };
        let violations = verify::verify(self.model, &assignment);
        if !violations.is_empty() {
            if hit_limit {
                return Ok(SolveOutcome::Timeout);
            }
            return Err(SolveError::Backend(format!(
                "MILP solution failed verification: {}",
                violations.iter().take(3).join("; ")
            )));
        }
        let proof = match (hit_limit, self.options.gap_tolerance > 0.0) {
            (true, _) => Proof::Unproven,
            (false, false) => Proof::Optimal,
            (false, true) => Proof::WithinTolerance,
        };
        Ok(self.report(assignment, Engine::Milp, proof))
    }

    /// Only a backend breakdown hands over to search; an infeasibility proof
    /// or a timeout from the MILP stands.
    fn fall_back(
        &self,
        milp: Result<SolveOutcome, SolveError>,
        tie_break: &mut dyn TieBreak,
    ) -> Result<SolveOutcome, SolveError> {
        match milp {
            Err(SolveError::Backend(e)) => {
                warn!("MILP backend failed ({e}); falling back to search");
                self.search(tie_break)
            }
            other => other,
        }
    }

    fn search(&self, tie_break: &mut dyn TieBreak) -> Result<SolveOutcome, SolveError> {
        let deadline = self.options.time_limit().map(|limit| self.started + limit);
        let result = search::run(
            self.model,
            self.tops,
            self.options.gap_tolerance,
            deadline,
            tie_break,
        );
        info!(
            "Search explored {} nodes ({})",
            result.nodes,
            if result.exhausted { "complete" } else { "time limit" }
        );
        match (result.best, result.exhausted) {
            (Some(assignment), exhausted) => {
                let violations = verify::verify(self.model, &assignment);
                if !violations.is_empty() {
                    return Err(SolveError::Backend(format!(
                        "search produced an invalid timetable: {}",
                        violations.iter().take(3).join("; ")
                    )));
                }
                let proof = match (exhausted, self.options.gap_tolerance > 0.0) {
                    (false, _) => Proof::Unproven,
                    (true, false) => Proof::Optimal,
                    (true, true) => Proof::WithinTolerance,
                };
                Ok(self.report(assignment, Engine::Search, proof))
            }
            (None, true) => Ok(SolveOutcome::Infeasible {
                reason: "search exhausted every candidate timetable".to_string(),
            }),
            (None, false) => Ok(SolveOutcome::Timeout),
        }
    }

    fn report(&self, assignment: Assignment, engine: Engine, proof: Proof) -> SolveOutcome {
        let solution = Solution::new(
            self.model,
            assignment,
            engine,
            proof,
            self.bound,
            self.options.gap_tolerance,
            self.started.elapsed().as_millis() as u64,
        );
        info!(
            "{engine:?} found objective {:.3} (optimal: {}, gap {:.4})",
            solution.objective, solution.is_optimal, solution.gap
        );
        SolveOutcome::Solved(solution)
    }
}
