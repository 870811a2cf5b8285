//! Weekly university timetabling: a catalog of classes, subjects, rooms and
//! teachers is turned into a constraint model and solved for the best
//! feasible timetable.

pub mod binding;
pub mod config;
pub mod constraints;
pub mod data;
pub mod error;
pub mod model;
pub mod server;
pub mod solution;
pub mod solver;
pub mod verify;

pub use config::{Engine, ModelOptions, OverflowPolicy, ServerConfig, SolveOptions};
pub use data::{
    Catalog, ClassGroup, Enrollment, FixedSlot, PreferenceWeight, Room, Subject, Teacher,
    TeacherBinding, UnmetSoftConstraint,
};
pub use error::{ModelError, SolveError, TimetableError};
pub use model::TimetableModel;
pub use solution::{ScheduledSession, Solution};
pub use solver::{SolveOutcome, solve, solve_all};
