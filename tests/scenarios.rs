use itertools::Itertools;
use std::time::Duration;
use timetable_solver::verify;
use timetable_solver::{
    Catalog, ClassGroup, Engine, FixedSlot, ModelError, ModelOptions, PreferenceWeight, Room,
    Solution, SolveOptions, Subject, Teacher, TimetableModel, solve, solve_all,
};

const WEEK: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

fn options(engine: Engine) -> SolveOptions {
    SolveOptions::default()
        .with_engine(engine)
        .with_seed(42)
        .with_time_limit(Duration::from_secs(30))
}

fn two_by_two() -> Catalog {
    Catalog::new(["Mon", "Tue"], ["9", "10"])
        .with_subject(Subject::new("math", 2))
        .with_subject(Subject::new("art", 2))
        .with_class(ClassGroup::new("c1", 10).enroll("math").enroll("art"))
}

fn mixed() -> Catalog {
    Catalog::new(["Mon", "Tue", "Wed"], ["9", "10", "11"])
        .with_subject(Subject::new("math", 3).with_preferred_rooms(["a"]))
        .with_subject(Subject::new("art", 2))
        .with_subject(Subject::new("bio", 2).with_max_hours_per_day(1))
        .with_room(Room::new("a", 30))
        .with_room(Room::new("b", 15))
        .with_teacher(Teacher::new("ana"))
        .with_class(ClassGroup::new("c1", 20).enroll("math").enroll("art"))
        .with_class(ClassGroup::new("c2", 12).enroll("math").enroll("bio"))
        .bind("c1", "math", "ana")
        .bind("c2", "math", "ana")
}

fn mixed_preferences() -> Vec<PreferenceWeight> {
    vec![
        PreferenceWeight::new("c1", "Mon", "9", "math", 4.0),
        PreferenceWeight::new("c2", "Mon", "9", "math", 3.0),
        PreferenceWeight::new("c1", "Wed", "11", "art", 2.5),
        PreferenceWeight::new("c2", "Tue", "10", "bio", -2.0),
        PreferenceWeight::new("c2", "Wed", "9", "bio", 1.5),
    ]
}

#[test]
fn two_subjects_fill_a_two_by_two_grid() {
    let model = TimetableModel::build(&two_by_two(), &ModelOptions::default()).unwrap();
    for engine in [Engine::Milp, Engine::Search] {
        let outcome = solve(&model, &options(engine)).unwrap();
        let solution = outcome.solution().expect("feasible");
        assert!(verify::verify(&model, solution.assignment()).is_empty());
        assert_eq!(solution.objective, 4.0, "{engine:?}");
        assert!(solution.is_optimal);
        assert_eq!(solution.gap, 0.0);
        assert_eq!(solution.sessions.len(), 4);
        // each subject takes one whole day
        for day in ["Mon", "Tue"] {
            assert_eq!(
                solution.subject_at("c1", day, "9"),
                solution.subject_at("c1", day, "10")
            );
        }
    }
}

#[test]
fn quota_beyond_capacity_is_infeasible() {
    let catalog = Catalog::new(["Mon", "Tue"], ["9", "10"])
        .with_subject(Subject::new("math", 5))
        .with_class(ClassGroup::new("c1", 10).enroll("math"));
    let model = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap();
    for engine in [Engine::Auto, Engine::Search] {
        assert!(solve(&model, &options(engine)).unwrap().is_infeasible());
    }
}

#[test]
fn pins_and_forbids_shape_the_timetable() {
    let mut model = TimetableModel::build(&two_by_two(), &ModelOptions::default()).unwrap();
    model
        .apply_fixed_slots(&[
            FixedSlot::pin("c1", "Mon", "9", "math"),
            FixedSlot::forbid("c1", "Mon", "9", "art"),
        ])
        .unwrap();
    for engine in [Engine::Milp, Engine::Search] {
        let outcome = solve(&model, &options(engine)).unwrap();
        let solution = outcome.solution().expect("feasible");
        assert_eq!(solution.subject_at("c1", "Mon", "9"), Some("math"));
        assert!(verify::verify(&model, solution.assignment()).is_empty());
    }

    let err = model
        .apply_fixed_slots(&[FixedSlot::pin("c1", "Mon", "9", "art")])
        .unwrap_err();
    assert!(matches!(err, ModelError::ConflictingFixedSlot { .. }));
}

#[test]
fn absent_teacher_days_stay_empty() {
    let catalog = Catalog::new(WEEK, ["9", "10"])
        .with_subject(Subject::new("math", 6))
        .with_teacher(Teacher::new("ana").available_on(["Mon", "Tue", "Wed"]))
        .with_class(ClassGroup::new("c1", 10).enroll("math"))
        .bind("c1", "math", "ana");
    let model = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap();
    for engine in [Engine::Milp, Engine::Search] {
        let outcome = solve(&model, &options(engine)).unwrap();
        let solution = outcome.solution().expect("feasible");
        assert_eq!(solution.sessions.len(), 6);
        assert!(
            solution
                .sessions
                .iter()
                .all(|s| ["Mon", "Tue", "Wed"].contains(&s.day.as_str()))
        );
        assert_eq!(solution.objective, 6.0);
    }
}

#[test]
fn engines_agree_on_the_optimum() {
    let mut model = TimetableModel::build(&mixed(), &ModelOptions::default()).unwrap();
    model.apply_preference_weights(&mixed_preferences()).unwrap();

    let milp = solve(&model, &options(Engine::Milp)).unwrap();
    let search = solve(&model, &options(Engine::Search)).unwrap();
    let (milp, search) = (milp.solution().unwrap(), search.solution().unwrap());
    assert!(verify::verify(&model, milp.assignment()).is_empty());
    assert!(verify::verify(&model, search.assignment()).is_empty());
    assert!((milp.objective - search.objective).abs() < 1e-6);
    assert!(search.is_optimal);
    assert!(search.objective <= search.best_bound + 1e-9);
}

#[test]
fn engines_agree_without_contiguity() {
    let options_off = ModelOptions::default().with_contiguity(false).with_rooms(false);
    let mut model = TimetableModel::build(&mixed(), &options_off).unwrap();
    model.apply_preference_weights(&mixed_preferences()).unwrap();

    let milp = solve(&model, &options(Engine::Milp)).unwrap().into_solution().unwrap();
    let search = solve(&model, &options(Engine::Search)).unwrap().into_solution().unwrap();
    assert!((milp.objective - search.objective).abs() < 1e-6);
}

#[test]
fn same_seed_same_timetable() {
    let mut model = TimetableModel::build(&mixed(), &ModelOptions::default()).unwrap();
    model.apply_preference_weights(&mixed_preferences()).unwrap();
    for engine in [Engine::Milp, Engine::Search] {
        let first = solve(&model, &options(engine)).unwrap().into_solution().unwrap();
        let second = solve(&model, &options(engine)).unwrap().into_solution().unwrap();
        assert_eq!(first.objective, second.objective);
        if engine == Engine::Search {
            assert_eq!(first.sessions, second.sessions);
        }
    }
}

#[test]
fn room_contention_is_proven_infeasible() {
    let catalog = Catalog::new(["Mon"], ["9", "10", "11"])
        .with_subject(Subject::new("math", 2))
        .with_room(Room::new("a", 30))
        .with_class(ClassGroup::new("c1", 10).enroll("math"))
        .with_class(ClassGroup::new("c2", 10).enroll("math"));
    let model = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap();
    for engine in [Engine::Auto, Engine::Search] {
        assert!(solve(&model, &options(engine)).unwrap().is_infeasible());
    }
}

#[test]
fn zero_time_limit_times_out() {
    let model = TimetableModel::build(&mixed(), &ModelOptions::default()).unwrap();
    let options = SolveOptions::default()
        .with_engine(Engine::Search)
        .with_time_limit(Duration::ZERO);
    assert!(solve(&model, &options).unwrap().is_timeout());
}

#[test]
fn gap_tolerance_bounds_the_reported_gap() {
    let mut model = TimetableModel::build(&mixed(), &ModelOptions::default()).unwrap();
    model.apply_preference_weights(&mixed_preferences()).unwrap();
    let options = options(Engine::Search).with_gap_tolerance(0.25);
    let solution = solve(&model, &options).unwrap().into_solution().unwrap();
    assert!(solution.gap <= 0.25);
    assert!(verify::verify(&model, solution.assignment()).is_empty());
}

#[test]
fn overflow_room_takes_oversized_classes() {
    let catalog = Catalog::new(["Mon", "Tue"], ["9", "10"])
        .with_subject(Subject::new("math", 2))
        .with_room(Room::new("small", 5))
        .with_class(ClassGroup::new("c1", 40).enroll("math"))
        .with_class(ClassGroup::new("c2", 40).enroll("math"));
    let options_overflow = ModelOptions::default()
        .with_capacity_check(timetable_solver::OverflowPolicy::TemporaryRoom);
    let model = TimetableModel::build(&catalog, &options_overflow).unwrap();
    let unseeded = SolveOptions::default().with_engine(Engine::Search);
    let solution = solve(&model, &unseeded).unwrap().into_solution().unwrap();
    // both classes share the overflow room at the same time
    assert_eq!(solution.room_at("c1", "Mon", "9"), Some("temporary"));
    assert_eq!(solution.room_at("c2", "Mon", "9"), Some("temporary"));
}

#[test]
fn solve_all_keeps_input_order() {
    let broken = Catalog::new(["Mon"], ["9"])
        .with_class(ClassGroup::new("c1", 10).enroll("ghost"));
    let infeasible = Catalog::new(["Mon"], ["9"])
        .with_subject(Subject::new("math", 2))
        .with_class(ClassGroup::new("c1", 10).enroll("math"));
    let results = solve_all(
        &[two_by_two(), broken, infeasible],
        &ModelOptions::default(),
        &options(Engine::Search),
    );
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().solution().unwrap().objective, 4.0);
    assert!(results[1].is_err());
    assert!(results[2].as_ref().unwrap().is_infeasible());
}

fn days_taught(solution: &Solution, class: &str, subject: &str) -> usize {
    solution
        .sessions_of(class)
        .filter(|s| s.subject == subject)
        .map(|s| s.day.as_str())
        .unique()
        .count()
}

#[test]
fn class_daily_load_pushes_sessions_apart() {
    let catalog = |cap: Option<u32>| {
        let class = ClassGroup::new("c1", 10).enroll("math").enroll("art");
        Catalog::new(["Mon", "Tue"], ["9", "10"])
            .with_subject(Subject::new("math", 1))
            .with_subject(Subject::new("art", 1))
            .with_class(match cap {
                Some(cap) => class.with_max_hours_per_day(cap),
                None => class,
            })
    };
    let preferences = [
        PreferenceWeight::new("c1", "Mon", "9", "math", 5.0),
        PreferenceWeight::new("c1", "Mon", "10", "art", 5.0),
    ];
    for engine in [Engine::Milp, Engine::Search] {
        let mut free = TimetableModel::build(&catalog(None), &ModelOptions::default()).unwrap();
        free.apply_preference_weights(&preferences).unwrap();
        let solution = solve(&free, &options(engine)).unwrap().into_solution().unwrap();
        assert_eq!(solution.objective, 10.0, "{engine:?}");

        let mut capped =
            TimetableModel::build(&catalog(Some(1)), &ModelOptions::default()).unwrap();
        capped.apply_preference_weights(&preferences).unwrap();
        let solution = solve(&capped, &options(engine)).unwrap().into_solution().unwrap();
        assert!(verify::verify(&capped, solution.assignment()).is_empty());
        assert_eq!(solution.objective, 6.0, "{engine:?}");
        for day in ["Mon", "Tue"] {
            let load = solution.sessions_of("c1").filter(|s| s.day == day).count();
            assert_eq!(load, 1, "{engine:?} {day}");
        }
    }
}

#[test]
fn class_daily_load_below_the_quota_is_infeasible() {
    let catalog = Catalog::new(["Mon", "Tue"], ["9", "10"])
        .with_subject(Subject::new("math", 3))
        .with_class(ClassGroup::new("c1", 10).enroll("math").with_max_hours_per_day(1));
    let model = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap();
    for engine in [Engine::Auto, Engine::Search] {
        assert!(solve(&model, &options(engine)).unwrap().is_infeasible(), "{engine:?}");
    }
}

#[test]
fn minimum_days_spread_a_subject() {
    let catalog = |min: Option<u32>| {
        Catalog::new(["Mon", "Tue", "Wed"], ["9", "10"])
            .with_subject(Subject::new("math", 2).with_days_per_week(min, None))
            .with_class(ClassGroup::new("c1", 10).enroll("math"))
    };
    let preferences = [
        PreferenceWeight::new("c1", "Mon", "9", "math", 4.0),
        PreferenceWeight::new("c1", "Mon", "10", "math", 4.0),
    ];
    for engine in [Engine::Milp, Engine::Search] {
        let mut free = TimetableModel::build(&catalog(None), &ModelOptions::default()).unwrap();
        free.apply_preference_weights(&preferences).unwrap();
        let solution = solve(&free, &options(engine)).unwrap().into_solution().unwrap();
        assert_eq!(solution.objective, 8.0, "{engine:?}");
        assert_eq!(days_taught(&solution, "c1", "math"), 1);

        let mut spread =
            TimetableModel::build(&catalog(Some(2)), &ModelOptions::default()).unwrap();
        spread.apply_preference_weights(&preferences).unwrap();
        let solution = solve(&spread, &options(engine)).unwrap().into_solution().unwrap();
        assert!(verify::verify(&spread, solution.assignment()).is_empty());
        // the second day is required, so it carries no penalty
        assert_eq!(solution.objective, 5.0, "{engine:?}");
        assert_eq!(days_taught(&solution, "c1", "math"), 2);
    }
}

#[test]
fn maximum_days_keep_a_subject_together() {
    let catalog = |max: Option<u32>| {
        Catalog::new(["Mon", "Tue", "Wed"], ["9", "10"])
            .with_subject(Subject::new("math", 2).with_days_per_week(None, max))
            .with_class(ClassGroup::new("c1", 10).enroll("math"))
    };
    // a double session has to use a costly second slot
    let preferences: Vec<PreferenceWeight> = ["Mon", "Tue", "Wed"]
        .into_iter()
        .map(|day| PreferenceWeight::new("c1", day, "10", "math", -10.0))
        .collect();
    for engine in [Engine::Milp, Engine::Search] {
        let mut free = TimetableModel::build(&catalog(None), &ModelOptions::default()).unwrap();
        free.apply_preference_weights(&preferences).unwrap();
        let solution = solve(&free, &options(engine)).unwrap().into_solution().unwrap();
        assert_eq!(solution.objective, -3.0, "{engine:?}");
        assert_eq!(days_taught(&solution, "c1", "math"), 2);

        let mut packed =
            TimetableModel::build(&catalog(Some(1)), &ModelOptions::default()).unwrap();
        packed.apply_preference_weights(&preferences).unwrap();
        let solution = solve(&packed, &options(engine)).unwrap().into_solution().unwrap();
        assert!(verify::verify(&packed, solution.assignment()).is_empty());
        assert_eq!(solution.objective, -9.0, "{engine:?}");
        assert_eq!(days_taught(&solution, "c1", "math"), 1);
    }
}

#[test]
fn impossible_day_bounds_are_infeasible() {
    let too_many_days = Catalog::new(["Mon", "Tue"], ["9", "10"])
        .with_subject(Subject::new("math", 3).with_days_per_week(Some(3), None))
        .with_class(ClassGroup::new("c1", 10).enroll("math"));
    let min_above_max = Catalog::new(["Mon", "Tue", "Wed"], ["9", "10"])
        .with_subject(Subject::new("math", 2).with_days_per_week(Some(2), Some(1)))
        .with_class(ClassGroup::new("c1", 10).enroll("math"));
    for catalog in [too_many_days, min_above_max] {
        let model = TimetableModel::build(&catalog, &ModelOptions::default()).unwrap();
        for engine in [Engine::Auto, Engine::Search] {
            assert!(solve(&model, &options(engine)).unwrap().is_infeasible(), "{engine:?}");
        }
    }
}

#[test]
fn split_sessions_keep_their_room() {
    let catalog = Catalog::new(["Mon"], ["9", "10", "11"])
        .with_subject(Subject::new("math", 2))
        .with_room(Room::new("a", 30))
        .with_room(Room::new("b", 30))
        .with_class(ClassGroup::new("c1", 10).enroll("math"))
        .with_class(ClassGroup::new("c2", 10).enroll("math"));
    let model_options = ModelOptions::default().with_contiguity(false);
    let mut model = TimetableModel::build(&catalog, &model_options).unwrap();
    model
        .apply_preference_weights(&[
            PreferenceWeight::new("c1", "Mon", "9", "math", 3.0),
            PreferenceWeight::new("c2", "Mon", "10", "math", 3.0),
        ])
        .unwrap();
    for engine in [Engine::Milp, Engine::Search] {
        let solution = solve(&model, &options(engine)).unwrap().into_solution().unwrap();
        assert!(verify::verify(&model, solution.assignment()).is_empty());
        for class in ["c1", "c2"] {
            let rooms: Vec<&str> = solution
                .sessions_of(class)
                .filter_map(|s| s.room.as_deref())
                .collect();
            assert_eq!(rooms.len(), 2, "{engine:?} {class}");
            assert_eq!(rooms[0], rooms[1], "{engine:?} {class}");
        }
        for slot in ["9", "10", "11"] {
            let c1 = solution.room_at("c1", "Mon", slot);
            assert!(c1.is_none() || c1 != solution.room_at("c2", "Mon", slot));
        }
    }
}
