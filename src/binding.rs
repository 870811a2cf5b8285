//! Optional pre-processing: pick one teacher per enrolled (class, subject)
//! pair from per-subject candidate lists.

use crate::data::{Catalog, SubjectId, TeacherBinding, TeacherId};
use crate::error::{EntityKind, ModelError};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::collections::{BTreeMap, HashSet};

/// Binds a teacher to every enrolled pair that has none yet.
///
/// Candidates are drawn uniformly from the subject's list, restricted to
/// teachers present on at least one day. Pairs without an eligible
/// candidate stay unbound. The draw is reproducible for a given `seed`.
pub fn bind_teachers(
    catalog: &Catalog,
    candidates: &BTreeMap<SubjectId, Vec<TeacherId>>,
    seed: u64,
) -> Result<Vec<TeacherBinding>, ModelError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let already: HashSet<(&str, &str)> = catalog
        .bindings
        .iter()
        .map(|b| (b.class.as_str(), b.subject.as_str()))
        .collect();

    let mut eligible: BTreeMap<&str, Vec<&TeacherId>> = BTreeMap::new();
    for (subject, teachers) in candidates {
        let mut present = Vec::with_capacity(teachers.len());
        for id in teachers {
            let teacher = catalog
                .teachers
                .iter()
                .find(|t| &t.id == id)
                .ok_or_else(|| ModelError::UnknownEntity {
                    kind: EntityKind::Teacher,
                    name: id.clone(),
                    context: format!("candidates for subject '{subject}'"),
                })?;
            if teacher.available_days.as_ref().is_none_or(|days| !days.is_empty()) {
                present.push(id);
            }
        }
        eligible.insert(subject.as_str(), present);
    }

    let mut bindings = Vec::new();
    for class in &catalog.classes {
        for enrollment in &class.subjects {
            if already.contains(&(class.id.as_str(), enrollment.subject.as_str())) {
                continue;
            }
            let chosen = eligible
                .get(enrollment.subject.as_str())
                .and_then(|teachers| teachers.choose(&mut rng));
            match chosen {
                Some(&teacher) => bindings.push(TeacherBinding {
                    class: class.id.clone(),
                    subject: enrollment.subject.clone(),
                    teacher: teacher.clone(),
                }),
                None => debug!(
                    "No available teacher for '{}' in class '{}'",
                    enrollment.subject, class.id
                ),
            }
        }
    }
    info!("Bound {} teachers from candidate lists", bindings.len());
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassGroup, Subject, Teacher};

    fn catalog() -> Catalog {
        Catalog::new(["Mon", "Tue"], ["9"])
            .with_subject(Subject::new("math", 1))
            .with_subject(Subject::new("art", 1))
            .with_teacher(Teacher::new("ana"))
            .with_teacher(Teacher::new("rui").available_on(["Tue"]))
            .with_teacher(Teacher::new("eva").available_on(Vec::<String>::new()))
            .with_class(ClassGroup::new("c1", 10).enroll("math").enroll("art"))
            .with_class(ClassGroup::new("c2", 10).enroll("math"))
            .bind("c1", "art", "ana")
    }

    fn candidates() -> BTreeMap<SubjectId, Vec<TeacherId>> {
        BTreeMap::from([
            ("math".to_string(), vec!["ana".to_string(), "rui".to_string(), "eva".to_string()]),
            ("art".to_string(), vec!["eva".to_string()]),
        ])
    }

    #[test]
    fn binds_unbound_pairs_from_present_teachers() {
        let bindings = bind_teachers(&catalog(), &candidates(), 3).unwrap();
        assert_eq!(bindings.len(), 2);
        for b in &bindings {
            assert_eq!(b.subject, "math");
            assert!(b.teacher == "ana" || b.teacher == "rui");
        }
    }

    #[test]
    fn same_seed_same_bindings() {
        let a = bind_teachers(&catalog(), &candidates(), 11).unwrap();
        let b = bind_teachers(&catalog(), &candidates(), 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_candidate_is_rejected() {
        let mut candidates = candidates();
        candidates.insert("art".to_string(), vec!["zoe".to_string()]);
        let err = bind_teachers(&catalog(), &candidates, 1).unwrap_err();
        assert!(matches!(err, ModelError::UnknownEntity { kind: EntityKind::Teacher, .. }));
    }
}
