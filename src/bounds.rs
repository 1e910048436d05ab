//! Bound Analyzer: necessary-condition feasibility checks that run in
//! near-linear time, before any assignment model is built.
//!
//! Only two findings make a run infeasible: aggregate faculty capacity below
//! the session count, and a course with demand but no eligible faculty or no
//! eligible room. A room that cannot seat a group taking the course is not
//! eligible for that group's sessions. Everything else is advisory.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::data::Session;
use crate::eligibility::{eligible_faculty, eligible_rooms, rooms_seating};
use crate::sessions::course_demand;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoundAnalysis {
    pub feasible: bool,
    pub warnings: Vec<String>,
}

pub fn analyze_bounds(context: &Context, sessions: &[Session]) -> BoundAnalysis {
    let mut feasible = true;
    let mut warnings = Vec::new();

    // 1. aggregate capacity
    let total_sessions = sessions.len() as u64;
    let total_capacity: u64 = context
        .faculty
        .iter()
        .map(|f| u64::from(f.max_hours_per_week))
        .sum();
    if total_sessions > total_capacity {
        feasible = false;
        warnings.push(format!(
            "Capacity shortage: {} sessions need {} hours/week but faculty provide at most {} (short by {} hours)",
            total_sessions,
            total_sessions,
            total_capacity,
            total_sessions - total_capacity
        ));
    }

    // 2. per-course eligibility
    let mut courses: Vec<_> = context.courses.iter().collect();
    courses.sort_by(|a, b| a.code.cmp(&b.code));
    let mut groups: Vec<_> = context.student_groups.iter().collect();
    groups.sort_by_key(|g| g.id);
    for course in courses {
        let demand = course_demand(context, course.hours_per_week);
        if eligible_faculty(course, &context.faculty, &context.faculty_expertise).is_empty() {
            if demand > 0 {
                feasible = false;
            }
            warnings.push(format!(
                "Course {} has no eligible faculty ({} sessions demanded)",
                course.code, demand
            ));
        }
        if eligible_rooms(course, &context.rooms, &context.room_capabilities).is_empty() {
            if demand > 0 {
                feasible = false;
            }
            warnings.push(format!(
                "Course {} has no eligible room ({} sessions demanded)",
                course.code, demand
            ));
        } else if course.hours_per_week > 0 {
            for group in &groups {
                let seated = rooms_seating(
                    course,
                    group.total_students,
                    &context.rooms,
                    &context.room_capabilities,
                );
                if seated.is_empty() {
                    feasible = false;
                    warnings.push(format!(
                        "Course {} has no eligible room seating group {} ({} students, {} sessions demanded)",
                        course.code, group.name, group.total_students, course.hours_per_week
                    ));
                }
            }
        }
    }

    // 3. per-faculty availability
    for member in &context.faculty {
        let available = context.available_slot_count(member.id) as u64;
        let min = u64::from(member.min_hours_per_week);
        if available == 0 && min > 0 {
            warnings.push(format!(
                "Faculty {} ({}) has no available time slots but requires at least {} hours/week",
                member.id, member.name, min
            ));
        } else if available < min {
            warnings.push(format!(
                "Faculty {} ({}) has only {} available time slots, below the minimum of {} hours/week",
                member.id, member.name, available, min
            ));
        }
    }

    // 4. min/max consistency
    for member in &context.faculty {
        if member.min_hours_per_week > member.max_hours_per_week {
            warnings.push(format!(
                "Faculty {} ({}) has min_hours_per_week {} greater than max_hours_per_week {}",
                member.id, member.name, member.min_hours_per_week, member.max_hours_per_week
            ));
        }
    }

    // 5. minimum load exceeds demand
    let total_minimum: u64 = context
        .faculty
        .iter()
        .map(|f| u64::from(f.min_hours_per_week))
        .sum();
    if total_minimum > total_sessions {
        warnings.push(format!(
            "Faculty minimums total {} hours/week but only {} sessions exist; some minimums cannot be met",
            total_minimum, total_sessions
        ));
    }

    if feasible {
        info!("Bound analysis passed with {} warning(s)", warnings.len());
    } else {
        warn!("Bound analysis failed: {}", warnings.join("; "));
    }
    BoundAnalysis { feasible, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::expand_sessions;
    use crate::store::SnapshotDocument;

    fn run(doc: SnapshotDocument) -> BoundAnalysis {
        let context = Context::load(&doc).unwrap();
        let sessions = expand_sessions(&context);
        analyze_bounds(&context, &sessions)
    }

    fn three_course_scenario() -> SnapshotDocument {
        SnapshotDocument::default()
            .with_course(1, "C1", 2)
            .with_course(2, "C2", 2)
            .with_course(3, "C3", 2)
            .with_group(1, "G", 30)
            .with_faculty(1, "F1", 0, 4)
            .with_faculty(2, "F2", 0, 4)
            .with_day(0, 1, 4)
            .with_room(1, 40, &[])
            .with_room(2, 40, &[])
            .with_full_availability()
    }

    #[test]
    fn sufficient_capacity_and_eligibility_is_feasible() {
        let analysis = run(three_course_scenario());
        assert!(analysis.feasible);
        assert!(analysis.warnings.is_empty(), "{:?}", analysis.warnings);
    }

    #[test]
    fn capacity_shortage_cites_deficit() {
        let doc = SnapshotDocument::default()
            .with_course(1, "C1", 5)
            .with_group(1, "G", 30)
            .with_faculty(1, "F1", 0, 2)
            .with_day(0, 1, 8)
            .with_room(1, 40, &[])
            .with_full_availability();
        let analysis = run(doc);
        assert!(!analysis.feasible);
        assert!(analysis.warnings[0].contains("short by 3 hours"));
    }

    #[test]
    fn course_without_expert_is_named() {
        let doc = three_course_scenario()
            .with_expertise(1, "C1,C2")
            .with_expertise(2, "C1");
        let analysis = run(doc);
        assert!(!analysis.feasible);
        assert!(
            analysis
                .warnings
                .iter()
                .any(|w| w.contains("C3") && w.contains("no eligible faculty"))
        );
    }

    #[test]
    fn course_without_demand_does_not_block() {
        let doc = three_course_scenario()
            .with_tagged_course(4, "C4", 0, &["telescope"]);
        let analysis = run(doc);
        assert!(analysis.feasible);
        assert!(analysis.warnings.iter().any(|w| w.contains("C4") && w.contains("no eligible room")));
    }

    #[test]
    fn group_too_large_for_every_room_blocks() {
        let doc = SnapshotDocument::default()
            .with_course(1, "C1", 2)
            .with_group(1, "Big", 80)
            .with_faculty(1, "F1", 0, 4)
            .with_day(0, 1, 4)
            .with_room(1, 40, &[])
            .with_full_availability();
        let analysis = run(doc);
        assert!(!analysis.feasible);
        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].contains("C1"));
        assert!(analysis.warnings[0].contains("seating group Big (80 students"));
    }

    #[test]
    fn only_the_unseatable_group_is_named() {
        let doc = three_course_scenario()
            .with_group(2, "Huge", 50)
            .with_room(3, 60, &[])
            .with_faculty(3, "F3", 0, 10)
            .with_tagged_course(4, "L1", 1, &["lab"])
            .with_room(4, 25, &["lab"]);
        let analysis = run(doc);
        assert!(!analysis.feasible);
        let seating: Vec<&String> = analysis
            .warnings
            .iter()
            .filter(|w| w.contains("seating group"))
            .collect();
        assert_eq!(seating.len(), 2, "{seating:?}");
        assert!(seating.iter().all(|w| w.contains("L1")));
        assert!(seating.iter().any(|w| w.contains("group G (30")));
        assert!(seating.iter().any(|w| w.contains("group Huge (50")));
    }

    #[test]
    fn availability_and_min_max_defects_are_advisory() {
        let doc = three_course_scenario()
            .with_faculty(3, "Idle", 2, 1)
            .with_faculty(4, "Sparse", 3, 6)
            .with_availability(4, &[1]);
        let analysis = run(doc);
        assert!(analysis.feasible);
        assert!(analysis.warnings.iter().any(|w| w.contains("Faculty 3") && w.contains("no available time slots")));
        assert!(analysis.warnings.iter().any(|w| w.contains("Faculty 3") && w.contains("greater than")));
        assert!(analysis.warnings.iter().any(|w| w.contains("Faculty 4") && w.contains("only 1 available")));
    }

    #[test]
    fn excess_minimums_are_advisory() {
        let doc = three_course_scenario().with_faculty(3, "Big", 10, 10);
        let analysis = run(doc);
        assert!(analysis.feasible);
        assert!(analysis.warnings.iter().any(|w| w.contains("minimums total 10")));
    }
}
