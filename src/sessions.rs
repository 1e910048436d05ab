//! Session Expander.

use log::debug;

use crate::context::Context;
use crate::data::Session;

/// Emits `hours_per_week` sessions for every (course, student group) pair,
/// ordered by course code, then group id, then sequence index.
pub fn expand_sessions(context: &Context) -> Vec<Session> {
    let mut sessions: Vec<Session> = context
        .courses
        .iter()
        .flat_map(|course| {
            context.student_groups.iter().flat_map(move |group| {
                (0..course.hours_per_week).map(move |index| Session {
                    course_code: course.code.clone(),
                    group_id: group.id,
                    index,
                    course_id: course.id,
                })
            })
        })
        .collect();
    sessions.sort();
    debug!("Expanded {} sessions", sessions.len());
    sessions
}

/// Sessions demanded by one course across all groups.
pub fn course_demand(context: &Context, hours_per_week: u32) -> u64 {
    u64::from(hours_per_week) * context.student_groups.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SnapshotDocument;

    fn context() -> Context {
        let doc = SnapshotDocument::default()
            .with_course(2, "MA201", 1)
            .with_course(1, "CS101", 2)
            .with_course(3, "PH000", 0)
            .with_faculty(10, "Ada", 0, 8)
            .with_room(100, 40, &[])
            .with_day(0, 1, 4)
            .with_group(6, "B", 20)
            .with_group(5, "A", 20);
        Context::load(&doc).unwrap()
    }

    #[test]
    fn count_is_hours_times_groups() {
        let context = context();
        assert_eq!(expand_sessions(&context).len(), (2 + 1) * 2);
        assert_eq!(course_demand(&context, 2), 4);
    }

    #[test]
    fn ordering_is_code_group_index() {
        let sessions = expand_sessions(&context());
        let keys: Vec<(&str, u32, u32)> = sessions
            .iter()
            .map(|s| (s.course_code.as_str(), s.group_id, s.index))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("CS101", 5, 0),
                ("CS101", 5, 1),
                ("CS101", 6, 0),
                ("CS101", 6, 1),
                ("MA201", 5, 0),
                ("MA201", 6, 0),
            ]
        );
    }

    #[test]
    fn expansion_is_deterministic() {
        let context = context();
        assert_eq!(expand_sessions(&context), expand_sessions(&context));
    }
}
