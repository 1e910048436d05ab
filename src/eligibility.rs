//! Eligibility Resolver: which faculty and rooms may serve a course.
//!
//! Both queries preserve input order and return an empty vector when nothing
//! qualifies. An empty result is a diagnostic signal, not an error.

use std::collections::{BTreeSet, HashMap};

use crate::data::{Course, Expertise, Faculty, FacultyId, Room, RoomId};

/// Faculty whose expertise covers the course, plus every generalist.
/// Faculty missing from `expertise_index` count as generalists.
pub fn eligible_faculty<'a>(
    course: &Course,
    faculty: &'a [Faculty],
    expertise_index: &HashMap<FacultyId, Expertise>,
) -> Vec<&'a Faculty> {
    faculty
        .iter()
        .filter(|member| {
            expertise_index
                .get(&member.id)
                .is_none_or(|expertise| expertise.covers(&course.code))
        })
        .collect()
}

/// Rooms large enough for the course whose capability tags meet its required tags.
pub fn eligible_rooms<'a>(
    course: &Course,
    rooms: &'a [Room],
    room_capabilities: &HashMap<RoomId, BTreeSet<String>>,
) -> Vec<&'a Room> {
    rooms_seating(course, 0, rooms, room_capabilities)
}

/// [`eligible_rooms`] narrowed to rooms that also seat `seats` students.
pub fn rooms_seating<'a>(
    course: &Course,
    seats: u32,
    rooms: &'a [Room],
    room_capabilities: &HashMap<RoomId, BTreeSet<String>>,
) -> Vec<&'a Room> {
    let needed = course.min_room_capacity.max(seats);
    rooms
        .iter()
        .filter(|room| room.capacity >= needed)
        .filter(|room| {
            course.required_tags.is_empty()
                || room_capabilities
                    .get(&room.id)
                    .is_some_and(|tags| !tags.is_disjoint(&course.required_tags))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::store::SnapshotDocument;

    fn context() -> Context {
        let doc = SnapshotDocument::default()
            .with_course(1, "CS101", 2)
            .with_tagged_course(2, "CH200", 2, &["Lab"])
            .with_faculty(10, "Specialist", 0, 4)
            .with_faculty(11, "Generalist", 0, 4)
            .with_faculty(12, "Other", 0, 4)
            .with_expertise(10, "CS101")
            .with_expertise(12, "MA201")
            .with_room(100, 40, &[])
            .with_room(101, 20, &["lab", "projector"])
            .with_room(102, 60, &["projector"])
            .with_day(0, 1, 2);
        Context::load(&doc).unwrap()
    }

    #[test]
    fn specialists_and_generalists_in_input_order() {
        let context = context();
        let course = &context.course_by_id[&1];
        let ids: Vec<u32> =
            eligible_faculty(course, &context.faculty, &context.faculty_expertise)
                .iter()
                .map(|f| f.id)
                .collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn no_expert_and_no_generalist_is_empty() {
        let context = context();
        let course = &context.course_by_id[&2];
        let specialists: Vec<Faculty> = context
            .faculty
            .iter()
            .filter(|f| f.id != 11)
            .cloned()
            .collect();
        assert!(eligible_faculty(course, &specialists, &context.faculty_expertise).is_empty());
    }

    #[test]
    fn untagged_course_takes_any_room_with_capacity() {
        let mut context = context();
        let ids: Vec<u32> = eligible_rooms(
            &context.course_by_id[&1],
            &context.rooms,
            &context.room_capabilities,
        )
        .iter()
        .map(|r| r.id)
        .collect();
        assert_eq!(ids, vec![100, 101, 102]);

        let course = context.course_by_id.get_mut(&1).unwrap();
        course.min_room_capacity = 50;
        let course = course.clone();
        let ids: Vec<u32> = eligible_rooms(&course, &context.rooms, &context.room_capabilities)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![102]);
    }

    #[test]
    fn seat_count_narrows_eligible_rooms() {
        let context = context();
        let course = &context.course_by_id[&1];
        let seat = |seats| -> Vec<u32> {
            rooms_seating(course, seats, &context.rooms, &context.room_capabilities)
                .iter()
                .map(|r| r.id)
                .collect()
        };
        assert_eq!(seat(20), vec![100, 101, 102]);
        assert_eq!(seat(40), vec![100, 102]);
        assert_eq!(seat(61), Vec::<u32>::new());

        let lab = &context.course_by_id[&2];
        assert!(rooms_seating(lab, 25, &context.rooms, &context.room_capabilities).is_empty());
    }

    #[test]
    fn tagged_course_needs_intersecting_capability() {
        let context = context();
        let ids: Vec<u32> = eligible_rooms(
            &context.course_by_id[&2],
            &context.rooms,
            &context.room_capabilities,
        )
        .iter()
        .map(|r| r.id)
        .collect();
        assert_eq!(ids, vec![101]);
    }
}
