//! Result Projector: read views over an assignment set.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::context::Context;
use crate::data::{Assignment, FacultyId, GroupId, RoomId, TimeSlotId};

/// Who else takes part in an entry, seen from the view's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Counterpart {
    /// Faculty view.
    RoomAndGroup { room_id: RoomId, group_id: GroupId },
    /// Room view.
    FacultyAndGroup { faculty_id: FacultyId, group_id: GroupId },
    /// Student group view.
    FacultyAndRoom { faculty_id: FacultyId, room_id: RoomId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEntry {
    pub time_slot_id: TimeSlotId,
    pub course_code: String,
    pub counterpart: Counterpart,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimetableViews {
    pub by_faculty: BTreeMap<FacultyId, Vec<ViewEntry>>,
    pub by_room: BTreeMap<RoomId, Vec<ViewEntry>>,
    pub by_group: BTreeMap<GroupId, Vec<ViewEntry>>,
}

pub fn project(assignments: &[Assignment]) -> TimetableViews {
    let mut views = TimetableViews::default();
    for a in assignments {
        let entry = |counterpart| ViewEntry {
            time_slot_id: a.time_slot_id,
            course_code: a.session.course_code.clone(),
            counterpart,
        };
        views
            .by_faculty
            .entry(a.faculty_id)
            .or_default()
            .push(entry(Counterpart::RoomAndGroup {
                room_id: a.room_id,
                group_id: a.session.group_id,
            }));
        views
            .by_room
            .entry(a.room_id)
            .or_default()
            .push(entry(Counterpart::FacultyAndGroup {
                faculty_id: a.faculty_id,
                group_id: a.session.group_id,
            }));
        views
            .by_group
            .entry(a.session.group_id)
            .or_default()
            .push(entry(Counterpart::FacultyAndRoom {
                faculty_id: a.faculty_id,
                room_id: a.room_id,
            }));
    }
    for entries in views
        .by_faculty
        .values_mut()
        .chain(views.by_room.values_mut())
        .chain(views.by_group.values_mut())
    {
        entries.sort_by(|x, y| {
            x.time_slot_id
                .cmp(&y.time_slot_id)
                .then_with(|| x.course_code.cmp(&y.course_code))
        });
    }
    views
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacultyUtilization {
    pub assigned_hours: u32,
    pub min_hours_per_week: u32,
    pub max_hours_per_week: u32,
    /// Assigned hours over maximum hours; zero when the maximum is zero.
    pub utilization: f64,
}

/// Per-faculty load for every faculty member in the context, assigned or not.
pub fn faculty_utilization(
    context: &Context,
    assignments: &[Assignment],
) -> BTreeMap<FacultyId, FacultyUtilization> {
    let mut load: HashMap<FacultyId, u32> = HashMap::new();
    for a in assignments {
        *load.entry(a.faculty_id).or_insert(0) += 1;
    }
    context
        .faculty
        .iter()
        .map(|member| {
            let assigned_hours = load.get(&member.id).copied().unwrap_or(0);
            let utilization = if member.max_hours_per_week == 0 {
                0.0
            } else {
                f64::from(assigned_hours) / f64::from(member.max_hours_per_week)
            };
            (
                member.id,
                FacultyUtilization {
                    assigned_hours,
                    min_hours_per_week: member.min_hours_per_week,
                    max_hours_per_week: member.max_hours_per_week,
                    utilization,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Session;
    use crate::store::SnapshotDocument;

    fn assignment(code: &str, group: u32, faculty: u32, room: u32, slot: u32) -> Assignment {
        Assignment {
            session: Session {
                course_code: code.to_string(),
                group_id: group,
                index: 0,
                course_id: 1,
            },
            faculty_id: faculty,
            room_id: room,
            time_slot_id: slot,
        }
    }

    #[test]
    fn views_are_keyed_and_sorted_by_slot() {
        let assignments = vec![
            assignment("MA201", 5, 10, 100, 3),
            assignment("CS101", 5, 10, 101, 1),
            assignment("CS101", 6, 11, 100, 1),
        ];
        let views = project(&assignments);

        let faculty_slots: Vec<u32> = views.by_faculty[&10].iter().map(|e| e.time_slot_id).collect();
        assert_eq!(faculty_slots, vec![1, 3]);
        assert_eq!(
            views.by_faculty[&10][0].counterpart,
            Counterpart::RoomAndGroup { room_id: 101, group_id: 5 }
        );
        assert_eq!(views.by_room[&100].len(), 2);
        assert_eq!(
            views.by_room[&100][0].counterpart,
            Counterpart::FacultyAndGroup { faculty_id: 11, group_id: 6 }
        );
        assert_eq!(
            views.by_group[&5].iter().map(|e| e.course_code.as_str()).collect::<Vec<_>>(),
            vec!["CS101", "MA201"]
        );
    }

    #[test]
    fn empty_assignments_project_to_empty_views() {
        assert_eq!(project(&[]), TimetableViews::default());
    }

    #[test]
    fn utilization_covers_idle_faculty() {
        let doc = SnapshotDocument::default()
            .with_course(1, "CS101", 1)
            .with_faculty(10, "Ada", 0, 4)
            .with_faculty(11, "Idle", 0, 0)
            .with_room(100, 40, &[])
            .with_day(0, 1, 4);
        let context = Context::load(&doc).unwrap();
        let stats = faculty_utilization(&context, &[assignment("CS101", 5, 10, 100, 1)]);
        assert_eq!(stats[&10].assigned_hours, 1);
        assert_eq!(stats[&10].utilization, 0.25);
        assert_eq!(stats[&11].utilization, 0.0);
    }
}
