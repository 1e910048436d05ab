use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// Type aliases for clarity
pub type CourseId = u32;
pub type FacultyId = u32;
pub type RoomId = u32;
pub type TimeSlotId = u32;
pub type GroupId = u32;

/// A course to be taught to every student group.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub hours_per_week: u32,
    /// Capability tags a room must offer at least one of. Empty means any room.
    #[serde(default)]
    pub required_tags: BTreeSet<String>,
    #[serde(default)]
    pub min_room_capacity: u32,
}

/// A teaching staff member and their weekly load bounds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub name: String,
    #[serde(default)]
    pub min_hours_per_week: u32,
    pub max_hours_per_week: u32,
}

/// Courses a faculty member may teach.
///
/// `Generalist` is an explicit "teaches anything" marker and is distinct from
/// `Specific` with an empty set, which teaches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expertise {
    #[default]
    Generalist,
    Specific(BTreeSet<String>),
}

impl Expertise {
    /// Parses the stored comma-separated form. Blank or missing means generalist.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Expertise::Generalist;
        };
        Expertise::Specific(
            raw.split(',')
                .map(normalize_code)
                .filter(|code| !code.is_empty())
                .collect(),
        )
    }

    pub fn covers(&self, course_code: &str) -> bool {
        match self {
            Expertise::Generalist => true,
            Expertise::Specific(codes) => codes.contains(&normalize_code(course_code)),
        }
    }
}

/// Course codes and capability tags compare trimmed and case-insensitively.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A physical room with a seat count.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Room {
    pub id: RoomId,
    #[serde(default)]
    pub name: String,
    pub capacity: u32,
}

/// One cell of the institution calendar.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub day: u32,
    pub period: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StudentGroup {
    pub id: GroupId,
    pub name: String,
    pub total_students: u32,
}

/// One course-hour that must be taught to one student group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Session {
    pub course_code: String,
    pub group_id: GroupId,
    pub index: u32,
    pub course_id: CourseId,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/group {}#{}", self.course_code, self.group_id, self.index)
    }
}

/// A session placed with a faculty member in a room at a time slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Assignment {
    pub session: Session,
    pub faculty_id: FacultyId,
    pub room_id: RoomId,
    pub time_slot_id: TimeSlotId,
}

/// Describes a soft constraint that was not met in the final timetable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftViolation {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for SoftViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_expertise_is_generalist() {
        assert_eq!(Expertise::parse(None), Expertise::Generalist);
        assert_eq!(Expertise::parse(Some("  ")), Expertise::Generalist);
        assert!(Expertise::parse(Some("")).covers("ANY101"));
    }

    #[test]
    fn specific_expertise_matches_case_insensitively() {
        let expertise = Expertise::parse(Some("CS101, ma201 ,"));
        assert!(expertise.covers("cs101"));
        assert!(expertise.covers("MA201"));
        assert!(!expertise.covers("PH100"));
    }

    #[test]
    fn empty_specific_set_covers_nothing() {
        let expertise = Expertise::Specific(BTreeSet::new());
        assert!(!expertise.covers("CS101"));
    }

    #[test]
    fn sessions_order_by_code_then_group_then_index() {
        let a = Session { course_code: "A".into(), group_id: 2, index: 0, course_id: 9 };
        let b = Session { course_code: "B".into(), group_id: 1, index: 0, course_id: 1 };
        let c = Session { course_code: "A".into(), group_id: 2, index: 1, course_id: 9 };
        let mut sessions = vec![b.clone(), c.clone(), a.clone()];
        sessions.sort();
        assert_eq!(sessions, vec![a, c, b]);
    }
}
