//! Read-only access to the entity store.
//!
//! The generator never talks to a database directly. Callers hand it an
//! [`EntityStore`]; the Context Loader drains it once per run into an
//! immutable snapshot. [`SnapshotDocument`] is a JSON-backed implementation
//! used by the HTTP API and by tests.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;

use crate::data::{
    Course, Faculty, FacultyId, Room, RoomId, StudentGroup, TimeSlot, TimeSlotId, Expertise,
};
use crate::error::StoreError;

/// Collection queries the generator needs from the entity store.
pub trait EntityStore {
    /// Monotonic revision of the stored data, recorded on every snapshot.
    fn version(&self) -> u64 {
        0
    }
    fn courses(&self) -> Result<Vec<Course>, StoreError>;
    fn faculty(&self) -> Result<Vec<Faculty>, StoreError>;
    fn rooms(&self) -> Result<Vec<Room>, StoreError>;
    fn time_slots(&self) -> Result<Vec<TimeSlot>, StoreError>;
    fn student_groups(&self) -> Result<Vec<StudentGroup>, StoreError>;
    fn room_capabilities(&self, room: RoomId) -> Result<BTreeSet<String>, StoreError>;
    /// `None` when nothing is recorded, which means available at no slot.
    fn faculty_availability(
        &self,
        faculty: FacultyId,
    ) -> Result<Option<BTreeSet<TimeSlotId>>, StoreError>;
    fn faculty_expertise(&self, faculty: FacultyId) -> Result<Expertise, StoreError>;
}

/// Whole-store export as a single JSON document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SnapshotDocument {
    pub version: u64,
    pub courses: Vec<Course>,
    pub faculty: Vec<Faculty>,
    pub rooms: Vec<Room>,
    pub time_slots: Vec<TimeSlot>,
    pub student_groups: Vec<StudentGroup>,
    pub room_capabilities: HashMap<RoomId, Vec<String>>,
    pub faculty_availability: HashMap<FacultyId, Vec<TimeSlotId>>,
    /// Comma-separated course codes; missing or blank means generalist.
    pub faculty_expertise: HashMap<FacultyId, String>,
}

impl SnapshotDocument {
    pub fn from_reader(reader: impl Read) -> Result<Self, StoreError> {
        serde_json::from_reader(reader).map_err(|e| StoreError {
            collection: "snapshot",
            message: e.to_string(),
        })
    }

    pub fn with_course(mut self, id: u32, code: &str, hours_per_week: u32) -> Self {
        self.courses.push(Course {
            id,
            code: code.to_string(),
            name: String::new(),
            hours_per_week,
            required_tags: BTreeSet::new(),
            min_room_capacity: 0,
        });
        self
    }

    pub fn with_tagged_course(mut self, id: u32, code: &str, hours: u32, tags: &[&str]) -> Self {
        self = self.with_course(id, code, hours);
        if let Some(course) = self.courses.last_mut() {
            course.required_tags = tags.iter().map(|t| t.to_string()).collect();
        }
        self
    }

    pub fn with_faculty(mut self, id: u32, name: &str, min: u32, max: u32) -> Self {
        self.faculty.push(Faculty {
            id,
            name: name.to_string(),
            min_hours_per_week: min,
            max_hours_per_week: max,
        });
        self
    }

    pub fn with_expertise(mut self, faculty: FacultyId, codes: &str) -> Self {
        self.faculty_expertise.insert(faculty, codes.to_string());
        self
    }

    pub fn with_availability(mut self, faculty: FacultyId, slots: &[TimeSlotId]) -> Self {
        self.faculty_availability.insert(faculty, slots.to_vec());
        self
    }

    pub fn with_room(mut self, id: u32, capacity: u32, tags: &[&str]) -> Self {
        self.rooms.push(Room {
            id,
            name: format!("R{id}"),
            capacity,
        });
        if !tags.is_empty() {
            self.room_capabilities
                .insert(id, tags.iter().map(|t| t.to_string()).collect());
        }
        self
    }

    /// Adds `count` consecutive slots on `day`, ids starting at `first_id`.
    pub fn with_day(mut self, day: u32, first_id: TimeSlotId, count: u32) -> Self {
        self.time_slots.extend((0..count).map(|period| TimeSlot {
            id: first_id + period,
            day,
            period,
        }));
        self
    }

    pub fn with_group(mut self, id: u32, name: &str, total_students: u32) -> Self {
        self.student_groups.push(StudentGroup {
            id,
            name: name.to_string(),
            total_students,
        });
        self
    }

    /// Makes every faculty member available at every time slot.
    pub fn with_full_availability(mut self) -> Self {
        let all: Vec<TimeSlotId> = self.time_slots.iter().map(|s| s.id).collect();
        for faculty in &self.faculty {
            self.faculty_availability.insert(faculty.id, all.clone());
        }
        self
    }
}

impl EntityStore for SnapshotDocument {
    fn version(&self) -> u64 {
        self.version
    }

    fn courses(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.courses.clone())
    }

    fn faculty(&self) -> Result<Vec<Faculty>, StoreError> {
        Ok(self.faculty.clone())
    }

    fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.rooms.clone())
    }

    fn time_slots(&self) -> Result<Vec<TimeSlot>, StoreError> {
        Ok(self.time_slots.clone())
    }

    fn student_groups(&self) -> Result<Vec<StudentGroup>, StoreError> {
        Ok(self.student_groups.clone())
    }

    fn room_capabilities(&self, room: RoomId) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .room_capabilities
            .get(&room)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn faculty_availability(
        &self,
        faculty: FacultyId,
    ) -> Result<Option<BTreeSet<TimeSlotId>>, StoreError> {
        Ok(self
            .faculty_availability
            .get(&faculty)
            .map(|slots| slots.iter().copied().collect()))
    }

    fn faculty_expertise(&self, faculty: FacultyId) -> Result<Expertise, StoreError> {
        Ok(Expertise::parse(
            self.faculty_expertise.get(&faculty).map(String::as_str),
        ))
    }
}
