//! Context Loader: one immutable snapshot of the entity store per run.

use log::{debug, info};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::data::{
    normalize_code, Course, CourseId, Expertise, Faculty, FacultyId, GroupId, Room, RoomId,
    StudentGroup, TimeSlot, TimeSlotId,
};
use crate::error::LoadError;
use crate::store::EntityStore;

/// Everything a generation run reads. Built once, never mutated, never cached
/// across runs.
#[derive(Debug, Clone)]
pub struct Context {
    pub version: u64,
    pub courses: Vec<Course>,
    pub faculty: Vec<Faculty>,
    pub rooms: Vec<Room>,
    pub time_slots: Vec<TimeSlot>,
    pub student_groups: Vec<StudentGroup>,
    pub room_capabilities: HashMap<RoomId, BTreeSet<String>>,
    pub faculty_availability: HashMap<FacultyId, BTreeSet<TimeSlotId>>,
    pub faculty_expertise: HashMap<FacultyId, Expertise>,
    pub course_by_id: HashMap<CourseId, Course>,
    pub group_by_id: HashMap<GroupId, StudentGroup>,
}

impl Context {
    /// Reads every collection from `store`.
    ///
    /// Courses, faculty, rooms and time slots must be non-empty. Student groups
    /// may be empty, which simply yields no sessions.
    pub fn load(store: &dyn EntityStore) -> Result<Self, LoadError> {
        let version = store.version();
        let mut courses = non_empty("courses", store.courses()?)?;
        let faculty = non_empty("faculty", store.faculty()?)?;
        let rooms = non_empty("rooms", store.rooms()?)?;
        let time_slots = non_empty("time_slots", store.time_slots()?)?;
        let student_groups = store.student_groups()?;

        unique_ids("courses", courses.iter().map(|c| c.id))?;
        unique_ids("faculty", faculty.iter().map(|f| f.id))?;
        unique_ids("rooms", rooms.iter().map(|r| r.id))?;
        unique_ids("time_slots", time_slots.iter().map(|t| t.id))?;
        unique_ids("student_groups", student_groups.iter().map(|g| g.id))?;
        unique_codes(&courses)?;

        for course in &mut courses {
            course.required_tags = course.required_tags.iter().map(|t| normalize_code(t)).collect();
        }

        let mut room_capabilities = HashMap::with_capacity(rooms.len());
        for room in &rooms {
            let tags = store.room_capabilities(room.id)?;
            room_capabilities.insert(room.id, tags.iter().map(|t| normalize_code(t)).collect());
        }

        let mut faculty_availability = HashMap::with_capacity(faculty.len());
        let mut faculty_expertise = HashMap::with_capacity(faculty.len());
        for member in &faculty {
            let slots = store.faculty_availability(member.id)?.unwrap_or_default();
            faculty_availability.insert(member.id, slots);
            faculty_expertise.insert(member.id, store.faculty_expertise(member.id)?);
        }

        let course_by_id = courses.iter().map(|c| (c.id, c.clone())).collect();
        let group_by_id = student_groups.iter().map(|g| (g.id, g.clone())).collect();

        info!(
            "Loaded context v{}: {} courses, {} faculty, {} rooms, {} time slots, {} groups",
            version,
            courses.len(),
            faculty.len(),
            rooms.len(),
            time_slots.len(),
            student_groups.len()
        );
        debug!(
            "{} faculty are generalists",
            faculty_expertise
                .values()
                .filter(|e| **e == Expertise::Generalist)
                .count()
        );

        Ok(Context {
            version,
            courses,
            faculty,
            rooms,
            time_slots,
            student_groups,
            room_capabilities,
            faculty_availability,
            faculty_expertise,
            course_by_id,
            group_by_id,
        })
    }

    pub fn expertise_of(&self, faculty: FacultyId) -> &Expertise {
        static GENERALIST: Expertise = Expertise::Generalist;
        self.faculty_expertise.get(&faculty).unwrap_or(&GENERALIST)
    }

    pub fn availability_of(&self, faculty: FacultyId) -> Option<&BTreeSet<TimeSlotId>> {
        self.faculty_availability.get(&faculty)
    }

    pub fn available_slot_count(&self, faculty: FacultyId) -> usize {
        let known: HashSet<TimeSlotId> = self.time_slots.iter().map(|t| t.id).collect();
        self.availability_of(faculty)
            .map(|slots| slots.iter().filter(|s| known.contains(s)).count())
            .unwrap_or(0)
    }
}

fn non_empty<T>(collection: &'static str, items: Vec<T>) -> Result<Vec<T>, LoadError> {
    if items.is_empty() {
        return Err(LoadError::EmptyCollection(collection));
    }
    Ok(items)
}

fn unique_ids(
    collection: &'static str,
    ids: impl Iterator<Item = u32>,
) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(LoadError::DuplicateId { collection, id });
        }
    }
    Ok(())
}

fn unique_codes(courses: &[Course]) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for course in courses {
        if !seen.insert(normalize_code(&course.code)) {
            return Err(LoadError::DuplicateCode(course.code.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::SnapshotDocument;

    fn minimal() -> SnapshotDocument {
        SnapshotDocument::default()
            .with_course(1, "CS101", 2)
            .with_faculty(10, "Ada", 0, 4)
            .with_room(100, 40, &["LAB"])
            .with_day(0, 1, 4)
            .with_group(5, "CSE-A", 30)
    }

    #[test]
    fn loads_all_collections_and_indices() {
        let doc = minimal().with_availability(10, &[1, 2]).with_expertise(10, "CS101");
        let context = Context::load(&doc).unwrap();
        assert_eq!(context.course_by_id[&1].code, "CS101");
        assert_eq!(context.group_by_id[&5].total_students, 30);
        assert!(context.room_capabilities[&100].contains("lab"));
        assert_eq!(context.available_slot_count(10), 2);
        assert!(context.expertise_of(10).covers("CS101"));
    }

    #[test]
    fn empty_required_collection_fails() {
        let mut doc = minimal();
        doc.faculty.clear();
        assert_eq!(
            Context::load(&doc).unwrap_err(),
            LoadError::EmptyCollection("faculty")
        );

        let mut doc = minimal();
        doc.time_slots.clear();
        assert_eq!(
            Context::load(&doc).unwrap_err(),
            LoadError::EmptyCollection("time_slots")
        );
    }

    #[test]
    fn empty_student_groups_are_allowed() {
        let mut doc = minimal();
        doc.student_groups.clear();
        assert!(Context::load(&doc).is_ok());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doc = minimal().with_room(100, 10, &[]);
        assert_eq!(
            Context::load(&doc).unwrap_err(),
            LoadError::DuplicateId { collection: "rooms", id: 100 }
        );
    }

    #[test]
    fn course_codes_are_unique_ignoring_case() {
        let doc = minimal().with_course(2, " cs101", 1);
        assert_eq!(
            Context::load(&doc).unwrap_err(),
            LoadError::DuplicateCode(" cs101".to_string())
        );
    }

    #[test]
    fn missing_availability_means_no_slots() {
        let context = Context::load(&minimal()).unwrap();
        assert_eq!(context.available_slot_count(10), 0);
        assert!(context.availability_of(10).unwrap().is_empty());
    }

    struct FailingStore;

    impl EntityStore for FailingStore {
        fn courses(&self) -> Result<Vec<Course>, StoreError> {
            Err(StoreError { collection: "courses", message: "connection reset".into() })
        }
        fn faculty(&self) -> Result<Vec<Faculty>, StoreError> {
            Ok(Vec::new())
        }
        fn rooms(&self) -> Result<Vec<Room>, StoreError> {
            Ok(Vec::new())
        }
        fn time_slots(&self) -> Result<Vec<TimeSlot>, StoreError> {
            Ok(Vec::new())
        }
        fn student_groups(&self) -> Result<Vec<StudentGroup>, StoreError> {
            Ok(Vec::new())
        }
        fn room_capabilities(&self, _room: RoomId) -> Result<BTreeSet<String>, StoreError> {
            Ok(BTreeSet::new())
        }
        fn faculty_availability(
            &self,
            _faculty: FacultyId,
        ) -> Result<Option<BTreeSet<TimeSlotId>>, StoreError> {
            Ok(None)
        }
        fn faculty_expertise(&self, _faculty: FacultyId) -> Result<Expertise, StoreError> {
            Ok(Expertise::Generalist)
        }
    }

    #[test]
    fn store_failures_surface_as_load_errors() {
        assert!(matches!(
            Context::load(&FailingStore),
            Err(LoadError::Store(StoreError { collection: "courses", .. }))
        ));
    }
}
