//! Per-faculty diagnostic report for tooling that repairs infeasible data.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::context::Context;
use crate::data::{FacultyId, Session};
use crate::eligibility::{eligible_faculty, rooms_seating};

const LISTED_CODES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsSummary {
    pub total_sessions: usize,
    pub faculty_count: usize,
    pub time_slots: usize,
    pub total_capacity: u64,
    pub total_minimum: u64,
    /// Sessions beyond total capacity; zero when capacity suffices.
    pub shortage: u64,
    pub avg_hours_needed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacultyDiagnostic {
    pub faculty_id: FacultyId,
    pub name: String,
    pub min_hours_per_week: u32,
    pub max_hours_per_week: u32,
    pub available_slots: usize,
    pub possible_session_count: usize,
    pub missing_expertise_for: Vec<String>,
    pub missing_room_for: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub summary: DiagnosticsSummary,
    pub per_faculty: Vec<FacultyDiagnostic>,
}

pub fn diagnose(context: &Context, sessions: &[Session]) -> DiagnosticsReport {
    let total_capacity: u64 = context
        .faculty
        .iter()
        .map(|f| u64::from(f.max_hours_per_week))
        .sum();
    let total_minimum: u64 = context
        .faculty
        .iter()
        .map(|f| u64::from(f.min_hours_per_week))
        .sum();
    let summary = DiagnosticsSummary {
        total_sessions: sessions.len(),
        faculty_count: context.faculty.len(),
        time_slots: context.time_slots.len(),
        total_capacity,
        total_minimum,
        shortage: (sessions.len() as u64).saturating_sub(total_capacity),
        avg_hours_needed: if context.faculty.is_empty() {
            0.0
        } else {
            sessions.len() as f64 / context.faculty.len() as f64
        },
    };

    let per_faculty = context
        .faculty
        .iter()
        .map(|member| {
            let available_slots = context.available_slot_count(member.id);
            let mut possible_session_count = 0;
            let mut missing_expertise = BTreeSet::new();
            let mut missing_room = BTreeSet::new();

            for session in sessions {
                let Some(course) = context.course_by_id.get(&session.course_id) else {
                    continue;
                };
                let alone = std::slice::from_ref(member);
                if eligible_faculty(course, alone, &context.faculty_expertise).is_empty() {
                    missing_expertise.insert(course.code.clone());
                    continue;
                }
                let seats = context
                    .group_by_id
                    .get(&session.group_id)
                    .map_or(0, |g| g.total_students);
                if rooms_seating(course, seats, &context.rooms, &context.room_capabilities)
                    .is_empty()
                {
                    missing_room.insert(course.code.clone());
                    continue;
                }
                if available_slots > 0 {
                    possible_session_count += 1;
                }
            }

            FacultyDiagnostic {
                faculty_id: member.id,
                name: member.name.clone(),
                min_hours_per_week: member.min_hours_per_week,
                max_hours_per_week: member.max_hours_per_week,
                available_slots,
                possible_session_count,
                missing_expertise_for: missing_expertise.into_iter().take(LISTED_CODES).collect(),
                missing_room_for: missing_room.into_iter().take(LISTED_CODES).collect(),
            }
        })
        .collect();

    DiagnosticsReport {
        summary,
        per_faculty,
    }
}
