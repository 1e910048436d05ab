use thiserror::Error;

use crate::data::{CourseId, FacultyId, GroupId};

/// A data-access handle failed to produce a collection.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("failed to read {collection}: {message}")]
pub struct StoreError {
    pub collection: &'static str,
    pub message: String,
}

/// Fatal problems while building the in-memory snapshot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("required collection '{0}' is empty")]
    EmptyCollection(&'static str),
    #[error("duplicate id {id} in '{collection}'")]
    DuplicateId { collection: &'static str, id: u32 },
    #[error("duplicate course code '{0}'")]
    DuplicateCode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The assignment problem could not be built or, in strict mode, not fully solved.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolverError {
    #[error("no time slots to schedule into")]
    EmptyTimeSlots,
    #[error("session references unknown course {0}")]
    UnknownCourse(CourseId),
    #[error("session references unknown student group {0}")]
    UnknownGroup(GroupId),
    #[error("solver backend failed: {0}")]
    Backend(String),
    #[error("bound analysis ruled out a solution: {}", .0.join("; "))]
    BoundInfeasible(Vec<String>),
    #[error("strict mode: {unplaced} session(s) could not be placed")]
    Incomplete { unplaced: usize },
    #[error("strict mode: faculty {faculty} cannot reach the minimum of {min} hours/week")]
    UnreachableMinimum { faculty: FacultyId, min: u32 },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerateError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
