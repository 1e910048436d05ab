//! Timetable generation engine.
//!
//! Assigns teaching sessions (one per course-hour per student group) to a
//! faculty member, a room and a time slot, subject to hard feasibility
//! constraints and a tunable objective.
//!
//! # Modules
//!
//! - **`context`**: immutable snapshot loaded from an [`store::EntityStore`]
//! - **`sessions`**: expansion of courses and groups into sessions
//! - **`eligibility`**: expertise and room-capability matching
//! - **`bounds`**: solver-free necessary-condition feasibility checks
//! - **`diagnostics`**: per-faculty reach report for data-repair tooling
//! - **`solver`**: ILP assignment model (HiGHS via `good_lp`) with greedy repair
//! - **`projector`**: per-faculty, per-room and per-group views
//! - **`generator`**: the end-to-end pipeline
//! - **`server`**: HTTP API

pub mod bounds;
pub mod config;
pub mod context;
pub mod data;
pub mod diagnostics;
pub mod eligibility;
pub mod error;
pub mod generator;
pub mod projector;
pub mod server;
pub mod sessions;
pub mod solver;
pub mod store;

pub use config::GeneratorConfig;
pub use error::{GenerateError, LoadError, SolverError};
pub use generator::{GenerationResult, GenerationStatus, TimetableGenerator};
pub use store::{EntityStore, SnapshotDocument};
