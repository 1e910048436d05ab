//! `TimetableGenerator`: the full pipeline from entity store to timetable.
//!
//! Context Loader -> Session Expander -> Bound Analyzer -> (when the bounds
//! allow it) Assignment Solver -> Result Projector. Fatal conditions abort
//! with a [`GenerateError`]; soft infeasibility always completes and comes
//! back inside the [`GenerationResult`].

use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::bounds::{BoundAnalysis, analyze_bounds};
use crate::config::GeneratorConfig;
use crate::context::Context;
use crate::data::{Assignment, FacultyId, Session, SoftViolation};
use crate::diagnostics::{DiagnosticsReport, diagnose};
use crate::error::{GenerateError, SolverError};
use crate::projector::{FacultyUtilization, TimetableViews, faculty_utilization, project};
use crate::sessions::expand_sessions;
use crate::solver::{SolveMethod, UnplacedSession, solve, unplaced_without_solving};
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Every session placed.
    Complete,
    /// Solver ran but some sessions are unplaced.
    Partial,
    /// Bound analysis blocked the solver.
    BoundInfeasible,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStats {
    pub sessions_total: usize,
    pub sessions_placed: usize,
    pub fill_rate: f64,
    /// `assign_reward * placed - min_violation_penalty * shortfall hours`
    pub score: f64,
    pub method: SolveMethod,
    pub elapsed_ms: u64,
    pub faculty_utilization: BTreeMap<FacultyId, FacultyUtilization>,
    pub mean_utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub context_version: u64,
    pub status: GenerationStatus,
    pub bound_analysis: BoundAnalysis,
    pub assignments: Vec<Assignment>,
    pub timetable: TimetableViews,
    pub unplaced: Vec<UnplacedSession>,
    pub soft_violations: Vec<SoftViolation>,
    pub stats: GenerationStats,
}

pub struct TimetableGenerator {
    config: GeneratorConfig,
}

impl TimetableGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Loads a fresh snapshot from `store` and runs the whole pipeline on it.
    pub fn generate(&self, store: &dyn EntityStore) -> Result<GenerationResult, GenerateError> {
        let context = Context::load(store)?;
        self.generate_from_context(&context)
    }

    pub fn generate_from_context(
        &self,
        context: &Context,
    ) -> Result<GenerationResult, GenerateError> {
        let start_time = Instant::now();
        let sessions = expand_sessions(context);
        let bound_analysis = analyze_bounds(context, &sessions);

        if !bound_analysis.feasible {
            if self.config.strict {
                return Err(SolverError::BoundInfeasible(bound_analysis.warnings).into());
            }
            warn!("Skipping solver: bound analysis reported infeasibility.");
            let unplaced = unplaced_without_solving(context, &sessions);
            return Ok(self.assemble(
                context,
                &sessions,
                bound_analysis,
                GenerationStatus::BoundInfeasible,
                Vec::new(),
                unplaced,
                Vec::new(),
                SolveMethod::Skipped,
                start_time,
            ));
        }

        let outcome = solve(context, &sessions, &self.config)?;
        let status = if outcome.unplaced.is_empty() {
            GenerationStatus::Complete
        } else {
            GenerationStatus::Partial
        };
        Ok(self.assemble(
            context,
            &sessions,
            bound_analysis,
            status,
            outcome.assignments,
            outcome.unplaced,
            outcome.soft_violations,
            outcome.method,
            start_time,
        ))
    }

    /// Bound analysis alone, as consumed by diagnostic tooling.
    pub fn analyze(&self, store: &dyn EntityStore) -> Result<BoundAnalysis, GenerateError> {
        let context = Context::load(store)?;
        let sessions = expand_sessions(&context);
        Ok(analyze_bounds(&context, &sessions))
    }

    pub fn diagnose(&self, store: &dyn EntityStore) -> Result<DiagnosticsReport, GenerateError> {
        let context = Context::load(store)?;
        let sessions = expand_sessions(&context);
        Ok(diagnose(&context, &sessions))
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        context: &Context,
        sessions: &[Session],
        bound_analysis: BoundAnalysis,
        status: GenerationStatus,
        assignments: Vec<Assignment>,
        unplaced: Vec<UnplacedSession>,
        soft_violations: Vec<SoftViolation>,
        method: SolveMethod,
        start_time: Instant,
    ) -> GenerationResult {
        let utilization = faculty_utilization(context, &assignments);
        let mean_utilization = if utilization.is_empty() {
            0.0
        } else {
            utilization.values().map(|u| u.utilization).sum::<f64>() / utilization.len() as f64
        };
        let shortfall_hours: u64 = utilization
            .values()
            .map(|u| u64::from(u.min_hours_per_week.saturating_sub(u.assigned_hours)))
            .sum();
        let placed = assignments.len();
        let stats = GenerationStats {
            sessions_total: sessions.len(),
            sessions_placed: placed,
            fill_rate: if sessions.is_empty() {
                1.0
            } else {
                placed as f64 / sessions.len() as f64
            },
            score: self.config.assign_reward * placed as f64
                - self.config.min_violation_penalty * shortfall_hours as f64,
            method,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            faculty_utilization: utilization,
            mean_utilization,
        };
        info!(
            "Generation {:?}: {}/{} sessions placed, score {:.1}",
            status, stats.sessions_placed, stats.sessions_total, stats.score
        );
        GenerationResult {
            context_version: context.version,
            status,
            bound_analysis,
            timetable: project(&assignments),
            assignments,
            unplaced,
            soft_violations,
            stats,
        }
    }
}
