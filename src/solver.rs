use crate::config::GeneratorConfig;
use crate::context::Context;
use crate::data::{
    Assignment, CourseId, FacultyId, GroupId, RoomId, Session, SoftViolation, TimeSlotId,
};
use crate::eligibility::{eligible_faculty, eligible_rooms};
use crate::error::SolverError;
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    default_solver,
};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::time::Instant;

/// How the final assignment set was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    /// Taken as-is from the ILP solution.
    Ilp,
    /// ILP solution validated and topped up greedily (deadline hit or inconsistent output).
    IlpRepaired,
    /// ILP backend failed; greedy placement only.
    Greedy,
    /// Nothing to solve, or solving was blocked by bound analysis.
    Skipped,
}

/// Why a session ended up without an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnplacedReason {
    NoEligibleFaculty,
    NoEligibleRoom,
    RoomTooSmall { group_size: u32 },
    NoAvailableSlot,
    FacultyAtMaximum,
    SlotConflict,
    BoundInfeasible,
    NotSelected,
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnplacedReason::NoEligibleFaculty => write!(f, "no faculty has the required expertise"),
            UnplacedReason::NoEligibleRoom => write!(f, "no room offers the required capabilities"),
            UnplacedReason::RoomTooSmall { group_size } => {
                write!(f, "no eligible room seats {group_size} students")
            }
            UnplacedReason::NoAvailableSlot => {
                write!(f, "no eligible faculty member has an available time slot")
            }
            UnplacedReason::FacultyAtMaximum => {
                write!(f, "eligible faculty are at their maximum weekly hours")
            }
            UnplacedReason::SlotConflict => {
                write!(f, "every candidate slot double-books a faculty member, room or group")
            }
            UnplacedReason::BoundInfeasible => write!(f, "bound analysis reported infeasibility"),
            UnplacedReason::NotSelected => write!(f, "not selected by the solver"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnplacedSession {
    pub session: Session,
    pub reasons: Vec<UnplacedReason>,
}

/// The final output of the solver: a best-effort timetable plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveOutcome {
    pub assignments: Vec<Assignment>,
    pub unplaced: Vec<UnplacedSession>,
    pub soft_violations: Vec<SoftViolation>,
    pub shortfall_hours: u64,
    pub method: SolveMethod,
    pub elapsed_ms: u64,
}

/// x_sfrt = 1 if session s is taught by faculty f in room r at slot t
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    session: usize,
    course: CourseId,
    group: GroupId,
    faculty: FacultyId,
    room: RoomId,
    slot: TimeSlotId,
}

struct CourseOptions {
    faculty: Vec<FacultyId>,
    rooms: Vec<(RoomId, u32)>,
}

/// Pre-filtered assignment space shared by the ILP and the greedy placer.
struct CandidateModel<'a> {
    context: &'a Context,
    sessions: &'a [Session],
    options: HashMap<CourseId, CourseOptions>,
    faculty_slots: HashMap<FacultyId, Vec<TimeSlotId>>,
    max_hours: HashMap<FacultyId, u32>,
    candidates: Vec<Candidate>,
    by_session: Vec<Vec<usize>>,
}

impl<'a> CandidateModel<'a> {
    fn build(context: &'a Context, sessions: &'a [Session]) -> Result<Self, SolverError> {
        if context.time_slots.is_empty() {
            return Err(SolverError::EmptyTimeSlots);
        }
        let slot_ids: Vec<TimeSlotId> = context
            .time_slots
            .iter()
            .map(|t| t.id)
            .sorted_unstable()
            .collect();

        let faculty_slots: HashMap<FacultyId, Vec<TimeSlotId>> = context
            .faculty
            .iter()
            .map(|member| {
                let slots = match context.availability_of(member.id) {
                    Some(available) => slot_ids
                        .iter()
                        .copied()
                        .filter(|slot| available.contains(slot))
                        .collect(),
                    None => Vec::new(),
                };
                (member.id, slots)
            })
            .collect();

        let mut options: HashMap<CourseId, CourseOptions> = HashMap::new();
        for session in sessions {
            let course = context
                .course_by_id
                .get(&session.course_id)
                .ok_or(SolverError::UnknownCourse(session.course_id))?;
            if !context.group_by_id.contains_key(&session.group_id) {
                return Err(SolverError::UnknownGroup(session.group_id));
            }
            options.entry(course.id).or_insert_with(|| CourseOptions {
                faculty: eligible_faculty(course, &context.faculty, &context.faculty_expertise)
                    .into_iter()
                    .map(|f| f.id)
                    .sorted_unstable()
                    .collect(),
                rooms: eligible_rooms(course, &context.rooms, &context.room_capabilities)
                    .into_iter()
                    .map(|r| (r.id, r.capacity))
                    .sorted_unstable()
                    .collect(),
            });
        }

        // pre-filter: expertise, room capability and size, faculty availability
        let mut candidates = Vec::new();
        let mut by_session = Vec::with_capacity(sessions.len());
        for (index, session) in sessions.iter().enumerate() {
            let group_size = context.group_by_id[&session.group_id].total_students;
            let course_options = &options[&session.course_id];
            let mut own = Vec::new();
            for &faculty in &course_options.faculty {
                for &(room, capacity) in &course_options.rooms {
                    if capacity < group_size {
                        continue;
                    }
                    for &slot in &faculty_slots[&faculty] {
                        own.push(candidates.len());
                        candidates.push(Candidate {
                            session: index,
                            course: session.course_id,
                            group: session.group_id,
                            faculty,
                            room,
                            slot,
                        });
                    }
                }
            }
            by_session.push(own);
        }
        trace!(
            "Generated {} candidate assignments out of a theoretical maximum of {}.",
            candidates.len(),
            sessions.len() * context.faculty.len() * context.rooms.len() * slot_ids.len()
        );

        Ok(CandidateModel {
            context,
            sessions,
            options,
            faculty_slots,
            max_hours: context
                .faculty
                .iter()
                .map(|f| (f.id, f.max_hours_per_week))
                .collect(),
            candidates,
            by_session,
        })
    }

    fn group_candidates<K: Ord>(&self, key: impl Fn(&Candidate) -> K) -> BTreeMap<K, Vec<usize>> {
        let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
        for (index, candidate) in self.candidates.iter().enumerate() {
            groups.entry(key(candidate)).or_default().push(index);
        }
        groups
    }

    /// Strict mode fails fast on anything the solver could never satisfy.
    fn check_strict(&self) -> Result<(), SolverError> {
        let unplaceable = self.by_session.iter().filter(|c| c.is_empty()).count();
        if unplaceable > 0 {
            return Err(SolverError::Incomplete {
                unplaced: unplaceable,
            });
        }
        let reachable_slots: HashMap<FacultyId, BTreeSet<TimeSlotId>> = self
            .candidates
            .iter()
            .map(|c| (c.faculty, c.slot))
            .into_grouping_map()
            .collect();
        for member in &self.context.faculty {
            let reachable = reachable_slots.get(&member.id).map_or(0, |s| s.len());
            let ceiling = member.max_hours_per_week.min(reachable as u32);
            if member.min_hours_per_week > ceiling {
                return Err(SolverError::UnreachableMinimum {
                    faculty: member.id,
                    min: member.min_hours_per_week,
                });
            }
        }
        Ok(())
    }

    /// Lexicographic (faculty id, room id, slot id) position in [0, 1).
    fn rank_fractions(&self) -> Vec<f64> {
        let faculty_rank = rank_of(self.candidates.iter().map(|c| c.faculty));
        let room_rank = rank_of(self.candidates.iter().map(|c| c.room));
        let slot_rank = rank_of(self.candidates.iter().map(|c| c.slot));
        let (nf, nr, nt) = (
            faculty_rank.len() as f64,
            room_rank.len() as f64,
            slot_rank.len() as f64,
        );
        self.candidates
            .iter()
            .map(|c| {
                let position = (faculty_rank[&c.faculty] as f64 * nr + room_rank[&c.room] as f64)
                    * nt
                    + slot_rank[&c.slot] as f64;
                position / (nf * nr * nt)
            })
            .collect()
    }
}

fn rank_of(ids: impl Iterator<Item = u32>) -> HashMap<u32, usize> {
    ids.collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(rank, id)| (id, rank))
        .collect()
}

/// solves the assignment problem using the HiGHS ILP solver.
pub fn solve(
    context: &Context,
    sessions: &[Session],
    config: &GeneratorConfig,
) -> Result<SolveOutcome, SolverError> {
    solve_with(context, sessions, config, run_ilp)
}

/// [`solve`] with the ILP stage supplied by the caller.
fn solve_with(
    context: &Context,
    sessions: &[Session],
    config: &GeneratorConfig,
    backend: impl FnOnce(&CandidateModel<'_>, &GeneratorConfig) -> Result<Vec<usize>, ResolutionError>,
) -> Result<SolveOutcome, SolverError> {
    let start_time = Instant::now();
    let model = CandidateModel::build(context, sessions)?;
    if config.strict {
        model.check_strict()?;
    }

    let mut placement = Placement::new(&model);
    let method = if model.candidates.is_empty() {
        warn!("No candidate assignments survived pre-filtering; nothing to solve.");
        SolveMethod::Skipped
    } else {
        match backend(&model, config) {
            Ok(selected) => {
                let dropped = placement.adopt(&selected);
                let added = placement.fill_greedily();
                if dropped + added == 0 {
                    SolveMethod::Ilp
                } else {
                    info!("Repaired ILP output: dropped {dropped}, added {added} assignment(s).");
                    SolveMethod::IlpRepaired
                }
            }
            Err(e) if config.strict => {
                return Err(SolverError::Backend(e.to_string()));
            }
            Err(e) => {
                warn!("ILP solve failed ({e}); falling back to greedy placement.");
                placement.fill_greedily();
                SolveMethod::Greedy
            }
        }
    };

    let outcome = placement.finish(method, start_time);
    if config.strict {
        if !outcome.unplaced.is_empty() {
            return Err(SolverError::Incomplete {
                unplaced: outcome.unplaced.len(),
            });
        }
        if let Some(member) = context
            .faculty
            .iter()
            .find(|f| placement.load_of(f.id) < f.min_hours_per_week)
        {
            return Err(SolverError::UnreachableMinimum {
                faculty: member.id,
                min: member.min_hours_per_week,
            });
        }
    }
    info!(
        "Placed {}/{} sessions in {:.2?} ({:?})",
        outcome.assignments.len(),
        sessions.len(),
        start_time.elapsed(),
        method
    );
    Ok(outcome)
}

/// Builds and solves the ILP, returning indices of selected candidates.
fn run_ilp(model: &CandidateModel, config: &GeneratorConfig) -> Result<Vec<usize>, ResolutionError> {
    let candidates = &model.candidates;
    info!(
        "Setting up ILP model with {} sessions, {} faculty, {} rooms, {} timeslots and {} variables...",
        model.sessions.len(),
        model.context.faculty.len(),
        model.context.rooms.len(),
        model.context.time_slots.len(),
        candidates.len()
    );
    let mut problem = ProblemVariables::new();
    let xs: Vec<Variable> = problem.add_vector(variable().binary(), candidates.len());
    let sum_of = |indices: &[usize]| -> Expression { indices.iter().map(|&i| xs[i]).sum() };

    let by_faculty = model.group_candidates(|c| c.faculty);
    let by_faculty_course = model.group_candidates(|c| (c.faculty, c.course));

    // shortfall_f = hours faculty f falls below their minimum (soft unless strict)
    let mut shortfalls: Vec<(FacultyId, Variable)> = Vec::new();
    if !config.strict {
        for member in &model.context.faculty {
            if member.min_hours_per_week > 0 {
                let var = problem.add(
                    variable()
                        .integer()
                        .min(0)
                        .max(member.min_hours_per_week),
                );
                shortfalls.push((member.id, var));
            }
        }
    }

    // y_fc = 1 if faculty f teaches any session of course c
    let locality: Vec<(Vec<usize>, Variable)> = by_faculty_course
        .values()
        .map(|indices| (indices.clone(), problem.add(variable().binary())))
        .collect();

    let balance_weight = config.effective_balance_weight();
    let peak = (balance_weight > 0.0).then(|| problem.add(variable().min(0)));

    // objective weights; tie-break terms stay below one unit of any main term
    let reward = config.fill_reward();
    let tie_scale = [reward, config.min_violation_penalty, balance_weight]
        .into_iter()
        .filter(|w| *w > 0.0)
        .fold(f64::INFINITY, f64::min);
    let tie_scale = if tie_scale.is_finite() { tie_scale / 4.0 } else { 0.0 };
    let locality_weight = tie_scale / (locality.len() as f64 + 1.0);
    let rank_unit = locality_weight / (2.0 * (model.sessions.len() as f64 + 1.0));

    let rank_fractions = model.rank_fractions();
    let mut terms: Vec<Expression> = xs
        .iter()
        .zip(&rank_fractions)
        .map(|(x, rank)| (reward - rank_unit * rank) * *x)
        .collect();
    terms.extend(
        shortfalls
            .iter()
            .map(|(_, s)| -config.min_violation_penalty * *s),
    );
    terms.extend(locality.iter().map(|(_, y)| -locality_weight * *y));
    if let Some(peak) = peak {
        terms.push(-balance_weight * peak);
    }
    let objective: Expression = terms.into_iter().sum();
    debug!(
        "Objective: reward {reward}, penalty {}, balance {balance_weight}, locality {locality_weight:.3e}, rank {rank_unit:.3e}",
        config.min_violation_penalty
    );

    let mut model_ilp = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", config.threads) // limit threads for reproducibility
        .set_option("random_seed", config.random_seed) //set seed for reproducibility
        .set_option("mip_rel_gap", config.mip_rel_gap)
        .set_option("output_flag", false);
    if let Some(limit) = config.time_limit_secs {
        model_ilp = model_ilp.set_option("time_limit", limit);
    }

    // begin hard constraints
    info!("Adding 'session placed once' constraints...");
    for indices in &model.by_session {
        if indices.is_empty() {
            continue;
        }
        let placed = sum_of(indices);
        if config.strict {
            model_ilp.add_constraint(constraint!(placed == 1));
        } else {
            model_ilp.add_constraint(constraint!(placed <= 1));
        }
    }

    info!("Adding 'no faculty, room or group overlap' constraints...");
    let overlaps = [
        model.group_candidates(|c| (c.faculty, c.slot)),
        model.group_candidates(|c| (c.room, c.slot)),
        model.group_candidates(|c| (c.group, c.slot)),
    ];
    for groups in &overlaps {
        for indices in groups.values().filter(|i| i.len() > 1) {
            let busy = sum_of(indices);
            model_ilp.add_constraint(constraint!(busy <= 1));
        }
    }

    info!("Adding faculty load constraints...");
    let shortfall_by_faculty: HashMap<FacultyId, Variable> = shortfalls.iter().copied().collect();
    for member in &model.context.faculty {
        let max = f64::from(member.max_hours_per_week);
        let min = f64::from(member.min_hours_per_week);
        let shortfall = shortfall_by_faculty.get(&member.id).copied();
        let Some(indices) = by_faculty.get(&member.id) else {
            // no candidates: the whole minimum is missed
            if let Some(shortfall) = shortfall {
                model_ilp.add_constraint(constraint!(shortfall >= min));
            }
            continue;
        };
        let load = sum_of(indices);
        model_ilp.add_constraint(constraint!(load.clone() <= max));
        if config.strict {
            if member.min_hours_per_week > 0 {
                model_ilp.add_constraint(constraint!(load.clone() >= min));
            }
        } else if let Some(shortfall) = shortfall {
            model_ilp.add_constraint(constraint!(load.clone() + shortfall >= min));
        }
        if let Some(peak) = peak {
            model_ilp.add_constraint(constraint!(load - peak <= 0));
        }
    }

    for (indices, y) in &locality {
        let sessions_touched = indices
            .iter()
            .map(|&i| candidates[i].session)
            .dedup()
            .count() as f64;
        let taught = sum_of(indices);
        model_ilp.add_constraint(constraint!(taught <= sessions_touched * *y));
    }

    //solve
    info!("Starting ILP solver...");
    let solve_start = Instant::now();
    let solution = model_ilp.solve()?;
    info!("Solution found in {:.2?}", solve_start.elapsed());

    Ok(xs
        .iter()
        .enumerate()
        .filter(|(_, x)| solution.value(**x) > 0.5)
        .map(|(i, _)| i)
        .collect())
}

/// Incremental record of accepted assignments; enforces every hard constraint.
struct Placement<'m> {
    model: &'m CandidateModel<'m>,
    chosen: Vec<Option<usize>>,
    faculty_busy: HashSet<(FacultyId, TimeSlotId)>,
    room_busy: HashSet<(RoomId, TimeSlotId)>,
    group_busy: HashSet<(GroupId, TimeSlotId)>,
    load: HashMap<FacultyId, u32>,
    teaching: HashSet<(FacultyId, CourseId)>,
}

impl<'m> Placement<'m> {
    fn new(model: &'m CandidateModel<'m>) -> Self {
        Self {
            model,
            chosen: vec![None; model.sessions.len()],
            faculty_busy: HashSet::new(),
            room_busy: HashSet::new(),
            group_busy: HashSet::new(),
            load: HashMap::new(),
            teaching: HashSet::new(),
        }
    }

    fn load_of(&self, faculty: FacultyId) -> u32 {
        self.load.get(&faculty).copied().unwrap_or(0)
    }

    fn at_maximum(&self, faculty: FacultyId) -> bool {
        self.load_of(faculty) >= self.model.max_hours.get(&faculty).copied().unwrap_or(0)
    }

    fn collides(&self, c: &Candidate) -> bool {
        self.faculty_busy.contains(&(c.faculty, c.slot))
            || self.room_busy.contains(&(c.room, c.slot))
            || self.group_busy.contains(&(c.group, c.slot))
    }

    fn fits(&self, index: usize) -> bool {
        let c = &self.model.candidates[index];
        self.chosen[c.session].is_none() && !self.collides(c) && !self.at_maximum(c.faculty)
    }

    fn commit(&mut self, index: usize) {
        let c = self.model.candidates[index];
        self.chosen[c.session] = Some(index);
        self.faculty_busy.insert((c.faculty, c.slot));
        self.room_busy.insert((c.room, c.slot));
        self.group_busy.insert((c.group, c.slot));
        *self.load.entry(c.faculty).or_insert(0) += 1;
        self.teaching.insert((c.faculty, c.course));
    }

    /// Accepts solver output in candidate order, dropping anything that
    /// breaks a hard constraint. Returns the number dropped.
    fn adopt(&mut self, selected: &[usize]) -> usize {
        let mut dropped = 0;
        for &index in selected {
            if self.fits(index) {
                self.commit(index);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!("Dropped {dropped} solver assignment(s) violating hard constraints.");
        }
        dropped
    }

    /// Places remaining sessions in tie-break order: faculty already teaching
    /// the course first, then lower faculty, room and slot ids.
    fn fill_greedily(&mut self) -> usize {
        let mut added = 0;
        for session in 0..self.model.sessions.len() {
            if self.chosen[session].is_some() {
                continue;
            }
            let pick = self.model.by_session[session]
                .iter()
                .copied()
                .filter(|&i| self.fits(i))
                .min_by_key(|&i| {
                    let c = &self.model.candidates[i];
                    (!self.teaching.contains(&(c.faculty, c.course)), i)
                });
            if let Some(index) = pick {
                self.commit(index);
                added += 1;
            }
        }
        added
    }

    fn explain(&self, session: usize) -> Vec<UnplacedReason> {
        let model = self.model;
        let entry = &model.sessions[session];
        let course_options = &model.options[&entry.course_id];
        let group_size = model.context.group_by_id[&entry.group_id].total_students;

        let mut reasons = Vec::new();
        if course_options.faculty.is_empty() {
            reasons.push(UnplacedReason::NoEligibleFaculty);
        }
        if course_options.rooms.is_empty() {
            reasons.push(UnplacedReason::NoEligibleRoom);
        } else if course_options.rooms.iter().all(|(_, cap)| *cap < group_size) {
            reasons.push(UnplacedReason::RoomTooSmall { group_size });
        }
        if !course_options.faculty.is_empty()
            && course_options
                .faculty
                .iter()
                .all(|f| model.faculty_slots[f].is_empty())
        {
            reasons.push(UnplacedReason::NoAvailableSlot);
        }
        if !reasons.is_empty() {
            return reasons;
        }

        let candidates = &model.by_session[session];
        if candidates.is_empty() {
            return vec![UnplacedReason::NoAvailableSlot];
        }
        let at_maximum = candidates
            .iter()
            .filter(|&&i| self.at_maximum(model.candidates[i].faculty))
            .count();
        if at_maximum == candidates.len() {
            vec![UnplacedReason::FacultyAtMaximum]
        } else if candidates.iter().all(|&i| !self.fits(i)) {
            if at_maximum > 0 {
                vec![UnplacedReason::FacultyAtMaximum, UnplacedReason::SlotConflict]
            } else {
                vec![UnplacedReason::SlotConflict]
            }
        } else {
            vec![UnplacedReason::NotSelected]
        }
    }

    fn finish(&self, method: SolveMethod, start_time: Instant) -> SolveOutcome {
        let model = self.model;
        let mut assignments = Vec::new();
        let mut unplaced = Vec::new();
        for (session, chosen) in self.chosen.iter().enumerate() {
            match chosen {
                Some(index) => {
                    let c = &model.candidates[*index];
                    assignments.push(Assignment {
                        session: model.sessions[session].clone(),
                        faculty_id: c.faculty,
                        room_id: c.room,
                        time_slot_id: c.slot,
                    });
                }
                None => unplaced.push(UnplacedSession {
                    session: model.sessions[session].clone(),
                    reasons: self.explain(session),
                }),
            }
        }
        assignments.sort();

        let (shortfall_hours, soft_violations) = under_minimum(model.context, &self.load);
        SolveOutcome {
            assignments,
            unplaced,
            soft_violations,
            shortfall_hours,
            method,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}

fn under_minimum(context: &Context, load: &HashMap<FacultyId, u32>) -> (u64, Vec<SoftViolation>) {
    let mut shortfall = 0;
    let mut violations = Vec::new();
    for member in &context.faculty {
        let assigned = load.get(&member.id).copied().unwrap_or(0);
        if assigned < member.min_hours_per_week {
            shortfall += u64::from(member.min_hours_per_week - assigned);
            violations.push(SoftViolation {
                constraint_type: "Minimum Hours".to_string(),
                description: format!(
                    "Faculty {} ({}) is assigned {} hours/week, below the minimum of {}.",
                    member.id, member.name, assigned, member.min_hours_per_week
                ),
            });
        }
    }
    (shortfall, violations)
}

/// Every session left out, with reasons, when the solver is not run at all.
pub fn unplaced_without_solving(context: &Context, sessions: &[Session]) -> Vec<UnplacedSession> {
    let model = CandidateModel::build(context, sessions).ok();
    let placement = model.as_ref().map(|m| Placement::new(m));
    sessions
        .iter()
        .enumerate()
        .map(|(index, session)| {
            let mut reasons = placement
                .as_ref()
                .map(|p| p.explain(index))
                .filter(|r| !r.contains(&UnplacedReason::NotSelected))
                .unwrap_or_default();
            reasons.push(UnplacedReason::BoundInfeasible);
            UnplacedSession {
                session: session.clone(),
                reasons,
            }
        })
        .collect()
}
