// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Strategic objective rollup (effective progress, global average, review flag) and manual key result progress
// role: aggregation/rollup
// inputs: StrategicObjective / ManualKeyResult documents; epic progress keyed by epic key
// outputs: Integer progress values in [0, 100]; ObjectiveProgress / KeyResultProgress rows
// invariants:
// - a manual override always wins, including 0
// - missing epics count as 0; duplicate epic keys are averaged as listed
// - excluded objectives never enter the global average; no eligible objectives -> 0
// - needs_review has no numeric effect
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeSet, HashMap};

use crate::model::{KeyResultProgress, ManualKeyResult, ObjectiveProgress, StrategicObjective};
use crate::util::round_percent;

pub type EpicProgressByKey = HashMap<String, u8>;

pub fn effective_progress(objective: &StrategicObjective, epic_progress: &EpicProgressByKey) -> u8 {
  if let Some(manual) = objective.manual_override {
    return manual.min(100);
  }
  if objective.epic_keys.is_empty() {
    return 0;
  }

  let sum: f64 = objective
    .epic_keys
    .iter()
    .map(|k| epic_progress.get(k).copied().unwrap_or(0) as f64)
    .sum();
  round_percent(sum / objective.epic_keys.len() as f64)
}

pub fn global_average(objectives: &[StrategicObjective], epic_progress: &EpicProgressByKey) -> u8 {
  let eligible: Vec<u8> = objectives
    .iter()
    .filter(|o| !o.exclude_from_calculation)
    .map(|o| effective_progress(o, epic_progress))
    .collect();

  if eligible.is_empty() {
    return 0;
  }
  let sum: f64 = eligible.iter().map(|p| *p as f64).sum();
  round_percent(sum / eligible.len() as f64)
}

/// Objectives owned by more than one team get a review caveat.
pub fn needs_review(objective: &StrategicObjective) -> bool {
  let teams: BTreeSet<&str> = objective
    .team_ids
    .iter()
    .map(|t| t.trim())
    .filter(|t| !t.is_empty())
    .collect();
  teams.len() > 1
}

pub fn objective_progress(objective: &StrategicObjective, epic_progress: &EpicProgressByKey) -> ObjectiveProgress {
  ObjectiveProgress {
    id: objective.id.clone(),
    title: objective.title.clone(),
    epic_keys: objective.epic_keys.clone(),
    progress: effective_progress(objective, epic_progress),
    manual: objective.manual_override.is_some(),
    excluded: objective.exclude_from_calculation,
    needs_review: needs_review(objective),
  }
}

pub fn key_result_progress(kr: &ManualKeyResult) -> KeyResultProgress {
  let progress = if kr.target > 0.0 { round_percent(100.0 * kr.current / kr.target) } else { 0 };
  KeyResultProgress {
    id: kr.id.clone(),
    title: kr.title.clone(),
    objective_id: kr.objective_id.clone(),
    current: kr.current,
    target: kr.target,
    unit: kr.unit.clone(),
    progress,
  }
}
