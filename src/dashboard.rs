// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate a dashboard run (selection, fetch, aggregate, roll up) and the user-owned document mutations
// role: orchestration/dashboard
// inputs: AppContext; ReportRequest / EpicListRequest from the CLI; objective, assessment and key result edits
// outputs: DashboardReport; epic lists; persisted documents
// side_effects: Jira calls through the cached source; document store reads/writes
// invariants:
// - selection order: explicit epics, explicit project, configured epics, configured default project
// - one failing epic becomes a failure row; only a total batch failure aborts the report
// - objectives/assessments are read after the fetch, each document consistent only with itself
// errors: Misconfigured when nothing is selected; InvalidInput for malformed edits; data source errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, SecondsFormat};
use tracing::info;

use crate::aggregate::{candidate_years, compute_epic_progress, select_best_year, summarize_epic};
use crate::assessment::{summarize_assessments, AssessmentUpdate};
use crate::config::{is_issue_key, validate_issue_keys, validate_project_key};
use crate::context::AppContext;
use crate::error::{DashboardError, Result};
use crate::jira::source::CachedJiraSource;
use crate::jira::StatusFilter;
use crate::model::{
  AssessmentRecord, DashboardReport, EpicDetail, EpicFailure, Issue, ManualKeyResult, StrategicObjective,
};
use crate::rollup::{global_average, key_result_progress, objective_progress, EpicProgressByKey};
use crate::store::{
  get_typed, list_typed, put_typed, ASSESSMENT_DATA, EPIC_PROGRESS_CACHE, MANUAL_OKRS, STRATEGIC_OBJECTIVES,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
  Epics { okr: Vec<String>, extra: Vec<String> },
  Project { key: String, filter: StatusFilter },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRequest {
  pub epics: Vec<String>,
  pub extra_epics: Vec<String>,
  pub project: Option<String>,
  pub statuses: Vec<String>,
  pub year: Option<i32>,
  pub force_refresh: bool,
}

pub fn resolve_selection(req: &ReportRequest, ctx: &AppContext) -> Result<Selection> {
  let okr = validate_issue_keys(&req.epics, "--epic")?;
  let extra = validate_issue_keys(&req.extra_epics, "--extra-epic")?;
  if !okr.is_empty() || !extra.is_empty() {
    return Ok(Selection::Epics { okr, extra });
  }

  let filter = StatusFilter::from_names(&req.statuses);
  if let Some(project) = req.project.as_deref() {
    return Ok(Selection::Project { key: validate_project_key(project, "--project")?, filter });
  }

  let config = &ctx.config;
  if !config.okr_epics.is_empty() || !config.extra_epics.is_empty() {
    return Ok(Selection::Epics { okr: config.okr_epics.clone(), extra: config.extra_epics.clone() });
  }
  if let Some(project) = config.default_project.clone() {
    return Ok(Selection::Project { key: project, filter });
  }

  Err(DashboardError::Misconfigured(
    "no epics selected: pass --epic/--project or set okr_epics/default_project".into(),
  ))
}

fn dedup_in_order(keys: impl IntoIterator<Item = String>) -> Vec<String> {
  let mut seen = HashSet::new();
  keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

/// Resolve the selection to epic keys (OKR and extra lists).
fn selected_keys(source: &CachedJiraSource, selection: Selection) -> Result<(Vec<String>, Vec<String>)> {
  match selection {
    Selection::Epics { okr, extra } => Ok((okr, extra)),
    Selection::Project { key, filter } => {
      let epics = source.fetch_epics_by_project(&key, &filter)?;
      info!(project = %key, filter = %filter.describe(), epics = epics.len(), "project epics resolved");
      Ok((epics.into_iter().map(|e| e.key).collect(), Vec::new()))
    }
  }
}

/// Epic keys that objectives without a manual override track, minus those already loaded.
fn referenced_epic_keys(objectives: &[StrategicObjective], loaded: &[String]) -> Vec<String> {
  let keys = objectives
    .iter()
    .filter(|o| o.manual_override.is_none())
    .flat_map(|o| o.epic_keys.iter())
    .map(|k| k.trim().to_string())
    .filter(|k| is_issue_key(k) && !loaded.contains(k));
  dedup_in_order(keys)
}

pub fn build_report(ctx: &AppContext, req: &ReportRequest) -> Result<DashboardReport> {
  let selection = resolve_selection(req, ctx)?;
  let source = ctx.source(req.force_refresh)?;
  let (okr_epics, extra_epics) = selected_keys(&source, selection)?;

  let all_keys = dedup_in_order(okr_epics.iter().chain(extra_epics.iter()).cloned());
  let outcome = source.fetch_epic_details(&all_keys)?;

  let mut failures: Vec<EpicFailure> = outcome
    .failures
    .iter()
    .map(|(key, e)| EpicFailure { key: key.clone(), message: e.user_message() })
    .collect();
  let details: Vec<EpicDetail> = outcome.values();

  let now = ctx.clock.now();
  let year = match req.year {
    Some(y) => y,
    None => {
      let majors: Vec<&Issue> = details
        .iter()
        .flat_map(|d| d.major_children().into_iter().map(|c| &c.issue))
        .collect();
      select_best_year(&majors, &candidate_years(now.year())).unwrap_or(now.year())
    }
  };

  let epics: Vec<_> = details.iter().map(|d| summarize_epic(d, year)).collect();
  let mut epic_progress: EpicProgressByKey = epics.iter().map(|e| (e.key.clone(), e.progress)).collect();

  let objectives_raw: Vec<StrategicObjective> = list_typed(ctx.store.as_ref(), STRATEGIC_OBJECTIVES)?;

  // Epics tracked by objectives but outside the selection still count toward their progress.
  let referenced = referenced_epic_keys(&objectives_raw, &all_keys);
  if !referenced.is_empty() {
    let extra = source.load_epic_details(&referenced);
    failures.extend(
      extra
        .failures
        .iter()
        .map(|(key, e)| EpicFailure { key: key.clone(), message: e.user_message() }),
    );
    for (key, detail) in &extra.loaded {
      let majors = detail.major_children();
      epic_progress.insert(key.clone(), compute_epic_progress(majors.iter().map(|c| &c.issue)));
    }
    info!(referenced = referenced.len(), loaded = extra.loaded.len(), "objective epics resolved");
  }
  let objectives = objectives_raw.iter().map(|o| objective_progress(o, &epic_progress)).collect();

  let key_results = list_typed::<ManualKeyResult>(ctx.store.as_ref(), MANUAL_OKRS)?
    .iter()
    .map(key_result_progress)
    .collect();

  let records: HashMap<String, AssessmentRecord> = list_typed::<AssessmentRecord>(ctx.store.as_ref(), ASSESSMENT_DATA)?
    .into_iter()
    .map(|r| (r.issue_key.clone(), r))
    .collect();

  info!(epics = epics.len(), failures = failures.len(), year, "report built");

  Ok(DashboardReport {
    generated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    year,
    okr_epics,
    extra_epics,
    global_average: global_average(&objectives_raw, &epic_progress),
    epics,
    failures,
    objectives,
    key_results,
    assessment: summarize_assessments(&details, &records),
  })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpicListRequest {
  pub epics: Vec<String>,
  pub project: Option<String>,
  pub statuses: Vec<String>,
  pub force_refresh: bool,
}

/// Epic records only (no children), by explicit keys or by project.
pub fn list_epics(ctx: &AppContext, req: &EpicListRequest) -> Result<Vec<Issue>> {
  let report_req = ReportRequest {
    epics: req.epics.clone(),
    project: req.project.clone(),
    statuses: req.statuses.clone(),
    ..ReportRequest::default()
  };
  let source = ctx.source(req.force_refresh)?;
  match resolve_selection(&report_req, ctx)? {
    Selection::Epics { okr, extra } => source.fetch_epics_by_keys(&dedup_in_order(okr.into_iter().chain(extra))),
    Selection::Project { key, filter } => source.fetch_epics_by_project(&key, &filter),
  }
}

// --- Strategic objectives ---

fn require_non_blank(value: &str, what: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(DashboardError::InvalidInput(format!("{} must not be empty", what)));
  }
  Ok(())
}

fn require_issue_key(key: &str) -> Result<()> {
  if !is_issue_key(key) {
    return Err(DashboardError::InvalidInput(format!("'{}' is not an issue key", key)));
  }
  Ok(())
}

pub fn put_objective(ctx: &AppContext, objective: &StrategicObjective) -> Result<()> {
  require_non_blank(&objective.id, "objective id")?;
  require_non_blank(&objective.title, "objective title")?;
  for key in &objective.epic_keys {
    require_issue_key(key)?;
  }
  if let Some(p) = objective.manual_override {
    if p > 100 {
      return Err(DashboardError::InvalidInput(format!("manual progress {} is above 100", p)));
    }
  }
  put_typed(ctx.store.as_ref(), STRATEGIC_OBJECTIVES, &objective.id, objective, false)
}

pub fn delete_objective(ctx: &AppContext, id: &str) -> Result<bool> {
  ctx.store.delete(STRATEGIC_OBJECTIVES, id)
}

pub fn list_objectives(ctx: &AppContext) -> Result<Vec<StrategicObjective>> {
  list_typed(ctx.store.as_ref(), STRATEGIC_OBJECTIVES)
}

// --- Assessments ---

pub fn assess_issue(ctx: &AppContext, issue_key: &str, update: AssessmentUpdate) -> Result<AssessmentRecord> {
  require_issue_key(issue_key)?;
  let existing: Option<AssessmentRecord> = get_typed(ctx.store.as_ref(), ASSESSMENT_DATA, issue_key)?;
  let record = update.apply(issue_key, existing)?;
  put_typed(ctx.store.as_ref(), ASSESSMENT_DATA, issue_key, &record, true)?;
  Ok(record)
}

// --- Manual key results ---

pub fn put_key_result(ctx: &AppContext, kr: &ManualKeyResult) -> Result<()> {
  require_non_blank(&kr.id, "key result id")?;
  require_non_blank(&kr.title, "key result title")?;
  if !kr.current.is_finite() || !kr.target.is_finite() {
    return Err(DashboardError::InvalidInput("current and target must be finite numbers".into()));
  }
  put_typed(ctx.store.as_ref(), MANUAL_OKRS, &kr.id, kr, false)
}

pub fn list_key_results(ctx: &AppContext) -> Result<Vec<ManualKeyResult>> {
  list_typed(ctx.store.as_ref(), MANUAL_OKRS)
}

/// Drop every shared cache entry; returns how many were removed.
pub fn clear_shared_cache(ctx: &AppContext) -> Result<usize> {
  ctx.store.clear(EPIC_PROGRESS_CACHE)
}
