// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Command-line surface (clap derive) and its normalization into typed actions
// role: cli/parsing
// inputs: argv
// outputs: Invocation { config path, overrides, Action }
// invariants:
// - --gen-man short-circuits every other flag
// - progress values are validated to 0..=100 at parse time
// - blank list entries are dropped during normalization
// errors: clap usage errors; anyhow when no subcommand is given
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::assessment::{AssessmentUpdate, ProgressUpdate};
use crate::config::ConfigOverrides;
use crate::dashboard::{EpicListRequest, ReportRequest};
use crate::error::DashboardError;
use crate::model::{ManualKeyResult, StrategicObjective};

#[derive(Parser, Debug)]
#[command(
  name = "ion-dashboard",
  version,
  about = "Aggregate Jira epics into OKR progress, time rollups and objective reports",
  long_about = None
)]
pub struct Cli {
  /// TOML config file (default: ./ion-dashboard.toml when present)
  #[arg(long, global = true)]
  pub config: Option<PathBuf>,

  /// Directory holding objectives, assessments, key results and the shared cache
  #[arg(long, global = true)]
  pub store_dir: Option<PathBuf>,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant (hidden; tests only)
  #[arg(long = "now-override", hide = true, global = true)]
  pub now_override: Option<String>,

  #[command(subcommand)]
  pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Fetch epics, aggregate and print the dashboard report
  Report(ReportArgs),
  /// List epic records (no children) by key or project
  Epics(EpicsArgs),
  /// Manage strategic objectives
  Objective {
    #[command(subcommand)]
    action: ObjectiveAction,
  },
  /// Record an assessment for one issue (partial update)
  Assess(AssessArgs),
  /// Manage manually tracked key results
  KeyResult {
    #[command(subcommand)]
    action: KeyResultAction,
  },
  /// Shared cache maintenance
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Args, Debug)]
pub struct ReportArgs {
  /// OKR epic key (repeatable)
  #[arg(long = "epic")]
  pub epics: Vec<String>,

  /// Extra (non-OKR) epic key (repeatable)
  #[arg(long = "extra-epic")]
  pub extra_epics: Vec<String>,

  /// Project key; all its epics matching --status are reported
  #[arg(long)]
  pub project: Option<String>,

  /// Status names for --project (repeatable; "*" = any; default: not done)
  #[arg(long = "status")]
  pub statuses: Vec<String>,

  /// Year for quarter buckets (default: busiest of the last three years)
  #[arg(long)]
  pub year: Option<i32>,

  /// Skip cache lookups and overwrite entries with fresh data
  #[arg(long)]
  pub force_refresh: bool,

  /// Output file or directory ("-" = stdout)
  #[arg(long, default_value = "-")]
  pub out: String,
}

#[derive(Args, Debug)]
pub struct EpicsArgs {
  #[arg(long = "epic")]
  pub epics: Vec<String>,

  #[arg(long)]
  pub project: Option<String>,

  #[arg(long = "status")]
  pub statuses: Vec<String>,

  #[arg(long)]
  pub force_refresh: bool,
}

#[derive(Subcommand, Debug)]
pub enum ObjectiveAction {
  /// Create or replace an objective
  Put {
    #[arg(long)]
    id: String,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long = "epic")]
    epics: Vec<String>,
    /// Fixed progress that replaces the epic average
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    manual_progress: Option<u8>,
    /// Leave this objective out of the global average
    #[arg(long)]
    exclude: bool,
    #[arg(long = "team")]
    teams: Vec<String>,
  },
  Delete {
    #[arg(long)]
    id: String,
  },
  List,
}

#[derive(Args, Debug)]
pub struct AssessArgs {
  #[arg(long)]
  pub issue: String,

  #[arg(long, conflicts_with = "unapproved")]
  pub approved: bool,

  #[arg(long)]
  pub unapproved: bool,

  #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), conflicts_with = "clear_progress")]
  pub progress: Option<u8>,

  /// Drop the manual progress and use the status-based value again
  #[arg(long)]
  pub clear_progress: bool,

  #[arg(long, conflicts_with = "no_extra")]
  pub extra: bool,

  #[arg(long)]
  pub no_extra: bool,

  #[arg(long)]
  pub notes: Option<String>,

  /// Image URL to attach (repeatable)
  #[arg(long = "image")]
  pub images: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum KeyResultAction {
  /// Create or replace a key result
  Put {
    #[arg(long)]
    id: String,
    #[arg(long)]
    title: String,
    #[arg(long, allow_negative_numbers = true)]
    current: f64,
    #[arg(long, allow_negative_numbers = true)]
    target: f64,
    #[arg(long)]
    unit: Option<String>,
    #[arg(long)]
    objective: Option<String>,
  },
  List,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
  /// Remove every shared cache entry
  Clear,
}

#[derive(Debug, Clone)]
pub enum Action {
  GenMan,
  Report { request: ReportRequest, out: String },
  Epics(EpicListRequest),
  PutObjective(StrategicObjective),
  DeleteObjective(String),
  ListObjectives,
  Assess { issue: String, update: AssessmentUpdate },
  PutKeyResult(ManualKeyResult),
  ListKeyResults,
  ClearCache,
}

#[derive(Debug, Clone)]
pub struct Invocation {
  pub config_path: Option<PathBuf>,
  pub overrides: ConfigOverrides,
  pub action: Action,
}

fn clean(values: Vec<String>) -> Vec<String> {
  values.into_iter().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect()
}

fn flag_pair(on: bool, off: bool) -> Option<bool> {
  match (on, off) {
    (true, _) => Some(true),
    (false, true) => Some(false),
    (false, false) => None,
  }
}

pub fn normalize(cli: Cli) -> Result<Invocation> {
  let overrides = ConfigOverrides { store_dir: cli.store_dir, now_override: cli.now_override };

  let action = if cli.gen_man {
    Action::GenMan
  } else {
    match cli.command {
      None => {
        return Err(
          DashboardError::InvalidInput("Provide a subcommand: report | epics | objective | assess | key-result | cache".into())
            .into(),
        )
      }
      Some(Command::Report(a)) => Action::Report {
        request: ReportRequest {
          epics: clean(a.epics),
          extra_epics: clean(a.extra_epics),
          project: a.project.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
          statuses: clean(a.statuses),
          year: a.year,
          force_refresh: a.force_refresh,
        },
        out: a.out,
      },
      Some(Command::Epics(a)) => Action::Epics(EpicListRequest {
        epics: clean(a.epics),
        project: a.project.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        statuses: clean(a.statuses),
        force_refresh: a.force_refresh,
      }),
      Some(Command::Objective { action }) => match action {
        ObjectiveAction::Put { id, title, description, epics, manual_progress, exclude, teams } => {
          Action::PutObjective(StrategicObjective {
            id: id.trim().to_string(),
            title,
            description,
            epic_keys: clean(epics),
            manual_override: manual_progress,
            exclude_from_calculation: exclude,
            team_ids: clean(teams),
          })
        }
        ObjectiveAction::Delete { id } => Action::DeleteObjective(id.trim().to_string()),
        ObjectiveAction::List => Action::ListObjectives,
      },
      Some(Command::Assess(a)) => Action::Assess {
        issue: a.issue.trim().to_string(),
        update: AssessmentUpdate {
          approved: flag_pair(a.approved, a.unapproved),
          progress: match (a.progress, a.clear_progress) {
            (Some(p), _) => ProgressUpdate::Set(p),
            (None, true) => ProgressUpdate::Clear,
            (None, false) => ProgressUpdate::Keep,
          },
          extra: flag_pair(a.extra, a.no_extra),
          notes: a.notes,
          images: clean(a.images),
        },
      },
      Some(Command::KeyResult { action }) => match action {
        KeyResultAction::Put { id, title, current, target, unit, objective } => Action::PutKeyResult(ManualKeyResult {
          id: id.trim().to_string(),
          title,
          objective_id: objective,
          current,
          target,
          unit,
        }),
        KeyResultAction::List => Action::ListKeyResults,
      },
      Some(Command::Cache { action: CacheAction::Clear }) => Action::ClearCache,
    }
  };

  Ok(Invocation { config_path: cli.config, overrides, action })
}
