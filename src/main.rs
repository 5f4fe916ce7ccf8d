use anyhow::Result;
use clap::Parser;

use ion_dashboard::cli::{normalize, Action, Cli, Invocation};
use ion_dashboard::config::AppConfig;
use ion_dashboard::context::AppContext;
use ion_dashboard::{dashboard, logging, render, util, DashboardError};

fn run(inv: Invocation) -> Result<()> {
  if let Action::GenMan = inv.action {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  // Phase 1: resolve configuration (file < env < flags)
  let config = AppConfig::load(inv.config_path.as_deref(), &inv.overrides)?;

  // Phase 2: wire the context and dispatch
  let ctx = AppContext::new(config);

  match inv.action {
    Action::GenMan => Ok(()),
    Action::Report { request, out } => {
      let report = dashboard::build_report(&ctx, &request)?;
      render::emit(&report, &out, &report.year.to_string())
    }
    Action::Epics(request) => render::print_json(&dashboard::list_epics(&ctx, &request)?),
    Action::PutObjective(objective) => {
      dashboard::put_objective(&ctx, &objective)?;
      render::print_json(&objective)
    }
    Action::DeleteObjective(id) => {
      let deleted = dashboard::delete_objective(&ctx, &id)?;
      render::print_json(&serde_json::json!({ "id": id, "deleted": deleted }))
    }
    Action::ListObjectives => render::print_json(&dashboard::list_objectives(&ctx)?),
    Action::Assess { issue, update } => render::print_json(&dashboard::assess_issue(&ctx, &issue, update)?),
    Action::PutKeyResult(kr) => {
      dashboard::put_key_result(&ctx, &kr)?;
      render::print_json(&kr)
    }
    Action::ListKeyResults => render::print_json(&dashboard::list_key_results(&ctx)?),
    Action::ClearCache => {
      let removed = dashboard::clear_shared_cache(&ctx)?;
      render::print_json(&serde_json::json!({ "removed": removed }))
    }
  }
}

fn exit_code(err: &anyhow::Error) -> i32 {
  match err.downcast_ref::<DashboardError>() {
    Some(DashboardError::Misconfigured(_)) | Some(DashboardError::InvalidInput(_)) => 2,
    _ => 1,
  }
}

fn main() {
  logging::init();

  let outcome = normalize(Cli::parse()).and_then(run);

  if let Err(err) = outcome {
    match err.downcast_ref::<DashboardError>() {
      Some(e) => eprintln!("error: {}", e.user_message()),
      None => eprintln!("error: {:#}", err),
    }
    std::process::exit(exit_code(&err));
  }
}
