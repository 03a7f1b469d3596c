//! Plan Pilot
//!
//! CLI entry point: extraction, validation, offline execution of recorded
//! responses, prompt hardening, and planning-record management.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use plan_pilot::cli::{Cli, Command, RecordsCommand};
use plan_pilot::models::settings::PilotConfig;
use plan_pilot::services::extraction::{extract_plan, ExtractionOutcome};
use plan_pilot::services::iteration::{ensure_usable, FeedbackEvent, FeedbackLoop};
use plan_pilot::services::validation::{ExistenceOracle, PlanValidator, ProjectTreeOracle};
use plan_pilot::services::workflow::{LocalFileCollaborator, ShellCommandCollaborator, WorkflowEvent};
use plan_pilot::services::{ClarificationOutcome, Pipeline};
use plan_pilot::storage::{ConfigService, Database, PlanningRecordStore};
use plan_pilot::AppError;
use plan_pilot_llm::ReplayCollaborator;

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config_service = match &cli.config {
        Some(path) => ConfigService::open(path),
        None => ConfigService::new(),
    }
    .context("Failed to load configuration")?;
    let config = config_service.get_config().clone();
    debug!(path = %config_service.path().display(), "Loaded config");

    match cli.command {
        Command::Extract { input } => cmd_extract(&input),
        Command::Validate { input, project } => cmd_validate(&config, &input, project.as_deref()),
        Command::Run {
            input,
            project,
            request,
            dry_run,
            responses,
        } => {
            if dry_run {
                cmd_dry_run(&config, &input, &project, cli.db.as_deref())
            } else {
                cmd_run(&config, &input, &project, &request, responses.as_deref(), cli.db.as_deref()).await
            }
        }
        Command::Harden {
            prompt,
            responses,
            max_iterations,
        } => cmd_harden(config, &prompt, &responses, max_iterations).await,
        Command::Records { command } => cmd_records(command, cli.db.as_deref()),
    }
}

/// Read a file, or stdin for `-`
fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn open_database(db: Option<&Path>) -> Result<Database> {
    let database = match db {
        Some(path) => Database::open(path),
        None => Database::new(),
    }
    .context("Failed to open planning-record database")?;
    Ok(database)
}

fn project_key(project: &Path) -> String {
    project
        .canonicalize()
        .unwrap_or_else(|_| project.to_path_buf())
        .display()
        .to_string()
}

fn cmd_extract(input: &Path) -> Result<()> {
    let text = read_input(input)?;
    match extract_plan(&text) {
        ExtractionOutcome::Extracted {
            plan,
            source,
            repaired,
            ..
        } => {
            debug!(?source, repaired, "Extracted plan");
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        ExtractionOutcome::NotFound { reason } => bail!("No plan found: {}", reason),
    }
}

fn cmd_validate(config: &PilotConfig, input: &Path, project: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let outcome = extract_plan(&text);
    let oracle = project.map(ProjectTreeOracle::new);
    let report = PlanValidator::from_config(config).validate_response(
        &text,
        &outcome,
        oracle.as_ref().map(|o| o as &dyn ExistenceOracle),
    );

    if !outcome.is_found() {
        println!("No structured plan found; the response is plain text.");
    }
    if report.is_clean() {
        println!("OK");
        return Ok(());
    }
    println!("{}", report.summary());
    if !report.is_valid() {
        return Err(AppError::validation(format!("{} issue(s)", report.issues.len())).into());
    }
    Ok(())
}

fn cmd_dry_run(config: &PilotConfig, input: &Path, project: &Path, db: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let pipeline = build_pipeline(config, ReplayCollaborator::new(Vec::<String>::new()), db)?;
    let dry = pipeline.dry_run(&text, project)?;

    if !dry.report.is_clean() {
        println!("{}\n", dry.report.summary());
    }
    if let Some(error) = &dry.compile_error {
        bail!("Compile failed: {}", error);
    }
    if !dry.report.is_valid() {
        return Err(AppError::validation(format!("{} issue(s)", dry.report.issues.len())).into());
    }
    for (index, task) in dry.tasks.iter().enumerate() {
        let deps = task.dependencies.as_deref().unwrap_or(&[]).join(", ");
        println!(
            "{:>2}. [{}] {} {}{}",
            index + 1,
            task.task_type,
            task.id,
            task.description,
            if deps.is_empty() { String::new() } else { format!(" (after {})", deps) }
        );
    }
    Ok(())
}

async fn cmd_run(
    config: &PilotConfig,
    input: &Path,
    project: &Path,
    request: &str,
    responses: Option<&Path>,
    db: Option<&Path>,
) -> Result<()> {
    let text = read_input(input)?;
    let follow_ups = match responses {
        Some(dir) => ReplayCollaborator::from_dir(dir)
            .await
            .with_context(|| format!("Failed to load responses from {}", dir.display()))?,
        None => ReplayCollaborator::new(Vec::<String>::new()),
    };
    let pipeline = build_pipeline(config, follow_ups, db)?;
    let project = PathBuf::from(project_key(project));
    let session_id = pipeline.open_session(&project).await;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel::<WorkflowEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_workflow_event(&event);
        }
    });

    let result = pipeline
        .execute_response(&session_id, request, text, &cancel, Some(&tx))
        .await;
    drop(tx);
    let _ = printer.await;
    pipeline.close_session(&session_id).await;

    let report = result?;
    info!(record_id = %report.record_id, status = %report.record_status, "Run finished");
    println!("Record {} ({})", report.record_id, report.record_status);
    for request in &report.run.raised {
        println!("  needs attention: {}", request.as_error());
    }

    match &report.run.outcome {
        ClarificationOutcome::Completed { summary } => {
            println!(
                "Completed {} task(s), {} failed, {} skipped",
                summary.completed, summary.failed, summary.skipped
            );
            if !summary.success() {
                bail!("Workflow finished with failures");
            }
        }
        ClarificationOutcome::PlainText => {
            println!("No plan in the response:\n{}", report.run.final_response);
        }
        ClarificationOutcome::ManualIntervention { reason } => {
            bail!(
                "Manual intervention needed after {} clarification round(s): {}",
                report.run.depth,
                reason
            );
        }
        ClarificationOutcome::Cancelled => bail!("Cancelled"),
    }
    Ok(())
}

async fn cmd_harden(
    mut config: PilotConfig,
    prompt: &str,
    responses: &Path,
    max_iterations: Option<u32>,
) -> Result<()> {
    if let Some(max) = max_iterations {
        config.max_iterations = max;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let replay = ReplayCollaborator::from_dir(responses)
        .await
        .with_context(|| format!("Failed to load responses from {}", responses.display()))?
        .repeat_last();
    let feedback = FeedbackLoop::new(Arc::new(replay), &config);

    let (tx, mut rx) = mpsc::channel::<FeedbackEvent>(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let FeedbackEvent::Evaluated {
                iteration,
                score,
                is_usable,
            } = event
            {
                eprintln!("iteration {}: score {}{}", iteration, score, if is_usable { " (usable)" } else { "" });
            }
        }
    });

    let mut history = Vec::new();
    let outcome = feedback
        .run(prompt, &mut history, &CancellationToken::new(), Some(&tx))
        .await;
    drop(tx);
    let _ = printer.await;

    let outcome = outcome?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    ensure_usable(outcome)?;
    Ok(())
}

fn cmd_records(command: RecordsCommand, db: Option<&Path>) -> Result<()> {
    let database = open_database(db)?;
    match command {
        RecordsCommand::List { project } => {
            let records = database.list(&project_key(&project))?;
            if records.is_empty() {
                println!("No planning records");
            }
            for record in records {
                println!(
                    "{}  {:<11}  {}  {}",
                    record.id,
                    record.status,
                    record.updated_at.as_deref().unwrap_or("-"),
                    record.title
                );
            }
        }
        RecordsCommand::Show { id, project } => match database.read(&project_key(&project), &id)? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => bail!("No record {}", id),
        },
        RecordsCommand::Delete { id, project } => {
            if !database.delete(&project_key(&project), &id)? {
                bail!("No record {}", id);
            }
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn build_pipeline(config: &PilotConfig, replay: ReplayCollaborator, db: Option<&Path>) -> Result<Pipeline> {
    let database = open_database(db)?;
    Ok(Pipeline::new(
        config.clone(),
        Arc::new(replay),
        Arc::new(LocalFileCollaborator),
        Arc::new(ShellCommandCollaborator::new(Duration::from_secs(
            config.command_timeout_secs,
        ))),
        Arc::new(database),
    ))
}

fn print_workflow_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::TaskStarted { task_id, task_type, .. } => eprintln!("> {} [{}]", task_id, task_type),
        WorkflowEvent::TaskCompleted { task_id, message } => eprintln!("  ok {}: {}", task_id, message),
        WorkflowEvent::TaskFailed { task_id, message, .. } => eprintln!("  FAILED {}: {}", task_id, message),
        WorkflowEvent::TaskSkipped { task_id, reason } => eprintln!("  skipped {}: {}", task_id, reason),
        WorkflowEvent::Cancelled { remaining } => eprintln!("Cancelled with {} task(s) left", remaining),
        WorkflowEvent::Finished { .. } => {}
    }
}
