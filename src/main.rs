mod advisory;
mod challenge;
mod config;
mod error;
mod evidence;
mod model;
mod output;
mod report;
mod store;
mod tracker;
mod ts;

use crate::advisory::{is_struggle_day, Advisor, AdvisorySlot, GeminiClient};
use crate::challenge::{Ignored, Outcome};
use crate::config::Config;
use crate::error::CliError;
use crate::evidence::FsEvidenceStore;
use crate::model::{TaskKey, TASK_COUNT, TOTAL_DAYS};
use crate::output::{render_progress_bar, render_simple_table, Styler};
use crate::report::{build_history, build_status, history_row, render_grid, task_rows, Status};
use crate::store::resolve_state_path;
use crate::tracker::Tracker;
use crate::ts::resolve_now;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum TaskArg {
    OutdoorWorkout,
    IndoorWorkout,
    Hydration,
    Reading,
    Diet,
    Photo,
}

impl TaskArg {
    fn key(self) -> TaskKey {
        match self {
            TaskArg::OutdoorWorkout => TaskKey::OutdoorWorkout,
            TaskArg::IndoorWorkout => TaskKey::IndoorWorkout,
            TaskArg::Hydration => TaskKey::Hydration,
            TaskArg::Reading => TaskKey::Reading,
            TaskArg::Diet => TaskKey::Diet,
            TaskArg::Photo => TaskKey::PhotoEvidence,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "hard75", version, about = "Local 75-day challenge tracker")]
struct Cli {
    /// Overrides the state file path for this invocation.
    #[arg(long, global = true)]
    state: Option<String>,

    /// Overrides the directory holding photo evidence.
    #[arg(long, global = true)]
    evidence_dir: Option<String>,

    /// Overrides the current time (RFC3339) for deterministic output/testing.
    #[arg(long, global = true)]
    now: Option<String>,

    #[arg(long, global = true, value_enum, default_value = "table")]
    format: Format,

    /// Disables ANSI color output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Skips the advisory provider and prints the built-in lines.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Today's checklist, or the end screen once all 75 days are done.
    Status,
    /// Checks or unchecks a task on the active day.
    Toggle(ToggleArgs),
    /// Finalizes the active day once all six tasks are done.
    Complete,
    /// Gives up and starts over at day 1.
    Reset(ResetArgs),
    /// Progress grid and every reached day.
    History,
    /// Read-only view of one reached day.
    Show(ShowArgs),
    Evidence(EvidenceArgs),
}

#[derive(Args, Debug)]
struct ToggleArgs {
    #[arg(value_enum)]
    task: TaskArg,
}

#[derive(Args, Debug)]
struct ResetArgs {
    /// Required: resetting discards all progress and stored evidence.
    #[arg(long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct ShowArgs {
    day: u32,
}

#[derive(Args, Debug)]
struct EvidenceArgs {
    #[command(subcommand)]
    command: EvidenceCommand,
}

#[derive(Subcommand, Debug)]
enum EvidenceCommand {
    /// Stores an image for the active day and checks off the photo task.
    Attach(AttachArgs),
    /// Writes the stored image of a reached day to a file.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct AttachArgs {
    file: PathBuf,
}

#[derive(Args, Debug)]
struct ExportArgs {
    day: u32,

    #[arg(long)]
    out: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            let code = if e.use_stderr() { 2 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let exit = match run(cli, config).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code
        }
    };

    std::process::exit(exit);
}

fn print_line(s: &str) {
    println!("{}", s);
}

fn print_json<T: serde::Serialize>(obj: &T) -> Result<(), CliError> {
    let s = serde_json::to_string_pretty(obj)
        .map_err(|e| CliError::io(format!("Output error: {}", e)))?;
    println!("{}", s);
    Ok(())
}

fn resolve_color_enabled(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    true
}

fn build_advisor(config: &Config, offline: bool) -> Advisor {
    match config.gemini_api_key.clone() {
        Some(key) if !offline => Advisor::new(
            Some(Arc::new(GeminiClient::new(
                key,
                config.advisory_model.clone(),
                config.advisory_base_url.clone(),
            ))),
            config.advisory_timeout,
        ),
        _ => Advisor::offline(),
    }
}

fn outcome_fields(outcome: Outcome) -> (bool, Option<Ignored>) {
    match outcome {
        Outcome::Applied => (true, None),
        Outcome::Ignored(why) => (false, Some(why)),
    }
}

fn render_checklist(status: &Status, styler: &Styler) {
    let Some(day) = status.day else {
        return;
    };

    print_line(&format!(
        "{}  {}/{}  {}",
        styler.bold(&format!("DAY {}", day)),
        status.tasks_done,
        status.tasks_total,
        render_progress_bar(status.tasks_done, status.tasks_total, TASK_COUNT * 2)
    ));
    for t in status.tasks.iter() {
        let mark = if t.done {
            styler.green("[x]")
        } else {
            "[ ]".to_string()
        };
        print_line(&format!("{} {:<16} {}", mark, t.task, styler.gray(t.detail)));
    }
}

fn render_ignored(why: Ignored, styler: &Styler) {
    print_line(&styler.gray(&format!("Nothing changed: {}", why.describe())));
}

fn render_finished(styler: &Styler) {
    print_line(&styler.green("MISSION COMPLETE"));
    print_line(&format!(
        "All {} days done. Run `hard75 reset --yes` for a new campaign.",
        TOTAL_DAYS
    ));
}

async fn run(cli: Cli, config: Config) -> Result<(), CliError> {
    let state_path = resolve_state_path(cli.state.as_deref())?;
    let now = resolve_now(cli.now.as_deref())?;
    let styler = Styler::new(resolve_color_enabled(cli.no_color));
    let advisor = build_advisor(&config, cli.offline);

    let evidence_dir = cli
        .evidence_dir
        .as_deref()
        .map(PathBuf::from)
        .or_else(|| config.evidence_dir.clone())
        .unwrap_or_else(|| {
            state_path
                .parent()
                .map(|p| p.join("evidence"))
                .unwrap_or_else(|| PathBuf::from("evidence"))
        });
    let store = FsEvidenceStore::new(evidence_dir, config.evidence_capacity_bytes);
    tracing::debug!(
        state = %state_path.display(),
        evidence = %store.dir().display(),
        "paths resolved"
    );
    let tracker = Tracker::new(state_path, store);

    match cli.command {
        Command::Status => {
            let state = tracker.snapshot(now)?;
            let status = build_status(&state);

            let mut slot = AdvisorySlot::default();
            if let Some(day) = status.day {
                let advisor = advisor.clone();
                slot.request(day, async move {
                    advisor.daily_advisory(day, is_struggle_day(day)).await
                });
            }

            if cli.format == Format::Json {
                let advisory = match status.day {
                    Some(day) => slot.resolve(day).await,
                    None => None,
                };

                #[derive(serde::Serialize)]
                struct Out {
                    status: Status,
                    advisory: Option<String>,
                }
                print_json(&Out { status, advisory })?;
            } else if status.finished {
                render_finished(&styler);
            } else {
                render_checklist(&status, &styler);
                print_line(&format!(
                    "completed {}/{}, {} to go",
                    status.days_completed, TOTAL_DAYS, status.days_remaining
                ));
                if let Some(day) = status.day {
                    if let Some(text) = slot.resolve(day).await {
                        print_line("");
                        print_line(&styler.gray(&format!("> {}", text)));
                    }
                }
            }

            Ok(())
        }

        Command::Toggle(args) => {
            let key = args.task.key();
            let (outcome, state) = tracker.toggle(key, now).await?;
            let status = build_status(&state);
            let (applied, ignored) = outcome_fields(outcome);

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    applied: bool,
                    ignored: Option<Ignored>,
                    task: &'static str,
                    done: bool,
                    status: Status,
                }
                let done = state.active_day().map(|d| d.tasks.get(key)).unwrap_or(false);
                print_json(&Out {
                    applied,
                    ignored,
                    task: key.as_str(),
                    done,
                    status,
                })?;
            } else {
                if let Some(why) = ignored {
                    render_ignored(why, &styler);
                }
                render_checklist(&status, &styler);
            }

            Ok(())
        }

        Command::Complete => {
            let (outcome, state) = tracker.complete_day(now)?;
            let status = build_status(&state);
            let (applied, ignored) = outcome_fields(outcome);

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    applied: bool,
                    ignored: Option<Ignored>,
                    status: Status,
                }
                print_json(&Out {
                    applied,
                    ignored,
                    status,
                })?;
            } else if let Some(why) = ignored {
                render_ignored(why, &styler);
                render_checklist(&status, &styler);
            } else if status.finished {
                render_finished(&styler);
            } else {
                print_line(&styler.green(&format!(
                    "Day {} complete.",
                    state.current_day_index
                )));
                render_checklist(&status, &styler);
            }

            Ok(())
        }

        Command::Reset(args) => {
            if !args.yes {
                return Err(CliError::usage(
                    "Reset discards all progress and evidence; pass --yes to confirm",
                ));
            }

            let state = tracker.fail_and_reset(now).await?;
            let advisory = advisor.recovery_advisory().await;
            let status = build_status(&state);

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    status: Status,
                    advisory: String,
                }
                print_json(&Out { status, advisory })?;
            } else {
                print_line(&styler.red("MISSION FAILED"));
                print_line(&styler.gray(&format!("> {}", advisory)));
                print_line("");
                render_checklist(&status, &styler);
            }

            Ok(())
        }

        Command::History => {
            let state = tracker.snapshot(now)?;
            let rows = build_history(&state);

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    current_day_index: usize,
                    start_date: String,
                    history: Vec<crate::report::HistoryRow>,
                }
                print_json(&Out {
                    current_day_index: state.current_day_index,
                    start_date: state.start_date.to_rfc3339(),
                    history: rows,
                })?;
            } else {
                print_line(&render_grid(&state, &styler));
                print_line("");
                let table_rows: Vec<Vec<String>> = rows
                    .iter()
                    .map(|r| {
                        vec![
                            r.day.to_string(),
                            r.status.to_string(),
                            format!("{}/{}", r.tasks_done, TASK_COUNT),
                            r.completed_at.clone().unwrap_or_else(|| "-".to_string()),
                        ]
                    })
                    .collect();
                print_line(&render_simple_table(
                    &["day", "status", "tasks", "completed_at"],
                    &table_rows,
                ));
            }

            Ok(())
        }

        Command::Show(args) => {
            let detail = tracker.day_detail(args.day, now).await?;
            let row = history_row(&detail.record);
            let tasks = task_rows(&detail.record.tasks);
            let evidence_bytes = detail.evidence.as_ref().map(|b| b.len());

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    day: crate::report::HistoryRow,
                    tasks: Vec<crate::report::TaskRow>,
                    evidence_bytes: Option<usize>,
                }
                print_json(&Out {
                    day: row,
                    tasks,
                    evidence_bytes,
                })?;
            } else {
                print_line(&format!("Day {} ({})", row.day, row.status));
                print_line(&format!(
                    "completed_at: {}",
                    row.completed_at.as_deref().unwrap_or("-")
                ));
                for t in tasks.iter() {
                    print_line(&format!("{} {}", if t.done { "[x]" } else { "[ ]" }, t.task));
                }
                match evidence_bytes {
                    Some(n) => print_line(&format!("evidence: {} bytes", n)),
                    None => print_line(&styler.gray("evidence: none")),
                }
            }

            Ok(())
        }

        Command::Evidence(args) => match args.command {
            EvidenceCommand::Attach(a) => {
                let blob = tokio::fs::read(&a.file).await.map_err(|e| {
                    CliError::io(format!("Cannot read {}: {}", a.file.display(), e))
                })?;
                let (outcome, state) = tracker.attach_evidence(&blob, now).await?;
                let status = build_status(&state);
                let (applied, ignored) = outcome_fields(outcome);

                if cli.format == Format::Json {
                    #[derive(serde::Serialize)]
                    struct Out {
                        applied: bool,
                        ignored: Option<Ignored>,
                        bytes: usize,
                        status: Status,
                    }
                    print_json(&Out {
                        applied,
                        ignored,
                        bytes: blob.len(),
                        status,
                    })?;
                } else {
                    if let Some(why) = ignored {
                        render_ignored(why, &styler);
                    } else {
                        print_line(&format!("Evidence secured ({} bytes).", blob.len()));
                    }
                    render_checklist(&status, &styler);
                }

                Ok(())
            }

            EvidenceCommand::Export(a) => {
                let detail = tracker.day_detail(a.day, now).await?;
                let blob = detail.evidence.ok_or_else(|| {
                    CliError::not_found(format!("No evidence stored for day {}", a.day))
                })?;
                tokio::fs::write(&a.out, &blob).await.map_err(|e| {
                    CliError::io(format!("Cannot write {}: {}", a.out.display(), e))
                })?;

                if cli.format == Format::Json {
                    #[derive(serde::Serialize)]
                    struct Out {
                        day: u32,
                        bytes: usize,
                        out: String,
                    }
                    print_json(&Out {
                        day: a.day,
                        bytes: blob.len(),
                        out: a.out.display().to_string(),
                    })?;
                } else {
                    print_line(&format!(
                        "Wrote {} bytes to {}",
                        blob.len(),
                        a.out.display()
                    ));
                }

                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_args_cover_every_task() {
        let keys: Vec<TaskKey> = TaskArg::value_variants().iter().map(|a| a.key()).collect();
        assert_eq!(keys, TaskKey::ALL.to_vec());
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hard75", "toggle", "hydration", "--format", "json", "--offline",
        ])
        .unwrap();
        assert_eq!(cli.format, Format::Json);
        assert!(cli.offline);
        assert!(matches!(cli.command, Command::Toggle(ToggleArgs { task: TaskArg::Hydration })));
    }
}
