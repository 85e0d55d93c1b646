//! Command-line front end over the core workspace.
//!
//! # Responsibility
//! - Drive note, category and focus-session operations from a terminal.
//! - Act as the host loop: poll the workspace until its deadlines are met.
//!
//! # Invariants
//! - Every command ends with `Workspace::shutdown` so debounced writes land.

use clap::{Parser, Subcommand};
use focusnote_core::focus::{format_clock, format_focus_time};
use focusnote_core::{
    default_log_level, init_logging, Clock, CoreConfig, CoreEvent, EventSink, StatsRange,
    SystemClock, TimerState, Workspace,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for one host-loop sleep so console output stays responsive.
const MAX_IDLE_SLEEP_MS: i64 = 250;

#[derive(Parser, Debug)]
#[command(name = "focusnote", version, about = "Notes with focus sessions")]
struct Args {
    /// SQLite database path.
    #[arg(long, env = "FOCUSNOTE_DATA_PATH", default_value = "./focusnote.sqlite3")]
    data: PathBuf,

    /// Directory for rolling log files. Logging is off when omitted.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core linkage info.
    Ping,
    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Manage notes.
    #[command(subcommand)]
    Note(NoteCommand),
    /// Substring search over titles and bodies.
    Search { query: String },
    /// Run a focus session in the foreground until it completes.
    Focus {
        /// Session length in minutes. Defaults to the first configured
        /// duration.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1440))]
        minutes: Option<u32>,
    },
    /// Print focus statistics.
    Stats,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    List,
    Add {
        name: String,
        #[arg(long, default_value = "")]
        icon: String,
    },
    Rename {
        id: String,
        name: String,
    },
    /// Delete a category; its notes move to the fallback category.
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    /// List notes of a category, newest first.
    List { category: String },
    Add {
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
    },
    Rm { id: String },
}

struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn on_event(&self, event: &CoreEvent) {
        match event {
            CoreEvent::SessionStarted { duration_secs } => {
                println!("session started ({})", format_clock(*duration_secs));
            }
            CoreEvent::Tick { remaining_secs } if remaining_secs % 60 == 0 => {
                println!("remaining {}", format_clock(*remaining_secs));
            }
            CoreEvent::SessionCompleted { duration_secs } => {
                println!("session complete: {}", format_focus_time(u64::from(*duration_secs)));
            }
            CoreEvent::SessionStopped { elapsed_secs } => {
                println!("session stopped after {}", format_clock(*elapsed_secs));
            }
            CoreEvent::TypingPausePrompt { idle_secs } => {
                println!("no typing for {idle_secs}s");
            }
            CoreEvent::FocusSaveStatusChanged(status) if status.is_failed() => {
                eprintln!("focus log not saved: writes are failing");
            }
            _ => {}
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Some(dir) = args.log_dir.as_deref() {
        if let Err(err) = init_logging(default_log_level(), dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    if matches!(args.command, Command::Ping) {
        println!("focusnote_core ping={}", focusnote_core::ping());
        println!("focusnote_core version={}", focusnote_core::core_version());
        return ExitCode::SUCCESS;
    }

    let mut workspace = match Workspace::open_sqlite(&args.data, CoreConfig::default()) {
        Ok(workspace) => workspace,
        Err(err) => {
            eprintln!("cannot open {}: {err}", args.data.display());
            return ExitCode::FAILURE;
        }
    };
    workspace.subscribe(Arc::new(ConsoleSink));

    let outcome = run(&mut workspace, args.command);
    let flushed = workspace.shutdown();
    match (outcome, flushed) {
        (Ok(()), Ok(())) => ExitCode::SUCCESS,
        (Err(message), _) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
        (Ok(()), Err(err)) => {
            eprintln!("final save failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(workspace: &mut Workspace, command: Command) -> Result<(), String> {
    match command {
        Command::Ping => Ok(()),
        Command::Category(command) => run_category(workspace, command),
        Command::Note(command) => run_note(workspace, command),
        Command::Search { query } => {
            for note in workspace.repo().search(&query) {
                println!("{}\t{}", note.id, note.title);
            }
            Ok(())
        }
        Command::Focus { minutes } => run_focus(workspace, minutes.map(|m| m * 60)),
        Command::Stats => {
            let timer = workspace.timer();
            let stats = timer.stats();
            println!("total focus     {}", format_focus_time(stats.total_focus_time));
            println!("sessions        {}", stats.total_sessions);
            println!("distractions    {}", stats.total_distractions);
            println!("avoided         {}", stats.distractions_avoided);
            for (label, range) in [
                ("today", StatsRange::Today),
                ("last 7 days", StatsRange::Last7Days),
                ("last 30 days", StatsRange::Last30Days),
            ] {
                let slice = timer.range_stats(range);
                println!(
                    "{label:<15} {} in {} session(s)",
                    format_focus_time(slice.focus_time),
                    slice.sessions
                );
            }
            Ok(())
        }
    }
}

fn run_category(workspace: &mut Workspace, command: CategoryCommand) -> Result<(), String> {
    let repo = workspace.repo_mut();
    match command {
        CategoryCommand::List => {
            for category in repo.categories() {
                println!(
                    "{}\t{}\t{}\t{} note(s)",
                    category.id,
                    category.icon_ref,
                    category.name,
                    repo.note_count(category.id)
                );
            }
            Ok(())
        }
        CategoryCommand::Add { name, icon } => {
            let category = repo.create_category(&name, &icon).map_err(|e| e.to_string())?;
            println!("{}", category.id);
            Ok(())
        }
        CategoryCommand::Rename { id, name } => {
            let id = parse_id(&id)?;
            repo.rename_category(id, &name).map_err(|e| e.to_string())?;
            Ok(())
        }
        CategoryCommand::Rm { id } => {
            let id = parse_id(&id)?;
            let fallback = repo.delete_category(id).map_err(|e| e.to_string())?;
            println!("notes moved to {}", fallback.name);
            Ok(())
        }
    }
}

fn run_note(workspace: &mut Workspace, command: NoteCommand) -> Result<(), String> {
    let repo = workspace.repo_mut();
    match command {
        NoteCommand::List { category } => {
            let category = parse_id(&category)?;
            for note in repo.list_by_category(category) {
                println!("{}\t{}", note.id, note.title);
            }
            Ok(())
        }
        NoteCommand::Add {
            category,
            title,
            body,
        } => {
            let category = parse_id(&category)?;
            let mut note = repo.create(category).map_err(|e| e.to_string())?;
            note.title = title;
            note.body = body;
            let note = repo.update(note).map_err(|e| e.to_string())?;
            println!("{}", note.id);
            Ok(())
        }
        NoteCommand::Rm { id } => {
            let id = parse_id(&id)?;
            repo.delete(id).map_err(|e| e.to_string())?;
            Ok(())
        }
    }
}

fn run_focus(workspace: &mut Workspace, duration_secs: Option<u32>) -> Result<(), String> {
    let timer = workspace.timer_mut();
    let started = match duration_secs {
        Some(secs) => timer.start(secs),
        None => timer.start_selected(),
    };
    started.map_err(|e| e.to_string())?;
    info!(
        "event=cli_focus_start module=cli status=ok duration_secs={}",
        timer.selected_duration_secs()
    );

    let clock = SystemClock;
    while workspace.timer().state() != TimerState::Idle {
        workspace.poll();
        // No keystrokes reach a terminal session; treat the console as typing.
        workspace.timer_mut().note_typing();
        let now = clock.now_ms();
        let wait_ms = workspace
            .next_deadline_ms()
            .map_or(MAX_IDLE_SLEEP_MS, |deadline| deadline - now)
            .clamp(0, MAX_IDLE_SLEEP_MS);
        clock.sleep(Duration::from_millis(wait_ms.unsigned_abs()));
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<uuid::Uuid, String> {
    uuid::Uuid::parse_str(raw.trim()).map_err(|err| format!("invalid id `{raw}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{Args, Command};
    use clap::Parser;

    #[test]
    fn focus_without_minutes_uses_the_selected_duration() {
        let args = Args::try_parse_from(["focusnote", "focus"]).unwrap();
        assert!(matches!(args.command, Command::Focus { minutes: None }));
    }

    #[test]
    fn focus_minutes_must_be_positive() {
        assert!(Args::try_parse_from(["focusnote", "focus", "--minutes", "0"]).is_err());
        let args = Args::try_parse_from(["focusnote", "focus", "--minutes", "10"]).unwrap();
        assert!(matches!(args.command, Command::Focus { minutes: Some(10) }));
    }
}
