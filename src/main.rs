use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use quill_edit::SemanticEditIntent;
use quill_engine::{IterationPolicy, SpecialistFilter, SpecialistRegistry};
use quill_store::SessionManager;
use quill_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "quill", version, about = "SRS authoring orchestration core")]
struct Cli {
    /// Workspace root. Defaults to the current directory.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the per-project session files.
    Session {
        #[command(subcommand)]
        action: SessionCmd,
    },
    /// Scan and inspect specialist definitions.
    Specialists {
        #[command(subcommand)]
        action: SpecialistsCmd,
    },
    /// Resolve the iteration cap for a specialist.
    Policy {
        specialist: String,
        /// Specialist definitions directory to scan first.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print a document's heading tree with section ids.
    Toc { document: PathBuf },
    /// Apply a semantic-edit intents file to a markdown document.
    Edit {
        document: PathBuf,
        /// JSON array of edit intents.
        #[arg(long)]
        intents: PathBuf,
        /// Write the edited document back instead of printing it.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand)]
enum SessionCmd {
    /// Create a session and persist it.
    New {
        #[arg(long)]
        project: Option<String>,
    },
    /// Load and print a persisted session.
    Show {
        #[arg(long)]
        project: Option<String>,
    },
    /// Rename a project's session file and directory.
    Rename { old_name: String, new_name: String },
    /// Delete a project's session file and directory.
    Delete { name: String },
    /// Reset the in-memory session. Never touches session files.
    Clear,
}

#[derive(Subcommand)]
enum SpecialistsCmd {
    /// Scan a directory of definition files and report the results.
    Scan { dir: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig::default());
    let cli = Cli::parse();

    let workspace = match cli.workspace {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    match cli.command {
        Command::Session { action } => run_session(&workspace, action),
        Command::Specialists { action } => run_specialists(action),
        Command::Policy { specialist, dir } => run_policy(&specialist, dir.as_deref()),
        Command::Toc { document } => run_toc(&document),
        Command::Edit { document, intents, write } => run_edit(&document, &intents, write),
    }
}

fn run_session(workspace: &std::path::Path, action: SessionCmd) -> anyhow::Result<()> {
    let manager = SessionManager::new(workspace);
    match action {
        SessionCmd::New { project } => {
            let result = manager.start_new_session(project.as_deref())?;
            if let Some(warning) = &result.warning {
                tracing::warn!(%warning, "session created without persistence");
            }
            println!("{}", serde_json::to_string_pretty(&result.session)?);
        }
        SessionCmd::Show { project } => {
            let session = manager.load_project(project.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionCmd::Rename { old_name, new_name } => {
            manager.load_project(Some(&old_name))?;
            manager.rename_project(&old_name, &new_name)?;
            println!("renamed '{old_name}' to '{new_name}'");
        }
        SessionCmd::Delete { name } => {
            manager.load_project(Some(&name))?;
            manager.delete_project(&name)?;
            println!("deleted '{name}', current session is now the main session");
        }
        SessionCmd::Clear => {
            manager.clear_session();
            println!("session cleared (session files untouched)");
        }
    }
    Ok(())
}

fn run_specialists(action: SpecialistsCmd) -> anyhow::Result<()> {
    match action {
        SpecialistsCmd::Scan { dir } => {
            let mut registry = SpecialistRegistry::new();
            let report = registry.scan_and_register(&dir);
            for config in registry.all(&SpecialistFilter::default()) {
                println!(
                    "{} [{}] {}{}",
                    config.id,
                    match config.category {
                        quill_engine::SpecialistCategory::Content => "content",
                        quill_engine::SpecialistCategory::Process => "process",
                    },
                    if config.enabled { "enabled" } else { "disabled" },
                    if config.is_legacy() { " (legacy)" } else { "" },
                );
            }
            for invalid in &report.invalid_files {
                eprintln!("invalid: {}: {}", invalid.path.display(), invalid.error);
            }
            println!(
                "scanned {} file(s): {} valid, {} invalid, {} legacy",
                report.stats.scanned_files,
                report.stats.valid,
                report.stats.invalid,
                report.stats.legacy
            );
        }
    }
    Ok(())
}

fn run_policy(specialist: &str, dir: Option<&std::path::Path>) -> anyhow::Result<()> {
    let mut registry = SpecialistRegistry::new();
    if let Some(dir) = dir {
        registry.scan_and_register(dir);
    }
    let decision = IterationPolicy::default().resolve(specialist, registry.get(specialist));
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "specialist": specialist,
            "maxIterations": decision.max_iterations,
            "source": decision.source,
        }))?
    );
    Ok(())
}

fn run_toc(document: &std::path::Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(document)
        .with_context(|| format!("cannot read {}", document.display()))?;
    let toc = quill_edit::parse_toc(&text);
    println!("{}", serde_json::to_string_pretty(&toc)?);
    Ok(())
}

fn run_edit(document: &std::path::Path, intents: &std::path::Path, write: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(document)
        .with_context(|| format!("cannot read {}", document.display()))?;
    let raw = std::fs::read_to_string(intents)
        .with_context(|| format!("cannot read {}", intents.display()))?;
    let parsed: Vec<SemanticEditIntent> =
        serde_json::from_str(&raw).context("intents file is not a JSON array of edit intents")?;

    let outcome = quill_edit::execute_edits(&text, &parsed);
    eprintln!(
        "{}/{} intent(s) applied{}",
        outcome.successful_intents,
        outcome.total_intents,
        if outcome.success { "" } else { " (with failures)" }
    );
    for failure in &outcome.failed_intents {
        eprintln!("failed intent {}: {}", failure.index, failure.error);
    }

    if write {
        std::fs::write(document, &outcome.document)
            .with_context(|| format!("cannot write {}", document.display()))?;
        println!("wrote {}", document.display());
    } else {
        println!("{}", outcome.document);
    }

    if outcome.success {
        Ok(())
    } else {
        anyhow::bail!("{} intent(s) failed", outcome.failed_intents.len())
    }
}
