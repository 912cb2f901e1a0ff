use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use queue_golem::compliance;
use queue_golem::config::{self, QueueGolemConfig, CONFIG_FILE_NAME};
use queue_golem::deps::unmet_dep_summary;
use queue_golem::lock;
use queue_golem::log::parse_log_level;
use queue_golem::pipeline::{self, PipelineReport, RunParams};
use queue_golem::similarity::is_duplicate;
use queue_golem::storage::{FileStorage, Storage, COMPLIANCE_LOG_KEY};
use queue_golem::store::{self, QueueStore};
use queue_golem::types::{parse_complexity, parse_mode, ItemStatus, Mode, NewItem};
use queue_golem::unblock::SystemCheckRunner;
use queue_golem::{log_info, log_warn};

const MAX_TITLE_WIDTH: usize = 48;

#[derive(Parser)]
#[command(name = "queue-golem", about = "Self-maintaining work queue for autonomous sessions")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Path to config file (defaults to {root}/queue-golem.toml).
    /// When specified, document paths resolve from the config file's
    /// parent directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log verbosity level (error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty queue and a default config
    Init,
    /// Run the queue pipeline once and persist the result
    Run {
        /// Session mode: B (build), E (engage), R (reflect)
        #[arg(long, default_value = "B")]
        mode: String,
        /// Budget ceiling for this session; small budgets avoid L items
        #[arg(long, default_value = "10")]
        budget: f64,
        /// Session number recorded on audit notes and the compliance log
        #[arg(long, default_value = "0")]
        session: u32,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue counts and actionable items
    Status,
    /// Add an item to the queue
    Add {
        /// Item title
        title: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Complexity (S, M, L)
        #[arg(short, long)]
        complexity: Option<String>,
        /// Tag (repeatable)
        #[arg(short, long, action = clap::ArgAction::Append)]
        tag: Vec<String>,
        /// Dependency id (repeatable)
        #[arg(long, action = clap::ArgAction::Append)]
        dep: Vec<String>,
    },
    /// Print the id the next created item would receive
    NextId,
    /// Summarize the queue compliance log
    Compliance,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match parse_log_level(&cli.log_level) {
        Ok(level) => queue_golem::log::set_log_level(level),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let root = &cli.root;
    let (config_path, config_base) = match &cli.config {
        Some(p) => (
            Some(p.clone()),
            p.parent().unwrap_or(Path::new(".")).to_path_buf(),
        ),
        None => (None, root.to_path_buf()),
    };

    let result = match cli.command {
        Commands::Init => handle_init(root, config_path.as_deref(), &config_base),
        Commands::Run {
            mode,
            budget,
            session,
            json,
        } => {
            handle_run(
                root,
                config_path.as_deref(),
                &config_base,
                &mode,
                budget,
                session,
                json,
            )
            .await
        }
        Commands::Status => handle_status(root, config_path.as_deref(), &config_base),
        Commands::Add {
            title,
            description,
            complexity,
            tag,
            dep,
        } => handle_add(
            root,
            config_path.as_deref(),
            &config_base,
            &title,
            description,
            complexity,
            tag,
            dep,
        ),
        Commands::NextId => handle_next_id(root, config_path.as_deref(), &config_base),
        Commands::Compliance => handle_compliance(root, config_path.as_deref(), &config_base),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn open_storage(
    root: &Path,
    config_path: Option<&Path>,
    config_base: &Path,
) -> Result<(QueueGolemConfig, FileStorage), String> {
    let config = config::load_config_from(config_path, root)?;
    let storage = FileStorage::new(config_base, &config.paths);
    Ok((config, storage))
}

fn handle_init(
    root: &Path,
    config_path: Option<&Path>,
    config_base: &Path,
) -> Result<(), String> {
    let target = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
    if config::write_default_config(&target)? {
        println!("  Created: {}", target.display());
    }

    let (config, storage) = open_storage(root, config_path, config_base)?;
    if store::init_queue(&storage)? {
        println!("  Created: {}", config_base.join(&config.paths.queue).display());
    }

    ensure_gitignore_entry(root, &format!("{}/", lock::RUNTIME_DIR))?;
    println!("Initialized queue-golem in {}", root.display());
    Ok(())
}

fn ensure_gitignore_entry(root: &Path, entry: &str) -> Result<(), String> {
    let gitignore_path = root.join(".gitignore");
    let existing = if gitignore_path.exists() {
        fs::read_to_string(&gitignore_path)
            .map_err(|e| format!("Failed to read .gitignore: {}", e))?
    } else {
        String::new()
    };

    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }

    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(entry);
    contents.push('\n');
    fs::write(&gitignore_path, contents).map_err(|e| format!("Failed to write .gitignore: {}", e))
}

async fn handle_run(
    root: &Path,
    config_path: Option<&Path>,
    config_base: &Path,
    mode: &str,
    budget: f64,
    session: u32,
    json: bool,
) -> Result<(), String> {
    let mode = parse_mode(mode)?;
    if budget.is_nan() || budget < 0.0 {
        return Err(format!("Invalid budget {}: expected a non-negative number", budget));
    }

    let _lock = lock::try_acquire(&root.join(lock::RUNTIME_DIR))?;
    let (config, storage) = open_storage(root, config_path, config_base)?;
    let runner = SystemCheckRunner::new(config_base);

    let mut compliance_warnings = Vec::new();
    if mode == Mode::Build {
        let resolved = QueueStore::load(&storage)
            .and_then(|store| compliance::resolve_previous(&storage, store.items()));
        match resolved {
            Ok(entries) => {
                for entry in entries {
                    log_info!("[compliance] {} {}", entry.assigned, entry.status);
                }
            }
            Err(e) => {
                log_warn!("[compliance] {}", e);
                compliance_warnings.push(e.to_string());
            }
        }
    }

    let params = RunParams {
        mode,
        budget_ceiling: budget,
        session,
    };
    let outcome = pipeline::run(&storage, &config, &params, &runner).await?;

    let persisted = outcome.persist()?;
    if persisted.queue {
        log_info!("[persist] Queue written");
    }
    if persisted.backlog {
        log_info!("[persist] Backlog rewritten");
    }

    let mut report = outcome.report;
    report.soft_errors.extend(persisted.warnings);
    report.soft_errors.extend(compliance_warnings);

    if mode == Mode::Build {
        let now = chrono::Utc::now().to_rfc3339();
        let assigned = report
            .selected
            .as_ref()
            .map(|s| (s.selection.item.id.as_str(), s.selection.item.title.as_str()));
        let line = compliance::assignment_line(&now, session, assigned);
        if let Err(e) = compliance::append(&storage, &line) {
            log_warn!("[compliance] {}", e);
            report.soft_errors.push(e.to_string());
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        println!("{}", out);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!(
        "[summary] mode={} actionable={} blocked={} retired={}",
        report.mode, report.counts.actionable, report.counts.blocked, report.counts.retired
    );
    for d in &report.deduped {
        println!("[dedup] Removed {}", d);
    }
    if report.stall_count > 0 {
        println!(
            "[stall] {} consecutive {} session(s) without output",
            report.stall_count, report.mode
        );
    }
    if !report.unblocked.is_empty() {
        println!("[unblock] {}", report.unblocked.join(", "));
    }
    match &report.selected {
        Some(task) => {
            let item = &task.selection.item;
            println!("[select] {} ({}) {}", item.id, item.complexity, item.title);
            if !task.rendered_context.is_empty() {
                print!("{}", task.rendered_context);
            }
        }
        None if report.mode == Mode::Build => println!("[select] No actionable task"),
        None => {}
    }
    if !report.promoted.is_empty() {
        println!("[promote] {}", report.promoted.join(", "));
    }
    if !report.ingested.followup.is_empty() {
        println!("[followup] {}", report.ingested.followup.join(", "));
    }
    if !report.ingested.friction.is_empty() {
        println!("[friction] {}", report.ingested.friction.join(", "));
    }
    for e in &report.soft_errors {
        println!("warning: {}", e);
    }
}

fn handle_status(
    root: &Path,
    config_path: Option<&Path>,
    config_base: &Path,
) -> Result<(), String> {
    let (_config, storage) = open_storage(root, config_path, config_base)?;
    let store = QueueStore::load(&storage)?;

    if store.items().is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!(
        "{:<10} {:<12} {:<4} {:<24} TITLE",
        "ID", "STATUS", "SIZE", "WAITING ON"
    );
    println!("{}", "-".repeat(100));

    for item in store.items() {
        let waiting = unmet_dep_summary(item, store.items()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<12} {:<4} {:<24} {}",
            item.id,
            item.status.to_string(),
            item.complexity.to_string(),
            truncate_title(&waiting, 24),
            truncate_title(&item.title, MAX_TITLE_WIDTH)
        );
    }

    println!(
        "\n{} actionable, {} blocked, {} retired, {} total",
        store.actionable_count(),
        store.count_with_status(ItemStatus::Blocked),
        store.count_with_status(ItemStatus::Retired),
        store.items().len()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_add(
    root: &Path,
    config_path: Option<&Path>,
    config_base: &Path,
    title: &str,
    description: Option<String>,
    complexity: Option<String>,
    tags: Vec<String>,
    deps: Vec<String>,
) -> Result<(), String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("Title must not be empty".to_string());
    }

    let _lock = lock::try_acquire(&root.join(lock::RUNTIME_DIR))?;
    let (config, storage) = open_storage(root, config_path, config_base)?;
    let mut store = QueueStore::load(&storage)?;

    if is_duplicate(title, store.titles(), &config.similarity) {
        return Err(format!("'{}' duplicates an item already in the queue", title));
    }

    let complexity = complexity
        .map(|c| parse_complexity(&c))
        .transpose()?
        .unwrap_or_default();

    let item = store.create_item(NewItem {
        title: title.to_string(),
        description: description.unwrap_or_default(),
        tags,
        source: Some("manual".to_string()),
        complexity,
        deps,
    })?;
    store.save()?;

    println!("Added {}: {} ({})", item.id, item.title, item.complexity);
    Ok(())
}

fn handle_next_id(
    root: &Path,
    config_path: Option<&Path>,
    config_base: &Path,
) -> Result<(), String> {
    let (_config, storage) = open_storage(root, config_path, config_base)?;
    let mut store = QueueStore::load(&storage)?;
    println!("{}", store.next_id()?);
    Ok(())
}

fn handle_compliance(
    root: &Path,
    config_path: Option<&Path>,
    config_base: &Path,
) -> Result<(), String> {
    let (_config, storage) = open_storage(root, config_path, config_base)?;
    let log = storage.load(COMPLIANCE_LOG_KEY)?.unwrap_or_default();
    let stats = compliance::compute_stats(&compliance::parse_log(&log));
    let out = serde_json::to_string_pretty(&stats)
        .map_err(|e| format!("Failed to serialize stats: {}", e))?;
    println!("{}", out);
    Ok(())
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        return title.to_string();
    }
    let cut: String = title.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
}
