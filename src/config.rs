use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "queue-golem.toml";

/// Config written by `init`: every default spelled out, paths commented.
pub const DEFAULT_CONFIG_TOML: &str = r#"[paths]
# queue = "work-queue.json"
# archive = "work-queue-archive.json"
# backlog = "BRAINSTORMING.md"
# session_history = "session-history.txt"
# maintenance_report = "maintain-audit.txt"
# friction_feed = "friction-signals.json"
# compliance_log = "logs/queue-compliance.log"

[similarity]
prefix_len = 25
keyword_overlap = 0.6

[promotion]
floor = 3
tag = "brainstorming-auto"

[ingest]
followup_cap = 3
friction_cap = 2

[unblock]
timeout_secs = 10
"#;

#[derive(Default, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct QueueGolemConfig {
    pub paths: PathsConfig,
    pub similarity: SimilarityConfig,
    pub promotion: PromotionConfig,
    pub ingest: IngestConfig,
    pub unblock: UnblockConfig,
    pub stall: StallConfig,
    pub selector: SelectorConfig,
}

/// Document locations, relative to the config base directory.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub queue: String,
    pub archive: String,
    pub backlog: String,
    pub session_history: String,
    pub maintenance_report: String,
    pub friction_feed: String,
    pub compliance_log: String,
}

/// Title-matching knobs. The defaults are carried as-is, not tuned.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimilarityConfig {
    pub prefix_len: usize,
    pub keyword_overlap: f64,
    /// Tokens must be strictly longer than this to count as keywords.
    pub min_keyword_len: usize,
    pub signature_words: usize,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PromotionConfig {
    pub floor: usize,
    pub tag: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub followup_cap: usize,
    pub friction_cap: usize,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct UnblockConfig {
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StallConfig {
    /// Number of trailing log lines scanned.
    pub window: usize,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SelectorConfig {
    /// Budgets at or below this prefer non-L items.
    pub small_budget_ceiling: f64,
    pub context_notes: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            queue: "work-queue.json".to_string(),
            archive: "work-queue-archive.json".to_string(),
            backlog: "BRAINSTORMING.md".to_string(),
            session_history: "session-history.txt".to_string(),
            maintenance_report: "maintain-audit.txt".to_string(),
            friction_feed: "friction-signals.json".to_string(),
            compliance_log: "logs/queue-compliance.log".to_string(),
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            prefix_len: 25,
            keyword_overlap: 0.6,
            min_keyword_len: 3,
            signature_words: 6,
        }
    }
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            floor: 3,
            tag: "brainstorming-auto".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            followup_cap: 3,
            friction_cap: 2,
        }
    }
}

impl Default for UnblockConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Default for StallConfig {
    fn default() -> Self {
        Self { window: 30 }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            small_budget_ceiling: 5.0,
            context_notes: 3,
        }
    }
}

pub fn validate(config: &QueueGolemConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let overlap = config.similarity.keyword_overlap;
    if !(overlap > 0.0 && overlap <= 1.0) {
        errors.push(format!(
            "similarity.keyword_overlap must be in (0, 1], got {}",
            overlap
        ));
    }

    if config.similarity.prefix_len < 1 {
        errors.push("similarity.prefix_len must be >= 1".to_string());
    }

    if config.similarity.signature_words < 1 {
        errors.push("similarity.signature_words must be >= 1".to_string());
    }

    if config.promotion.floor < 1 {
        errors.push("promotion.floor must be >= 1".to_string());
    }

    if config.promotion.tag.trim().is_empty() {
        errors.push("promotion.tag must not be empty".to_string());
    }

    if config.unblock.timeout_secs < 1 {
        errors.push("unblock.timeout_secs must be >= 1".to_string());
    }

    if config.selector.small_budget_ceiling.is_nan() {
        errors.push("selector.small_budget_ceiling must be a number".to_string());
    }

    let paths = [
        ("paths.queue", &config.paths.queue),
        ("paths.archive", &config.paths.archive),
        ("paths.backlog", &config.paths.backlog),
        ("paths.session_history", &config.paths.session_history),
        ("paths.maintenance_report", &config.paths.maintenance_report),
        ("paths.friction_feed", &config.paths.friction_feed),
        ("paths.compliance_log", &config.paths.compliance_log),
    ];
    for (name, value) in paths {
        if value.trim().is_empty() {
            errors.push(format!("{} must not be empty", name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Load `queue-golem.toml` from the project root. A missing file yields defaults.
pub fn load_config(project_root: &Path) -> Result<QueueGolemConfig, String> {
    load_config_from(None, project_root)
}

/// Load config from an explicit path, or `{project_root}/queue-golem.toml`.
///
/// An explicitly named file must exist; the implicit one may be absent.
pub fn load_config_from(
    config_path: Option<&Path>,
    project_root: &Path,
) -> Result<QueueGolemConfig, String> {
    let path: PathBuf = match config_path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()));
            }
            p.to_path_buf()
        }
        None => {
            let implicit = project_root.join(CONFIG_FILE_NAME);
            if !implicit.exists() {
                return Ok(QueueGolemConfig::default());
            }
            implicit
        }
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let config: QueueGolemConfig = toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    validate(&config).map_err(|errors| {
        format!(
            "Config validation failed:\n{}",
            errors
                .iter()
                .map(|e| format!("  - {}", e))
                .collect::<Vec<_>>()
                .join("\n")
        )
    })?;

    Ok(config)
}

/// Write `DEFAULT_CONFIG_TOML` to `path` unless a file is already there.
/// Returns whether the file was written.
pub fn write_default_config(path: &Path) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    Ok(true)
}
