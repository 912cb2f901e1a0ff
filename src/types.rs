use serde::{Deserialize, Deserializer, Serialize};

// --- Enums ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Blocked,
    InProgress,
    Done,
    Retired,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Blocked => "blocked",
            ItemStatus::InProgress => "in-progress",
            ItemStatus::Done => "done",
            ItemStatus::Retired => "retired",
        };
        write!(f, "{}", name)
    }
}

/// Rough effort estimate. Drives the selector's budget filter.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Complexity {
    S,
    #[default]
    M,
    L,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::S => write!(f, "S"),
            Complexity::M => write!(f, "M"),
            Complexity::L => write!(f, "L"),
        }
    }
}

pub fn parse_complexity(s: &str) -> Result<Complexity, String> {
    match s.trim().to_lowercase().as_str() {
        "s" | "small" => Ok(Complexity::S),
        "m" | "medium" => Ok(Complexity::M),
        "l" | "large" => Ok(Complexity::L),
        _ => Err(format!(
            "Invalid complexity '{}': expected S, M, or L",
            s
        )),
    }
}

/// Execution mode of the calling agent session. Gates which passes run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    #[serde(rename = "B")]
    Build,
    #[serde(rename = "E")]
    Engage,
    #[serde(rename = "R")]
    Reflect,
}

impl Mode {
    /// Single-letter code used in the session-outcome log.
    pub fn code(&self) -> &'static str {
        match self {
            Mode::Build => "B",
            Mode::Engage => "E",
            Mode::Reflect => "R",
        }
    }

    pub fn runs_selector(&self) -> bool {
        *self == Mode::Build
    }

    pub fn runs_followup_ingest(&self) -> bool {
        matches!(self, Mode::Build | Mode::Reflect)
    }

    pub fn runs_friction_ingest(&self) -> bool {
        *self == Mode::Reflect
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

pub fn parse_mode(s: &str) -> Result<Mode, String> {
    match s.trim().to_lowercase().as_str() {
        "b" | "build" => Ok(Mode::Build),
        "e" | "engage" => Ok(Mode::Engage),
        "r" | "reflect" => Ok(Mode::Reflect),
        _ => Err(format!(
            "Invalid mode '{}': expected B (build), E (engage), or R (reflect)",
            s
        )),
    }
}

// --- Blocker checks ---

/// Recovery predicate attached to a blocked item.
///
/// Serialized as a tagged object (`{"kind": "file_exists", "path": ...}`).
/// A bare string is accepted on input and treated as an external command,
/// which is how hand-edited queues usually express it.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockerCheck {
    HttpReachable {
        url: String,
    },
    FileExists {
        path: String,
    },
    CommandExitsZero {
        program: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
    External {
        command: String,
    },
}

impl BlockerCheck {
    pub fn describe(&self) -> String {
        match self {
            BlockerCheck::HttpReachable { url } => format!("http reachable {}", url),
            BlockerCheck::FileExists { path } => format!("file exists {}", path),
            BlockerCheck::CommandExitsZero { program, args } if args.is_empty() => {
                format!("command exits zero `{}`", program)
            }
            BlockerCheck::CommandExitsZero { program, args } => {
                format!("command exits zero `{} {}`", program, args.join(" "))
            }
            BlockerCheck::External { command } => format!("external `{}`", command),
        }
    }
}

impl<'de> Deserialize<'de> for BlockerCheck {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(tag = "kind", rename_all = "snake_case")]
        enum Tagged {
            HttpReachable {
                url: String,
            },
            FileExists {
                path: String,
            },
            CommandExitsZero {
                program: String,
                #[serde(default)]
                args: Vec<String>,
            },
            External {
                command: String,
            },
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum BlockerCheckRaw {
            Command(String),
            Tagged(Tagged),
        }

        match BlockerCheckRaw::deserialize(deserializer)? {
            BlockerCheckRaw::Command(command) => Ok(BlockerCheck::External { command }),
            BlockerCheckRaw::Tagged(Tagged::HttpReachable { url }) => {
                Ok(BlockerCheck::HttpReachable { url })
            }
            BlockerCheckRaw::Tagged(Tagged::FileExists { path }) => {
                Ok(BlockerCheck::FileExists { path })
            }
            BlockerCheckRaw::Tagged(Tagged::CommandExitsZero { program, args }) => {
                Ok(BlockerCheck::CommandExitsZero { program, args })
            }
            BlockerCheckRaw::Tagged(Tagged::External { command }) => {
                Ok(BlockerCheck::External { command })
            }
        }
    }
}

// --- Structs ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ProgressNote {
    #[serde(default)]
    pub session: u32,
    pub text: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct QueueItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ItemStatus,
    /// Selection rank, lower first. Items with equal priority keep queue
    /// order. Created items take their id number.
    #[serde(default)]
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocker_check: Option<BlockerCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub progress_notes: Vec<ProgressNote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated: String,
}

impl QueueItem {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Fields supplied by whoever creates an item; the store fills in the rest.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub complexity: Complexity,
    pub deps: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct QueueFile {
    #[serde(default)]
    pub queue: Vec<QueueItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ArchiveFile {
    #[serde(default)]
    pub archived: Vec<QueueItem>,
}

/// A `- **label**: description` line from the backlog document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacklogIdea {
    pub label: String,
    pub description: String,
    /// The raw line, kept verbatim so promotion can remove it by exact match.
    pub line: String,
}

/// One record from the operational friction feed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct FrictionSignal {
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}
