//! Shared types for debuglog
//!
//! This crate contains the severity levels, entity tags and parsed log line
//! used across the debuglog crates.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Severity
// ============================================================================

/// Log severity level
///
/// Ordered from least to most severe. `Unspecified` is the zero value given to
/// lines whose level could not be determined, and the default level floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    #[default]
    Unspecified,
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Parse a level token, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNSPECIFIED" => Some(Self::Unspecified),
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Canonical upper-case token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Whether this level is accepted as a request filter floor
    pub fn is_filterable(&self) -> bool {
        (Self::Trace..=Self::Error).contains(self)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entity Tags
// ============================================================================

/// Errors produced while resolving an entity tag
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("{0:?} is not a valid tag")]
    Malformed(String),

    #[error("{tag:?} has unknown kind {kind:?}")]
    UnknownKind { tag: String, kind: String },

    #[error("{tag:?} is not a valid {kind} tag")]
    InvalidId { tag: String, kind: TagKind },
}

/// Kind prefix of an entity tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    Machine,
    Unit,
    Service,
    Application,
    Environment,
    Model,
    User,
}

impl TagKind {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "machine" => Some(Self::Machine),
            "unit" => Some(Self::Unit),
            "service" => Some(Self::Service),
            "application" => Some(Self::Application),
            "environment" => Some(Self::Environment),
            "model" => Some(Self::Model),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Machine => "machine",
            Self::Unit => "unit",
            Self::Service => "service",
            Self::Application => "application",
            Self::Environment => "environment",
            Self::Model => "model",
            Self::User => "user",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured identifier such as `unit-mysql-0` or `machine-0-lxc-1`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityTag {
    id: String,
}

impl EntityTag {
    /// Resolve a tag string into its kind and identifier
    ///
    /// Unit ids turn their final dash into a slash (`mysql/0`) and machine ids
    /// turn every dash into a slash (`0/lxc/1`). Other kinds keep the suffix.
    pub fn parse(tag: &str) -> Result<Self, TagError> {
        let (prefix, rest) = tag
            .split_once('-')
            .ok_or_else(|| TagError::Malformed(tag.to_string()))?;

        let kind = TagKind::from_prefix(prefix).ok_or_else(|| TagError::UnknownKind {
            tag: tag.to_string(),
            kind: prefix.to_string(),
        })?;

        let invalid = || TagError::InvalidId {
            tag: tag.to_string(),
            kind,
        };

        let id = match kind {
            TagKind::Unit => {
                let (service, number) = rest.rsplit_once('-').ok_or_else(invalid)?;
                if !is_service_name(service) || !is_number(number) {
                    return Err(invalid());
                }
                format!("{service}/{number}")
            }
            TagKind::Machine => {
                let parts: Vec<&str> = rest.split('-').collect();
                // machine number, then (container type, number) pairs
                let valid = parts.len() % 2 == 1
                    && is_number(parts[0])
                    && parts[1..].chunks(2).all(|pair| {
                        !pair[0].is_empty()
                            && pair[0].chars().all(|c| c.is_ascii_lowercase())
                            && is_number(pair[1])
                    });
                if !valid {
                    return Err(invalid());
                }
                parts.join("/")
            }
            TagKind::Service | TagKind::Application => {
                if !is_service_name(rest) {
                    return Err(invalid());
                }
                rest.to_string()
            }
            TagKind::Environment | TagKind::Model | TagKind::User => {
                if rest.is_empty() {
                    return Err(invalid());
                }
                rest.to_string()
            }
        };

        Ok(Self { id })
    }

    /// The identifier portion (`mysql/0` for `unit-mysql-0`)
    pub fn id(&self) -> &str {
        &self.id
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Service names: lowercase alphanumeric segments joined by dashes, starting
/// with a letter, where every segment contains at least one letter.
fn is_service_name(s: &str) -> bool {
    if !s.starts_with(|c: char| c.is_ascii_lowercase()) {
        return false;
    }
    s.split('-').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && segment.chars().any(|c| c.is_ascii_lowercase())
    })
}

// ============================================================================
// Log Lines
// ============================================================================

/// A single log line with the metadata the filter chain looks at
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogLine {
    /// Original raw line
    pub line: String,

    /// Agent tag from the first token (`unit-mysql-0`), possibly empty
    pub agent_tag: String,

    /// Identifier derived from the tag (`mysql/0`), possibly empty
    pub agent_name: String,

    /// Severity, `Unspecified` when absent
    pub level: Level,

    /// Logging module (`juju.worker.uniter`), possibly empty
    pub module: String,
}

impl LogLine {
    /// Create a line with no derived metadata
    pub fn new(line: String) -> Self {
        Self {
            line,
            ..Default::default()
        }
    }
}
