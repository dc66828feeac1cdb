//! Line filter chain
//!
//! A line passes when it matches the include-entity and include-module lists
//! (empty lists match everything), matches nothing in the exclude lists, and
//! is at or above the level floor. Exclusion overrides inclusion.
//!
//! Entity patterns are globs where `*` matches any run of characters and the
//! whole tag or name must match. Module patterns are literal prefixes.

use regex::Regex;

use debuglog_types::{Level, LogLine};

use crate::params::StreamParams;
use crate::parser::LineParser;

/// Decides whether a raw line should be delivered
pub trait LineFilter: Send + Sync {
    fn accept(&self, line: &str) -> bool;
}

impl<F> LineFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accept(&self, line: &str) -> bool {
        self(line)
    }
}

/// Anchored glob where `*` is the only special character
#[derive(Clone, Debug)]
pub struct Glob {
    pattern: String,
    matcher: Matcher,
}

#[derive(Clone, Debug)]
enum Matcher {
    Exact,
    Wildcard(Regex),
    /// Pattern could not be compiled; matches nothing
    Invalid,
}

impl Glob {
    pub fn new(pattern: &str) -> Self {
        let matcher = if pattern.contains('*') {
            let source = pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            match Regex::new(&format!("^(?s:{source})$")) {
                Ok(re) => Matcher::Wildcard(re),
                Err(e) => {
                    tracing::error!(pattern, error = %e, "could not compile entity filter");
                    Matcher::Invalid
                }
            }
        } else {
            Matcher::Exact
        };

        Self {
            pattern: pattern.to_string(),
            matcher,
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.matcher {
            Matcher::Exact => self.pattern == value,
            Matcher::Wildcard(re) => re.is_match(value),
            Matcher::Invalid => false,
        }
    }
}

/// Compiled include/exclude/level filter for one stream
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
    include_entity: Vec<Glob>,
    include_module: Vec<String>,
    exclude_entity: Vec<Glob>,
    exclude_module: Vec<String>,
    level: Level,
}

impl FilterChain {
    /// Compile the filter from stream parameters
    pub fn new(params: &StreamParams) -> Self {
        let globs = |patterns: &[String]| -> Vec<Glob> {
            patterns.iter().map(|p| Glob::new(p)).collect()
        };
        Self {
            include_entity: globs(&params.include_entity),
            include_module: params.include_module.clone(),
            exclude_entity: globs(&params.exclude_entity),
            exclude_module: params.exclude_module.clone(),
            level: params.filter_level,
        }
    }

    /// Check a parsed line against the chain
    pub fn matches(&self, line: &LogLine) -> bool {
        self.check_include_entity(line)
            && self.check_include_module(line)
            && !self.exclude(line)
            && self.check_level(line)
    }

    fn check_include_entity(&self, line: &LogLine) -> bool {
        self.include_entity.is_empty()
            || self
                .include_entity
                .iter()
                .any(|glob| agent_matches(line, glob))
    }

    fn check_include_module(&self, line: &LogLine) -> bool {
        self.include_module.is_empty() || module_matches(line, &self.include_module)
    }

    fn exclude(&self, line: &LogLine) -> bool {
        self.exclude_entity
            .iter()
            .any(|glob| agent_matches(line, glob))
            || module_matches(line, &self.exclude_module)
    }

    fn check_level(&self, line: &LogLine) -> bool {
        line.level >= self.level
    }
}

impl LineFilter for FilterChain {
    fn accept(&self, line: &str) -> bool {
        self.matches(&LineParser::parse(line))
    }
}

/// An entity pattern matches either the agent name or the agent tag
fn agent_matches(line: &LogLine, glob: &Glob) -> bool {
    glob.matches(&line.agent_name) || glob.matches(&line.agent_tag)
}

fn module_matches(line: &LogLine, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|prefix| line.module.starts_with(prefix.as_str()))
}
