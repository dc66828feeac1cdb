//! Request parameters for a log stream
//!
//! Parameters arrive as a multi-valued mapping (typically a URL query string):
//!
//! - `maxLines` - deliver at most this many matching lines (0 = unbounded)
//! - `replay` - start from the beginning of the file
//! - `backlog` - start this many matching lines back from the end (ignored with `replay`)
//! - `level` - minimum severity, one of TRACE, DEBUG, INFO, WARNING, ERROR
//! - `includeEntity` / `excludeEntity` - entity tag or name globs (`unit-mysql-*`)
//! - `includeModule` / `excludeModule` - module prefixes (`juju.worker`)

use std::collections::HashMap;

use debuglog_types::Level;

use crate::error::ParamError;

/// Multi-valued request parameters, in arrival order per name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: HashMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` query string
    pub fn from_query(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Append a value for `name`
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// First value for `name`, treating an empty value as absent
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// All values for `name`
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.add(name, value);
        }
        params
    }
}

/// Validated, immutable stream configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamParams {
    pub max_lines: u64,
    pub from_start: bool,
    pub backlog: u64,
    pub filter_level: Level,
    pub include_entity: Vec<String>,
    pub include_module: Vec<String>,
    pub exclude_entity: Vec<String>,
    pub exclude_module: Vec<String>,
}

impl StreamParams {
    /// Validate request parameters
    ///
    /// Fields are checked independently; a backlog given together with
    /// `replay=true` is accepted and later ignored.
    pub fn parse(query: &QueryParams) -> Result<Self, ParamError> {
        let mut params = Self::default();

        if let Some(value) = query.get("maxLines") {
            params.max_lines = parse_unsigned("maxLines", value)?;
        }

        if let Some(value) = query.get("replay") {
            params.from_start = parse_bool("replay", value)?;
        }

        if let Some(value) = query.get("backlog") {
            params.backlog = parse_unsigned("backlog", value)?;
        }

        if let Some(value) = query.get("level") {
            params.filter_level = Level::parse(value)
                .filter(Level::is_filterable)
                .ok_or_else(|| ParamError::InvalidLevel(value.to_string()))?;
        }

        params.include_entity = query.get_all("includeEntity").to_vec();
        params.include_module = query.get_all("includeModule").to_vec();
        params.exclude_entity = query.get_all("excludeEntity").to_vec();
        params.exclude_module = query.get_all("excludeModule").to_vec();

        Ok(params)
    }
}

fn parse_unsigned(name: &'static str, value: &str) -> Result<u64, ParamError> {
    let invalid = || ParamError::InvalidUnsigned {
        name,
        value: value.to_string(),
    };
    // u64::from_str tolerates a leading '+'
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ParamError> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(ParamError::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}
