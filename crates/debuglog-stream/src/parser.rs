use debuglog_types::{EntityTag, Level, LogLine};

const AGENT_TAG_INDEX: usize = 0;
const LEVEL_INDEX: usize = 3;
const MODULE_INDEX: usize = 4;

/// Log parser for extracting metadata from raw log lines
///
/// Lines look like
/// `unit-mysql-0: 2014-03-24 22:34:25 INFO juju.worker.uniter message...`.
pub struct LineParser;

impl LineParser {
    /// Parse a raw log line
    ///
    /// Never fails: missing or malformed pieces leave the corresponding
    /// fields at their defaults.
    pub fn parse(raw: &str) -> LogLine {
        let fields: Vec<&str> = raw.split_whitespace().collect();
        let mut line = LogLine::new(raw.to_string());

        if let Some(token) = fields.get(AGENT_TAG_INDEX) {
            line.agent_tag = Self::extract_agent_tag(token).to_string();
            if !line.agent_tag.is_empty() {
                match EntityTag::parse(&line.agent_tag) {
                    Ok(tag) => line.agent_name = tag.id().to_string(),
                    Err(e) => {
                        tracing::error!(tag = %line.agent_tag, error = %e, "could not deduce name from tag");
                    }
                }
            }
        }

        if fields.len() > MODULE_INDEX
            && let Some(level) = Level::parse(fields[LEVEL_INDEX])
        {
            line.level = level;
            line.module = fields[MODULE_INDEX].to_string();
        }

        line
    }

    /// The tag is the first token minus its mandatory trailing colon, with any
    /// bracketed suffix (`unit-mysql-0[1234]:`) dropped.
    fn extract_agent_tag(token: &str) -> &str {
        if let Some(bracket) = token.find('[') {
            return &token[..bracket];
        }
        token.strip_suffix(':').unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let line = LineParser::parse(
            "unit-mysql-0: 2014-03-24 22:34:25 INFO juju.worker.uniter starting hook",
        );
        assert_eq!(line.agent_tag, "unit-mysql-0");
        assert_eq!(line.agent_name, "mysql/0");
        assert_eq!(line.level, Level::Info);
        assert_eq!(line.module, "juju.worker.uniter");
    }

    #[test]
    fn test_bracketed_suffix_dropped() {
        let line = LineParser::parse("unit-mysql-0[1234]: 2014-03-24 22:34:25 ERROR juju.cmd oops");
        assert_eq!(line.agent_tag, "unit-mysql-0");
        assert_eq!(line.agent_name, "mysql/0");
        assert_eq!(line.level, Level::Error);
    }

    #[test]
    fn test_machine_tag() {
        let line = LineParser::parse("machine-0-lxc-1: 2014-03-24 22:34:25 DEBUG juju.worker hi");
        assert_eq!(line.agent_tag, "machine-0-lxc-1");
        assert_eq!(line.agent_name, "0/lxc/1");
    }

    #[test]
    fn test_missing_colon_leaves_tag_empty() {
        let line = LineParser::parse("machine-0 2014-03-24 22:34:25 INFO juju.worker hi");
        assert_eq!(line.agent_tag, "");
        assert_eq!(line.agent_name, "");
        assert_eq!(line.level, Level::Info);
    }

    #[test]
    fn test_unresolvable_tag_keeps_tag() {
        let line = LineParser::parse("widget-7: 2014-03-24 22:34:25 INFO juju.worker hi");
        assert_eq!(line.agent_tag, "widget-7");
        assert_eq!(line.agent_name, "");
        assert_eq!(line.module, "juju.worker");
    }

    #[test]
    fn test_short_line_defaults() {
        let line = LineParser::parse("machine-0: just noise");
        assert_eq!(line.agent_tag, "machine-0");
        assert_eq!(line.level, Level::Unspecified);
        assert_eq!(line.module, "");
    }

    #[test]
    fn test_unknown_level_leaves_module_empty() {
        let line = LineParser::parse("machine-0: 2014-03-24 22:34:25 LOUD juju.worker hi");
        assert_eq!(line.level, Level::Unspecified);
        assert_eq!(line.module, "");
    }

    #[test]
    fn test_empty_line() {
        let line = LineParser::parse("");
        assert_eq!(line, LogLine::new(String::new()));
    }

    #[test]
    fn test_multibyte_no_panic() {
        let line = LineParser::parse("─────[──── ╭───╮ x y z");
        assert_eq!(line.agent_tag, "─────");
        assert_eq!(line.agent_name, "");
    }
}
