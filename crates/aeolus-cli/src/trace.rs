//! # aeolus-cli::trace
//!
//! The flow trace reader. Each non-empty, non-comment line holds a flow
//! size in bytes and a start time in (fractional) seconds, whitespace
//! separated. Trailing tokens are ignored.

use aeolus_types::errors::ConfigError;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSpec {
    pub size_bytes: u64,
    pub start_secs: f64,
}

pub fn read_trace(path: &Path) -> Result<Vec<FlowSpec>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut flows = Vec::new();
    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let size_bytes = parse_field::<u64>(tokens.next(), i + 1, "flow size")?;
        let start_secs = parse_field::<f64>(tokens.next(), i + 1, "start time")?;
        if start_secs < 0.0 {
            return Err(ConfigError::Trace {
                line: i + 1,
                message: format!("negative start time {start_secs}"),
            });
        }
        flows.push(FlowSpec {
            size_bytes,
            start_secs,
        });
    }
    Ok(flows)
}

fn parse_field<T: std::str::FromStr>(
    token: Option<&str>,
    line: usize,
    what: &str,
) -> Result<T, ConfigError> {
    let token = token.ok_or_else(|| ConfigError::Trace {
        line,
        message: format!("missing {what}"),
    })?;
    token.parse().map_err(|_| ConfigError::Trace {
        line,
        message: format!("bad {what} {token:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("aeolus-{}-{name}", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_flows_and_skips_comments() {
        let path = write_temp("trace-ok", "# demo\n1000000 0.0\n\n2000000 0.5 extra\n");
        let flows = read_trace(&path).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].size_bytes, 1_000_000);
        assert_eq!(flows[1].start_secs, 0.5);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bad_lines_are_reported_with_their_number() {
        let path = write_temp("trace-bad", "1000 0.0\nnot-a-size 1.0\n");
        let err = read_trace(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_start_time_is_an_error() {
        let path = write_temp("trace-short", "1000\n");
        let err = read_trace(&path).unwrap_err();
        assert!(err.to_string().contains("start time"));
        let _ = std::fs::remove_file(&path);
    }
}
