//! Environment-backed configuration for `timeline-replay`.

use std::{env, path::PathBuf};

use thiserror::Error;
use timeline_core::RuntimeConfig;

const DEFAULT_ACTION_BUFFER: usize = 128;
const DEFAULT_EVENT_BUFFER: usize = 512;

/// Ordering applied to the projected timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first by creation time.
    CreatedAt,
    /// Store iteration order (unstable).
    Unsorted,
}

/// Runtime configuration used by the replay tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Action script to replay.
    pub script_path: PathBuf,
    /// Viewer id applied to update actions that do not name one.
    pub default_user_id: Option<String>,
    /// Timeline ordering.
    pub sort: SortOrder,
    /// Reducer runtime channel sizing.
    pub runtime: RuntimeConfig,
}

impl ReplayConfig {
    /// Parse configuration from environment variables, with the first CLI argument
    /// taking precedence over `TIMELINE_REPLAY_SCRIPT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let script_arg = env::args().nth(1);
        Self::from_lookup(script_arg, |key| env::var(key).ok())
    }

    fn from_lookup<F>(script_arg: Option<String>, mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let script_path = script_arg
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .or_else(|| optional_trimmed_env("TIMELINE_REPLAY_SCRIPT", &mut lookup))
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingScript)?;

        let default_user_id = optional_trimmed_env("TIMELINE_REPLAY_USER", &mut lookup);

        let sort = match optional_trimmed_env("TIMELINE_REPLAY_SORT", &mut lookup).as_deref() {
            None | Some("created_at") => SortOrder::CreatedAt,
            Some("none") => SortOrder::Unsorted,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "TIMELINE_REPLAY_SORT",
                    value: other.to_owned(),
                    reason: "expected 'created_at' or 'none'".to_owned(),
                });
            }
        };

        let action_buffer = parse_buffer(
            "TIMELINE_REPLAY_ACTION_BUFFER",
            DEFAULT_ACTION_BUFFER,
            &mut lookup,
        )?;
        let event_buffer = parse_buffer(
            "TIMELINE_REPLAY_EVENT_BUFFER",
            DEFAULT_EVENT_BUFFER,
            &mut lookup,
        )?;

        Ok(Self {
            script_path,
            default_user_id,
            sort,
            runtime: RuntimeConfig {
                action_buffer,
                event_buffer,
            },
        })
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No script path was given.
    #[error("no action script given; pass a path or set TIMELINE_REPLAY_SCRIPT")]
    MissingScript,
    /// An environment variable could not be parsed.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_buffer<F>(key: &'static str, default: usize, lookup: &mut F) -> Result<usize, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    let parsed = value
        .parse::<usize>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: value.clone(),
            reason: err.to_string(),
        })?;
    if parsed == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "must be at least 1".to_owned(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(
        script_arg: Option<&str>,
        pairs: &[(&str, &str)],
    ) -> Result<ReplayConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        ReplayConfig::from_lookup(script_arg.map(str::to_owned), |key| map.get(key).cloned())
    }

    #[test]
    fn parses_defaults_with_script_argument() {
        let cfg = config_from_pairs(Some("actions.jsonl"), &[]).expect("config should parse");

        assert_eq!(cfg.script_path, PathBuf::from("actions.jsonl"));
        assert_eq!(cfg.default_user_id, None);
        assert_eq!(cfg.sort, SortOrder::CreatedAt);
        assert_eq!(cfg.runtime.action_buffer, DEFAULT_ACTION_BUFFER);
        assert_eq!(cfg.runtime.event_buffer, DEFAULT_EVENT_BUFFER);
    }

    #[test]
    fn argument_wins_over_environment_script() {
        let cfg = config_from_pairs(
            Some("from-arg.jsonl"),
            &[("TIMELINE_REPLAY_SCRIPT", "from-env.jsonl")],
        )
        .expect("config should parse");
        assert_eq!(cfg.script_path, PathBuf::from("from-arg.jsonl"));

        let cfg = config_from_pairs(None, &[("TIMELINE_REPLAY_SCRIPT", " from-env.jsonl ")])
            .expect("config should parse");
        assert_eq!(cfg.script_path, PathBuf::from("from-env.jsonl"));
    }

    #[test]
    fn requires_a_script() {
        let err = config_from_pairs(None, &[("TIMELINE_REPLAY_SCRIPT", "  ")])
            .expect_err("blank script should fail");
        assert_eq!(err, ConfigError::MissingScript);
    }

    #[test]
    fn parses_viewer_sort_and_buffers() {
        let cfg = config_from_pairs(
            Some("a.jsonl"),
            &[
                ("TIMELINE_REPLAY_USER", "u1"),
                ("TIMELINE_REPLAY_SORT", "none"),
                ("TIMELINE_REPLAY_ACTION_BUFFER", "16"),
                ("TIMELINE_REPLAY_EVENT_BUFFER", "32"),
            ],
        )
        .expect("config should parse");

        assert_eq!(cfg.default_user_id.as_deref(), Some("u1"));
        assert_eq!(cfg.sort, SortOrder::Unsorted);
        assert_eq!(
            cfg.runtime,
            RuntimeConfig {
                action_buffer: 16,
                event_buffer: 32,
            }
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let err = config_from_pairs(Some("a.jsonl"), &[("TIMELINE_REPLAY_SORT", "newest")])
            .expect_err("unknown sort should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "TIMELINE_REPLAY_SORT",
                ..
            }
        ));

        let err = config_from_pairs(Some("a.jsonl"), &[("TIMELINE_REPLAY_ACTION_BUFFER", "0")])
            .expect_err("zero buffer should fail");
        assert_eq!(
            err.to_string(),
            "invalid TIMELINE_REPLAY_ACTION_BUFFER='0': must be at least 1"
        );

        let err = config_from_pairs(Some("a.jsonl"), &[("TIMELINE_REPLAY_EVENT_BUFFER", "abc")])
            .expect_err("non-numeric buffer should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "TIMELINE_REPLAY_EVENT_BUFFER",
                ..
            }
        ));
    }
}
