//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported env var mappings, highest priority first.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PAUTHTATO_API_KEY",
        field_path: "auth.api_key",
    },
    EnvMapping {
        var_name: "PAUTHTATO_HOST",
        field_path: "server.host",
    },
    EnvMapping {
        var_name: "PAUTHTATO_PORT",
        field_path: "server.port",
    },
    // Conventional platform port variable.
    EnvMapping {
        var_name: "PORT",
        field_path: "server.port",
    },
    EnvMapping {
        var_name: "PAUTHTATO_LEDGER_BACKEND",
        field_path: "ledger.backend",
    },
    EnvMapping {
        var_name: "PAUTHTATO_LEDGER_PATH",
        field_path: "ledger.path",
    },
    EnvMapping {
        var_name: "PAUTHTATO_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "PAUTHTATO_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "PAUTHTATO_LOG_TARGET",
        field_path: "logging.target",
    },
    EnvMapping {
        var_name: "PAUTHTATO_LOG_DIR",
        field_path: "logging.directory",
    },
];

/// Apply environment variable fallbacks to fields that no config file set.
///
/// Fields still at their compiled-in default count as unset. Returns the
/// number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if matches!(
            sources.get(mapping.field_path),
            Some(ConfigLayer::File | ConfigLayer::Environment)
        ) {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);

    let (parents, leaf) = path.rsplit_once('.').unwrap_or(("", path));

    let mut current = root;
    for segment in parents.split('.').filter(|s| !s.is_empty()) {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml_val);
    }
}

/// Coerce a string env var value to the TOML type of the target field.
///
/// A value that does not parse stays a string so that deserialization
/// reports the bad field.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(path, "server.port")
        && let Ok(i) = val.trim().parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
