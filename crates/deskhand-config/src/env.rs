//! Environment variable fallbacks and `${VAR}` reference resolution.
//!
//! Env vars are **fallback**, not override: a mapping only applies when no
//! config file set the field.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// Supported env var mappings. Earlier entries win when two map to the same
/// field.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "DESKHAND_MODEL_PROVIDER",
        field_path: "model.provider",
    },
    EnvMapping {
        var_name: "DESKHAND_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "DESKHAND_MODEL_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "DESKHAND_MODEL_API_URL",
        field_path: "model.api_url",
    },
    EnvMapping {
        var_name: "DESKHAND_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "DESKHAND_CONFIRMATION",
        field_path: "confirmation.enabled",
    },
    EnvMapping {
        var_name: "DESKHAND_RETRY_MAX_ATTEMPTS",
        field_path: "retry.max_attempts",
    },
    EnvMapping {
        var_name: "DESKHAND_AUDIT_PATH",
        field_path: "audit.path",
    },
    // OpenRouter, then plain OpenAI.
    EnvMapping {
        var_name: "OPENROUTER_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "OPENROUTER_BASE_URL",
        field_path: "model.api_url",
    },
    EnvMapping {
        var_name: "OPENAI_API_KEY",
        field_path: "model.api_key",
    },
];

/// Apply environment variable fallbacks to fields that no config file set.
///
/// When the API key ends up coming from `OPENAI_API_KEY` and no file chose a
/// provider, the provider switches to `"openai"` so the key is sent to the
/// matching endpoint.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;
    let mut key_source = None;

    for mapping in ENV_MAPPINGS {
        if set_by_file(sources, mapping.field_path) {
            continue;
        }
        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if val.is_empty() {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field_from_string(merged, mapping.field_path, val);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        if mapping.field_path == "model.api_key" {
            key_source = Some(mapping.var_name);
        }
        count = count.saturating_add(1);
    }

    if key_source == Some("OPENAI_API_KEY") && !set_by_file(sources, "model.provider") {
        set_field_from_string(merged, "model.provider", "openai");
        sources.insert("model.provider".to_owned(), ConfigLayer::Environment);
    }

    count
}

/// A field counts as set once any layer other than the defaults (including
/// an earlier env mapping) has written it.
fn set_by_file(sources: &FieldSources, path: &str) -> bool {
    sources
        .get(path)
        .is_some_and(|layer| *layer != ConfigLayer::Defaults)
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            if s.contains("${") {
                *s = resolve_string_refs(s, env_vars);
            }
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

fn resolve_string_refs<S: BuildHasher>(input: &str, env_vars: &HashMap<String, String, S>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start.saturating_add(2)..];
        let Some(end) = after.find('}') else {
            // Unterminated reference, keep the remainder verbatim.
            result.push_str(&rest[start..]);
            return result;
        };
        let name = &after[..end];
        match env_vars.get(name) {
            Some(value) if !name.is_empty() => result.push_str(value),
            _ => {
                debug!(var = name, "unresolved env var reference in config");
                result.push_str("${");
                result.push_str(name);
                result.push('}');
            },
        }
        rest = &after[end.saturating_add(1)..];
    }
    result.push_str(rest);
    result
}

/// Set a field in the TOML tree from a string value, creating intermediate
/// tables as needed.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml_val);
    }
}

/// Coerce a string env var value to the TOML type of the target field.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(path, "retry.max_attempts") && let Ok(i) = val.parse::<i64>() {
        return toml::Value::Integer(i);
    }

    if matches!(path, "confirmation.enabled") && let Some(b) = parse_bool(val) {
        return toml::Value::Boolean(b);
    }

    toml::Value::String(val.to_owned())
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
