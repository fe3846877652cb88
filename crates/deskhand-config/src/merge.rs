//! Layer stacking over raw TOML trees.
//!
//! Layers are merged as [`toml::Value`]s before deserializing, so a key an
//! upper file leaves out keeps the value from the layer beneath. Tables
//! merge key by key. Scalars and arrays replace, which means a user file
//! listing `whitelisted_apps` replaces the default list outright.

use std::collections::HashMap;
use std::fmt;

use toml::Value;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// The embedded `defaults.toml`.
    Defaults,
    /// `/etc/deskhand/config.toml`.
    System,
    /// `~/.deskhand/config.toml`.
    User,
    /// The `--config` file.
    Explicit,
    /// An environment variable filling an unset field.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Defaults => "defaults",
            Self::System => "system (/etc/deskhand/config.toml)",
            Self::User => "user (~/.deskhand/config.toml)",
            Self::Explicit => "explicit (--config)",
            Self::Environment => "environment variable",
        })
    }
}

/// Dotted field path (`policy.max_file_size`) to the layer that set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// A merged tree plus the provenance of each leaf.
#[derive(Debug, Clone)]
pub struct Layered {
    /// The merged tree.
    pub value: Value,
    /// Which layer set each leaf.
    pub sources: FieldSources,
}

impl Layered {
    /// Start from `base`, attributing every leaf to `layer`.
    #[must_use]
    pub fn new(base: Value, layer: ConfigLayer) -> Self {
        let mut sources = FieldSources::new();
        let mut path = Vec::new();
        attribute(&base, &mut path, layer, &mut sources);
        Self {
            value: base,
            sources,
        }
    }

    /// Stack `overlay` on top. Only leaves present in `overlay` change source.
    pub fn apply(&mut self, overlay: &Value, layer: ConfigLayer) {
        let mut path = Vec::new();
        overlay_into(&mut self.value, overlay, &mut path, layer, &mut self.sources);
    }

    /// Split into the tree and its sources.
    #[must_use]
    pub fn into_parts(self) -> (Value, FieldSources) {
        (self.value, self.sources)
    }
}

fn overlay_into<'a>(
    base: &mut Value,
    overlay: &'a Value,
    path: &mut Vec<&'a str>,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    if !(base.is_table() && overlay.is_table()) {
        *base = overlay.clone();
        attribute(overlay, path, layer, sources);
        return;
    }
    let (Value::Table(below), Value::Table(above)) = (base, overlay) else {
        return;
    };

    for (key, incoming) in above {
        path.push(key);
        match below.get_mut(key) {
            Some(existing) if existing.is_table() && incoming.is_table() => {
                overlay_into(existing, incoming, path, layer, sources);
            },
            Some(existing) => {
                *existing = incoming.clone();
                attribute(incoming, path, layer, sources);
            },
            None => {
                below.insert(key.clone(), incoming.clone());
                attribute(incoming, path, layer, sources);
            },
        }
        path.pop();
    }
}

fn attribute<'a>(
    value: &'a Value,
    path: &mut Vec<&'a str>,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    if let Value::Table(table) = value {
        for (key, child) in table {
            path.push(key);
            attribute(child, path, layer, sources);
            path.pop();
        }
    } else if !path.is_empty() {
        sources.insert(path.join("."), layer);
    }
}
