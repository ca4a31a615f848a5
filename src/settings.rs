use crate::config::Config;
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

lazy_static::lazy_static! {
    static ref EMPTY_SETTINGS: HashMap<String, String> = HashMap::new();
    static ref PRESET_REF: Regex = Regex::new(r"preset=([A-Za-z0-9_-]+)").unwrap();
}

/// Presets may reference other presets; expansion stops after this many
/// rounds and leaves the remaining reference in place.
const MAX_PRESET_DEPTH: usize = 4;

/// Read-mostly store of per-operation settings and named presets.
///
/// Operation settings are frozen at construction. Preset values are resolved
/// lazily on first access (nested `preset=` references expanded) and cached;
/// concurrent first lookups race safely with first-write-wins semantics.
pub struct SettingsRegistry {
    operation_settings: HashMap<String, HashMap<String, String>>,
    presets: HashMap<String, String>,
    resolved_presets: RwLock<HashMap<String, Option<String>>>,
}

impl SettingsRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            operation_settings: config.operation_settings.clone(),
            presets: config.presets.clone(),
            resolved_presets: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the settings map for an operation. Unknown names yield a
    /// frozen empty map; this never fails and is idempotent.
    pub fn operation_settings(&self, name: &str) -> &HashMap<String, String> {
        self.operation_settings.get(name).unwrap_or(&EMPTY_SETTINGS)
    }

    /// True when a `default` preset is configured.
    pub fn has_default_preset(&self) -> bool {
        self.presets.contains_key("default")
    }

    /// Returns the resolved directive fragment for a preset, resolving and
    /// caching it on first access. Subsequent calls for the same name hit
    /// the cache without re-reading the underlying definitions.
    pub fn preset(&self, name: &str) -> Option<String> {
        {
            let cache = self.resolved_presets.read().unwrap_or_else(|e| e.into_inner());
            if let Some(resolved) = cache.get(name) {
                return resolved.clone();
            }
        }

        let resolved = self.resolve_preset(name);

        let mut cache = self.resolved_presets.write().unwrap_or_else(|e| e.into_inner());
        // First writer wins; a concurrent resolver for the same name produced
        // an identical value from the same frozen definitions.
        cache
            .entry(name.to_string())
            .or_insert_with(|| resolved.clone())
            .clone()
    }

    fn resolve_preset(&self, name: &str) -> Option<String> {
        let mut fragment = self.presets.get(name)?.trim().to_string();
        debug!(preset = name, "resolving preset");

        for _ in 0..MAX_PRESET_DEPTH {
            if !PRESET_REF.is_match(&fragment) {
                return Some(fragment);
            }
            fragment = PRESET_REF
                .replace_all(&fragment, |caps: &regex::Captures<'_>| {
                    let referenced = &caps[1];
                    match self.presets.get(referenced) {
                        Some(nested) => nested.trim().to_string(),
                        None => {
                            warn!(preset = referenced, "preset references unknown preset, dropping token");
                            String::new()
                        }
                    }
                })
                .into_owned();
        }

        if PRESET_REF.is_match(&fragment) {
            warn!(
                preset = name,
                "preset expansion exceeded depth {}, possible reference cycle", MAX_PRESET_DEPTH
            );
        }
        Some(fragment)
    }
}
