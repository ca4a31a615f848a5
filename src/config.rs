use crate::constants::*;
use std::collections::HashMap;
use std::env;

/// Static configuration for an imgweave instance.
///
/// Built once at startup, either from environment variables or directly as a
/// struct literal, and treated as immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// When true, the registry instantiates every operation in the built-in
    /// table (plus any extension providers). When false, only the names in
    /// `pipeline` are instantiated.
    pub auto_discover: bool,
    /// Ordered list of operation names for the explicit strategy. Also the
    /// fallback list when automatic discovery fails.
    pub pipeline: Vec<String>,
    /// Named directive fragments, e.g. `thumb -> "width=150height=150"`.
    pub presets: HashMap<String, String>,
    /// When true, directives may only contain preset references.
    pub only_presets: bool,
    /// Per-operation settings maps, keyed by operation name.
    pub operation_settings: HashMap<String, HashMap<String, String>>,
}

fn parse_boolean_env(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true")
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_presets(presets_str: &str) -> HashMap<String, String> {
    let mut presets = HashMap::new();
    if presets_str.is_empty() {
        return presets;
    }

    for preset_def in presets_str.split(';') {
        if let Some((name, fragment)) = preset_def.split_once('=') {
            let name = name.trim().to_string();
            let fragment = fragment.trim().to_string();
            if !name.is_empty() && !fragment.is_empty() {
                presets.insert(name, fragment);
            }
        }
    }

    presets
}

/// Parses a settings string of the form
/// `resize.RestrictTo=width=100height=0;resize.MaxWidth=4096` into
/// per-operation maps. Entries are separated by `;`, keys are
/// `<operation>.<SettingName>`, and the value is everything after the first
/// `=`.
fn parse_operation_settings(settings_str: &str) -> HashMap<String, HashMap<String, String>> {
    let mut settings: HashMap<String, HashMap<String, String>> = HashMap::new();
    if settings_str.is_empty() {
        return settings;
    }

    for entry in settings_str.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        let Some((operation, setting)) = key.trim().split_once('.') else {
            continue;
        };
        let operation = operation.trim();
        let setting = setting.trim();
        if operation.is_empty() || setting.is_empty() {
            continue;
        }
        settings
            .entry(operation.to_string())
            .or_default()
            .insert(setting.to_string(), value.trim().to_string());
    }

    settings
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let auto_discover = env::var(ENV_AUTO_DISCOVER)
            .map(|v| parse_boolean_env(&v))
            .unwrap_or(true);
        let pipeline = parse_list(&env::var(ENV_PIPELINE).unwrap_or_default());

        if !auto_discover && pipeline.is_empty() {
            return Err(format!(
                "automatic discovery is disabled but {} is empty",
                ENV_PIPELINE
            ));
        }

        let presets = parse_presets(&env::var(ENV_PRESETS).unwrap_or_default());
        let only_presets = env::var(ENV_ONLY_PRESETS)
            .map(|v| parse_boolean_env(&v))
            .unwrap_or(false);
        let operation_settings = parse_operation_settings(&env::var(ENV_SETTINGS).unwrap_or_default());

        Ok(Self {
            auto_discover,
            pipeline,
            presets,
            only_presets,
            operation_settings,
        })
    }
}
