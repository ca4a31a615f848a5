//! Directive parsing and operation ordering.
//!
//! Each registered operation runs its matcher over the expanded directive;
//! every matched substring is concatenated (in occurrence order) into one
//! fragment handed to that operation's parameter parser. An operation's
//! order is the index of its first matched character in the directive, with
//! [`MAX_ORDER`](crate::constants::MAX_ORDER) marking "not present". Matched
//! operations are stable-sorted by that index, so registration order breaks
//! ties and two operations may declare overlapping syntax as long as their
//! matchers are disjoint.

use crate::constants::MAX_ORDER;
use crate::ops::{OpParams, Operation};
use crate::registry::OperationRegistry;
use crate::settings::SettingsRegistry;
use crate::surface::{DrawBackend, Surface};
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

lazy_static::lazy_static! {
    static ref PRESET_REF: Regex = Regex::new(r"preset=([A-Za-z0-9_-]+)").unwrap();
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
    #[error("only preset references are allowed, found: {0}")]
    OptionsNotAllowed(String),
}

/// One planned pipeline step: the operation, its request-local parameters,
/// and the position of its first token in the expanded directive.
pub struct PlannedStep {
    pub operation: Arc<dyn Operation>,
    pub params: OpParams,
    pub fragment: String,
    pub first_index: usize,
}

impl std::fmt::Debug for PlannedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedStep")
            .field("operation", &self.operation.name())
            .field("params", &self.params)
            .field("fragment", &self.fragment)
            .field("first_index", &self.first_index)
            .finish()
    }
}

/// An ordered, ready-to-run sequence of operations for one directive.
pub struct Pipeline {
    steps: Vec<PlannedStep>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.steps).finish()
    }
}

impl Pipeline {
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Applies every step in order, each receiving the previous step's
    /// output. Operations that resolve to no-ops return their input.
    pub fn execute(&self, mut surface: Surface, backend: &dyn DrawBackend) -> Surface {
        for step in &self.steps {
            debug!(operation = step.operation.name(), "applying pipeline step");
            surface = step.operation.apply(surface, &step.params, backend);
        }
        surface
    }
}

/// Expands preset references in a directive.
///
/// The `default` preset, when configured, is prepended so explicit tokens
/// can override it by appearing later. Each `preset=<name>` token is
/// replaced with the preset's resolved fragment; unknown names are an
/// error. In `only_presets` mode any non-preset token recognized by a
/// registered operation is rejected.
fn expand_presets(
    directive: &str,
    registry: &OperationRegistry,
    settings: &SettingsRegistry,
    only_presets: bool,
) -> Result<String, PlanError> {
    let mut unknown: Option<String> = None;
    let substituted = PRESET_REF.replace_all(directive, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match settings.preset(name) {
            Some(fragment) => fragment,
            None => {
                if unknown.is_none() {
                    unknown = Some(name.to_string());
                }
                String::new()
            }
        }
    });
    if let Some(name) = unknown {
        return Err(PlanError::UnknownPreset(name));
    }

    if only_presets {
        // Tokens surviving outside any preset expansion are not allowed.
        let residue = PRESET_REF.replace_all(directive, "");
        for operation in registry.operations() {
            if let Some(found) = operation.matcher().find(&residue) {
                return Err(PlanError::OptionsNotAllowed(found.as_str().to_string()));
            }
        }
    }

    let mut expanded = String::new();
    if let Some(default) = settings.preset("default") {
        expanded.push_str(&default);
    }
    expanded.push_str(&substituted);
    Ok(expanded)
}

/// Plans the pipeline for a directive: preset expansion, per-operation
/// matching and fragment merging, then ordering by first occurrence.
pub fn plan(
    directive: &str,
    registry: &OperationRegistry,
    settings: &SettingsRegistry,
    only_presets: bool,
) -> Result<Pipeline, PlanError> {
    let expanded = expand_presets(directive, registry, settings, only_presets)?;
    debug!(directive, expanded = expanded.as_str(), "planning pipeline");

    let mut steps: Vec<PlannedStep> = Vec::new();
    for operation in registry.operations() {
        let mut first_index = MAX_ORDER;
        let mut fragment = String::new();
        for found in operation.matcher().find_iter(&expanded) {
            if first_index == MAX_ORDER {
                first_index = found.start();
            }
            fragment.push_str(found.as_str());
        }
        if first_index == MAX_ORDER {
            continue;
        }
        let params = operation.parse(&fragment);
        debug!(
            operation = operation.name(),
            first_index,
            fragment = fragment.as_str(),
            "operation matched"
        );
        steps.push(PlannedStep {
            operation: Arc::clone(operation),
            params,
            fragment,
            first_index,
        });
    }

    // Stable: equal indices keep registration order.
    steps.sort_by_key(|step| step.first_index);

    Ok(Pipeline { steps })
}
