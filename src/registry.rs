use crate::config::Config;
use crate::ops::{FlipOperation, Operation, ResizeOperation, RotateOperation};
use crate::settings::SettingsRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Factory producing an operation instance with its settings attached.
pub type OperationFactory = fn(&HashMap<String, String>) -> Result<Box<dyn Operation>, RegistryError>;

lazy_static::lazy_static! {
    /// Startup registration table: every operation the crate ships, in
    /// registration order. Automatic discovery instantiates all of these.
    static ref BUILTIN_OPERATIONS: Vec<(&'static str, OperationFactory)> = vec![
        ("resize", ResizeOperation::from_settings),
        ("rotate", RotateOperation::from_settings),
        ("flip", FlipOperation::from_settings),
    ];
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// An explicitly declared operation name could not be resolved. Fatal:
    /// a mis-declared operation would otherwise silently disappear from the
    /// pipeline.
    #[error("unknown operation type: {0}")]
    UnknownOperation(String),
    #[error("invalid setting {key} for operation {operation}: {message}")]
    InvalidSetting {
        operation: String,
        key: String,
        message: String,
    },
    /// An extension provider could not enumerate its operations. Recoverable:
    /// the registry falls back to the explicit strategy.
    #[error("operation provider {provider} failed: {message}")]
    ProviderFailed { provider: String, message: String },
}

/// Source of additional operations beyond the built-in table, e.g. an
/// optional module that may legitimately be unavailable.
pub trait OperationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn operations(&self, settings: &SettingsRegistry) -> Result<Vec<Box<dyn Operation>>, RegistryError>;
}

/// The ordered collection of available operation instances, each with its
/// settings already attached. Built once at startup, immutable afterwards.
pub struct OperationRegistry {
    operations: Vec<Arc<dyn Operation>>,
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field(
                "operations",
                &self.operations.iter().map(|op| op.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl OperationRegistry {
    /// Builds the registry using the strategy selected by the configuration,
    /// with no extension providers.
    pub fn build(config: &Config, settings: &SettingsRegistry) -> Result<Self, RegistryError> {
        Self::build_with_providers(config, settings, &[])
    }

    /// Builds the registry, consulting extension providers in automatic
    /// mode. A failing provider falls back transparently to the explicit
    /// strategy; an unresolvable explicit name is fatal.
    pub fn build_with_providers(
        config: &Config,
        settings: &SettingsRegistry,
        providers: &[Box<dyn OperationProvider>],
    ) -> Result<Self, RegistryError> {
        if config.auto_discover {
            match Self::build_automatic(settings, providers) {
                Ok(registry) => return Ok(registry),
                Err(err @ RegistryError::ProviderFailed { .. }) => {
                    warn!(error = %err, "automatic operation discovery failed, falling back to explicit list");
                }
                // Settings and factory errors are configuration problems, not
                // discovery problems; they abort startup.
                Err(err) => return Err(err),
            }
        }
        Self::build_explicit(&config.pipeline, settings)
    }

    fn build_automatic(
        settings: &SettingsRegistry,
        providers: &[Box<dyn OperationProvider>],
    ) -> Result<Self, RegistryError> {
        let mut operations: Vec<Arc<dyn Operation>> = Vec::new();
        for (name, factory) in BUILTIN_OPERATIONS.iter() {
            let operation = factory(settings.operation_settings(name))?;
            debug!(operation = *name, "registered built-in operation");
            operations.push(Arc::from(operation));
        }
        for provider in providers {
            let provided = provider.operations(settings)?;
            for operation in provided {
                debug!(operation = operation.name(), provider = provider.name(), "registered provided operation");
                operations.push(Arc::from(operation));
            }
        }
        info!(count = operations.len(), "operation registry built (automatic)");
        Ok(Self { operations })
    }

    fn build_explicit(pipeline: &[String], settings: &SettingsRegistry) -> Result<Self, RegistryError> {
        let mut operations: Vec<Arc<dyn Operation>> = Vec::new();
        for name in pipeline {
            let factory = BUILTIN_OPERATIONS
                .iter()
                .find(|(candidate, _)| candidate == name)
                .map(|(_, factory)| factory)
                .ok_or_else(|| RegistryError::UnknownOperation(name.clone()))?;
            operations.push(Arc::from(factory(settings.operation_settings(name))?));
        }
        info!(count = operations.len(), "operation registry built (explicit)");
        Ok(Self { operations })
    }

    /// Registered operations in registration order.
    pub fn operations(&self) -> &[Arc<dyn Operation>] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
