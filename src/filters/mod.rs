//! Pluggable event filters and the registry that runs them.
//!
//! Filters inspect the object an event was raised for and attach advisory
//! text to it. They must be fast and non-blocking: the pipeline runs them
//! inline on the event path.

pub mod image_tag;
pub mod pod_labels;

pub use image_tag::ImageTagChecker;
pub use pod_labels::PodLabelChecker;

use crate::types::{Event, ResourceObject};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
#[error("filter '{filter}' failed: {reason}")]
pub struct FilterError {
    pub filter: String,
    pub reason: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Filter '{0}' not found. Run 'filters list' to see the available filters.")]
    NotFound(String),
}

/// Advisory text produced by one filter run. Filters can only add to it.
#[derive(Debug, Default)]
pub struct Advice {
    recommendations: Vec<String>,
    warnings: Vec<String>,
}

impl Advice {
    pub fn recommend(&mut self, text: impl Into<String>) {
        self.recommendations.push(text.into());
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.warnings.push(text.into());
    }

    pub(crate) fn apply_to(self, event: &mut Event) {
        event.recommendations.extend(self.recommendations);
        event.warnings.extend(self.warnings);
    }
}

pub trait Filter: Send + Sync {
    /// Registry key; unique across registered filters.
    fn name(&self) -> &str;

    fn describe(&self) -> &str;

    /// Inspect `object` and record advice for `event`. Filters are no-ops
    /// for object kinds they don't handle.
    fn run(
        &self,
        object: &ResourceObject,
        event: &Event,
        advice: &mut Advice,
    ) -> Result<(), FilterError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStatus {
    pub name: String,
    pub enabled: bool,
    pub description: String,
}

struct Entry {
    filter: Arc<dyn Filter>,
    enabled: bool,
}

/// Registered filters in registration order, each with an enabled flag.
///
/// Shared between the event path and the chat command path; clone the
/// surrounding `Arc` rather than the registry.
#[derive(Default)]
pub struct FilterRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in filters.
    pub async fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(ImageTagChecker::new())).await;
        registry.register(Arc::new(PodLabelChecker::new())).await;
        registry
    }

    /// Adds `filter`, enabled. A filter with the same name is replaced in
    /// place and re-enabled.
    pub async fn register(&self, filter: Arc<dyn Filter>) {
        let mut entries = self.entries.write().await;
        debug!("Registering filter {}", filter.name());
        match entries.iter_mut().find(|e| e.filter.name() == filter.name()) {
            Some(entry) => {
                entry.filter = filter;
                entry.enabled = true;
            }
            None => entries.push(Entry {
                filter,
                enabled: true,
            }),
        }
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.filter.name() == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        entry.enabled = enabled;
        Ok(())
    }

    /// Every registered filter, sorted by name.
    pub async fn list(&self) -> Vec<FilterStatus> {
        let entries = self.entries.read().await;
        let mut statuses: Vec<FilterStatus> = entries
            .iter()
            .map(|e| FilterStatus {
                name: e.filter.name().to_string(),
                enabled: e.enabled,
                description: e.filter.describe().to_string(),
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    async fn enabled_filters(&self) -> Vec<Arc<dyn Filter>> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.filter.clone())
            .collect()
    }

    /// Runs every enabled filter in registration order against `event`.
    ///
    /// The lock is only held while taking a snapshot of the enabled filters.
    /// A filter that errors or panics contributes nothing; the rest still run.
    pub async fn run(&self, object: &ResourceObject, event: &mut Event) {
        let filters = self.enabled_filters().await;
        debug!(
            "[{}] Running {} filters on {} {}/{}",
            event.cluster,
            filters.len(),
            object.kind(),
            event.namespace,
            event.name
        );
        for filter in filters {
            let mut advice = Advice::default();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                filter.run(object, &*event, &mut advice)
            }));
            match outcome {
                Ok(Ok(())) => advice.apply_to(event),
                Ok(Err(e)) => warn!("[{}] {}", event.cluster, e),
                Err(payload) => {
                    let e = FilterError {
                        filter: filter.name().to_string(),
                        reason: format!("panicked: {}", panic_message(&*payload)),
                    };
                    error!(
                        "[{}] {} on {} {}/{}, skipping it",
                        event.cluster, e, event.kind, event.namespace, event.name
                    );
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
