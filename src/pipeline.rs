use crate::filters::FilterRegistry;
use crate::types::{Event, EventType, ResourceObject};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};

/// Delivery backend for enriched events and free-form messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_event(&self, event: &Event) -> anyhow::Result<()>;
    async fn send_message(&self, message: &str) -> anyhow::Result<()>;
}

/// Process-wide on/off switch for notifications, toggled from chat.
#[derive(Debug)]
pub struct NotifySwitch(AtomicBool);

impl NotifySwitch {
    pub fn new(enabled: bool) -> Self {
        NotifySwitch(AtomicBool::new(enabled))
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for NotifySwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

pub struct EventPipeline {
    filters: Arc<FilterRegistry>,
    notify: Arc<NotifySwitch>,
    notifier: Arc<dyn Notifier>,
    recommendations: bool,
}

impl EventPipeline {
    pub fn new(
        filters: Arc<FilterRegistry>,
        notify: Arc<NotifySwitch>,
        notifier: Arc<dyn Notifier>,
        recommendations: bool,
    ) -> Self {
        EventPipeline {
            filters,
            notify,
            notifier,
            recommendations,
        }
    }

    /// Enriches `event` and hands it to the notifier if notifications are on.
    /// Returns the enriched event.
    pub async fn process(&self, object: &ResourceObject, mut event: Event) -> Event {
        if self.recommendations {
            self.filters.run(object, &mut event).await;
        }

        if !self.notify.is_enabled() {
            debug!(
                "[{}] Notifications are off, dropping {} event for {}/{}",
                event.cluster, event.event_type, event.namespace, event.name
            );
            return event;
        }
        if let Err(e) = self.notifier.send_event(&event).await {
            error!("[{}] Failed to send event: {:#}", event.cluster, e);
        }
        event
    }
}

/// Writes a short summary of each event to stdout.
pub struct StdoutNotifier;

pub fn short_message(event: &Event) -> String {
    let subject = if event.namespace.is_empty() {
        event.name.clone()
    } else {
        format!("{}/{}", event.namespace, event.name)
    };
    let mut msg = match event.event_type {
        EventType::Create | EventType::Update | EventType::Delete => format!(
            "{} {} has been {}d in {} cluster",
            event.kind, subject, event.event_type, event.cluster
        ),
        EventType::Error => format!(
            "Error Occurred in {}: {} in {} cluster",
            event.kind, subject, event.cluster
        ),
        EventType::Warning => format!(
            "Warning {}: {} in {} cluster",
            event.kind, subject, event.cluster
        ),
        EventType::Info | EventType::Normal => format!(
            "{} Info: {} in {} cluster",
            event.kind, subject, event.cluster
        ),
    };
    if !event.reason.is_empty() {
        msg.push_str(&format!("\nReason: {}", event.reason));
    }
    if !event.action.is_empty() {
        msg.push_str(&format!("\nAction: {}", event.action));
    }
    for m in &event.messages {
        msg.push_str(&format!("\n{}", m));
    }
    if !event.recommendations.is_empty() {
        msg.push_str("\nRecommendations:");
        for r in &event.recommendations {
            msg.push_str(&format!("\n- {}", r));
        }
    }
    if !event.warnings.is_empty() {
        msg.push_str("\nWarnings:");
        for w in &event.warnings {
            msg.push_str(&format!("\n- {}", w));
        }
    }
    msg
}

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send_event(&self, event: &Event) -> anyhow::Result<()> {
        let channel = event
            .channel
            .as_deref()
            .map(|c| format!(" -> #{}", c))
            .unwrap_or_default();
        println!(
            "{} [{}] {}{}\n{}",
            event.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            event.level.as_str(),
            event.title,
            channel,
            short_message(event)
        );
        Ok(())
    }

    async fn send_message(&self, message: &str) -> anyhow::Result<()> {
        println!("{}", message);
        Ok(())
    }
}
