use k8s_openapi::api::core::v1::{Event as KubeEvent, Pod};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Create,
    Update,
    Delete,
    Error,
    Warning,
    Info,
    Normal,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Update => "update",
            EventType::Delete => "delete",
            EventType::Error => "error",
            EventType::Warning => "warning",
            EventType::Info => "info",
            EventType::Normal => "normal",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl From<EventType> for Level {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Error => Level::Error,
            EventType::Warning => Level::Warn,
            _ => Level::Info,
        }
    }
}

/// A cluster lifecycle occurrence on its way to the notifier.
///
/// `recommendations` and `warnings` are filled in by the filter pipeline and
/// only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    pub event_type: EventType,
    pub name: String,
    pub namespace: String,
    pub cluster: String,
    /// Overrides the notifier's default channel when set.
    pub channel: Option<String>,
    pub title: String,
    pub reason: String,
    pub action: String,
    pub messages: Vec<String>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: Level,
}

impl Event {
    pub fn new(
        kind: impl Into<String>,
        event_type: EventType,
        name: impl Into<String>,
        namespace: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        let kind = kind.into();
        let title = match event_type {
            EventType::Create | EventType::Update | EventType::Delete => {
                format!("{} {}d", kind, event_type)
            }
            _ => format!("{} {}", kind, event_type),
        };
        Event {
            kind,
            event_type,
            name: name.into(),
            namespace: namespace.into(),
            cluster: cluster.into(),
            channel: None,
            title,
            reason: String::new(),
            action: String::new(),
            messages: Vec::new(),
            recommendations: Vec::new(),
            warnings: Vec::new(),
            timestamp: chrono::Utc::now(),
            level: Level::from(event_type),
        }
    }

    pub fn from_pod(pod: &Pod, event_type: EventType, cluster: &str) -> Self {
        let mut event = Event::new(
            "Pod",
            event_type,
            pod.name_any(),
            pod.namespace().unwrap_or_default(),
            cluster,
        );
        if let Some(reason) = pod.status.as_ref().and_then(|s| s.reason.as_ref()) {
            event.reason = reason.clone();
        }
        if let Some(message) = pod.status.as_ref().and_then(|s| s.message.as_ref()) {
            event.messages.push(message.clone());
        }
        event
    }

    /// Event for a core/v1 Event, about the object it involves. Only
    /// `Warning` and `Normal` events are understood.
    pub fn from_kube_event(kube_event: &KubeEvent, cluster: &str) -> Option<Self> {
        let event_type = match kube_event.type_.as_deref()? {
            "Warning" => EventType::Warning,
            "Normal" => EventType::Normal,
            _ => return None,
        };
        let involved = &kube_event.involved_object;
        let mut event = Event::new(
            involved.kind.clone().unwrap_or_default(),
            event_type,
            involved.name.clone().unwrap_or_default(),
            involved.namespace.clone().unwrap_or_default(),
            cluster,
        );
        if let Some(reason) = &kube_event.reason {
            event.reason = reason.clone();
        }
        if let Some(message) = &kube_event.message {
            event.messages.push(message.clone());
        }
        Some(event)
    }
}

/// The object an event was raised for, tagged by the kinds filters know how
/// to inspect.
#[derive(Debug, Clone)]
pub enum ResourceObject {
    Pod(Box<Pod>),
    /// A kind no filter inspects; only its kind is kept.
    Other { kind: String },
}

impl ResourceObject {
    pub fn kind(&self) -> &str {
        match self {
            ResourceObject::Pod(_) => "Pod",
            ResourceObject::Other { kind } => kind,
        }
    }
}
