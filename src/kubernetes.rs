use crate::config::Resource;
use crate::pipeline::EventPipeline;
use crate::types::{Event, EventType, ResourceObject};
use futures::{TryStreamExt, stream::StreamExt};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{Event as KubeEvent, Pod};
use kube::runtime::watcher::{Config as WatcherConfig, Event as WatchEvent, watcher};
use kube::{Api, Client, Resource as KubeResource, ResourceExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which events to forward for one watched resource, from its `resources`
/// entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceWatch {
    /// Empty means all namespaces.
    pub namespaces: Vec<String>,
    pub ignore: Vec<String>,
    pub events: Vec<EventType>,
}

impl ResourceWatch {
    pub fn from_resource(resource: &Resource) -> Self {
        let include = &resource.namespaces.include;
        let namespaces = if include.is_empty() || include.iter().any(|ns| ns == "all") {
            Vec::new()
        } else {
            include.clone()
        };
        ResourceWatch {
            namespaces,
            ignore: resource.namespaces.ignore.clone(),
            events: resource.events.clone(),
        }
    }

    pub fn wants(&self, namespace: &str, event_type: EventType) -> bool {
        self.events.contains(&event_type) && !self.ignore.iter().any(|ns| ns == namespace)
    }
}

/// One api per configured namespace, or a single cluster-wide one.
fn scoped_apis<K>(client: Client, watch: &ResourceWatch) -> Vec<(String, Api<K>)>
where
    K: KubeResource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    if watch.namespaces.is_empty() {
        vec![("all".to_string(), Api::all(client))]
    } else {
        watch
            .namespaces
            .iter()
            .map(|ns| (ns.clone(), Api::namespaced(client.clone(), ns)))
            .collect()
    }
}

/// Starts one pod watcher per configured namespace (or a single
/// cluster-wide one). Watchers run until the process exits.
pub fn spawn_pod_watchers(
    client: Client,
    cluster: String,
    watch: ResourceWatch,
    pipeline: Arc<EventPipeline>,
) {
    for (namespace, api) in scoped_apis::<Pod>(client, &watch) {
        let cluster = cluster.clone();
        let watch = watch.clone();
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            debug!("[{}] Starting pod watcher for namespace: {}", cluster, namespace);
            if let Err(err) = watch_pods(api, &cluster, &watch, &pipeline).await {
                warn!(
                    "[{}] Pod watcher for namespace {} stopped: {}",
                    cluster, namespace, err
                );
            }
        });
    }
}

/// Same as [`spawn_pod_watchers`] for core/v1 Events.
pub fn spawn_event_watchers(
    client: Client,
    cluster: String,
    watch: ResourceWatch,
    pipeline: Arc<EventPipeline>,
) {
    for (namespace, api) in scoped_apis::<KubeEvent>(client, &watch) {
        let cluster = cluster.clone();
        let watch = watch.clone();
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            debug!("[{}] Starting event watcher for namespace: {}", cluster, namespace);
            if let Err(err) = watch_events(api, &cluster, &watch, &pipeline).await {
                warn!(
                    "[{}] Event watcher for namespace {} stopped: {}",
                    cluster, namespace, err
                );
            }
        });
    }
}

async fn watch_pods(
    api: Api<Pod>,
    cluster: &str,
    watch: &ResourceWatch,
    pipeline: &EventPipeline,
) -> anyhow::Result<()> {
    // Pods seen so far; an apply for an unknown pod is a create.
    let mut known: HashSet<(String, String)> = HashSet::new();
    let mut stream = watcher(api, WatcherConfig::default()).boxed();

    while let Some(event) = stream.try_next().await? {
        match event {
            WatchEvent::Init => {
                info!("[{}] Initializing pod watcher", cluster);
                known.clear();
            }
            WatchEvent::InitApply(pod) => {
                known.insert(pod_key(&pod));
            }
            WatchEvent::InitDone => {
                info!(
                    "[{}] Pod watcher initialization complete, {} pods known",
                    cluster,
                    known.len()
                );
            }
            WatchEvent::Apply(pod) => {
                let event_type = if known.insert(pod_key(&pod)) {
                    EventType::Create
                } else {
                    EventType::Update
                };
                handle_pod_event(pod, event_type, cluster, watch, pipeline).await;
            }
            WatchEvent::Delete(pod) => {
                known.remove(&pod_key(&pod));
                handle_pod_event(pod, EventType::Delete, cluster, watch, pipeline).await;
            }
        }
    }
    Ok(())
}

fn pod_key(pod: &Pod) -> (String, String) {
    (pod.namespace().unwrap_or_default(), pod.name_any())
}

async fn handle_pod_event(
    pod: Pod,
    event_type: EventType,
    cluster: &str,
    watch: &ResourceWatch,
    pipeline: &EventPipeline,
) {
    let namespace = pod.namespace().unwrap_or_default();
    if !watch.wants(&namespace, event_type) {
        return;
    }
    debug!(
        "[{}] POD {}: {}/{}",
        cluster,
        event_type,
        namespace,
        pod.name_any()
    );
    let event = Event::from_pod(&pod, event_type, cluster);
    pipeline
        .process(&ResourceObject::Pod(Box::new(pod)), event)
        .await;
}

async fn watch_events(
    api: Api<KubeEvent>,
    cluster: &str,
    watch: &ResourceWatch,
    pipeline: &EventPipeline,
) -> anyhow::Result<()> {
    // Events listed at startup are history; only new ones are forwarded.
    let mut seen: HashSet<String> = HashSet::new();
    let mut stream = watcher(api, WatcherConfig::default()).boxed();

    while let Some(event) = stream.try_next().await? {
        match event {
            WatchEvent::Init => {
                info!("[{}] Initializing event watcher", cluster);
                seen.clear();
            }
            WatchEvent::InitApply(kube_event) => {
                seen.insert(event_key(&kube_event));
            }
            WatchEvent::InitDone => {
                info!("[{}] Event watcher initialization complete", cluster);
            }
            WatchEvent::Apply(kube_event) => {
                // Repeats bump the count on the same object
                if seen.insert(event_key(&kube_event)) {
                    handle_kube_event(&kube_event, cluster, watch, pipeline).await;
                }
            }
            WatchEvent::Delete(kube_event) => {
                seen.remove(&event_key(&kube_event));
            }
        }
    }
    Ok(())
}

fn event_key(kube_event: &KubeEvent) -> String {
    kube_event.uid().unwrap_or_else(|| kube_event.name_any())
}

async fn handle_kube_event(
    kube_event: &KubeEvent,
    cluster: &str,
    watch: &ResourceWatch,
    pipeline: &EventPipeline,
) {
    let Some(event) = Event::from_kube_event(kube_event, cluster) else {
        return;
    };
    if !watch.wants(&event.namespace, event.event_type) {
        return;
    }
    debug!(
        "[{}] EVENT {}: {} {}/{}",
        cluster, event.event_type, event.kind, event.namespace, event.name
    );
    let object = ResourceObject::Other {
        kind: event.kind.clone(),
    };
    pipeline.process(&object, event).await;
}
