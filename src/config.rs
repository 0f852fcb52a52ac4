use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::EventType;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_KUBECTL_BINARY: &str = "/usr/local/bin/kubectl";
const DEFAULT_KUBECTL_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resources: Vec<Resource>,
    pub recommendations: Recommendations,
    pub communications: Communications,
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub name: String,
    pub namespaces: Namespaces,
    pub events: Vec<EventType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespaces {
    pub include: Vec<String>,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recommendations(pub bool);

impl Default for Recommendations {
    fn default() -> Self {
        Recommendations(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Communications {
    pub slack: Slack,
    pub mattermost: Mattermost,
    pub webhook: Webhook,
    pub elasticsearch: ElasticSearch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifType {
    #[default]
    Short,
    Long,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slack {
    pub enabled: bool,
    pub channel: String,
    #[serde(rename = "notiftype")]
    pub notif_type: NotifType,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mattermost {
    pub enabled: bool,
    pub url: String,
    pub token: String,
    pub team: String,
    pub channel: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Webhook {
    pub enabled: bool,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticSearch {
    pub enabled: bool,
    pub server: String,
    pub username: String,
    pub password: String,
    pub index: Index,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Index {
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    pub shards: u32,
    pub replicas: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "clustername")]
    pub cluster_name: String,
    #[serde(rename = "allowkubectl")]
    pub allow_kubectl: bool,
    pub kubectl: Kubectl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kubectl {
    pub binary: PathBuf,
    #[serde(rename = "timeoutseconds")]
    pub timeout_seconds: u64,
    #[serde(rename = "defaultnamespace")]
    pub default_namespace: String,
}

impl Default for Kubectl {
    fn default() -> Self {
        Kubectl {
            binary: PathBuf::from(DEFAULT_KUBECTL_BINARY),
            timeout_seconds: DEFAULT_KUBECTL_TIMEOUT_SECONDS,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&yaml)
    }

    /// Copy of the configuration with every credential field blanked,
    /// whether or not it was set.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.communications.slack.token = String::new();
        config.communications.mattermost.token = String::new();
        config.communications.elasticsearch.password = String::new();
        config
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }

    /// Whether messages from `channel` get explicit command feedback.
    pub fn is_auth_channel(&self, channel: &str) -> bool {
        !channel.is_empty()
            && (self.communications.slack.channel == channel
                || self.communications.mattermost.channel == channel)
    }

    /// The `resources` entry for `name` (`v1/pods`, `v1/events`), if one is
    /// configured.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Location of the config file: `--config` if given, otherwise
/// `$CONFIG_PATH/config.yaml`.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let dir = std::env::var("CONFIG_PATH").unwrap_or_else(|_| ".".to_string());
    Path::new(&dir).join(CONFIG_FILE_NAME)
}
