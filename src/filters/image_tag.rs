use super::{Advice, Filter, FilterError};
use crate::types::{Event, EventType, ResourceObject};
use k8s_openapi::api::core::v1::Container;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

// name[:tag][@digest]; a registry port is part of the name because a tag
// can't contain '/'. Tags are taken as written: the runtime, not us, decides
// whether an odd one resolves.
static IMAGE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^@]+?)(?::(?P<tag>[^:/@]+))?(?:@(?P<digest>[A-Za-z0-9+._-]+:[0-9A-Fa-f]+))?$")
        .expect("image reference pattern is valid")
});

/// Recommends against untagged or `:latest` container images on new pods.
pub struct ImageTagChecker {
    description: String,
}

impl ImageTagChecker {
    pub fn new() -> Self {
        ImageTagChecker {
            description: "Checks and adds recommendation if 'latest' image tag is used for container image."
                .to_string(),
        }
    }
}

impl Default for ImageTagChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `image` floats: no tag and no digest, or the tag `latest`.
/// `None` if `image` can't be parsed, e.g. a malformed digest.
pub fn uses_latest_tag(image: &str) -> Option<bool> {
    let caps = IMAGE_REFERENCE.captures(image)?;
    Some(match caps.name("tag") {
        Some(tag) => tag.as_str() == "latest",
        None => caps.name("digest").is_none(),
    })
}

/// Each container is judged on its own; an unparseable image only costs
/// that container a warning.
fn check_containers(containers: &[Container], label: &str, advice: &mut Advice) {
    for c in containers {
        let image = c.image.as_deref().unwrap_or_default();
        if image.is_empty() {
            continue;
        }
        match uses_latest_tag(image) {
            Some(true) => advice.recommend(format!(
                ":latest tag used in image '{}' of {} '{}' should be avoided.",
                image, label, c.name
            )),
            Some(false) => {}
            None => {
                warn!("Invalid image reference '{}' in {} '{}'", image, label, c.name);
                advice.warn(format!(
                    "image '{}' of {} '{}' is not a valid image reference.",
                    image, label, c.name
                ));
            }
        }
    }
}

impl Filter for ImageTagChecker {
    fn name(&self) -> &str {
        "ImageTagChecker"
    }

    fn describe(&self) -> &str {
        &self.description
    }

    fn run(
        &self,
        object: &ResourceObject,
        event: &Event,
        advice: &mut Advice,
    ) -> Result<(), FilterError> {
        if event.event_type != EventType::Create {
            return Ok(());
        }
        let ResourceObject::Pod(pod) = object else {
            return Ok(());
        };
        let Some(spec) = &pod.spec else {
            return Ok(());
        };

        if let Some(init_containers) = &spec.init_containers {
            check_containers(init_containers, "initContainer", advice);
        }
        check_containers(&spec.containers, "Container", advice);
        debug!("Image tag filter successful for pod {}", event.name);
        Ok(())
    }
}
