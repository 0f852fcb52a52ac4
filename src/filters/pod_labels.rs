use super::{Advice, Filter, FilterError};
use crate::types::{Event, EventType, ResourceObject};

/// Recommends labelling pods that are created without any.
pub struct PodLabelChecker {
    description: String,
}

impl PodLabelChecker {
    pub fn new() -> Self {
        PodLabelChecker {
            description: "Checks and adds recommendations if labels are missing in the pod specs."
                .to_string(),
        }
    }
}

impl Default for PodLabelChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for PodLabelChecker {
    fn name(&self) -> &str {
        "PodLabelChecker"
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
        let unlabelled = pod.metadata.labels.as_ref().is_none_or(|l| l.is_empty());
        if unlabelled {
            advice.recommend(format!(
                "pod '{}' creation without labels should be avoided.",
                event.name
            ));
        }
        Ok(())
    }
}
