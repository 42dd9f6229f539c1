use motorlink_common::config::{ClassifierPolicy, ScanConfig};

use super::{ObservedResponse, ProbeOutcome, ProbeResult};

/// Decides whether a probe outcome plausibly came from a motor controller.
///
/// A response qualifies when its body mentions one of the configured
/// keywords. Under [`ClassifierPolicy::Permissive`] any JSON response also
/// qualifies, which trades precision for recall.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<String>,
    policy: ClassifierPolicy,
}

impl Classifier {
    pub fn new<I, S>(keywords: I, policy: ClassifierPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self { keywords, policy }
    }

    pub fn from_config(cfg: &ScanConfig) -> Self {
        Self::new(&cfg.keywords, cfg.policy)
    }

    pub fn classify(&self, outcome: &ProbeOutcome) -> bool {
        match &outcome.result {
            ProbeResult::Observed(response) => self.qualifies(response),
            ProbeResult::Failed(_) => false,
        }
    }

    fn qualifies(&self, response: &ObservedResponse) -> bool {
        if !response.is_success() || response.body.is_empty() {
            return false;
        }

        if self.matches_keyword(response) {
            return true;
        }

        match self.policy {
            ClassifierPolicy::Permissive => is_structured(response),
            ClassifierPolicy::KeywordOnly => false,
        }
    }

    fn matches_keyword(&self, response: &ObservedResponse) -> bool {
        let text = response.body.search_text();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

fn is_structured(response: &ObservedResponse) -> bool {
    let declared_json = response
        .content_type()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

    declared_json || response.body.is_structured()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
