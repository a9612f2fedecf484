use std::collections::BTreeMap;
use std::fmt;

/// Equality-based label selector (`key=value,key2=value2`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .requirements
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_all_requirements() {
        let selector = LabelSelector::new().with("a", "1").with("b", "2");
        let mut labels = BTreeMap::new();
        labels.insert("a".to_string(), "1".to_string());
        assert!(!selector.matches(&labels));

        labels.insert("b".to_string(), "2".to_string());
        labels.insert("c".to_string(), "3".to_string());
        assert!(selector.matches(&labels));
    }

    #[test]
    fn test_selector_display() {
        let selector = LabelSelector::new()
            .with("application.kubesphere.io/builtin-app", "true")
            .with("a", "b");
        assert_eq!(
            selector.to_string(),
            "a=b,application.kubesphere.io/builtin-app=true"
        );
        assert_eq!(LabelSelector::new().to_string(), "");
    }
}
