use serde::{Deserialize, Serialize};

/// What [`Router`](crate::Router) does when a navigation resolves to the
/// location it is already at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNavigation {
    /// Leave the current location and listeners alone.
    #[default]
    Ignore,
    /// Fail with [`NavigationError::DuplicateNavigation`](crate::NavigationError::DuplicateNavigation).
    Error,
}

/// How a URL is resolved against the route table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// The first route in table order that matches wins.
    #[default]
    FirstMatch,
    /// Routes are tried from most to least specific, see
    /// [`Pattern::rank`](crate::Pattern::rank). Equal ranks keep table order.
    Ranked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RouterConfig {
    pub on_duplicate_navigation: DuplicateNavigation,
    pub match_strategy: MatchStrategy,
}

impl RouterConfig {
    pub fn on_duplicate_navigation(mut self, policy: DuplicateNavigation) -> Self {
        self.on_duplicate_navigation = policy;
        self
    }

    pub fn match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.match_strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_ignore_duplicates_and_match_first() {
        let config = RouterConfig::default();
        assert_eq!(config.on_duplicate_navigation, DuplicateNavigation::Ignore);
        assert_eq!(config.match_strategy, MatchStrategy::FirstMatch);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: RouterConfig = serde_json::from_str(r#"{"match_strategy":"ranked"}"#).unwrap();
        assert_eq!(
            config,
            RouterConfig::default().match_strategy(MatchStrategy::Ranked)
        );
    }

    #[test]
    fn loads_from_toml() {
        let config: RouterConfig = toml::from_str(
            r#"
            on_duplicate_navigation = "error"
            match_strategy = "first_match"
            "#,
        )
        .unwrap();

        assert_eq!(config.on_duplicate_navigation, DuplicateNavigation::Error);
        assert_eq!(config.match_strategy, MatchStrategy::FirstMatch);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = serde_json::from_str::<RouterConfig>(r#"{"on_duplicate_navigation":"panic"}"#);
        assert!(result.is_err());
    }
}
