use serde::Deserialize;

use crate::error::{Result, RouteError};
use crate::search::SearchVariant;

/// Number of alternative paths produced when the caller does not say.
pub const DEFAULT_K: usize = 4;

/// Query settings for a [`Router`](crate::Router).
///
/// Every field has a default, so a TOML document may set any subset:
///
/// ```toml
/// variant = "dijkstra"
/// k = 3
/// collect_memory = false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Search used for single routes and for spur searches.
    pub variant: SearchVariant,
    /// Upper bound on alternative paths.
    pub k: usize,
    /// Sample resident memory before and after each query.
    pub collect_memory: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            variant: SearchVariant::AStar,
            k: DEFAULT_K,
            collect_memory: true,
        }
    }
}

impl RouterConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: RouterConfig =
            toml::from_str(s).map_err(|e| RouteError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(RouteError::Config("k must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RouterConfig::default();
        assert_eq!(cfg.variant, SearchVariant::AStar);
        assert_eq!(cfg.k, 4);
        assert!(cfg.collect_memory);
    }

    #[test]
    fn test_partial_toml() {
        let cfg = RouterConfig::from_toml_str("variant = \"dijkstra\"\nk = 2\n").unwrap();
        assert_eq!(cfg.variant, SearchVariant::Dijkstra);
        assert_eq!(cfg.k, 2);
        assert!(cfg.collect_memory);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RouterConfig::from_toml_str("").unwrap(), RouterConfig::default());
    }

    #[test]
    fn test_rejects_unknown_and_invalid() {
        assert!(matches!(
            RouterConfig::from_toml_str("speed = 3"),
            Err(RouteError::Config(_))
        ));
        assert!(matches!(
            RouterConfig::from_toml_str("variant = \"bfs\""),
            Err(RouteError::Config(_))
        ));
        assert!(matches!(
            RouterConfig::from_toml_str("k = 0"),
            Err(RouteError::Config(_))
        ));
    }
}
