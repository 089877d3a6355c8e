//! Per-domain routing lookup with hot-swappable settings.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::RoutingSettings;
use crate::routing::document::RoutingConfig;

#[derive(Debug)]
struct Table {
    defaults: Vec<String>,
    domains: HashMap<String, Vec<String>>,
}

impl From<RoutingSettings> for Table {
    fn from(settings: RoutingSettings) -> Self {
        Self {
            defaults: settings.default_destinations,
            domains: settings
                .domains
                .into_iter()
                .map(|(domain, route)| (domain.to_ascii_lowercase(), route.destinations))
                .collect(),
        }
    }
}

/// Routing settings shared between request handlers and the config reloader.
#[derive(Debug, Clone)]
pub struct RouteTable {
    inner: Arc<ArcSwap<Table>>,
}

impl RouteTable {
    pub fn new(settings: RoutingSettings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(Table::from(settings))),
        }
    }

    /// Replace the settings; in-flight lookups finish on the old snapshot.
    pub fn replace(&self, settings: RoutingSettings) {
        let table = Table::from(settings);
        tracing::info!(
            default_destinations = table.defaults.len(),
            domain_overrides = table.domains.len(),
            "Routing settings updated"
        );
        self.inner.store(Arc::new(table));
    }

    /// Build the routing document for `domain`.
    pub fn config_for(&self, domain: &str) -> RoutingConfig {
        let table = self.inner.load();
        let destinations = table
            .domains
            .get(&domain.to_ascii_lowercase())
            .unwrap_or(&table.defaults);
        RoutingConfig::forward_all(destinations.iter().cloned())
    }
}
