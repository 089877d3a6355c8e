//! Registry of domains with an issuance in progress.

use std::sync::Arc;

use dashmap::DashMap;

/// Tracks which domains are currently being issued so concurrent requests
/// for the same domain do not race on one set of files.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    domains: Arc<DashMap<String, ()>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `domain`. Returns `None` if it is already claimed.
    pub fn try_acquire(&self, domain: &str) -> Option<InFlightGuard> {
        use dashmap::mapref::entry::Entry;

        match self.domains.entry(domain.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    domains: Arc::clone(&self.domains),
                    domain: domain.to_string(),
                })
            }
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Releases the claim on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    domains: Arc<DashMap<String, ()>>,
    domain: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.domains.remove(&self.domain);
    }
}
