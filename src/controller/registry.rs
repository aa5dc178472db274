//! # Runtime Registry
//!
//! Reverse lookup from a `WordpressRuntime` name to the sites that used it on
//! their last reconciliation. Populated by every reconciliation, read by the
//! runtime watch to fan out, cleared when a site is gone.

use crate::controller::identity::ObjectKey;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct RuntimeRegistry {
    sites: RwLock<HashMap<ObjectKey, String>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `site` references `runtime`; an empty name clears the entry
    pub fn record(&self, site: ObjectKey, runtime: &str) {
        let mut sites = self.sites.write().unwrap_or_else(PoisonError::into_inner);
        if runtime.is_empty() {
            sites.remove(&site);
        } else {
            sites.insert(site, runtime.to_string());
        }
    }

    pub fn remove(&self, site: &ObjectKey) {
        self.sites
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(site);
    }

    /// Sites referencing `runtime`, sorted
    pub fn sites_for(&self, runtime: &str) -> Vec<ObjectKey> {
        let sites = self.sites.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<ObjectKey> = sites
            .iter()
            .filter(|(_, name)| name.as_str() == runtime)
            .map(|(site, _)| site.clone())
            .collect();
        matching.sort();
        matching
    }

    pub fn len(&self) -> usize {
        self.sites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
