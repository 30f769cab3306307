use std::{collections::HashMap, sync::Arc};

use adrift_common::PlatformId;

use crate::{adapter::ChannelAdapter, error::Error};

/// Registry of running adapters, keyed by platform identifier.
///
/// Resolved once at startup; the dispatcher consults it by name, never by
/// runtime type inspection.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<PlatformId, Arc<dyn ChannelAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    #[must_use]
    pub fn get(&self, platform: PlatformId) -> Option<Arc<dyn ChannelAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    /// Like [`get`](Self::get) but with the dispatcher's error.
    pub fn resolve(&self, platform: PlatformId) -> Result<Arc<dyn ChannelAdapter>, Error> {
        self.get(platform).ok_or(Error::NoAdapter { platform })
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<PlatformId> {
        self.adapters.keys().copied().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlatformId, &Arc<dyn ChannelAdapter>)> {
        self.adapters.iter().map(|(p, a)| (*p, a))
    }
}
