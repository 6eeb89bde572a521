use crate::{DynSvc, InjectResult, Injector, Key, Provider};

/// A provider that resolves another key on the same injector. Linking keys
/// aliases them: both resolve to the same value whenever the target key's
/// provider returns the same value.
pub struct LinkProvider {
    key: Key,
}

impl LinkProvider {
    /// Creates a provider that resolves `key`.
    #[must_use]
    pub fn new(key: Key) -> Self {
        LinkProvider { key }
    }

    /// The key this provider resolves.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }
}

impl Provider for LinkProvider {
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        injector.provide(&self.key)
    }
}
