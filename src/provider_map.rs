use crate::{
    downcast_provider, ArrayProvider, Bindings, Collector, InjectError,
    InjectResult, Injector, Key, Provider, Svc,
};
use indexmap::IndexMap;
use tracing::debug;

/// The compiled resolution table of an injector. Each key has exactly one
/// provider: array keys are compiled into an [`ArrayProvider`] and
/// multibinding keys into the provider their collector creates.
pub(crate) struct ProviderMap {
    providers: IndexMap<Key, Svc<dyn Provider>>,
}

impl ProviderMap {
    pub fn compile(bindings: &Bindings) -> InjectResult<Self> {
        let injector_key = Key::of::<Injector>();
        let mut singular: IndexMap<Key, Svc<dyn Provider>> = IndexMap::new();
        let mut arrays: IndexMap<Key, Vec<Svc<dyn Provider>>> = IndexMap::new();
        let mut multi: IndexMap<Key, (Collector, Vec<Svc<dyn Provider>>)> =
            IndexMap::new();

        for binding in bindings.iter() {
            let key = binding.key();
            if *key == injector_key {
                return Err(InjectError::DuplicateKey { key: key.clone() });
            }

            if key.is_array() {
                let elements = arrays.entry(key.clone()).or_default();
                match downcast_provider::<ArrayProvider>(&**binding.provider()) {
                    Some(declared) => {
                        elements.extend(declared.elements().iter().cloned());
                    }
                    None => elements.push(binding.provider().clone()),
                }
                continue;
            }

            if let Some(collector) = binding.collector() {
                if singular.contains_key(key) {
                    return Err(InjectError::DuplicateKey { key: key.clone() });
                }

                multi
                    .entry(key.clone())
                    .or_insert_with(|| (collector, Vec::new()))
                    .1
                    .push(binding.provider().clone());
                continue;
            }

            if multi.contains_key(key) {
                return Err(InjectError::DuplicateKey { key: key.clone() });
            }

            match singular.get(key) {
                // The same binding reached through a shared collection
                Some(existing) if binding.same_provider(existing) => {}
                Some(_) => {
                    return Err(InjectError::DuplicateKey { key: key.clone() })
                }
                None => {
                    singular.insert(key.clone(), binding.provider().clone());
                }
            }
        }

        let mut providers = singular;
        for (key, elements) in arrays {
            let provider: Svc<dyn Provider> =
                Svc::new(ArrayProvider::new(elements));
            providers.insert(key, provider);
        }

        for (key, (collector, contributions)) in multi {
            let provider = collector(&key, contributions)?;
            providers.insert(key, provider);
        }

        debug!(providers = providers.len(), "compiled provider map");
        Ok(ProviderMap { providers })
    }

    pub fn get(&self, key: &Key) -> Option<&Svc<dyn Provider>> {
        self.providers.get(key)
    }

    pub fn providers(&self) -> impl Iterator<Item = &Svc<dyn Provider>> {
        self.providers.values()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.providers.keys()
    }
}
