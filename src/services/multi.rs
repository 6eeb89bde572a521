use crate::{
    downcast_provider, Binding, ConstantProvider, DynSvc, FnProvider,
    InjectError, InjectResult, Injector, Key, LinkProvider, Provider, Service,
    ServiceFactory, Svc, Tag, TypedProvider,
};
use indexmap::{IndexMap, IndexSet};
use std::{fmt::Debug, hash::Hash, marker::PhantomData};
use tracing::debug;

/// Merges every contribution to a multibinding key into the provider of the
/// collection.
pub(crate) type Collector =
    fn(&Key, Vec<Svc<dyn Provider>>) -> InjectResult<Svc<dyn Provider>>;

/// Provides a set of services contributed by any number of bindings. Equal
/// elements are only kept once, and the set iterates in declaration order.
pub struct SetProvider<T> {
    elements: Vec<Svc<dyn Provider>>,
    marker: PhantomData<fn() -> T>,
}

impl<T> SetProvider<T>
where
    T: Service + Eq + Hash,
{
    fn new(elements: Vec<Svc<dyn Provider>>) -> Self {
        SetProvider {
            elements,
            marker: PhantomData,
        }
    }

    fn collect(
        _key: &Key,
        contributions: Vec<Svc<dyn Provider>>,
    ) -> InjectResult<Svc<dyn Provider>> {
        let mut elements = Vec::with_capacity(contributions.len());
        for contribution in contributions {
            match downcast_provider::<SetProvider<T>>(&*contribution) {
                Some(declared) => elements.extend(declared.elements.iter().cloned()),
                None => elements.push(contribution),
            }
        }

        let provider: Svc<dyn Provider> = Svc::new(SetProvider::<T>::new(elements));
        Ok(provider)
    }
}

impl<T> TypedProvider for SetProvider<T>
where
    T: Service + Eq + Hash,
{
    type Result = IndexSet<Svc<T>>;

    fn provide_typed(
        &self,
        injector: &Injector,
    ) -> InjectResult<Svc<Self::Result>> {
        let mut set = IndexSet::with_capacity(self.elements.len());
        for element in &self.elements {
            set.insert(downcast_element::<T>(element.provide(injector)?)?);
        }

        Ok(Svc::new(set))
    }
}

/// Declares contributions to a set multibinding. The set is requested as
/// `Svc<IndexSet<Svc<T>>>`.
///
/// ```
/// use indexmap::IndexSet;
/// use keyed_injector::{Injector, SetBinder, Svc};
///
/// let plugins = SetBinder::<&'static str>::new();
///
/// let mut builder = Injector::builder();
/// builder.bind(plugins.to_const("auth")).unwrap();
/// builder.bind(plugins.to_const("metrics")).unwrap();
/// builder.bind(plugins.to_const("auth")).unwrap();
///
/// let injector = builder.build().unwrap();
/// let plugins: Svc<IndexSet<Svc<&'static str>>> = injector.get().unwrap();
/// let names: Vec<&str> = plugins.iter().map(|name| **name).collect();
/// assert_eq!(vec!["auth", "metrics"], names);
/// ```
pub struct SetBinder<T> {
    key: Key,
    marker: PhantomData<fn() -> T>,
}

impl<T> SetBinder<T>
where
    T: Service + Eq + Hash,
{
    /// Creates a binder for the untagged set of `T`.
    #[must_use]
    pub fn new() -> Self {
        SetBinder {
            key: Key::of::<IndexSet<Svc<T>>>(),
            marker: PhantomData,
        }
    }

    /// Uses a tagged set of `T` instead.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.key = self.key.with_tag(tag);
        self
    }

    /// The key of the set.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Declares the set, so that it resolves to an empty set when nothing
    /// contributes to it.
    #[must_use]
    pub fn empty(&self) -> Binding {
        self.contribute(SetProvider::<T>::new(Vec::new()))
    }

    /// Contributes a constant element.
    #[must_use]
    pub fn to_const(&self, value: T) -> Binding {
        self.contribute(ConstantProvider::new(value))
    }

    /// Contributes an element created by a service factory.
    #[must_use]
    pub fn to_fn<D, F>(&self, factory: F) -> Binding
    where
        D: 'static,
        F: ServiceFactory<D, Result = T>,
    {
        self.contribute(FnProvider::new(factory))
    }

    /// Contributes the value bound to another key.
    pub fn to_key(&self, key: Key) -> InjectResult<Binding> {
        check_link::<T>(&key)?;
        Ok(self.contribute(LinkProvider::new(key)))
    }

    /// Contributes an element created by a custom provider.
    #[must_use]
    pub fn to_provider<P>(&self, provider: P) -> Binding
    where
        P: TypedProvider<Result = T>,
    {
        self.contribute(provider)
    }

    fn contribute<P: Provider>(&self, provider: P) -> Binding {
        Binding::contribution(
            self.key.clone(),
            Svc::new(provider),
            SetProvider::<T>::collect,
        )
    }
}

impl<T> Default for SetBinder<T>
where
    T: Service + Eq + Hash,
{
    fn default() -> Self {
        SetBinder::new()
    }
}

/// A single contribution to a map multibinding.
pub struct MapEntryProvider<K, V> {
    entry: K,
    value: Svc<dyn Provider>,
    marker: PhantomData<fn() -> V>,
}

impl<K, V> Provider for MapEntryProvider<K, V>
where
    K: Service,
    V: Service,
{
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        self.value.provide(injector)
    }
}

/// Provides a map of services contributed by any number of bindings, in
/// declaration order.
pub struct MapProvider<K, V> {
    entries: IndexMap<K, Svc<dyn Provider>>,
    marker: PhantomData<fn() -> V>,
}

impl<K, V> MapProvider<K, V>
where
    K: Service + Eq + Hash + Clone + Debug,
    V: Service,
{
    fn new(entries: IndexMap<K, Svc<dyn Provider>>) -> Self {
        MapProvider {
            entries,
            marker: PhantomData,
        }
    }

    fn collect(
        key: &Key,
        contributions: Vec<Svc<dyn Provider>>,
    ) -> InjectResult<Svc<dyn Provider>> {
        let mut entries = IndexMap::with_capacity(contributions.len());
        let mut insert = |entry: &K, value: &Svc<dyn Provider>| {
            if entries.insert(entry.clone(), value.clone()).is_some() {
                debug!(%key, ?entry, "map entry bound more than once");
                return Err(InjectError::DuplicateKey { key: key.clone() });
            }

            Ok(())
        };

        for contribution in &contributions {
            if let Some(declared) =
                downcast_provider::<MapProvider<K, V>>(&**contribution)
            {
                for (entry, value) in &declared.entries {
                    insert(entry, value)?;
                }
            } else if let Some(contributed) =
                downcast_provider::<MapEntryProvider<K, V>>(&**contribution)
            {
                insert(&contributed.entry, &contributed.value)?;
            } else {
                return Err(InjectError::InternalError(format!(
                    "{} received a contribution that is not a map entry",
                    key
                )));
            }
        }

        let provider: Svc<dyn Provider> =
            Svc::new(MapProvider::<K, V>::new(entries));
        Ok(provider)
    }
}

impl<K, V> TypedProvider for MapProvider<K, V>
where
    K: Service + Eq + Hash + Clone + Debug,
    V: Service,
{
    type Result = IndexMap<K, Svc<V>>;

    fn provide_typed(
        &self,
        injector: &Injector,
    ) -> InjectResult<Svc<Self::Result>> {
        let mut map = IndexMap::with_capacity(self.entries.len());
        for (entry, value) in &self.entries {
            let value = downcast_element::<V>(value.provide(injector)?)?;
            map.insert(entry.clone(), value);
        }

        Ok(Svc::new(map))
    }
}

/// Declares contributions to a map multibinding. The map is requested as
/// `Svc<IndexMap<K, Svc<V>>>`. Each map key may only be contributed once.
///
/// ```
/// use indexmap::IndexMap;
/// use keyed_injector::{Injector, MapBinder, Svc};
///
/// let handlers = MapBinder::<&'static str, u16>::new();
///
/// let mut builder = Injector::builder();
/// builder.bind(handlers.to_const("http", 80)).unwrap();
/// builder.bind(handlers.to_fn("https", || 443u16)).unwrap();
///
/// let injector = builder.build().unwrap();
/// let ports: Svc<IndexMap<&'static str, Svc<u16>>> = injector.get().unwrap();
/// assert_eq!(443, *ports["https"]);
/// ```
pub struct MapBinder<K, V> {
    key: Key,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MapBinder<K, V>
where
    K: Service + Eq + Hash + Clone + Debug,
    V: Service,
{
    /// Creates a binder for the untagged map from `K` to `V`.
    #[must_use]
    pub fn new() -> Self {
        MapBinder {
            key: Key::of::<IndexMap<K, Svc<V>>>(),
            marker: PhantomData,
        }
    }

    /// Uses a tagged map instead.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.key = self.key.with_tag(tag);
        self
    }

    /// The key of the map.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Declares the map, so that it resolves to an empty map when nothing
    /// contributes to it.
    #[must_use]
    pub fn empty(&self) -> Binding {
        let provider: Svc<dyn Provider> =
            Svc::new(MapProvider::<K, V>::new(IndexMap::new()));
        Binding::contribution(self.key.clone(), provider, MapProvider::<K, V>::collect)
    }

    /// Contributes a constant value for a map key.
    #[must_use]
    pub fn to_const(&self, entry: K, value: V) -> Binding {
        self.contribute(entry, Svc::new(ConstantProvider::new(value)))
    }

    /// Contributes a value created by a service factory for a map key.
    #[must_use]
    pub fn to_fn<D, F>(&self, entry: K, factory: F) -> Binding
    where
        D: 'static,
        F: ServiceFactory<D, Result = V>,
    {
        self.contribute(entry, Svc::new(FnProvider::new(factory)))
    }

    /// Contributes the value bound to another key for a map key.
    pub fn to_key(&self, entry: K, key: Key) -> InjectResult<Binding> {
        check_link::<V>(&key)?;
        Ok(self.contribute(entry, Svc::new(LinkProvider::new(key))))
    }

    /// Contributes a value created by a custom provider for a map key.
    #[must_use]
    pub fn to_provider<P>(&self, entry: K, provider: P) -> Binding
    where
        P: TypedProvider<Result = V>,
    {
        self.contribute(entry, Svc::new(provider))
    }

    fn contribute(&self, entry: K, value: Svc<dyn Provider>) -> Binding {
        let provider = MapEntryProvider::<K, V> {
            entry,
            value,
            marker: PhantomData,
        };
        Binding::contribution(
            self.key.clone(),
            Svc::new(provider),
            MapProvider::<K, V>::collect,
        )
    }
}

impl<K, V> Default for MapBinder<K, V>
where
    K: Service + Eq + Hash + Clone + Debug,
    V: Service,
{
    fn default() -> Self {
        MapBinder::new()
    }
}

fn downcast_element<T: Service>(value: DynSvc) -> InjectResult<Svc<T>> {
    value.downcast().map_err(|_| InjectError::TypeMismatch {
        key: Key::of::<T>(),
    })
}

fn check_link<T: Service>(key: &Key) -> InjectResult<()> {
    if key.is_array() || key.service_info() != Key::of::<T>().service_info() {
        return Err(InjectError::InvalidBinding {
            reason: format!(
                "{} cannot be linked as an element of type {}",
                key,
                std::any::type_name::<T>()
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bind_const, Bindings};

    #[test]
    fn set_removes_duplicates() {
        let set = SetBinder::<i32>::new();
        let mut builder = Injector::builder();
        builder.bind(set.to_const(1)).unwrap();
        builder.bind(set.to_const(2)).unwrap();
        builder.bind(set.to_const(1)).unwrap();

        let injector = builder.build().unwrap();
        let values: Svc<IndexSet<Svc<i32>>> = injector.get().unwrap();
        let values: Vec<i32> = values.iter().map(|value| **value).collect();
        assert_eq!(vec![1, 2], values);
    }

    #[test]
    fn empty_set_can_be_declared() {
        let set = SetBinder::<i32>::new().tag("empty");
        let mut builder = Injector::builder();
        builder.bind(set.empty()).unwrap();

        let injector = builder.build().unwrap();
        let values = injector.provide(set.key()).unwrap();
        let values: Svc<IndexSet<Svc<i32>>> = values.downcast().unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn set_element_can_link_key() {
        let set = SetBinder::<i32>::new();
        let mut builder = Injector::builder();
        builder.bind(bind_const(5i32)).unwrap();
        builder.bind(set.to_key(Key::of::<i32>()).unwrap()).unwrap();
        builder.bind(set.to_fn(|| 6i32)).unwrap();

        let injector = builder.build().unwrap();
        let values: Svc<IndexSet<Svc<i32>>> = injector.get().unwrap();
        assert_eq!(2, values.len());
    }

    #[test]
    fn set_rejects_link_of_wrong_type() {
        let set = SetBinder::<i32>::new();
        match set.to_key(Key::of::<u8>()) {
            Err(InjectError::InvalidBinding { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("link should have been rejected"),
        }
    }

    #[test]
    fn map_collects_entries_in_order() {
        let map = MapBinder::<&'static str, i32>::new();
        let mut builder = Injector::builder();
        builder.bind(map.to_const("b", 2)).unwrap();
        builder.bind(map.empty()).unwrap();
        builder.bind(map.to_const("a", 1)).unwrap();

        let injector = builder.build().unwrap();
        let values: Svc<IndexMap<&'static str, Svc<i32>>> =
            injector.get().unwrap();
        let entries: Vec<(&str, i32)> = values
            .iter()
            .map(|(entry, value)| (*entry, **value))
            .collect();
        assert_eq!(vec![("b", 2), ("a", 1)], entries);
    }

    #[test]
    fn map_rejects_duplicate_entries() {
        let map = MapBinder::<&'static str, i32>::new();
        let bindings = Bindings::from(vec![map.to_const("a", 1), map.to_const("a", 2)]);

        match Injector::new(&bindings, None) {
            Err(InjectError::DuplicateKey { key }) => {
                assert_eq!(&key, map.key());
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("duplicate entry should have been rejected"),
        }
    }

    #[test]
    fn multibinding_conflicts_with_plain_binding() {
        let set = SetBinder::<i32>::new();
        let mut builder = Injector::builder();
        builder.bind(set.to_const(1)).unwrap();
        builder.bind(bind_const(IndexSet::<Svc<i32>>::new())).unwrap();

        match builder.build() {
            Err(InjectError::DuplicateKey { key }) => assert_eq!(&key, set.key()),
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("conflicting bindings should have been rejected"),
        }
    }
}
