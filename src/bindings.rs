use crate::{
    Binder, Collector, InjectError, InjectResult, Key, Provider, ServiceInfo,
    Svc,
};
use indexmap::IndexMap;
use std::fmt::{self, Debug, Formatter};

/// A key and the provider responsible for it.
///
/// Bindings are immutable values. The same binding may be part of any number
/// of [`Bindings`] collections and compiled into any number of injectors.
#[derive(Clone)]
pub struct Binding {
    key: Key,
    provider: Svc<dyn Provider>,
    collector: Option<Collector>,
    scope: Option<ServiceInfo>,
}

impl Binding {
    /// Creates a binding from a key and its provider.
    #[must_use]
    pub fn new(key: Key, provider: Svc<dyn Provider>) -> Self {
        Binding {
            key,
            provider,
            collector: None,
            scope: None,
        }
    }

    /// Creates a contribution to a multibinding. Every contribution to the
    /// same key is merged by the collector when the bindings are compiled.
    pub(crate) fn contribution(
        key: Key,
        provider: Svc<dyn Provider>,
        collector: Collector,
    ) -> Self {
        Binding {
            key,
            provider,
            collector: Some(collector),
            scope: None,
        }
    }

    pub(crate) fn with_scope(mut self, scope: ServiceInfo) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The key this binding provides.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The provider of this binding.
    #[must_use]
    pub fn provider(&self) -> &Svc<dyn Provider> {
        &self.provider
    }

    /// The scope the binding was declared for, if it is scoped.
    #[must_use]
    pub fn scope(&self) -> Option<ServiceInfo> {
        self.scope
    }

    pub(crate) fn collector(&self) -> Option<Collector> {
        self.collector
    }

    pub(crate) fn same_provider(&self, other: &Svc<dyn Provider>) -> bool {
        std::ptr::eq(
            Svc::as_ptr(&self.provider).cast::<()>(),
            Svc::as_ptr(other).cast::<()>(),
        )
    }
}

impl Debug for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut binding = f.debug_struct("Binding");
        binding.field("key", &self.key);
        if let Some(scope) = self.scope {
            binding.field("scope", &scope.name());
        }

        binding.finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum Item {
    Binding(Binding),
    Nested(Bindings),
}

/// A collection of bindings that can be handed to an injector all at once.
/// Collections can be nested, and nothing is checked for conflicts until the
/// collection is compiled by an injector.
///
/// For creating a collection from several binders, see [`bindings!`].
///
/// ```
/// use keyed_injector::{bind_const, bind_fn, Bindings, Injector, Svc};
///
/// let mut config = Bindings::default();
/// config.add(bind_const(8080u16).build().unwrap());
///
/// let mut app = Bindings::default();
/// app.add(config);
/// app.add(bind_fn(|port: Svc<u16>| format!("0.0.0.0:{}", port)).build().unwrap());
///
/// let injector = Injector::new(&app, None).unwrap();
/// let address: Svc<String> = injector.get().unwrap();
/// assert_eq!("0.0.0.0:8080", address.as_str());
/// ```
#[derive(Clone, Default)]
pub struct Bindings {
    items: Vec<Item>,
}

impl Bindings {
    /// Appends bindings to this collection.
    pub fn add(&mut self, bindings: impl Into<Bindings>) -> &mut Self {
        let bindings = bindings.into();
        match <[Item; 1]>::try_from(bindings.items) {
            Ok([item]) => self.items.push(item),
            Err(items) if items.is_empty() => {}
            Err(items) => self.items.push(Item::Nested(Bindings { items })),
        }

        self
    }

    /// Iterates every binding in this collection, nested collections
    /// included, in declaration order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Binding> + '_> {
        Box::new(self.items.iter().flat_map(|item| match item {
            Item::Binding(binding) => {
                Box::new(std::iter::once(binding))
                    as Box<dyn Iterator<Item = &Binding>>
            }
            Item::Nested(bindings) => bindings.iter(),
        }))
    }

    /// Whether this collection contains no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Replaces the bindings of this collection with `overrides`. See
    /// [`override_bindings`].
    pub fn overridden_by(
        &self,
        overrides: impl IntoBindings,
    ) -> InjectResult<Bindings> {
        override_bindings(self.clone(), overrides)
    }
}

impl Debug for Bindings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl From<Binding> for Bindings {
    fn from(binding: Binding) -> Self {
        Bindings {
            items: vec![Item::Binding(binding)],
        }
    }
}

impl From<Vec<Binding>> for Bindings {
    fn from(bindings: Vec<Binding>) -> Self {
        Bindings {
            items: bindings.into_iter().map(Item::Binding).collect(),
        }
    }
}

impl From<Vec<Bindings>> for Bindings {
    fn from(children: Vec<Bindings>) -> Self {
        let mut bindings = Bindings::default();
        for child in children {
            bindings.add(child);
        }

        bindings
    }
}

/// A conversion into a collection of bindings. Binders are validated by the
/// conversion, which is why it may fail.
pub trait IntoBindings {
    /// Converts this value into bindings.
    fn into_bindings(self) -> InjectResult<Bindings>;
}

impl IntoBindings for Bindings {
    fn into_bindings(self) -> InjectResult<Bindings> {
        Ok(self)
    }
}

impl IntoBindings for Binding {
    fn into_bindings(self) -> InjectResult<Bindings> {
        Ok(self.into())
    }
}

impl IntoBindings for Binder {
    fn into_bindings(self) -> InjectResult<Bindings> {
        self.build()
    }
}

impl<T: IntoBindings> IntoBindings for InjectResult<T> {
    fn into_bindings(self) -> InjectResult<Bindings> {
        self?.into_bindings()
    }
}

impl<T: IntoBindings> IntoBindings for Vec<T> {
    fn into_bindings(self) -> InjectResult<Bindings> {
        as_bindings(self)
    }
}

/// Combines several binders and bindings into one collection.
pub fn as_bindings<I>(items: I) -> InjectResult<Bindings>
where
    I: IntoIterator,
    I::Item: IntoBindings,
{
    let mut bindings = Bindings::default();
    for item in items {
        bindings.add(item.into_bindings()?);
    }

    Ok(bindings)
}

/// Creates a collection of bindings using a domain specific language. Each
/// item may be a [`Binder`], a [`Binding`], [`Bindings`], or a result of any
/// of those, and may carry `#[cfg]` attributes.
///
/// # Example
///
/// ```
/// use keyed_injector::{bind_const, bind_type, bindings, injectable, Injector, Svc};
///
/// struct Config {
///     path: &'static str,
/// }
///
/// struct Repo {
///     config: Svc<Config>,
/// }
///
/// injectable! {
///     Repo { config: Svc<Config> }
/// }
///
/// let bindings = bindings![
///     bind_type::<Repo>(),
///     bind_const(Config { path: "/x" }),
///     #[cfg(any())]
///     bind_const(0u8),
/// ]
/// .unwrap();
///
/// let injector = Injector::new(&bindings, None).unwrap();
/// let repo: Svc<Repo> = injector.get().unwrap();
/// assert_eq!("/x", repo.config.path);
/// ```
#[macro_export]
macro_rules! bindings {
    [
        $(
            $(#[$attr:meta])*
            $item:expr
        ),*
        $(,)?
    ] => {
        {
            #[allow(unused_mut, clippy::redundant_closure_call)]
            let bindings = (|| -> $crate::InjectResult<$crate::Bindings> {
                let mut bindings =
                    <$crate::Bindings as ::std::default::Default>::default();
                $(
                    $(#[$attr])*
                    bindings.add($crate::IntoBindings::into_bindings($item)?);
                )*
                ::std::result::Result::Ok(bindings)
            })();
            bindings
        }
    };
}

/// Replaces bindings of `base` by key.
///
/// Every binding of `base` is kept in order, except that a binding whose key
/// is also bound in `overrides` is replaced by the override. When several
/// bindings of `base` share an overridden key (array and multibinding
/// contributions), the first is replaced and the rest are dropped. Overrides
/// for keys `base` doesn't bind are ignored.
///
/// Fails with [`InjectError::DuplicateKey`] if `overrides` binds a key more
/// than once, even when that key is an array key.
///
/// ```
/// use keyed_injector::{bind_const, bindings, override_bindings, Injector, Svc};
///
/// let base = bindings![bind_const(1u8), bind_const('a')].unwrap();
/// let testing = override_bindings(base, bind_const(2u8)).unwrap();
///
/// let injector = Injector::new(&testing, None).unwrap();
/// let number: Svc<u8> = injector.get().unwrap();
/// let letter: Svc<char> = injector.get().unwrap();
/// assert_eq!(2, *number);
/// assert_eq!('a', *letter);
/// ```
pub fn override_bindings(
    base: impl IntoBindings,
    overrides: impl IntoBindings,
) -> InjectResult<Bindings> {
    let base = base.into_bindings()?;

    let mut replacements: IndexMap<Key, Option<Binding>> = IndexMap::new();
    for binding in overrides.into_bindings()?.iter() {
        if replacements.contains_key(binding.key()) {
            return Err(InjectError::DuplicateKey {
                key: binding.key().clone(),
            });
        }

        replacements.insert(binding.key().clone(), Some(binding.clone()));
    }

    let mut bindings = Vec::new();
    for binding in base.iter() {
        match replacements.get_mut(binding.key()) {
            Some(replacement) => bindings.extend(replacement.take()),
            None => bindings.push(binding.clone()),
        }
    }

    Ok(bindings.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bind_const, Injector};

    #[test]
    fn nested_bindings_keep_declaration_order() {
        let mut inner = Bindings::default();
        inner.add(bind_const(2i32).array(true).build().unwrap());
        inner.add(bind_const(3i32).array(true).build().unwrap());

        let mut outer = Bindings::default();
        outer.add(bind_const(1i32).array(true).build().unwrap());
        outer.add(inner);
        outer.add(bind_const(4i32).array(true).build().unwrap());

        let injector = Injector::new(&outer, None).unwrap();
        let values: Vec<Svc<i32>> = injector.get().unwrap();
        let values: Vec<i32> = values.iter().map(|value| **value).collect();
        assert_eq!(vec![1, 2, 3, 4], values);
    }

    #[test]
    fn macro_reports_invalid_binder() {
        let result = bindings![
            bind_const(1u8),
            crate::bind(Key::of::<u16>()),
        ];

        match result {
            Err(InjectError::InvalidBinding { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("a binder without a provider should be rejected"),
        }
    }

    #[test]
    fn overrides_must_not_repeat_keys() {
        let base = bindings![bind_const(1u8)].unwrap();
        let overrides = bindings![bind_const(2u8), bind_const(3u8)].unwrap();

        match override_bindings(base, overrides) {
            Err(InjectError::DuplicateKey { key }) => {
                assert_eq!(Key::of::<u8>(), key);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("overrides with a repeated key should be rejected"),
        }
    }

    #[test]
    fn overrides_replace_array_contributions_once() {
        let base = bindings![
            bind_const(1i32).array(true),
            bind_const('x'),
            bind_const(2i32).array(true),
        ]
        .unwrap();
        let overridden = base
            .overridden_by(bind_const(9i32).array(true))
            .unwrap();

        let keys: Vec<Key> =
            overridden.iter().map(|binding| binding.key().clone()).collect();
        assert_eq!(vec![Key::array_of::<i32>(), Key::of::<char>()], keys);
    }

    #[test]
    fn overrides_for_unbound_keys_are_ignored() {
        let base = bindings![bind_const(1u8)].unwrap();
        let overridden = base.overridden_by(bind_const('z')).unwrap();

        let injector = Injector::new(&overridden, None).unwrap();
        let letter: Option<Svc<char>> = injector.get().unwrap();
        assert!(letter.is_none());
    }
}
