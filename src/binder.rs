use crate::{
    scopes::ScopeBinding, ArrayProvider, Binding, Bindings, ConstantProvider,
    CtorProvider, FnProvider, InjectError, InjectResult, Injectable, Key,
    LinkProvider, Provider, Scope, ScopedProvider, Service, ServiceFactory,
    SingletonProvider, Svc, Tag, TypedProvider,
};
use tracing::trace;

/// Marks a key that is provisioned as soon as an injector is created. Eager
/// keys are contributions to `Key::array_of::<EagerKey>()`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct EagerKey(pub Key);

struct Strategy {
    name: &'static str,
    provider: Svc<dyn Provider>,
    result: Key,
    infers_key: bool,
}

impl Strategy {
    fn typed<P: TypedProvider>(name: &'static str, provider: P) -> Self {
        Strategy {
            name,
            provider: Svc::new(provider),
            result: Key::of::<P::Result>(),
            infers_key: true,
        }
    }
}

/// Declares a binding. A binder is created by one of the `bind_*` functions
/// (or [`Binder::of`]), configured with its options, and validated when it is
/// converted into [`Bindings`].
///
/// Exactly one provider strategy must be resolvable: either one of the
/// `to_*` options, or the strategy implied by the target passed to
/// [`bind_type`], [`bind_fn`] or [`bind_const`].
///
/// ```
/// use keyed_injector::{bind, bind_const, bind_fn, Injector, Key, Svc};
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(3u32).tag("retries")).unwrap();
/// builder
///     .bind(bind(Key::of::<u32>()).to_key(Key::of::<u32>().with_tag("retries")))
///     .unwrap();
/// builder
///     .bind(bind_fn(|retries: Svc<u32>| format!("retrying {} times", retries)).singleton())
///     .unwrap();
///
/// let injector = builder.build().unwrap();
/// let message: Svc<String> = injector.get().unwrap();
/// assert_eq!("retrying 3 times", message.as_str());
/// ```
#[must_use]
pub struct Binder {
    key: Option<Key>,
    target: Option<Key>,
    tag: Option<Tag>,
    array: Option<bool>,
    implied: Option<Strategy>,
    strategies: Vec<Strategy>,
    singleton: bool,
    scope: Option<ScopeBinding>,
    eager: bool,
}

impl Binder {
    /// Creates a binder without a key. The key is inferred from the provider
    /// strategy.
    pub fn new() -> Self {
        Binder {
            key: None,
            target: None,
            tag: None,
            array: None,
            implied: None,
            strategies: Vec::new(),
            singleton: false,
            scope: None,
            eager: false,
        }
    }

    /// Creates a binder for the untagged key of `T`.
    pub fn of<T: Service>() -> Self {
        Binder::new().key(Key::of::<T>())
    }

    /// Uses an explicit key.
    pub fn key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Tags the key. Fails when the explicit key already has a tag.
    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets whether the key is an array key. An array binding contributes
    /// one element to the array.
    pub fn array(mut self, array: bool) -> Self {
        self.array = Some(array);
        self
    }

    /// Provides the key by calling a service factory.
    pub fn to_fn<D, F>(mut self, factory: F) -> Self
    where
        D: 'static,
        F: ServiceFactory<D>,
    {
        self.strategies
            .push(Strategy::typed("to_fn", FnProvider::new(factory)));
        self
    }

    /// Provides the key by constructing an [`Injectable`] type.
    pub fn to_ctor<T: Injectable>(mut self) -> Self {
        self.strategies
            .push(Strategy::typed("to_ctor", CtorProvider::<T>::new()));
        self
    }

    /// Provides the key with a constant value.
    pub fn to_const<T: Service>(mut self, value: T) -> Self {
        self.strategies
            .push(Strategy::typed("to_const", ConstantProvider::new(value)));
        self
    }

    /// Provides the key with the value bound to another key.
    pub fn to_key(mut self, key: Key) -> Self {
        self.strategies.push(Strategy {
            name: "to_key",
            provider: Svc::new(LinkProvider::new(key.clone())),
            result: key,
            infers_key: false,
        });
        self
    }

    /// Provides the key with a custom provider.
    pub fn to_provider<P: TypedProvider>(mut self, provider: P) -> Self {
        self.strategies.push(Strategy::typed("to_provider", provider));
        self
    }

    /// Creates the value once per injector.
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Creates the value once per open state of the scope `S`.
    pub fn in_scope<S: Scope>(mut self) -> Self {
        self.scope = Some(ScopeBinding::of::<S>());
        self
    }

    /// Provisions the key when the injector is created.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Validates this binder and creates its bindings: the binding itself,
    /// and the eager marker if the key is eager.
    pub fn build(self) -> InjectResult<Bindings> {
        let Binder {
            key: explicit,
            target,
            tag,
            array,
            implied,
            mut strategies,
            singleton,
            scope,
            eager,
        } = self;

        let strategy = match strategies.len() {
            0 => implied.ok_or_else(|| invalid("no provider was given"))?,
            1 => strategies.remove(0),
            _ => {
                let names: Vec<_> =
                    strategies.iter().map(|strategy| strategy.name).collect();
                return Err(invalid(format!(
                    "only one provider may be given, but found {}",
                    names.join(", ")
                )));
            }
        };

        let explicit_key = explicit.is_some();
        let mut key = match explicit.or(target) {
            Some(key) => key,
            None if strategy.infers_key => strategy.result.clone(),
            None => {
                return Err(invalid(format!(
                    "a key is needed to bind {} to {}",
                    strategy.name, strategy.result
                )))
            }
        };

        if let Some(tag) = tag {
            if explicit_key && key.tag().is_some() {
                return Err(invalid(format!("{} is already tagged", key)));
            }

            key = key.with_tag(tag);
        }

        if let Some(array) = array {
            if explicit_key && key.is_array() && !array {
                return Err(invalid(format!("{} is an array key", key)));
            }

            key = key.with_array(array);
        }

        if strategy.result.is_array() {
            return Err(invalid(format!(
                "{} cannot be bound to the array key {}",
                key, strategy.result
            )));
        }

        if strategy.result.service_info() != key.service_info() {
            return Err(invalid(format!(
                "{} cannot be provided by {} of {}",
                key,
                strategy.name,
                strategy.result.service_info().name()
            )));
        }

        let mut provider = strategy.provider;
        match (singleton, scope) {
            (true, Some(_)) => {
                return Err(invalid(format!(
                    "{} cannot be both a singleton and scoped",
                    key
                )))
            }
            (false, Some(scope)) if eager => {
                return Err(invalid(format!(
                    "{} cannot be eager because it is scoped to {}",
                    key,
                    scope.scope().name()
                )))
            }
            (true, None) => {
                provider = Svc::new(SingletonProvider::new(provider));
            }
            (false, Some(scope)) => {
                provider = Svc::new(ScopedProvider::new(scope, provider));
            }
            (false, None) => {}
        }

        trace!(%key, strategy = strategy.name, "binding declared");
        let mut binding = Binding::new(key.clone(), provider);
        if let Some(scope) = scope {
            binding = binding.with_scope(scope.scope());
        }

        let mut bindings = Bindings::from(binding);
        if eager {
            let marker = ConstantProvider::new(EagerKey(key));
            bindings.add(Binding::new(
                Key::array_of::<EagerKey>(),
                Svc::new(marker),
            ));
        }

        Ok(bindings)
    }
}

impl Default for Binder {
    fn default() -> Self {
        Binder::new()
    }
}

/// Starts a binding of an explicit key. A provider strategy must be given
/// with one of the `to_*` options.
pub fn bind(key: Key) -> Binder {
    Binder::new().key(key)
}

/// Starts a binding of an [`Injectable`] type to its constructor.
pub fn bind_type<T: Injectable>() -> Binder {
    let mut binder = Binder::new();
    binder.target = Some(Key::of::<T>());
    binder.implied = Some(Strategy::typed("to_ctor", CtorProvider::<T>::new()));
    binder
}

/// Starts a binding of a service factory. The key is the factory's result
/// type unless given explicitly.
pub fn bind_fn<D, F>(factory: F) -> Binder
where
    D: 'static,
    F: ServiceFactory<D>,
{
    let mut binder = Binder::new();
    binder.implied = Some(Strategy::typed("to_fn", FnProvider::new(factory)));
    binder
}

/// Starts a binding of a constant value. The key is the value's type unless
/// given explicitly.
pub fn bind_const<T: Service>(value: T) -> Binder {
    let mut binder = Binder::new();
    binder.target = Some(Key::of::<T>());
    binder.implied =
        Some(Strategy::typed("to_const", ConstantProvider::new(value)));
    binder
}

/// Declares an array key, so that it resolves to an empty array when nothing
/// contributes to it. `key` may be given as either the element key or the
/// array key.
#[must_use]
pub fn bind_array(key: Key) -> Binding {
    let provider: Svc<dyn Provider> = Svc::new(ArrayProvider::default());
    Binding::new(key.with_array(true), provider)
}

fn invalid(reason: impl Into<String>) -> InjectError {
    InjectError::InvalidBinding {
        reason: reason.into(),
    }
}
