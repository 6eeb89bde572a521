use crate::{
    downcast_provider,
    provider_map::ProviderMap,
    requests::{signature::SignatureCache, state::ActiveRequest},
    scopes,
    sync::{Container, ContainerEx, Once, SlotMap},
    Arguments, Bindings, Constructor, DynSvc, EagerKey, InjectError,
    InjectResult, Injectable, InjectorBuilder, IntoBindings, Key,
    PrivateBindings, PrivateExposeProvider, ProvisionListener, Request, Scope,
    ScopeGuard, Seeds, ServiceFactory, Svc, WeakSvc,
};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use tracing::{debug, trace};

static NEXT_INJECTOR_ID: AtomicUsize = AtomicUsize::new(0);

enum Parent {
    /// A parent given by the user.
    Strong(Injector),
    /// The enclosing injector of a private child, which owns the child.
    Weak(WeakSvc<InjectorInner>),
}

struct InjectorInner {
    id: usize,
    providers: ProviderMap,
    parent: Option<Parent>,
    listeners: Once<Vec<Svc<ProvisionListener>>>,
    singletons: SlotMap<usize>,
    privates: Container<HashMap<usize, Injector>>,
    signatures: SignatureCache,
}

/// A runtime dependency injection container. The injector holds the compiled
/// providers of its bindings and resolves keys on demand: it constructs
/// values, memoizes singletons and scoped values, wires dependencies into
/// functions and constructors, and detects dependency cycles.
///
/// Keys this injector doesn't bind are resolved by its parent, if it has one.
///
/// # Injecting the injector
///
/// Cloning the injector does not clone the providers inside of it. Instead,
/// both injectors will use the same providers, meaning that an injector can be
/// passed to a service as a dependency. The injector can be requested as
/// itself without using a service pointer. It does not need to be bound
/// beforehand, and binding its key is an error.
///
/// Note that requesting the injector inside of your services is generally bad
/// practice, and is known as the service locator antipattern. This is mostly
/// useful for service factories where you can create instances of your
/// services on demand (see [`bind_factory`](crate::bind_factory)).
///
/// ```
/// use keyed_injector::{bind_const, bind_fn, InjectResult, Injector, Svc};
/// use std::sync::Mutex;
///
/// struct FloatFactory(Injector);
///
/// impl FloatFactory {
///     pub fn get(&self) -> InjectResult<f32> {
///         let int: Svc<i32> = self.0.get()?;
///         Ok(*int as f32)
///     }
/// }
///
/// fn count(counter: Svc<Mutex<i32>>) -> i32 {
///     let mut counter = counter.lock().unwrap();
///     *counter += 1;
///     *counter
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(Mutex::new(0i32))).unwrap();
/// builder.bind(bind_fn(count)).unwrap();
/// builder.bind(bind_fn(FloatFactory).singleton()).unwrap();
///
/// let injector = builder.build().unwrap();
/// let float_factory: Svc<FloatFactory> = injector.get().unwrap();
/// let value1 = float_factory.get().unwrap();
/// let value2 = float_factory.get().unwrap();
///
/// assert_eq!(1.0, value1);
/// assert_eq!(2.0, value2);
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Svc<InjectorInner>,
}

impl Injector {
    /// Creates a builder for this injector. This is the preferred way of
    /// creating an injector.
    #[must_use]
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::default()
    }

    /// Creates an injector from its bindings.
    ///
    /// The bindings are compiled, the provision listeners are collected, the
    /// injectors of private bindings are created and every eager key is
    /// provisioned, in declaration order. If any step fails, no injector is
    /// created.
    pub fn new(
        bindings: &Bindings,
        parent: Option<&Injector>,
    ) -> InjectResult<Injector> {
        Injector::create(bindings, parent.cloned().map(Parent::Strong))
    }

    fn create(
        bindings: &Bindings,
        parent: Option<Parent>,
    ) -> InjectResult<Injector> {
        let providers = ProviderMap::compile(bindings)?;
        let injector = Injector {
            inner: Svc::new(InjectorInner {
                id: NEXT_INJECTOR_ID.fetch_add(1, Ordering::Relaxed),
                providers,
                parent,
                listeners: Once::new(),
                singletons: SlotMap::default(),
                privates: ContainerEx::new(HashMap::new()),
                signatures: SignatureCache::default(),
            }),
        };

        let listeners: Vec<Svc<ProvisionListener>> =
            injector.own_array(&Key::array_of::<ProvisionListener>())?;
        if injector.inner.listeners.set(listeners).is_err() {
            return Err(InjectError::InternalError(
                "provision listeners were collected twice".to_owned(),
            ));
        }

        for private in injector.private_graphs() {
            injector.private_child(&private)?;
        }

        let eager: Vec<Svc<EagerKey>> =
            injector.own_array(&Key::array_of::<EagerKey>())?;
        if !eager.is_empty() {
            debug!(keys = eager.len(), "provisioning eager keys");
        }

        for EagerKey(key) in eager.iter().map(|eager| &**eager) {
            injector.provide(key)?;
        }

        Ok(injector)
    }

    /// Provisions a key, returning `None` if neither this injector nor any
    /// of its parents binds it.
    ///
    /// Every provisioning call made while this call is running, directly or
    /// by the providers it invokes, belongs to the same request. Within a
    /// request each key is provisioned at most once: a failure is returned
    /// again to every later caller without retrying, and a key requested
    /// again while it is still being provisioned fails with
    /// [`InjectError::CyclicDependency`].
    pub fn try_provide(&self, key: &Key) -> InjectResult<Option<DynSvc>> {
        let request = ActiveRequest::enter(self.inner.id);
        if let Some(result) = request.memoized(key) {
            trace!(%key, source = "request", "provisioned key");
            return result;
        }

        let provisioning = request.begin(key)?;
        let result = self.resolve(key).and_then(|(value, source)| {
            trace!(%key, source, "provisioned key");
            if let Some(value) = &value {
                self.notify(key, value)?;
            }

            Ok(value)
        });

        request.record(key, result.clone());
        drop(provisioning);
        result
    }

    fn resolve(
        &self,
        key: &Key,
    ) -> InjectResult<(Option<DynSvc>, &'static str)> {
        if *key == Key::of::<Injector>() {
            Ok((Some(Svc::new(self.clone()) as DynSvc), "injector"))
        } else if let Some(provider) = self.inner.providers.get(key) {
            Ok((Some(provider.provide(self)?), "provider"))
        } else if let Some(parent) = self.parent() {
            Ok((parent.try_provide(key)?, "parent"))
        } else {
            Ok((None, "none"))
        }
    }

    /// Provisions a key, failing with [`InjectError::UnboundKey`] if neither
    /// this injector nor any of its parents binds it.
    pub fn provide(&self, key: &Key) -> InjectResult<DynSvc> {
        self.try_provide(key)?
            .ok_or_else(|| InjectError::UnboundKey { key: key.clone() })
    }

    /// Performs a request for a service. There are several types of requests
    /// that can be made to the injector by default:
    ///
    /// - [`Svc<T>`](crate::Svc): Requests a service pointer to the value
    ///   bound to `T`. Fails if nothing is bound.
    /// - `Option<Svc<T>>`: Like `Svc<T>`, but returns `Ok(None)` rather than
    ///   an error if nothing is bound.
    /// - `Vec<Svc<T>>`: Requests every contribution to the array of `T`.
    /// - [`Tagged<R, M>`](crate::Tagged): Performs the request `R` for the key
    ///   tagged with the marker type `M`.
    /// - [`Injector`]: Requests a clone of the injector itself.
    /// - Tuples of requests, which perform each request in order.
    ///
    /// See the documentation for [`Request`] for more information on what
    /// can be requested.
    pub fn get<R: Request>(&self) -> InjectResult<R> {
        R::request(self)
    }

    /// Provisions the parameters of an injection target, skipping the first
    /// `skip_positional` parameters and the parameters named in
    /// `skip_named`. A parameter with a default is omitted when its key is
    /// unbound.
    pub fn provide_kwargs<D, F>(
        &self,
        _target: &F,
        skip_positional: usize,
        skip_named: &[&str],
    ) -> InjectResult<Arguments>
    where
        F: ServiceFactory<D>,
    {
        let parameters = self.inner.signatures.parameters::<D, F>()?;
        let mut arguments = Arguments::new();
        for parameter in parameters.iter().skip(skip_positional) {
            if skip_named.contains(&parameter.name()) {
                continue;
            }

            let value = if parameter.has_default() {
                self.try_provide(parameter.key())?
            } else {
                Some(self.provide(parameter.key())?)
            };

            if let Some(value) = value {
                arguments.insert(parameter.name().to_owned(), value);
            }
        }

        Ok(arguments)
    }

    /// Calls an injection target. `positional` arguments fill the target's
    /// first parameters, `named` arguments fill parameters by name, and every
    /// other parameter is provisioned by this injector.
    pub fn inject<D, F>(
        &self,
        target: &F,
        positional: Vec<DynSvc>,
        named: Arguments,
    ) -> InjectResult<F::Result>
    where
        F: ServiceFactory<D>,
    {
        let parameters = self.inner.signatures.parameters::<D, F>()?;
        let target_name = std::any::type_name::<F>();
        if positional.len() > parameters.len() {
            return Err(InjectError::InvalidParameter {
                target: target_name,
                parameter: positional.len().to_string(),
                reason: "more positional arguments were given than the target has parameters",
            });
        }

        for name in named.names() {
            let index = parameters
                .iter()
                .position(|parameter| parameter.name() == name);
            let reason = match index {
                None => "the target has no parameter with this name",
                Some(index) if index < positional.len() => {
                    "the argument was also given positionally"
                }
                Some(_) => continue,
            };

            return Err(InjectError::InvalidParameter {
                target: target_name,
                parameter: name.to_owned(),
                reason,
            });
        }

        let skip_named: Vec<&str> = named.names().collect();
        let mut arguments =
            self.provide_kwargs(target, positional.len(), &skip_named)?;
        for (parameter, value) in parameters.iter().zip(positional) {
            arguments.insert(parameter.name().to_owned(), value);
        }

        arguments.extend(named);
        target.invoke(arguments)
    }

    /// Constructs an [`Injectable`] type without binding it.
    pub fn construct<T: Injectable>(&self) -> InjectResult<T> {
        self.inject(&Constructor::<T>::new(), Vec::new(), Arguments::new())
    }

    /// Enters the scope `S` with the given seeds. The scope stays open until
    /// the returned guard is dropped.
    pub fn enter_scope<S: Scope>(
        &self,
        seeds: Seeds,
    ) -> InjectResult<ScopeGuard<S>> {
        let scope: Svc<S> = self.get()?;
        scopes::enter(scope, seeds)
    }

    /// Runs `f` while the scope `S` is open. The scope is closed when `f`
    /// returns, whether it succeeded or not.
    pub fn with_scope<S, R, F>(&self, seeds: Seeds, f: F) -> InjectResult<R>
    where
        S: Scope,
        F: FnOnce(&Injector) -> InjectResult<R>,
    {
        let _guard = self.enter_scope::<S>(seeds)?;
        f(self)
    }

    pub(crate) fn singletons(&self) -> &SlotMap<usize> {
        &self.inner.singletons
    }

    /// The injector of a private graph bound in this injector. It is created
    /// on first use and kept for the lifetime of this injector.
    pub(crate) fn private_child(
        &self,
        private: &Svc<PrivateBindings>,
    ) -> InjectResult<Injector> {
        let id = Svc::as_ptr(private) as usize;
        if let Some(child) =
            self.inner.privates.with_inner(|children| children.get(&id).cloned())
        {
            return Ok(child);
        }

        // The child is created without holding the lock, since creating it
        // may provision eager keys that need other private children
        let parent = Parent::Weak(Svc::downgrade(&self.inner));
        let child = Injector::create(private.bindings(), Some(parent))?;
        debug!(
            exposed = private.exposed().len(),
            "created private injector"
        );

        Ok(self.inner.privates.with_inner_mut(|children| {
            children.entry(id).or_insert(child).clone()
        }))
    }

    /// The private graphs bound in this injector, in declaration order.
    pub(crate) fn private_graphs(&self) -> Vec<Svc<PrivateBindings>> {
        let mut graphs: Vec<Svc<PrivateBindings>> = Vec::new();
        for provider in self.inner.providers.providers() {
            if let Some(exposed) =
                downcast_provider::<PrivateExposeProvider>(&**provider)
            {
                let private = exposed.private();
                if !graphs.iter().any(|graph| Svc::ptr_eq(graph, private)) {
                    graphs.push(private.clone());
                }
            }
        }

        graphs
    }

    fn parent(&self) -> Option<Injector> {
        match self.inner.parent.as_ref()? {
            Parent::Strong(parent) => Some(parent.clone()),
            Parent::Weak(parent) => {
                parent.upgrade().map(|inner| Injector { inner })
            }
        }
    }

    /// Provisions an array key bound in this injector only, ignoring the
    /// parent. Values are provisioned outside of any request.
    fn own_array<T: crate::Service>(
        &self,
        key: &Key,
    ) -> InjectResult<Vec<Svc<T>>> {
        match self.inner.providers.get(key) {
            Some(provider) => {
                let value = provider.provide(self)?;
                <Vec<Svc<T>>>::from_value(key, Some(value))
            }
            None => Ok(Vec::new()),
        }
    }

    fn notify(&self, key: &Key, value: &DynSvc) -> InjectResult<()> {
        if let Some(listeners) = self.inner.listeners.get() {
            for listener in listeners {
                listener.notify(self, key, value)?;
            }
        }

        Ok(())
    }
}

/// Creates an injector from bindings, with an optional parent that resolves
/// the keys the bindings don't bind.
pub fn create_injector(
    bindings: impl IntoBindings,
    parent: Option<&Injector>,
) -> InjectResult<Injector> {
    Injector::new(&bindings.into_bindings()?, parent)
}
