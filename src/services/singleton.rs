use crate::{DynSvc, InjectResult, Injector, Provider, Svc};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SINGLETON_ID: AtomicUsize = AtomicUsize::new(0);

/// A service provider that only creates a single instance of the service per
/// injector. The service is created only during its first request. Any
/// subsequent requests return service pointers to the same service.
///
/// The instance is stored in the injector the provider is invoked with, so
/// injectors compiled from the same bindings each get their own instance.
/// When the service is requested concurrently, exactly one caller runs the
/// wrapped provider and every caller receives its result.
///
/// ```
/// use keyed_injector::{bind_fn, Injector, Svc};
///
/// #[derive(Default)]
/// struct Foo;
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_fn(Foo::default).singleton()).unwrap();
///
/// let injector = builder.build().unwrap();
/// let foo1: Svc<Foo> = injector.get().unwrap();
/// let foo2: Svc<Foo> = injector.get().unwrap();
///
/// assert!(Svc::ptr_eq(&foo1, &foo2));
/// ```
pub struct SingletonProvider {
    id: usize,
    inner: Svc<dyn Provider>,
}

impl SingletonProvider {
    /// Creates a new [`SingletonProvider`] wrapping another provider.
    #[must_use]
    pub fn new(inner: Svc<dyn Provider>) -> Self {
        SingletonProvider {
            id: NEXT_SINGLETON_ID.fetch_add(1, Ordering::Relaxed),
            inner,
        }
    }
}

impl Provider for SingletonProvider {
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        injector
            .singletons()
            .get_or_try_init(self.id, || self.inner.provide(injector))
    }
}
