use crate::{DynSvc, InjectResult, Injector, Service, Svc};
use std::any::Any;

/// Type-erased provider of the value bound to a key. Implemented for every
/// [`TypedProvider`].
///
/// Providers are immutable once constructed. Anything they memoize is stored
/// in the injector they are invoked with (or in a scope's state), so the same
/// provider may be compiled into any number of injectors.
pub trait Provider: Service + AsAny {
    /// Provides an instance of the service.
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc>;
}

impl<T> Provider for T
where
    T: TypedProvider,
{
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        let result = self.provide_typed(injector)?;
        Ok(result as DynSvc)
    }
}

/// A strongly-typed provider. Custom providers implement this trait and are
/// bound with [`Binder::to_provider`](crate::Binder::to_provider); the binder
/// checks that [`TypedProvider::Result`] matches the bound key.
///
/// # Example
///
/// ```
/// use keyed_injector::{bind_const, Binder, InjectResult, Injector, Svc, TypedProvider};
///
/// struct Address(String);
///
/// struct AddressProvider;
/// impl TypedProvider for AddressProvider {
///     type Result = Address;
///
///     fn provide_typed(&self, injector: &Injector) -> InjectResult<Svc<Address>> {
///         let port: Svc<u16> = injector.get()?;
///         Ok(Svc::new(Address(format!("localhost:{}", port))))
///     }
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(8080u16)).unwrap();
/// builder.bind(Binder::of::<Address>().to_provider(AddressProvider)).unwrap();
///
/// let injector = builder.build().unwrap();
/// let address: Svc<Address> = injector.get().unwrap();
/// assert_eq!("localhost:8080", address.0);
/// ```
pub trait TypedProvider: Service {
    /// The type of service this provider can activate.
    type Result: Service;

    /// Provides an instance of the service. The [`Injector`] passed in can be
    /// used to retrieve instances of any dependencies this service has.
    fn provide_typed(
        &self,
        injector: &Injector,
    ) -> InjectResult<Svc<Self::Result>>;
}

/// Exposes a provider as [`dyn Any`](Any), so that compiled providers can be
/// inspected by their concrete type.
pub trait AsAny: Any {
    /// Converts this reference into a trait object reference.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Downcasts a type-erased provider to a concrete provider type.
pub(crate) fn downcast_provider<P: Provider>(provider: &dyn Provider) -> Option<&P> {
    provider.as_any().downcast_ref()
}
