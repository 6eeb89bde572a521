use crate::{InjectResult, Injector, Service, Svc, TypedProvider};

/// Provides one value that exists before any injector does. Because the
/// value is owned by the provider rather than by an injector, every injector
/// compiled from the same binding hands out the same instance.
pub struct ConstantProvider<T: Service> {
    value: Svc<T>,
}

impl<T: Service> ConstantProvider<T> {
    /// Wraps a value.
    #[must_use]
    pub fn new(value: T) -> Self {
        ConstantProvider::from_svc(Svc::new(value))
    }

    /// Wraps a value that is already shared, keeping its identity.
    #[must_use]
    pub fn from_svc(value: Svc<T>) -> Self {
        ConstantProvider { value }
    }
}

impl<T: Service> TypedProvider for ConstantProvider<T> {
    type Result = T;

    fn provide_typed(&self, _injector: &Injector) -> InjectResult<Svc<T>> {
        Ok(self.value.clone())
    }
}

impl<T: Service> From<T> for ConstantProvider<T> {
    fn from(value: T) -> Self {
        ConstantProvider::new(value)
    }
}

/// Creates a [`ConstantProvider`], for use with
/// [`Binder::to_provider`](crate::Binder::to_provider). Most bindings use
/// [`bind_const`](crate::bind_const) or [`Binder::to_const`](crate::Binder::to_const)
/// instead.
///
/// ```
/// use keyed_injector::{constant, Binder, Injector, Key, Svc};
///
/// let mut builder = Injector::builder();
/// builder
///     .bind(Binder::of::<i32>().tag("retries").to_provider(constant(8i32)))
///     .unwrap();
///
/// let injector = builder.build().unwrap();
/// let retries = injector.provide(&Key::of::<i32>().with_tag("retries")).unwrap();
/// assert_eq!(Some(&8), retries.downcast_ref::<i32>());
/// ```
#[must_use]
pub fn constant<T: Service>(value: T) -> ConstantProvider<T> {
    ConstantProvider::new(value)
}

#[cfg(test)]
mod tests {
    use crate::{bind_const, bindings, create_injector, Svc};
    use std::sync::Mutex;

    #[test]
    fn injectors_share_constant() {
        let bindings = bindings![bind_const(Mutex::new(Vec::<u8>::new()))].unwrap();
        let first = create_injector(bindings.clone(), None).unwrap();
        let second = create_injector(bindings, None).unwrap();

        let log: Svc<Mutex<Vec<u8>>> = first.get().unwrap();
        log.lock().unwrap().push(1);

        let same: Svc<Mutex<Vec<u8>>> = second.get().unwrap();
        assert!(Svc::ptr_eq(&log, &same));
        assert_eq!(vec![1], *same.lock().unwrap());
    }
}
