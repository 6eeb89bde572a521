use crate::{
    Binding, ConstantProvider, DynSvc, InjectResult, Injector, Key, Provider,
    Service, Svc,
};

#[cfg(feature = "arc")]
type Callback =
    dyn Fn(&Injector, &Key, &DynSvc) -> InjectResult<()> + Send + Sync;

#[cfg(feature = "rc")]
type Callback = dyn Fn(&Injector, &Key, &DynSvc) -> InjectResult<()>;

/// A callback invoked by an injector after it provisions a key. Listeners are
/// contributions to the array key `Key::array_of::<ProvisionListener>()` and
/// are collected once, when the injector is created.
///
/// A listener is notified of values the injector's parent provided too, but
/// not of values reused from earlier in the same request. An error returned
/// by a listener fails the request that triggered it.
pub struct ProvisionListener {
    callback: Box<Callback>,
}

impl ProvisionListener {
    /// Creates a listener from a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Service + Fn(&Injector, &Key, &DynSvc) -> InjectResult<()>,
    {
        ProvisionListener {
            callback: Box::new(callback),
        }
    }

    pub(crate) fn notify(
        &self,
        injector: &Injector,
        key: &Key,
        value: &DynSvc,
    ) -> InjectResult<()> {
        (self.callback)(injector, key, value)
    }
}

/// Binds a provision listener.
///
/// ```
/// use keyed_injector::{bind_const, bind_provision_listener, bindings, Injector, Key, Svc};
/// use std::sync::Mutex;
///
/// static SEEN: Mutex<Vec<String>> = Mutex::new(Vec::new());
///
/// let bindings = bindings![
///     bind_const(5u8),
///     bind_provision_listener(|_injector: &Injector, key: &Key, _value: &_| {
///         SEEN.lock().unwrap().push(key.to_string());
///         Ok(())
///     }),
/// ]
/// .unwrap();
///
/// let injector = Injector::new(&bindings, None).unwrap();
/// let _value: Svc<u8> = injector.get().unwrap();
/// assert_eq!(vec!["u8".to_owned()], *SEEN.lock().unwrap());
/// ```
#[must_use]
pub fn bind_provision_listener<F>(callback: F) -> Binding
where
    F: Service + Fn(&Injector, &Key, &DynSvc) -> InjectResult<()>,
{
    let provider: Svc<dyn Provider> =
        Svc::new(ConstantProvider::new(ProvisionListener::new(callback)));
    Binding::new(Key::array_of::<ProvisionListener>(), provider)
}
