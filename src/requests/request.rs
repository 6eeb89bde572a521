use crate::{DynSvc, InjectError, InjectResult, Injector, Key, Service, Svc, Tag};
use std::{
    any::Any,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

/// A request to an injector. Every parameter of an injection target is a
/// request, and [`Injector::get`] performs a request directly.
///
/// A request names the [`Key`] it resolves and converts the type-erased value
/// bound to that key into the requested type:
///
/// - [`Svc<T>`]: the value bound to `Key::of::<T>()`.
/// - `Vec<Svc<T>>`: every contribution to the array key
///   `Key::array_of::<T>()`, in declaration order.
/// - `Option<R>`: like `R`, but resolves to `None` instead of failing when
///   the key is unbound. Parameters of this type have a default.
/// - [`Tagged<R, M>`]: like `R`, with the key tagged by the marker type `M`.
/// - [`Injector`]: the injector itself.
///
/// Set and map multibindings are requested through their collection types,
/// for example `Svc<IndexSet<Svc<T>>>`.
///
/// ```
/// use keyed_injector::{bind_const, Injector, Svc};
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(8i32)).unwrap();
///
/// let injector = builder.build().unwrap();
/// let value: Svc<i32> = injector.get().unwrap();
/// let missing: Option<Svc<u8>> = injector.get().unwrap();
///
/// assert_eq!(8, *value);
/// assert!(missing.is_none());
/// ```
pub trait Request: Sized {
    /// The key this request resolves, or `None` if no key can be formed.
    fn key() -> Option<Key>;

    /// Whether the request can be satisfied without a bound value.
    fn has_default() -> bool {
        false
    }

    /// Converts the value provisioned for `key` into this request.
    fn from_value(key: &Key, value: Option<DynSvc>) -> InjectResult<Self>;

    /// Performs the request to the injector.
    fn request(injector: &Injector) -> InjectResult<Self> {
        let key = Self::key().ok_or_else(|| {
            InjectError::InternalError(format!(
                "{} cannot be requested by key",
                std::any::type_name::<Self>()
            ))
        })?;

        let value = injector.try_provide(&key)?;
        Self::from_value(&key, value)
    }
}

/// Requests a service pointer to the value bound to the service's key.
impl<T: Service> Request for Svc<T> {
    fn key() -> Option<Key> {
        Some(Key::of::<T>())
    }

    fn from_value(key: &Key, value: Option<DynSvc>) -> InjectResult<Self> {
        let value =
            value.ok_or_else(|| InjectError::UnboundKey { key: key.clone() })?;
        downcast(key, value)
    }
}

/// Requests every contribution to an array key.
impl<T: Service> Request for Vec<Svc<T>> {
    fn key() -> Option<Key> {
        Some(Key::array_of::<T>())
    }

    fn from_value(key: &Key, value: Option<DynSvc>) -> InjectResult<Self> {
        let value =
            value.ok_or_else(|| InjectError::UnboundKey { key: key.clone() })?;
        let elements: Svc<Vec<DynSvc>> = downcast(key, value)?;
        let element_key = key.element();
        elements
            .iter()
            .map(|element| downcast(&element_key, element.clone()))
            .collect()
    }
}

/// Requests a value if it is bound.
impl<R: Request> Request for Option<R> {
    fn key() -> Option<Key> {
        R::key()
    }

    fn has_default() -> bool {
        true
    }

    fn from_value(key: &Key, value: Option<DynSvc>) -> InjectResult<Self> {
        match value {
            Some(value) => R::from_value(key, Some(value)).map(Some),
            None => Ok(None),
        }
    }
}

/// Requests the injector performing the request.
impl Request for Injector {
    fn key() -> Option<Key> {
        Some(Key::of::<Injector>())
    }

    fn from_value(key: &Key, value: Option<DynSvc>) -> InjectResult<Self> {
        let injector: Svc<Injector> = Svc::<Injector>::from_value(key, value)?;
        Ok(Injector::clone(&injector))
    }
}

/// A request for a key tagged with the marker type `M`.
///
/// ```
/// use keyed_injector::{bind_const, Injector, Svc, Tag, Tagged};
///
/// struct Backup;
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(String::from("primary"))).unwrap();
/// builder
///     .bind(bind_const(String::from("backup")).tag(Tag::marker::<Backup>()))
///     .unwrap();
///
/// let injector = builder.build().unwrap();
/// let backup: Tagged<Svc<String>, Backup> = injector.get().unwrap();
/// assert_eq!("backup", backup.as_str());
/// ```
pub struct Tagged<R, M> {
    inner: R,
    marker: PhantomData<fn() -> M>,
}

impl<R, M> Tagged<R, M> {
    /// Wraps a request result.
    pub fn new(inner: R) -> Self {
        Tagged {
            inner,
            marker: PhantomData,
        }
    }

    /// Unwraps the request result.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R, M> Deref for Tagged<R, M> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<R, M> DerefMut for Tagged<R, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<R: Request, M: Any> Request for Tagged<R, M> {
    fn key() -> Option<Key> {
        R::key().map(|key| key.with_tag(Tag::marker::<M>()))
    }

    fn has_default() -> bool {
        R::has_default()
    }

    fn from_value(key: &Key, value: Option<DynSvc>) -> InjectResult<Self> {
        R::from_value(key, value).map(Tagged::new)
    }
}

macro_rules! impl_tuple_request {
    () => {};
    ($first:ident $(, $rest:ident)*) => {
        impl_tuple_request!(@impl $first $(, $rest)*);
        impl_tuple_request!($($rest),*);
    };
    (@impl $($type_name:ident),+) => {
        /// Performs each request in order. Tuples have no key, so they can't
        /// be parameters of an injection target.
        impl<$($type_name: Request),+> Request for ($($type_name,)+) {
            fn key() -> Option<Key> {
                None
            }

            fn from_value(key: &Key, _value: Option<DynSvc>) -> InjectResult<Self> {
                Err(InjectError::InternalError(format!(
                    "a tuple cannot be created from the value of {}",
                    key
                )))
            }

            fn request(injector: &Injector) -> InjectResult<Self> {
                Ok(($($type_name::request(injector)?,)+))
            }
        }
    };
}

impl_tuple_request!(T0, T1, T2, T3, T4, T5, T6, T7);

fn downcast<T: Service>(key: &Key, value: DynSvc) -> InjectResult<Svc<T>> {
    value
        .downcast()
        .map_err(|_| InjectError::TypeMismatch { key: key.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind_const;

    struct Primary;

    #[test]
    fn unbound_request_fails() {
        let injector = Injector::builder().build().unwrap();
        match injector.get::<Svc<i32>>() {
            Err(InjectError::UnboundKey { key }) if key == Key::of::<i32>() => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("nothing is bound"),
        }
    }

    #[test]
    fn optional_request_is_none_when_unbound() {
        let injector = Injector::builder().build().unwrap();
        let value: Option<Svc<i32>> = injector.get().unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn tagged_request_uses_tagged_key() {
        let mut builder = Injector::builder();
        builder.bind(bind_const(1i32)).unwrap();
        builder
            .bind(bind_const(2i32).tag(Tag::marker::<Primary>()))
            .unwrap();

        let injector = builder.build().unwrap();
        let untagged: Svc<i32> = injector.get().unwrap();
        let tagged: Tagged<Svc<i32>, Primary> = injector.get().unwrap();

        assert_eq!(1, *untagged);
        assert_eq!(2, **tagged);
    }

    #[test]
    fn array_request_downcasts_each_element() {
        let mut builder = Injector::builder();
        builder.bind(bind_const(1i32).array(true)).unwrap();
        builder.bind(bind_const(2i32).array(true)).unwrap();

        let injector = builder.build().unwrap();
        let values: Vec<Svc<i32>> = injector.get().unwrap();
        let values: Vec<i32> = values.into_iter().map(|value| *value).collect();
        assert_eq!(vec![1, 2], values);
    }

    #[test]
    fn tuple_request_performs_each_request() {
        let mut builder = Injector::builder();
        builder.bind(bind_const(1i32)).unwrap();

        let injector = builder.build().unwrap();
        let (value, missing, itself): (Svc<i32>, Option<Svc<u8>>, Injector) =
            injector.get().unwrap();
        assert_eq!(1, *value);
        assert!(missing.is_none());
        let _: Svc<i32> = itself.get().unwrap();
    }

    #[test]
    fn mismatched_value_is_reported() {
        let value: DynSvc = Svc::new(1i32);
        match <Svc<u8>>::from_value(&Key::of::<u8>(), Some(value)) {
            Err(InjectError::TypeMismatch { key }) if key == Key::of::<u8>() => {
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("value is not a u8"),
        }
    }
}
