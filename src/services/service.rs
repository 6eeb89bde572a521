#![allow(clippy::used_underscore_binding)]

use crate::Key;
use derive_more::Display;
use std::{
    any::{Any, TypeId},
    error::Error,
    sync::Arc,
};

#[cfg(feature = "arc")]
mod types {
    use crate::InjectError;
    use std::{
        any::Any,
        sync::{Arc, Weak},
    };

    /// A reference-counted pointer holding a service. The pointer type is
    /// determined by the feature flags passed to this crate.
    pub type Svc<T> = Arc<T>;

    /// A weak counterpart to [`Svc<T>`].
    pub type WeakSvc<T> = Weak<T>;

    /// A reference-counted service pointer holding an instance of `dyn Any`.
    pub type DynSvc = Arc<dyn Any + Send + Sync>;

    /// A result from attempting to inject dependencies into a service and
    /// construct an instance of it.
    pub type InjectResult<T> = Result<T, InjectError>;

    /// Implemented automatically on types that are capable of being a service.
    pub trait Service: Any + Send + Sync {}
    impl<T: ?Sized + Any + Send + Sync> Service for T {}
}

#[cfg(feature = "rc")]
mod types {
    use crate::InjectError;
    use std::{
        any::Any,
        rc::{Rc, Weak},
    };

    /// A reference-counted pointer holding a service. The pointer type is
    /// determined by the feature flags passed to this crate.
    pub type Svc<T> = Rc<T>;

    /// A weak counterpart to [`Svc<T>`].
    pub type WeakSvc<T> = Weak<T>;

    /// A reference-counted service pointer holding an instance of `dyn Any`.
    pub type DynSvc = Rc<dyn Any>;

    /// A result from attempting to inject dependencies into a service and
    /// construct an instance of it.
    pub type InjectResult<T> = Result<T, InjectError>;

    /// Implemented automatically on types that are capable of being a service.
    pub trait Service: Any {}
    impl<T: ?Sized + Any> Service for T {}
}

pub use types::*;

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// An error that can be returned by the injector, the binder or the provider
/// map compiler. Errors are cheap to clone, so a failed provisioning can be
/// reported to every caller of the same request.
#[derive(Clone, Debug, Display)]
#[non_exhaustive]
pub enum InjectError {
    /// No binding exists for the requested key, neither in the injector nor
    /// in any of its parents.
    #[display(fmt = "{} is not bound", key)]
    UnboundKey { key: Key },

    /// More than one binding was given for a key that is not an array key,
    /// or two contributions to a map multibinding share the same map key.
    #[display(fmt = "{} is bound more than once", key)]
    DuplicateKey { key: Key },

    /// A key was requested again while it was still being provisioned.
    #[display(
        fmt = "a cycle was detected while provisioning {} [{}]",
        key,
        "fmt_cycle(cycle)"
    )]
    CyclicDependency { key: Key, cycle: Vec<Key> },

    /// A scoped key was requested while its scope was not open.
    #[display(fmt = "scope {} is not open", "scope.name()")]
    ScopeNotOpen { scope: ServiceInfo },

    /// A scope was entered while it was already open.
    #[display(fmt = "scope {} is already open", "scope.name()")]
    ScopeAlreadyOpen { scope: ServiceInfo },

    /// The seeds given when entering a scope don't match the seed keys
    /// declared for it.
    #[display(
        fmt = "scope {} expects seeds [{}] but was given [{}]",
        "scope.name()",
        "fmt_keys(expected)",
        "fmt_keys(provided)"
    )]
    InvalidScopeSeeds {
        scope: ServiceInfo,
        expected: Vec<Key>,
        provided: Vec<Key>,
    },

    /// A binding declaration is malformed.
    #[display(fmt = "invalid binding: {}", reason)]
    InvalidBinding { reason: String },

    /// A parameter of an injection target can't be resolved to a key, or an
    /// explicit argument doesn't fit the target's signature.
    #[display(fmt = "invalid parameter {} of {}: {}", parameter, target, reason)]
    InvalidParameter {
        target: &'static str,
        parameter: String,
        reason: &'static str,
    },

    /// The value provided for a key could not be converted to the requested
    /// type.
    #[display(fmt = "the value provided for {} has the wrong type", key)]
    TypeMismatch { key: Key },

    /// A fallible factory returned an error while creating a service.
    #[display(
        fmt = "an error occurred during activation of {}: {}",
        "service_info.name()",
        inner
    )]
    ActivationFailed {
        service_info: ServiceInfo,
        inner: Arc<dyn Error + Send + Sync + 'static>,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(
        fmt = "an unexpected error occurred (please report this): {}",
        _0
    )]
    InternalError(String),
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::ActivationFailed { inner, .. } => Some(&**inner),
            _ => None,
        }
    }
}

fn fmt_cycle(cycle: &[Key]) -> String {
    let mut joined = String::new();
    for item in cycle {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(&item.to_string());
    }
    joined
}

fn fmt_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::{self, Display, Formatter};

    #[derive(Debug)]
    struct Broken;

    impl Display for Broken {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "broken")
        }
    }

    impl Error for Broken {}

    #[test]
    fn activation_failure_exposes_source() {
        let error = InjectError::ActivationFailed {
            service_info: ServiceInfo::of::<i32>(),
            inner: Arc::new(Broken),
        };

        let source = error.source().unwrap();
        assert_eq!("broken", source.to_string());
        assert!(error.to_string().contains("i32"));
    }

    #[test]
    fn cycle_is_formatted_in_order() {
        let error = InjectError::CyclicDependency {
            key: Key::of::<u8>(),
            cycle: vec![Key::of::<u8>(), Key::of::<u16>(), Key::of::<u8>()],
        };

        assert_eq!(
            "a cycle was detected while provisioning u8 [u8 -> u16 -> u8]",
            error.to_string()
        );
    }
}
