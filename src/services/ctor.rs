use crate::{
    Arguments, InjectResult, Injector, Parameter, Service, ServiceFactory, Svc,
    TypedProvider,
};
use std::marker::PhantomData;

/// A type that the injector can construct by resolving its parameters. This
/// is usually implemented with [`injectable!`](crate::injectable), which uses
/// the names of a struct's fields as parameter names.
///
/// It can also be implemented by hand, for example to give a parameter a
/// default value:
///
/// ```
/// use keyed_injector::{
///     bind_type, Arguments, InjectResult, Injectable, Injector, Key, Parameter, Svc,
/// };
///
/// struct Port(u16);
///
/// impl Injectable for Port {
///     fn parameters() -> InjectResult<Vec<Parameter>> {
///         Ok(vec![Parameter::new("port", Key::of::<u16>()).with_default()])
///     }
///
///     fn construct(mut arguments: Arguments) -> InjectResult<Self> {
///         let port: Option<Svc<u16>> = arguments.extract("port")?;
///         Ok(Port(port.map_or(8080, |port| *port)))
///     }
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_type::<Port>()).unwrap();
///
/// let injector = builder.build().unwrap();
/// let port: Svc<Port> = injector.get().unwrap();
/// assert_eq!(8080, port.0);
/// ```
pub trait Injectable: Service + Sized {
    /// The parameters needed to construct this type.
    fn parameters() -> InjectResult<Vec<Parameter>>;

    /// Constructs this type from its arguments. Arguments for parameters with
    /// a default may be missing.
    fn construct(arguments: Arguments) -> InjectResult<Self>;
}

/// The constructor of an [`Injectable`] type as a [`ServiceFactory`].
pub struct Constructor<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> Constructor<T> {
    /// Creates the constructor of `T`.
    #[must_use]
    pub fn new() -> Self {
        Constructor {
            marker: PhantomData,
        }
    }
}

impl<T> Default for Constructor<T> {
    fn default() -> Self {
        Constructor::new()
    }
}

impl<T: Injectable> ServiceFactory<Constructor<T>> for Constructor<T> {
    type Result = T;

    fn parameters() -> InjectResult<Vec<Parameter>> {
        T::parameters()
    }

    fn invoke(&self, arguments: Arguments) -> InjectResult<Self::Result> {
        T::construct(arguments)
    }
}

/// A provider that constructs a new instance of an [`Injectable`] type each
/// time its key is requested.
pub struct CtorProvider<T> {
    constructor: Constructor<T>,
}

impl<T> CtorProvider<T> {
    /// Creates a new [`CtorProvider`].
    #[must_use]
    pub fn new() -> Self {
        CtorProvider {
            constructor: Constructor::new(),
        }
    }
}

impl<T> Default for CtorProvider<T> {
    fn default() -> Self {
        CtorProvider::new()
    }
}

impl<T: Injectable> TypedProvider for CtorProvider<T> {
    type Result = T;

    fn provide_typed(
        &self,
        injector: &Injector,
    ) -> InjectResult<Svc<Self::Result>> {
        injector
            .inject(&self.constructor, Vec::new(), Arguments::new())
            .map(Svc::new)
    }
}

/// Implements [`Injectable`] for structs with named fields. Every field must
/// be a [`Request`](crate::Request), and the field's name is the name of the
/// parameter.
///
/// ```
/// use keyed_injector::{bind_const, bind_type, injectable, Injector, Svc};
///
/// struct Config {
///     url: String,
/// }
///
/// struct Client {
///     config: Svc<Config>,
///     retries: Option<Svc<u32>>,
/// }
///
/// injectable! {
///     Client {
///         config: Svc<Config>,
///         retries: Option<Svc<u32>>,
///     }
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(Config { url: "localhost".into() })).unwrap();
/// builder.bind(bind_type::<Client>()).unwrap();
///
/// let injector = builder.build().unwrap();
/// let client: Svc<Client> = injector.get().unwrap();
/// assert_eq!("localhost", client.config.url);
/// assert!(client.retries.is_none());
/// ```
#[macro_export]
macro_rules! injectable {
    {
        $(
            $(#[$attr:meta])*
            $name:ident {
                $($field:ident : $field_type:ty),*
                $(,)?
            }
        )*
    } => {
        $(
            $(#[$attr])*
            impl $crate::Injectable for $name {
                #[allow(clippy::vec_init_then_push)]
                fn parameters() -> $crate::InjectResult<::std::vec::Vec<$crate::Parameter>> {
                    let target = ::std::any::type_name::<Self>();
                    #[allow(unused_mut)]
                    let mut parameters = ::std::vec::Vec::new();
                    $(
                        parameters.push($crate::Parameter::of::<$field_type>(
                            ::std::stringify!($field),
                            target,
                        )?);
                    )*
                    ::std::result::Result::Ok(parameters)
                }

                #[allow(unused_mut, unused_variables)]
                fn construct(
                    mut arguments: $crate::Arguments,
                ) -> $crate::InjectResult<Self> {
                    ::std::result::Result::Ok($name {
                        $($field: arguments.extract(::std::stringify!($field))?,)*
                    })
                }
            }
        )*
    };
}
