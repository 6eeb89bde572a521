use crate::{
    Arguments, InjectError, InjectResult, Parameter, Service, ServiceFactory,
    ServiceInfo,
};
use std::{error::Error, marker::PhantomData, sync::Arc};

/// A service factory that may fail during service creation with a custom error
/// type. During activation failure, an instance of
/// [`InjectError::ActivationFailed`] is returned as an error.
pub struct FallibleServiceFactory<D, F> {
    inner: F,
    marker: PhantomData<fn(D)>,
}

impl<D, R, E, F> ServiceFactory<D> for FallibleServiceFactory<D, F>
where
    D: 'static,
    R: Service,
    E: Error + Send + Sync + 'static,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    type Result = R;

    fn parameters() -> InjectResult<Vec<Parameter>> {
        F::parameters()
    }

    fn invoke(&self, arguments: Arguments) -> InjectResult<Self::Result> {
        self.inner.invoke(arguments)?.map_err(|error| {
            InjectError::ActivationFailed {
                service_info: ServiceInfo::of::<R>(),
                inner: Arc::new(error),
            }
        })
    }
}

/// Defines a conversion into a fallible service factory. This trait is
/// automatically implemented for all service factories that return a
/// [`Result<T, E>`] with a type that implements [`Error`].
pub trait IntoFallible<D, R, E>: Sized
where
    R: Service,
    E: Error + Send + Sync + 'static,
{
    /// Marks a service factory as fallible, unwrapping its result.
    ///
    /// # Example
    ///
    /// ```
    /// use keyed_injector::{
    ///     bind_const, bind_fn, InjectError, InjectResult, Injector, IntoFallible, Svc,
    /// };
    /// use std::{
    ///     error::Error,
    ///     fmt::{Display, Formatter},
    /// };
    ///
    /// #[derive(Debug)]
    /// struct FooError;
    ///
    /// impl Error for FooError {}
    /// impl Display for FooError {
    ///     fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    ///         write!(f, "An error occurred while creating a Foo")
    ///     }
    /// }
    ///
    /// struct Foo(Svc<i32>);
    /// fn make_foo(_a: Svc<i32>) -> Result<Foo, FooError> {
    ///     Err(FooError)
    /// }
    ///
    /// let mut builder = Injector::builder();
    /// builder.bind(bind_fn(make_foo.fallible())).unwrap();
    /// builder.bind(bind_const(0i32)).unwrap();
    ///
    /// let injector = builder.build().unwrap();
    /// let foo_result: InjectResult<Svc<Foo>> = injector.get();
    /// match foo_result {
    ///     Err(InjectError::ActivationFailed { .. }) => {},
    ///     Err(error) => Err(error).unwrap(),
    ///     _ => unreachable!("activation should have failed"),
    /// }
    /// ```
    #[must_use]
    fn fallible(self) -> FallibleServiceFactory<D, Self>;
}

impl<D, R, E, F> IntoFallible<D, R, E> for F
where
    D: 'static,
    R: Service,
    E: Error + Send + Sync + 'static,
    F: ServiceFactory<D, Result = Result<R, E>>,
{
    fn fallible(self) -> FallibleServiceFactory<D, Self> {
        FallibleServiceFactory {
            inner: self,
            marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{bind_fn, InjectError, Injector, IntoFallible, ServiceInfo, Svc};
    use std::{
        error::Error,
        fmt::{self, Display, Formatter},
    };

    #[derive(Debug)]
    struct ParseError;

    impl Display for ParseError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "not a number")
        }
    }

    impl Error for ParseError {}

    fn parse() -> Result<u32, ParseError> {
        "abc".parse::<u32>().map_err(|_| ParseError)
    }

    fn parse_ok() -> Result<u64, ParseError> {
        Ok(7)
    }

    #[test]
    fn failure_is_reported_with_source() {
        let mut builder = Injector::builder();
        builder.bind(bind_fn(parse.fallible())).unwrap();

        let injector = builder.build().unwrap();
        match injector.get::<Svc<u32>>() {
            Err(error @ InjectError::ActivationFailed { .. }) => {
                assert_eq!("not a number", error.source().unwrap().to_string());
                match error {
                    InjectError::ActivationFailed { service_info, .. } => {
                        assert_eq!(ServiceInfo::of::<u32>(), service_info);
                    }
                    _ => unreachable!(),
                }
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("parsing should have failed"),
        }
    }

    #[test]
    fn success_is_unwrapped() {
        let mut builder = Injector::builder();
        builder.bind(bind_fn(parse_ok.fallible())).unwrap();

        let injector = builder.build().unwrap();
        let value: Svc<u64> = injector.get().unwrap();
        assert_eq!(7, *value);
    }
}
