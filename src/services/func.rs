use crate::{
    Arguments, InjectResult, Injector, Parameter, Service, Svc, TypedProvider,
};
use std::marker::PhantomData;

/// A factory for creating instances of a service. All functions of arity 12 or
/// less are automatically service factories if the arguments to that function
/// are valid requests and the return value is a valid service type.
///
/// Function parameters are named by position (`"0"`, `"1"`, ...), which is
/// how explicit arguments are passed to [`Injector::inject`].
///
/// ```
/// use keyed_injector::{bind_const, Arguments, Injector, Svc};
///
/// fn greet(greeting: Svc<String>, name: Svc<&'static str>) -> String {
///     format!("{}, {}!", greeting, name)
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(String::from("Hello"))).unwrap();
///
/// let injector = builder.build().unwrap();
/// let named = Arguments::new().with("1", "world");
/// let greeting = injector.inject(&greet, Vec::new(), named).unwrap();
/// assert_eq!("Hello, world!", greeting);
/// ```
///
/// # Type parameters
/// * `D` - Dependencies of this service as a tuple.
pub trait ServiceFactory<D>: Service {
    /// The resulting service from invoking this service factory.
    type Result: Service;

    /// The parameters of this factory, in call order.
    fn parameters() -> InjectResult<Vec<Parameter>>;

    /// Invokes this service factory with the arguments for its parameters.
    /// Arguments for parameters with a default may be missing.
    fn invoke(&self, arguments: Arguments) -> InjectResult<Self::Result>;
}

macro_rules! impl_provider_function {
    () => {
        impl_provider_function!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_provider_function!(@impl ($first $(, $rest)*));
        impl_provider_function!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl <F, R $(, $type_name)*> ServiceFactory<($($type_name,)*)> for F
        where
            F: Service + Fn($($type_name),*) -> R,
            R: Service,
            $($type_name: $crate::Request,)*
        {
            type Result = R;

            #[allow(unused_mut, unused_assignments, clippy::vec_init_then_push)]
            fn parameters() -> InjectResult<Vec<Parameter>> {
                let target = ::std::any::type_name::<F>();
                let mut index = 0_usize;
                let mut parameters = Vec::new();
                $(
                    parameters.push(Parameter::of::<$type_name>(index.to_string(), target)?);
                    index += 1;
                )*
                Ok(parameters)
            }

            #[allow(unused_variables, unused_mut, unused_assignments, non_snake_case)]
            fn invoke(&self, mut arguments: Arguments) -> InjectResult<R> {
                let mut index = 0_usize;
                $(
                    let $type_name: $type_name = arguments.extract(&index.to_string())?;
                    index += 1;
                )*
                Ok(self($($type_name),*))
            }
        }
    };
}

impl_provider_function!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

/// A provider that calls a function with injected arguments each time its
/// key is requested.
pub struct FnProvider<D, F>
where
    F: ServiceFactory<D>,
{
    factory: F,
    marker: PhantomData<fn(D)>,
}

impl<D, F> FnProvider<D, F>
where
    F: ServiceFactory<D>,
{
    /// Creates a new [`FnProvider`] from a service factory.
    #[must_use]
    pub fn new(factory: F) -> Self {
        FnProvider {
            factory,
            marker: PhantomData,
        }
    }
}

impl<D, F> TypedProvider for FnProvider<D, F>
where
    D: 'static,
    F: ServiceFactory<D>,
{
    type Result = F::Result;

    fn provide_typed(
        &self,
        injector: &Injector,
    ) -> InjectResult<Svc<Self::Result>> {
        let result = injector.inject(&self.factory, Vec::new(), Arguments::new())?;
        Ok(Svc::new(result))
    }
}

#[cfg(test)]
mod tests {
    use crate::{bind_const, bind_fn, InjectError, Injector, Key, Svc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    #[test]
    fn function_is_called_per_request() {
        let mut builder = Injector::builder();
        builder.bind(bind_const(Counter(AtomicUsize::new(0)))).unwrap();
        builder
            .bind(bind_fn(|counter: Svc<Counter>| {
                counter.0.fetch_add(1, Ordering::SeqCst)
            }))
            .unwrap();

        let injector = builder.build().unwrap();
        let first: Svc<usize> = injector.get().unwrap();
        let second: Svc<usize> = injector.get().unwrap();

        assert_eq!(0, *first);
        assert_eq!(1, *second);
    }

    #[test]
    fn missing_dependency_reports_dependency_key() {
        let mut builder = Injector::builder();
        builder.bind(bind_fn(|value: Svc<i32>| i64::from(*value))).unwrap();

        let injector = builder.build().unwrap();
        match injector.get::<Svc<i64>>() {
            Err(InjectError::UnboundKey { key }) if key == Key::of::<i32>() => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => unreachable!("dependency is not bound"),
        }
    }

    #[test]
    fn optional_dependency_defaults_to_none() {
        let mut builder = Injector::builder();
        builder
            .bind(bind_fn(|value: Option<Svc<i32>>| {
                value.map_or(-1_i64, |value| i64::from(*value))
            }))
            .unwrap();

        let injector = builder.build().unwrap();
        let value: Svc<i64> = injector.get().unwrap();
        assert_eq!(-1, *value);
    }
}
