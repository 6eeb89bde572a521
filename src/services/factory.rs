use crate::{
    Arguments, Binder, DynSvc, InjectResult, Injector, ServiceFactory, Svc,
    TypedProvider,
};
use std::marker::PhantomData;

/// Calls an injection target on demand, resolving the parameters not passed
/// explicitly from the injector that created the factory.
///
/// ```
/// use keyed_injector::{bind_const, bind_factory, Arguments, Factory, Injector, Svc};
///
/// type Connect = fn(Svc<String>, Svc<u16>) -> String;
///
/// fn connect(host: Svc<String>, port: Svc<u16>) -> String {
///     format!("{}:{}", host, port)
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(bind_const(String::from("localhost"))).unwrap();
/// builder.bind(bind_factory(connect as Connect)).unwrap();
///
/// let injector = builder.build().unwrap();
/// let factory: Svc<Factory<(Svc<String>, Svc<u16>), Connect>> =
///     injector.get().unwrap();
/// let address = factory
///     .create(Vec::new(), Arguments::new().with("1", 8080u16))
///     .unwrap();
/// assert_eq!("localhost:8080", address);
/// ```
pub struct Factory<D, F> {
    injector: Injector,
    target: Svc<F>,
    marker: PhantomData<fn(D)>,
}

impl<D, F> Factory<D, F>
where
    F: ServiceFactory<D>,
{
    /// Calls the target. Positional arguments fill the first parameters, and
    /// named arguments fill parameters by name.
    pub fn create(
        &self,
        positional: Vec<DynSvc>,
        named: Arguments,
    ) -> InjectResult<F::Result> {
        self.injector.inject(&*self.target, positional, named)
    }
}

/// Provides a [`Factory`] bound to the injector the provider is invoked with.
pub struct FactoryProvider<D, F> {
    target: Svc<F>,
    marker: PhantomData<fn(D)>,
}

impl<D, F> TypedProvider for FactoryProvider<D, F>
where
    D: 'static,
    F: ServiceFactory<D>,
{
    type Result = Factory<D, F>;

    fn provide_typed(
        &self,
        injector: &Injector,
    ) -> InjectResult<Svc<Self::Result>> {
        Ok(Svc::new(Factory {
            injector: injector.clone(),
            target: self.target.clone(),
            marker: PhantomData,
        }))
    }
}

/// Binds a [`Factory`] for an injection target, keyed by the factory's type.
pub fn bind_factory<D, F>(target: F) -> Binder
where
    D: 'static,
    F: ServiceFactory<D>,
{
    Binder::of::<Factory<D, F>>().to_provider(FactoryProvider {
        target: Svc::new(target),
        marker: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bind_const, InjectError};

    struct Greeting(String);

    fn greet(name: Svc<&'static str>, punctuation: Option<Svc<char>>) -> Greeting {
        let punctuation = punctuation.map_or('.', |punctuation| *punctuation);
        Greeting(format!("Hello, {}{}", name, punctuation))
    }

    type Greet = fn(Svc<&'static str>, Option<Svc<char>>) -> Greeting;
    type GreetFactory = Factory<(Svc<&'static str>, Option<Svc<char>>), Greet>;

    fn greet_bindings() -> InjectResult<Injector> {
        let mut builder = Injector::builder();
        builder.bind(bind_const('!'))?;
        builder.bind(bind_factory(greet as Greet))?;
        builder.build()
    }

    #[test]
    fn positional_arguments_fill_first_parameters() {
        let injector = greet_bindings().unwrap();
        let factory: Svc<GreetFactory> = injector.get().unwrap();

        let name: DynSvc = Svc::new("world");
        let greeting = factory.create(vec![name], Arguments::new()).unwrap();
        assert_eq!("Hello, world!", greeting.0);
    }

    #[test]
    fn unexpected_named_argument_is_rejected() {
        let injector = greet_bindings().unwrap();
        let factory: Svc<GreetFactory> = injector.get().unwrap();

        let named = Arguments::new().with("0", "world").with("nope", 1u8);
        match factory.create(Vec::new(), named) {
            Err(InjectError::InvalidParameter { parameter, .. }) => {
                assert_eq!("nope", parameter);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("unknown argument should have been rejected"),
        }
    }
}
