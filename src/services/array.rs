use crate::{DynSvc, InjectResult, Injector, Provider, Svc};

/// Provides every contribution to an array key, in declaration order. The
/// value is a `Vec<DynSvc>`, which is requested as `Vec<Svc<T>>`.
#[derive(Default)]
pub struct ArrayProvider {
    elements: Vec<Svc<dyn Provider>>,
}

impl ArrayProvider {
    /// Creates a provider for the given element providers.
    #[must_use]
    pub fn new(elements: Vec<Svc<dyn Provider>>) -> Self {
        ArrayProvider { elements }
    }

    /// The element providers.
    #[must_use]
    pub fn elements(&self) -> &[Svc<dyn Provider>] {
        &self.elements
    }
}

impl Provider for ArrayProvider {
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        let values = self
            .elements
            .iter()
            .map(|element| element.provide(injector))
            .collect::<InjectResult<Vec<DynSvc>>>()?;
        Ok(Svc::new(values) as DynSvc)
    }
}
