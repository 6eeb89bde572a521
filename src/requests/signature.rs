use crate::{
    sync::{Container, ContainerEx},
    InjectResult, Parameter, ServiceFactory, Svc,
};
use std::{any::TypeId, collections::HashMap};

/// Caches the parameters of injection targets by target type. The number of
/// entries is bounded by the number of target types in the program.
pub(crate) struct SignatureCache {
    signatures: Container<HashMap<TypeId, Svc<[Parameter]>>>,
}

impl Default for SignatureCache {
    fn default() -> Self {
        SignatureCache {
            signatures: ContainerEx::new(HashMap::new()),
        }
    }
}

impl SignatureCache {
    pub fn parameters<D, F>(&self) -> InjectResult<Svc<[Parameter]>>
    where
        F: ServiceFactory<D>,
    {
        let id = TypeId::of::<F>();
        if let Some(parameters) =
            self.signatures.with_inner(|signatures| signatures.get(&id).cloned())
        {
            return Ok(parameters);
        }

        // Failures are not cached, the target is inspected again next time
        let parameters: Svc<[Parameter]> = F::parameters()?.into();
        Ok(self.signatures.with_inner_mut(|signatures| {
            signatures.entry(id).or_insert(parameters).clone()
        }))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.signatures.with_inner(HashMap::len)
    }
}
