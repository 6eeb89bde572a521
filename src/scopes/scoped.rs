use crate::{
    scopes::ScopeBinding, DynSvc, InjectError, InjectResult, Injector, Key,
    Provider, Scope, ScopeSeed, ServiceInfo, Svc, TypedProvider,
};
use std::{
    marker::PhantomData,
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_SCOPED_ID: AtomicUsize = AtomicUsize::new(0);

/// Creates a value at most once per open state of a scope. Concurrent
/// requests within the same state receive the same value.
pub struct ScopedProvider {
    id: usize,
    scope: ScopeBinding,
    inner: Svc<dyn Provider>,
}

impl ScopedProvider {
    pub(crate) fn new(scope: ScopeBinding, inner: Svc<dyn Provider>) -> Self {
        ScopedProvider {
            id: NEXT_SCOPED_ID.fetch_add(1, Ordering::Relaxed),
            scope,
            inner,
        }
    }
}

impl Provider for ScopedProvider {
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        let state = self.scope.state(injector)?;
        state.provision(self.id, || self.inner.provide(injector))
    }
}

/// Provides the seed given for a key when its scope was entered.
pub struct ScopeSeedProvider {
    scope: ScopeBinding,
    key: Key,
}

impl ScopeSeedProvider {
    pub(crate) fn new(scope: ScopeBinding, key: Key) -> Self {
        ScopeSeedProvider { scope, key }
    }
}

impl Provider for ScopeSeedProvider {
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        self.scope
            .state(injector)?
            .seed(&self.key)
            .ok_or_else(|| InjectError::UnboundKey {
                key: self.key.clone(),
            })
    }
}

/// Creates a scope with the seed keys declared for it.
pub struct ScopeProvider<S> {
    marker: PhantomData<fn() -> S>,
}

impl<S> ScopeProvider<S> {
    pub(crate) fn new() -> Self {
        ScopeProvider {
            marker: PhantomData,
        }
    }
}

impl<S: Scope> TypedProvider for ScopeProvider<S> {
    type Result = S;

    fn provide_typed(
        &self,
        injector: &Injector,
    ) -> InjectResult<Svc<Self::Result>> {
        let seeds: Option<Vec<Svc<ScopeSeed>>> = injector.get()?;
        let scope = ServiceInfo::of::<S>();
        let seed_keys = seeds
            .unwrap_or_default()
            .iter()
            .filter(|seed| seed.scope() == scope)
            .map(|seed| seed.key().clone())
            .collect();

        Ok(Svc::new(S::new(seed_keys)))
    }
}
