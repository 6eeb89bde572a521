use crate::{
    sync::{Container, ContainerEx},
    InjectError, InjectResult, Key, Scope, ScopeState, ServiceInfo, Svc,
};
use std::marker::PhantomData;

/// A scope with at most one open state. Entering it while it is open fails
/// with [`InjectError::ScopeAlreadyOpen`].
///
/// The marker type `M` only distinguishes scopes from each other. Entering
/// the scope from several threads needs external synchronization.
pub struct ExclusiveScope<M> {
    seed_keys: Vec<Key>,
    state: Container<Option<Svc<ScopeState>>>,
    marker: PhantomData<fn() -> M>,
}

impl<M: 'static> Scope for ExclusiveScope<M> {
    fn new(seed_keys: Vec<Key>) -> Self {
        ExclusiveScope {
            seed_keys,
            state: ContainerEx::new(None),
            marker: PhantomData,
        }
    }

    fn seed_keys(&self) -> &[Key] {
        &self.seed_keys
    }

    fn state(&self) -> InjectResult<Svc<ScopeState>> {
        self.state
            .with_inner(Option::clone)
            .ok_or(InjectError::ScopeNotOpen {
                scope: ServiceInfo::of::<Self>(),
            })
    }

    fn open(&self, state: Svc<ScopeState>) -> InjectResult<()> {
        self.state.with_inner_mut(|current| {
            if current.is_some() {
                return Err(InjectError::ScopeAlreadyOpen {
                    scope: ServiceInfo::of::<Self>(),
                });
            }

            *current = Some(state);
            Ok(())
        })
    }

    fn close(&self) {
        self.state.with_inner_mut(|current| *current = None);
    }
}
