use crate::{
    sync::SlotMap, Binding, Bindings, ConstantProvider, DynSvc, InjectError,
    InjectResult, Injector, Key, Provider, Service, ServiceInfo, Svc,
};
use std::{collections::HashMap, marker::PhantomData};
use tracing::debug;

/// A stateful memoization boundary. While a scope is open, bindings declared
/// with [`Binder::in_scope`](crate::Binder::in_scope) are created at most once
/// per open state, and the scope's seed keys resolve to the seeds given when
/// the scope was entered.
///
/// A scope is bound with [`bind_scope`] and entered with
/// [`Injector::enter_scope`]. The two implementations differ in how many
/// states may be open at once: [`ExclusiveScope`](crate::ExclusiveScope)
/// has at most one, while [`ContextScope`](crate::ContextScope) has at most
/// one per thread.
pub trait Scope: Service + Sized {
    /// Creates the scope with the keys it must be seeded with.
    fn new(seed_keys: Vec<Key>) -> Self;

    /// The keys the scope must be seeded with when it is entered.
    fn seed_keys(&self) -> &[Key];

    /// The open state of this scope.
    fn state(&self) -> InjectResult<Svc<ScopeState>>;

    /// Opens a state. Fails if a state is already open.
    fn open(&self, state: Svc<ScopeState>) -> InjectResult<()>;

    /// Discards the open state, if any.
    fn close(&self);
}

/// The values of one open scope: the seeds it was entered with, and
/// everything created for it so far.
pub struct ScopeState {
    scope: ServiceInfo,
    seeds: HashMap<Key, DynSvc>,
    provisions: SlotMap<usize>,
}

impl ScopeState {
    /// The scope this state belongs to.
    #[must_use]
    pub fn scope(&self) -> ServiceInfo {
        self.scope
    }

    /// The seed given for a key.
    #[must_use]
    pub fn seed(&self, key: &Key) -> Option<DynSvc> {
        self.seeds.get(key).cloned()
    }

    pub(crate) fn provision<F>(&self, id: usize, init: F) -> InjectResult<DynSvc>
    where
        F: FnOnce() -> InjectResult<DynSvc>,
    {
        self.provisions.get_or_try_init(id, init)
    }
}

/// The values a scope is entered with.
///
/// ```
/// use keyed_injector::{Key, Seeds};
///
/// let seeds = Seeds::new().with(42u64).with(String::from("admin"));
/// assert!(seeds.contains(&Key::of::<u64>()));
/// ```
#[derive(Clone, Default)]
pub struct Seeds {
    values: HashMap<Key, DynSvc>,
}

impl Seeds {
    /// Creates an empty set of seeds.
    #[must_use]
    pub fn new() -> Self {
        Seeds::default()
    }

    /// Seeds the untagged key of `T`.
    #[must_use]
    pub fn with<T: Service>(mut self, value: T) -> Self {
        self.insert(Key::of::<T>(), Svc::new(value));
        self
    }

    /// Seeds a key with a type-erased value.
    pub fn insert(&mut self, key: Key, value: DynSvc) -> Option<DynSvc> {
        self.values.insert(key, value)
    }

    /// Whether a key is seeded.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.values.contains_key(key)
    }

    /// The seeded keys.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.values.keys()
    }
}

/// Keeps a scope open until dropped. The state is discarded however the
/// guarded code exits.
///
/// Guards can't be sent to another thread, so that a
/// [`ContextScope`](crate::ContextScope) is always closed on the thread that
/// opened it.
#[must_use = "the scope is closed when the guard is dropped"]
pub struct ScopeGuard<S: Scope> {
    scope: Svc<S>,
    state: Svc<ScopeState>,
    marker: PhantomData<*const ()>,
}

impl<S: Scope> ScopeGuard<S> {
    /// The scope held open by this guard.
    #[must_use]
    pub fn scope(&self) -> &Svc<S> {
        &self.scope
    }

    /// The state opened by this guard.
    #[must_use]
    pub fn state(&self) -> &Svc<ScopeState> {
        &self.state
    }
}

impl<S: Scope> Drop for ScopeGuard<S> {
    fn drop(&mut self) {
        debug!(scope = ServiceInfo::of::<S>().name(), "exiting scope");
        self.scope.close();
    }
}

/// Opens a new state on a scope after checking the seeds against the scope's
/// seed keys.
pub(crate) fn enter<S: Scope>(
    scope: Svc<S>,
    seeds: Seeds,
) -> InjectResult<ScopeGuard<S>> {
    let expected = scope.seed_keys();
    let matches = seeds.values.len() == expected.len()
        && expected.iter().all(|key| seeds.contains(key));
    if !matches {
        return Err(InjectError::InvalidScopeSeeds {
            scope: ServiceInfo::of::<S>(),
            expected: expected.to_vec(),
            provided: seeds.keys().cloned().collect(),
        });
    }

    let state = Svc::new(ScopeState {
        scope: ServiceInfo::of::<S>(),
        seeds: seeds.values,
        provisions: SlotMap::default(),
    });
    scope.open(state.clone())?;

    debug!(scope = ServiceInfo::of::<S>().name(), "entered scope");
    Ok(ScopeGuard {
        scope,
        state,
        marker: PhantomData,
    })
}

/// How a scoped provider finds the open state of its scope.
#[derive(Clone, Copy)]
pub(crate) struct ScopeBinding {
    scope: ServiceInfo,
    state: fn(&Injector) -> InjectResult<Svc<ScopeState>>,
}

impl ScopeBinding {
    pub fn of<S: Scope>() -> Self {
        ScopeBinding {
            scope: ServiceInfo::of::<S>(),
            state: state_of::<S>,
        }
    }

    pub fn scope(&self) -> ServiceInfo {
        self.scope
    }

    pub fn state(&self, injector: &Injector) -> InjectResult<Svc<ScopeState>> {
        (self.state)(injector)
    }
}

fn state_of<S: Scope>(injector: &Injector) -> InjectResult<Svc<ScopeState>> {
    let scope: Svc<S> = injector.get()?;
    scope.state()
}

/// Declares that a key is seeded when the scope `S` is entered.
#[derive(Clone, Debug)]
pub struct ScopeSeed {
    scope: ServiceInfo,
    key: Key,
}

impl ScopeSeed {
    /// The scope the key is seeded for.
    #[must_use]
    pub fn scope(&self) -> ServiceInfo {
        self.scope
    }

    /// The seeded key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }
}

/// Binds the scope `S` as a singleton. Its seed keys are every key declared
/// with [`bind_scope_seed`] for `S`.
#[must_use]
pub fn bind_scope<S: Scope>() -> Binding {
    let provider: Svc<dyn Provider> = Svc::new(crate::SingletonProvider::new(
        Svc::new(crate::ScopeProvider::<S>::new()),
    ));
    Binding::new(Key::of::<S>(), provider)
}

/// Binds `key` to the seed given when the scope `S` is entered, and adds the
/// key to the seed keys of `S`.
///
/// ```
/// use keyed_injector::{
///     bind_fn, bind_scope, bind_scope_seed, bindings, ExclusiveScope, Injector, Key,
///     Seeds, Svc,
/// };
///
/// struct Request;
/// type RequestScope = ExclusiveScope<Request>;
///
/// struct UserId(u64);
///
/// let bindings = bindings![
///     bind_scope::<RequestScope>(),
///     bind_scope_seed::<RequestScope>(Key::of::<UserId>()),
///     bind_fn(|user: Svc<UserId>| format!("user {}", user.0))
///         .in_scope::<RequestScope>(),
/// ]
/// .unwrap();
///
/// let injector = Injector::new(&bindings, None).unwrap();
/// let greeting = injector
///     .with_scope::<RequestScope, _, _>(Seeds::new().with(UserId(7)), |injector| {
///         injector.get::<Svc<String>>()
///     })
///     .unwrap();
/// assert_eq!("user 7", greeting.as_str());
/// ```
pub fn bind_scope_seed<S: Scope>(key: Key) -> InjectResult<Bindings> {
    if key.is_array() {
        return Err(InjectError::InvalidBinding {
            reason: format!("array key {} cannot be seeded", key),
        });
    }

    let scope = ScopeBinding::of::<S>();
    let seed = ScopeSeed {
        scope: scope.scope(),
        key: key.clone(),
    };

    let provider: Svc<dyn Provider> =
        Svc::new(crate::ScopeSeedProvider::new(scope, key.clone()));
    let marker: Svc<dyn Provider> = Svc::new(ConstantProvider::new(seed));
    Ok(Bindings::from(vec![
        Binding::new(key, provider).with_scope(scope.scope()),
        Binding::new(Key::array_of::<ScopeSeed>(), marker),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExclusiveScope;

    struct Job;

    #[test]
    fn seeds_must_match_seed_keys() {
        let scope = Svc::new(ExclusiveScope::<Job>::new(vec![Key::of::<u8>()]));

        let result = enter(scope.clone(), Seeds::new().with(1u16));
        match result {
            Err(InjectError::InvalidScopeSeeds {
                expected, provided, ..
            }) => {
                assert_eq!(vec![Key::of::<u8>()], expected);
                assert_eq!(vec![Key::of::<u16>()], provided);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("seeds should have been rejected"),
        }

        let guard = enter(scope, Seeds::new().with(1u8)).unwrap();
        let seed = guard.state().seed(&Key::of::<u8>()).unwrap();
        assert_eq!(Some(&1), seed.downcast_ref::<u8>());
    }

    #[test]
    fn extra_seeds_are_rejected() {
        let scope = Svc::new(ExclusiveScope::<Job>::new(Vec::new()));
        match enter(scope, Seeds::new().with(1u8)) {
            Err(InjectError::InvalidScopeSeeds { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("seeds should have been rejected"),
        }
    }

    #[test]
    fn dropping_guard_closes_scope() {
        let scope = Svc::new(ExclusiveScope::<Job>::new(Vec::new()));
        let guard = enter(scope.clone(), Seeds::new()).unwrap();
        assert!(scope.state().is_ok());

        drop(guard);
        match scope.state() {
            Err(InjectError::ScopeNotOpen { scope }) => {
                assert_eq!(ServiceInfo::of::<ExclusiveScope<Job>>(), scope);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("scope should have been closed"),
        }
    }
}
