use crate::{
    InjectError, InjectResult, Key, Scope, ScopeState, ServiceInfo, Svc,
};
use std::{
    cell::RefCell,
    collections::HashMap,
    marker::PhantomData,
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_CONTEXT_SCOPE_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static STATES: RefCell<HashMap<usize, Svc<ScopeState>>> =
        RefCell::new(HashMap::new());
}

/// A scope with one open state per thread. Threads enter and exit the scope
/// independently, and each sees only the state it opened.
///
/// Entering the scope again on a thread where it is already open fails with
/// [`InjectError::ScopeAlreadyOpen`].
pub struct ContextScope<M> {
    id: usize,
    seed_keys: Vec<Key>,
    marker: PhantomData<fn() -> M>,
}

impl<M: 'static> Scope for ContextScope<M> {
    fn new(seed_keys: Vec<Key>) -> Self {
        ContextScope {
            id: NEXT_CONTEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            seed_keys,
            marker: PhantomData,
        }
    }

    fn seed_keys(&self) -> &[Key] {
        &self.seed_keys
    }

    fn state(&self) -> InjectResult<Svc<ScopeState>> {
        STATES
            .with(|states| states.borrow().get(&self.id).cloned())
            .ok_or(InjectError::ScopeNotOpen {
                scope: ServiceInfo::of::<Self>(),
            })
    }

    fn open(&self, state: Svc<ScopeState>) -> InjectResult<()> {
        STATES.with(|states| {
            let mut states = states.borrow_mut();
            if states.contains_key(&self.id) {
                return Err(InjectError::ScopeAlreadyOpen {
                    scope: ServiceInfo::of::<Self>(),
                });
            }

            states.insert(self.id, state);
            Ok(())
        })
    }

    fn close(&self) {
        let _ = STATES.try_with(|states| {
            states.borrow_mut().remove(&self.id);
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bind_fn, bind_scope, bind_scope_seed, bindings, ContextScope,
        InjectError, Injector, Key, Seeds, Svc,
    };

    struct Task;
    type TaskScope = ContextScope<Task>;

    struct TaskId(u32);
    struct Workspace(u32);

    fn injector() -> Injector {
        let bindings = bindings![
            bind_scope::<TaskScope>(),
            bind_scope_seed::<TaskScope>(Key::of::<TaskId>()),
            bind_fn(|id: Svc<TaskId>| Workspace(id.0)).in_scope::<TaskScope>(),
        ]
        .unwrap();
        Injector::new(&bindings, None).unwrap()
    }

    #[test]
    fn sequential_states_are_isolated() {
        let injector = injector();
        for id in [1, 2] {
            let workspace = injector
                .with_scope::<TaskScope, _, _>(
                    Seeds::new().with(TaskId(id)),
                    |injector| injector.get::<Svc<Workspace>>(),
                )
                .unwrap();
            assert_eq!(id, workspace.0);
        }
    }

    #[test]
    fn scope_is_open_per_thread_only() {
        let injector = injector();
        let _guard = injector
            .enter_scope::<TaskScope>(Seeds::new().with(TaskId(1)))
            .unwrap();

        match injector.enter_scope::<TaskScope>(Seeds::new().with(TaskId(2))) {
            Err(InjectError::ScopeAlreadyOpen { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("scope is already open on this thread"),
        }
    }

    #[cfg(feature = "arc")]
    #[test]
    fn threads_have_independent_states() {
        use std::thread;

        let injector = injector();
        let _guard = injector
            .enter_scope::<TaskScope>(Seeds::new().with(TaskId(1)))
            .unwrap();

        let other = injector.clone();
        let handle = thread::spawn(move || {
            let closed = other.get::<Svc<Workspace>>();
            assert!(matches!(closed, Err(InjectError::ScopeNotOpen { .. })));

            other
                .with_scope::<TaskScope, _, _>(
                    Seeds::new().with(TaskId(2)),
                    |injector| injector.get::<Svc<Workspace>>(),
                )
                .map(|workspace| workspace.0)
                .unwrap()
        });

        assert_eq!(2, handle.join().unwrap());
        let workspace: Svc<Workspace> = injector.get().unwrap();
        assert_eq!(1, workspace.0);
    }
}
