use crate::{DynSvc, InjectError, InjectResult, Key};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

thread_local! {
    /// The request currently active on this thread, per injector.
    static ACTIVE: RefCell<HashMap<usize, Rc<RequestState>>> =
        RefCell::new(HashMap::new());

    /// The keys currently being provisioned on this thread, across every
    /// injector, outermost first.
    static PATH: RefCell<Vec<Key>> = RefCell::new(Vec::new());
}

/// What one call tree has provisioned from one injector so far. Failures are
/// kept too: a key that failed once fails again for the rest of the request.
#[derive(Default)]
struct RequestState {
    seen: RefCell<HashSet<Key>>,
    provisions: RefCell<HashMap<Key, InjectResult<Option<DynSvc>>>>,
}

/// A handle to the request active for an injector on the current thread.
///
/// The outermost provisioning call on an injector creates the request. Every
/// nested call made while it is running reuses it, and the request is
/// discarded once the outermost call returns.
pub(crate) struct ActiveRequest {
    state: Rc<RequestState>,
    owner: Option<usize>,
}

impl ActiveRequest {
    pub fn enter(injector_id: usize) -> Self {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(state) = active.get(&injector_id) {
                return ActiveRequest {
                    state: state.clone(),
                    owner: None,
                };
            }

            let state = Rc::new(RequestState::default());
            active.insert(injector_id, state.clone());
            ActiveRequest {
                state,
                owner: Some(injector_id),
            }
        })
    }

    /// The outcome of provisioning a key earlier in this request.
    pub fn memoized(&self, key: &Key) -> Option<InjectResult<Option<DynSvc>>> {
        self.state.provisions.borrow().get(key).cloned()
    }

    /// Marks a key as being provisioned, failing if it was already entered
    /// during this request without completing.
    pub fn begin(&self, key: &Key) -> InjectResult<Provisioning> {
        if !self.state.seen.borrow_mut().insert(key.clone()) {
            return Err(InjectError::CyclicDependency {
                key: key.clone(),
                cycle: cycle_to(key),
            });
        }

        PATH.with(|path| path.borrow_mut().push(key.clone()));
        Ok(Provisioning { _private: () })
    }

    pub fn record(&self, key: &Key, result: InjectResult<Option<DynSvc>>) {
        self.state
            .provisions
            .borrow_mut()
            .insert(key.clone(), result);
    }
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        if let Some(injector_id) = self.owner {
            // The thread-local may already be gone during thread shutdown
            let _ = ACTIVE.try_with(|active| {
                active.borrow_mut().remove(&injector_id);
            });
        }
    }
}

/// Keeps a key on the dependency path until dropped. The key stays seen for
/// the rest of the request either way.
pub(crate) struct Provisioning {
    _private: (),
}

impl Drop for Provisioning {
    fn drop(&mut self) {
        let _ = PATH.try_with(|path| {
            path.borrow_mut().pop();
        });
    }
}

fn cycle_to(key: &Key) -> Vec<Key> {
    PATH.with(|path| {
        let path = path.borrow();
        let start = path.iter().rposition(|entry| entry == key).unwrap_or(0);
        let mut cycle = path[start..].to_vec();
        cycle.push(key.clone());
        cycle
    })
}
