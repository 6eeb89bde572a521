use crate::{DynSvc, InjectResult};

/// Interior-mutable storage shared behind a service pointer.
pub(crate) trait ContainerEx<T> {
    fn new(value: T) -> Self;
    fn with_inner<R, F: FnOnce(&T) -> R>(&self, f: F) -> R;
    fn with_inner_mut<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R;
}

#[cfg(feature = "rc")]
mod types {
    use super::ContainerEx;
    use crate::{DynSvc, InjectError, InjectResult};
    use std::cell::{OnceCell, RefCell};

    pub type Container<T> = RefCell<T>;

    pub type Once<T> = OnceCell<T>;

    impl<T> ContainerEx<T> for Container<T> {
        fn new(value: T) -> Self {
            RefCell::new(value)
        }

        fn with_inner<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
            f(&*self.borrow())
        }

        fn with_inner_mut<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
            f(&mut *self.borrow_mut())
        }
    }

    /// A memoized value that is created at most once.
    #[derive(Default)]
    pub struct Slot {
        value: RefCell<Option<DynSvc>>,
    }

    impl Slot {
        pub fn get(&self) -> Option<DynSvc> {
            self.value.borrow().clone()
        }

        pub fn get_or_try_init<F>(&self, init: F) -> InjectResult<DynSvc>
        where
            F: FnOnce() -> InjectResult<DynSvc>,
        {
            if let Some(value) = self.get() {
                return Ok(value);
            }

            let mut value = self.value.try_borrow_mut().map_err(|_| {
                InjectError::InternalError(
                    "memoized value was re-entered during its creation"
                        .to_owned(),
                )
            })?;

            if let Some(value) = value.as_ref() {
                return Ok(value.clone());
            }

            let created = init()?;
            *value = Some(created.clone());
            Ok(created)
        }
    }
}

#[cfg(feature = "arc")]
mod types {
    use super::ContainerEx;
    use crate::{DynSvc, InjectResult};
    use std::sync::{Mutex, OnceLock, PoisonError, RwLock};

    pub type Container<T> = Mutex<T>;

    pub type Once<T> = OnceLock<T>;

    impl<T> ContainerEx<T> for Container<T> {
        fn new(value: T) -> Self {
            Mutex::new(value)
        }

        fn with_inner<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
            f(&*self.lock().unwrap_or_else(PoisonError::into_inner))
        }

        fn with_inner_mut<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
            f(&mut *self.lock().unwrap_or_else(PoisonError::into_inner))
        }
    }

    /// A memoized value that is created at most once, even when requested
    /// concurrently.
    #[derive(Default)]
    pub struct Slot {
        value: RwLock<Option<DynSvc>>,
    }

    impl Slot {
        pub fn get(&self) -> Option<DynSvc> {
            self.value
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub fn get_or_try_init<F>(&self, init: F) -> InjectResult<DynSvc>
        where
            F: FnOnce() -> InjectResult<DynSvc>,
        {
            // Fast path
            if let Some(value) = self.get() {
                return Ok(value);
            }

            // Another caller may have created the value while this one was
            // waiting for the write lock
            let mut value =
                self.value.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = value.as_ref() {
                return Ok(value.clone());
            }

            let created = init()?;
            *value = Some(created.clone());
            Ok(created)
        }
    }
}

#[allow(clippy::wildcard_imports)]
pub(crate) use types::*;

/// Memoizes values by an identity token, creating one [`Slot`] per token.
pub(crate) struct SlotMap<K> {
    slots: Container<std::collections::HashMap<K, crate::Svc<Slot>>>,
}

impl<K> Default for SlotMap<K> {
    fn default() -> Self {
        SlotMap {
            slots: ContainerEx::new(std::collections::HashMap::new()),
        }
    }
}

impl<K: std::hash::Hash + Eq> SlotMap<K> {
    pub fn get_or_try_init<F>(&self, token: K, init: F) -> InjectResult<DynSvc>
    where
        F: FnOnce() -> InjectResult<DynSvc>,
    {
        // The map lock is released before the value is created so that
        // creating it may memoize other values
        let slot = self
            .slots
            .with_inner_mut(|slots| slots.entry(token).or_default().clone());
        slot.get_or_try_init(init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Svc;

    #[test]
    fn slot_initializes_once() {
        let slot = Slot::default();
        let first = slot.get_or_try_init(|| Ok(Svc::new(1i32) as DynSvc)).unwrap();
        let second = slot
            .get_or_try_init(|| panic!("slot was initialized twice"))
            .unwrap();

        assert!(Svc::ptr_eq(&first, &second));
    }

    #[test]
    fn failed_initialization_is_retried() {
        let slot = Slot::default();
        let result = slot.get_or_try_init(|| {
            Err(crate::InjectError::InternalError("failed".to_owned()))
        });
        assert!(result.is_err());
        assert!(slot.get().is_none());

        let value = slot.get_or_try_init(|| Ok(Svc::new(2i32) as DynSvc)).unwrap();
        assert_eq!(Some(&2), value.downcast_ref::<i32>());
    }

    #[test]
    fn slot_map_separates_tokens() {
        let slots = SlotMap::<usize>::default();
        let first = slots.get_or_try_init(1, || Ok(Svc::new(1i32) as DynSvc)).unwrap();
        let again = slots
            .get_or_try_init(1, || panic!("token 1 was initialized twice"))
            .unwrap();
        let other = slots.get_or_try_init(2, || Ok(Svc::new(1i32) as DynSvc)).unwrap();

        assert!(Svc::ptr_eq(&first, &again));
        assert!(!Svc::ptr_eq(&first, &other));
    }
}
