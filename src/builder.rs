use crate::{Bindings, InjectResult, Injector, IntoBindings};

/// A builder for an [`Injector`].
///
/// ```
/// use keyed_injector::{bind_const, bind_fn, Injector, Svc};
///
/// let mut root = Injector::builder();
/// root.bind(bind_const(2u32)).unwrap();
/// let root = root.build().unwrap();
///
/// let mut child = Injector::builder();
/// child.parent(root);
/// child.bind(bind_fn(|base: Svc<u32>| u64::from(*base) * 21)).unwrap();
///
/// let child = child.build().unwrap();
/// let answer: Svc<u64> = child.get().unwrap();
/// assert_eq!(42, *answer);
/// ```
#[derive(Default)]
pub struct InjectorBuilder {
    bindings: Bindings,
    parent: Option<Injector>,
}

impl InjectorBuilder {
    /// Adds bindings that were already validated.
    pub fn add(&mut self, bindings: impl Into<Bindings>) -> &mut Self {
        self.bindings.add(bindings);
        self
    }

    /// Validates a binder (or anything else that converts into bindings) and
    /// adds its bindings.
    pub fn bind(&mut self, bindings: impl IntoBindings) -> InjectResult<()> {
        self.bindings.add(bindings.into_bindings()?);
        Ok(())
    }

    /// Sets the parent of the injector. Keys the injector doesn't bind are
    /// resolved by the parent.
    pub fn parent(&mut self, parent: Injector) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    /// The bindings added so far.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Builds the injector.
    pub fn build(self) -> InjectResult<Injector> {
        Injector::new(&self.bindings, self.parent.as_ref())
    }
}
