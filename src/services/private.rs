use crate::{
    Binding, Bindings, DynSvc, InjectError, InjectResult, Injector,
    IntoBindings, Key, Provider, Svc,
};

/// A group of bindings compiled into a child injector of its own. Only the
/// exposed keys are visible to the enclosing injector.
pub struct PrivateBindings {
    bindings: Bindings,
    exposed: Vec<Key>,
}

impl PrivateBindings {
    /// The bindings of the private graph.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// The keys visible to the enclosing injector.
    #[must_use]
    pub fn exposed(&self) -> &[Key] {
        &self.exposed
    }
}

/// Resolves an exposed key through the private child injector of the
/// injector it is invoked with.
pub(crate) struct PrivateExposeProvider {
    private: Svc<PrivateBindings>,
    key: Key,
}

impl PrivateExposeProvider {
    pub fn private(&self) -> &Svc<PrivateBindings> {
        &self.private
    }
}

impl Provider for PrivateExposeProvider {
    fn provide(&self, injector: &Injector) -> InjectResult<DynSvc> {
        injector.private_child(&self.private)?.provide(&self.key)
    }
}

/// Creates a private graph: `bindings` are compiled into a child injector of
/// every injector these bindings are compiled into, and only the `exposed`
/// keys are bound in the enclosing injector. Bindings inside the private
/// graph can still resolve keys from the enclosing injector.
///
/// ```
/// use keyed_injector::{bind_const, bind_fn, private, Injector, Key, Svc};
///
/// let internals = private(
///     vec![
///         bind_const(40u32).build().unwrap(),
///         bind_fn(|base: Svc<u32>| u64::from(*base) + 2).build().unwrap(),
///     ],
///     [Key::of::<u64>()],
/// )
/// .unwrap();
///
/// let injector = Injector::new(&internals, None).unwrap();
/// let answer: Svc<u64> = injector.get().unwrap();
/// let hidden: Option<Svc<u32>> = injector.get().unwrap();
///
/// assert_eq!(42, *answer);
/// assert!(hidden.is_none());
/// ```
pub fn private<B, E>(bindings: B, exposed: E) -> InjectResult<Bindings>
where
    B: IntoBindings,
    E: IntoIterator<Item = Key>,
{
    let mut keys: Vec<Key> = Vec::new();
    for key in exposed {
        if key.is_array() {
            return Err(InjectError::InvalidBinding {
                reason: format!("array key {} cannot be exposed", key),
            });
        }

        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    let private = Svc::new(PrivateBindings {
        bindings: bindings.into_bindings()?,
        exposed: keys,
    });

    let exposures = private
        .exposed
        .iter()
        .map(|key| {
            let provider = PrivateExposeProvider {
                private: private.clone(),
                key: key.clone(),
            };
            Binding::new(key.clone(), Svc::new(provider))
        })
        .collect::<Vec<_>>();

    Ok(Bindings::from(exposures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bind_const, bind_fn, bindings, Tagged};

    struct Database(&'static str);
    struct Repository(&'static str);
    struct Cache(&'static str);
    struct Left;

    #[test]
    fn exposed_key_is_visible() {
        let bindings = private(
            bindings![
                bind_const(Database("main")),
                bind_fn(|db: Svc<Database>| Repository(db.0)),
            ]
            .unwrap(),
            [Key::of::<Repository>()],
        )
        .unwrap();

        let injector = Injector::new(&bindings, None).unwrap();
        let repository: Svc<Repository> = injector.get().unwrap();
        assert_eq!("main", repository.0);

        let database: Option<Svc<Database>> = injector.get().unwrap();
        assert!(database.is_none());
    }

    #[test]
    fn private_graph_sees_enclosing_bindings() {
        let bindings = bindings![
            bind_const(Cache("shared")),
            private(
                bind_fn(|cache: Svc<Cache>| Repository(cache.0)),
                [Key::of::<Repository>()],
            ),
        ]
        .unwrap();

        let injector = Injector::new(&bindings, None).unwrap();
        let repository: Svc<Repository> = injector.get().unwrap();
        assert_eq!("shared", repository.0);
    }

    #[test]
    fn sibling_private_graphs_are_isolated() {
        let left = crate::Tag::marker::<Left>();
        let bindings = bindings![
            private(
                bindings![
                    bind_const(Database("left")),
                    bind_fn(|db: Svc<Database>| Repository(db.0))
                        .tag(left.clone()),
                ],
                [Key::of::<Repository>().with_tag(left.clone())],
            ),
            private(
                bind_fn(|db: Option<Svc<Database>>| {
                    Cache(db.map_or("isolated", |db| db.0))
                }),
                [Key::of::<Cache>()],
            ),
        ]
        .unwrap();

        let injector = Injector::new(&bindings, None).unwrap();
        let repository: Tagged<Svc<Repository>, Left> = injector.get().unwrap();
        let cache: Svc<Cache> = injector.get().unwrap();
        assert_eq!("left", repository.0);
        assert_eq!("isolated", cache.0);
    }

    #[test]
    fn private_singletons_are_shared_through_exposures() {
        let bindings = private(
            bindings![
                bind_fn(|| Database("pooled")).singleton(),
                bind_fn(|db: Svc<Database>| Repository(db.0)),
                bind_fn(|db: Svc<Database>| Cache(db.0)),
            ]
            .unwrap(),
            [Key::of::<Repository>(), Key::of::<Cache>()],
        )
        .unwrap();

        let injector = Injector::new(&bindings, None).unwrap();
        let _repository: Svc<Repository> = injector.get().unwrap();
        let _cache: Svc<Cache> = injector.get().unwrap();
        let child = injector.private_child(&private_of(&injector)).unwrap();
        let first: Svc<Database> = child.get().unwrap();
        let second: Svc<Database> = child.get().unwrap();
        assert!(Svc::ptr_eq(&first, &second));
    }

    #[test]
    fn array_keys_cannot_be_exposed() {
        match private(Bindings::default(), [Key::array_of::<u8>()]) {
            Err(InjectError::InvalidBinding { .. }) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("array key should have been rejected"),
        }
    }

    fn private_of(injector: &Injector) -> Svc<PrivateBindings> {
        injector
            .private_graphs()
            .into_iter()
            .next()
            .expect("injector has a private graph")
    }
}
