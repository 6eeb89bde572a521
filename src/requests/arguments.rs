use crate::{DynSvc, InjectError, InjectResult, Key, Request, Service, Svc};
use indexmap::IndexMap;
use std::{
    borrow::Cow,
    fmt::{self, Debug, Formatter},
};

/// A parameter of an injection target: its name, the key it resolves, and
/// whether the target can be called without it.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Parameter {
    name: Cow<'static, str>,
    key: Key,
    has_default: bool,
}

impl Parameter {
    /// Creates a required parameter.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, key: Key) -> Self {
        Parameter {
            name: name.into(),
            key,
            has_default: false,
        }
    }

    /// Marks this parameter as having a default. Parameters with a default
    /// are skipped when their key is unbound.
    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Creates the parameter for a request type.
    pub fn of<R: Request>(
        name: impl Into<Cow<'static, str>>,
        target: &'static str,
    ) -> InjectResult<Self> {
        let name = name.into();
        let key = R::key().ok_or_else(|| InjectError::InvalidParameter {
            target,
            parameter: name.to_string(),
            reason: "the parameter's type does not name a key",
        })?;

        Ok(Parameter {
            name,
            key,
            has_default: R::has_default(),
        })
    }

    /// The name of this parameter.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key this parameter resolves.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the target can be called without this parameter.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.has_default
    }
}

/// Named, type-erased arguments for an injection target, in insertion order.
#[derive(Clone, Default)]
pub struct Arguments {
    values: IndexMap<Cow<'static, str>, DynSvc>,
}

impl Arguments {
    /// Creates an empty set of arguments.
    #[must_use]
    pub fn new() -> Self {
        Arguments::default()
    }

    /// Adds a value by name.
    #[must_use]
    pub fn with<T: Service>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: T,
    ) -> Self {
        self.insert(name, Svc::new(value));
        self
    }

    /// Sets the value of an argument, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        value: DynSvc,
    ) -> Option<DynSvc> {
        self.values.insert(name.into(), value)
    }

    /// Gets the value of an argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DynSvc> {
        self.values.get(name)
    }

    /// Removes and returns the value of an argument.
    pub fn take(&mut self, name: &str) -> Option<DynSvc> {
        self.values.shift_remove(name)
    }

    /// Removes an argument and converts it into a request type.
    pub fn extract<R: Request>(&mut self, name: &str) -> InjectResult<R> {
        let key = R::key().ok_or_else(|| {
            InjectError::InternalError(format!(
                "argument {} has no key",
                name
            ))
        })?;

        let value = self.take(name);
        R::from_value(&key, value)
    }

    /// Whether an argument with the given name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The names of the arguments.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(AsRef::as_ref)
    }

    /// The number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Moves every argument of `other` into these arguments, replacing
    /// arguments with the same name.
    pub fn extend(&mut self, other: Arguments) {
        self.values.extend(other.values);
    }
}

impl Debug for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_parameters_have_defaults() {
        let required = Parameter::of::<Svc<i32>>("a", "target").unwrap();
        let optional =
            Parameter::of::<Option<Svc<i32>>>("b", "target").unwrap();

        assert!(!required.has_default());
        assert!(optional.has_default());
        assert_eq!(required.key(), optional.key());
    }

    #[test]
    fn arguments_keep_insertion_order() {
        let mut arguments = Arguments::new().with("b", 2i32).with("a", 1i32);
        assert_eq!(vec!["b", "a"], arguments.names().collect::<Vec<_>>());

        let a: Svc<i32> = arguments.extract("a").unwrap();
        assert_eq!(1, *a);
        assert!(!arguments.contains("a"));
        assert_eq!(1, arguments.len());
    }

    #[test]
    fn missing_optional_argument_extracts_none() {
        let mut arguments = Arguments::new();
        let value: Option<Svc<i32>> = arguments.extract("value").unwrap();
        assert!(value.is_none());
    }
}
