use crate::ServiceInfo;
use std::{
    any::Any,
    borrow::Cow,
    fmt::{self, Display, Formatter},
};

/// A discriminator that distinguishes otherwise identical keys.
///
/// Tags are compared by value. A [`Tag::Marker`] tag uses a (usually
/// zero-sized) marker type, which allows tagged keys to be requested from
/// function parameters through [`Tagged`](crate::Tagged).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Tag {
    /// A textual tag.
    Name(Cow<'static, str>),
    /// A numeric tag.
    Index(i64),
    /// A tag identified by a marker type.
    Marker(ServiceInfo),
}

impl Tag {
    /// Creates a tag from a marker type.
    #[must_use]
    pub fn marker<M: ?Sized + Any>() -> Self {
        Tag::Marker(ServiceInfo::of::<M>())
    }
}

impl From<&'static str> for Tag {
    fn from(name: &'static str) -> Self {
        Tag::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Name(Cow::Owned(name))
    }
}

impl From<i64> for Tag {
    fn from(index: i64) -> Self {
        Tag::Index(index)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Name(name) => write!(f, "{:?}", name),
            Tag::Index(index) => write!(f, "{}", index),
            Tag::Marker(marker) => write!(f, "{}", marker.name()),
        }
    }
}

/// Identifies a binding: an element type, an optional tag, and whether the
/// key names an array of that element type.
///
/// Array keys are collection keys. Any number of bindings may contribute to
/// an array key and the injector resolves it to every contribution in
/// declaration order.
///
/// ```
/// use keyed_injector::Key;
///
/// let plain = Key::of::<u32>();
/// let tagged = Key::of::<u32>().with_tag("port");
/// let array = Key::array_of::<u32>();
///
/// assert_ne!(plain, tagged);
/// assert_ne!(plain, array);
/// assert_eq!(plain, array.element());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Key {
    service_info: ServiceInfo,
    tag: Option<Tag>,
    array: bool,
}

impl Key {
    /// Creates an untagged, non-array key for the given type.
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        Key {
            service_info: ServiceInfo::of::<T>(),
            tag: None,
            array: false,
        }
    }

    /// Creates an untagged array key for the given element type.
    #[must_use]
    pub fn array_of<T: ?Sized + Any>() -> Self {
        Key::of::<T>().with_array(true)
    }

    /// Replaces the tag of this key.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets whether this key is an array key.
    #[must_use]
    pub fn with_array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    /// The non-array key with the same element type and tag.
    #[must_use]
    pub fn element(&self) -> Self {
        self.clone().with_array(false)
    }

    /// The element type of this key.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// The tag of this key, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// Whether this key is an array key.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.array
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.array {
            write!(f, "[")?;
        }

        write!(f, "{}", self.service_info.name())?;
        if let Some(tag) = &self.tag {
            write!(f, "@{}", tag)?;
        }

        if self.array {
            write!(f, "]")?;
        }

        Ok(())
    }
}
