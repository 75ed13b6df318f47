#![forbid(unsafe_code)]

//! Naming contract for generated accessors.
//!
//! Code generators pair a field named `<name>_bindable` of type
//! `Bindable<T>` with an accessor `<name>` that reads and writes through the
//! container. The generated accessor is public when the field is public and
//! restricted otherwise.

/// Suffix marking a field as backing storage for a generated accessor.
pub const BINDABLE_FIELD_SUFFIX: &str = "_bindable";

/// Accessor name for a backing field, or `None` if the field does not follow
/// the convention.
///
/// ```
/// use bindables::naming::accessor_name;
///
/// assert_eq!(accessor_name("title_bindable"), Some("title"));
/// assert_eq!(accessor_name("title"), None);
/// ```
#[must_use]
pub fn accessor_name(field: &str) -> Option<&str> {
    field
        .strip_suffix(BINDABLE_FIELD_SUFFIX)
        .filter(|stem| !stem.is_empty())
}

/// Visibility of a generated accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorVisibility {
    Public,
    Restricted,
}

impl AccessorVisibility {
    #[must_use]
    pub const fn for_field(field_is_public: bool) -> Self {
        if field_is_public {
            Self::Public
        } else {
            Self::Restricted
        }
    }
}
