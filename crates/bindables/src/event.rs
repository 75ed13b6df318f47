#![forbid(unsafe_code)]

//! Change events delivered to bindable listeners.

/// An old/new value pair describing one change of a [`Bindable`](crate::Bindable).
///
/// A fresh event is built for every notification step. Listeners only ever
/// see it by shared reference, so it cannot be altered after construction.
///
/// The event passed to a listener at registration time (see
/// [`Bindable::on_value_changed`](crate::Bindable::on_value_changed)) is
/// synthetic: its old value is `T::default()`, not a previously held value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueChangedEvent<T> {
    old_value: T,
    new_value: T,
}

impl<T> ValueChangedEvent<T> {
    /// Create an event for a transition from `old_value` to `new_value`.
    #[must_use]
    pub const fn new(old_value: T, new_value: T) -> Self {
        Self {
            old_value,
            new_value,
        }
    }

    /// Value held before the change.
    #[must_use]
    pub const fn old_value(&self) -> &T {
        &self.old_value
    }

    /// Value held after the change.
    #[must_use]
    pub const fn new_value(&self) -> &T {
        &self.new_value
    }

    /// Consume the event, returning `(old, new)`.
    #[must_use]
    pub fn into_parts(self) -> (T, T) {
        (self.old_value, self.new_value)
    }
}

impl<T: PartialEq> ValueChangedEvent<T> {
    /// Whether the old and new values differ.
    ///
    /// Writes are not filtered by equality, so listeners may receive events
    /// where this is `false`.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.old_value != self.new_value
    }
}
