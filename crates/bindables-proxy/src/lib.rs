#![forbid(unsafe_code)]

//! Type-erased access to bindables.
//!
//! [`BindableValue`] is a non-generic, object-safe `{ get, set }` view over a
//! container's value. It is implemented for every
//! [`Bindable<T>`](bindables::Bindable) without any cooperation from the
//! core crate, so any container can be stored as `Rc<dyn BindableValue>` where
//! the value type is not known statically.
//!
//! [`BindableProxy<T>`] goes the other way: it wraps an erased value and
//! offers typed access again, checking the type on every call. All
//! propagation happens in the wrapped container.
//!
//! ```
//! use bindables::Bindable;
//! use bindables_proxy::{BindableProxy, BindableValue};
//! use std::rc::Rc;
//!
//! let volume = Bindable::new(3u8);
//! let erased: Rc<dyn BindableValue> = Rc::new(volume.clone());
//!
//! let proxy = BindableProxy::<u8>::new(Rc::clone(&erased));
//! proxy.set(7).unwrap();
//! assert_eq!(volume.get(), 7);
//! assert!(erased.set_value_any(Box::new("loud")).is_err());
//! ```

use std::any::{self, Any};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use bindables::Bindable;

/// Untyped value written or read through a [`BindableValue`] had the wrong
/// dynamic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: &'static str,
}

impl TypeMismatch {
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self {
            expected: any::type_name::<T>(),
        }
    }
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bindable value type mismatch (expected {})", self.expected)
    }
}

impl std::error::Error for TypeMismatch {}

/// Non-generic view over a bindable's value.
pub trait BindableValue {
    /// Clone of the current value, boxed.
    fn value_any(&self) -> Box<dyn Any>;

    /// Write a boxed value; fails without side effects if the box does not
    /// hold the container's value type.
    fn set_value_any(&self, value: Box<dyn Any>) -> Result<(), TypeMismatch>;

    /// Name of the value type, for diagnostics.
    fn value_type_name(&self) -> &'static str;
}

impl<T: Clone + 'static> BindableValue for Bindable<T> {
    fn value_any(&self) -> Box<dyn Any> {
        Box::new(self.get())
    }

    fn set_value_any(&self, value: Box<dyn Any>) -> Result<(), TypeMismatch> {
        match value.downcast::<T>() {
            Ok(value) => {
                self.set(*value);
                Ok(())
            }
            Err(_) => {
                tracing::debug!(
                    id = self.id().get(),
                    expected = any::type_name::<T>(),
                    "rejected untyped write"
                );
                Err(TypeMismatch::of::<T>())
            }
        }
    }

    fn value_type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// Typed handle over an erased [`BindableValue`].
pub struct BindableProxy<T> {
    target: Rc<dyn BindableValue>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for BindableProxy<T> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for BindableProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindableProxy")
            .field("value_type", &any::type_name::<T>())
            .field("target_type", &self.target.value_type_name())
            .finish()
    }
}

impl<T: 'static> BindableProxy<T> {
    #[must_use]
    pub fn new(target: Rc<dyn BindableValue>) -> Self {
        Self {
            target,
            _value: PhantomData,
        }
    }

    /// Whether the wrapped value is actually a `T`.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.target.value_any().is::<T>()
    }

    pub fn get(&self) -> Result<T, TypeMismatch> {
        self.target
            .value_any()
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| TypeMismatch::of::<T>())
    }

    /// Forward a typed write; propagation runs in the wrapped container.
    pub fn set(&self, value: T) -> Result<(), TypeMismatch> {
        self.target.set_value_any(Box::new(value))
    }

    #[must_use]
    pub fn target(&self) -> &Rc<dyn BindableValue> {
        &self.target
    }
}

impl<T: 'static> BindableValue for BindableProxy<T> {
    fn value_any(&self) -> Box<dyn Any> {
        self.target.value_any()
    }

    fn set_value_any(&self, value: Box<dyn Any>) -> Result<(), TypeMismatch> {
        self.target.set_value_any(value)
    }

    fn value_type_name(&self) -> &'static str {
        self.target.value_type_name()
    }
}
