#![forbid(unsafe_code)]

//! Two-way bindable value containers.
//!
//! # Role
//! A [`Bindable<T>`] holds one value, a set of weak links to other bindables
//! of the same type, and an ordered list of change listeners. Writing to any
//! container pushes the value through every live link, synchronously, and
//! notifies listeners along the way. Several independent variables stay in
//! sync without the owner wiring update code by hand.
//!
//! # Primary responsibilities
//! - **[`Bindable`]**: storage, linking ([`Bindable::bind_to`]), propagation
//!   and listener dispatch.
//! - **[`ValueChangedEvent`]**: the old/new pair handed to listeners.
//! - **[`PropagationConfig`]**: cycle guard and depth limit, settable per
//!   container or from the environment.
//! - **[`naming`]**: the field naming contract accessor generators rely on.
//!
//! # Invariants
//!
//! 1. Links are symmetric: after `a.bind_to(&b)`, each holds a link to the
//!    other.
//! 2. Links never keep a container alive; dead links are pruned by the next
//!    propagation step on the container holding them.
//! 3. Every reachable container is updated, and every listener has fired,
//!    before a write returns. Under [`CycleGuard::SourceOnly`] this holds
//!    up to [`PropagationConfig::max_depth`]; beyond it the wave is reported
//!    as truncated.
//! 4. Under the default [`CycleGuard::Visited`], each container is updated at
//!    most once per write, whatever the link topology.
//!
//! Single-threaded by construction (`Rc`-based); handles are neither `Send`
//! nor `Sync`.
//!
//! # Example
//!
//! ```
//! use bindables::Bindable;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let a = Bindable::new(1);
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let log_clone = Rc::clone(&log);
//! a.on_value_changed_with(
//!     move |e| log_clone.borrow_mut().push((*e.old_value(), *e.new_value())),
//!     false,
//! );
//! a.set(2);
//! assert_eq!(*log.borrow(), vec![(1, 2)]);
//! ```

pub mod bindable;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod naming;
pub mod wave;

pub use bindable::{Bindable, BindableId};
pub use config::{ConfigError, CycleGuard, PropagationConfig, PropagationConfigParse};
pub use error::PropagationError;
pub use event::ValueChangedEvent;
pub use wave::PropagationStats;
