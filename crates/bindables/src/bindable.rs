#![forbid(unsafe_code)]

//! Bindable value container with two-way weak links and change listeners.
//!
//! # Design
//!
//! [`Bindable<T>`] is a handle to shared, reference-counted storage
//! (`Rc<..>` with a `RefCell` for the mutable parts). Cloning the handle does
//! not copy the container; the container lives until its last handle drops.
//!
//! Links between containers are `Weak` in both directions, so binding never
//! keeps a peer alive. Dead links are pruned lazily, by the container that is
//! currently executing a propagation step.
//!
//! # Propagation
//!
//! Writing `v` to container `C` runs a depth-first wave:
//!
//! 1. `C` stores `v`, prunes its dead links and snapshots its live peers.
//! 2. Each peer that is not the container that pushed into `C` (and, under
//!    [`CycleGuard::Visited`](crate::CycleGuard::Visited), has not been
//!    reached yet in this wave) runs step 1 with `C` as source, depth-first.
//! 3. After the fan-out, `C`'s listeners are called in registration order
//!    with the old/new pair.
//!
//! Listener firing order across containers is therefore post-order: the
//! deepest containers notify first, the written container last.
//!
//! # Reentrancy
//!
//! No `RefCell` borrow is held while calling out. Peers and listeners are
//! snapshotted before use; links or listeners added from a callback take
//! effect from the next wave. A listener may read or write any container;
//! a write nests a new wave on the same stack.
//!
//! # Failure Modes
//!
//! - **Write inside `with`**: writing to a container from within a
//!   [`Bindable::with`] closure on a container the wave reaches panics
//!   (`RefCell` borrow rules).
//! - **Cycles under `SourceOnly`**: waves deeper than
//!   [`PropagationConfig::max_depth`] are truncated and reported; see
//!   [`Bindable::try_set`]. The default visited guard never truncates, and
//!   the walk runs on an explicit stack, so long chains cannot overflow the
//!   call stack.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::PropagationConfig;
use crate::error::PropagationError;
use crate::event::ValueChangedEvent;
use crate::wave::{PropagationStats, Wave};

type Listener<T> = Rc<dyn Fn(&ValueChangedEvent<T>)>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a bindable container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindableId(u64);

impl BindableId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bindable#{}", self.0)
    }
}

struct Node<T> {
    id: BindableId,
    config: PropagationConfig,
    state: RefCell<State<T>>,
}

struct State<T> {
    value: T,
    links: Vec<Weak<Node<T>>>,
    listeners: Vec<Listener<T>>,
}

/// A value container that keeps linked containers in sync.
///
/// ```
/// use bindables::Bindable;
///
/// let a = Bindable::new(0);
/// let b = Bindable::new(5);
/// a.bind_to(&b);
/// assert_eq!(a.get(), 5);
///
/// b.set(7);
/// assert_eq!(a.get(), 7);
/// ```
pub struct Bindable<T> {
    node: Rc<Node<T>>,
}

impl<T> Clone for Bindable<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Bindable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.node.state.borrow();
        f.debug_struct("Bindable")
            .field("id", &self.node.id)
            .field("value", &state.value)
            .field("link_count", &state.links.len())
            .field("listener_count", &state.listeners.len())
            .finish()
    }
}

impl<T: Clone + Default + 'static> Default for Bindable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Bindable<T> {
    /// Stable identity of the underlying container, shared by all handles.
    #[must_use]
    pub fn id(&self) -> BindableId {
        self.node.id
    }

    /// Whether two handles refer to the same container.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Configuration used by waves started on this container.
    #[must_use]
    pub fn config(&self) -> PropagationConfig {
        self.node.config
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to a container whose wave reaches this one.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.node.state.borrow().value)
    }

    /// Number of link entries, including dead links not yet pruned.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.node.state.borrow().links.len()
    }

    /// Number of links whose peer is still alive.
    #[must_use]
    pub fn live_link_count(&self) -> usize {
        self.node
            .state
            .borrow()
            .links
            .iter()
            .filter(|link| link.strong_count() > 0)
            .count()
    }

    /// Whether this container holds a live link to `peer`.
    #[must_use]
    pub fn is_bound_to(&self, peer: &Self) -> bool {
        let target = Rc::downgrade(&peer.node);
        self.node
            .state
            .borrow()
            .links
            .iter()
            .any(|link| link.ptr_eq(&target) && link.strong_count() > 0)
    }

    /// Number of registered listeners, duplicates included.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.node.state.borrow().listeners.len()
    }

    /// Add symmetric weak links between `self` and `peer`, skipping existing
    /// entries.
    fn link(&self, peer: &Self) {
        add_link(&self.node, Rc::downgrade(&peer.node));
        add_link(&peer.node, Rc::downgrade(&self.node));
    }
}

impl<T: Clone + 'static> Bindable<T> {
    /// Create a container holding `value` with the default configuration.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_config(value, PropagationConfig::default())
    }

    /// Create a container whose writes propagate under `config`.
    #[must_use]
    pub fn with_config(value: T, config: PropagationConfig) -> Self {
        Self {
            node: Rc::new(Node {
                id: BindableId::next(),
                config,
                state: RefCell::new(State {
                    value,
                    links: Vec::new(),
                    listeners: Vec::new(),
                }),
            }),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.node.state.borrow().value.clone()
    }

    /// Write `value` and propagate it through every live link.
    ///
    /// Every reachable container is updated and every listener has fired
    /// before this returns. Under [`CycleGuard::SourceOnly`](crate::CycleGuard::SourceOnly)
    /// a wave cut short by the depth limit has already been logged; use
    /// [`try_set`](Self::try_set) to observe it.
    pub fn set(&self, value: T) {
        // Truncation is logged by the wave itself.
        let _ = self.try_set(value);
    }

    /// Write `value`, propagate it, and report what the wave did.
    ///
    /// Only fails under [`CycleGuard::SourceOnly`](crate::CycleGuard::SourceOnly),
    /// where `max_depth` is what stops longer cycles.
    pub fn try_set(&self, value: T) -> Result<PropagationStats, PropagationError> {
        let _span = tracing::debug_span!(
            "bindable.set",
            origin = self.node.id.get(),
            guard = self.node.config.cycle_guard.as_str()
        )
        .entered();

        let mut wave = Wave::new(self.node.id, self.node.config);
        propagate(&self.node, value, &mut wave);
        wave.finish()
    }

    /// Link to `peer` and take over its current value.
    ///
    /// The write propagates from `self`, so `peer` and everything linked to
    /// either side ends up holding `peer`'s value.
    pub fn bind_to(&self, peer: &Self) {
        let _ = self.try_bind_to(peer);
    }

    pub fn try_bind_to(&self, peer: &Self) -> Result<PropagationStats, PropagationError> {
        self.link(peer);
        let value = peer.get();
        self.try_set(value)
    }

    /// Register `f` to be called on every change.
    ///
    /// No call is made at registration, so `T` needs no default value.
    /// Registering the same callback twice calls it twice per change.
    pub fn subscribe(&self, f: impl Fn(&ValueChangedEvent<T>) + 'static) {
        self.push_listener(Rc::new(f));
    }

    /// Register `f` to be called on every change, and call it right away
    /// with `(T::default(), current)`.
    pub fn on_value_changed(&self, f: impl Fn(&ValueChangedEvent<T>) + 'static)
    where
        T: Default,
    {
        self.on_value_changed_with(f, true);
    }

    /// Register `f` to be called on every change.
    ///
    /// With `call_immediately`, `f` also receives a synthetic event
    /// `(T::default(), current)` before this returns. Without it this is
    /// [`subscribe`](Self::subscribe).
    pub fn on_value_changed_with(
        &self,
        f: impl Fn(&ValueChangedEvent<T>) + 'static,
        call_immediately: bool,
    ) where
        T: Default,
    {
        let listener: Listener<T> = Rc::new(f);
        self.push_listener(Rc::clone(&listener));
        if call_immediately {
            let event = ValueChangedEvent::new(T::default(), self.get());
            listener(&event);
        }
    }

    fn push_listener(&self, listener: Listener<T>) {
        self.node.state.borrow_mut().listeners.push(listener);
    }
}

impl<T: Clone + PartialEq + 'static> Bindable<T> {
    /// Link to `peer`; with `update_only_if_different`, take over its value
    /// only when the two currently differ.
    pub fn bind_to_with(&self, peer: &Self, update_only_if_different: bool) {
        let _ = self.try_bind_to_with(peer, update_only_if_different);
    }

    /// Like [`bind_to_with`](Self::bind_to_with). When no write happens the
    /// returned stats are all zero.
    pub fn try_bind_to_with(
        &self,
        peer: &Self,
        update_only_if_different: bool,
    ) -> Result<PropagationStats, PropagationError> {
        self.link(peer);
        let value = peer.get();
        if update_only_if_different && self.with(|current| *current == value) {
            tracing::trace!(
                origin = self.node.id.get(),
                peer = peer.node.id.get(),
                "bind skipped sync; values already equal"
            );
            return Ok(PropagationStats::default());
        }
        self.try_set(value)
    }
}

fn add_link<T>(node: &Node<T>, link: Weak<Node<T>>) {
    let mut state = node.state.borrow_mut();
    if !state.links.iter().any(|existing| existing.ptr_eq(&link)) {
        state.links.push(link);
    }
}

/// One container on the propagation stack.
struct Frame<T> {
    node: Rc<Node<T>>,
    source: Rc<Node<T>>,
    depth: usize,
    old_value: T,
    peers: Vec<Rc<Node<T>>>,
    next_peer: usize,
}

impl<T: Clone + 'static> Frame<T> {
    /// Store `value` in `node`, prune its dead links and snapshot its live
    /// peers.
    fn enter(
        node: Rc<Node<T>>,
        source: Rc<Node<T>>,
        value: &T,
        depth: usize,
        wave: &mut Wave,
    ) -> Self {
        let (old_value, peers, pruned) = {
            let mut state = node.state.borrow_mut();
            let old_value = std::mem::replace(&mut state.value, value.clone());
            let before = state.links.len();
            state.links.retain(|link| link.strong_count() > 0);
            let pruned = before - state.links.len();
            let peers: Vec<Rc<Node<T>>> = state.links.iter().filter_map(Weak::upgrade).collect();
            (old_value, peers, pruned)
        };

        wave.enter(node.id, depth, pruned);
        if pruned > 0 {
            tracing::debug!(id = node.id.get(), pruned, "pruned dead links");
        }
        tracing::trace!(id = node.id.get(), depth, peers = peers.len(), "propagate");

        Self {
            node,
            source,
            depth,
            old_value,
            peers,
            next_peer: 0,
        }
    }

    /// Next snapshotted peer other than the container that pushed into this
    /// one.
    fn next_target(&mut self) -> Option<Rc<Node<T>>> {
        while let Some(peer) = self.peers.get(self.next_peer) {
            self.next_peer += 1;
            if !Rc::ptr_eq(peer, &self.source) {
                return Some(Rc::clone(peer));
            }
        }
        None
    }

    /// Call the listener snapshot with this step's old/new pair.
    fn notify(self, new_value: T) {
        let listeners: Vec<Listener<T>> = self.node.state.borrow().listeners.clone();
        if listeners.is_empty() {
            return;
        }
        let event = ValueChangedEvent::new(self.old_value, new_value);
        for listener in &listeners {
            listener(&event);
        }
    }
}

/// Depth-first walk from `origin` on an explicit stack.
///
/// A peer is admitted only when its parent frame resumes, so siblings see
/// what earlier subtrees visited. Frames notify when popped (post-order).
/// Link depth never grows the call stack.
fn propagate<T: Clone + 'static>(origin: &Rc<Node<T>>, value: T, wave: &mut Wave) {
    let root = Frame::enter(Rc::clone(origin), Rc::clone(origin), &value, 0, wave);
    let mut stack = vec![root];

    while let Some(frame) = stack.last_mut() {
        match frame.next_target() {
            Some(peer) => {
                let depth = frame.depth + 1;
                let parent = Rc::clone(&frame.node);
                if wave.admit(peer.id, depth) {
                    stack.push(Frame::enter(peer, parent, &value, depth, wave));
                }
            }
            None => {
                if let Some(done) = stack.pop() {
                    done.notify(value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleGuard;
    use std::cell::Cell;

    fn counter<T: Clone + 'static>(bindable: &Bindable<T>) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        bindable.subscribe(move |_| count_clone.set(count_clone.get() + 1));
        count
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Handle(u32);

    #[test]
    fn subscribe_works_without_default_value() {
        let a = Bindable::new(Handle(1));
        let b = Bindable::new(Handle(2));
        a.bind_to(&b);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        a.subscribe(move |e: &ValueChangedEvent<Handle>| {
            seen_clone
                .borrow_mut()
                .push((e.old_value().clone(), e.new_value().clone()));
        });
        assert!(seen.borrow().is_empty());

        b.set(Handle(9));
        assert_eq!(*seen.borrow(), vec![(Handle(2), Handle(9))]);
        assert_eq!(a.get(), Handle(9));
        assert_eq!(a.listener_count(), 1);
    }

    #[test]
    fn new_holds_initial_value() {
        let b = Bindable::new(3);
        assert_eq!(b.get(), 3);
        assert_eq!(b.link_count(), 0);
        assert_eq!(b.listener_count(), 0);
        assert_eq!(b.config(), PropagationConfig::default());
    }

    #[test]
    fn default_uses_type_default() {
        let b: Bindable<String> = Bindable::default();
        assert_eq!(b.get(), "");
    }

    #[test]
    fn clone_shares_container() {
        let a = Bindable::new(1);
        let a2 = a.clone();
        a2.set(9);
        assert_eq!(a.get(), 9);
        assert!(a.ptr_eq(&a2));
        assert_eq!(a.id(), a2.id());
    }

    #[test]
    fn ids_are_unique() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        assert_ne!(a.id(), b.id());
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn with_borrows_value() {
        let b = Bindable::new(vec![1, 2, 3]);
        assert_eq!(b.with(|v| v.iter().sum::<i32>()), 6);
    }

    #[test]
    fn set_without_links_notifies_once() {
        let b = Bindable::new(1);
        let count = counter(&b);
        let stats = b.try_set(2).unwrap();
        assert_eq!(b.get(), 2);
        assert_eq!(count.get(), 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.max_depth_reached, 0);
    }

    #[test]
    fn equal_writes_still_notify() {
        let b = Bindable::new(4);
        let count = counter(&b);
        b.set(4);
        b.set(4);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn bind_is_symmetric() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        a.bind_to(&b);
        assert!(a.is_bound_to(&b));
        assert!(b.is_bound_to(&a));
    }

    #[test]
    fn rebinding_does_not_duplicate_links() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        a.bind_to(&b);
        a.bind_to(&b);
        b.bind_to(&a);
        assert_eq!(a.link_count(), 1);
        assert_eq!(b.link_count(), 1);

        let count = counter(&b);
        a.set(1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn self_binding_is_harmless() {
        let a = Bindable::new(1);
        let count = counter(&a);
        a.bind_to(&a);
        assert_eq!(a.link_count(), 1);
        assert_eq!(count.get(), 1);
        a.set(2);
        assert_eq!(a.get(), 2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn self_binding_under_source_only_guard() {
        let a = Bindable::with_config(1, PropagationConfig::source_only());
        a.bind_to(&a);
        let stats = a.try_set(2).unwrap();
        assert_eq!(stats.updated, 1);
    }

    #[test]
    fn link_does_not_keep_peer_alive() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        a.bind_to(&b);
        let weak = Rc::downgrade(&b.node);
        drop(b);
        assert!(weak.upgrade().is_none());
        assert_eq!(a.link_count(), 1);
        assert_eq!(a.live_link_count(), 0);
    }

    #[test]
    fn dead_links_are_pruned_on_next_write() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        let c = Bindable::new(0);
        a.bind_to(&b);
        a.bind_to(&c);
        drop(b);

        let stats = a.try_set(5).unwrap();
        assert_eq!(stats.pruned_links, 1);
        assert_eq!(stats.updated, 2);
        assert_eq!(a.link_count(), 1);
        assert_eq!(c.get(), 5);
    }

    #[test]
    fn bind_only_if_different_skips_equal_values() {
        let a = Bindable::new(3);
        let b = Bindable::new(3);
        let count_a = counter(&a);
        let count_b = counter(&b);

        let stats = a.try_bind_to_with(&b, true).unwrap();
        assert_eq!(stats, PropagationStats::default());
        assert_eq!(count_a.get(), 0);
        assert_eq!(count_b.get(), 0);
        assert!(a.is_bound_to(&b));
    }

    #[test]
    fn bind_only_if_different_syncs_unequal_values() {
        let a = Bindable::new(1);
        let b = Bindable::new(2);
        let count_a = counter(&a);
        let count_b = counter(&b);

        let stats = a.try_bind_to_with(&b, true).unwrap();
        assert_eq!(stats.updated, 2);
        assert_eq!(a.get(), 2);
        assert_eq!(count_a.get(), 1);
        assert_eq!(count_b.get(), 1);
    }

    #[test]
    fn immediate_listener_gets_synthetic_event() {
        let b = Bindable::new(7);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        b.on_value_changed(move |e| seen_clone.borrow_mut().push(e.clone().into_parts()));
        assert_eq!(*seen.borrow(), vec![(0, 7)]);

        b.set(8);
        assert_eq!(*seen.borrow(), vec![(0, 7), (7, 8)]);
    }

    #[test]
    fn listener_registered_twice_fires_twice() {
        let b = Bindable::new(0);
        let count = Rc::new(Cell::new(0u32));
        for _ in 0..2 {
            let count_clone = Rc::clone(&count);
            b.on_value_changed_with(move |_| count_clone.set(count_clone.get() + 1), false);
        }
        b.set(1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let b = Bindable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ['A', 'B', 'C'] {
            let log_clone = Rc::clone(&log);
            b.on_value_changed_with(move |_| log_clone.borrow_mut().push(tag), false);
        }
        b.set(1);
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn listener_added_during_dispatch_waits_for_next_change() {
        let b = Bindable::new(0);
        let late = Rc::new(Cell::new(0u32));
        let b_clone = b.clone();
        let late_clone = Rc::clone(&late);
        b.on_value_changed_with(
            move |_| {
                let late_inner = Rc::clone(&late_clone);
                b_clone.on_value_changed_with(move |_| late_inner.set(late_inner.get() + 1), false);
            },
            false,
        );

        b.set(1);
        assert_eq!(late.get(), 0);
        assert_eq!(b.listener_count(), 2);

        b.set(2);
        assert_eq!(late.get(), 1);
    }

    #[test]
    fn listener_may_write_to_a_bound_container() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        let mirror = Bindable::new(0);
        a.bind_to(&b);

        let mirror_clone = mirror.clone();
        b.on_value_changed_with(move |e| mirror_clone.set(*e.new_value() * 10), false);
        let a_clone = a.clone();
        mirror.on_value_changed_with(move |e| {
            if *e.new_value() > 100 {
                a_clone.set(0);
            }
        }, false);

        a.set(3);
        assert_eq!(mirror.get(), 30);
        assert_eq!(b.get(), 3);

        a.set(20);
        assert_eq!(mirror.get(), 0);
        assert_eq!(a.get(), 0);
        assert_eq!(b.get(), 0);
    }

    #[test]
    fn listener_reads_other_containers_mid_wave() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        a.bind_to(&b);

        let seen = Rc::new(Cell::new(-1));
        let seen_clone = Rc::clone(&seen);
        let b_clone = b.clone();
        a.on_value_changed_with(move |_| seen_clone.set(b_clone.get()), false);

        a.set(4);
        assert_eq!(seen.get(), 4);
    }

    #[test]
    fn peer_dropped_by_listener_is_pruned_later() {
        let a = Bindable::new(0);
        let holder = Rc::new(RefCell::new(Some(Bindable::new(0))));
        if let Some(b) = holder.borrow().as_ref() {
            a.bind_to(b);
        }
        let holder_clone = Rc::clone(&holder);
        a.on_value_changed_with(move |_| drop(holder_clone.borrow_mut().take()), false);

        a.set(1);
        assert_eq!(a.link_count(), 1);
        assert_eq!(a.live_link_count(), 0);

        let stats = a.try_set(2).unwrap();
        assert_eq!(stats.pruned_links, 1);
        assert_eq!(a.link_count(), 0);
    }

    #[test]
    fn triangle_terminates_under_visited_guard() {
        let a = Bindable::new(0);
        let b = Bindable::new(0);
        let c = Bindable::new(0);
        a.bind_to(&b);
        b.bind_to(&c);
        c.bind_to(&a);

        let stats = a.try_set(1).unwrap();
        assert_eq!(stats.updated, 3);
        assert_eq!(stats.truncated_steps, 0);
        assert_eq!(c.config().cycle_guard, CycleGuard::Visited);
    }

    #[test]
    fn debug_format() {
        let b = Bindable::new(42);
        let dbg = format!("{b:?}");
        assert!(dbg.contains("Bindable"));
        assert!(dbg.contains("42"));
        assert!(dbg.contains("link_count"));
    }

    #[test]
    fn id_display() {
        assert_eq!(BindableId::from_raw(12).to_string(), "bindable#12");
    }
}
