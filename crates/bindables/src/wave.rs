#![forbid(unsafe_code)]

//! Per-write bookkeeping for a propagation wave.
//!
//! A wave starts when a value is written to a container and covers every
//! recursive step it triggers. Nested writes issued from listeners start
//! their own wave.

use std::collections::HashSet;

use crate::bindable::BindableId;
use crate::config::{CycleGuard, PropagationConfig};
use crate::error::PropagationError;

/// Summary of one propagation wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropagationStats {
    /// Number of propagation steps performed, the origin included. Equals the
    /// number of distinct containers reached under [`CycleGuard::Visited`].
    pub updated: usize,
    /// Deepest step performed, in link hops from the origin.
    pub max_depth_reached: usize,
    /// Dead links removed along the way.
    pub pruned_links: usize,
    /// Steps skipped because they would have exceeded the depth limit
    /// (only under [`CycleGuard::SourceOnly`]).
    pub truncated_steps: usize,
}

pub(crate) struct Wave {
    origin: BindableId,
    config: PropagationConfig,
    visited: HashSet<BindableId>,
    stats: PropagationStats,
}

impl Wave {
    pub(crate) fn new(origin: BindableId, config: PropagationConfig) -> Self {
        Self {
            origin,
            config,
            visited: HashSet::new(),
            stats: PropagationStats::default(),
        }
    }

    /// Record a step on `id`. Must be called before the step fans out.
    pub(crate) fn enter(&mut self, id: BindableId, depth: usize, pruned: usize) {
        self.visited.insert(id);
        self.stats.updated += 1;
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(depth);
        self.stats.pruned_links += pruned;
    }

    /// Whether a step into `id` at `depth` may run.
    ///
    /// The visited set alone bounds a wave under [`CycleGuard::Visited`];
    /// `max_depth` only applies under [`CycleGuard::SourceOnly`].
    pub(crate) fn admit(&mut self, id: BindableId, depth: usize) -> bool {
        if self.config.cycle_guard == CycleGuard::Visited {
            return !self.visited.contains(&id);
        }
        if depth > self.config.max_depth {
            if self.stats.truncated_steps == 0 {
                tracing::warn!(
                    origin = self.origin.get(),
                    limit = self.config.max_depth,
                    guard = self.config.cycle_guard.as_str(),
                    "propagation depth limit reached; skipping deeper steps"
                );
            }
            self.stats.truncated_steps += 1;
            return false;
        }
        true
    }

    pub(crate) fn finish(self) -> Result<PropagationStats, PropagationError> {
        if self.stats.truncated_steps > 0 {
            Err(PropagationError::DepthLimitExceeded {
                origin: self.origin,
                limit: self.config.max_depth,
                stats: self.stats,
            })
        } else {
            Ok(self.stats)
        }
    }
}
