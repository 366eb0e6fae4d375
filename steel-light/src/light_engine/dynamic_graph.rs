//! Bucket-queue min fixed point solver.
//!
//! Every node carries a level in `0..level_count`; lower is brighter. A node's
//! settled level is the minimum over its neighbours of
//! [`DynamicGraph::compute_level_from_neighbor`]. Changes are queued into one
//! FIFO bucket per level and drained lowest bucket first, which makes the
//! solver a Dial style Dijkstra over small integer costs. Edges that get worse
//! are handled by raising the node to the maximum level first and then letting
//! its neighbours pull it back down.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use super::light_queue::LightQueue;

/// Level values above this are reserved for queue bookkeeping.
pub const MAX_LEVEL_COUNT: u8 = 253;

/// A node of a propagation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphNode<P> {
    /// The virtual node standing for external brightness (emission, open sky).
    Source,
    /// A real position.
    At(P),
}

impl<P> GraphNode<P> {
    /// Returns the position, or `None` for the virtual source.
    #[must_use]
    pub const fn pos(&self) -> Option<&P> {
        match self {
            Self::Source => None,
            Self::At(pos) => Some(pos),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    level: u8,
    bucket: u8,
}

/// Queue state of a [`DynamicGraph`].
///
/// Holds the pending level of every queued node and the bucket it sits in.
#[derive(Debug)]
pub struct LevelPropagator<P> {
    level_count: u8,
    queues: Box<[LightQueue<GraphNode<P>>]>,
    computed_levels: FxHashMap<GraphNode<P>, Pending>,
    first_queued_level: u8,
}

impl<P: Copy + Eq + Hash> LevelPropagator<P> {
    /// Creates an empty propagator with `level_count` buckets.
    ///
    /// # Panics
    /// Panics if `level_count` is zero or larger than [`MAX_LEVEL_COUNT`].
    #[must_use]
    pub fn new(level_count: u8) -> Self {
        assert!(
            (1..=MAX_LEVEL_COUNT).contains(&level_count),
            "level count must be in 1..=253, got {level_count}"
        );
        Self {
            level_count,
            queues: (0..level_count).map(|_| LightQueue::new()).collect(),
            computed_levels: FxHashMap::default(),
            first_queued_level: level_count,
        }
    }

    /// The number of levels.
    #[must_use]
    #[inline]
    pub const fn level_count(&self) -> u8 {
        self.level_count
    }

    /// The highest (darkest) level.
    #[must_use]
    #[inline]
    pub const fn max_level(&self) -> u8 {
        self.level_count - 1
    }

    /// Whether any node is queued.
    #[must_use]
    #[inline]
    pub const fn has_work(&self) -> bool {
        self.first_queued_level < self.level_count
    }

    /// The number of queued nodes.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.computed_levels.len()
    }

    /// The lowest non-empty bucket, or `level_count` when idle.
    #[must_use]
    pub const fn first_queued_level(&self) -> u8 {
        self.first_queued_level
    }

    /// The pending level of a queued node.
    #[must_use]
    #[inline]
    pub fn pending_level(&self, node: GraphNode<P>) -> Option<u8> {
        self.computed_levels.get(&node).map(|pending| pending.level)
    }

    #[inline]
    fn key(&self, a: u8, b: u8) -> u8 {
        a.min(b).min(self.max_level())
    }

    /// Queues `node` with `level` in the bucket for `min(current, level)`,
    /// moving it if it already sits in another bucket.
    fn enqueue(&mut self, node: GraphNode<P>, level: u8, current: u8) {
        let bucket = self.key(current, level);
        match self.computed_levels.insert(node, Pending { level, bucket }) {
            Some(previous) if previous.bucket == bucket => {}
            Some(previous) => {
                self.unlink(previous.bucket);
                self.link(node, bucket);
            }
            None => self.link(node, bucket),
        }
    }

    fn link(&mut self, node: GraphNode<P>, bucket: u8) {
        self.queues[usize::from(bucket)].enqueue(node);
        self.first_queued_level = self.first_queued_level.min(bucket);
    }

    fn unlink(&mut self, bucket: u8) {
        let queue = &mut self.queues[usize::from(bucket)];
        queue.release();
        if queue.is_empty() && bucket == self.first_queued_level {
            self.advance_first_queued_level();
        }
    }

    fn advance_first_queued_level(&mut self) {
        let start = usize::from(self.first_queued_level);
        self.first_queued_level = self.queues[start.min(self.queues.len())..]
            .iter()
            .position(|queue| !queue.is_empty())
            .map_or(self.level_count, |offset| (start + offset) as u8);
    }

    /// Removes `node` from the queue, returning its pending level.
    pub fn remove_from_queue(&mut self, node: GraphNode<P>) -> Option<u8> {
        let pending = self.computed_levels.remove(&node)?;
        self.unlink(pending.bucket);
        Some(pending.level)
    }

    /// Removes every queued node matching `predicate`.
    pub fn remove_if(&mut self, mut predicate: impl FnMut(GraphNode<P>) -> bool) {
        let doomed: Vec<GraphNode<P>> = self
            .computed_levels
            .keys()
            .copied()
            .filter(|&node| predicate(node))
            .collect();
        for node in doomed {
            self.remove_from_queue(node);
        }
    }

    /// Pops the oldest node of the lowest non-empty bucket with its pending level.
    fn pop_first(&mut self) -> Option<(GraphNode<P>, u8)> {
        while self.has_work() {
            let bucket = self.first_queued_level;
            let queue = &mut self.queues[usize::from(bucket)];
            while let Some(node) = queue.dequeue_raw() {
                match self.computed_levels.get(&node) {
                    Some(pending) if pending.bucket == bucket => {
                        let level = pending.level;
                        self.computed_levels.remove(&node);
                        self.unlink(bucket);
                        return Some((node, level));
                    }
                    // moved to another bucket or removed since it was queued here
                    _ => {}
                }
            }
            log::warn!("light queue bucket {bucket} reported live entries but was empty");
            self.queues[usize::from(bucket)].clear();
            self.advance_first_queued_level();
        }
        None
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let expected = self
            .queues
            .iter()
            .position(|queue| !queue.is_empty())
            .map_or(self.level_count, |level| level as u8);
        assert_eq!(self.first_queued_level, expected);

        let live: usize = self.queues.iter().map(LightQueue::len).sum();
        assert_eq!(live, self.computed_levels.len());
        for pending in self.computed_levels.values() {
            assert!(pending.level < self.level_count);
            assert!(pending.bucket < self.level_count);
        }
    }
}

/// A graph whose node levels are kept at their min fixed point.
///
/// Implementors provide storage and the edge cost function; the provided
/// methods implement queuing and relaxation on top of them.
pub trait DynamicGraph {
    /// Position type of the graph's real nodes.
    type Pos: Copy + Eq + Hash;

    /// The queue state.
    fn propagator(&self) -> &LevelPropagator<Self::Pos>;

    /// The queue state, mutably.
    fn propagator_mut(&mut self) -> &mut LevelPropagator<Self::Pos>;

    /// Whether `node` has a definitional level that is never recomputed.
    fn is_source(&self, node: GraphNode<Self::Pos>) -> bool {
        matches!(node, GraphNode::Source)
    }

    /// Recomputes the level of `node` from its neighbours, ignoring `excluded`.
    /// The result is at most `max_level`.
    fn get_computed_level(
        &mut self,
        node: GraphNode<Self::Pos>,
        excluded: GraphNode<Self::Pos>,
        max_level: u8,
    ) -> u8;

    /// Calls [`Self::check_neighbor`] for every node that may depend on `node`.
    fn check_neighbors_after_update(
        &mut self,
        node: GraphNode<Self::Pos>,
        level: u8,
        decrease: bool,
    );

    /// The committed level of `node`.
    fn get_level(&self, node: GraphNode<Self::Pos>) -> u8;

    /// Commits a level for `node`.
    fn set_level(&mut self, node: GraphNode<Self::Pos>, level: u8);

    /// The level `target` would get through the edge from `source` at `level`.
    fn compute_level_from_neighbor(
        &mut self,
        source: GraphNode<Self::Pos>,
        target: GraphNode<Self::Pos>,
        level: u8,
    ) -> u8;

    /// The highest (darkest) level.
    fn max_level(&self) -> u8 {
        self.propagator().max_level()
    }

    /// Whether any node is queued.
    fn has_work(&self) -> bool {
        self.propagator().has_work()
    }

    /// The number of queued nodes.
    fn queue_size(&self) -> usize {
        self.propagator().queue_size()
    }

    /// Re-evaluates `node` from all of its neighbours.
    fn recheck_node(&mut self, node: GraphNode<Self::Pos>) {
        let max_level = self.max_level();
        self.check_edge(node, node, max_level, false);
    }

    /// Notifies the graph that the edge from `source` to `node` now yields
    /// `level`.
    ///
    /// With `decrease`, `node` can only get brighter. Without it the edge got
    /// worse and `node` is recomputed from its other neighbours.
    fn check_edge(
        &mut self,
        source: GraphNode<Self::Pos>,
        node: GraphNode<Self::Pos>,
        level: u8,
        decrease: bool,
    ) {
        let current = self.get_level(node);
        let pending = self.propagator().pending_level(node);
        self.check_edge_with(source, node, level, current, pending, decrease);
    }

    /// [`Self::check_edge`] with the committed and pending levels already looked up.
    fn check_edge_with(
        &mut self,
        source: GraphNode<Self::Pos>,
        node: GraphNode<Self::Pos>,
        level: u8,
        current: u8,
        pending: Option<u8>,
        decrease: bool,
    ) {
        if self.is_source(node) {
            return;
        }
        let max_level = self.max_level();
        let level = level.min(max_level);
        let current = current.min(max_level);
        let effective = pending.unwrap_or(current);

        let new_level = if decrease {
            effective.min(level)
        } else {
            self.get_computed_level(node, source, level).min(max_level)
        };

        if new_level != current {
            self.propagator_mut().enqueue(node, new_level, current);
        } else if pending.is_some() {
            self.propagator_mut().remove_from_queue(node);
        }
    }

    /// Propagates a change of `source` (now at `level`) to `target`.
    fn check_neighbor(
        &mut self,
        source: GraphNode<Self::Pos>,
        target: GraphNode<Self::Pos>,
        level: u8,
        decrease: bool,
    ) {
        let max_level = self.max_level();
        let pending = self.propagator().pending_level(target);
        let through_source = self
            .compute_level_from_neighbor(source, target, level)
            .min(max_level);
        let current = self.get_level(target);

        if decrease {
            self.check_edge_with(source, target, through_source, current, pending, true);
        } else if through_source == pending.unwrap_or(current).min(max_level) {
            // target got its level through source; recompute it from the rest
            self.check_edge_with(source, target, max_level, current, pending, false);
        }
    }

    /// Drains up to `max_steps` queued nodes and returns the unused budget.
    fn run_updates(&mut self, mut max_steps: usize) -> usize {
        let max_level = self.max_level();
        while max_steps > 0 {
            let Some((node, pending)) = self.propagator_mut().pop_first() else {
                break;
            };
            max_steps -= 1;

            let current = self.get_level(node).min(max_level);
            if pending < current {
                self.set_level(node, pending);
                self.check_neighbors_after_update(node, pending, true);
            } else if pending > current {
                self.propagator_mut().enqueue(node, pending, max_level);
                self.set_level(node, max_level);
                self.check_neighbors_after_update(node, current, false);
            }
        }
        max_steps
    }
}
