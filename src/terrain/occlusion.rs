//! Occlusion-query driven leaf visibility.
//!
//! Each leaf owns one query slot. A query is begun on one frame (the leaf's
//! bounding box is drawn as proxy geometry) and polled on later frames, so
//! the CPU never waits on the GPU. Results are therefore one or more frames
//! stale; the frustum test alone decides visibility until the first result.

use thiserror::Error;

use super::quadtree::QuadTreeNode;
use crate::math::Aabb;

/// Query slot identifier, one per leaf
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub u32);

/// Result of polling a query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryPoll {
    /// GPU has not produced the result yet
    Pending,
    /// Number of samples that passed the depth test
    Complete(u64),
}

/// Transient failures reported by a query backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("occlusion query backend is busy")]
    Busy,

    #[error("unknown occlusion query {0:?}")]
    UnknownQuery(QueryId),

    #[error("occlusion query device error: {0}")]
    Device(String),
}

/// Non-blocking occlusion query backend
pub trait OcclusionQueries {
    /// Start a query that renders `bounds` as proxy geometry
    fn begin_query(&mut self, id: QueryId, bounds: &Aabb) -> Result<(), QueryError>;

    /// Check a previously begun query without blocking
    fn poll_query(&mut self, id: QueryId) -> Result<QueryPoll, QueryError>;
}

/// Per-leaf query state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OcclusionState {
    /// No query issued yet
    #[default]
    Idle,
    /// A query is in flight
    QueryPending,
    /// Last completed query result
    VisibilityKnown { occluded: bool },
}

/// What one step of the state machine did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A new query was begun
    Issued,
    /// The in-flight query has no result yet
    Waiting,
    /// The in-flight query completed
    Resolved { occluded: bool },
    /// The backend failed; state is unchanged
    Failed(QueryError),
}

/// Query slot and state for one leaf
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafOcclusion {
    pub query: QueryId,
    pub state: OcclusionState,
}

impl LeafOcclusion {
    pub fn new(query: QueryId) -> Self {
        Self { query, state: OcclusionState::Idle }
    }

    /// Advance one frame: begin a query when none is in flight, otherwise
    /// poll the one that is.
    pub fn step(&mut self, bounds: &Aabb, backend: &mut dyn OcclusionQueries) -> StepOutcome {
        match self.state {
            OcclusionState::Idle | OcclusionState::VisibilityKnown { .. } => {
                match backend.begin_query(self.query, bounds) {
                    Ok(()) => {
                        self.state = OcclusionState::QueryPending;
                        StepOutcome::Issued
                    }
                    Err(e) => StepOutcome::Failed(e),
                }
            }
            OcclusionState::QueryPending => match backend.poll_query(self.query) {
                Ok(QueryPoll::Pending) => StepOutcome::Waiting,
                Ok(QueryPoll::Complete(samples)) => {
                    let occluded = samples == 0;
                    self.state = OcclusionState::VisibilityKnown { occluded };
                    StepOutcome::Resolved { occluded }
                }
                Err(e) => StepOutcome::Failed(e),
            },
        }
    }

    /// Forget any in-flight query
    pub fn reset(&mut self) {
        self.state = OcclusionState::Idle;
    }
}

/// Counters for one occlusion pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OcclusionStats {
    pub issued: u32,
    pub waiting: u32,
    pub resolved: u32,
    pub occluded: u32,
    pub failed: u32,
}

/// Runs the per-leaf state machines over the tree each frame
#[derive(Debug)]
pub struct OcclusionCullingController {
    pub enabled: bool,
    pub stats: OcclusionStats,
}

impl Default for OcclusionCullingController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OcclusionCullingController {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, stats: OcclusionStats::default() }
    }

    /// Step every leaf once. Resolved queries update the leaf's `occluded`
    /// flag; failures are logged and leave the flag as it was.
    pub fn run(&mut self, root: &mut QuadTreeNode, backend: &mut dyn OcclusionQueries) -> OcclusionStats {
        let mut stats = OcclusionStats::default();
        if !self.enabled {
            self.stats = stats;
            return stats;
        }

        for leaf in root.leaves_mut() {
            let bounds = *leaf.bounds();
            let Some(data) = leaf.leaf_mut() else { continue };
            match data.occlusion.step(&bounds, backend) {
                StepOutcome::Issued => stats.issued += 1,
                StepOutcome::Waiting => stats.waiting += 1,
                StepOutcome::Resolved { occluded } => {
                    stats.resolved += 1;
                    if occluded {
                        stats.occluded += 1;
                    }
                    data.occluded = occluded;
                }
                StepOutcome::Failed(e) => {
                    stats.failed += 1;
                    log::warn!("Occlusion query {:?} failed, keeping previous visibility: {}", data.occlusion.query, e);
                }
            }
        }

        log::trace!(
            "Occlusion pass: {} issued, {} waiting, {} resolved ({} occluded), {} failed",
            stats.issued, stats.waiting, stats.resolved, stats.occluded, stats.failed
        );
        self.stats = stats;
        stats
    }

    /// Turn the pass on or off. Turning it off clears every leaf's
    /// `occluded` flag and drops in-flight queries.
    pub fn set_enabled(&mut self, enabled: bool, root: Option<&mut QuadTreeNode>) {
        self.enabled = enabled;
        if enabled {
            return;
        }
        if let Some(root) = root {
            for leaf in root.leaves_mut() {
                if let Some(data) = leaf.leaf_mut() {
                    data.occluded = false;
                    data.occlusion.reset();
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedQueries;
    use super::*;
    use crate::core::types::Vec3;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_begin_then_poll() {
        let mut backend = ScriptedQueries::visible();
        let mut leaf = LeafOcclusion::new(QueryId(3));

        assert_eq!(leaf.step(&unit_box(), &mut backend), StepOutcome::Issued);
        assert_eq!(leaf.state, OcclusionState::QueryPending);
        assert_eq!(backend.begun.len(), 1);

        assert_eq!(leaf.step(&unit_box(), &mut backend), StepOutcome::Resolved { occluded: false });
        assert_eq!(leaf.state, OcclusionState::VisibilityKnown { occluded: false });

        // Next frame starts a fresh query
        assert_eq!(leaf.step(&unit_box(), &mut backend), StepOutcome::Issued);
        assert_eq!(backend.begun.len(), 2);
    }

    #[test]
    fn test_pending_stays_pending() {
        let mut backend = ScriptedQueries::occluded().pending();
        let mut leaf = LeafOcclusion::new(QueryId(0));
        leaf.step(&unit_box(), &mut backend);
        for _ in 0..3 {
            assert_eq!(leaf.step(&unit_box(), &mut backend), StepOutcome::Waiting);
            assert_eq!(leaf.state, OcclusionState::QueryPending);
        }
        backend.ready = true;
        assert_eq!(leaf.step(&unit_box(), &mut backend), StepOutcome::Resolved { occluded: true });
    }

    #[test]
    fn test_known_never_skips_pending() {
        let mut backend = ScriptedQueries::visible();
        let mut leaf = LeafOcclusion::new(QueryId(1));
        let mut previous = leaf.state;
        for frame in 0..20 {
            backend.default_samples = if frame % 3 == 0 { 0 } else { 5 };
            leaf.step(&unit_box(), &mut backend);
            if let OcclusionState::VisibilityKnown { .. } = leaf.state {
                assert_eq!(previous, OcclusionState::QueryPending);
            }
            previous = leaf.state;
        }
    }

    #[test]
    fn test_failures_keep_state() {
        let mut backend = ScriptedQueries::visible().failing_begin();
        let mut leaf = LeafOcclusion::new(QueryId(2));
        assert_eq!(leaf.step(&unit_box(), &mut backend), StepOutcome::Failed(QueryError::Busy));
        assert_eq!(leaf.state, OcclusionState::Idle);

        backend.fail_begin = false;
        leaf.step(&unit_box(), &mut backend);
        backend.fail_poll = true;
        assert!(matches!(leaf.step(&unit_box(), &mut backend), StepOutcome::Failed(QueryError::Device(_))));
        assert_eq!(leaf.state, OcclusionState::QueryPending);
    }
}
