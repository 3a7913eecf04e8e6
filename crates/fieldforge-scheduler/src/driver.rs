//! Host-facing entry points.
//!
//! The host owns one [`UpdateDriver`] and passes it, along with the
//! hierarchy, to every callback: change notifications, the periodic timer,
//! explicit final-resolution requests, file load and shutdown. Nothing is
//! kept in global state.

use fieldforge_hierarchy::{CACHE_PRECISION, Hierarchy, HierarchySnapshot, NodeId};
use fieldforge_mesh::MeshData;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::{RebuildError, SchedulerError};
use crate::pipeline::{ExpressionBuilder, Mesher, RebuildPipeline, ResultBinder};
use crate::scheduler::{FinalDispatch, Phase, RebuildRequest, RootTiming, Scheduler};

/// Spacing between the initial checks of successive roots, so a file with
/// many systems does not rebuild them all on the same tick.
pub const INITIAL_CHECK_STAGGER_S: f64 = 0.05;

/// Host time source in seconds, on the same timebase as the `now` values
/// passed to the driver.
///
/// Rebuilds block, so completion is stamped with a fresh reading taken after
/// the mesh is published rather than with the time the rebuild started.
pub trait Clock {
    fn now(&self) -> f64;
}

impl<F: Fn() -> f64> Clock for F {
    fn now(&self) -> f64 {
        self()
    }
}

/// Result of one executed rebuild.
#[derive(Debug)]
pub struct RebuildOutcome {
    pub request: RebuildRequest,
    pub result: Result<MeshData, RebuildError>,
    /// Phase of the root after completion.
    pub phase: Phase,
}

impl RebuildOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Scheduler, snapshot cache and rebuild pipeline for one host session.
pub struct UpdateDriver<B, M, R> {
    scheduler: Scheduler,
    /// Snapshot taken for the last successful rebuild of each root.
    snapshots: FxHashMap<NodeId, HierarchySnapshot>,
    pipeline: RebuildPipeline<B, M, R>,
    clock: Option<Box<dyn Clock>>,
}

impl<B, M, R> UpdateDriver<B, M, R>
where
    B: ExpressionBuilder,
    M: Mesher<B::Expr>,
    R: ResultBinder,
{
    pub fn new(pipeline: RebuildPipeline<B, M, R>) -> Self {
        Self {
            scheduler: Scheduler::new(),
            snapshots: FxHashMap::default(),
            pipeline,
            clock: None,
        }
    }

    /// Reads `clock` when a rebuild finishes. Without one, completion is
    /// stamped with the `now` of the call that ran the rebuild.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn pipeline(&self) -> &RebuildPipeline<B, M, R> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut RebuildPipeline<B, M, R> {
        &mut self.pipeline
    }

    /// Registers `root`, or refreshes its timing from the current settings.
    pub fn register_root(
        &mut self,
        hierarchy: &Hierarchy,
        root: NodeId,
    ) -> Result<(), SchedulerError> {
        let settings = hierarchy
            .bounds_settings(root)
            .ok_or(SchedulerError::NotBounds(root))?;
        self.scheduler.register_root(root, RootTiming::from(settings));
        Ok(())
    }

    /// Handles a change to `node` or anything in its subtree.
    ///
    /// The owning root is marked dirty only if auto update is on and its
    /// snapshot differs from the one of the last successful rebuild. Returns
    /// whether it was marked.
    pub fn notify_changed(
        &mut self,
        hierarchy: &Hierarchy,
        node: NodeId,
        now: f64,
    ) -> Result<bool, SchedulerError> {
        let Some(root) = hierarchy.root_of(node) else {
            debug!("Ignoring change to {node}: not under a bounds controller");
            return Ok(false);
        };
        self.register_root(hierarchy, root)?;

        let Some(current) = HierarchySnapshot::capture(hierarchy, root) else {
            return Ok(false);
        };
        if !current.settings.auto_update {
            return Ok(false);
        }
        if !HierarchySnapshot::has_changed(&current, self.snapshots.get(&root), CACHE_PRECISION) {
            return Ok(false);
        }

        self.scheduler.mark_dirty(root, now)?;
        Ok(true)
    }

    /// Drops everything known about a deleted root.
    pub fn notify_removed(&mut self, root: NodeId) {
        self.snapshots.remove(&root);
        if self.scheduler.forget(root) {
            debug!("Removed bounds {root} from scheduling");
        }
    }

    /// Timer callback: queues eligible roots and runs every queued rebuild.
    pub fn pump(
        &mut self,
        hierarchy: &mut Hierarchy,
        now: f64,
    ) -> Result<Vec<RebuildOutcome>, SchedulerError> {
        self.scheduler.tick(now);

        let mut outcomes = Vec::new();
        while let Some(request) = self.scheduler.dispatch(now) {
            if !hierarchy.contains(request.root) {
                // Deleted without a notification.
                self.notify_removed(request.root);
                continue;
            }
            outcomes.push(self.execute(hierarchy, request, now)?);
        }
        Ok(outcomes)
    }

    /// Rebuilds `root` at final resolution right away.
    ///
    /// Returns `None` if a rebuild of `root` is already in flight; the final
    /// one then runs on the next [`pump`](Self::pump) after it completes.
    pub fn request_final(
        &mut self,
        hierarchy: &mut Hierarchy,
        root: NodeId,
        now: f64,
    ) -> Result<Option<RebuildOutcome>, SchedulerError> {
        self.register_root(hierarchy, root)?;
        match self.scheduler.request_final(root)? {
            FinalDispatch::Dispatched(request) => self.execute(hierarchy, request, now).map(Some),
            FinalDispatch::Deferred => Ok(None),
        }
    }

    /// Treats every root in `hierarchy` as changed, as after loading a file.
    /// Checks are spaced by [`INITIAL_CHECK_STAGGER_S`]. Returns the number
    /// of roots scheduled.
    pub fn initial_check(
        &mut self,
        hierarchy: &Hierarchy,
        now: f64,
    ) -> Result<usize, SchedulerError> {
        let mut scheduled = 0;
        for root in hierarchy.roots().collect::<Vec<_>>() {
            self.register_root(hierarchy, root)?;
            self.snapshots.remove(&root);
            let auto_update = self
                .scheduler
                .timing(root)
                .is_some_and(|timing| timing.auto_update);
            if auto_update {
                let at = now + INITIAL_CHECK_STAGGER_S * scheduled as f64;
                self.scheduler.mark_dirty(root, at)?;
                scheduled += 1;
            }
        }
        if scheduled > 0 {
            info!("Scheduled initial checks for {scheduled} bounds systems");
        }
        Ok(scheduled)
    }

    /// Forgets all roots, queued work and cached snapshots.
    pub fn shutdown(&mut self) {
        self.scheduler.clear();
        self.snapshots.clear();
        debug!("Update driver shut down");
    }

    /// Earliest time the host timer should fire again.
    pub fn next_wakeup(&self, now: f64) -> Option<f64> {
        self.scheduler.next_wakeup(now)
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    fn execute(
        &mut self,
        hierarchy: &mut Hierarchy,
        request: RebuildRequest,
        now: f64,
    ) -> Result<RebuildOutcome, SchedulerError> {
        let root = request.root;
        let snapshot = HierarchySnapshot::capture(hierarchy, root);
        let result = self.pipeline.run(hierarchy, &request);

        match (&result, snapshot) {
            (Ok(_), Some(snapshot)) => {
                self.snapshots.insert(root, snapshot);
            }
            (Ok(_), None) => {}
            (Err(e), _) => warn!("{e}"),
        }

        let finished = self.clock.as_ref().map_or(now, |clock| clock.now().max(now));
        let phase = self
            .scheduler
            .on_rebuild_complete(root, result.is_ok(), finished)?;
        Ok(RebuildOutcome {
            request,
            result,
            phase,
        })
    }
}
