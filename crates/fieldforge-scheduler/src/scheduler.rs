//! Debounce and throttle state machine for hierarchy rebuilds.
//!
//! Each registered root moves through
//! `Clean -> Dirty -> Pending -> Rebuilding -> Clean | Dirty`. A tick only
//! queues a viewport rebuild once the root has been quiet for its update
//! delay (debounce) and the previous rebuild finished at least the minimum
//! interval ago (throttle). Final-resolution requests skip both checks.
//!
//! Times are seconds on a host-supplied monotonic clock.

use std::collections::VecDeque;

use fieldforge_config::BoundsSettings;
use fieldforge_hierarchy::NodeId;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::SchedulerError;

/// Per-root timing and resolution settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RootTiming {
    /// Quiet period required after the last edit.
    pub delay_s: f64,
    /// Minimum time between the end of one rebuild and the next automatic one.
    pub min_interval_s: f64,
    pub viewport_resolution: u32,
    pub final_resolution: u32,
    /// Automatic viewport rebuilds are only scheduled when set.
    pub auto_update: bool,
}

impl From<&BoundsSettings> for RootTiming {
    fn from(settings: &BoundsSettings) -> Self {
        Self {
            delay_s: settings.update_delay_s,
            min_interval_s: settings.min_update_interval_s,
            viewport_resolution: settings.viewport_resolution,
            final_resolution: settings.final_resolution,
            auto_update: settings.auto_update,
        }
    }
}

impl Default for RootTiming {
    fn default() -> Self {
        Self::from(&BoundsSettings::default())
    }
}

/// Scheduling phase of one root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Result is up to date.
    Clean,
    /// Edited since the last successful rebuild.
    Dirty,
    /// A rebuild is queued but not yet dispatched.
    Pending,
    /// A rebuild is in flight.
    Rebuilding,
}

/// Resolution class of a rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RebuildKind {
    /// Automatic rebuild at viewport resolution.
    Viewport,
    /// Explicit rebuild at final resolution.
    Final,
}

/// A rebuild handed to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildRequest {
    pub root: NodeId,
    pub kind: RebuildKind,
    pub resolution: u32,
}

/// Outcome of [`Scheduler::request_final`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalDispatch {
    /// The root went straight to `Rebuilding`; run this request now.
    Dispatched(RebuildRequest),
    /// A rebuild is in flight; the final one is queued when it completes.
    Deferred,
}

/// Returns `true` if an automatic rebuild may be queued at `now`.
///
/// Debounce and throttle must both hold: `now - last_dirty >= delay` and
/// `now - last_rebuild >= min_interval` (a root that never rebuilt passes
/// the throttle). Only `Dirty` roots with auto update enabled qualify.
pub fn is_eligible(
    now: f64,
    last_dirty: Option<f64>,
    last_rebuild: Option<f64>,
    phase: Phase,
    timing: &RootTiming,
) -> bool {
    phase == Phase::Dirty
        && timing.auto_update
        && last_dirty.is_some_and(|t| now - t >= timing.delay_s)
        && last_rebuild.is_none_or(|t| now - t >= timing.min_interval_s)
}

#[derive(Clone, Debug)]
struct RootState {
    timing: RootTiming,
    phase: Phase,
    last_dirty: Option<f64>,
    last_rebuild: Option<f64>,
    /// Kind of the queued request while `Pending`.
    pending: Option<RebuildKind>,
    /// Kind of the running request while `Rebuilding`.
    in_flight: Option<RebuildKind>,
    edited_during_rebuild: bool,
    final_deferred: bool,
}

impl RootState {
    fn new(timing: RootTiming) -> Self {
        Self {
            timing,
            phase: Phase::Clean,
            last_dirty: None,
            last_rebuild: None,
            pending: None,
            in_flight: None,
            edited_during_rebuild: false,
            final_deferred: false,
        }
    }

    fn request(&self, root: NodeId, kind: RebuildKind) -> RebuildRequest {
        let resolution = match kind {
            RebuildKind::Viewport => self.timing.viewport_resolution,
            RebuildKind::Final => self.timing.final_resolution,
        };
        RebuildRequest {
            root,
            kind,
            resolution,
        }
    }
}

/// Dirty set and rebuild queue for every registered root.
#[derive(Debug, Default)]
pub struct Scheduler {
    roots: FxHashMap<NodeId, RootState>,
    queue: VecDeque<RebuildRequest>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Starts tracking `root`. Re-registering only replaces its timing.
    pub fn register_root(&mut self, root: NodeId, timing: RootTiming) {
        match self.roots.get_mut(&root) {
            Some(state) => state.timing = timing,
            None => {
                debug!("Registered root {root}");
                self.roots.insert(root, RootState::new(timing));
            }
        }
    }

    pub fn update_timing(&mut self, root: NodeId, timing: RootTiming) -> Result<(), SchedulerError> {
        self.state_mut(root)?.timing = timing;
        Ok(())
    }

    /// Drops all state for `root`, including any queued request. Returns
    /// `false` if it was not registered.
    pub fn forget(&mut self, root: NodeId) -> bool {
        self.queue.retain(|r| r.root != root);
        let known = self.roots.remove(&root).is_some();
        if known {
            debug!("Forgot root {root}");
        }
        known
    }

    pub fn contains(&self, root: NodeId) -> bool {
        self.roots.contains_key(&root)
    }

    pub fn timing(&self, root: NodeId) -> Option<&RootTiming> {
        self.roots.get(&root).map(|s| &s.timing)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Records an edit of `root` at `now` and restarts its debounce timer.
    ///
    /// A queued viewport rebuild is withdrawn, since it would be stale. Edits
    /// during a rebuild are remembered so completion re-arms the timer.
    pub fn mark_dirty(&mut self, root: NodeId, now: f64) -> Result<(), SchedulerError> {
        let state = self.roots.get_mut(&root).ok_or(SchedulerError::UnknownRoot(root))?;
        state.last_dirty = Some(now);

        match state.phase {
            Phase::Clean | Phase::Dirty => state.phase = Phase::Dirty,
            Phase::Pending if state.pending == Some(RebuildKind::Viewport) => {
                state.phase = Phase::Dirty;
                state.pending = None;
                self.queue.retain(|r| r.root != root);
                debug!("Withdrew pending viewport rebuild of {root}");
            }
            // A queued final rebuild has not started and will see this edit.
            Phase::Pending => {}
            Phase::Rebuilding => state.edited_during_rebuild = true,
        }
        Ok(())
    }

    /// Queues a viewport rebuild for every eligible root and returns them in
    /// queue order.
    pub fn tick(&mut self, now: f64) -> Vec<NodeId> {
        let mut ready: Vec<NodeId> = self
            .roots
            .iter()
            .filter(|(_, s)| is_eligible(now, s.last_dirty, s.last_rebuild, s.phase, &s.timing))
            .map(|(id, _)| *id)
            .collect();
        ready.sort_unstable();

        for &root in &ready {
            if let Some(state) = self.roots.get_mut(&root) {
                state.phase = Phase::Pending;
                state.pending = Some(RebuildKind::Viewport);
                self.queue.push_back(state.request(root, RebuildKind::Viewport));
                debug!("Queued viewport rebuild of {root} at t={now:.3}");
            }
        }
        ready
    }

    /// Takes the next queued request, finals first, and marks its root
    /// `Rebuilding`.
    pub fn dispatch(&mut self, now: f64) -> Option<RebuildRequest> {
        let position = self
            .queue
            .iter()
            .position(|r| r.kind == RebuildKind::Final)
            .unwrap_or(0);
        let request = self.queue.remove(position)?;

        if let Some(state) = self.roots.get_mut(&request.root) {
            state.phase = Phase::Rebuilding;
            state.pending = None;
            state.in_flight = Some(request.kind);
            state.edited_during_rebuild = false;
        }
        debug!(
            "Dispatched {:?} rebuild of {} at resolution {} (t={now:.3})",
            request.kind, request.root, request.resolution
        );
        Some(request)
    }

    /// Requests a rebuild at final resolution, ignoring debounce, throttle
    /// and the auto-update flag.
    ///
    /// Any queued request for `root` is cancelled. If no rebuild is in flight
    /// the root goes straight to `Rebuilding` and the request is returned for
    /// the caller to run; otherwise it is queued when the current one
    /// completes.
    pub fn request_final(&mut self, root: NodeId) -> Result<FinalDispatch, SchedulerError> {
        let state = self.roots.get_mut(&root).ok_or(SchedulerError::UnknownRoot(root))?;

        if state.phase == Phase::Rebuilding {
            state.final_deferred = true;
            debug!("Deferred final rebuild of {root} until the current one completes");
            return Ok(FinalDispatch::Deferred);
        }

        if state.phase == Phase::Pending {
            self.queue.retain(|r| r.root != root);
            debug!("Cancelled pending rebuild of {root} for a final rebuild");
        }
        state.phase = Phase::Rebuilding;
        state.pending = None;
        state.in_flight = Some(RebuildKind::Final);
        state.edited_during_rebuild = false;
        let request = state.request(root, RebuildKind::Final);
        debug!("Dispatched final rebuild of {root} at resolution {}", request.resolution);
        Ok(FinalDispatch::Dispatched(request))
    }

    /// Ends the in-flight rebuild of `root` and returns its new phase.
    ///
    /// A deferred final request is queued first. Otherwise a failed rebuild
    /// leaves the root `Dirty` for a later retry, and edits that arrived
    /// during the rebuild restart the debounce timer from `now`.
    pub fn on_rebuild_complete(
        &mut self,
        root: NodeId,
        success: bool,
        now: f64,
    ) -> Result<Phase, SchedulerError> {
        let state = self.roots.get_mut(&root).ok_or(SchedulerError::UnknownRoot(root))?;
        if state.phase != Phase::Rebuilding {
            return Err(SchedulerError::NotRebuilding(root));
        }

        state.last_rebuild = Some(now);
        state.in_flight = None;
        let edited = std::mem::take(&mut state.edited_during_rebuild);

        if std::mem::take(&mut state.final_deferred) {
            state.phase = Phase::Pending;
            state.pending = Some(RebuildKind::Final);
            self.queue.push_back(state.request(root, RebuildKind::Final));
        } else if edited {
            state.phase = Phase::Dirty;
            state.last_dirty = Some(now);
        } else if success {
            state.phase = Phase::Clean;
        } else {
            state.phase = Phase::Dirty;
        }

        debug!(
            "Rebuild of {root} finished (success={success}), now {:?}",
            state.phase
        );
        Ok(state.phase)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn phase(&self, root: NodeId) -> Option<Phase> {
        self.roots.get(&root).map(|s| s.phase)
    }

    pub fn last_dirty(&self, root: NodeId) -> Option<f64> {
        self.roots.get(&root).and_then(|s| s.last_dirty)
    }

    pub fn last_rebuild(&self, root: NodeId) -> Option<f64> {
        self.roots.get(&root).and_then(|s| s.last_rebuild)
    }

    /// Kind of the rebuild currently running for `root`.
    pub fn in_flight(&self, root: NodeId) -> Option<RebuildKind> {
        self.roots.get(&root).and_then(|s| s.in_flight)
    }

    /// Number of queued, undispatched requests.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no work is queued or running and no root is waiting
    /// for an automatic rebuild.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
            && self.roots.values().all(|s| match s.phase {
                Phase::Clean => true,
                Phase::Dirty => !s.timing.auto_update,
                Phase::Pending | Phase::Rebuilding => false,
            })
    }

    /// Earliest time at which a tick or dispatch could do work, or `None` if
    /// nothing is waiting. Queued requests make the answer `now`.
    pub fn next_wakeup(&self, now: f64) -> Option<f64> {
        if !self.queue.is_empty() {
            return Some(now);
        }
        self.roots
            .values()
            .filter(|s| s.phase == Phase::Dirty && s.timing.auto_update)
            .filter_map(|s| {
                let debounce = s.last_dirty? + s.timing.delay_s;
                let throttle = s
                    .last_rebuild
                    .map_or(f64::NEG_INFINITY, |t| t + s.timing.min_interval_s);
                Some(debounce.max(throttle).max(now))
            })
            .min_by(f64::total_cmp)
    }

    /// Registered roots in id order.
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self.roots.keys().copied().collect();
        roots.sort_unstable();
        roots
    }

    /// Forgets every root and queued request.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.queue.clear();
    }

    fn state_mut(&mut self, root: NodeId) -> Result<&mut RootState, SchedulerError> {
        self.roots.get_mut(&root).ok_or(SchedulerError::UnknownRoot(root))
    }
}
