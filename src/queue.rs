//! Bounded, fixed-capacity FIFOs for the step queue and the per-leg
//! operation queues. Backed by `heapless::Deque` so enqueueing past
//! capacity is a rejection (`QueueFull`), never a reallocation — the
//! concurrency model forbids dynamic allocation on the tick path.

use heapless::Deque;
use tracing::warn;

use crate::error::{HexapodError, HexapodResult};
use crate::geometry::{Pose, Vec3};
use crate::leg_op::LegOp;
use crate::step::{Step, StepType};

/// Default capacity for a hexapod's body-level step queue.
pub const STEP_QUEUE_CAPACITY: usize = 16;

/// Default capacity for a single leg's operation queue.
pub const LEG_QUEUE_CAPACITY: usize = 8;

/// Bounded FIFO of body-level [`Step`]s.
#[derive(Debug, Clone)]
pub struct StepQueue<const N: usize = STEP_QUEUE_CAPACITY> {
    entries: Deque<Step, N>,
}

impl<const N: usize> Default for StepQueue<N> {
    fn default() -> Self {
        StepQueue {
            entries: Deque::new(),
        }
    }
}

impl<const N: usize> StepQueue<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, step: Step) -> HexapodResult<()> {
        self.entries.push_back(step).map_err(|_| {
            warn!(capacity = N, "step queue full, enqueue rejected");
            HexapodError::QueueFull
        })
    }

    pub fn dequeue(&mut self) -> Option<Step> {
        self.entries.pop_front()
    }

    pub fn head(&self) -> Option<&Step> {
        self.entries.front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The pose the planner models as "where the body will be after
    /// everything currently queued has executed", composed onto `base`
    /// (the hexapod's `current_pos`). Absolute step types replace the
    /// running pose outright; relative ones (`LINEAR_MOVE_RELATIVE`,
    /// `GROUP0`, `GROUP1`) accumulate onto it.
    pub fn current_queue_end_pos(&self, base: Pose) -> Pose {
        self.entries.iter().fold(base, |pos, step| {
            if step.step_type.is_relative() {
                pos + step.end_pos
            } else {
                step.end_pos
            }
        })
    }
}

/// Bounded FIFO of per-leg [`LegOp`]s.
#[derive(Debug, Clone)]
pub struct LegQueue<const N: usize = LEG_QUEUE_CAPACITY> {
    entries: Deque<LegOp, N>,
}

impl<const N: usize> Default for LegQueue<N> {
    fn default() -> Self {
        LegQueue {
            entries: Deque::new(),
        }
    }
}

impl<const N: usize> LegQueue<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, op: LegOp) -> HexapodResult<()> {
        self.entries.push_back(op).map_err(|_| {
            warn!(capacity = N, "leg queue full, enqueue rejected");
            HexapodError::QueueFull
        })
    }

    pub fn dequeue(&mut self) -> Option<LegOp> {
        self.entries.pop_front()
    }

    pub fn head(&self) -> Option<&LegOp> {
        self.entries.front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Composed end position after everything currently queued for this
    /// leg, starting from `base` (the leg's last commanded target).
    pub fn current_queue_end_pos(&self, base: Vec3) -> Vec3 {
        self.entries.iter().fold(base, |pos, op| {
            if op.is_wait() {
                pos
            } else if op.relative {
                pos + op.end_pos
            } else {
                op.end_pos
            }
        })
    }
}
