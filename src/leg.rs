//! The external leg driver boundary: the axis-level servo driver and the
//! single-leg arm IK/FK live outside this crate, as an external collaborator.
//! `LegDriver` is the narrow interface the motion core drives against.

use bitflags::bitflags;

use crate::error::MoveOutcome;
use crate::geometry::Vec3;

bitflags! {
    /// Which of the six legs (indices 0..=5) are active in a given body-IK
    /// or rapid-move call. `GROUP0`/`GROUP1` mirror the tripod split used by
    /// the gait planner (legs `{0,2,4}` and `{1,3,5}`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LegMask: u8 {
        const LEG0 = 0b0000_0001;
        const LEG1 = 0b0000_0010;
        const LEG2 = 0b0000_0100;
        const LEG3 = 0b0000_1000;
        const LEG4 = 0b0001_0000;
        const LEG5 = 0b0010_0000;

        const GROUP0 = Self::LEG0.bits() | Self::LEG2.bits() | Self::LEG4.bits();
        const GROUP1 = Self::LEG1.bits() | Self::LEG3.bits() | Self::LEG5.bits();

        const ALL = Self::GROUP0.bits() | Self::GROUP1.bits();
    }
}

impl LegMask {
    pub fn single(leg_index: usize) -> LegMask {
        LegMask::from_bits_truncate(1 << leg_index)
    }

    pub fn contains_leg(self, leg_index: usize) -> bool {
        self.contains(LegMask::single(leg_index))
    }
}

/// One instance per leg. Implemented by the axis-level servo driver, which
/// is external to this crate; the core only ever calls through this trait.
pub trait LegDriver {
    fn initialize(&mut self, leg_index: usize);

    /// Immediate target set; returns `true` if accepted.
    fn rapid_move(&mut self, target: Vec3) -> bool;

    fn linear_move_setup(&mut self, target: Vec3, speed: f64, relative: bool) -> MoveOutcome;

    fn linear_move_perform(&mut self);

    fn wait(&mut self, ms: u32);

    fn is_moving(&self) -> bool;

    /// Diagnostic only; not used by the core trajectory path.
    fn forward_kinematics(&self, a0: f64, a1: f64, a2: f64) -> Vec3;

    fn detach_servo(&mut self);
}
