//! Step-queue entries and the tagged `StepType` variant.

use crate::geometry::Pose;

/// Discriminants are chosen so that `GROUP0`/`GROUP1` differ in exactly one
/// bit (bit 0) and no other pair of variants does: every other pairwise XOR
/// below has a popcount of 2 or more. This lets the executor toggle tripods
/// with a plain `^ 1` and lets the planner detect a group boundary crossing
/// with the same operation, per the design note on tagged variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StepType {
    Group0 = 0,
    Group1 = 1,
    RapidMove = 6,
    LinearMoveAbsolute = 10,
    LinearMoveRelative = 12,
    ReturnToNeutral = 15,
}

impl StepType {
    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub fn is_group(self) -> bool {
        matches!(self, StepType::Group0 | StepType::Group1)
    }

    /// Flips `Group0` <-> `Group1`. Only meaningful when `is_group()`.
    pub fn toggled_group(self) -> StepType {
        match self {
            StepType::Group0 => StepType::Group1,
            StepType::Group1 => StepType::Group0,
            other => other,
        }
    }

    /// `end_pos` is relative-to-current for these variants, absolute for the
    /// rest (see the `Step` data model).
    pub fn is_relative(self) -> bool {
        matches!(
            self,
            StepType::LinearMoveRelative | StepType::Group0 | StepType::Group1
        )
    }
}

/// A single body-level step queued for the executor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub end_pos: Pose,
    pub speed: f64,
    pub time_ms: u32,
    pub step_type: StepType,
}

impl Step {
    pub fn new(end_pos: Pose, speed: f64, time_ms: u32, step_type: StepType) -> Self {
        Step {
            end_pos,
            speed,
            time_ms,
            step_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_pair_is_the_only_single_bit_difference() {
        let all = [
            StepType::Group0,
            StepType::Group1,
            StepType::RapidMove,
            StepType::LinearMoveAbsolute,
            StepType::LinearMoveRelative,
            StepType::ReturnToNeutral,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                let popcount = (a.bits() ^ b.bits()).count_ones();
                let is_group_pair = matches!(
                    (a, b),
                    (StepType::Group0, StepType::Group1) | (StepType::Group1, StepType::Group0)
                );
                assert_eq!(popcount == 1, is_group_pair, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn toggled_group_is_involution() {
        assert_eq!(StepType::Group0.toggled_group(), StepType::Group1);
        assert_eq!(StepType::Group1.toggled_group(), StepType::Group0);
        assert_eq!(
            StepType::Group0.toggled_group().toggled_group(),
            StepType::Group0
        );
    }
}
