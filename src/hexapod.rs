//! The `Hexapod` struct: per-instance state, the per-tick motion executor,
//! and busy-semantics queries. Walk planning lives in [`crate::planner`].

use tracing::{debug, warn};

use crate::config::HexapodConfig;
use crate::error::{HexapodResult, MoveOutcome};
use crate::geometry::{lerp_pose, Pose};
use crate::ik::{self, DefaultSafetyHooks, SafetyHooks};
use crate::leg::{LegDriver, LegMask};
use crate::leg_op::LegQueue;
use crate::queue::StepQueue;
use crate::step::StepType;

/// Nominal standing height, matching the stance the reach envelope treats
/// as zero-deviation (`q.z == 100`).
pub const NOMINAL_STANCE_Z: f64 = 100.0;

/// A single owning instance of the motion core. Owns its six legs, its
/// step queue, its per-leg queues, and all geometry constants. Hexapod
/// instances never share legs or queues (design note: no global state).
pub struct Hexapod<L: LegDriver, H: SafetyHooks = DefaultSafetyHooks> {
    pub(crate) config: HexapodConfig,
    pub(crate) hooks: H,
    pub(crate) legs: [L; 6],

    pub(crate) current_pos: Pose,
    pub(crate) start_pos: Pose,
    pub(crate) end_pos: Pose,

    pub(crate) move_start_time_ms: u32,
    pub(crate) move_time_ms: u32,
    pub(crate) last_step_progress: f64,

    pub(crate) current_step_type: StepType,
    pub(crate) last_step_type: StepType,
    pub(crate) next_step_type: StepType,

    pub(crate) step_in_progress: bool,
    pub(crate) moving_flag: bool,
    pub(crate) high_level_move_flag: bool,

    pub(crate) walk_velocity: Pose,

    pub(crate) leg_queues: [LegQueue; 6],
    pub(crate) step_queue: StepQueue,

    /// Last commanded leg-frame target per leg. Not named explicitly in the
    /// data model, but required to compute the per-leg queue's
    /// `current_queue_end_pos`'s queued-tail baseline when a leg has
    /// never been commanded before; seeded from body IK at construction.
    pub(crate) leg_last_target: [crate::geometry::Vec3; 6],
}

impl<L: LegDriver> Hexapod<L, DefaultSafetyHooks> {
    pub fn new(config: HexapodConfig, legs: [L; 6]) -> Self {
        Self::with_hooks(config, legs, DefaultSafetyHooks)
    }
}

impl<L: LegDriver, H: SafetyHooks> Hexapod<L, H> {
    pub fn with_hooks(config: HexapodConfig, mut legs: [L; 6], hooks: H) -> Self {
        let nominal = Pose::new(0.0, 0.0, NOMINAL_STANCE_Z, 0.0, 0.0, 0.0);
        let leg_last_target = ik::body_inverse_kinematics(&config, &hooks, nominal, LegMask::ALL)
            .map(|targets| {
                let mut out = [crate::geometry::Vec3::zero(); 6];
                for (i, target) in targets {
                    out[i] = target;
                }
                out
            })
            .unwrap_or([crate::geometry::Vec3::zero(); 6]);

        for (i, leg) in legs.iter_mut().enumerate() {
            leg.initialize(i);
        }

        Hexapod {
            config,
            hooks,
            legs,
            current_pos: nominal,
            start_pos: nominal,
            end_pos: nominal,
            move_start_time_ms: 0,
            move_time_ms: 0,
            last_step_progress: 0.0,
            // `RapidMove` is a sentinel here: no step has executed yet, so
            // there is no real "previous group" to compare against when the
            // first step is dequeued (see `start_next_step_or_stream_velocity`).
            current_step_type: StepType::RapidMove,
            last_step_type: StepType::RapidMove,
            next_step_type: StepType::Group0,
            step_in_progress: false,
            moving_flag: false,
            high_level_move_flag: false,
            walk_velocity: Pose::zero(),
            leg_queues: Default::default(),
            step_queue: StepQueue::new(),
            leg_last_target,
        }
    }

    pub fn current_pos(&self) -> Pose {
        self.current_pos
    }

    pub fn config(&self) -> &HexapodConfig {
        &self.config
    }

    // --- Busy semantics -------------------------------------------

    pub fn is_low_level_busy(&self) -> bool {
        self.legs.iter().any(LegDriver::is_moving) || self.moving_flag
    }

    pub fn is_busy(&self) -> bool {
        self.is_low_level_busy() || self.high_level_move_flag
    }

    // --- Immediate pose commands ---------------------------------------

    /// Runs body IK on `pose` and dispatches every active leg immediately,
    /// bypassing the queues. The engine behind both the public `rapid_move`
    /// and the per-tick `RAPID_MOVE`/`GROUP` dispatch in `walk_perform`.
    pub(crate) fn dispatch_rapid_move(
        &mut self,
        pose: Pose,
        active_legs: LegMask,
        update_current_pos: bool,
    ) -> HexapodResult<()> {
        let targets = ik::body_inverse_kinematics(&self.config, &self.hooks, pose, active_legs)?;
        for (i, target) in targets {
            if !self.legs[i].is_moving() {
                self.legs[i].rapid_move(target);
                self.leg_last_target[i] = target;
            }
        }
        if update_current_pos {
            self.current_pos = pose;
        }
        Ok(())
    }

    pub fn rapid_move(&mut self, pose: Pose) -> HexapodResult<()> {
        self.dispatch_rapid_move(pose, LegMask::ALL, true)
    }

    pub fn move_to_zeros(&mut self) -> HexapodResult<()> {
        self.rapid_move(Pose::zero())
    }

    // --- Per-tick motion executor --------------------------------------

    /// Single entry point, called each tick at >= 50 Hz. Strictly
    /// cooperative: always returns promptly, never blocks, never suspends.
    pub fn walk_perform(&mut self, now_ms: u32) -> HexapodResult<()> {
        if self.step_in_progress {
            self.perform_active_step(now_ms)
        } else {
            self.start_next_step_or_stream_velocity(now_ms)
        }
    }

    fn perform_active_step(&mut self, now_ms: u32) -> HexapodResult<()> {
        // RAPID_MOVE is a single-tick dispatch, not an interpolated move: it
        // has `time_ms == 0` by construction (speed == 0), so it never goes
        // through the `p` fraction at all.
        if self.current_step_type == StepType::RapidMove {
            self.dispatch_rapid_move(self.end_pos, LegMask::ALL, true)?;
            self.step_in_progress = false;
            self.last_step_progress = 0.0;
            return Ok(());
        }

        let elapsed = now_ms.wrapping_sub(self.move_start_time_ms) as f64;
        let p = elapsed / self.move_time_ms as f64;

        if p > 1.0 {
            self.step_in_progress = false;
            self.last_step_progress = 0.0;
            return Ok(());
        }

        match self.current_step_type {
            StepType::LinearMoveAbsolute | StepType::LinearMoveRelative => {
                let next = lerp_pose(self.start_pos, self.end_pos, p);
                self.dispatch_rapid_move(next, LegMask::ALL, true)?;
            }
            StepType::RapidMove => unreachable!("handled above"),
            StepType::Group0 | StepType::Group1 => {
                self.perform_group_step(p)?;
            }
            StepType::ReturnToNeutral => {
                self.perform_return_to_neutral(p)?;
            }
        }

        self.last_step_progress = p;
        Ok(())
    }

    fn lifted_group_mask(&self) -> LegMask {
        match self.current_step_type {
            StepType::Group0 => LegMask::GROUP0,
            StepType::Group1 => LegMask::GROUP1,
            _ => LegMask::ALL,
        }
    }

    /// `GROUP0`/`GROUP1`: the active tripod arcs forward; the other tripod
    /// is mirrored back to neutral in the same tick.
    fn perform_group_step(&mut self, p: f64) -> HexapodResult<()> {
        let lifted_mask = self.lifted_group_mask();
        let other_mask = if lifted_mask == LegMask::GROUP0 {
            LegMask::GROUP1
        } else {
            LegMask::GROUP0
        };

        let lifted_xy = lerp_pose(self.start_pos, self.end_pos, p);
        let z_lift = arch_height(p, self.config.max_step_height);
        let lifted_pose = Pose {
            z: self.start_pos.z + z_lift,
            ..lifted_xy
        };
        self.dispatch_rapid_move(lifted_pose, lifted_mask, true)?;

        let mirrored_xy = Pose {
            x: -lifted_xy.x,
            y: -lifted_xy.y,
            yaw: -lifted_xy.yaw,
            ..lifted_xy
        };
        let mirrored_pose = Pose {
            z: self.start_pos.z + z_lift,
            ..mirrored_xy
        };
        self.dispatch_rapid_move(mirrored_pose, other_mask, false)?;
        Ok(())
    }

    /// `RETURN_TO_NEUTRAL`: the interval is split in half, one tripod
    /// neutralizing per half, with a sign-flip re-mirror at the 0.5
    /// crossing.
    fn perform_return_to_neutral(&mut self, p: f64) -> HexapodResult<()> {
        let crossed_midpoint = self.last_step_progress <= 0.5 && p > 0.5;
        if crossed_midpoint {
            self.start_pos.x = -self.start_pos.x;
            self.start_pos.y = -self.start_pos.y;
            self.start_pos.yaw = -self.start_pos.yaw;
        }

        let first_half_group = if self.last_step_type.is_group() {
            self.last_step_type
        } else {
            StepType::Group0
        };
        let (active_group, rescaled_p) = if p <= 0.5 {
            (first_half_group, p * 2.0)
        } else {
            (first_half_group.toggled_group(), (p - 0.5) * 2.0)
        };

        let active_mask = if active_group == StepType::Group0 {
            LegMask::GROUP0
        } else {
            LegMask::GROUP1
        };

        let neutral_xy = lerp_pose(self.start_pos, self.end_pos, rescaled_p);
        let z_lift = arch_height(rescaled_p, self.config.max_step_height);
        let pose = Pose {
            z: self.start_pos.z + z_lift,
            ..neutral_xy
        };
        self.dispatch_rapid_move(pose, active_mask, false)
    }

    fn start_next_step_or_stream_velocity(&mut self, now_ms: u32) -> HexapodResult<()> {
        if self.step_queue.is_empty() {
            let velocity = self.walk_velocity;
            let scalar = (velocity.magnitude() / self.config.max_step_speed).max(0.25);
            self.enqueue_max_step_in_direction(velocity, scalar)?;
            return Ok(());
        }

        let head = match self.step_queue.dequeue() {
            Some(head) => head,
            None => return Ok(()),
        };

        let group_changed = head.step_type.is_group()
            && self.current_step_type.is_group()
            && head.step_type != self.current_step_type;
        if group_changed {
            debug!(
                from = ?self.current_step_type,
                to = ?head.step_type,
                "tripod group transition"
            );
            self.current_pos.x = -self.current_pos.x;
            self.current_pos.y = -self.current_pos.y;
            self.current_pos.yaw = -self.current_pos.yaw;
        }

        self.last_step_type = self.current_step_type;
        self.current_step_type = head.step_type;
        self.end_pos = if head.step_type.is_relative() {
            self.current_pos + head.end_pos
        } else {
            head.end_pos
        };
        self.start_pos = self.current_pos;
        self.move_start_time_ms = now_ms;
        self.move_time_ms = head.time_ms;
        self.last_step_progress = 0.0;
        self.step_in_progress = true;
        Ok(())
    }

    // --- Per-leg combo executor ----------------------------------------

    /// Returns a 16-bit value: low byte = legs currently moving, high byte
    /// = legs that just received a new op this tick.
    pub fn combo_move_perform(&mut self) -> u16 {
        let mut moving_count: u8 = 0;
        let mut dispatched_count: u8 = 0;

        for i in 0..6 {
            if self.legs[i].is_moving() {
                moving_count += 1;
                continue;
            }
            if let Some(op) = self.leg_queues[i].dequeue() {
                if op.is_wait() {
                    self.legs[i].wait(op.wait_time_ms);
                } else {
                    let speed = op.speed.min(self.config.max_speed);
                    let outcome = self.legs[i].linear_move_setup(op.end_pos, speed, op.relative);
                    if speed < op.speed || outcome == MoveOutcome::SpeedCapped {
                        warn!(
                            leg = i,
                            requested_speed = op.speed,
                            dispatched_speed = speed,
                            "leg move speed capped"
                        );
                    }
                    if !op.relative {
                        self.leg_last_target[i] = op.end_pos;
                    } else {
                        self.leg_last_target[i] = self.leg_last_target[i] + op.end_pos;
                    }
                }
                dispatched_count += 1;
            }
        }

        (moving_count as u16) | ((dispatched_count as u16) << 8)
    }

    /// Drives every leg's own linear-move interpolation forward by one
    /// tick. External per-leg moves queued via `leg_enqueue` are driven to
    /// completion by the leg driver itself once `linear_move_setup` is
    /// called; this just gives every leg a chance to advance.
    pub fn linear_move_perform(&mut self) {
        for leg in self.legs.iter_mut() {
            if leg.is_moving() {
                leg.linear_move_perform();
            }
        }
    }

    /// Convenience tick entry point bundling the combo executor with the
    /// per-leg interpolation advance, for clients that only drive per-leg
    /// choreography and never touch the step queue.
    pub fn run_speed(&mut self) -> u16 {
        let dispatched = self.combo_move_perform();
        self.linear_move_perform();
        dispatched
    }

    // --- Per-leg operation queue ---------------------------------------

    /// Enqueues a per-leg move with an explicit speed; the leg executor
    /// derives the duration from `end_pos`/`speed` on dispatch.
    pub fn leg_enqueue_with_speed(
        &mut self,
        leg: usize,
        end_pos: crate::geometry::Vec3,
        speed: f64,
        relative: bool,
        wait_time_ms: u32,
    ) -> HexapodResult<()> {
        self.leg_queues[leg].enqueue(crate::leg_op::LegOp {
            end_pos,
            speed,
            relative,
            wait_time_ms,
        })
    }

    /// Enqueues a per-leg move with an explicit duration; the queue itself
    /// derives the speed: `displacement / (duration / 1000)` when
    /// the move is non-trivial, else a stationary-wait fallback speed.
    pub fn leg_enqueue_with_duration(
        &mut self,
        leg: usize,
        end_pos: crate::geometry::Vec3,
        duration_ms: u32,
        relative: bool,
        wait_time_ms: u32,
    ) -> HexapodResult<()> {
        let speed = if end_pos.magnitude() > 1e-3 {
            let displacement = if relative {
                end_pos.magnitude()
            } else {
                let tail = self.leg_queues[leg].current_queue_end_pos(self.leg_last_target[leg]);
                (tail - end_pos).magnitude()
            };
            displacement / (duration_ms as f64 / 1000.0)
        } else {
            100.0
        };
        self.leg_enqueue_with_speed(leg, end_pos, speed, relative, wait_time_ms)
    }

    /// Planar distance to `target`: `sqrt(dx^2 + dy^2)`, ignoring z/roll/
    /// pitch/yaw.
    pub fn get_distance(&self, target: Pose) -> f64 {
        let dx = target.x - self.current_pos.x;
        let dy = target.y - self.current_pos.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Parabolic arch peaking at `max_step_height` when `p == 0.5`, zero at the
/// endpoints: `-4 * p * (p - 1) * max_step_height`.
pub(crate) fn arch_height(p: f64, max_step_height: f64) -> f64 {
    -4.0 * p * (p - 1.0) * max_step_height
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::MoveOutcome;
    use crate::geometry::Vec3;
    use approx::assert_relative_eq;

    #[derive(Default)]
    pub(crate) struct FakeLeg {
        pub(crate) moving: bool,
        pub(crate) last_target: Vec3,
    }

    impl LegDriver for FakeLeg {
        fn initialize(&mut self, _leg_index: usize) {}
        fn rapid_move(&mut self, target: Vec3) -> bool {
            self.last_target = target;
            true
        }
        fn linear_move_setup(&mut self, target: Vec3, _speed: f64, _relative: bool) -> MoveOutcome {
            self.last_target = target;
            self.moving = true;
            MoveOutcome::Ok
        }
        fn linear_move_perform(&mut self) {
            self.moving = false;
        }
        fn wait(&mut self, _ms: u32) {}
        fn is_moving(&self) -> bool {
            self.moving
        }
        fn forward_kinematics(&self, _a0: f64, _a1: f64, _a2: f64) -> Vec3 {
            Vec3::zero()
        }
        fn detach_servo(&mut self) {}
    }

    fn fresh_hexapod() -> Hexapod<FakeLeg> {
        Hexapod::new(HexapodConfig::default(), Default::default())
    }

    #[test]
    fn arch_height_peaks_at_midpoint() {
        assert_relative_eq!(arch_height(0.0, 50.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(arch_height(1.0, 50.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(arch_height(0.5, 50.0), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn idle_hexapod_stays_not_busy() {
        let mut hexapod = fresh_hexapod();
        for tick in 0..100u32 {
            hexapod.walk_perform(tick * 20).unwrap();
        }
        assert!(!hexapod.is_busy());
        assert!(hexapod.step_queue.is_empty());
    }

    #[test]
    fn rapid_move_round_trips_into_current_pos() {
        let mut hexapod = fresh_hexapod();
        let target = Pose::new(10.0, -5.0, 120.0, 0.0, 0.0, 0.0);
        hexapod.rapid_move(target).unwrap();
        assert!(hexapod.current_pos().approx_eq(target, 1e-9));
    }

    #[test]
    fn combo_move_perform_reports_zero_dispatch_when_all_queues_empty() {
        let mut hexapod = fresh_hexapod();
        let result = hexapod.combo_move_perform();
        assert_eq!(result >> 8, 0);
    }
}
