//! The step queue and walk planner: reach envelope, the quadratic
//! max-step-in-direction solve, walk setup, and the continuous velocity
//! command.

use crate::error::HexapodResult;
use crate::geometry::Pose;
use crate::hexapod::Hexapod;
use crate::leg::LegDriver;
use crate::ik::SafetyHooks;
use crate::step::{Step, StepType};

/// Discriminant tolerance below which the quadratic is treated as having a
/// single (repeated) root.
const DISCRIMINANT_EPSILON: f64 = 1e-3;

/// Below this relative displacement magnitude, `walk_setup` treats the
/// request as a no-op.
const NO_OP_EPSILON: f64 = 1e-3;

impl<L: LegDriver, H: SafetyHooks> Hexapod<L, H> {
    /// The lookahead pose the planner reasons against: the pose the body
    /// will be at once everything currently queued has executed.
    fn queue_lookahead(&self) -> Pose {
        self.step_queue.current_queue_end_pos(self.current_pos)
    }

    /// `M(q) = MAX_STEP_MAGNITUDE - sqrt(((q.z-100)/2)^2 + q.roll^2 + q.pitch^2) / 2`
    pub fn max_step_magnitude(&self, q: Pose) -> f64 {
        let dz = (q.z - crate::hexapod::NOMINAL_STANCE_Z) / 2.0;
        let deviation = (dz * dz + q.roll * q.roll + q.pitch * q.pitch).sqrt();
        self.config.max_step_magnitude - deviation / 2.0
    }

    /// Public introspection: `max_step_magnitude` at the current lookahead.
    pub fn get_max_step_magnitude(&self) -> f64 {
        self.max_step_magnitude(self.queue_lookahead())
    }

    /// Solves for the largest positive scalar `s` such that
    /// `|a + s*b| = M(q)`, where `a` is `q`'s planar+yaw projection
    /// (negated if `flipped`) and `b` is the unit planar+yaw projection of
    /// `dir`.
    fn max_step_in_direction(&self, q: Pose, dir: Pose, flipped: bool) -> f64 {
        let mut a = q.xy_yaw_projection();
        if flipped {
            a = -a;
        }
        let b = dir.xy_yaw_projection().unit_vector();

        let m = self.max_step_magnitude(q);
        let a_coef = b.dot(b);
        let b_coef = 2.0 * a.dot(b);
        let c_coef = a.dot(a) - m * m;

        if a_coef.abs() < 1e-12 {
            return 0.0;
        }

        let discriminant = b_coef * b_coef - 4.0 * a_coef * c_coef;
        if discriminant < 0.0 {
            return 0.0;
        }
        if discriminant.abs() <= DISCRIMINANT_EPSILON {
            return -b_coef / (2.0 * a_coef);
        }
        let sqrt_disc = discriminant.sqrt();
        let root_plus = (-b_coef + sqrt_disc) / (2.0 * a_coef);
        if root_plus > 0.0 {
            root_plus
        } else {
            (-b_coef - sqrt_disc) / (2.0 * a_coef)
        }
    }

    fn enqueue_step(&mut self, displacement_or_target: Pose, speed: f64, step_type: StepType) -> HexapodResult<u32> {
        let time_ms = if speed > 1e-9 {
            ((displacement_or_target.magnitude() / speed) * 1000.0) as u32
        } else {
            0
        };
        self.step_queue
            .enqueue(Step::new(displacement_or_target, speed, time_ms, step_type))?;
        Ok(time_ms)
    }

    fn enqueue_return_to_neutral(&mut self, q: Pose, speed: f64) -> HexapodResult<u32> {
        let neutral_target = Pose {
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
            ..q
        };
        self.enqueue_step(neutral_target, speed, StepType::ReturnToNeutral)
    }

    pub fn return_to_neutral(&mut self) -> HexapodResult<u32> {
        let q = self.queue_lookahead();
        self.enqueue_return_to_neutral(q, self.config.step_to_neutral_speed)
    }

    pub fn enqueue_rapid_move(&mut self, pose: Pose) -> HexapodResult<u32> {
        self.enqueue_step(pose, 0.0, StepType::RapidMove)
    }

    pub fn enqueue_linear_move(&mut self, pose: Pose, speed: f64, relative: bool) -> HexapodResult<u32> {
        let step_type = if relative {
            StepType::LinearMoveRelative
        } else {
            StepType::LinearMoveAbsolute
        };
        self.enqueue_step(pose, speed, step_type)
    }

    /// `stand()`/`sit()` are named convenience wrappers around
    /// `enqueue_rapid_move` to a canonical body height.
    pub fn stand(&mut self) -> HexapodResult<u32> {
        self.enqueue_rapid_move(Pose::new(0.0, 0.0, 150.0, 0.0, 0.0, 0.0))
    }

    pub fn sit(&mut self) -> HexapodResult<u32> {
        self.enqueue_rapid_move(Pose::new(0.0, 0.0, 40.0, 0.0, 0.0, 0.0))
    }

    pub fn set_walk_velocity(&mut self, velocity: Pose) {
        self.walk_velocity = velocity;
    }

    /// Converts a relative displacement into a queued sequence of
    /// alternating-tripod steps, bounded by the reach envelope.
    /// Returns the total queued time in milliseconds, or `0` if the
    /// request collapsed to a no-op.
    pub fn walk_setup(&mut self, r: Pose, speed: f64) -> HexapodResult<u32> {
        // Step 1: no-op check against the canonical current pose.
        if r.magnitude() <= NO_OP_EPSILON {
            let projected_end = self.current_pos + r;
            let within_limits = projected_end.z.abs() <= self.config.z_max_magnitude
                && projected_end.roll.abs() <= self.config.roll_max_magnitude
                && projected_end.pitch.abs() <= self.config.pitch_max_magnitude;
            if within_limits {
                return Ok(0);
            }
        }

        let q = self.queue_lookahead();

        // Step 2: within the no-step envelope -> a single linear relative move.
        if (q.x + r.x).abs() <= self.config.x_max_no_step_magnitude
            && (q.y + r.y).abs() <= self.config.y_max_no_step_magnitude
            && (q.yaw + r.yaw).abs() <= self.config.yaw_max_no_step_magnitude
        {
            return self.enqueue_linear_move(r, speed, true);
        }

        // Step 3: tripod step sequence.
        let dir = r.unit_vector();
        let s_flip = self.max_step_in_direction(q, dir, true);
        let s_noflip = self.max_step_in_direction(q, dir, false);
        let (flip_first, mut s) = if s_flip >= s_noflip {
            (true, s_flip)
        } else {
            (false, s_noflip)
        };

        let mut total_ms = 0u32;
        let mut q = q;
        if s < self.max_step_magnitude(q) {
            total_ms += self.enqueue_return_to_neutral(q, speed)?;
            q = self.queue_lookahead();
            s = self.max_step_in_direction(q, dir, false);
        } else if flip_first {
            self.next_step_type = self.next_step_type.toggled_group();
        }

        if s > r.magnitude() {
            total_ms += self.enqueue_step(r, speed, self.next_step_type)?;
            return Ok(total_ms);
        }

        let first_step = dir * s;
        total_ms += self.enqueue_step(first_step, speed, self.next_step_type)?;
        let mut traveled = first_step;

        // Bounded by the step queue's fixed capacity: `enqueue_step` fails
        // with `QueueFull` once it fills, which is the backstop against a
        // pathological direction/envelope combination never converging.
        loop {
            self.next_step_type = self.next_step_type.toggled_group();
            let s_k = self.max_step_in_direction(q, dir, true);
            let step = dir * s_k;
            if (traveled + step).magnitude() >= r.magnitude() {
                let remainder = r - traveled;
                total_ms += self.enqueue_step(remainder, speed, self.next_step_type)?;
                break;
            }
            total_ms += self.enqueue_step(step, speed, self.next_step_type)?;
            traveled = traveled + step;
        }

        Ok(total_ms)
    }

    /// Velocity-command path: enqueues at most one step per call,
    /// sized by the reach envelope and scaled by `scalar`.
    pub fn enqueue_max_step_in_direction(&mut self, d: Pose, scalar: f64) -> HexapodResult<u32> {
        let projected = d.xy_yaw_projection();
        if projected.magnitude() < 1e-3 {
            return Ok(0);
        }

        let q = self.queue_lookahead();
        let s_flip = self.max_step_in_direction(q, d, true);
        let s_noflip = self.max_step_in_direction(q, d, false);
        let (flipped_wins, chosen_magnitude) = if s_flip >= s_noflip {
            (true, s_flip)
        } else {
            (false, s_noflip)
        };
        if flipped_wins {
            self.next_step_type = self.next_step_type.toggled_group();
        }

        let speed = self.walk_velocity.magnitude();

        let mut total_ms = 0u32;
        if chosen_magnitude < self.max_step_magnitude(q) {
            total_ms += self.enqueue_return_to_neutral(q, speed)?;
        }

        let displacement = projected.unit_vector() * (chosen_magnitude * scalar.abs());
        total_ms += self.enqueue_step(displacement, speed, self.next_step_type)?;
        Ok(total_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HexapodConfig;
    use crate::hexapod::tests::FakeLeg;
    use approx::assert_relative_eq;

    fn fresh_hexapod() -> Hexapod<FakeLeg> {
        Hexapod::new(HexapodConfig::default(), Default::default())
    }

    #[test]
    fn envelope_is_full_magnitude_at_nominal_stance() {
        let hexapod = fresh_hexapod();
        let q = Pose::new(0.0, 0.0, 100.0, 0.0, 0.0, 0.0);
        assert_relative_eq!(
            hexapod.max_step_magnitude(q),
            hexapod.config.max_step_magnitude,
            epsilon = 1e-9
        );
    }

    #[test]
    fn envelope_shrinks_away_from_nominal_z() {
        let hexapod = fresh_hexapod();
        let nominal = Pose::new(0.0, 0.0, 100.0, 0.0, 0.0, 0.0);
        let deviated = Pose::new(0.0, 0.0, 120.0, 0.0, 0.0, 0.0);
        assert!(hexapod.max_step_magnitude(deviated) < hexapod.max_step_magnitude(nominal));
    }

    #[test]
    fn short_poke_within_no_step_envelope_is_a_single_linear_move() {
        let mut hexapod = fresh_hexapod();
        let queued_ms = hexapod
            .walk_setup(Pose::new(10.0, 0.0, 0.0, 0.0, 0.0, 0.0), 100.0)
            .unwrap();
        assert_eq!(queued_ms, 100);
        assert_eq!(hexapod.step_queue.len(), 1);
        assert_eq!(
            hexapod.step_queue.head().unwrap().step_type,
            StepType::LinearMoveRelative
        );
    }

    #[test]
    fn long_walk_from_nominal_stance_alternates_groups_without_neutralizing() {
        let mut hexapod = fresh_hexapod();
        let queued_ms = hexapod
            .walk_setup(Pose::new(150.0, 0.0, 0.0, 0.0, 0.0, 0.0), 100.0)
            .unwrap();
        assert!(queued_ms > 0);

        let mut total_x = 0.0;
        let mut last_group: Option<StepType> = None;
        let mut total_time = 0u32;
        while let Some(step) = hexapod.step_queue.dequeue() {
            assert_ne!(step.step_type, StepType::ReturnToNeutral);
            if let Some(prev) = last_group {
                assert_ne!(prev, step.step_type);
            }
            last_group = Some(step.step_type);
            total_x += step.end_pos.x;
            total_time += step.time_ms;
        }
        assert_relative_eq!(total_x, 150.0, epsilon = 1e-3);
        assert_eq!(total_time, queued_ms);
    }

    #[test]
    fn reverse_after_forward_inserts_return_to_neutral() {
        let mut hexapod = fresh_hexapod();
        hexapod
            .walk_setup(Pose::new(150.0, 0.0, 0.0, 0.0, 0.0, 0.0), 100.0)
            .unwrap();
        while hexapod.step_queue.dequeue().is_some() {}

        hexapod
            .walk_setup(Pose::new(-150.0, 0.0, 0.0, 0.0, 0.0, 0.0), 100.0)
            .unwrap();
        let first = hexapod.step_queue.dequeue().unwrap();
        assert_eq!(first.step_type, StepType::ReturnToNeutral);

        let mut total_x = 0.0;
        while let Some(step) = hexapod.step_queue.dequeue() {
            total_x += step.end_pos.x;
        }
        assert_relative_eq!(total_x, -150.0, epsilon = 1e-3);
    }

    #[test]
    fn velocity_streaming_enqueues_one_forward_step_per_idle_tick() {
        let mut hexapod = fresh_hexapod();
        hexapod.set_walk_velocity(Pose::new(50.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        hexapod.walk_perform(0).unwrap();
        assert_eq!(hexapod.step_queue.len(), 1);
        let step = hexapod.step_queue.head().unwrap();
        assert!(step.end_pos.x > 0.0);
        assert!(step.end_pos.magnitude() <= hexapod.get_max_step_magnitude() + 1e-6);
    }
}
