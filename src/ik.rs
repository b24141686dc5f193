//! Leg kinematics adapter and body inverse kinematics.
//!
//! The three-joint arm IK/FK that turns a leg-frame foot-tip target into
//! servo angles is external to this crate; everything here stops
//! at the leg frame.

use tracing::warn;

use crate::config::HexapodConfig;
use crate::error::{HexapodError, HexapodResult};
use crate::geometry::{Pose, Vec3};
use crate::leg::LegMask;

/// Safety hooks around body IK. The default implementation returns `true`
/// unconditionally; the hooks exist for future dynamic limits and must not
/// be tightened without test coverage.
pub trait SafetyHooks {
    fn pre_check_safe_pos(&self, _pose: Pose) -> bool {
        true
    }

    fn post_check_safe_coords(&self, _target: Vec3) -> bool {
        true
    }
}

/// The hook implementation used unless a caller supplies their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSafetyHooks;

impl SafetyHooks for DefaultSafetyHooks {}

/// Rotates `body_frame` by the leg's home yaw and adds the stance offset,
/// producing a leg-frame target from a body-frame foot-tip candidate. The
/// downstream arm IK (external) consumes this target.
pub fn leg_frame_target(config: &HexapodConfig, leg_index: usize, body_frame: Vec3) -> Vec3 {
    body_frame.rotated_yaw(config.home_yaws[leg_index]) + config.stance_offset_vec3()
}

/// Maps a body pose to six leg-frame foot-tip targets.
///
/// Procedure: pre-check, rescale roll/pitch/yaw from
/// hundredths-of-radian to radians, per-leg tilt compensation on z,
/// stance transform, post-check on every leg regardless of mask, then emit
/// only the masked legs.
pub fn body_inverse_kinematics(
    config: &HexapodConfig,
    hooks: &dyn SafetyHooks,
    pose: Pose,
    active_legs: LegMask,
) -> HexapodResult<Vec<(usize, Vec3)>> {
    if !hooks.pre_check_safe_pos(pose) {
        warn!(?pose, "body pose rejected by pre-check");
        return Err(HexapodError::PreCheckFail);
    }

    let roll = pose.roll / 100.0;
    let pitch = pose.pitch / 100.0;
    let yaw = pose.yaw / 100.0;

    let mut targets = [Vec3::zero(); 6];
    for (i, target) in targets.iter_mut().enumerate() {
        let z_i = pose.z
            + pitch.sin() * (config.leg_x_offset[i] + pose.x)
            + roll.sin() * (config.leg_y_offset[i] + pose.y);
        let leg_frame = Vec3::new(pose.x, pose.y, z_i)
            .rotated_yaw(config.home_yaws[i])
            + config.stance_offset_vec3();
        *target = leg_frame.rotated_yaw(yaw);
    }

    for (i, target) in targets.iter().enumerate() {
        if !hooks.post_check_safe_coords(*target) {
            warn!(leg = i, ?target, "leg-frame target rejected by post-check");
            return Err(HexapodError::PostCheckFail);
        }
    }

    let mut out = Vec::with_capacity(6);
    for (i, target) in targets.into_iter().enumerate() {
        if active_legs.contains_leg(i) {
            out.push((i, target));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ik_is_deterministic() {
        let config = HexapodConfig::default();
        let hooks = DefaultSafetyHooks;
        let pose = Pose::new(5.0, -3.0, 110.0, 20.0, -10.0, 30.0);
        let a = body_inverse_kinematics(&config, &hooks, pose, LegMask::ALL).unwrap();
        let b = body_inverse_kinematics(&config, &hooks, pose, LegMask::ALL).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tilt_law_matches_first_order_pitch_term() {
        let config = HexapodConfig::default();
        let hooks = DefaultSafetyHooks;
        let epsilon_hundredths = 1.0; // ~0.01 rad once rescaled
        let pose = Pose::new(0.0, 0.0, 100.0, 0.0, epsilon_hundredths, 0.0);
        let targets = body_inverse_kinematics(&config, &hooks, pose, LegMask::ALL).unwrap();

        for (i, target) in targets {
            let expected_z_lift = (epsilon_hundredths / 100.0).sin() * config.leg_x_offset[i];
            // Compare the lifted z relative to the flat-pose baseline for leg i.
            let flat = body_inverse_kinematics(
                &config,
                &hooks,
                Pose::new(0.0, 0.0, 100.0, 0.0, 0.0, 0.0),
                LegMask::single(i),
            )
            .unwrap();
            let (_, flat_target) = flat[0];
            assert_relative_eq!(target.z - flat_target.z, expected_z_lift, epsilon = 1e-9);
        }
    }

    #[test]
    fn mask_filters_emitted_legs() {
        let config = HexapodConfig::default();
        let hooks = DefaultSafetyHooks;
        let pose = Pose::new(0.0, 0.0, 100.0, 0.0, 0.0, 0.0);
        let targets =
            body_inverse_kinematics(&config, &hooks, pose, LegMask::GROUP0).unwrap();
        assert_eq!(targets.len(), 3);
        for (leg, _) in targets {
            assert!(LegMask::GROUP0.contains_leg(leg));
        }
    }

    struct AlwaysRejectPreCheck;
    impl SafetyHooks for AlwaysRejectPreCheck {
        fn pre_check_safe_pos(&self, _pose: Pose) -> bool {
            false
        }
    }

    #[test]
    fn pre_check_failure_is_reported_and_nothing_is_computed() {
        let config = HexapodConfig::default();
        let hooks = AlwaysRejectPreCheck;
        let err = body_inverse_kinematics(
            &config,
            &hooks,
            Pose::zero(),
            LegMask::ALL,
        )
        .unwrap_err();
        assert_eq!(err, HexapodError::PreCheckFail);
    }
}
