//! Pure-value 3-vector and 6-DOF pose algebra.
//!
//! Linear components are millimetres. `Pose`'s angular components are stored
//! as hundredths of a radian so that roll/pitch/yaw share numeric scale with
//! the linear components in the reach-envelope quadratic (see
//! [`crate::planner`]); callers must divide by 100 before calling trig
//! functions, which [`crate::ik`] does at the one place it matters.

use nalgebra::Vector3;
use std::ops::{Add, Mul, Neg, Sub};

/// Below this magnitude a vector/pose is treated as the zero vector for the
/// purposes of `unit_vector()`.
const ZERO_MAGNITUDE_EPSILON: f64 = 1e-3;

/// Componentwise equality tolerance used by tests.
pub const EPSILON: f64 = 1e-6;

/// An ordered triple of reals: a point or displacement in body or leg frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub const fn zero() -> Self {
        Vec3::new(0.0, 0.0, 0.0)
    }

    fn as_nalgebra(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn magnitude(self) -> f64 {
        self.as_nalgebra().norm()
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.as_nalgebra().dot(&other.as_nalgebra())
    }

    /// Unit vector in the direction of `self`. A near-zero vector (magnitude
    /// below `1e-3`) yields the zero vector rather than dividing by ~0.
    pub fn unit_vector(self) -> Vec3 {
        let mag = self.magnitude();
        if mag < ZERO_MAGNITUDE_EPSILON {
            Vec3::zero()
        } else {
            self * (1.0 / mag)
        }
    }

    /// In-place rotation about the z axis by `theta` radians.
    pub fn rotate_yaw(&mut self, theta: f64) {
        *self = self.rotated_yaw(theta);
    }

    /// Returns `self` rotated about the z axis by `theta` radians.
    pub fn rotated_yaw(self, theta: f64) -> Vec3 {
        let (sin, cos) = theta.sin_cos();
        Vec3::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        self * -1.0
    }
}

/// A 6-DOF body pose: `(x, y, z)` in millimetres, `(roll, pitch, yaw)` in
/// hundredths of a radian.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Pose {
    #[allow(clippy::too_many_arguments)]
    pub const fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Pose {
            x,
            y,
            z,
            roll,
            pitch,
            yaw,
        }
    }

    pub const fn zero() -> Self {
        Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Euclidean norm over all six components.
    pub fn magnitude(self) -> f64 {
        (self.x * self.x
            + self.y * self.y
            + self.z * self.z
            + self.roll * self.roll
            + self.pitch * self.pitch
            + self.yaw * self.yaw)
            .sqrt()
    }

    pub fn dot(self, other: Pose) -> f64 {
        self.x * other.x
            + self.y * other.y
            + self.z * other.z
            + self.roll * other.roll
            + self.pitch * other.pitch
            + self.yaw * other.yaw
    }

    /// Unit vector in 6-space; a near-zero pose yields the zero pose.
    pub fn unit_vector(self) -> Pose {
        let mag = self.magnitude();
        if mag < ZERO_MAGNITUDE_EPSILON {
            Pose::zero()
        } else {
            self * (1.0 / mag)
        }
    }

    /// Projection used by the planner: keeps `x`, `y`, `yaw`, zeroes the
    /// rest. The planner's reach envelope only ever reasons about planar
    /// translation plus yaw.
    pub fn xy_yaw_projection(self) -> Pose {
        Pose::new(self.x, self.y, 0.0, 0.0, 0.0, self.yaw)
    }

    pub fn approx_eq(self, other: Pose, epsilon: f64) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
            && (self.roll - other.roll).abs() < epsilon
            && (self.pitch - other.pitch).abs() < epsilon
            && (self.yaw - other.yaw).abs() < epsilon
    }
}

impl Add for Pose {
    type Output = Pose;
    fn add(self, rhs: Pose) -> Pose {
        Pose::new(
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
            self.roll + rhs.roll,
            self.pitch + rhs.pitch,
            self.yaw + rhs.yaw,
        )
    }
}

impl Sub for Pose {
    type Output = Pose;
    fn sub(self, rhs: Pose) -> Pose {
        Pose::new(
            self.x - rhs.x,
            self.y - rhs.y,
            self.z - rhs.z,
            self.roll - rhs.roll,
            self.pitch - rhs.pitch,
            self.yaw - rhs.yaw,
        )
    }
}

impl Mul<f64> for Pose {
    type Output = Pose;
    fn mul(self, rhs: f64) -> Pose {
        Pose::new(
            self.x * rhs,
            self.y * rhs,
            self.z * rhs,
            self.roll * rhs,
            self.pitch * rhs,
            self.yaw * rhs,
        )
    }
}

impl Neg for Pose {
    type Output = Pose;
    fn neg(self) -> Pose {
        self * -1.0
    }
}

/// Linear interpolation between `start` and `end` at fraction `p`.
pub fn lerp_pose(start: Pose, end: Pose, p: f64) -> Pose {
    start + (end - start) * p
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pose_add_negate_is_zero() {
        let p = Pose::new(1.0, -2.0, 3.0, 4.0, -5.0, 6.0);
        let sum = p + (-p);
        assert_relative_eq!(sum.magnitude(), 0.0, epsilon = EPSILON);
    }

    #[test]
    fn unit_vector_is_unit_or_zero() {
        let p = Pose::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_relative_eq!(p.unit_vector().magnitude(), 1.0, epsilon = EPSILON);

        let zero = Pose::zero();
        assert_relative_eq!(zero.unit_vector().magnitude(), 0.0, epsilon = EPSILON);
    }

    #[test]
    fn yaw_rotation_by_pi_twice_is_identity() {
        let mut v = Vec3::new(12.0, -7.0, 3.0);
        let original = v;
        v.rotate_yaw(std::f64::consts::PI);
        v.rotate_yaw(std::f64::consts::PI);
        assert_relative_eq!(v.x, original.x, epsilon = 1e-9);
        assert_relative_eq!(v.y, original.y, epsilon = 1e-9);
        assert_relative_eq!(v.z, original.z, epsilon = 1e-9);
    }

    #[test]
    fn rotate_yaw_is_exact_at_quarter_turn() {
        let v = Vec3::new(1.0, 0.0, 0.0);
        let rotated = v.rotated_yaw(std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-9);
    }
}
