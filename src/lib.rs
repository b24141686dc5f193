#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod geometry;
pub mod hexapod;
pub mod ik;
pub mod leg;
pub mod leg_op;
pub mod planner;
pub mod queue;
pub mod step;

pub use config::HexapodConfig;
pub use error::{HexapodError, HexapodResult, MoveOutcome};
pub use geometry::{Pose, Vec3};
pub use hexapod::Hexapod;
pub use leg::{LegDriver, LegMask};
pub use leg_op::LegOp;
pub use step::{Step, StepType};
