//! Example client for the hexapod motion core: two small choreography
//! routines, `dance0`/`dance1`, driving a fake leg backend that just prints
//! dispatched targets. Not part of the crate's public contract.

use clap::{Parser, ValueEnum};
use hexapod_motion::{Hexapod, HexapodConfig, HexapodResult, LegDriver, MoveOutcome, Pose, Vec3};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dance {
    Zero,
    One,
}

#[derive(Parser)]
struct Args {
    #[arg(value_enum, default_value_t = Dance::Zero)]
    dance: Dance,
}

struct PrintingLeg {
    index: usize,
    moving: bool,
}

impl LegDriver for PrintingLeg {
    fn initialize(&mut self, leg_index: usize) {
        self.index = leg_index;
    }

    fn rapid_move(&mut self, target: Vec3) -> bool {
        info!(leg = self.index, ?target, "rapid_move");
        true
    }

    fn linear_move_setup(&mut self, target: Vec3, speed: f64, relative: bool) -> MoveOutcome {
        info!(leg = self.index, ?target, speed, relative, "linear_move_setup");
        self.moving = true;
        MoveOutcome::Ok
    }

    fn linear_move_perform(&mut self) {
        self.moving = false;
    }

    fn wait(&mut self, ms: u32) {
        info!(leg = self.index, ms, "wait");
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn forward_kinematics(&self, _a0: f64, _a1: f64, _a2: f64) -> Vec3 {
        Vec3::zero()
    }

    fn detach_servo(&mut self) {
        info!(leg = self.index, "detach_servo");
    }
}

fn new_legs() -> [PrintingLeg; 6] {
    std::array::from_fn(|i| PrintingLeg {
        index: i,
        moving: false,
    })
}

/// Raises each leg of GROUP0 in turn, holds, then the same for GROUP1 --
/// a "wave" translated from the firmware's `dance0`.
fn dance0(hexapod: &mut Hexapod<PrintingLeg>) -> HexapodResult<()> {
    for &group in &[[0usize, 2, 4], [1, 3, 5]] {
        for leg in group {
            hexapod.leg_enqueue_with_speed(leg, Vec3::new(0.0, 0.0, 40.0), 80.0, true, 0)?;
            hexapod.leg_enqueue_with_speed(leg, Vec3::zero(), 80.0, false, 200)?;
        }
    }
    Ok(())
}

/// Body sway translated from `dance1`: a short walk forward and back.
fn dance1(hexapod: &mut Hexapod<PrintingLeg>) -> HexapodResult<()> {
    hexapod.walk_setup(Pose::new(40.0, 0.0, 0.0, 0.0, 0.0, 0.0), 80.0)?;
    hexapod.walk_setup(Pose::new(-40.0, 0.0, 0.0, 0.0, 0.0, 0.0), 80.0)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut hexapod = Hexapod::new(HexapodConfig::default(), new_legs());

    match args.dance {
        Dance::Zero => dance0(&mut hexapod)?,
        Dance::One => dance1(&mut hexapod)?,
    }

    // A fixed tick budget rather than polling `is_busy()`: the printing leg
    // backend reports "not moving" the tick after dispatch, so it cannot
    // drive a real busy-wait the way a servo-backed leg would.
    for tick in 0..1000u32 {
        hexapod.walk_perform(tick * 20)?;
        hexapod.run_speed();
    }

    Ok(())
}
