#[allow(unused_imports)]
use micromath::F32Ext;
use serde::{Deserialize, Serialize};
use uom::si::{
    angle::radian,
    f32::{Angle, Length},
};

use crate::trajectory::PoseSample;

/// Position and heading of the agent in the planar world frame.
///
/// `theta` is zero along the +x axis and increases counterclockwise. The
/// integrator never wraps it; display layers that need a bounded angle
/// should pass it through [`normalize_angle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: Length,
    pub y: Length,
    pub theta: Angle,
}

/// A static obstacle. Rectangles are axis-aligned and centered on `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Circle {
        x: Length,
        y: Length,
        radius: Length,
    },
    Rect {
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    },
}

/// Circular acceptance region for a mission.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub x: Length,
    pub y: Length,
    pub r: Length,
}

impl Goal {
    // boundary inclusive
    pub fn contains(&self, x: Length, y: Length) -> bool {
        let dx = (x - self.x).value;
        let dy = (y - self.y).value;
        (dx * dx + dy * dy).sqrt() <= self.r.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
}

/// Judges a completed run by its final sample only.
pub fn evaluate(samples: &[PoseSample], goal: &Goal) -> Outcome {
    Outcome {
        success: samples
            .last()
            .map_or(false, |sample| goal.contains(sample.x, sample.y)),
    }
}

// normalize angle to [-pi, pi].
pub fn normalize_angle(angle: Angle) -> Angle {
    use core::f32::consts::{PI, TAU};

    let raw_angle = angle.value.rem_euclid(TAU);

    Angle::new::<radian>(if raw_angle > PI {
        raw_angle - TAU
    } else {
        raw_angle
    })
}
