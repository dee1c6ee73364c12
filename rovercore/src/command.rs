use core::marker::PhantomData;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uom::si::{
    angle::radian,
    angular_velocity::radian_per_second,
    f32::{Angle, AngularVelocity, Length, Time, Velocity},
    time::second,
};

use crate::trajectory::Primitive;

/// A parsed script command. Distances are metric, angles follow the
/// script's left/right convention.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    MoveForward(Length),
    TurnLeft(Angle),
    TurnRight(Angle),
}

/// Maps commands onto drive primitives at fixed nominal speeds.
#[derive(Clone, Copy, Debug, TypedBuilder)]
pub struct Translator {
    #[builder(default = Velocity { value: 0.25, dimension: PhantomData, units: PhantomData })]
    linear_speed: Velocity,
    // 45 deg/s
    #[builder(default = AngularVelocity { value: core::f32::consts::FRAC_PI_4, dimension: PhantomData, units: PhantomData })]
    angular_speed: AngularVelocity,
}

impl Default for Translator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Translator {
    /// Translates one command into at most one primitive.
    ///
    /// Zero-magnitude commands map to `None` so the integrator never sees
    /// zero-duration segments. Negative arguments reverse the motion.
    pub fn translate(&self, command: &Command) -> Option<Primitive> {
        match *command {
            Command::MoveForward(distance) => {
                if distance.value == 0.0 {
                    return None;
                }
                let duration: Time = distance.abs() / self.linear_speed;
                let v = if distance.value < 0.0 {
                    -self.linear_speed
                } else {
                    self.linear_speed
                };
                Some(Primitive::Drive {
                    v,
                    w: AngularVelocity::default(),
                    duration,
                })
            }
            Command::TurnLeft(angle) => self.spin(angle, 1.0),
            Command::TurnRight(angle) => self.spin(angle, -1.0),
        }
    }

    fn spin(&self, angle: Angle, sign: f32) -> Option<Primitive> {
        if angle.value == 0.0 {
            return None;
        }
        let duration = Time::new::<second>(
            (angle.get::<radian>() / self.angular_speed.get::<radian_per_second>()).abs(),
        );
        let w = if angle.value < 0.0 {
            -sign * self.angular_speed
        } else {
            sign * self.angular_speed
        };
        Some(Primitive::Drive {
            v: Velocity::default(),
            w,
            duration,
        })
    }
}
