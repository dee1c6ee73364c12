use core::marker::PhantomData;
use core::slice;

#[allow(unused_imports)]
use micromath::F32Ext;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uom::si::{
    f32::{Angle, AngularVelocity, Length, Time, Velocity},
    ratio::ratio,
};

use crate::world::Pose;

/// An atomic motion instruction.
///
/// Primitives are immutable values: produced once per command, consumed
/// once by the integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Constant-velocity arc/straight segment.
    Drive {
        v: Velocity,
        w: AngularVelocity,
        duration: Time,
    },
    /// Instantaneous teleport overriding the integration state.
    SetPose { pose: Pose },
}

/// One row of a trajectory; `t` is cumulative simulated time from the
/// trajectory start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub t: Time,
    pub x: Length,
    pub y: Length,
    pub theta: Angle,
}

#[derive(Clone, Copy, Debug, TypedBuilder)]
pub struct Integrator {
    #[builder(default = Time { value: 0.02, dimension: PhantomData, units: PhantomData })]
    period: Time,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Integrator {
    pub fn period(&self) -> Time {
        self.period
    }

    /// Integrates `primitives` from `start` into a dense pose sequence.
    ///
    /// The returned iterator always yields the start pose at `t = 0`
    /// first, then one sample per forward-Euler step. Panics if the
    /// integration period is not positive; that is a caller programming
    /// error, not a recoverable condition.
    pub fn integrate<'a>(&self, primitives: &'a [Primitive], start: Pose) -> Trajectory<'a> {
        assert!(
            self.period.value > 0.0,
            "integration period must be positive"
        );
        Trajectory {
            primitives: primitives.iter(),
            period: self.period,
            x: start.x,
            y: start.y,
            theta: start.theta,
            t: Time::default(),
            segment: None,
            started: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Segment {
    v: Velocity,
    w: AngularVelocity,
    step: Time,
    remaining: u32,
}

/// Dense, time-stamped pose sequence produced by [`Integrator::integrate`].
#[derive(Clone, Debug)]
pub struct Trajectory<'a> {
    primitives: slice::Iter<'a, Primitive>,
    period: Time,
    x: Length,
    y: Length,
    theta: Angle,
    t: Time,
    segment: Option<Segment>,
    started: bool,
}

impl Trajectory<'_> {
    fn sample(&self) -> PoseSample {
        PoseSample {
            t: self.t,
            x: self.x,
            y: self.y,
            theta: self.theta,
        }
    }
}

impl Iterator for Trajectory<'_> {
    type Item = PoseSample;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            return Some(self.sample());
        }
        loop {
            if let Some(mut segment) = self.segment.take() {
                if segment.remaining > 0 {
                    segment.remaining -= 1;
                    let Segment { v, w, step, .. } = segment;
                    self.segment = Some(segment);
                    self.x += v * self.theta.value.cos() * step;
                    self.y += v * self.theta.value.sin() * step;
                    self.theta += Angle::from(w * step);
                    self.t += step;
                    return Some(self.sample());
                }
            }
            match self.primitives.next()? {
                &Primitive::Drive { v, w, duration } => {
                    if duration.value <= 0.0 {
                        continue;
                    }
                    // reproduce the segment duration exactly regardless of
                    // the period granularity
                    let steps = (duration / self.period).get::<ratio>().round().max(1.0);
                    self.segment = Some(Segment {
                        v,
                        w,
                        step: duration / steps,
                        remaining: steps as u32,
                    });
                }
                &Primitive::SetPose { pose } => {
                    // discontinuity: no time elapses, no interpolation
                    self.x = pose.x;
                    self.y = pose.y;
                    self.theta = pose.theta;
                    return Some(self.sample());
                }
            }
        }
    }
}
