//! Execution-host session for learner scripts.
//!
//! Owns the mission configuration and the live integrated pose, exposes
//! the five script-facing primitives, and accumulates every
//! motion-producing call in order into the primitive list replayed by the
//! core integrator. Sensor reads always see the current pose, tracked
//! through the same kinematic model as the final playback.

use std::fmt;

use rovercore::{
    command::{Command, Translator},
    sensor::Rangefinder,
    trajectory::{Integrator, PoseSample, Primitive},
    world::{evaluate, Goal, Obstacle, Pose},
};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uom::si::f32::{Angle, Length};

/// World configuration of one mission, read-only to the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub start: Pose,
    pub goal: Goal,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

/// A completed run, handed to presentation adapters as-is.
///
/// Adapters replay `samples`; they must not recompute kinematics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub samples: Vec<PoseSample>,
    pub success: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// The watchdog command cap was hit; the script is not making
    /// progress the session is willing to wait for.
    CommandLimit { limit: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::CommandLimit { limit } => {
                write!(f, "command limit of {} exceeded", limit)
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, TypedBuilder)]
pub struct Session {
    mission: Mission,
    #[builder(default)]
    translator: Translator,
    #[builder(default)]
    integrator: Integrator,
    #[builder(default)]
    rangefinder: Rangefinder,
    #[builder(default = 10_000)]
    command_limit: usize,
    #[builder(default, setter(skip))]
    commands: usize,
    #[builder(default, setter(skip))]
    primitives: Vec<Primitive>,
    #[builder(default, setter(skip))]
    pose: Option<Pose>,
}

impl Session {
    /// The current integrated pose.
    pub fn pose(&self) -> Pose {
        self.pose.unwrap_or(self.mission.start)
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn move_forward(&mut self, distance: Length) -> Result<(), SessionError> {
        self.push(Command::MoveForward(distance))
    }

    pub fn turn_left(&mut self, angle: Angle) -> Result<(), SessionError> {
        self.push(Command::TurnLeft(angle))
    }

    pub fn turn_right(&mut self, angle: Angle) -> Result<(), SessionError> {
        self.push(Command::TurnRight(angle))
    }

    /// Teleports to a known pose, recorded as a zero-duration primitive.
    pub fn set_pose(&mut self, x: Length, y: Length, heading: Angle) -> Result<(), SessionError> {
        self.count_command()?;
        let pose = Pose { x, y, theta: heading };
        self.primitives.push(Primitive::SetPose { pose });
        self.pose = Some(pose);
        Ok(())
    }

    /// Distance to the nearest obstacle along the current heading.
    pub fn front_distance(&self) -> Length {
        self.rangefinder
            .distance(&self.pose(), &self.mission.obstacles)
    }

    /// One sensor sweep of `beams` rays across `fov` from the current pose.
    pub fn scan(&self, beams: u32, fov: Angle) -> Vec<Length> {
        self.rangefinder
            .scan(&self.pose(), &self.mission.obstacles, beams, fov)
            .collect()
    }

    /// Replays the accumulated primitives from the mission start and
    /// judges the goal.
    pub fn finish(self) -> Run {
        let samples = self
            .integrator
            .integrate(&self.primitives, self.mission.start)
            .collect::<Vec<_>>();
        let outcome = evaluate(&samples, &self.mission.goal);
        Run {
            samples,
            success: outcome.success,
        }
    }

    fn push(&mut self, command: Command) -> Result<(), SessionError> {
        self.count_command()?;
        if let Some(primitive) = self.translator.translate(&command) {
            self.advance(&primitive);
            self.primitives.push(primitive);
        }
        Ok(())
    }

    fn count_command(&mut self) -> Result<(), SessionError> {
        if self.commands >= self.command_limit {
            return Err(SessionError::CommandLimit {
                limit: self.command_limit,
            });
        }
        self.commands += 1;
        Ok(())
    }

    // keep the live pose consistent with the final playback by stepping
    // through the same integrator
    fn advance(&mut self, primitive: &Primitive) {
        let sample = self
            .integrator
            .integrate(std::slice::from_ref(primitive), self.pose())
            .last()
            .expect("Should never fail: a trajectory always yields its start sample.");
        self.pose = Some(Pose {
            x: sample.x,
            y: sample.y,
            theta: sample.theta,
        });
    }
}
