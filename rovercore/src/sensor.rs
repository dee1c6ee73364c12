use core::marker::PhantomData;

#[allow(unused_imports)]
use micromath::F32Ext;
use typed_builder::TypedBuilder;
use uom::si::{
    f32::{Angle, Length},
    length::meter,
};

use crate::world::{Obstacle, Pose};

/// Virtual rangefinder: casts rays against the static obstacle set.
///
/// Pure over its inputs and O(obstacle count) per beam, so hosts may call
/// it at arbitrary rate mid-script.
#[derive(Clone, Copy, Debug, TypedBuilder)]
pub struct Rangefinder {
    #[builder(default = Length { value: 5.0, dimension: PhantomData, units: PhantomData })]
    max_range: Length,
}

impl Default for Rangefinder {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Rangefinder {
    pub fn max_range(&self) -> Length {
        self.max_range
    }

    /// Distance along the heading ray to the nearest obstacle surface,
    /// clamped to `[0, max_range]`; `max_range` on a miss.
    pub fn distance(&self, pose: &Pose, obstacles: &[Obstacle]) -> Length {
        self.cast(pose.x.value, pose.y.value, pose.theta.value, obstacles)
    }

    /// Fans `beams` rays evenly across `fov` centered on the heading.
    ///
    /// A single beam degenerates to [`Rangefinder::distance`]; zero beams
    /// yield an empty scan.
    pub fn scan<'a>(
        &self,
        pose: &Pose,
        obstacles: &'a [Obstacle],
        beams: u32,
        fov: Angle,
    ) -> Scan<'a> {
        let (first, step) = if beams < 2 {
            (pose.theta.value, 0.0)
        } else {
            (
                pose.theta.value - fov.value / 2.0,
                fov.value / (beams - 1) as f32,
            )
        };
        Scan {
            rangefinder: *self,
            x: pose.x.value,
            y: pose.y.value,
            first,
            step,
            index: 0,
            beams,
            obstacles,
        }
    }

    fn cast(&self, x: f32, y: f32, theta: f32, obstacles: &[Obstacle]) -> Length {
        let (dir_x, dir_y) = (theta.cos(), theta.sin());
        let mut nearest = self.max_range.value;
        for obstacle in obstacles {
            let hit = match *obstacle {
                Obstacle::Circle {
                    x: cx,
                    y: cy,
                    radius,
                } => ray_circle(x, y, dir_x, dir_y, cx.value, cy.value, radius.value),
                Obstacle::Rect {
                    x: cx,
                    y: cy,
                    width,
                    height,
                } => ray_rect(
                    x,
                    y,
                    dir_x,
                    dir_y,
                    cx.value,
                    cy.value,
                    width.value,
                    height.value,
                ),
            };
            if let Some(distance) = hit {
                nearest = nearest.min(distance);
            }
        }
        Length::new::<meter>(nearest)
    }
}

/// Beam-by-beam distances of one sensor sweep.
#[derive(Clone, Debug)]
pub struct Scan<'a> {
    rangefinder: Rangefinder,
    x: f32,
    y: f32,
    first: f32,
    step: f32,
    index: u32,
    beams: u32,
    obstacles: &'a [Obstacle],
}

impl Iterator for Scan<'_> {
    type Item = Length;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.beams {
            return None;
        }
        let theta = self.first + self.index as f32 * self.step;
        self.index += 1;
        Some(self
            .rangefinder
            .cast(self.x, self.y, theta, self.obstacles))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.beams - self.index) as usize;
        (remaining, Some(remaining))
    }
}

// Smallest non-negative ray parameter; an origin inside the circle reports
// the exit root, never zero.
fn ray_circle(x: f32, y: f32, dir_x: f32, dir_y: f32, cx: f32, cy: f32, radius: f32) -> Option<f32> {
    let (to_x, to_y) = (cx - x, cy - y);
    let along = to_x * dir_x + to_y * dir_y;
    let perp = to_x * dir_y - to_y * dir_x;
    let disc = radius * radius - perp * perp;
    if disc < 0.0 {
        return None;
    }
    let half = disc.sqrt();
    if along - half >= 0.0 {
        Some(along - half)
    } else if along + half >= 0.0 {
        Some(along + half)
    } else {
        None
    }
}

// Two-axis slab test; an origin inside the rectangle reports the exit
// parameter (already-touching, not zero).
#[allow(clippy::too_many_arguments)]
fn ray_rect(
    x: f32,
    y: f32,
    dir_x: f32,
    dir_y: f32,
    cx: f32,
    cy: f32,
    width: f32,
    height: f32,
) -> Option<f32> {
    let mut entry = f32::NEG_INFINITY;
    let mut exit = f32::INFINITY;
    for (origin, dir, lo, hi) in [
        (x, dir_x, cx - width / 2.0, cx + width / 2.0),
        (y, dir_y, cy - height / 2.0, cy + height / 2.0),
    ] {
        if dir == 0.0 {
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }
        let t0 = (lo - origin) / dir;
        let t1 = (hi - origin) / dir;
        let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        entry = entry.max(t0);
        exit = exit.min(t1);
    }
    if entry > exit || exit < 0.0 {
        return None;
    }
    Some(if entry >= 0.0 { entry } else { exit })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use core::f32::consts::PI;
    use uom::si::angle::{degree, radian};

    use super::*;

    fn circle(x: f32, y: f32, radius: f32) -> Obstacle {
        Obstacle::Circle {
            x: Length::new::<meter>(x),
            y: Length::new::<meter>(y),
            radius: Length::new::<meter>(radius),
        }
    }

    fn rect(x: f32, y: f32, width: f32, height: f32) -> Obstacle {
        Obstacle::Rect {
            x: Length::new::<meter>(x),
            y: Length::new::<meter>(y),
            width: Length::new::<meter>(width),
            height: Length::new::<meter>(height),
        }
    }

    fn pose(x: f32, y: f32, theta: f32) -> Pose {
        Pose {
            x: Length::new::<meter>(x),
            y: Length::new::<meter>(y),
            theta: Angle::new::<radian>(theta),
        }
    }

    #[test]
    fn test_circle_front_distance() {
        let rangefinder = Rangefinder::default();
        let world = [circle(3.0, 0.0, 1.0)];

        let distance = rangefinder.distance(&pose(0.0, 0.0, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 2.0, epsilon = 1e-5);

        // facing away: full range
        let distance = rangefinder.distance(&pose(0.0, 0.0, PI), &world);
        assert_relative_eq!(distance.get::<meter>(), 5.0);
    }

    #[test]
    fn test_circle_origin_inside_reports_exit() {
        let rangefinder = Rangefinder::default();
        let world = [circle(0.2, 0.0, 1.0)];

        let distance = rangefinder.distance(&pose(0.0, 0.0, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 1.2, epsilon = 1e-5);
    }

    #[test]
    fn test_circle_behind_is_miss() {
        let rangefinder = Rangefinder::default();
        let world = [circle(-3.0, 0.0, 1.0)];

        let distance = rangefinder.distance(&pose(0.0, 0.0, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 5.0);
    }

    #[test]
    fn test_rect_front_distance() {
        let rangefinder = Rangefinder::default();
        let world = [rect(3.0, 0.0, 2.0, 2.0)];

        let distance = rangefinder.distance(&pose(0.0, 0.0, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rect_origin_inside_reports_exit() {
        let rangefinder = Rangefinder::default();
        let world = [rect(0.0, 0.0, 2.0, 2.0)];

        // flagged behavior: already-touching reports the exit, not zero
        let distance = rangefinder.distance(&pose(0.0, 0.0, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rect_oblique_hit() {
        let rangefinder = Rangefinder::default();
        let world = [rect(2.0, 2.0, 2.0, 2.0)];

        // 45 degrees towards the corner-on square: entry face at (1, 1)
        let distance = rangefinder.distance(&pose(0.0, 0.0, PI / 4.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 2.0f32.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_nearest_obstacle_wins() {
        let rangefinder = Rangefinder::default();
        let world = [
            circle(4.0, 0.0, 1.0),
            rect(2.0, 0.0, 1.0, 1.0),
            circle(10.0, 0.0, 1.0),
        ];

        let distance = rangefinder.distance(&pose(0.0, 0.0, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_obstacles_terminate() {
        let rangefinder = Rangefinder::default();
        let world = [circle(2.0, 0.0, 0.0), rect(3.0, 0.0, 0.0, 0.0)];

        // zero-size geometry lying exactly on the ray still yields finite
        // distances
        let distance = rangefinder.distance(&pose(0.0, 0.0, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 2.0, epsilon = 1e-5);

        let distance = rangefinder.distance(&pose(0.0, 0.1, 0.0), &world);
        assert_relative_eq!(distance.get::<meter>(), 5.0);
    }

    #[test]
    fn test_empty_world_is_max_range() {
        let rangefinder = Rangefinder::builder()
            .max_range(Length::new::<meter>(2.5))
            .build();

        let distance = rangefinder.distance(&pose(0.0, 0.0, 1.0), &[]);
        assert_relative_eq!(distance.get::<meter>(), 2.5);
    }

    #[test]
    fn test_single_beam_scan_matches_front_distance() {
        let rangefinder = Rangefinder::default();
        let world = [circle(3.0, 0.0, 1.0)];
        let pose = pose(0.0, 0.0, 0.0);

        let beams = rangefinder
            .scan(&pose, &world, 1, Angle::new::<degree>(90.0))
            .collect::<Vec<_>>();
        assert_eq!(beams.len(), 1);
        assert_relative_eq!(
            beams[0].get::<meter>(),
            rangefinder.distance(&pose, &world).get::<meter>()
        );
    }

    #[test]
    fn test_scan_fans_across_fov() {
        let rangefinder = Rangefinder::default();
        let world = [circle(3.0, 0.0, 1.0)];

        let beams = rangefinder
            .scan(
                &pose(0.0, 0.0, 0.0),
                &world,
                3,
                Angle::new::<degree>(90.0),
            )
            .collect::<Vec<_>>();

        assert_eq!(beams.len(), 3);
        // side beams at +/-45 degrees miss the circle, the center beam hits
        assert_relative_eq!(beams[0].get::<meter>(), 5.0);
        assert_relative_eq!(beams[1].get::<meter>(), 2.0, epsilon = 1e-5);
        assert_relative_eq!(beams[2].get::<meter>(), 5.0);
    }

    #[test]
    fn test_zero_beam_scan_is_empty() {
        let rangefinder = Rangefinder::default();

        assert_eq!(
            rangefinder
                .scan(&pose(0.0, 0.0, 0.0), &[], 0, Angle::default())
                .count(),
            0
        );
    }
}
