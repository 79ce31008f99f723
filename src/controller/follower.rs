//! Acceleration-limited step follower.
//!
//! Each tick the follower turns a goal position into the step index the
//! carriage should reach by the end of the tick. The commanded speed is
//! capped at `max_speed`, changes by at most `max_accel * dt` per tick, and
//! is held below the braking speed for the remaining distance to the next
//! stop point and to either end of the window, so the carriage can always
//! come to rest there without exceeding the acceleration cap.
//!
//! All quantities are in steps, steps/s and steps/s².

use libm::{copysignf, fabsf, roundf, sqrtf};

/// What to follow during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowTarget {
    /// Where the carriage should be now.
    pub goal: f32,
    /// Next point where the goal comes to rest or reverses.
    pub stop: f32,
    /// Upper end of the window; the lower end is 0.
    pub upper: f32,
    /// Speed cap.
    pub max_speed: f32,
    /// Acceleration cap.
    pub max_accel: f32,
}

/// Follower state carried between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Follower {
    /// Commanded speed of the last tick.
    speed: f32,
    /// Commanded position minus the issued step index, in `[-0.5, 0.5]`.
    carry: f32,
    /// Goal of the last tick, for the goal's own velocity.
    last_goal: Option<f32>,
    /// Speed change allowed by the last tick.
    last_dv: f32,
}

/// Fastest speed from which the carriage still stops within `distance`
/// when it decelerates at `accel` in ticks of `dt`.
///
/// Solves `v * dt + v² / (2 * accel) = distance`.
#[inline]
pub fn braking_speed(distance: f32, accel: f32, dt: f32) -> f32 {
    let a_dt = accel * dt;
    sqrtf(a_dt * a_dt + 2.0 * accel * distance.max(0.0)) - a_dt
}

impl Follower {
    /// Follower at rest.
    pub const fn new() -> Self {
        Self {
            speed: 0.0,
            carry: 0.0,
            last_goal: None,
            last_dv: 0.0,
        }
    }

    /// Forget all motion, as after a stop.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Commanded speed of the last tick in steps/s.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// At `goal` with a speed the next tick may drop to zero.
    #[inline]
    pub fn settled(&self, current: i64, goal: i64) -> bool {
        current == goal && fabsf(self.speed) <= self.last_dv
    }

    /// Step index to reach by the end of this tick, starting at `current`.
    pub fn next_step(&mut self, current: i64, target: &FollowTarget, dt: f32) -> i64 {
        let accel = target.max_accel;
        let upper = target.upper.max(0.0);
        let exact = current as f32 + self.carry;
        let goal = target.goal.clamp(0.0, upper);

        let goal_speed = self.last_goal.map_or(0.0, |last| (goal - last) / dt);
        self.last_goal = Some(goal);

        // feed forward the goal's speed, close the gap without overshooting it
        let error = goal - exact;
        let closing = braking_speed(fabsf(error), accel, dt);
        let mut wanted = (goal_speed + copysignf(closing, error))
            .clamp(-target.max_speed, target.max_speed);

        let to_stop = target.stop.clamp(0.0, upper) - exact;
        if wanted * to_stop > 0.0 {
            let limit = braking_speed(fabsf(to_stop), accel, dt);
            wanted = wanted.clamp(-limit, limit);
        }
        if wanted > 0.0 {
            wanted = wanted.min(braking_speed(upper - exact, accel, dt));
        } else if wanted < 0.0 {
            wanted = wanted.max(-braking_speed(exact, accel, dt));
        }

        let dv = accel * dt;
        self.speed = wanted.clamp(self.speed - dv, self.speed + dv);
        self.last_dv = dv;

        let commanded = (exact + self.speed * dt).clamp(0.0, upper);
        let next = roundf(commanded);
        self.carry = commanded - next;
        next as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.02;

    fn toward(goal: f32) -> FollowTarget {
        FollowTarget {
            goal,
            stop: goal,
            upper: 12_000.0,
            max_speed: 1_200.0,
            max_accel: 3_000.0,
        }
    }

    /// Step indices of a follower chasing `targets` from 0 until settled.
    fn trace(targets: impl Fn(usize) -> FollowTarget, ticks: usize) -> Vec<i64> {
        let mut follower = Follower::new();
        let mut current = 0;
        let mut steps = vec![current];
        for i in 0..ticks {
            current = follower.next_step(current, &targets(i), DT);
            steps.push(current);
        }
        steps
    }

    fn speeds(steps: &[i64]) -> Vec<f32> {
        steps.windows(2).map(|w| (w[1] - w[0]) as f32 / DT).collect()
    }

    #[test]
    fn test_braking_speed() {
        assert_eq!(braking_speed(0.0, 3_000.0, DT), 0.0);
        assert_eq!(braking_speed(-5.0, 3_000.0, DT), 0.0);
        // v * dt + v^2 / 2a lands exactly on the distance
        let v = braking_speed(500.0, 3_000.0, DT);
        assert!((v * DT + v * v / 6_000.0 - 500.0).abs() < 1e-2);
    }

    #[test]
    fn test_reaches_fixed_goal_without_overshoot() {
        let steps = trace(|_| toward(2_000.0), 200);
        assert!(steps.iter().all(|&s| s <= 2_000));
        assert_eq!(*steps.last().unwrap(), 2_000);
    }

    #[test]
    fn test_speed_and_accel_capped() {
        let steps = trace(|_| toward(2_000.0), 200);
        let v = speeds(&steps);
        // one step of rounding on either tick
        let slack = 2.0 / DT;
        for w in v.windows(2) {
            assert!(w[0].abs() <= 1_200.0 + slack / 2.0);
            assert!((w[1] - w[0]).abs() <= 3_000.0 * DT + slack);
        }
    }

    #[test]
    fn test_goal_that_stops_dead() {
        // goal moves at the speed cap and halts at 1000 steps
        let targets = |i: usize| FollowTarget {
            goal: (i as f32 * 1_000.0 * DT).min(1_000.0),
            stop: 1_000.0,
            ..toward(1_000.0)
        };
        let steps = trace(targets, 200);
        let v = speeds(&steps);
        for w in v.windows(2) {
            assert!((w[1] - w[0]).abs() <= 3_000.0 * DT + 2.0 / DT);
        }
        assert!(steps.iter().all(|&s| s <= 1_000));
        assert_eq!(*steps.last().unwrap(), 1_000);
    }

    #[test]
    fn test_brakes_before_window_end() {
        let target = FollowTarget {
            upper: 500.0,
            stop: 12_000.0,
            ..toward(12_000.0)
        };
        let steps = trace(|_| target, 200);
        assert!(steps.iter().all(|&s| s <= 500));
        assert_eq!(*steps.last().unwrap(), 500);
    }

    #[test]
    fn test_settled_and_reset() {
        let mut follower = Follower::new();
        let mut current = 0;
        for _ in 0..200 {
            current = follower.next_step(current, &toward(300.0), DT);
        }
        assert!(follower.settled(current, 300));
        assert!(!follower.settled(current, 301));

        follower.next_step(current, &toward(3_000.0), DT);
        assert!(follower.speed() > 0.0);
        follower.reset();
        assert_eq!(follower, Follower::new());
    }
}
