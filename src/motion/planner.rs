//! Trajectory planning: keyframes to a position-at-time function.

use crate::error::{ProfileError, Result};

use super::easing::Easing;
use super::profile::MotionProfile;
use super::MAX_KEYFRAMES;

/// Keyframe with its easing compiled.
#[derive(Debug, Clone, Copy)]
struct Node {
    t: f32,
    pos_mm: f32,
    easing: Easing,
}

/// Position-at-time function for a validated profile.
///
/// The curve is a pure function of the keyframes; the profile's speed and
/// acceleration caps travel alongside it for the controller to enforce.
#[derive(Debug, Clone)]
pub struct Trajectory {
    nodes: heapless::Vec<Node, MAX_KEYFRAMES>,
    /// Index of the segment start used by the last `position_at` query.
    cursor: usize,
    length_mm: f32,
    max_speed_mm_s: f32,
    max_accel_mm_s2: f32,
}

/// Plan a trajectory from a motion profile.
///
/// The profile is validated (on a copy) before anything is built.
///
/// # Errors
///
/// Any `InvalidProfile` cause from [`MotionProfile::validate`].
pub fn plan(profile: &MotionProfile) -> Result<Trajectory> {
    let profile = profile.clone().validated()?;

    let mut nodes = heapless::Vec::new();
    for k in profile.keyframes.iter() {
        let node = Node {
            t: k.t,
            pos_mm: k.pos_mm,
            easing: k.ease.compile()?,
        };
        nodes
            .push(node)
            .map_err(|_| ProfileError::TooManyKeyframes)?;
    }

    Ok(Trajectory {
        nodes,
        cursor: 0,
        length_mm: profile.length_mm,
        max_speed_mm_s: profile.max_speed_mm_s,
        max_accel_mm_s2: profile.max_accel_mm_s2,
    })
}

impl Trajectory {
    /// Time of the last keyframe.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.last().t
    }

    /// Position of the first keyframe.
    #[inline]
    pub fn start_position(&self) -> f32 {
        self.first().pos_mm
    }

    /// Position of the last keyframe.
    #[inline]
    pub fn end_position(&self) -> f32 {
        self.last().pos_mm
    }

    /// Travel bound of the source profile.
    #[inline]
    pub fn length_mm(&self) -> f32 {
        self.length_mm
    }

    /// Speed cap of the source profile.
    #[inline]
    pub fn max_speed_mm_s(&self) -> f32 {
        self.max_speed_mm_s
    }

    /// Acceleration cap of the source profile.
    #[inline]
    pub fn max_accel_mm_s2(&self) -> f32 {
        self.max_accel_mm_s2
    }

    /// Number of keyframes.
    #[inline]
    pub fn keyframe_count(&self) -> usize {
        self.nodes.len()
    }

    /// Segment the cursor currently points at.
    #[inline]
    pub fn segment_index(&self) -> usize {
        self.cursor
    }

    /// Position at time `t`, advancing the segment cursor.
    ///
    /// O(1) amortized for non-decreasing `t`; a backward query rescans
    /// from the first segment.
    pub fn position_at(&mut self, t: f32) -> f32 {
        if t < self.nodes[self.cursor].t {
            self.cursor = 0;
        }
        self.cursor = self.seek(self.cursor, t);
        self.evaluate(self.cursor, t)
    }

    /// Position at time `t` without touching the cursor.
    pub fn sample(&self, t: f32) -> f32 {
        self.evaluate(self.seek(0, t), t)
    }

    /// Position of the first keyframe at or after `t` where the curve comes
    /// to rest or turns around, or the last keyframe.
    ///
    /// A keyframe is a stop when the segment into it moves and the segment
    /// out of it holds still, reverses, or does not exist.
    pub fn next_stop(&self, t: f32) -> f32 {
        let n = self.nodes.len();
        for i in 1..n {
            if self.nodes[i].t < t {
                continue;
            }
            let incoming = self.nodes[i].pos_mm - self.nodes[i - 1].pos_mm;
            if incoming == 0.0 {
                continue;
            }
            let outgoing = if i + 1 < n {
                self.nodes[i + 1].pos_mm - self.nodes[i].pos_mm
            } else {
                0.0
            };
            if outgoing == 0.0 || (outgoing > 0.0) != (incoming > 0.0) {
                return self.nodes[i].pos_mm;
            }
        }
        self.end_position()
    }

    /// Preview samples every `dt` seconds.
    ///
    /// The final sample is always `(duration, end_position)` exactly.
    pub fn samples(&self, dt: f32) -> Samples<'_> {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            self.duration()
        };
        Samples {
            trajectory: self,
            dt,
            index: 0,
            last_t: None,
            done: false,
        }
    }

    #[inline]
    fn first(&self) -> &Node {
        &self.nodes[0]
    }

    #[inline]
    fn last(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    /// Advance `from` to the segment whose start is the latest keyframe at
    /// or before `t`, stopping at the final segment.
    fn seek(&self, from: usize, t: f32) -> usize {
        let last_segment = self.nodes.len() - 2;
        let mut i = from.min(last_segment);
        while i < last_segment && t >= self.nodes[i + 1].t {
            i += 1;
        }
        i
    }

    fn evaluate(&self, segment: usize, t: f32) -> f32 {
        let k0 = &self.nodes[segment];
        let k1 = &self.nodes[segment + 1];

        if t <= k0.t {
            return k0.pos_mm;
        }
        if t >= k1.t {
            return k1.pos_mm;
        }

        let u = (t - k0.t) / (k1.t - k0.t);
        // the destination keyframe's easing governs the segment
        let y = k1.easing.apply(u);
        k0.pos_mm + (k1.pos_mm - k0.pos_mm) * y
    }
}

/// Fixed-interval preview iterator; see [`Trajectory::samples`].
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    trajectory: &'a Trajectory,
    dt: f32,
    index: u32,
    last_t: Option<f32>,
    done: bool,
}

impl Iterator for Samples<'_> {
    type Item = (f32, f32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let end = self.trajectory.duration();
        let t = self.index as f32 * self.dt;

        if t < end {
            self.index += 1;
            self.last_t = Some(t);
            return Some((t, self.trajectory.sample(t)));
        }

        self.done = true;
        match self.last_t {
            Some(last) if last >= end => None,
            _ => Some((end, self.trajectory.end_position())),
        }
    }
}
