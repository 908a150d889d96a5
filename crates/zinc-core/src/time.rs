//! Per-object time models
//!
//! A primitive is governed either by a manually stepped clock or by the
//! morph-target animation clip of its geometry. The choice is made once,
//! when the mesh is attached.

use crate::constants::MORPH_CLIP_FPS;
use crate::geometry::MorphFrame;

/// Common interface of both time models
pub trait TimeControl {
    /// Set the externally visible time, returns true if it changed
    fn set_time(&mut self, time: f32) -> bool;

    /// Externally visible time in `[0, duration]`
    fn time(&self) -> f32;

    /// Step the clock during playback, returns true if it changed
    fn advance(&mut self, delta: f32, time_varying: bool) -> bool;

    fn set_duration(&mut self, duration: f32);

    fn duration(&self) -> f32;
}

/// Discrete time that wraps around during playback
#[derive(Debug, Clone, PartialEq)]
pub struct ManualTime {
    time: f32,
    duration: f32,
}

impl ManualTime {
    pub fn new(duration: f32) -> Self {
        Self {
            time: 0.0,
            duration,
        }
    }
}

impl TimeControl for ManualTime {
    fn set_time(&mut self, time: f32) -> bool {
        let new_time = time.clamp(0.0, self.duration.max(0.0));
        if new_time != self.time {
            self.time = new_time;
            true
        } else {
            false
        }
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn advance(&mut self, delta: f32, _time_varying: bool) -> bool {
        let new_time = if self.duration > 0.0 {
            (self.time + delta).rem_euclid(self.duration)
        } else {
            0.0
        };
        let changed = new_time != self.time;
        self.time = new_time;
        changed
    }

    fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
    }

    fn duration(&self) -> f32 {
        self.duration
    }
}

/// Morph-target clip played once and clamped at its end
#[derive(Debug, Clone, PartialEq)]
pub struct ClipTime {
    clip_time: f32,
    clip_duration: f32,
    frame_count: usize,
    duration: f32,
}

impl ClipTime {
    /// Clip over `frame_count` morph targets, `None` for fewer than two
    pub fn new(frame_count: usize, duration: f32) -> Option<Self> {
        if frame_count < 2 {
            return None;
        }
        Some(Self {
            clip_time: 0.0,
            clip_duration: (frame_count - 1) as f32 / MORPH_CLIP_FPS,
            frame_count,
            duration,
        })
    }

    /// Length of the clip in its own time units (seconds at 10 fps)
    pub fn clip_duration(&self) -> f32 {
        self.clip_duration
    }

    pub fn clip_time(&self) -> f32 {
        self.clip_time
    }

    /// Morph targets blended at the current clip position
    pub fn frame(&self) -> Option<MorphFrame> {
        MorphFrame::at(self.clip_time * MORPH_CLIP_FPS, self.frame_count)
    }
}

impl TimeControl for ClipTime {
    fn set_time(&mut self, time: f32) -> bool {
        if self.duration <= 0.0 {
            return false;
        }
        let ratio = time / self.duration;
        let new_time = (ratio * self.clip_duration).clamp(0.0, self.clip_duration);
        if new_time != self.clip_time {
            self.clip_time = new_time;
            true
        } else {
            false
        }
    }

    fn time(&self) -> f32 {
        if self.clip_duration <= 0.0 {
            return 0.0;
        }
        self.duration * (self.clip_time / self.clip_duration)
    }

    fn advance(&mut self, delta: f32, time_varying: bool) -> bool {
        if !time_varying || self.duration <= 0.0 {
            return false;
        }
        let step = delta * self.clip_duration / self.duration;
        let new_time = (self.clip_time + step).clamp(0.0, self.clip_duration);
        let changed = new_time != self.clip_time;
        self.clip_time = new_time;
        changed
    }

    fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
    }

    fn duration(&self) -> f32 {
        self.duration
    }
}

/// The time model governing one primitive
#[derive(Debug, Clone, PartialEq)]
pub enum TimeModel {
    Manual(ManualTime),
    Clip(ClipTime),
}

impl TimeModel {
    /// Pick the model for a geometry carrying `morph_targets` frames
    pub fn for_morph_targets(morph_targets: usize, duration: f32) -> Self {
        match ClipTime::new(morph_targets, duration) {
            Some(clip) => TimeModel::Clip(clip),
            None => TimeModel::Manual(ManualTime::new(duration)),
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, TimeModel::Clip(_))
    }

    /// Current morph frame, `None` for manual time
    pub fn frame(&self) -> Option<MorphFrame> {
        match self {
            TimeModel::Manual(_) => None,
            TimeModel::Clip(clip) => clip.frame(),
        }
    }

    fn control(&self) -> &dyn TimeControl {
        match self {
            TimeModel::Manual(manual) => manual,
            TimeModel::Clip(clip) => clip,
        }
    }

    fn control_mut(&mut self) -> &mut dyn TimeControl {
        match self {
            TimeModel::Manual(manual) => manual,
            TimeModel::Clip(clip) => clip,
        }
    }
}

impl Default for TimeModel {
    fn default() -> Self {
        TimeModel::Manual(ManualTime::new(crate::constants::OBJECT_DEFAULT_DURATION))
    }
}

impl TimeControl for TimeModel {
    fn set_time(&mut self, time: f32) -> bool {
        self.control_mut().set_time(time)
    }

    fn time(&self) -> f32 {
        self.control().time()
    }

    fn advance(&mut self, delta: f32, time_varying: bool) -> bool {
        self.control_mut().advance(delta, time_varying)
    }

    fn set_duration(&mut self, duration: f32) {
        self.control_mut().set_duration(duration)
    }

    fn duration(&self) -> f32 {
        self.control().duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clip_needs_two_targets() {
        assert!(!TimeModel::for_morph_targets(0, 3000.0).is_clip());
        assert!(!TimeModel::for_morph_targets(1, 3000.0).is_clip());
        assert!(TimeModel::for_morph_targets(2, 3000.0).is_clip());
    }

    #[test]
    fn test_clip_set_get_round_trip() {
        let mut time = TimeModel::for_morph_targets(11, 3000.0);
        for t in [0.0, 1.0, 750.0, 1500.0, 2999.0, 3000.0] {
            time.set_time(t);
            assert_relative_eq!(time.time(), t, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_clip_duration_from_frames() {
        let clip = ClipTime::new(11, 3000.0).unwrap();
        assert_relative_eq!(clip.clip_duration(), 1.0);
    }

    #[test]
    fn test_clip_advance_clamps_at_end() {
        let mut time = TimeModel::for_morph_targets(3, 1000.0);
        assert!(time.advance(600.0, true));
        assert_relative_eq!(time.time(), 600.0, epsilon = 1e-3);
        time.advance(600.0, true);
        assert_relative_eq!(time.time(), 1000.0, epsilon = 1e-3);
        assert!(!time.advance(10.0, true));
    }

    #[test]
    fn test_clip_does_not_advance_when_static() {
        let mut time = TimeModel::for_morph_targets(3, 1000.0);
        assert!(!time.advance(100.0, false));
        assert_eq!(time.time(), 0.0);
    }

    #[test]
    fn test_clip_frame_follows_time() {
        let mut time = TimeModel::for_morph_targets(3, 1000.0);
        time.set_time(250.0);
        let frame = time.frame().unwrap();
        assert_eq!((frame.lower, frame.upper), (0, 1));
        assert_relative_eq!(frame.blend, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_manual_set_clamps() {
        let mut time = TimeModel::Manual(ManualTime::new(100.0));
        time.set_time(150.0);
        assert_eq!(time.time(), 100.0);
        time.set_time(-5.0);
        assert_eq!(time.time(), 0.0);
        assert!(!time.set_time(0.0));
    }

    #[test]
    fn test_manual_advance_wraps() {
        let duration = 100.0;
        let delta = 30.0;
        let start = 20.0;
        let mut time = TimeModel::Manual(ManualTime::new(duration));
        time.set_time(start);
        for n in 1..=10 {
            time.advance(delta, false);
            let expected = (start + n as f32 * delta) % duration;
            assert_relative_eq!(time.time(), expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_set_duration_rescales_clip() {
        let mut time = TimeModel::for_morph_targets(2, 1000.0);
        time.set_time(500.0);
        time.set_duration(2000.0);
        assert_relative_eq!(time.time(), 1000.0, epsilon = 1e-3);
        assert_eq!(time.duration(), 2000.0);
    }
}
