//! Pointer-driven parallax camera.
//!
//! The rig tracks the latest pointer or single-touch position, maps it to a
//! clamped target offset around a fixed focal point, and eases the actual
//! camera position toward that target a little each frame. The camera never
//! zooms: its distance to the focal point along the view axis is constant.

#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    /// Distance from the focal point along the view axis.
    pub distance: f32,
    /// Symmetric clamp on the target offset, per screen axis.
    pub max_offset: (f32, f32),
    /// Per-tick blend factor easing the camera toward its target, in (0, 1].
    pub smoothing: f32,
    /// The point the camera always orients toward.
    pub focal_point: [f32; 3],
    /// Vertical field of view handed to the backend's projection.
    pub fov_y_degrees: f32,
    /// Projection clip planes handed to the backend.
    pub clip_near: f32,
    pub clip_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 32.0,
            max_offset: (6.0, 4.0),
            smoothing: 0.05,
            focal_point: [0.0, 0.0, 0.0],
            fov_y_degrees: 60.0,
            clip_near: 0.1,
            clip_far: 200.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct RigState {
    viewport: (f32, f32),
    half: (f32, f32),
    aspect: f32,
    target_offset: (f32, f32),
    offset: (f32, f32),
}

/// Copy of the rig's observable state, for hosts and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSnapshot {
    pub viewport: (f32, f32),
    pub aspect: f32,
    pub target_offset: (f32, f32),
    pub offset: (f32, f32),
}

pub struct CameraRig {
    config: CameraConfig,
    state: RigState,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl CameraRig {
    #[must_use]
    pub fn new(mut config: CameraConfig) -> Self {
        // an out-of-range blend factor would stall or overshoot forever
        config.smoothing = config.smoothing.clamp(f32::EPSILON, 1.0);
        let mut rig = Self {
            config,
            state: RigState::default(),
        };
        rig.resize(1.0, 1.0);
        rig
    }

    #[must_use]
    pub const fn config(&self) -> &CameraConfig {
        &self.config
    }

    #[must_use]
    pub const fn aspect(&self) -> f32 {
        self.state.aspect
    }

    /// Recompute the viewport half-extents and aspect ratio.
    pub fn resize(&mut self, width: f32, height: f32) {
        let width = width.max(1.0);
        let height = height.max(1.0);
        self.state.viewport = (width, height);
        self.state.half = (width * 0.5, height * 0.5);
        self.state.aspect = width / height;
    }

    /// Track a pointer position in viewport pixels. The offset from the
    /// viewport center, normalized by the half extents, maps onto the
    /// clamped target range.
    pub fn track_pointer(&mut self, x: f32, y: f32) {
        let nx = (x - self.state.half.0) / self.state.half.0;
        let ny = (y - self.state.half.1) / self.state.half.1;
        let (max_x, max_y) = self.config.max_offset;
        self.state.target_offset = (
            (nx * max_x).clamp(-max_x, max_x),
            (-ny * max_y).clamp(-max_y, max_y),
        );
    }

    /// Track a single-touch position; same mapping as a pointer.
    pub fn track_touch(&mut self, x: f32, y: f32) {
        self.track_pointer(x, y);
    }

    /// Ease the camera one step toward its target offset.
    pub fn tick(&mut self) {
        let blend = self.config.smoothing;
        self.state.offset.0 += (self.state.target_offset.0 - self.state.offset.0) * blend;
        self.state.offset.1 += (self.state.target_offset.1 - self.state.offset.1) * blend;
    }

    /// Current camera position: the focal point displaced by the smoothed
    /// offset, held at the configured distance along the view axis.
    #[must_use]
    pub fn position(&self) -> [f32; 3] {
        let [fx, fy, fz] = self.config.focal_point;
        [
            fx + self.state.offset.0,
            fy + self.state.offset.1,
            fz + self.config.distance,
        ]
    }

    /// The fixed point the camera looks at.
    #[must_use]
    pub const fn look_at(&self) -> [f32; 3] {
        self.config.focal_point
    }

    #[must_use]
    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            viewport: self.state.viewport,
            aspect: self.state.aspect,
            target_offset: self.state.target_offset,
            offset: self.state.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_pointer_yields_zero_target() {
        let mut rig = CameraRig::default();
        rig.resize(1600.0, 900.0);
        rig.track_pointer(800.0, 450.0);
        assert_eq!(rig.snapshot().target_offset, (0.0, 0.0));
    }

    #[test]
    fn smoothing_is_clamped_into_range() {
        let rig = CameraRig::new(CameraConfig {
            smoothing: 0.0,
            ..CameraConfig::default()
        });
        assert!(rig.config().smoothing > 0.0);

        let rig = CameraRig::new(CameraConfig {
            smoothing: 4.0,
            ..CameraConfig::default()
        });
        assert!(rig.config().smoothing <= 1.0);
    }
}
