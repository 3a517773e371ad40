//! Host shell for the neuroweave animation.
//!
//! Owns the lifecycle the embedding page sees: `initialize` with (or
//! without) a rendering surface, surface-event routing into the camera rig,
//! a per-frame `step`, and an idempotent `dispose` that leaves no callback
//! behind. The frame loop itself belongs to the host environment (requestor
//! of frames); this shell is what each iteration calls into.

use std::time::Instant;

use neuroweave_core::{ConfigError, FrameSummary, PulseConfig, PulseWorld};
use neuroweave_render::camera::{CameraConfig, CameraRig};
use neuroweave_render::{DepthFade, SceneView};
use tracing::{info, warn};

/// Input events the embedding surface forwards to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    PointerMoved { x: f32, y: f32 },
    TouchMoved { x: f32, y: f32 },
    Resized { width: f32, height: f32 },
}

/// Pixel dimensions of the rendering surface at initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

/// Everything configurable about a scene, bundled for the host.
#[derive(Debug, Clone, Default)]
pub struct SceneOptions {
    pub pulse: PulseConfig,
    pub camera: CameraConfig,
    pub fade: DepthFade,
}

/// The animation as the host sees it: a simulation world (absent when no
/// surface was available), a camera rig, and a monotonic clock.
pub struct HeroScene {
    world: Option<PulseWorld>,
    camera: CameraRig,
    fade: DepthFade,
    epoch: Instant,
    disposed: bool,
}

impl HeroScene {
    /// Build the scene. With no surface the scene comes up inert: the
    /// failure is logged and every later call is a harmless no-op, matching
    /// how a missing canvas must not take the page down.
    pub fn initialize(
        options: SceneOptions,
        surface: Option<SurfaceSize>,
    ) -> Result<Self, ConfigError> {
        let mut camera = CameraRig::new(options.camera);
        let world = match surface {
            Some(size) => {
                camera.resize(size.width, size.height);
                Some(PulseWorld::new(options.pulse)?)
            }
            None => {
                warn!("no rendering surface available; hero scene is inert");
                None
            }
        };
        Ok(Self {
            world,
            camera,
            fade: options.fade,
            epoch: Instant::now(),
            disposed: false,
        })
    }

    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether a world is running (false for inert scenes and after
    /// dispose).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.world.is_some() && !self.disposed
    }

    #[must_use]
    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    #[must_use]
    pub fn world(&self) -> Option<&PulseWorld> {
        self.world.as_ref()
    }

    /// Route one surface event. Pointer and single-touch positions both
    /// drive the camera target; resize recomputes the viewport mapping.
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        if self.disposed {
            return;
        }
        match event {
            SurfaceEvent::PointerMoved { x, y } => self.camera.track_pointer(x, y),
            SurfaceEvent::TouchMoved { x, y } => self.camera.track_touch(x, y),
            SurfaceEvent::Resized { width, height } => self.camera.resize(width, height),
        }
    }

    /// Advance one frame: move the world to the current clock and ease the
    /// camera. Returns the frame's liveness counters, or `None` when inert.
    pub fn step(&mut self) -> Option<FrameSummary> {
        if self.disposed {
            return None;
        }
        let world = self.world.as_mut()?;
        let now = self.epoch.elapsed().as_secs_f32();
        world.advance(now);
        self.camera.tick();
        Some(world.summary())
    }

    /// Capture this frame's attribute buffers for upload, consuming the
    /// dirty markers.
    pub fn frame(&mut self) -> Option<SceneView<'_>> {
        if self.disposed {
            return None;
        }
        let world = self.world.as_mut()?;
        let dirty = world.buffers_mut().take_dirty();
        Some(SceneView::capture(world.buffers(), dirty, self.fade))
    }

    /// Tear down: cancel all scheduled work, then drop the world and its
    /// buffers. Idempotent and total; no callback runs after this returns.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(mut world) = self.world.take() {
            world.dispose();
        }
        info!("hero scene disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_surface_yields_an_inert_scene() {
        let mut scene = HeroScene::initialize(SceneOptions::default(), None).expect("scene");
        assert!(!scene.is_active());
        assert_eq!(scene.step(), None);
        assert!(scene.frame().is_none());
        // events are swallowed, not errors
        scene.handle_event(SurfaceEvent::PointerMoved { x: 10.0, y: 10.0 });
    }

    #[test]
    fn dispose_is_idempotent_and_total() {
        let surface = SurfaceSize {
            width: 1280.0,
            height: 720.0,
        };
        let mut scene =
            HeroScene::initialize(SceneOptions::default(), Some(surface)).expect("scene");
        assert!(scene.is_active());

        scene.dispose();
        assert!(scene.is_disposed());
        assert!(!scene.is_active());
        assert_eq!(scene.step(), None);
        assert!(scene.world().is_none());

        scene.dispose();
        assert!(scene.is_disposed());
    }

    #[test]
    fn events_after_dispose_are_ignored() {
        let mut scene = HeroScene::initialize(
            SceneOptions::default(),
            Some(SurfaceSize {
                width: 800.0,
                height: 600.0,
            }),
        )
        .expect("scene");
        scene.dispose();

        let before = scene.camera().snapshot();
        scene.handle_event(SurfaceEvent::PointerMoved { x: 0.0, y: 0.0 });
        scene.handle_event(SurfaceEvent::Resized {
            width: 100.0,
            height: 100.0,
        });
        assert_eq!(scene.camera().snapshot(), before);
    }
}
