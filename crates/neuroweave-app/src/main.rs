use std::thread;
use std::time::Duration;

use anyhow::Result;
use neuroweave_app::{HeroScene, SceneOptions, SurfaceEvent, SurfaceSize};
use tracing::info;

const DEMO_SURFACE: SurfaceSize = SurfaceSize {
    width: 1280.0,
    height: 720.0,
};
const DEMO_FRAMES: u32 = 240;
const FRAME_BUDGET: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    init_tracing();
    let options = SceneOptions::default();
    info!(
        config = %serde_json::to_string(&options.pulse)?,
        "Starting neuroweave hero scene"
    );

    let mut scene = HeroScene::initialize(options, Some(DEMO_SURFACE))?;
    run_headless(&mut scene);
    scene.dispose();
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Drive the scene for a few seconds without a renderer attached, sweeping a
/// synthetic pointer across the surface so the camera rig has something to
/// chase, and log liveness once a second.
fn run_headless(scene: &mut HeroScene) {
    for frame in 0..DEMO_FRAMES {
        let sweep = frame as f32 / DEMO_FRAMES as f32;
        scene.handle_event(SurfaceEvent::PointerMoved {
            x: DEMO_SURFACE.width * sweep,
            y: DEMO_SURFACE.height * 0.5,
        });

        if let Some(summary) = scene.step() {
            if frame % 60 == 0 {
                info!(
                    clock = summary.clock,
                    nodes_firing = summary.nodes_firing,
                    edges_firing = summary.edges_firing,
                    pending = summary.pending_fires,
                    "frame summary"
                );
            }
        }

        if let Some(view) = scene.frame() {
            // a real backend would re-upload the dirty buffers here
            let _ = view.dirty;
        }

        thread::sleep(FRAME_BUDGET);
    }
}
