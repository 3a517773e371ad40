use neuroweave_render::camera::{CameraConfig, CameraRig};

const VIEWPORT: (f32, f32) = (1600.0, 900.0);

fn configured_rig() -> CameraRig {
    let mut rig = CameraRig::new(CameraConfig::default());
    rig.resize(VIEWPORT.0, VIEWPORT.1);
    rig
}

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

#[test]
fn corner_pointer_saturates_at_the_clamp_range() {
    let mut rig = configured_rig();
    let (max_x, max_y) = rig.config().max_offset;

    rig.track_pointer(VIEWPORT.0, 0.0);
    assert_eq!(rig.snapshot().target_offset, (max_x, max_y));

    // positions reported outside the viewport still clamp symmetrically
    rig.track_pointer(-500.0, VIEWPORT.1 * 3.0);
    assert_eq!(rig.snapshot().target_offset, (-max_x, -max_y));
}

#[test]
fn offset_converges_monotonically_to_the_target() {
    let mut rig = configured_rig();
    rig.track_pointer(VIEWPORT.0, VIEWPORT.1 * 0.5);
    let target = rig.snapshot().target_offset;

    let mut previous_gap = (target.0 - rig.snapshot().offset.0).abs();
    for _ in 0..400 {
        rig.tick();
        let gap = (target.0 - rig.snapshot().offset.0).abs();
        assert!(gap <= previous_gap, "smoothing must never overshoot");
        previous_gap = gap;
    }
    assert!(approx_eq(rig.snapshot().offset.0, target.0, 1e-3));
}

#[test]
fn distance_to_focal_plane_never_changes() {
    let mut rig = configured_rig();
    let distance = rig.config().distance;
    let focal_z = rig.config().focal_point[2];

    rig.track_pointer(0.0, 0.0);
    for _ in 0..100 {
        rig.tick();
        let position = rig.position();
        assert!(approx_eq(position[2] - focal_z, distance, 1e-6));
    }
    assert_eq!(rig.look_at(), rig.config().focal_point);
}

#[test]
fn resize_recomputes_aspect_and_pointer_mapping() {
    let mut rig = configured_rig();
    assert!(approx_eq(rig.aspect(), 16.0 / 9.0, 1e-4));

    rig.resize(800.0, 800.0);
    assert!(approx_eq(rig.aspect(), 1.0, 1e-6));
    // the old viewport center is no longer neutral after the resize
    rig.track_pointer(400.0, 400.0);
    assert_eq!(rig.snapshot().target_offset, (0.0, 0.0));

    // degenerate sizes are clamped instead of producing NaN
    rig.resize(0.0, 0.0);
    assert!(rig.aspect().is_finite());
}
