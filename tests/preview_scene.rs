//! End-to-end tests of the preview scene contract against the headless host.

use glam::Vec3;
use rstest::rstest;

use preview_scene::{
    AmbientMode, HeadlessHost, PreviewError, PreviewScene, RenderHost, OFFSCREEN_POSITION,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[rstest]
#[case((1, 1))]
#[case((64, 48))]
#[case((256, 256))]
#[case((640, 360))]
fn render_matches_the_loaded_target_size(#[case] size: (u32, u32)) {
    init_logging();
    let mut host = HeadlessHost::new();
    let mut scene = PreviewScene::new();

    scene.load_with_size(&mut host, size).unwrap();
    let texture = scene.render(&mut host).unwrap();
    assert_eq!((texture.width, texture.height), size);

    scene.destroy(&mut host);
}

#[rstest]
#[case((0, 128))]
#[case((128, 0))]
fn degenerate_sizes_are_rejected(#[case] size: (u32, u32)) {
    init_logging();
    let mut host = HeadlessHost::new();
    let mut scene = PreviewScene::new();

    let err = scene.load_with_size(&mut host, size).unwrap_err();
    assert!(matches!(err, PreviewError::InvalidArgument(_)));
}

#[test]
fn thumbnail_walk_over_four_objects() {
    init_logging();
    let mut host = HeadlessHost::new();
    let mut scene = PreviewScene::new();
    scene.load_with_size(&mut host, (256, 256)).unwrap();

    let objects: Vec<_> = (0..4)
        .map(|i| host.spawn_object(Vec3::new(i as f32, 0.0, 0.0)))
        .collect();
    for &object in &objects {
        scene.add(&mut host, object).unwrap();
    }
    scene.move_all_offscreen(&mut host).unwrap();

    scene.focus(&mut host, 0).unwrap();
    assert_eq!(host.object_position(objects[0]).unwrap(), Vec3::ZERO);
    for &object in &objects[1..] {
        assert_eq!(host.object_position(object).unwrap(), OFFSCREEN_POSITION);
    }

    let texture = scene.render(&mut host).unwrap();
    assert_eq!((texture.width, texture.height), (256, 256));

    // Walk the rest of the registry; exactly one object sits at the origin
    // after every focus call.
    for index in 1..4 {
        scene.focus(&mut host, index).unwrap();
        scene.render(&mut host).unwrap();
        for (i, &object) in objects.iter().enumerate() {
            let expected = if i == index {
                Vec3::ZERO
            } else {
                OFFSCREEN_POSITION
            };
            assert_eq!(host.object_position(object).unwrap(), expected);
        }
    }

    scene.destroy(&mut host);
}

#[test]
fn flat_red_ambient_is_scoped_to_the_render_call() {
    init_logging();
    let mut host = HeadlessHost::new();
    let original = host.lighting().clone();

    let mut scene = PreviewScene::new();
    scene.load_with_size(&mut host, (32, 32)).unwrap();
    scene
        .camera(&mut host)
        .set_background_color([0.0, 0.0, 0.0, 1.0])
        .unwrap();

    let settings = scene.custom_render_settings_mut();
    settings.use_host_ambient_settings = false;
    settings.ambient_mode = AmbientMode::Flat;
    settings.ambient_color = [1.0, 0.0, 0.0, 1.0];
    settings.ambient_intensity = 1.0;

    let texture = scene.render(&mut host).unwrap();

    // The produced frame reflects the flat red ambient override.
    let pixels = host.target_pixels(texture.target).unwrap();
    assert_eq!(&pixels[0..4], &[255, 0, 0, 255]);

    // An unrelated consumer of the host's global lighting state, reading
    // immediately after the render, observes the original settings.
    assert_eq!(*host.lighting(), original);

    scene.destroy(&mut host);
}

#[test]
fn scene_state_survives_a_host_reload() {
    init_logging();
    let mut host = HeadlessHost::new();
    let mut scene = PreviewScene::new();
    scene.load_with_size(&mut host, (128, 128)).unwrap();
    let object = host.spawn_object(Vec3::ZERO);
    scene.add(&mut host, object).unwrap();
    scene.focus(&mut host, 0).unwrap();

    // A host reload invalidates in-memory references but not the host's
    // registries; the caller-held state round-trips through serialization.
    let persisted = serde_json::to_string(&scene).unwrap();
    drop(scene);
    let mut scene: PreviewScene = serde_json::from_str(&persisted).unwrap();

    assert!(scene.is_loaded());
    assert_eq!(scene.object_count(), 1);
    assert_eq!(scene.focused_index(), Some(0));

    // The recovered state still drives the same logical resources: a stale
    // camera wrapper is rebuilt and revalidated, renders still work, and
    // destroy releases the resources created before the reload.
    assert!(scene.camera(&mut host).is_valid());
    let texture = scene.render(&mut host).unwrap();
    assert_eq!((texture.width, texture.height), (128, 128));

    scene.destroy(&mut host);
    assert_eq!(host.created_render_targets(), 1);
    assert_eq!(host.released_render_targets(), 1);
    assert_eq!(host.created_cameras(), 1);
    assert_eq!(host.released_cameras(), 1);
    assert!(!host.object_exists(object));
}

#[test]
fn camera_controller_goes_invalid_after_destroy() {
    init_logging();
    let mut host = HeadlessHost::new();
    let mut scene = PreviewScene::new();
    scene.load(&mut host).unwrap();

    {
        let mut camera = scene.camera(&mut host);
        assert!(camera.is_valid());
        camera.set_position(Vec3::new(0.0, 1.0, 8.0)).unwrap();
        camera.look_at(Vec3::ZERO, Vec3::Y).unwrap();
        camera.set_field_of_view(30.0).unwrap();
    }

    scene.destroy(&mut host);

    let camera = scene.camera(&mut host);
    assert!(!camera.is_valid());
    assert!(matches!(
        camera.position(),
        Err(PreviewError::InvalidState(_))
    ));
}
