//! Headless host for testing and development.
//!
//! This host performs no GPU work but keeps full bookkeeping: resource
//! registries, object positions, the lighting-override stack, and a CPU
//! pixel buffer per render target, so every contract of the preview scene is
//! observable without GPU hardware.

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::camera::CameraState;
use crate::error::{HostError, HostResult};
use crate::settings::RenderSettingsOverride;
use crate::types::Rect;

use super::{
    resolved_clear_color, CameraHandle, HostLighting, ObjectHandle, RenderHost, SceneHandle,
    TargetHandle,
};

/// Largest render-target dimension this host accepts, matching common GPU
/// texture limits.
const MAX_TARGET_DIMENSION: u32 = 16384;

#[derive(Debug)]
struct ObjectRecord {
    scene: Option<SceneHandle>,
    position: Vec3,
}

#[derive(Debug)]
struct CameraRecord {
    scene: SceneHandle,
    state: CameraState,
    target: Option<TargetHandle>,
}

#[derive(Debug)]
struct TargetRecord {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// A recorded GUI blit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuiBlit {
    pub target: TargetHandle,
    pub rect: Rect,
    pub alpha_blend: bool,
}

/// In-memory [`RenderHost`] implementation.
///
/// Rendering fills the attached target's pixel buffer with the camera's
/// resolved clear color plus the ambient contribution of the current global
/// lighting, so override effects show up in readable pixels.
#[derive(Debug)]
pub struct HeadlessHost {
    next_id: u64,
    scenes: HashSet<SceneHandle>,
    objects: HashMap<ObjectHandle, ObjectRecord>,
    cameras: HashMap<CameraHandle, CameraRecord>,
    targets: HashMap<TargetHandle, TargetRecord>,
    lighting: HostLighting,
    override_stack: Vec<HostLighting>,
    override_depth_high_water: usize,
    override_supported: bool,
    in_paint: bool,
    gui_blits: Vec<GuiBlit>,
    created_cameras: u64,
    released_cameras: u64,
    created_render_targets: u64,
    released_render_targets: u64,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            scenes: HashSet::new(),
            objects: HashMap::new(),
            cameras: HashMap::new(),
            targets: HashMap::new(),
            lighting: HostLighting::default(),
            override_stack: Vec::new(),
            override_depth_high_water: 0,
            override_supported: true,
            in_paint: false,
            gui_blits: Vec::new(),
            created_cameras: 0,
            released_cameras: 0,
            created_render_targets: 0,
            released_render_targets: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // --- host-world helpers (the part a real host does outside this crate) ---

    /// Create an object in the host's world, outside any isolated scene.
    pub fn spawn_object(&mut self, position: Vec3) -> ObjectHandle {
        let object = ObjectHandle::from_raw(self.next_id());
        self.objects.insert(
            object,
            ObjectRecord {
                scene: None,
                position,
            },
        );
        object
    }

    /// Whether an object still exists anywhere in the host.
    pub fn object_exists(&self, object: ObjectHandle) -> bool {
        self.objects.contains_key(&object)
    }

    /// Whether an isolated scene context is open.
    pub fn scene_exists(&self, scene: SceneHandle) -> bool {
        self.scenes.contains(&scene)
    }

    /// The host's global lighting state, as an unrelated consumer sees it.
    pub fn lighting(&self) -> &HostLighting {
        &self.lighting
    }

    /// Make `push_lighting_override` refuse, simulating a host state where
    /// overrides are unsupported.
    pub fn set_lighting_override_supported(&mut self, supported: bool) {
        self.override_supported = supported;
    }

    /// Deepest override nesting observed so far.
    pub fn override_depth_high_water(&self) -> usize {
        self.override_depth_high_water
    }

    /// Enter / leave a GUI paint pass.
    pub fn begin_paint(&mut self) {
        self.in_paint = true;
    }

    pub fn end_paint(&mut self) {
        self.in_paint = false;
    }

    /// GUI blits recorded so far.
    pub fn gui_blits(&self) -> &[GuiBlit] {
        &self.gui_blits
    }

    /// RGBA8 contents of a render target.
    pub fn target_pixels(&self, target: TargetHandle) -> Option<&[u8]> {
        self.targets.get(&target).map(|record| &record.pixels[..])
    }

    // --- leak accounting ---

    pub fn created_cameras(&self) -> u64 {
        self.created_cameras
    }

    pub fn released_cameras(&self) -> u64 {
        self.released_cameras
    }

    pub fn created_render_targets(&self) -> u64 {
        self.created_render_targets
    }

    pub fn released_render_targets(&self) -> u64 {
        self.released_render_targets
    }

    fn scene_checked(&self, scene: SceneHandle) -> HostResult<()> {
        if self.scenes.contains(&scene) {
            Ok(())
        } else {
            Err(HostError::UnknownHandle(format!("scene {}", scene.raw())))
        }
    }
}

impl RenderHost for HeadlessHost {
    fn create_scene(&mut self) -> HostResult<SceneHandle> {
        let scene = SceneHandle::from_raw(self.next_id());
        self.scenes.insert(scene);
        log::trace!("HeadlessHost: created scene {}", scene.raw());
        Ok(scene)
    }

    fn close_scene(&mut self, scene: SceneHandle) -> HostResult<()> {
        self.scene_checked(scene)?;
        self.scenes.remove(&scene);
        // Anything still inside the context goes with it.
        self.objects
            .retain(|_, record| record.scene != Some(scene));
        let orphaned: Vec<CameraHandle> = self
            .cameras
            .iter()
            .filter(|(_, record)| record.scene == scene)
            .map(|(&camera, _)| camera)
            .collect();
        for camera in orphaned {
            self.cameras.remove(&camera);
            self.released_cameras += 1;
        }
        log::trace!("HeadlessHost: closed scene {}", scene.raw());
        Ok(())
    }

    fn adopt_object(&mut self, scene: SceneHandle, object: ObjectHandle) -> HostResult<()> {
        self.scene_checked(scene)?;
        let record = self
            .objects
            .get_mut(&object)
            .ok_or_else(|| HostError::UnknownHandle(format!("object {}", object.raw())))?;
        record.scene = Some(scene);
        log::trace!(
            "HeadlessHost: object {} adopted into scene {}",
            object.raw(),
            scene.raw()
        );
        Ok(())
    }

    fn clone_object(&mut self, template: ObjectHandle) -> HostResult<ObjectHandle> {
        let position = self
            .objects
            .get(&template)
            .map(|record| record.position)
            .ok_or_else(|| HostError::UnknownHandle(format!("object {}", template.raw())))?;
        Ok(self.spawn_object(position))
    }

    fn destroy_object(&mut self, object: ObjectHandle) -> HostResult<()> {
        self.objects
            .remove(&object)
            .ok_or_else(|| HostError::UnknownHandle(format!("object {}", object.raw())))?;
        Ok(())
    }

    fn set_object_position(&mut self, object: ObjectHandle, position: Vec3) -> HostResult<()> {
        let record = self
            .objects
            .get_mut(&object)
            .ok_or_else(|| HostError::UnknownHandle(format!("object {}", object.raw())))?;
        record.position = position;
        Ok(())
    }

    fn object_position(&self, object: ObjectHandle) -> HostResult<Vec3> {
        self.objects
            .get(&object)
            .map(|record| record.position)
            .ok_or_else(|| HostError::UnknownHandle(format!("object {}", object.raw())))
    }

    fn create_camera(&mut self, scene: SceneHandle) -> HostResult<CameraHandle> {
        self.scene_checked(scene)?;
        let camera = CameraHandle::from_raw(self.next_id());
        self.cameras.insert(
            camera,
            CameraRecord {
                scene,
                state: CameraState::default(),
                target: None,
            },
        );
        self.created_cameras += 1;
        log::trace!("HeadlessHost: created camera {}", camera.raw());
        Ok(camera)
    }

    fn destroy_camera(&mut self, camera: CameraHandle) -> HostResult<()> {
        self.cameras
            .remove(&camera)
            .ok_or_else(|| HostError::UnknownHandle(format!("camera {}", camera.raw())))?;
        self.released_cameras += 1;
        log::trace!("HeadlessHost: destroyed camera {}", camera.raw());
        Ok(())
    }

    fn camera_state(&self, camera: CameraHandle) -> Option<CameraState> {
        self.cameras.get(&camera).map(|record| record.state)
    }

    fn set_camera_state(&mut self, camera: CameraHandle, state: CameraState) -> HostResult<()> {
        let record = self
            .cameras
            .get_mut(&camera)
            .ok_or_else(|| HostError::UnknownHandle(format!("camera {}", camera.raw())))?;
        record.state = state;
        Ok(())
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> HostResult<TargetHandle> {
        if width == 0 || height == 0 {
            return Err(HostError::ResourceCreationFailed(format!(
                "render target size {width}x{height}"
            )));
        }
        if width > MAX_TARGET_DIMENSION || height > MAX_TARGET_DIMENSION {
            return Err(HostError::ResourceCreationFailed(format!(
                "render target size {width}x{height} exceeds the {MAX_TARGET_DIMENSION} pixel \
                 dimension limit"
            )));
        }
        let target = TargetHandle::from_raw(self.next_id());
        self.targets.insert(
            target,
            TargetRecord {
                width,
                height,
                pixels: vec![0; width as usize * height as usize * 4],
            },
        );
        self.created_render_targets += 1;
        log::trace!(
            "HeadlessHost: created render target {} ({width}x{height})",
            target.raw()
        );
        Ok(target)
    }

    fn release_render_target(&mut self, target: TargetHandle) -> HostResult<()> {
        if !self.targets.contains_key(&target) {
            return Err(HostError::UnknownHandle(format!("target {}", target.raw())));
        }
        if let Some((&camera, _)) = self
            .cameras
            .iter()
            .find(|(_, record)| record.target == Some(target))
        {
            return Err(HostError::InvalidOperation(format!(
                "render target {} is still attached to camera {}; detach it first",
                target.raw(),
                camera.raw()
            )));
        }
        self.targets.remove(&target);
        self.released_render_targets += 1;
        log::trace!("HeadlessHost: released render target {}", target.raw());
        Ok(())
    }

    fn attach_target(&mut self, camera: CameraHandle, target: TargetHandle) -> HostResult<()> {
        if !self.targets.contains_key(&target) {
            return Err(HostError::UnknownHandle(format!("target {}", target.raw())));
        }
        let record = self
            .cameras
            .get_mut(&camera)
            .ok_or_else(|| HostError::UnknownHandle(format!("camera {}", camera.raw())))?;
        record.target = Some(target);
        Ok(())
    }

    fn detach_target(&mut self, camera: CameraHandle) -> HostResult<()> {
        let record = self
            .cameras
            .get_mut(&camera)
            .ok_or_else(|| HostError::UnknownHandle(format!("camera {}", camera.raw())))?;
        record.target = None;
        Ok(())
    }

    fn attached_target(&self, camera: CameraHandle) -> Option<TargetHandle> {
        self.cameras.get(&camera).and_then(|record| record.target)
    }

    fn target_size(&self, target: TargetHandle) -> Option<(u32, u32)> {
        self.targets
            .get(&target)
            .map(|record| (record.width, record.height))
    }

    fn render_camera(&mut self, scene: SceneHandle, camera: CameraHandle) -> HostResult<()> {
        self.scene_checked(scene)?;
        let record = self
            .cameras
            .get(&camera)
            .ok_or_else(|| HostError::UnknownHandle(format!("camera {}", camera.raw())))?;
        if record.scene != scene {
            return Err(HostError::InvalidOperation(format!(
                "camera {} does not belong to scene {}",
                camera.raw(),
                scene.raw()
            )));
        }
        let target = record.target.ok_or_else(|| {
            HostError::RenderFailed(format!("camera {} has no render target", camera.raw()))
        })?;
        let state = record.state;

        if let Some(color) = resolved_clear_color(&self.lighting, &state) {
            let rgba: [u8; 4] = [
                (color[0] * 255.0).round() as u8,
                (color[1] * 255.0).round() as u8,
                (color[2] * 255.0).round() as u8,
                (color[3] * 255.0).round() as u8,
            ];
            let record = self
                .targets
                .get_mut(&target)
                .ok_or_else(|| HostError::UnknownHandle(format!("target {}", target.raw())))?;
            for pixel in record.pixels.chunks_exact_mut(4) {
                pixel.copy_from_slice(&rgba);
            }
        }
        log::trace!(
            "HeadlessHost: rendered camera {} into target {}",
            camera.raw(),
            target.raw()
        );
        Ok(())
    }

    fn push_lighting_override(&mut self, scene: SceneHandle) -> bool {
        if !self.override_supported || !self.scenes.contains(&scene) {
            return false;
        }
        self.override_stack.push(self.lighting.clone());
        self.override_depth_high_water = self
            .override_depth_high_water
            .max(self.override_stack.len());
        true
    }

    fn apply_render_settings(&mut self, settings: &RenderSettingsOverride) -> HostResult<()> {
        self.lighting.apply_override(settings);
        Ok(())
    }

    fn pop_lighting_override(&mut self) {
        if let Some(previous) = self.override_stack.pop() {
            self.lighting = previous;
        }
    }

    fn in_paint_pass(&self) -> bool {
        self.in_paint
    }

    fn blit_texture(
        &mut self,
        target: TargetHandle,
        rect: Rect,
        alpha_blend: bool,
    ) -> HostResult<()> {
        if !self.targets.contains_key(&target) {
            return Err(HostError::UnknownHandle(format!("target {}", target.raw())));
        }
        self.gui_blits.push(GuiBlit {
            target,
            rect,
            alpha_blend,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attached_target_cannot_be_released() {
        let mut host = HeadlessHost::new();
        let scene = host.create_scene().unwrap();
        let camera = host.create_camera(scene).unwrap();
        let target = host.create_render_target(8, 8).unwrap();
        host.attach_target(camera, target).unwrap();

        let err = host.release_render_target(target).unwrap_err();
        assert!(matches!(err, HostError::InvalidOperation(_)));

        host.detach_target(camera).unwrap();
        host.release_render_target(target).unwrap();
        assert_eq!(host.target_size(target), None);
    }

    #[test]
    fn oversized_render_target_is_rejected() {
        let mut host = HeadlessHost::new();
        let err = host.create_render_target(40_000, 40_000).unwrap_err();
        assert!(matches!(err, HostError::ResourceCreationFailed(_)));
        assert_eq!(host.created_render_targets(), 0);
    }

    #[test]
    fn close_scene_destroys_contained_resources() {
        let mut host = HeadlessHost::new();
        let scene = host.create_scene().unwrap();
        let camera = host.create_camera(scene).unwrap();
        let object = host.spawn_object(Vec3::ZERO);
        host.adopt_object(scene, object).unwrap();

        host.close_scene(scene).unwrap();
        assert!(!host.scene_exists(scene));
        assert!(host.camera_state(camera).is_none());
        assert!(!host.object_exists(object));
    }

    #[test]
    fn render_fills_the_target_with_the_clear_color() {
        let mut host = HeadlessHost::new();
        let scene = host.create_scene().unwrap();
        let camera = host.create_camera(scene).unwrap();
        let target = host.create_render_target(2, 2).unwrap();
        host.attach_target(camera, target).unwrap();

        let mut state = CameraState::default();
        state.background_color = [0.0, 0.0, 1.0, 1.0];
        host.set_camera_state(camera, state).unwrap();
        // Skybox ambient adds nothing in the headless model.
        host.render_camera(scene, camera).unwrap();

        let pixels = host.target_pixels(target).unwrap();
        assert_eq!(&pixels[0..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn nested_overrides_restore_in_order() {
        let mut host = HeadlessHost::new();
        let scene = host.create_scene().unwrap();
        let original = host.lighting().clone();

        assert!(host.push_lighting_override(scene));
        let mut settings = RenderSettingsOverride::default();
        settings.ambient_intensity = 3.0;
        host.apply_render_settings(&settings).unwrap();
        assert!((host.lighting().ambient_intensity - 3.0).abs() < f32::EPSILON);

        host.pop_lighting_override();
        assert_eq!(*host.lighting(), original);
    }
}
