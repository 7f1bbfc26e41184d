//! Preview scene lifecycle and object registry.
//!
//! A [`PreviewScene`] owns (through the host) one isolated scene context,
//! one camera and one reusable render target, plus an ordered registry of
//! objects that can be individually focused at the origin while the rest sit
//! at the offscreen sentinel. The struct itself is the persistent state: it
//! serializes to plain handles and settings, which is what lets a caller keep
//! it across a host reload and still `destroy` the same logical resources
//! afterwards.
//!
//! Lifecycle contract: `load` pairs with `destroy`, explicitly. There is no
//! finalizer-driven cleanup and `load` never implicitly destroys a previous
//! load.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraController, CameraState};
use crate::error::PreviewError;
use crate::host::{CameraHandle, ObjectHandle, RenderHost, SceneHandle, TargetHandle};
use crate::settings::RenderSettingsOverride;

/// Render target size used by [`PreviewScene::load`].
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (256, 256);

/// Where non-focused objects are parked: far outside the view frustum of the
/// default camera (far clip 1000), so hiding is a position write instead of a
/// visibility toggle.
pub const OFFSCREEN_POSITION: Vec3 = Vec3::new(2500.0, 2500.0, 2500.0);

/// An isolated, persistent preview scene.
///
/// All operations take the host explicitly, the way a renderer takes its
/// backend; the scene holds no host reference of its own, only stable
/// handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewScene {
    loaded: bool,
    scene: Option<SceneHandle>,
    camera: Option<CameraHandle>,
    render_target: Option<TargetHandle>,
    target_size: (u32, u32),
    objects: Vec<ObjectHandle>,
    focused: Option<usize>,
    settings: RenderSettingsOverride,
}

impl Default for PreviewScene {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewScene {
    /// Create an empty, unloaded preview scene.
    pub fn new() -> Self {
        Self {
            loaded: false,
            scene: None,
            camera: None,
            render_target: None,
            target_size: DEFAULT_TARGET_SIZE,
            objects: Vec::new(),
            focused: None,
            settings: RenderSettingsOverride::default(),
        }
    }

    // --- lifecycle ---

    /// Load with [`DEFAULT_TARGET_SIZE`].
    pub fn load<H: RenderHost>(&mut self, host: &mut H) -> Result<(), PreviewError> {
        self.load_with_size(host, DEFAULT_TARGET_SIZE)
    }

    /// Create the isolated context, the camera (at the default distance
    /// along the view axis) and a render target of the given size.
    ///
    /// Fails with `InvalidArgument` when either dimension is zero and with
    /// `InvalidState` when already loaded — the caller must `destroy` first;
    /// loading never implicitly releases prior resources.
    pub fn load_with_size<H: RenderHost>(
        &mut self,
        host: &mut H,
        size: (u32, u32),
    ) -> Result<(), PreviewError> {
        if self.loaded {
            return Err(PreviewError::InvalidState(
                "preview scene is already loaded; destroy it first",
            ));
        }
        let (width, height) = size;
        if width < 1 || height < 1 {
            return Err(PreviewError::InvalidArgument(format!(
                "render target size must be at least 1x1, got {width}x{height}"
            )));
        }

        let scene = host.create_scene()?;

        let camera = match host.create_camera(scene) {
            Ok(camera) => camera,
            Err(err) => {
                Self::close_scene_quiet(host, scene);
                return Err(err.into());
            }
        };
        if let Err(err) = host.set_camera_state(camera, CameraState::default()) {
            Self::destroy_camera_quiet(host, camera);
            Self::close_scene_quiet(host, scene);
            return Err(err.into());
        }

        let target = match host.create_render_target(width, height) {
            Ok(target) => target,
            Err(err) => {
                Self::destroy_camera_quiet(host, camera);
                Self::close_scene_quiet(host, scene);
                return Err(err.into());
            }
        };
        if let Err(err) = host.attach_target(camera, target) {
            if let Err(release) = host.release_render_target(target) {
                log::warn!("failed to release render target during load rollback: {release}");
            }
            Self::destroy_camera_quiet(host, camera);
            Self::close_scene_quiet(host, scene);
            return Err(err.into());
        }

        self.loaded = true;
        self.scene = Some(scene);
        self.camera = Some(camera);
        self.render_target = Some(target);
        self.target_size = (width, height);
        log::debug!("preview scene loaded with {width}x{height} render target");
        Ok(())
    }

    /// Release everything: detach and release the render target, release the
    /// camera, destroy every registered object, close the isolated context.
    ///
    /// No-op when unloaded; teardown faults are logged, never raised, so the
    /// call is safe to repeat.
    pub fn destroy<H: RenderHost>(&mut self, host: &mut H) {
        if !self.loaded {
            return;
        }

        // The target must be detached before release; a target attached to
        // an active camera cannot be released directly.
        if let Some(camera) = self.camera {
            if let Err(err) = host.detach_target(camera) {
                log::warn!("failed to detach render target: {err}");
            }
        }
        if let Some(target) = self.render_target.take() {
            if let Err(err) = host.release_render_target(target) {
                log::warn!("failed to release render target: {err}");
            }
        }
        if let Some(camera) = self.camera.take() {
            Self::destroy_camera_quiet(host, camera);
        }
        for object in self.objects.drain(..) {
            if let Err(err) = host.destroy_object(object) {
                log::warn!("failed to destroy preview object: {err}");
            }
        }
        if let Some(scene) = self.scene.take() {
            Self::close_scene_quiet(host, scene);
        }

        self.focused = None;
        self.loaded = false;
        log::debug!("preview scene destroyed");
    }

    /// Whether the scene currently holds live camera/target resources.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The reusable render target, while loaded.
    #[inline]
    pub fn render_target(&self) -> Option<TargetHandle> {
        self.render_target
    }

    pub(crate) fn require_loaded(&self) -> Result<(SceneHandle, CameraHandle), PreviewError> {
        match (self.loaded, self.scene, self.camera) {
            (true, Some(scene), Some(camera)) => Ok((scene, camera)),
            _ => Err(PreviewError::InvalidState("preview scene is not loaded")),
        }
    }

    // --- object registry ---

    /// Transfer an object into the isolated context and append it to the
    /// registry. Its index is its position in add order.
    pub fn add<H: RenderHost>(
        &mut self,
        host: &mut H,
        object: ObjectHandle,
    ) -> Result<(), PreviewError> {
        let (scene, _) = self.require_loaded()?;
        host.adopt_object(scene, object)?;
        self.objects.push(object);
        log::trace!(
            "object {} added to preview scene at index {}",
            object.raw(),
            self.objects.len() - 1
        );
        Ok(())
    }

    /// Clone a template object, add the clone, and return it for further
    /// configuration.
    pub fn instantiate<H: RenderHost>(
        &mut self,
        host: &mut H,
        template: ObjectHandle,
    ) -> Result<ObjectHandle, PreviewError> {
        self.require_loaded()?;
        let clone = host.clone_object(template)?;
        match self.add(host, clone) {
            Ok(()) => Ok(clone),
            Err(err) => {
                if let Err(destroy) = host.destroy_object(clone) {
                    log::warn!("failed to destroy orphaned clone: {destroy}");
                }
                Err(err)
            }
        }
    }

    /// Number of registered objects.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The object registered at `index`, in add order.
    #[inline]
    pub fn object_at(&self, index: usize) -> Option<ObjectHandle> {
        self.objects.get(index).copied()
    }

    /// Index of the currently focused object, if any.
    #[inline]
    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    /// Park every registered object at [`OFFSCREEN_POSITION`] and clear the
    /// focus bookkeeping. Establishes the "nothing visible" baseline, and is
    /// the recovery path if a caller repositioned objects manually.
    pub fn move_all_offscreen<H: RenderHost>(&mut self, host: &mut H) -> Result<(), PreviewError> {
        self.require_loaded()?;
        // The focus baseline is torn down either way; clearing it up front
        // keeps the bookkeeping from outliving a partial move.
        self.focused = None;
        for &object in &self.objects {
            host.set_object_position(object, OFFSCREEN_POSITION)?;
        }
        Ok(())
    }

    /// Bring exactly one object into view: the previously focused object (if
    /// different) moves to the offscreen sentinel, the target moves to the
    /// scene origin.
    ///
    /// The protocol assumes callers do not reposition objects between focus
    /// calls; use [`Self::move_all_offscreen`] to re-establish the baseline
    /// if they have.
    pub fn focus<H: RenderHost>(&mut self, host: &mut H, index: usize) -> Result<(), PreviewError> {
        self.require_loaded()?;
        let count = self.objects.len();
        if index >= count {
            return Err(PreviewError::IndexOutOfRange { index, count });
        }

        if let Some(previous) = self.focused {
            if previous != index {
                if let Some(&object) = self.objects.get(previous) {
                    host.set_object_position(object, OFFSCREEN_POSITION)?;
                }
            }
        }
        host.set_object_position(self.objects[index], Vec3::ZERO)?;
        self.focused = Some(index);
        log::trace!("focused preview object {index}");
        Ok(())
    }

    /// Destroy every registered object and empty the registry. Camera and
    /// render target are untouched. Safe to call redundantly; faults are
    /// logged, never raised.
    pub fn clear<H: RenderHost>(&mut self, host: &mut H) {
        for object in self.objects.drain(..) {
            if let Err(err) = host.destroy_object(object) {
                log::warn!("failed to destroy preview object: {err}");
            }
        }
        self.focused = None;
    }

    // --- camera & settings access ---

    /// Capability-restricted access to the scene's camera. The controller is
    /// rebuilt on every call and revalidates the camera resource itself, so
    /// it is safe to obtain after a host reload.
    pub fn camera<'a, H: RenderHost>(&self, host: &'a mut H) -> CameraController<'a, H> {
        CameraController::new(host, self.camera)
    }

    /// The render settings override applied during render calls.
    #[inline]
    pub fn custom_render_settings(&self) -> &RenderSettingsOverride {
        &self.settings
    }

    /// Mutable access to the render settings override.
    #[inline]
    pub fn custom_render_settings_mut(&mut self) -> &mut RenderSettingsOverride {
        &mut self.settings
    }

    fn destroy_camera_quiet<H: RenderHost>(host: &mut H, camera: CameraHandle) {
        if let Err(err) = host.destroy_camera(camera) {
            log::warn!("failed to destroy preview camera: {err}");
        }
    }

    fn close_scene_quiet<H: RenderHost>(host: &mut H, scene: SceneHandle) {
        if let Err(err) = host.close_scene(scene) {
            log::warn!("failed to close preview scene context: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;

    fn loaded_scene(host: &mut HeadlessHost) -> PreviewScene {
        let mut scene = PreviewScene::new();
        scene.load(host).unwrap();
        scene
    }

    #[test]
    fn new_scene_is_unloaded() {
        let scene = PreviewScene::new();
        assert!(!scene.is_loaded());
        assert_eq!(scene.object_count(), 0);
        assert!(scene.render_target().is_none());
    }

    #[test]
    fn load_rejects_degenerate_sizes() {
        let mut host = HeadlessHost::new();
        let mut scene = PreviewScene::new();

        for size in [(0, 64), (64, 0), (0, 0)] {
            let err = scene.load_with_size(&mut host, size).unwrap_err();
            assert!(matches!(err, PreviewError::InvalidArgument(_)));
            assert!(!scene.is_loaded());
        }
    }

    #[test]
    fn load_while_loaded_is_invalid_state() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let err = scene.load(&mut host).unwrap_err();
        assert!(matches!(err, PreviewError::InvalidState(_)));
        // The original resources stay valid.
        assert!(scene.is_loaded());
        assert_eq!(host.created_render_targets(), 1);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        scene.destroy(&mut host);
        assert!(!scene.is_loaded());
        scene.destroy(&mut host);
        scene.destroy(&mut host);

        assert_eq!(host.released_render_targets(), 1);
        assert_eq!(host.released_cameras(), 1);
    }

    #[test]
    fn repeated_load_destroy_releases_every_resource() {
        let mut host = HeadlessHost::new();
        let mut scene = PreviewScene::new();

        for _ in 0..5 {
            scene.load(&mut host).unwrap();
            scene.destroy(&mut host);
        }

        assert_eq!(host.created_render_targets(), 5);
        assert_eq!(host.released_render_targets(), 5);
        assert_eq!(host.created_cameras(), 5);
        assert_eq!(host.released_cameras(), 5);
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let objects: Vec<_> = (0..4).map(|_| host.spawn_object(Vec3::ZERO)).collect();
        for &object in &objects {
            scene.add(&mut host, object).unwrap();
        }

        assert_eq!(scene.object_count(), 4);
        for (index, &object) in objects.iter().enumerate() {
            assert_eq!(scene.object_at(index), Some(object));
        }
    }

    #[test]
    fn add_while_unloaded_is_invalid_state() {
        let mut host = HeadlessHost::new();
        let object = host.spawn_object(Vec3::ZERO);
        let mut scene = PreviewScene::new();

        let err = scene.add(&mut host, object).unwrap_err();
        assert!(matches!(err, PreviewError::InvalidState(_)));
    }

    #[test]
    fn instantiate_clones_the_template() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let template = host.spawn_object(Vec3::new(1.0, 2.0, 3.0));
        let clone = scene.instantiate(&mut host, template).unwrap();

        assert_ne!(clone, template);
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.object_at(0), Some(clone));
        // The template stays outside the preview registry.
        assert!(host.object_exists(template));
    }

    #[test]
    fn focus_swaps_between_origin_and_sentinel() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let a = host.spawn_object(Vec3::ZERO);
        let b = host.spawn_object(Vec3::ZERO);
        scene.add(&mut host, a).unwrap();
        scene.add(&mut host, b).unwrap();
        scene.move_all_offscreen(&mut host).unwrap();

        scene.focus(&mut host, 0).unwrap();
        assert_eq!(host.object_position(a).unwrap(), Vec3::ZERO);
        assert_eq!(host.object_position(b).unwrap(), OFFSCREEN_POSITION);
        assert_eq!(scene.focused_index(), Some(0));

        scene.focus(&mut host, 1).unwrap();
        assert_eq!(host.object_position(a).unwrap(), OFFSCREEN_POSITION);
        assert_eq!(host.object_position(b).unwrap(), Vec3::ZERO);
        assert_eq!(scene.focused_index(), Some(1));
    }

    #[test]
    fn focus_out_of_range() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);
        let object = host.spawn_object(Vec3::ZERO);
        scene.add(&mut host, object).unwrap();

        let err = scene.focus(&mut host, 1).unwrap_err();
        assert!(matches!(
            err,
            PreviewError::IndexOutOfRange { index: 1, count: 1 }
        ));
    }

    #[test]
    fn move_all_offscreen_ignores_focus_history() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let objects: Vec<_> = (0..3).map(|_| host.spawn_object(Vec3::ZERO)).collect();
        for &object in &objects {
            scene.add(&mut host, object).unwrap();
        }
        scene.focus(&mut host, 2).unwrap();

        scene.move_all_offscreen(&mut host).unwrap();
        for &object in &objects {
            assert_eq!(host.object_position(object).unwrap(), OFFSCREEN_POSITION);
        }
        assert_eq!(scene.focused_index(), None);
    }

    #[test]
    fn move_all_offscreen_clears_focus_even_on_partial_failure() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let a = host.spawn_object(Vec3::ZERO);
        let b = host.spawn_object(Vec3::ZERO);
        scene.add(&mut host, a).unwrap();
        scene.add(&mut host, b).unwrap();
        scene.focus(&mut host, 1).unwrap();

        // An externally destroyed object makes the sweep fail partway
        // through; the stale focus must not survive it.
        host.destroy_object(a).unwrap();
        assert!(scene.move_all_offscreen(&mut host).is_err());
        assert_eq!(scene.focused_index(), None);
    }

    #[test]
    fn clear_destroys_objects_but_keeps_the_scene_loaded() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let object = host.spawn_object(Vec3::ZERO);
        scene.add(&mut host, object).unwrap();

        scene.clear(&mut host);
        assert_eq!(scene.object_count(), 0);
        assert!(!host.object_exists(object));
        assert!(scene.is_loaded());

        // Redundant clears are fine.
        scene.clear(&mut host);
    }

    #[test]
    fn destroy_destroys_registered_objects() {
        let mut host = HeadlessHost::new();
        let mut scene = loaded_scene(&mut host);

        let object = host.spawn_object(Vec3::ZERO);
        scene.add(&mut host, object).unwrap();

        scene.destroy(&mut host);
        assert!(!host.object_exists(object));
        assert_eq!(scene.object_count(), 0);
    }
}
