//! Host environment abstraction.
//!
//! The preview scene never talks to a renderer directly; everything it needs
//! from the hosting process is expressed by the [`RenderHost`] trait:
//! isolated scene contexts, object adoption, camera and render-target
//! lifetime, the synchronous camera render call, the scoped global lighting
//! override, and paint-pass detection for GUI composition.
//!
//! Handles are opaque `u64` identifiers rather than in-process references.
//! This is what lets a caller-held scene state survive a host reload: the
//! identifiers are stable and resolvable through the host's own registry
//! after the process-level state has been rebuilt.

mod headless;
#[cfg(feature = "wgpu-host")]
mod wgpu_host;

pub use headless::{GuiBlit, HeadlessHost};
#[cfg(feature = "wgpu-host")]
pub use wgpu_host::WgpuHost;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraState, ClearFlags};
use crate::error::HostResult;
use crate::settings::{
    AmbientMode, ReflectionMode, RenderSettingsOverride, SphericalHarmonics,
};
use crate::types::Rect;

/// Handle to an isolated scene context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneHandle(u64);

/// Handle to a camera owned by an isolated scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraHandle(u64);

/// Handle to a render-target surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetHandle(u64);

/// Handle to a renderable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(u64);

/// Handle to a material (skybox override).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialHandle(u64);

/// Handle to a reflection cubemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CubemapHandle(u64);

macro_rules! impl_raw_handle {
    ($($name:ident),*) => {
        $(impl $name {
            /// Wrap a raw host identifier.
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw host identifier.
            #[inline]
            pub const fn raw(self) -> u64 {
                self.0
            }
        })*
    };
}

impl_raw_handle!(
    SceneHandle,
    CameraHandle,
    TargetHandle,
    ObjectHandle,
    MaterialHandle,
    CubemapHandle
);

/// The host's global lighting/ambient/reflection state.
///
/// This is the one piece of process-wide shared mutable state the preview
/// core touches. Override scopes save and restore whole copies of it.
#[derive(Debug, Clone, PartialEq)]
pub struct HostLighting {
    pub ambient_mode: AmbientMode,
    pub ambient_color: [f32; 4],
    pub ambient_sky_color: [f32; 4],
    pub ambient_equator_color: [f32; 4],
    pub ambient_ground_color: [f32; 4],
    pub ambient_intensity: f32,
    pub subtractive_shadow_color: [f32; 4],
    pub skybox_material: Option<MaterialHandle>,
    pub sun: Option<ObjectHandle>,
    pub ambient_probe: SphericalHarmonics,
    pub custom_reflection: Option<CubemapHandle>,
    pub reflection_intensity: f32,
    pub reflection_bounces: u32,
    pub default_reflection_mode: ReflectionMode,
    pub default_reflection_resolution: u32,
}

impl Default for HostLighting {
    fn default() -> Self {
        Self {
            ambient_mode: AmbientMode::Skybox,
            ambient_color: [0.2, 0.2, 0.2, 1.0],
            ambient_sky_color: [0.2, 0.2, 0.2, 1.0],
            ambient_equator_color: [0.1, 0.1, 0.1, 1.0],
            ambient_ground_color: [0.05, 0.05, 0.05, 1.0],
            ambient_intensity: 1.0,
            subtractive_shadow_color: [0.42, 0.48, 0.58, 1.0],
            skybox_material: None,
            sun: None,
            ambient_probe: SphericalHarmonics::default(),
            custom_reflection: None,
            reflection_intensity: 1.0,
            reflection_bounces: 1,
            default_reflection_mode: ReflectionMode::Skybox,
            default_reflection_resolution: 128,
        }
    }
}

impl HostLighting {
    /// Copy every override field onto the global state.
    pub fn apply_override(&mut self, settings: &RenderSettingsOverride) {
        self.ambient_mode = settings.ambient_mode;
        self.ambient_color = settings.ambient_color;
        self.ambient_sky_color = settings.ambient_sky_color;
        self.ambient_equator_color = settings.ambient_equator_color;
        self.ambient_ground_color = settings.ambient_ground_color;
        self.ambient_intensity = settings.ambient_intensity;
        self.subtractive_shadow_color = settings.subtractive_shadow_color;
        self.skybox_material = settings.skybox_material;
        self.sun = settings.sun;
        self.ambient_probe = settings.ambient_probe;
        self.custom_reflection = settings.custom_reflection;
        self.reflection_intensity = settings.reflection_intensity;
        self.reflection_bounces = settings.reflection_bounces;
        self.default_reflection_mode = settings.default_reflection_mode;
        self.default_reflection_resolution = settings.default_reflection_resolution;
    }
}

/// Resolve the color a camera render clears its target to under the current
/// global lighting, or `None` when the clear behavior leaves color alone.
///
/// Both bundled hosts share this so a headless render and a GPU render of the
/// same scene agree on the frame's base color.
pub(crate) fn resolved_clear_color(
    lighting: &HostLighting,
    camera: &CameraState,
) -> Option<[f32; 4]> {
    let base = match camera.clear_flags {
        ClearFlags::Color | ClearFlags::Skybox => camera.background_color,
        ClearFlags::DepthOnly | ClearFlags::Nothing => return None,
    };
    let ambient = match lighting.ambient_mode {
        AmbientMode::Flat => lighting.ambient_color,
        AmbientMode::Trilight => {
            let sky = lighting.ambient_sky_color;
            let eq = lighting.ambient_equator_color;
            let ground = lighting.ambient_ground_color;
            [
                (sky[0] + eq[0] + ground[0]) / 3.0,
                (sky[1] + eq[1] + ground[1]) / 3.0,
                (sky[2] + eq[2] + ground[2]) / 3.0,
                1.0,
            ]
        }
        AmbientMode::Skybox => [0.0, 0.0, 0.0, 0.0],
    };
    let mut color = base;
    for channel in 0..3 {
        color[channel] =
            (color[channel] + ambient[channel] * lighting.ambient_intensity).clamp(0.0, 1.0);
    }
    Some(color)
}

/// The collaborator surface the preview scene consumes from its host.
///
/// All operations are synchronous and main-thread only; none suspend or
/// block. Implementations own every resource a handle refers to and resolve
/// handles through their own registries, so handles stay valid identifiers
/// across a host reload even when in-process references do not.
pub trait RenderHost {
    // --- isolated scene contexts ---

    /// Create an isolated scene context.
    fn create_scene(&mut self) -> HostResult<SceneHandle>;

    /// Close an isolated scene context, destroying anything still inside it.
    fn close_scene(&mut self, scene: SceneHandle) -> HostResult<()>;

    // --- objects ---

    /// Move an object's ownership into an isolated scene context and mark it
    /// excluded from the host's normal persistence/visibility sweeps.
    fn adopt_object(&mut self, scene: SceneHandle, object: ObjectHandle) -> HostResult<()>;

    /// Clone a template object. The clone starts outside any isolated scene.
    fn clone_object(&mut self, template: ObjectHandle) -> HostResult<ObjectHandle>;

    /// Destroy an object.
    fn destroy_object(&mut self, object: ObjectHandle) -> HostResult<()>;

    /// Set an object's world position.
    fn set_object_position(&mut self, object: ObjectHandle, position: Vec3) -> HostResult<()>;

    /// An object's current world position.
    fn object_position(&self, object: ObjectHandle) -> HostResult<Vec3>;

    // --- cameras ---

    /// Create a camera inside an isolated scene context.
    fn create_camera(&mut self, scene: SceneHandle) -> HostResult<CameraHandle>;

    /// Destroy a camera. Any attached render target is detached, not
    /// released.
    fn destroy_camera(&mut self, camera: CameraHandle) -> HostResult<()>;

    /// Snapshot of a camera's state, or `None` once the camera is gone.
    fn camera_state(&self, camera: CameraHandle) -> Option<CameraState>;

    /// Replace a camera's state.
    fn set_camera_state(&mut self, camera: CameraHandle, state: CameraState) -> HostResult<()>;

    // --- render targets ---

    /// Create a render-target surface.
    fn create_render_target(&mut self, width: u32, height: u32) -> HostResult<TargetHandle>;

    /// Release a render-target surface. Fails while the target is still
    /// attached to a camera — detach first.
    fn release_render_target(&mut self, target: TargetHandle) -> HostResult<()>;

    /// Attach a render target to a camera, replacing any previous
    /// attachment.
    fn attach_target(&mut self, camera: CameraHandle, target: TargetHandle) -> HostResult<()>;

    /// Detach a camera's render target, leaving the target alive.
    fn detach_target(&mut self, camera: CameraHandle) -> HostResult<()>;

    /// The render target currently attached to a camera.
    fn attached_target(&self, camera: CameraHandle) -> Option<TargetHandle>;

    /// Pixel size of a render target, or `None` once released.
    fn target_size(&self, target: TargetHandle) -> Option<(u32, u32)>;

    // --- rendering ---

    /// Issue a synchronous camera render into the camera's attached target
    /// under the current global lighting state.
    fn render_camera(&mut self, scene: SceneHandle, camera: CameraHandle) -> HostResult<()>;

    // --- scoped global lighting override ---

    /// Try to open a lighting-override scope for an isolated scene context.
    /// Returns `false` when the host refuses (overrides unsupported in the
    /// current host state); the caller then renders without overriding.
    fn push_lighting_override(&mut self, scene: SceneHandle) -> bool;

    /// Apply override fields onto the global lighting state.
    fn apply_render_settings(&mut self, settings: &RenderSettingsOverride) -> HostResult<()>;

    /// Close the innermost override scope, restoring the saved global state.
    fn pop_lighting_override(&mut self);

    // --- GUI composition ---

    /// Whether the host is currently inside a paint/draw pass.
    fn in_paint_pass(&self) -> bool;

    /// Blit a render target into a GUI rectangle.
    fn blit_texture(&mut self, target: TargetHandle, rect: Rect, alpha_blend: bool)
        -> HostResult<()>;
}
