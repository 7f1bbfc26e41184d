//! Render settings override value types.
//!
//! A [`RenderSettingsOverride`] describes the ambient/lighting/reflection
//! state to substitute for the host's global settings while one render call
//! executes. It is a plain value object: nothing here touches the host, the
//! pipeline applies it inside an override scope (see `pipeline`).

use serde::{Deserialize, Serialize};

use crate::host::{CubemapHandle, MaterialHandle, ObjectHandle};

/// Source of ambient lighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmbientMode {
    /// Ambient light sampled from the skybox.
    #[default]
    Skybox,
    /// Three-color gradient (sky/equator/ground).
    Trilight,
    /// Single flat ambient color.
    Flat,
}

/// Source of default reflections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReflectionMode {
    /// Reflections sampled from the skybox.
    #[default]
    Skybox,
    /// Reflections sampled from a custom cubemap.
    Custom,
}

/// Order-2 spherical harmonics ambient probe, one 9-coefficient band per
/// color channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SphericalHarmonics {
    pub coefficients: [[f32; 9]; 3],
}

/// Global lighting/ambient/reflection settings applied only for the duration
/// of a preview render call.
///
/// With `use_host_ambient_settings` set (the default) the override is
/// bypassed entirely and renders use whatever the host's global state is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettingsOverride {
    /// Skip the override and render with the host's own ambient settings.
    pub use_host_ambient_settings: bool,
    pub ambient_mode: AmbientMode,
    /// Flat ambient color (used when `ambient_mode` is [`AmbientMode::Flat`]).
    pub ambient_color: [f32; 4],
    pub ambient_sky_color: [f32; 4],
    pub ambient_equator_color: [f32; 4],
    pub ambient_ground_color: [f32; 4],
    pub ambient_intensity: f32,
    /// Shadow color for subtractive shadow rendering.
    pub subtractive_shadow_color: [f32; 4],
    /// Skybox material to substitute, if any.
    pub skybox_material: Option<MaterialHandle>,
    /// Directional "sun" light to substitute, if any.
    pub sun: Option<ObjectHandle>,
    /// Baked ambient probe data.
    pub ambient_probe: SphericalHarmonics,
    /// Custom reflection cubemap, if any.
    pub custom_reflection: Option<CubemapHandle>,
    pub reflection_intensity: f32,
    pub reflection_bounces: u32,
    pub default_reflection_mode: ReflectionMode,
    /// Resolution of generated default reflections, in pixels.
    pub default_reflection_resolution: u32,
}

impl Default for RenderSettingsOverride {
    fn default() -> Self {
        Self {
            use_host_ambient_settings: true,
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
