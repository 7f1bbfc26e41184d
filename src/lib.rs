//! Preview Scene - an isolated, persistent rendering environment for cheap
//! thumbnail-style renders of many objects.
//!
//! One [`PreviewScene`] owns (through a [`RenderHost`]) an isolated scene
//! context, a single reusable camera and render target, and an ordered
//! registry of objects. Callers bring one object at a time into view with
//! [`PreviewScene::focus`] while the rest sit at an offscreen sentinel, then
//! rasterize it with [`PreviewScene::render`] into the same target.
//!
//! # Features
//! - Explicit `load`/`destroy` lifecycle with idempotent teardown
//! - Focus swapping by position instead of visibility toggles
//! - Scoped global lighting override installed only around the render call
//! - Serializable scene state: handles survive a host reload
//! - Capability-restricted camera access through [`CameraController`]
//!
//! # Hosts
//! Two [`RenderHost`] implementations ship with the crate: the always
//! available [`HeadlessHost`] (no GPU, full bookkeeping, readable pixels)
//! and [`WgpuHost`] behind the default `wgpu-host` feature.
//!
//! ```
//! use preview_scene::{HeadlessHost, PreviewScene};
//!
//! let mut host = HeadlessHost::new();
//! let mut scene = PreviewScene::new();
//! scene.load_with_size(&mut host, (256, 256)).unwrap();
//!
//! let object = host.spawn_object(glam::Vec3::ZERO);
//! scene.add(&mut host, object).unwrap();
//! scene.move_all_offscreen(&mut host).unwrap();
//! scene.focus(&mut host, 0).unwrap();
//!
//! let texture = scene.render(&mut host).unwrap();
//! assert_eq!((texture.width, texture.height), (256, 256));
//!
//! scene.destroy(&mut host);
//! ```

pub mod camera;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod scene;
pub mod settings;
pub mod types;

pub use camera::{CameraController, CameraState, ClearFlags, Projection};
pub use error::{HostError, HostResult, PreviewError};
pub use host::{
    CameraHandle, CubemapHandle, GuiBlit, HeadlessHost, HostLighting, MaterialHandle, ObjectHandle,
    RenderHost, SceneHandle, TargetHandle,
};
#[cfg(feature = "wgpu-host")]
pub use host::WgpuHost;
pub use pipeline::RenderedTexture;
pub use scene::{PreviewScene, DEFAULT_TARGET_SIZE, OFFSCREEN_POSITION};
pub use settings::{AmbientMode, ReflectionMode, RenderSettingsOverride, SphericalHarmonics};
pub use types::Rect;
