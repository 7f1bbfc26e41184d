//! The render pipeline: one synchronous render pass with a scoped global
//! lighting override.
//!
//! The override scope is the one place this crate touches process-wide
//! mutable state, so it is kept as tight as possible: installed immediately
//! before the render call, restored unconditionally on the single
//! synchronous exit path, never held across anything else. When the host
//! refuses the override, the render degrades gracefully to the host's own
//! lighting — override fields are then not applied at all, so the host's
//! global state is never touched outside an installed scope.

use crate::error::PreviewError;
use crate::host::{CameraHandle, RenderHost, SceneHandle, TargetHandle};
use crate::scene::PreviewScene;
use crate::settings::RenderSettingsOverride;
use crate::types::Rect;

/// The reusable texture a render call produced: the render target handle
/// plus its pixel size at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedTexture {
    pub target: TargetHandle,
    pub width: u32,
    pub height: u32,
}

impl PreviewScene {
    /// Render the scene through its camera into the currently attached
    /// render target and return that target.
    ///
    /// Fails with `InvalidState` while unloaded. Rendering failures are
    /// host-level faults and are not retried.
    pub fn render<H: RenderHost>(&mut self, host: &mut H) -> Result<RenderedTexture, PreviewError> {
        let (scene, camera) = self.require_loaded()?;
        let target = host
            .attached_target(camera)
            .ok_or(PreviewError::InvalidState(
                "camera has no attached render target",
            ))?;
        render_pass(host, self.custom_render_settings(), scene, camera, target)
    }

    /// Render into an externally owned target: the camera's attachment is
    /// swapped to `target` for this one call and restored afterwards, even
    /// when the render fails.
    pub fn render_to<H: RenderHost>(
        &mut self,
        host: &mut H,
        target: TargetHandle,
    ) -> Result<RenderedTexture, PreviewError> {
        let (scene, camera) = self.require_loaded()?;
        let previous = host.attached_target(camera);
        host.attach_target(camera, target)?;

        let outcome = render_pass(host, self.custom_render_settings(), scene, camera, target);

        let restored = match previous {
            Some(previous) => host.attach_target(camera, previous),
            None => host.detach_target(camera),
        };
        if let Err(err) = restored {
            log::warn!("failed to restore previous render target attachment: {err}");
        }
        outcome
    }

    /// Render and blit the result into a GUI rectangle.
    ///
    /// Returns `Ok(None)` outside a paint pass — issuing a render then would
    /// be wasted work.
    pub fn render_to_gui<H: RenderHost>(
        &mut self,
        host: &mut H,
        rect: Rect,
        alpha_blend: bool,
    ) -> Result<Option<RenderedTexture>, PreviewError> {
        if !host.in_paint_pass() {
            return Ok(None);
        }
        let texture = self.render(host)?;
        host.blit_texture(texture.target, rect, alpha_blend)?;
        Ok(Some(texture))
    }
}

/// Execute the override/render/restore protocol against one target.
fn render_pass<H: RenderHost>(
    host: &mut H,
    settings: &RenderSettingsOverride,
    scene: SceneHandle,
    camera: CameraHandle,
    target: TargetHandle,
) -> Result<RenderedTexture, PreviewError> {
    let overridden = if settings.use_host_ambient_settings {
        false
    } else {
        let installed = host.push_lighting_override(scene);
        if !installed {
            log::debug!("host refused the lighting override; rendering with host settings");
        }
        installed
    };

    let outcome = render_inside_scope(host, settings, scene, camera, overridden);

    if overridden {
        // Restoration is mandatory even on failure; anything else corrupts
        // unrelated rendering elsewhere in the host.
        host.pop_lighting_override();
    }
    outcome?;

    let (width, height) = host.target_size(target).ok_or(PreviewError::InvalidState(
        "render target has been released",
    ))?;
    Ok(RenderedTexture {
        target,
        width,
        height,
    })
}

fn render_inside_scope<H: RenderHost>(
    host: &mut H,
    settings: &RenderSettingsOverride,
    scene: SceneHandle,
    camera: CameraHandle,
    overridden: bool,
) -> Result<(), PreviewError> {
    if overridden {
        host.apply_render_settings(settings)?;
    }
    host.render_camera(scene, camera)?;
    Ok(())
}
