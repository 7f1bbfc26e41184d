//! Preview camera state and its capability-restricted controller.
//!
//! The camera is a host resource owned by the loaded scene. Callers never
//! see its handle; they go through [`CameraController`], a borrow-scoped
//! façade that mediates every mutation through the host and revalidates the
//! underlying resource on each access. The façade is rebuilt lazily per
//! access, so a stale wrapper held across a host reload simply reports
//! `is_valid() == false` instead of dangling.

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::error::PreviewError;
use crate::host::{CameraHandle, RenderHost};

/// Camera projection. Perspective and orthographic are mutually exclusive:
/// selecting one replaces the other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in degrees.
        fov_y_degrees: f32,
    },
    Orthographic {
        /// Half of the vertical viewing volume, in world units.
        half_height: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y_degrees: 45.0,
        }
    }
}

/// What a camera render clears before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearFlags {
    /// Clear color and depth to the background color.
    #[default]
    Color,
    /// Clear depth and draw the skybox as background.
    Skybox,
    /// Clear depth only, keep previous color contents.
    DepthOnly,
    /// Clear nothing.
    Nothing,
}

/// Full state of the preview camera.
///
/// Owned by the host; the scene writes the default on load and the
/// controller reads/writes it afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub rotation: Quat,
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub clear_flags: ClearFlags,
    pub background_color: [f32; 4],
}

impl Default for CameraState {
    fn default() -> Self {
        // Default preview placement: back along the view axis, looking at
        // the origin (the focus point for focused objects).
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            rotation: Quat::IDENTITY,
            projection: Projection::default(),
            near: 0.1,
            far: 1000.0,
            clear_flags: ClearFlags::Color,
            background_color: [0.19, 0.19, 0.19, 1.0],
        }
    }
}

impl CameraState {
    /// The direction the camera looks along (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Orient the camera toward a world-space point.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() <= f32::EPSILON {
            return;
        }
        let forward = forward.normalize();
        let mut right = forward.cross(up);
        if right.length_squared() <= f32::EPSILON {
            // Forward is parallel to up; pick an arbitrary perpendicular.
            right = forward.cross(Vec3::Z);
            if right.length_squared() <= f32::EPSILON {
                right = forward.cross(Vec3::X);
            }
        }
        let right = right.normalize();
        let local_up = right.cross(forward);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, local_up, -forward));
    }

    /// World-to-camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    /// Projection transform for a target with the given aspect ratio.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y_degrees } => {
                Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, self.near, self.far)
            }
            Projection::Orthographic { half_height } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }
}

/// Restricted-access wrapper around the scene's camera.
///
/// Exposes position/rotation/projection/clear mutators without ever exposing
/// the underlying handle, so callers cannot destroy or reattach the camera
/// behind the lifecycle manager's back. Every member fails with
/// [`PreviewError::InvalidState`] once the camera resource is gone.
pub struct CameraController<'a, H: RenderHost> {
    host: &'a mut H,
    camera: Option<CameraHandle>,
}

impl<'a, H: RenderHost> CameraController<'a, H> {
    pub(crate) fn new(host: &'a mut H, camera: Option<CameraHandle>) -> Self {
        Self { host, camera }
    }

    /// Whether the underlying camera resource is still alive.
    pub fn is_valid(&self) -> bool {
        self.camera
            .is_some_and(|camera| self.host.camera_state(camera).is_some())
    }

    fn read(&self) -> Result<CameraState, PreviewError> {
        let camera = self
            .camera
            .ok_or(PreviewError::InvalidState("preview scene is not loaded"))?;
        self.host
            .camera_state(camera)
            .ok_or(PreviewError::InvalidState(
                "camera resource has been released",
            ))
    }

    fn update(&mut self, f: impl FnOnce(&mut CameraState)) -> Result<(), PreviewError> {
        let camera = self
            .camera
            .ok_or(PreviewError::InvalidState("preview scene is not loaded"))?;
        let mut state = self
            .host
            .camera_state(camera)
            .ok_or(PreviewError::InvalidState(
                "camera resource has been released",
            ))?;
        f(&mut state);
        self.host.set_camera_state(camera, state)?;
        Ok(())
    }

    pub fn position(&self) -> Result<Vec3, PreviewError> {
        Ok(self.read()?.position)
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<(), PreviewError> {
        self.update(|state| state.position = position)
    }

    pub fn rotation(&self) -> Result<Quat, PreviewError> {
        Ok(self.read()?.rotation)
    }

    pub fn set_rotation(&mut self, rotation: Quat) -> Result<(), PreviewError> {
        self.update(|state| state.rotation = rotation)
    }

    /// Atomic combined position + rotation set.
    pub fn set_position_and_rotation(
        &mut self,
        position: Vec3,
        rotation: Quat,
    ) -> Result<(), PreviewError> {
        self.update(|state| {
            state.position = position;
            state.rotation = rotation;
        })
    }

    /// Orient the camera toward a world-space point.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) -> Result<(), PreviewError> {
        self.update(|state| state.look_at(target, up))
    }

    pub fn projection(&self) -> Result<Projection, PreviewError> {
        Ok(self.read()?.projection)
    }

    /// Switch to perspective projection with the given vertical field of
    /// view in degrees.
    pub fn set_field_of_view(&mut self, fov_y_degrees: f32) -> Result<(), PreviewError> {
        if !(fov_y_degrees > 0.0 && fov_y_degrees < 180.0) {
            return Err(PreviewError::InvalidArgument(format!(
                "field of view must be in (0, 180) degrees, got {fov_y_degrees}"
            )));
        }
        self.update(|state| state.projection = Projection::Perspective { fov_y_degrees })
    }

    /// Switch to orthographic projection with the given half-height.
    pub fn set_orthographic_size(&mut self, half_height: f32) -> Result<(), PreviewError> {
        if half_height <= 0.0 {
            return Err(PreviewError::InvalidArgument(format!(
                "orthographic size must be positive, got {half_height}"
            )));
        }
        self.update(|state| state.projection = Projection::Orthographic { half_height })
    }

    pub fn clip_planes(&self) -> Result<(f32, f32), PreviewError> {
        let state = self.read()?;
        Ok((state.near, state.far))
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<(), PreviewError> {
        if near <= 0.0 || far <= near {
            return Err(PreviewError::InvalidArgument(format!(
                "clip planes must satisfy 0 < near < far, got near={near} far={far}"
            )));
        }
        self.update(|state| {
            state.near = near;
            state.far = far;
        })
    }

    pub fn background_color(&self) -> Result<[f32; 4], PreviewError> {
        Ok(self.read()?.background_color)
    }

    pub fn set_background_color(&mut self, color: [f32; 4]) -> Result<(), PreviewError> {
        self.update(|state| state.background_color = color)
    }

    pub fn clear_flags(&self) -> Result<ClearFlags, PreviewError> {
        Ok(self.read()?.clear_flags)
    }

    pub fn set_clear_flags(&mut self, flags: ClearFlags) -> Result<(), PreviewError> {
        self.update(|state| state.clear_flags = flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HeadlessHost, RenderHost};

    #[test]
    fn default_camera_looks_at_origin() {
        let state = CameraState::default();
        let to_origin = (Vec3::ZERO - state.position).normalize();
        assert!(state.forward().abs_diff_eq(to_origin, 1e-6));
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut state = CameraState::default();
        state.position = Vec3::new(3.0, 4.0, 5.0);
        state.look_at(Vec3::new(-1.0, 0.0, 2.0), Vec3::Y);

        let expected = (Vec3::new(-1.0, 0.0, 2.0) - state.position).normalize();
        assert!(state.forward().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn look_at_degenerate_directions() {
        let mut state = CameraState::default();

        // Target at the camera position: orientation is left alone.
        let before = state.rotation;
        state.look_at(state.position, Vec3::Y);
        assert_eq!(state.rotation, before);

        // Forward parallel to up still produces a valid orientation.
        state.position = Vec3::ZERO;
        state.look_at(Vec3::Y * 10.0, Vec3::Y);
        assert!(state.forward().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn view_matrix_maps_target_onto_view_axis() {
        let mut state = CameraState::default();
        state.position = Vec3::new(0.0, 0.0, 10.0);
        state.look_at(Vec3::ZERO, Vec3::Y);

        let viewed = state.view_matrix().transform_point3(Vec3::ZERO);
        assert!(viewed.abs_diff_eq(Vec3::new(0.0, 0.0, -10.0), 1e-5));
    }

    #[test]
    fn projection_matrices_differ_by_mode() {
        let mut state = CameraState::default();
        let perspective = state.projection_matrix(1.0);

        state.projection = Projection::Orthographic { half_height: 2.0 };
        let orthographic = state.projection_matrix(1.0);

        assert_ne!(perspective, orthographic);
        // Orthographic keeps w == 1 for any point; perspective does not.
        let w = orthographic * Vec3::new(0.0, 0.0, -5.0).extend(1.0);
        assert!((w.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn controller_rejects_out_of_domain_parameters() {
        let mut host = HeadlessHost::new();
        let scene = host.create_scene().unwrap();
        let handle = host.create_camera(scene).unwrap();
        let mut camera = CameraController::new(&mut host, Some(handle));

        let projection = camera.projection().unwrap();
        let planes = camera.clip_planes().unwrap();

        for fov in [0.0, -10.0, 180.0, 360.0] {
            let err = camera.set_field_of_view(fov).unwrap_err();
            assert!(matches!(err, PreviewError::InvalidArgument(_)));
        }
        for half_height in [0.0, -1.0] {
            let err = camera.set_orthographic_size(half_height).unwrap_err();
            assert!(matches!(err, PreviewError::InvalidArgument(_)));
        }
        for (near, far) in [(0.0, 10.0), (-1.0, 10.0), (1.0, 1.0), (5.0, 0.5)] {
            let err = camera.set_clip_planes(near, far).unwrap_err();
            assert!(matches!(err, PreviewError::InvalidArgument(_)));
        }

        // Rejected values leave the camera state untouched.
        assert_eq!(camera.projection().unwrap(), projection);
        assert_eq!(camera.clip_planes().unwrap(), planes);
    }
}
