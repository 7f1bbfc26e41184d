//! GPU host backed by wgpu.
//!
//! Render targets are real GPU textures and the camera render call is
//! encoded and submitted to the device, so target lifecycle and readback can
//! be exercised against actual hardware. Object records are CPU-side: this
//! host draws the resolved clear/ambient color (the same resolution rule the
//! headless host uses), it does not rasterize object content.
//!
//! There is no GUI compositor here; `in_paint_pass` is always false, so
//! `render_to_gui` degrades to a no-op against this host.

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

const BYTES_PER_PIXEL: u32 = 4;

/// 256-byte row alignment required by wgpu for texture-to-buffer copies.
fn aligned_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    (unpadded + 255) & !255
}

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

struct TargetRecord {
    texture: wgpu::Texture,
    width: u32,
    height: u32,
}

/// [`RenderHost`] implementation over a wgpu device.
pub struct WgpuHost {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_id: u64,
    scenes: HashSet<SceneHandle>,
    objects: HashMap<ObjectHandle, ObjectRecord>,
    cameras: HashMap<CameraHandle, CameraRecord>,
    targets: HashMap<TargetHandle, TargetRecord>,
    lighting: HostLighting,
    override_stack: Vec<HostLighting>,
}

impl WgpuHost {
    /// Initialize a headless device on any available adapter.
    pub fn new() -> HostResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| HostError::InitializationFailed("no compatible GPU adapter".into()))?;

        let adapter_info = adapter.get_info();
        log::debug!(
            "WgpuHost: using adapter {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("preview host device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|err| HostError::InitializationFailed(err.to_string()))?;

        Ok(Self {
            device,
            queue,
            next_id: 1,
            scenes: HashSet::new(),
            objects: HashMap::new(),
            cameras: HashMap::new(),
            targets: HashMap::new(),
            lighting: HostLighting::default(),
            override_stack: Vec::new(),
        })
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

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

    /// The host's global lighting state.
    pub fn lighting(&self) -> &HostLighting {
        &self.lighting
    }

    /// Read a render target back as tightly packed RGBA8 rows.
    pub fn read_pixels(&self, target: TargetHandle) -> HostResult<Vec<u8>> {
        let record = self
            .targets
            .get(&target)
            .ok_or_else(|| HostError::UnknownHandle(format!("target {}", target.raw())))?;

        let padded_row = aligned_bytes_per_row(record.width);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("preview readback"),
            size: padded_row as u64 * record.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("preview readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &record.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(record.height),
                },
            },
            wgpu::Extent3d {
                width: record.width,
                height: record.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| HostError::RenderFailed("readback mapping was dropped".into()))?
            .map_err(|err| HostError::RenderFailed(format!("readback mapping failed: {err:?}")))?;

        let mapped = slice.get_mapped_range();
        let row_bytes = (record.width * BYTES_PER_PIXEL) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * record.height as usize);
        for row in 0..record.height as usize {
            let start = row * padded_row as usize;
            pixels.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }
}

impl RenderHost for WgpuHost {
    fn create_scene(&mut self) -> HostResult<SceneHandle> {
        let scene = SceneHandle::from_raw(self.next_id());
        self.scenes.insert(scene);
        log::trace!("WgpuHost: created scene {}", scene.raw());
        Ok(scene)
    }

    fn close_scene(&mut self, scene: SceneHandle) -> HostResult<()> {
        if !self.scenes.remove(&scene) {
            return Err(HostError::UnknownHandle(format!("scene {}", scene.raw())));
        }
        self.objects
            .retain(|_, record| record.scene != Some(scene));
        self.cameras.retain(|_, record| record.scene != scene);
        log::trace!("WgpuHost: closed scene {}", scene.raw());
        Ok(())
    }

    fn adopt_object(&mut self, scene: SceneHandle, object: ObjectHandle) -> HostResult<()> {
        if !self.scenes.contains(&scene) {
            return Err(HostError::UnknownHandle(format!("scene {}", scene.raw())));
        }
        let record = self
            .objects
            .get_mut(&object)
            .ok_or_else(|| HostError::UnknownHandle(format!("object {}", object.raw())))?;
        record.scene = Some(scene);
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
        if !self.scenes.contains(&scene) {
            return Err(HostError::UnknownHandle(format!("scene {}", scene.raw())));
        }
        let camera = CameraHandle::from_raw(self.next_id());
        self.cameras.insert(
            camera,
            CameraRecord {
                scene,
                state: CameraState::default(),
                target: None,
            },
        );
        Ok(camera)
    }

    fn destroy_camera(&mut self, camera: CameraHandle) -> HostResult<()> {
        self.cameras
            .remove(&camera)
            .ok_or_else(|| HostError::UnknownHandle(format!("camera {}", camera.raw())))?;
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
        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(HostError::ResourceCreationFailed(format!(
                "render target size {width}x{height} exceeds the device limit of {limit}"
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("preview render target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let target = TargetHandle::from_raw(self.next_id());
        self.targets.insert(
            target,
            TargetRecord {
                texture,
                width,
                height,
            },
        );
        log::trace!(
            "WgpuHost: created render target {} ({width}x{height})",
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
        if let Some(record) = self.targets.remove(&target) {
            record.texture.destroy();
        }
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
        if !self.scenes.contains(&scene) {
            return Err(HostError::UnknownHandle(format!("scene {}", scene.raw())));
        }
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
        let Some(color) = resolved_clear_color(&self.lighting, &state) else {
            // Depth-only/no-clear renders have nothing to draw in this host.
            return Ok(());
        };

        let texture = &self
            .targets
            .get(&target)
            .ok_or_else(|| HostError::UnknownHandle(format!("target {}", target.raw())))?
            .texture;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("preview render"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("preview clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color[0] as f64,
                            g: color[1] as f64,
                            b: color[2] as f64,
                            a: color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(Some(encoder.finish()));
        log::trace!(
            "WgpuHost: rendered camera {} into target {}",
            camera.raw(),
            target.raw()
        );
        Ok(())
    }

    fn push_lighting_override(&mut self, scene: SceneHandle) -> bool {
        if !self.scenes.contains(&scene) {
            return false;
        }
        self.override_stack.push(self.lighting.clone());
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
        false
    }

    fn blit_texture(
        &mut self,
        _target: TargetHandle,
        _rect: Rect,
        _alpha_blend: bool,
    ) -> HostResult<()> {
        log::trace!("WgpuHost: no GUI compositor, blit ignored");
        Ok(())
    }
}
