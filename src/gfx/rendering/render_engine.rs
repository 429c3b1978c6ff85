//! wgpu renderer for the studio scene
//!
//! The engine is a [`SceneSink`]: the render loop pushes scene diffs,
//! soft-shadow steps and the animated camera eye into it, and
//! [`RenderEngine::render_frame`] turns the resulting GPU state into one
//! frame: key shadow, shadow accumulation, main pass with the grid, then UI.

use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Context};
use cgmath::Vector3;
use wgpu::{Device, TextureFormat};

use super::{
    pipeline_manager::{PipelineConfig, PipelineManager},
    soft_shadows::{
        accumulate_blend, SoftShadows, ACCUMULATE_PIPELINE, ACCUMULATION_FORMAT, SHADOW_PIPELINE,
    },
};
use crate::{
    config::StudioConfig,
    gfx::{
        camera::OrbitCamera,
        resources::{
            global_bindings::light_view_proj,
            material::srgb_to_linear,
            texture_resource::{load_rgba_image, procedural_floor, MAX_TEXTURE_SIZE},
            GlobalBindings, GlobalUBO, GlobalUniform, MaterialBindings, TextureResource,
        },
        scene::{DrawMesh, GpuPrimitive, ObjectBindings},
    },
    studio::{
        render_loop::{SceneDiff, SceneSink},
        scene_graph::{SceneGraph, SurfaceTexture},
        shadows::AccumulationStep,
    },
};

pub const PBR_PIPELINE: &str = "PBR";
pub const GRID_PIPELINE: &str = "Grid";
const FLOOR_TEXTURE_SIZE: u32 = 256;

pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pipeline_manager: PipelineManager,

    globals: GlobalUniform,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,

    shadows: SoftShadows,
    primitives: Vec<GpuPrimitive>,
    background: wgpu::Color,

    pub camera: OrbitCamera,
}

impl RenderEngine {
    /// Creates the device, surface and every GPU resource for `scene`
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        studio: &StudioConfig,
        scene: &SceneGraph,
        camera_eye: Vector3<f32>,
    ) -> anyhow::Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to request adapter")?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: MAX_TEXTURE_SIZE,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to request a device")?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(studio.window.vsync),
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let settings = studio.shadow_settings();
        let shadows = SoftShadows::new(
            &device,
            &settings,
            studio.shadows.map_size,
            studio.shadows.accumulation_resolution,
        );

        let mut globals = GlobalUniform::default();
        globals.shadow_params = [
            1.0,
            shadows.catcher_half_extent(),
            shadows.catcher_height(),
            settings.opacity,
        ];
        let [r, g, b] = settings.tint().map(srgb_to_linear);
        globals.shadow_tint = [r, g, b, 1.0];
        let global_ubo = GlobalUBO::new_with_data(&device, &globals);
        let global_bindings = GlobalBindings::new(&device, &global_ubo);

        let object_bindings = ObjectBindings::new(&device);
        let material_bindings = MaterialBindings::new(&device);

        let white = TextureResource::create_white(&device, &queue);
        let floor = load_floor_texture(&device, &queue, studio.floor_texture.as_deref());
        let primitives = scene
            .primitives()
            .iter()
            .map(|primitive| {
                let (texture, textured) = match (&primitive.material.texture, &floor) {
                    (SurfaceTexture::Floor { .. }, Some(floor)) => (floor, true),
                    _ => (&white, false),
                };
                GpuPrimitive::new(
                    &device,
                    primitive,
                    &object_bindings,
                    &material_bindings,
                    texture,
                    textured,
                )
            })
            .collect::<Vec<_>>();
        log::info!("Uploaded {} scene primitives", primitives.len());

        let device_handle: Arc<Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("pbr", include_str!("pbr.wgsl"));
        pipeline_manager.load_shader("shadow", include_str!("shadow_pass.wgsl"));
        pipeline_manager.load_shader("accumulate", include_str!("shadow_accumulate.wgsl"));
        pipeline_manager.load_shader("grid", include_str!("grid.wgsl"));

        // no culling so single-sided geometry still occludes
        pipeline_manager.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_vertex_only()
                .with_depth()
                .with_depth_bias(2, 2.0)
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![
                    shadows.light_layout().clone(),
                    object_bindings.layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            ACCUMULATE_PIPELINE,
            PipelineConfig::default()
                .with_label("ACCUMULATE")
                .with_shader("accumulate")
                .with_no_vertex_buffers()
                .with_cull_mode(None)
                .with_color_target(ACCUMULATION_FORMAT, Some(accumulate_blend()))
                .with_bind_group_layouts(vec![
                    shadows.light_layout().clone(),
                    shadows.shadow_map_layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            PBR_PIPELINE,
            PipelineConfig::default()
                .with_label("PBR")
                .with_shader("pbr")
                .with_depth()
                .with_color_target(format, Some(wgpu::BlendState::REPLACE))
                .with_bind_group_layouts(vec![
                    global_bindings.layout().clone(),
                    object_bindings.layout().clone(),
                    material_bindings.layout().clone(),
                    shadows.receiver_layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            GRID_PIPELINE,
            PipelineConfig::default()
                .with_label("GRID")
                .with_shader("grid")
                .with_no_vertex_buffers()
                .with_cull_mode(None)
                .with_depth_read_only(wgpu::CompareFunction::LessEqual)
                .with_color_target(format, Some(wgpu::BlendState::ALPHA_BLENDING))
                .with_bind_group_layouts(vec![global_bindings.layout().clone()]),
        );

        pipeline_manager
            .create_all_pipelines()
            .map_err(|errors| anyhow!("Pipeline creation failed: {}", errors.join("; ")))?;

        let camera = OrbitCamera::looking_at(
            camera_eye,
            Vector3::new(0.0, 0.0, 0.0),
            config.width as f32 / config.height as f32,
        );

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            depth_texture,
            format,
            pipeline_manager,
            globals,
            global_ubo,
            global_bindings,
            shadows,
            primitives,
            background: wgpu::Color::BLACK,
            camera,
        })
    }

    /// Renders one frame, with `ui_callback` drawing on top of the scene
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render_frame<F>(&mut self, ui_callback: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return;
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.camera.update_view_proj();
        self.globals.set_camera(&self.camera.uniform);
        self.global_ubo.update_content(&self.queue, self.globals);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // PASS 1: key light shadow map
        if self.shadows_enabled() && self.globals.to_light[3] > 0.5 {
            self.shadows
                .encode_key_shadow(&mut encoder, &self.pipeline_manager, &self.primitives);
        }

        // PASS 2: soft shadow accumulation
        if self.shadows.has_pending_step() {
            self.shadows.encode_accumulation(
                &mut encoder,
                &self.queue,
                &self.pipeline_manager,
                &self.primitives,
            );
        }

        // PASS 3: scene and grid
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
            render_pass.set_bind_group(3, self.shadows.receiver_bind_group(), &[]);

            if let Some(pipeline) = self.pipeline_manager.pipeline(PBR_PIPELINE) {
                render_pass.set_pipeline(pipeline);
                for primitive in &self.primitives {
                    render_pass.set_bind_group(2, primitive.material_bind_group(), &[]);
                    render_pass.draw_primitive(primitive, 1);
                }
            }

            if self.grid_visible() {
                if let Some(pipeline) = self.pipeline_manager.pipeline(GRID_PIPELINE) {
                    render_pass.set_pipeline(pipeline);
                    render_pass.draw(0..6, 0..1);
                }
            }
        }

        // PASS 4: UI overlay
        ui_callback(
            &self.device,
            &self.queue,
            &mut encoder,
            &surface_texture_view,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Resizes the surface and depth buffer; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
        self.camera.resize_projection(width, height);
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn grid_visible(&self) -> bool {
        self.globals.grid[0] > 0.5
    }

    pub fn shadows_enabled(&self) -> bool {
        self.globals.shadow_params[0] > 0.5
    }

    /// Projects a world point to window pixels, for screen-space overlays
    pub fn project(&self, world: Vector3<f32>) -> Option<[f32; 2]> {
        self.camera
            .project(world, self.config.width as f32, self.config.height as f32)
    }
}

impl SceneSink for RenderEngine {
    fn apply(&mut self, diff: &SceneDiff) {
        if let Some(light) = &diff.light {
            let position = Vector3::from(light.position);
            let [dx, dy, dz] = light.direction;
            self.globals.to_light = [-dx, -dy, -dz, flag(light.casts_shadow)];
            let [r, g, b] = light.color.map(srgb_to_linear);
            self.globals.light_color = [r, g, b, light.intensity];
            self.globals.light_view_proj = light_view_proj(position).into();
            self.shadows.set_key_light(&self.queue, position);
        }
        if let Some(ambient) = &diff.ambient {
            let [r, g, b] = ambient.color.map(srgb_to_linear);
            self.globals.ambient = [r, g, b, ambient.intensity];
        }
        if let Some([r, g, b]) = diff.background {
            self.background = wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            };
        }
        if let Some(visible) = diff.grid_visible {
            self.globals.grid[0] = flag(visible);
        }
        if let Some(enabled) = diff.shadows_enabled {
            self.globals.shadow_params[0] = flag(enabled);
        }

        for (id, transform) in &diff.transforms {
            if let Some(primitive) = self.primitives.get_mut(*id) {
                primitive.set_transform(*transform);
                primitive.upload(&self.queue);
            }
        }
        for (id, flags) in &diff.shadow_flags {
            if let Some(primitive) = self.primitives.get_mut(*id) {
                primitive.set_shadow_flags(flags.cast, flags.receive);
                primitive.upload(&self.queue);
            }
        }

        self.global_ubo.update_content(&self.queue, self.globals);
    }

    fn accumulate_shadows(&mut self, step: &AccumulationStep) {
        self.shadows.queue_step(step);
    }

    fn set_camera_eye(&mut self, eye: Vector3<f32>) {
        self.camera.set_eye(eye);
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

/// The configured floor image, or the built-in pattern when none is set
///
/// A configured image that fails to load leaves the floor untextured.
fn load_floor_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: Option<&Path>,
) -> Option<TextureResource> {
    let image = match path {
        None => procedural_floor(FLOOR_TEXTURE_SIZE),
        Some(path) => match load_rgba_image(path) {
            Ok(image) => {
                log::info!("Loaded floor texture {}", path.display());
                image
            }
            Err(e) => {
                log::warn!("{}; the floor will render untextured", e);
                return None;
            }
        },
    };

    Some(TextureResource::create_from_image(
        device,
        queue,
        &image,
        "Floor Texture",
        wgpu::AddressMode::Repeat,
    ))
}
