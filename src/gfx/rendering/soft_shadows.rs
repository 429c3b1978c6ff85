//! GPU side of the shadow system
//!
//! Owns the key light shadow map sampled by the main pass, and the
//! accumulation target that collects soft contact shadows on the catcher.
//! Each planned [`AccumulationStep`] is encoded as one depth pass plus one
//! blend pass per jittered sample light. Sample lights get their own uniform
//! buffer because all passes of a frame share one submission.

use cgmath::Vector3;

use super::pipeline_manager::PipelineManager;
use crate::{
    gfx::{
        resources::{global_bindings::LightUniform, LightUBO, TextureResource},
        scene::{DrawMesh, GpuPrimitive},
    },
    studio::shadows::{AccumulationStep, ShadowSettings},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

pub const SHADOW_PIPELINE: &str = "Shadow";
pub const ACCUMULATE_PIPELINE: &str = "Accumulate";
/// Rgba16Float so that running-average weights far below 1/255 still register
pub const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// The accumulation step waiting for the next rendered frame
///
/// Frames can be skipped when the surface is lost, so several steps may be
/// queued before one is encoded. A frame-0 step clears the accumulation
/// target and must reach the GPU, so later frames never displace it.
#[derive(Debug, Default)]
pub struct PendingStep {
    step: Option<AccumulationStep>,
}

impl PendingStep {
    pub fn queue(&mut self, step: &AccumulationStep) {
        let restart_pending = matches!(&self.step, Some(pending) if pending.frame == 0);
        if restart_pending && step.frame > 0 {
            log::debug!("Keeping unrendered shadow restart over frame {}", step.frame);
            return;
        }
        self.step = Some(step.clone());
    }

    pub fn is_some(&self) -> bool {
        self.step.is_some()
    }

    pub fn take(&mut self) -> Option<AccumulationStep> {
        self.step.take()
    }
}

struct LightPass {
    ubo: LightUBO,
    bind_group: wgpu::BindGroup,
}

impl LightPass {
    fn new(device: &wgpu::Device, layout: &BindGroupLayoutWithDesc, label: &str) -> Self {
        let ubo = LightUBO::new(device);
        let bind_group = BindGroupBuilder::new(layout)
            .resource(ubo.binding_resource())
            .create(device, label);
        Self { ubo, bind_group }
    }
}

pub struct SoftShadows {
    catcher_half_extent: f32,
    catcher_height: f32,

    light_layout: BindGroupLayoutWithDesc,
    shadow_map_layout: BindGroupLayoutWithDesc,
    receiver_layout: BindGroupLayoutWithDesc,

    key_light: LightPass,
    key_shadow_map: TextureResource,

    sample_lights: Vec<LightPass>,
    sample_shadow_map: TextureResource,
    sample_map_bind_group: wgpu::BindGroup,
    accumulation: TextureResource,

    receiver_bind_group: wgpu::BindGroup,
    pending: PendingStep,
}

impl SoftShadows {
    pub fn new(
        device: &wgpu::Device,
        settings: &ShadowSettings,
        map_size: u32,
        accumulation_resolution: u32,
    ) -> Self {
        let light_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Light Bind Group Layout");
        let shadow_map_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .create(device, "Shadow Map Bind Group Layout");
        let receiver_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Shadow Receiver Bind Group Layout");

        let key_light = LightPass::new(device, &light_layout, "Key Light Bind Group");
        let key_shadow_map = TextureResource::create_shadow_map(device, map_size, "Key Shadow Map");

        let sample_lights = (0..settings.samples)
            .map(|i| LightPass::new(device, &light_layout, &format!("Sample Light {i} Bind Group")))
            .collect();
        let sample_shadow_map = TextureResource::create_shadow_map(
            device,
            (map_size / 2).max(256),
            "Sample Shadow Map",
        );
        let sample_map_bind_group = BindGroupBuilder::new(&shadow_map_layout)
            .texture(&sample_shadow_map.view)
            .sampler(&sample_shadow_map.sampler)
            .create(device, "Sample Shadow Map Bind Group");

        let accumulation = TextureResource::create_render_target(
            device,
            accumulation_resolution,
            ACCUMULATION_FORMAT,
            "Shadow Accumulation",
        );

        let receiver_bind_group = BindGroupBuilder::new(&receiver_layout)
            .texture(&key_shadow_map.view)
            .sampler(&key_shadow_map.sampler)
            .texture(&accumulation.view)
            .sampler(&accumulation.sampler)
            .create(device, "Shadow Receiver Bind Group");

        log::info!(
            "Shadows: key map {}², {} samples/frame, accumulation {}²",
            map_size,
            settings.samples,
            accumulation_resolution
        );

        Self {
            catcher_half_extent: settings.catcher_scale * 0.5,
            catcher_height: settings.catcher_height,
            light_layout,
            shadow_map_layout,
            receiver_layout,
            key_light,
            key_shadow_map,
            sample_lights,
            sample_shadow_map,
            sample_map_bind_group,
            accumulation,
            receiver_bind_group,
            pending: PendingStep::default(),
        }
    }

    /// Group 0 of the depth and accumulation pipelines
    pub fn light_layout(&self) -> &wgpu::BindGroupLayout {
        &self.light_layout.layout
    }

    /// Group 1 of the accumulation pipeline
    pub fn shadow_map_layout(&self) -> &wgpu::BindGroupLayout {
        &self.shadow_map_layout.layout
    }

    /// Group 3 of the main pipeline
    pub fn receiver_layout(&self) -> &wgpu::BindGroupLayout {
        &self.receiver_layout.layout
    }

    pub fn receiver_bind_group(&self) -> &wgpu::BindGroup {
        &self.receiver_bind_group
    }

    pub fn catcher_half_extent(&self) -> f32 {
        self.catcher_half_extent
    }

    pub fn catcher_height(&self) -> f32 {
        self.catcher_height
    }

    pub fn set_key_light(&mut self, queue: &wgpu::Queue, position: Vector3<f32>) {
        let uniform = self.light_uniform(position);
        self.key_light.ubo.update_content(queue, uniform);
    }

    /// Queues a step for the next encoded frame, see [`PendingStep`]
    pub fn queue_step(&mut self, step: &AccumulationStep) {
        if step.sample_positions.len() > self.sample_lights.len() {
            log::warn!(
                "Accumulation step has {} samples, only {} will be rendered",
                step.sample_positions.len(),
                self.sample_lights.len()
            );
        }
        self.pending.queue(step);
    }

    pub fn has_pending_step(&self) -> bool {
        self.pending.is_some()
    }

    fn light_uniform(&self, position: Vector3<f32>) -> LightUniform {
        LightUniform::new(position, self.catcher_half_extent, self.catcher_height)
    }

    /// Renders casters into the key light shadow map
    pub fn encode_key_shadow(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipelines: &PipelineManager,
        primitives: &[GpuPrimitive],
    ) {
        encode_depth_pass(
            encoder,
            pipelines,
            &self.key_shadow_map.view,
            &self.key_light.bind_group,
            primitives,
            "Key Shadow Pass",
        );
    }

    /// Encodes the pending accumulation step, if any
    pub fn encode_accumulation(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        pipelines: &PipelineManager,
        primitives: &[GpuPrimitive],
    ) {
        let Some(step) = self.pending.take() else {
            return;
        };
        let Some(accumulate) = pipelines.pipeline(ACCUMULATE_PIPELINE) else {
            log::warn!("Accumulate pipeline missing, dropping shadow frame {}", step.frame);
            return;
        };

        for ((position, weight), light) in step
            .sample_positions
            .iter()
            .zip(&step.blend_weights)
            .zip(&mut self.sample_lights)
        {
            let uniform = LightUniform::new(
                Vector3::from(*position),
                self.catcher_half_extent,
                self.catcher_height,
            );
            light.ubo.update_content(queue, uniform);

            encode_depth_pass(
                encoder,
                pipelines,
                &self.sample_shadow_map.view,
                &light.bind_group,
                primitives,
                "Sample Shadow Pass",
            );

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Accumulate Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.accumulation.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let w = *weight as f64;
            pass.set_pipeline(accumulate);
            pass.set_blend_constant(wgpu::Color { r: w, g: w, b: w, a: w });
            pass.set_bind_group(0, &light.bind_group, &[]);
            pass.set_bind_group(1, &self.sample_map_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

/// Running-average blend: `src * constant + dst * (1 - constant)`
pub fn accumulate_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Constant,
        dst_factor: wgpu::BlendFactor::OneMinusConstant,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

fn encode_depth_pass(
    encoder: &mut wgpu::CommandEncoder,
    pipelines: &PipelineManager,
    target: &wgpu::TextureView,
    light_bind_group: &wgpu::BindGroup,
    primitives: &[GpuPrimitive],
    label: &str,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: target,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    });

    let Some(pipeline) = pipelines.pipeline(SHADOW_PIPELINE) else {
        return;
    };
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, light_bind_group, &[]);
    for primitive in primitives.iter().filter(|p| p.casts_shadow()) {
        pass.draw_primitive(primitive, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(frame: u32) -> AccumulationStep {
        AccumulationStep {
            frame,
            sample_positions: vec![[5.0, 5.0, 5.0]],
            blend_weights: vec![1.0 / (frame + 1) as f32],
        }
    }

    #[test]
    fn test_later_frame_replaces_pending_step() {
        let mut pending = PendingStep::default();
        pending.queue(&step(3));
        pending.queue(&step(4));
        assert_eq!(pending.take().map(|s| s.frame), Some(4));
        assert!(!pending.is_some());
    }

    #[test]
    fn test_skipped_restart_is_not_overwritten() {
        let mut pending = PendingStep::default();
        pending.queue(&step(0));
        // the frame holding the restart was never rendered
        pending.queue(&step(1));
        pending.queue(&step(2));

        let encoded = pending.take().unwrap();
        assert_eq!(encoded.frame, 0);
        assert_eq!(encoded.blend_weights[0], 1.0);
    }

    #[test]
    fn test_new_restart_replaces_pending_restart() {
        let mut pending = PendingStep::default();
        pending.queue(&step(5));
        pending.queue(&step(0));
        assert_eq!(pending.take().map(|s| s.frame), Some(0));
        assert!(pending.take().is_none());
    }
}
