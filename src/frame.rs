use cgmath::SquareMatrix;
use wgpu::util::DeviceExt;

use crate::camera::{Camera, MatrixUniform};
use crate::context::RenderContext;
use crate::model::{DrawMesh, GpuMesh};
use crate::shader::{ShaderProgram, MATRIX_SIZE};
use crate::transform::{self, INSTANCE_COUNT};

/// The frame loop only knows two states: it runs until the window asks to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Running,
    Terminated,
}

impl FrameState {
    pub fn is_running(self) -> bool {
        self == FrameState::Running
    }

    /// Observe the window close signal.
    pub fn close(self) -> Self {
        FrameState::Terminated
    }
}

/// Distance between consecutive model matrices in the model buffer.
pub fn model_stride(min_uniform_alignment: u32) -> wgpu::BufferAddress {
    wgpu::util::align_to(MATRIX_SIZE, min_uniform_alignment as wgpu::BufferAddress)
}

/// Uniform buffers and bind groups the three matrices are uploaded through.
///
/// Every instance has its own slot in the model buffer so each draw reads
/// the model matrix written for it, selected with a dynamic offset.
pub struct FrameUniforms {
    view_buffer: wgpu::Buffer,
    projection_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_stride: wgpu::BufferAddress,
}

impl FrameUniforms {
    pub fn new(device: &wgpu::Device, program: &ShaderProgram) -> Self {
        let identity = MatrixUniform::from(cgmath::Matrix4::identity());

        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("View Buffer"),
            contents: bytemuck::bytes_of(&identity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let projection_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Projection Buffer"),
            contents: bytemuck::bytes_of(&identity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &program.camera_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: program.slots.view.binding,
                    resource: view_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: program.slots.projection.binding,
                    resource: projection_buffer.as_entire_binding(),
                },
            ],
        });

        let model_stride = model_stride(device.limits().min_uniform_buffer_offset_alignment);
        let model_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Buffer"),
            size: model_stride * INSTANCE_COUNT as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let model_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model_bind_group"),
            layout: &program.model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: program.slots.model.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &model_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(MATRIX_SIZE),
                }),
            }],
        });

        Self {
            view_buffer,
            projection_buffer,
            camera_bind_group,
            model_buffer,
            model_bind_group,
            model_stride,
        }
    }

    pub fn write_camera(&self, queue: &wgpu::Queue, camera: &Camera) {
        let view = MatrixUniform::from(camera.build_view_matrix());
        let projection = MatrixUniform::from(camera.build_projection_matrix());
        queue.write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(&view));
        queue.write_buffer(&self.projection_buffer, 0, bytemuck::bytes_of(&projection));
    }

    pub fn write_model(&self, queue: &wgpu::Queue, instance: usize, model: cgmath::Matrix4<f32>) {
        let model = MatrixUniform::from(model);
        queue.write_buffer(
            &self.model_buffer,
            self.model_offset(instance) as wgpu::BufferAddress,
            bytemuck::bytes_of(&model),
        );
    }

    pub fn model_offset(&self, instance: usize) -> wgpu::DynamicOffset {
        (self.model_stride * instance as wgpu::BufferAddress) as wgpu::DynamicOffset
    }
}

/// Records, submits and presents one frame.
pub fn render_frame(
    ctx: &RenderContext,
    program: &ShaderProgram,
    mesh: &GpuMesh,
    uniforms: &FrameUniforms,
    camera: &Camera,
) -> Result<(), wgpu::SurfaceError> {
    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let time = ctx.elapsed_secs();
    uniforms.write_camera(&ctx.queue, camera);

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&program.pipeline);
        render_pass.set_bind_group(program.slots.camera_group(), &uniforms.camera_bind_group, &[]);

        for (instance, model) in transform::instance_models(time).into_iter().enumerate() {
            uniforms.write_model(&ctx.queue, instance, model);
            render_pass.set_bind_group(
                program.slots.model_group(),
                &uniforms.model_bind_group,
                &[uniforms.model_offset(instance)],
            );
            render_pass.draw_mesh(mesh);
        }
    }

    ctx.queue.submit(std::iter::once(encoder.finish()));
    output.present();

    Ok(())
}
