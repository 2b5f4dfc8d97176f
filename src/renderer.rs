//! # `renderer.rs` - Renderer Module
//!
//! The renderer draws the scene graph and the `egui` overlay into the window surface.
//!
//! ## Key Features
//!
//! - **Scene Graph Drawing**: every visible mesh node of the [`Scene`] is drawn with its own
//!   model-view-projection uniform, computed from the node's world matrix and the camera node.
//! - **Lazy GPU Meshes**: vertex, index and uniform buffers are created the first time a node is
//!   drawn and dropped once the node leaves the scene.
//! - **Depth Buffering**: a `Depth32Float` depth texture, recreated on resize.
//! - **GUI Rendering**: an `egui_wgpu::Renderer` paints the GUI frame queued by the application
//!   shell on top of the scene, in the same render pass.
//!
//! ## Rendering Seam
//!
//! The controller only knows the [`SceneRenderer`] trait: "render this scene from this camera".
//! [`Renderer`] is the `wgpu` implementation; tests substitute a counting renderer.
//!
//! ## Usage
//!
//! ```ignore
//! let mut renderer = Renderer::new(window, width, height).await?;
//! renderer.queue_gui(gui_frame);
//! renderer.render(&scene, camera);
//! ```

use std::collections::HashMap;

use crate::error::Result;
use crate::gpu::Gpu;
use crate::scene::{DrawItem, NodeId, Scene};
use crate::uniform_binding::UniformBinding;
use crate::uniform_buffer::UniformBuffer;
use crate::vertex::{MeshData, Vertex};
use crate::SHADER_SOURCE;

/// Draws a scene as seen from a camera node.
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene, camera: NodeId);
}

/// Tessellated `egui` output waiting to be painted with the next scene render.
pub struct GuiFrame {
    pub screen_descriptor: egui_wgpu::ScreenDescriptor,
    pub paint_jobs: Vec<egui::epaint::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform: UniformBinding,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, item: &DrawItem) -> Self {
        let mesh = MeshData::from_geometry(&item.geometry);
        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );
        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        );
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            uniform: UniformBinding::new(device, layout),
        }
    }
}

pub struct Renderer {
    gpu: Gpu,
    depth_texture_view: wgpu::TextureView,
    egui_renderer: egui_wgpu::Renderer,
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    meshes: HashMap<NodeId, GpuMesh>,
    gui: Option<GuiFrame>,
}

impl Renderer {
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let gpu = Gpu::new_async(window, width, height).await?;
        let depth_texture_view = gpu.create_depth_texture(width, height);

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            Some(Gpu::DEPTH_FORMAT),
            1,
            false,
        );

        let uniform_layout = UniformBinding::create_layout(&gpu.device);
        let pipeline = Self::create_pipeline(&gpu.device, gpu.surface_format, &uniform_layout);

        Ok(Self {
            gpu,
            depth_texture_view,
            egui_renderer,
            pipeline,
            uniform_layout,
            meshes: HashMap::new(),
            gui: None,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.depth_texture_view = self.gpu.create_depth_texture(width, height);
    }

    /// Queues GUI output to be painted by the next [`SceneRenderer::render`] call. A frame that
    /// is never rendered is replaced by the next one; its texture updates are still applied.
    pub fn queue_gui(&mut self, gui: GuiFrame) {
        if let Some(stale) = self.gui.replace(gui) {
            self.apply_textures(&stale.textures_delta);
        }
    }

    fn apply_textures(&mut self, textures_delta: &egui::TexturesDelta) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(&self.gpu.device, &self.gpu.queue, *id, image_delta);
        }
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        uniform_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(SHADER_SOURCE)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vertex_main"),
                buffers: &[Vertex::description(&Vertex::vertex_attributes())],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // the reticle is seen from both sides
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Gpu::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: Some("fragment_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }

    /// Creates missing GPU meshes, uploads this frame's uniforms and releases meshes of nodes
    /// that left the scene.
    fn prepare_meshes(&mut self, scene: &Scene, items: &[DrawItem], view_projection: &nalgebra_glm::Mat4) {
        self.meshes.retain(|node, _| scene.contains(*node));
        for item in items {
            let mesh = self
                .meshes
                .entry(item.node)
                .or_insert_with(|| GpuMesh::new(&self.gpu.device, &self.uniform_layout, item));
            mesh.uniform.write(
                &self.gpu.queue,
                &UniformBuffer::new(view_projection * item.world, item.material.color),
            );
        }
    }
}

impl SceneRenderer for Renderer {
    fn render(&mut self, scene: &Scene, camera: NodeId) {
        let Some(view_projection) = scene.view_projection(camera, self.gpu.aspect_ratio()) else {
            log::error!("Render requested from {camera:?}, which is not a camera");
            return;
        };
        let items = scene.draw_items();
        self.prepare_meshes(scene, &items, &view_projection);

        let gui = self.gui.take();
        if let Some(gui) = gui.as_ref() {
            self.apply_textures(&gui.textures_delta);
        }

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(error) => {
                log::warn!("Skipping frame, surface unavailable: {error}");
                if matches!(error, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.gpu.reconfigure();
                }
                return;
            }
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if let Some(gui) = gui.as_ref() {
            self.egui_renderer.update_buffers(
                &self.gpu.device,
                &self.gpu.queue,
                &mut encoder,
                &gui.paint_jobs,
                &gui.screen_descriptor,
            );
        }

        let surface_texture_view =
            surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor {
                    label: wgpu::Label::default(),
                    aspect: wgpu::TextureAspect::default(),
                    format: Some(self.gpu.surface_format),
                    dimension: None,
                    base_mip_level: 0,
                    mip_level_count: None,
                    base_array_layer: 0,
                    array_layer_count: None,
                    usage: None,
                });

        encoder.insert_debug_marker("Render scene");

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 0.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for item in &items {
                let Some(mesh) = self.meshes.get(&item.node) else {
                    continue;
                };
                render_pass.set_bind_group(0, &mesh.uniform.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            if let Some(gui) = gui.as_ref() {
                self.egui_renderer.render(
                    &mut render_pass.forget_lifetime(),
                    &gui.paint_jobs,
                    &gui.screen_descriptor,
                );
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }
}
