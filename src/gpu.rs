//! # GPU Management Module
//!
//! The `gpu` module sets up and owns the `wgpu` objects every frame needs: the surface tied to
//! the window (or the page's canvas on the web), the device, its queue, and the surface
//! configuration.
//!
//! ## Overview
//!
//! [`Gpu::new_async`] walks the usual initialization chain (instance, surface, adapter,
//! device) and configures the surface with a non-sRGB format, which the `egui` overlay expects.
//! Each step that can fail reports an [`ArError::Gpu`] instead of panicking, so the application
//! shell can log the problem and keep its event loop alive.
//!
//! ## Platform Notes
//!
//! - **Desktop**: default limits, resolved against the adapter.
//! - **WebGPU**: same as desktop.
//! - **WebGL**: downlevel WebGL2 limits. The WebGL2 context created here on the page's canvas is
//!   the one the immersive session's base layer is created from.
//!
//! ## Example Usage
//!
//! ```ignore
//! let gpu = Gpu::new_async(window, width, height).await?;
//! let depth_view = gpu.create_depth_texture(width, height);
//! ```

use crate::error::{ArError, Result};

/// The GPU resources and surface configuration used for rendering.
///
/// # Fields
/// - `surface`: The presentation target tied to the window or canvas.
/// - `device`: Creates buffers, textures and pipelines.
/// - `queue`: Receives buffer writes and command buffers.
/// - `surface_config`: The current size, format and present mode of `surface`.
/// - `surface_format`: The color format frames are rendered in.
pub struct Gpu {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
}

impl Gpu {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Width over height of the surface. A zero height is treated as one pixel.
    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    /// Reconfigures the surface for a new size. Zero-sized requests are ignored, since a
    /// surface cannot be configured with an empty extent.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to an empty surface ({width} x {height})");
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure();
    }

    /// Applies the current configuration again, e.g. after the surface was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Creates a depth texture matching the surface and returns a view of it. Empty sizes are
    /// clamped to one pixel.
    pub fn create_depth_texture(&self, width: u32, height: u32) -> wgpu::TextureView {
        self.device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: Self::DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Initializes the GPU for rendering into `window`.
    ///
    /// # Errors
    ///
    /// [`ArError::Gpu`] if no surface, adapter or device can be obtained, or if the surface
    /// reports no usable format.
    pub async fn new_async(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|error| ArError::Gpu(format!("failed to create surface: {error}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .ok_or_else(|| ArError::Gpu("no compatible adapter".to_string()))?;
        log::info!("Using adapter {:?}", adapter.get_info());

        let descriptor = wgpu::DeviceDescriptor {
            label: Some("AR Device"),
            required_features: wgpu::Features::empty(),
            required_limits: required_limits(&adapter),
            memory_hints: wgpu::MemoryHints::default(),
        };
        let (device, queue) = adapter
            .request_device(&descriptor, None)
            .await
            .map_err(|error| ArError::Gpu(format!("failed to request a device: {error}")))?;

        let capabilities = surface.get_capabilities(&adapter);
        let surface_format = surface_format(&capabilities)
            .ok_or_else(|| ArError::Gpu("surface reports no formats".to_string()))?;
        // Transparent clears let the camera feed show through on pass-through displays.
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|mode| capabilities.alpha_modes.contains(mode))
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: Vec::new(),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            surface_format,
        })
    }
}

/// Limits to request from `adapter`. The WebGL backend only guarantees the WebGL2 downlevel set.
fn required_limits(adapter: &wgpu::Adapter) -> wgpu::Limits {
    let base = if cfg!(all(target_arch = "wasm32", feature = "webgl")) {
        wgpu::Limits::downlevel_webgl2_defaults()
    } else {
        wgpu::Limits::default()
    };
    base.using_resolution(adapter.limits())
}

/// The first non-sRGB format, since `egui` paints in linear space, else whatever comes first.
fn surface_format(capabilities: &wgpu::SurfaceCapabilities) -> Option<wgpu::TextureFormat> {
    capabilities
        .formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| capabilities.formats.first().copied())
}
