use winit::window::Window;

use crate::error::ContextError;

/// The device-side state every draw goes through.
///
/// Built once per window and handed explicitly to whatever records or
/// submits work, together with the clock animation time is read from.
pub struct RenderContext {
    pub surface: wgpu::Surface,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    started: instant::Instant,
}

impl RenderContext {
    pub async fn new(window: &Window) -> Result<Self, ContextError> {
        // Instance - Handle to the GPU. Use this to get adapter and surface
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // --SAFETY--
        // The surface needs to live as long as the window that created it.
        // The application owns both and drops the context first.
        let surface = unsafe { instance.create_surface(window) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ContextError::NoAdapter)?;
        log::info!("using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("main device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders output linear colours, prefer an sRGB surface so they are encoded on write.
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(ContextError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::debug!("surface configured: {config:?}");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            started: instant::Instant::now(),
        })
    }

    /// Seconds since the context was created.
    pub fn elapsed_secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Configures the surface again at its original size.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}
