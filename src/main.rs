mod camera;
mod config;
mod context;
mod error;
mod frame;
mod model;
mod resources;
mod shader;
mod transform;

use anyhow::Context;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use camera::Camera;
use config::Config;
use context::RenderContext;
use frame::{FrameState, FrameUniforms};
use model::{GpuMesh, PositionVertex, Vertex};
use resources::Assets;
use shader::ShaderProgram;

struct Application {
    // Field order is drop order: everything created from the surface's
    // device goes first, the window last.
    frame_uniforms: FrameUniforms,
    mesh: GpuMesh,
    program: ShaderProgram,
    ctx: RenderContext,
    window: Window,
    camera: Camera,
    state: FrameState,
    failure: Option<wgpu::SurfaceError>,
}

impl Application {
    async fn new(window: Window, assets: Assets) -> anyhow::Result<Application> {
        let ctx = RenderContext::new(&window)
            .await
            .context("Failed to create graphics context")?;

        let program = ShaderProgram::new(
            &ctx.device,
            ctx.config.format,
            &[PositionVertex::desc()],
            &assets.vertex_shader,
            &assets.fragment_shader,
        )
        .await?;

        let mesh = GpuMesh::upload(&ctx.device, &assets.mesh);
        let frame_uniforms = FrameUniforms::new(&ctx.device, &program);

        Ok(Application {
            frame_uniforms,
            mesh,
            program,
            ctx,
            window,
            camera: Camera::default(),
            state: FrameState::Running,
            failure: None,
        })
    }

    fn run(mut self, event_loop: EventLoop<()>) -> anyhow::Result<()> {
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run(|event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        log::debug!("close requested");
                        self.state = self.state.close();
                    }
                    WindowEvent::RedrawRequested if self.state.is_running() => self.redraw(),
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if self.state.is_running() {
                    self.window.request_redraw();
                } else {
                    elwt.exit();
                }
            }
            _ => {}
        })?;

        match self.failure {
            Some(e) => Err(e).context("Rendering stopped"),
            None => Ok(()),
        }
    }

    fn redraw(&mut self) {
        match frame::render_frame(
            &self.ctx,
            &self.program,
            &self.mesh,
            &self.frame_uniforms,
            &self.camera,
        ) {
            Ok(()) => {}
            // The viewport never follows the window, so the surface comes back at its original size
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.ctx.reconfigure(),
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                log::error!("surface out of memory, stopping");
                self.failure = Some(e);
                self.state = self.state.close();
            }
            Err(e) => log::warn!("skipping frame: {e:?}"),
        }
    }
}

/// Startup in dependency order. Assets are read before the window exists so
/// a bad shader or mesh file never gets as far as the GPU.
fn run() -> anyhow::Result<()> {
    let config = Config::default();
    let assets = Assets::load(&config)?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let window = WindowBuilder::new()
        .with_title(&config.window_title)
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window_width,
            config.window_height,
        ))
        .with_resizable(false)
        .build(&event_loop)
        .context("Failed to create window")?;

    let application = pollster::block_on(Application::new(window, assets))?;
    application.run(event_loop)
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        println!("{e:#}");
        std::process::exit(-1);
    }
}
