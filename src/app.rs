use std::sync::Arc;

use cgmath::Vector2;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::assets::loader::ObjAssetLoader;
use crate::audio::{default_sink, MusicToggle};
use crate::clock::FrameClock;
use crate::config::DioramaConfig;
use crate::gfx::camera::{CameraController, OrbitCamera};
use crate::gfx::rendering::RenderEngine;
use crate::orchestrator::{SceneOrchestrator, SceneResources, Viewport};

pub struct DioramaApp {
    event_loop: EventLoop<()>,
    app_state: AppState,
}

struct AppState {
    config: DioramaConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    camera: OrbitCamera,
    controller: CameraController,
    loader: ObjAssetLoader,
    resources: SceneResources,
    orchestrator: SceneOrchestrator,
    clock: FrameClock,
    music: MusicToggle,
    scale_factor: f32,
}

impl DioramaApp {
    /// Creates the event loop and the scene state; the window opens on `run`
    pub fn new(config: DioramaConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()?;

        let (width, height) = config.window_size;
        let camera = OrbitCamera::from_settings(&config.camera, width as f32 / height.max(1) as f32);
        let controller = CameraController::new(0.005, 0.5);
        let resources = SceneResources::new(&config);
        let music = MusicToggle::new(config.music.clone(), default_sink());

        Ok(Self {
            event_loop,
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                camera,
                controller,
                loader: ObjAssetLoader::new(),
                resources,
                orchestrator: SceneOrchestrator::new(),
                clock: FrameClock::new(),
                music,
                scale_factor: 1.0,
            },
        })
    }

    /// Runs the event loop until the window closes
    pub fn run(self) -> anyhow::Result<()> {
        let DioramaApp {
            event_loop,
            mut app_state,
        } = self;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut app_state)?;
        Ok(())
    }
}

impl AppState {
    fn cursor_to_ndc(&self, position: PhysicalPosition<f64>) -> Option<Vector2<f32>> {
        let engine = self.render_engine.as_ref()?;
        let (width, height) = engine.get_surface_size();
        let x = (position.x as f32 / width as f32) * 2.0 - 1.0;
        let y = -((position.y as f32 / height as f32) * 2.0 - 1.0);
        Some(Vector2::new(x, y))
    }

    /// Forwards the current surface size to the scene
    fn update_viewport(&mut self) {
        let Some(engine) = self.render_engine.as_ref() else {
            return;
        };
        let (width, height) = engine.get_surface_size();
        self.resources.set_viewport(Viewport {
            width: width as f32,
            height: height as f32,
            pixel_ratio: self.scale_factor,
        });
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if self.controller.process_keyed_events(event, &mut self.camera) {
            self.resources.raycaster.on_camera_changed();
            return;
        }

        if event.state != ElementState::Pressed || event.repeat {
            return;
        }

        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
            PhysicalKey::Code(KeyCode::KeyM) => {
                let playing = self.music.toggle();
                log::info!("Music {}", if playing { "on" } else { "off" });
            }
            PhysicalKey::Code(KeyCode::KeyR) => {
                let Some(engine) = self.render_engine.as_mut() else {
                    return;
                };
                if self.resources.reset(&mut self.loader, engine) {
                    log::info!("Reloading scene");
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let attributes = WindowAttributes::default()
            .with_title(self.config.window_title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };
        self.scale_factor = window.scale_factor() as f32;

        let (width, height) = window.inner_size().into();
        let clear_color = self.config.clear_color;
        let window_clone = window.clone();
        let renderer = pollster::block_on(async move {
            RenderEngine::new(window_clone, width, height, clear_color).await
        });

        let mut renderer = match renderer {
            Ok(renderer) => renderer,
            Err(err) => {
                log::error!("Failed to initialise renderer: {}", err);
                event_loop.exit();
                return;
            }
        };

        self.camera.resize_projection(width, height);
        self.resources
            .load(self.config.source.clone(), &mut self.loader, &mut renderer);

        self.window = Some(window);
        self.render_engine = Some(renderer);
        self.update_viewport();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(ndc) = self.cursor_to_ndc(position) {
                    self.resources.raycaster.on_pointer_move(ndc);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor as f32;
                self.update_viewport();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(engine) = self.render_engine.as_mut() {
                    engine.resize(width, height);
                }
                self.camera.resize_projection(width, height);
                self.resources.raycaster.on_camera_changed();
                self.update_viewport();
            }
            WindowEvent::CloseRequested => {
                if let Some(engine) = self.render_engine.as_mut() {
                    self.resources.dispose(engine);
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(engine) = self.render_engine.as_mut() else {
                    return;
                };

                let frame = self.clock.tick();
                self.camera.update_view_proj();
                let report = self
                    .orchestrator
                    .tick(&mut self.resources, frame, &self.camera, engine);

                if report.hover_changed {
                    if let Some(window) = self.window.as_ref() {
                        let cursor = match report.hovered {
                            Some(_) => winit::window::CursorIcon::Pointer,
                            None => winit::window::CursorIcon::Default,
                        };
                        window.set_cursor(cursor);
                    }
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if self.window.is_none() {
            return;
        }

        if self.controller.process_events(&event, &mut self.camera) {
            self.resources.raycaster.on_camera_changed();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
