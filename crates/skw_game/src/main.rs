//! Tuxemon-town walkabout -- main loop and application entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. Simulation runs inside
//! `RedrawRequested` on a fixed timestep (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- one scene tick per fixed slice: arrow keys go
//!      through the motion resolver, the player moves through the collision
//!      grid, the animator and camera follow
//!   3. Rebuild the sprite mesh (tile layers, player, debug graphic) in depth order
//!   4. Upload camera uniform, issue draw calls, composite egui overlay

mod animation;
mod atlas;
mod collision;
mod config;
mod debug_graphic;
mod mesh;
mod player;
#[cfg(test)]
mod replay;
mod scene;
mod tilemap;
mod world;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec2;
use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use config::{load_game_config_or_default, GameConfig};
use mesh::{count_texture_binds, depth_order, DrawCall, SceneMesh};
use skw_core::input::{InputState, Key};
use skw_core::time::TimeState;
use skw_devtools::{DebugOverlay, OverlayStats, PlayerStats};
use skw_render::{Camera2D, CameraBounds, GpuContext, SpritePipeline, SpriteVertex, Texture};
use world::SceneWorld;

const DEFAULT_CONFIG_PATH: &str = "assets/game.json";
const TILES_TEXTURE: &str = "tiles";
const ATLAS_TEXTURE: &str = "atlas";
const WHITE_TEXTURE: &str = "__white";

struct GpuSpriteTexture {
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Clone, Copy)]
enum RenderItem {
    /// Index into the scene's layer list.
    Layer(usize),
    Player,
    CollisionDebug,
}

/// All mutable engine state lives here. Constructed lazily in
/// `ApplicationHandler::resumed` once the window and GPU surface exist.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    debug_overlay: DebugOverlay,
    world: SceneWorld,
    clear_color: wgpu::Color,
    paused: bool,
    single_step_requested: bool,
    mesh_dirty: bool,
    textures: HashMap<Arc<str>, GpuSpriteTexture>,
    tiles_key: Arc<str>,
    atlas_key: Arc<str>,
    white_key: Arc<str>,

    // The mesh is rebuilt on the CPU, then streamed into these buffers.
    // Buffers grow (power-of-two) but never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    draw_calls: Vec<DrawCall>,
    quad_count: u32,
    tile_count: u32,
}

impl EngineState {
    fn new(window: Arc<Window>, config: &GameConfig) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone())?;
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        log::info!("Physics backend: {:?}", config.physics);
        let world = SceneWorld::load(Path::new(&config.scene))?;
        let clear_color = clear_color_from_rgb(config.background_rgb()?);

        let mut camera = Camera2D::new(gpu.size.0, gpu.size.1);
        camera.zoom = world.scene.camera.zoom;
        if world.scene.camera.clamp_to_map {
            let map_size = world.map_size_px();
            camera.bounds = Some(CameraBounds {
                x: 0.0,
                y: 0.0,
                width: map_size.x,
                height: map_size.y,
            });
        }

        let camera_uniform = camera.build_uniform();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let mut state = Self {
            window,
            gpu,
            time: TimeState::new(),
            input: InputState::new(),
            camera,
            sprite_pipeline,
            debug_overlay,
            world,
            clear_color,
            paused: false,
            single_step_requested: false,
            mesh_dirty: true,
            textures: HashMap::new(),
            tiles_key: Arc::from(TILES_TEXTURE),
            atlas_key: Arc::from(ATLAS_TEXTURE),
            white_key: Arc::from(WHITE_TEXTURE),
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            draw_calls: Vec::new(),
            quad_count: 0,
            tile_count: 0,
        };

        // Textures before the first mesh: UVs need the uploaded atlas size.
        state.load_textures();
        state.follow_player();
        state.ensure_mesh_capacity(4, 6);
        state.rebuild_scene_mesh();
        Ok(state)
    }

    fn load_textures(&mut self) {
        let tileset_image = self.world.scene.assets.tileset_image.clone();
        let tiles = load_texture_asset(
            &self.gpu.device,
            &self.gpu.queue,
            &self.sprite_pipeline,
            &tileset_image,
        );
        if let Some(tileset) = self.world.map.tileset_by_name(&self.world.scene.tileset_name) {
            if tiles.texture.size != (tileset.image_width, tileset.image_height) {
                log::warn!(
                    "Tileset image '{}' is {}x{} but the map declares '{}' as {}x{}",
                    tileset_image,
                    tiles.texture.size.0,
                    tiles.texture.size.1,
                    tileset.image,
                    tileset.image_width,
                    tileset.image_height
                );
            }
        }
        self.textures.insert(Arc::clone(&self.tiles_key), tiles);

        let atlas = load_texture_asset(
            &self.gpu.device,
            &self.gpu.queue,
            &self.sprite_pipeline,
            &self.world.atlas.texture_path,
        );
        if let Some(declared) = self.world.atlas.declared_size {
            if declared != atlas.texture.size {
                log::warn!(
                    "Atlas image '{}' is {}x{} but its metadata declares {}x{}",
                    self.world.atlas.texture_path,
                    atlas.texture.size.0,
                    atlas.texture.size.1,
                    declared.0,
                    declared.1
                );
            }
        }
        self.textures.insert(Arc::clone(&self.atlas_key), atlas);

        let texture = Texture::from_rgba8(
            &self.gpu.device,
            &self.gpu.queue,
            &[255, 255, 255, 255],
            1,
            1,
            "debug_white",
        );
        let bind_group = self
            .sprite_pipeline
            .create_texture_bind_group(&self.gpu.device, &texture);
        self.textures.insert(
            Arc::clone(&self.white_key),
            GpuSpriteTexture {
                texture,
                bind_group,
            },
        );
        log::info!("Loaded {} textures", self.textures.len());
    }

    fn follow_player(&mut self) {
        let target = if self.world.scene.camera.follow_player {
            self.world.player.position()
        } else {
            self.camera.position
        };
        self.camera.follow(target);
    }

    fn rebuild_scene_mesh(&mut self) {
        let mesh = self.build_mesh();
        self.ensure_mesh_capacity(mesh.vertices.len(), mesh.indices.len());
        self.quad_count = mesh.quad_count;
        self.tile_count = mesh.tile_count;

        if !mesh.vertices.is_empty() {
            self.gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&mesh.vertices),
            );
        }
        if !mesh.indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.draw_calls = mesh.draw_calls;
        self.mesh_dirty = false;
    }

    fn build_mesh(&self) -> SceneMesh {
        let world = &self.world;
        let mut mesh = SceneMesh::with_capacity(512);

        let mut items = Vec::with_capacity(world.scene.layers.len() + 2);
        let mut depths = Vec::with_capacity(world.scene.layers.len() + 2);
        for (i, layer) in world.scene.layers.iter().enumerate() {
            items.push(RenderItem::Layer(i));
            depths.push(layer.depth);
        }
        items.push(RenderItem::Player);
        depths.push(world.scene.player.depth);
        if world.collision_debug {
            items.push(RenderItem::CollisionDebug);
            depths.push(world.scene.debug_graphic.depth);
        }

        let view = self.camera.visible_rect();
        let tile_size = Vec2::new(world.map.tile_width as f32, world.map.tile_height as f32);
        let tileset = world.map.tileset_by_name(&world.scene.tileset_name);

        for idx in depth_order(&depths) {
            match items[idx] {
                RenderItem::Layer(i) => {
                    let name = &world.scene.layers[i].name;
                    if let (Some(layer), Some(tileset)) = (world.map.tile_layer(name), tileset) {
                        mesh.push_tile_layer(&self.tiles_key, layer, tileset, tile_size, view);
                    }
                }
                RenderItem::Player => self.push_player(&mut mesh),
                RenderItem::CollisionDebug => {
                    mesh.push_debug_rects(&self.white_key, &world.debug_rects());
                }
            }
        }

        mesh
    }

    fn push_player(&self, mesh: &mut SceneMesh) {
        let player = &self.world.player;
        let frame_name = player.animator.current_frame();
        let Some(frame) = self.world.atlas.frame(frame_name) else {
            log::warn!("Player frame '{}' is not in the atlas", frame_name);
            return;
        };
        let atlas_size = self
            .textures
            .get(&self.atlas_key)
            .map(|t| t.texture.size)
            .or(self.world.atlas.declared_size)
            .unwrap_or((1, 1));

        let (min, max) = frame.placed_rect(player.position());
        mesh.push_quad(
            &self.atlas_key,
            SpriteVertex::quad(min.into(), max.into(), frame.uv(atlas_size), [1.0; 4]),
        );
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn overlay_stats(&self) -> OverlayStats {
        let player = &self.world.player;
        let center = player.position();
        OverlayStats {
            draw_calls: self.draw_calls.len() as u32,
            texture_binds: count_texture_binds(&self.draw_calls) as u32,
            sprite_count: self.quad_count,
            tile_count: self.tile_count,
            player: Some(PlayerStats {
                position: (center.x, center.y),
                velocity: (player.velocity.x, player.velocity.y),
                facing: player
                    .facing
                    .map_or_else(|| "-".to_string(), |f| f.to_string()),
                animation: player
                    .animator
                    .current_clip()
                    .unwrap_or_else(|| player.animator.current_frame())
                    .to_string(),
            }),
            collision_debug: self.world.collision_debug,
            paused: self.paused,
        }
    }
}

struct App {
    config: GameConfig,
    state: Option<EngineState>,
    startup_failed: bool,
}

impl App {
    fn new(config: GameConfig) -> Self {
        Self {
            config,
            state: None,
            startup_failed: false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let started = skw_platform::create_window(event_loop, &self.config.platform_config())
            .and_then(|window| EngineState::new(window, &self.config));
        match started {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {err}");
                self.startup_failed = true;
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    state.follow_player();
                    state.mesh_dirty = true;
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                // Key-up events for keys held while unfocused never arrive.
                state.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                // Fixed-step simulation phase.
                state.time.begin_frame();
                let dt = state.time.fixed_dt as f32;
                let dt_us = state.time.fixed_dt_us();

                while state.time.should_step() {
                    if state.paused && !state.single_step_requested {
                        break;
                    }
                    state.single_step_requested = false;

                    state.world.tick(state.input.directional(), dt, dt_us);
                    state.follow_player();
                    state.mesh_dirty = true;
                }

                let keys = frame_keys(&state.input, state.time.steps_this_frame);
                if keys.exit {
                    event_loop.exit();
                    return;
                }
                if keys.toggle_overlay {
                    state.debug_overlay.toggle();
                }
                if keys.enable_collision_debug && !state.world.collision_debug {
                    state.world.enable_collision_debug();
                    state.mesh_dirty = true;
                }

                if state.mesh_dirty {
                    state.rebuild_scene_mesh();
                }

                // Render phase reads finalized simulation state from this frame.
                let camera_uniform = state.camera.build_uniform();
                state.gpu.queue.write_buffer(
                    &state.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[camera_uniform]),
                );

                let Some((output, view)) = state.gpu.begin_frame() else {
                    return;
                };

                let stats = state.overlay_stats();
                let (egui_primitives, egui_textures_delta, overlay_actions) =
                    state
                        .debug_overlay
                        .prepare(&state.window, &state.time, &stats);

                if overlay_actions.toggle_pause {
                    state.paused = !state.paused;
                    log::info!(
                        "Simulation {}",
                        if state.paused { "PAUSED" } else { "RESUMED" }
                    );
                }
                if overlay_actions.single_step {
                    state.single_step_requested = true;
                }
                if overlay_actions.show_collision_debug {
                    state.world.enable_collision_debug();
                    state.mesh_dirty = true;
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                {
                    let mut last_bound_texture_key: Option<&Arc<str>> = None;
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Scene Render Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(state.clear_color),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    });

                    render_pass.set_pipeline(&state.sprite_pipeline.render_pipeline);
                    render_pass.set_bind_group(0, &state.camera_bind_group, &[]);
                    render_pass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(state.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                    for draw in &state.draw_calls {
                        if let Some(texture) = state.textures.get(&draw.texture_key) {
                            let need_rebind = match last_bound_texture_key {
                                Some(last) => **last != *draw.texture_key,
                                None => true,
                            };
                            if need_rebind {
                                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                                last_bound_texture_key = Some(&draw.texture_key);
                            }
                            render_pass.draw_indexed(
                                draw.index_start..(draw.index_start + draw.index_count),
                                0,
                                0..1,
                            );
                        }
                    }
                }

                state.debug_overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
                    &mut encoder,
                    &egui_primitives,
                    &egui_textures_delta,
                    &screen_descriptor,
                );

                {
                    let mut egui_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();

                    state
                        .debug_overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.debug_overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                // Only clear edge-triggered input after at least one fixed step
                // consumed it, so a press on a zero-step frame is not lost.
                if state.time.steps_this_frame > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Upload an image from disk, or a magenta placeholder if it cannot be read
/// or decoded.
fn load_texture_asset(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &SpritePipeline,
    asset_path: &str,
) -> GpuSpriteTexture {
    let loaded = std::fs::read(asset_path)
        .map_err(|e| format!("Failed to read texture '{}': {e}", asset_path))
        .and_then(|bytes| Texture::from_bytes(device, queue, &bytes, asset_path));
    let texture = match loaded {
        Ok(texture) => {
            log::info!(
                "Loaded texture '{}' ({}x{})",
                asset_path,
                texture.size.0,
                texture.size.1
            );
            texture
        }
        Err(err) => {
            log::warn!("{err}. Falling back to placeholder.");
            Texture::from_rgba8(device, queue, &[255, 0, 255, 255], 1, 1, asset_path)
        }
    };
    let bind_group = pipeline.create_texture_bind_group(device, &texture);
    GpuSpriteTexture {
        texture,
        bind_group,
    }
}

/// The surface is sRGB, so the configured colour is converted to linear.
fn clear_color_from_rgb(rgb: [u8; 3]) -> wgpu::Color {
    let linear = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    wgpu::Color {
        r: linear(rgb[0]),
        g: linear(rgb[1]),
        b: linear(rgb[2]),
        a: 1.0,
    }
}

/// Edge-triggered actions for one rendered frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FrameKeys {
    exit: bool,
    toggle_overlay: bool,
    enable_collision_debug: bool,
}

/// Read edge keys at most once per frame, and only on frames whose steps
/// will let `end_frame` clear them.
fn frame_keys(input: &InputState, steps_this_frame: u32) -> FrameKeys {
    if steps_this_frame == 0 {
        return FrameKeys::default();
    }
    FrameKeys {
        exit: input.is_just_pressed(Key::Escape),
        toggle_overlay: input.is_just_pressed(Key::F3),
        enable_collision_debug: input.is_just_pressed(Key::D),
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = match load_game_config_or_default(&config_path) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    log::info!("{} starting...", config.title);

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
    if app.startup_failed {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_clears_to_white() {
        let color = clear_color_from_rgb([255, 255, 255]);
        assert!((color.r - 1.0).abs() < 1e-9);
        assert!((color.g - 1.0).abs() < 1e-9);
        assert!((color.b - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mid_grey_is_linearised() {
        let color = clear_color_from_rgb([128, 0, 0]);
        assert!((color.r - 0.2158).abs() < 1e-3);
        assert_eq!(color.g, 0.0);
    }

    #[test]
    fn only_scene_keys_are_mapped() {
        assert_eq!(map_key(KeyCode::ArrowLeft), Some(Key::Left));
        assert_eq!(map_key(KeyCode::KeyD), Some(Key::D));
        assert_eq!(map_key(KeyCode::KeyW), None);
        assert_eq!(map_key(KeyCode::Space), None);
    }

    #[test]
    fn f3_toggles_once_on_a_multi_step_frame() {
        let mut input = InputState::new();
        input.key_down(Key::F3);

        let mut time = TimeState::new();
        time.advance(time.fixed_dt * 2.5);
        while time.should_step() {}
        assert_eq!(time.steps_this_frame, 2);

        let mut overlay_visible = false;
        let keys = frame_keys(&input, time.steps_this_frame);
        if keys.toggle_overlay {
            overlay_visible = !overlay_visible;
        }
        input.end_frame();
        assert!(overlay_visible);

        // Still held next frame: no new edge.
        time.advance(time.fixed_dt);
        while time.should_step() {}
        assert!(!frame_keys(&input, time.steps_this_frame).toggle_overlay);
    }

    #[test]
    fn edge_keys_wait_for_a_stepping_frame() {
        let mut input = InputState::new();
        input.key_down(Key::D);
        input.key_down(Key::Escape);
        assert_eq!(frame_keys(&input, 0), FrameKeys::default());

        let keys = frame_keys(&input, 1);
        assert!(keys.enable_collision_debug);
        assert!(keys.exit);
        assert!(!keys.toggle_overlay);
    }
}
