use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::sync::{mpsc, Arc};
use std::time;

use log::{debug, info, warn};
use nalgebra::{vector, Vector3};
use obj::{load_obj, Obj, TexturedVertex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};
use threadpool::ThreadPool;

use crate::error::RenderError;
use crate::scene::buffer::FrameBuffer;
use crate::scene::shader::Vertex;
use crate::scene::util::Color;
use crate::scene::{render_frame, render_mesh, FrameContext, FrameStats, Mesh};
use crate::system::{Camera, Lens, SolarSystem};

/// Number of background stars, scattered once at startup.
const STAR_COUNT: usize = 1000;
const BACKGROUND: Color = Color::BLACK;

/// Execution context of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub lens: Lens,
    pub print_fps: bool,
    pub asset_path: String,
    pub output_path: Option<String>, // Render a single frame into this png instead of opening a window.
    pub time: f32,                   // Time of the single frame, in seconds.
    pub threads: usize,              // 1 renders on the main thread.
    pub seed: Option<u64>,
}

/// Loads the triangles of an obj file as a flat vertex list, three vertices per face.
/// The file has to provide texture coordinates and normals.
pub fn load_mesh(path: &str) -> Result<Vec<Vertex>, Box<dyn Error>> {
    let model: Obj<TexturedVertex, u32> = load_obj(BufReader::new(File::open(path)?))?;
    info!("Number of vertices - {}", model.vertices.len());
    info!("Number of indices  - {}", model.indices.len());

    let mut vertices = Vec::with_capacity(model.indices.len());
    for &index in &model.indices {
        let vertex = model.vertices.get(index as usize).ok_or_else(|| RenderError::MalformedMesh {
            path: path.to_string(),
            index: index as usize,
        })?;
        vertices.push(Vertex::new(
            Vector3::from(vertex.position),
            Vector3::from(vertex.normal),
            Vector3::from(vertex.texture),
        ));
    }
    return Ok(vertices);
}

/// Owns the frame buffer and decides how the meshes of a frame are scheduled.
struct Renderer {
    buffer: Arc<FrameBuffer>,
    pool: Option<ThreadPool>,
    rng: StdRng,
}

impl Renderer {
    fn new(lens: &Lens, threads: usize, seed: Option<u64>) -> Renderer {
        let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let buffer = FrameBuffer::new(lens.width, lens.height, BACKGROUND).with_star_field(STAR_COUNT, &mut rng);
        let pool = if threads > 1 {
            Some(threadpool::Builder::new().num_threads(threads).thread_name("raster".to_string()).build())
        } else {
            None
        };
        return Renderer { buffer: Arc::new(buffer), pool, rng };
    }

    /// Clears the buffer and draws all meshes into it. Returns once every mesh is done.
    fn draw(&mut self, meshes: Vec<Mesh>, frame: FrameContext) -> FrameStats {
        self.buffer.clear();
        let Some(pool) = &self.pool else {
            return render_frame(&self.buffer, &meshes, &frame, &mut self.rng);
        };

        // One job per mesh, all writing into the same buffer.
        let (sender, receiver) = mpsc::channel();
        for mesh in meshes {
            let sender = sender.clone();
            let buffer = Arc::clone(&self.buffer);
            let seed: u64 = self.rng.gen();
            pool.execute(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                let result = render_mesh(&buffer, &mesh, &frame, &mut rng);
                // Can't fail, the receiver outlives the jobs.
                let _ = sender.send(result);
            });
        }
        drop(sender);

        let mut stats = FrameStats::default();
        for result in receiver {
            match result {
                Ok(mesh_stats) => stats += mesh_stats,
                Err(error) => {
                    warn!("Skipping mesh: {}", error);
                    stats.meshes_skipped += 1;
                }
            }
        }
        return stats;
    }

    fn render_data(&self) -> Vec<u8> {
        return self.buffer.to_rgb8();
    }
}

/// Light of the star, directed to us from the screen.
fn light_direction() -> Vector3<f32> {
    return vector![0.0, 0.0, 1.0];
}

/// Index of the body a number key focuses on.
fn focus_key(key: event::VirtualKeyCode) -> Option<usize> {
    return match key {
        event::VirtualKeyCode::Key1 => Some(0),
        event::VirtualKeyCode::Key2 => Some(1),
        event::VirtualKeyCode::Key3 => Some(2),
        event::VirtualKeyCode::Key4 => Some(3),
        event::VirtualKeyCode::Key5 => Some(4),
        event::VirtualKeyCode::Key6 => Some(5),
        _ => None,
    };
}

/// Applies a window event to the camera. Returns true on exit event - an Escape key release.
fn handle_event(window_event: event::WindowEvent, camera: &mut Camera) -> bool {
    match window_event {
        event::WindowEvent::KeyboardInput(event) => {
            let Some(key) = event.input.key_code else {
                return false;
            };
            if event.input.state.is_pressed() {
                match key {
                    event::VirtualKeyCode::Left => camera.translate(vector![-1.0, 0.0, 0.0]),
                    event::VirtualKeyCode::Right => camera.translate(vector![1.0, 0.0, 0.0]),
                    event::VirtualKeyCode::Up => camera.translate(vector![0.0, 1.0, 0.0]),
                    event::VirtualKeyCode::Down => camera.translate(vector![0.0, -1.0, 0.0]),
                    _ => {
                        if let Some(index) = focus_key(key) {
                            camera.focus_on(index);
                        }
                    }
                }
            } else if key == event::VirtualKeyCode::Escape {
                return true;
            } else if focus_key(key).is_some() {
                camera.release_focus();
            }
        }
        event::WindowEvent::MouseWheel(wheel) => {
            let delta = match wheel.delta {
                event::MouseScrollDelta::LineDelta(_, y) => y,
                event::MouseScrollDelta::PixelDelta(position) => position.y as f32,
            };
            camera.scroll(delta);
        }
        _ => (),
    }
    return false;
}

/// Renders a single frame at `params.time` and saves it as png.
fn render_to_file(params: &Params, output_path: &str, geometry: &Arc<Vec<Vertex>>) -> Result<(), Box<dyn Error>> {
    let system = SolarSystem::default();
    let camera = Camera::default();
    let mut renderer = Renderer::new(&params.lens, params.threads, params.seed);

    let uniforms = camera.uniforms(&system, &params.lens, params.time);
    let meshes = system.meshes(geometry, &uniforms, params.time);
    let frame = FrameContext { time: params.time, light_direction: light_direction() };
    let stats = renderer.draw(meshes, frame);
    info!("{:?}", stats);

    let image = image::RgbImage::from_raw(params.lens.width, params.lens.height, renderer.render_data())
        .ok_or("frame does not fit the image size")?;
    image.save(output_path)?;
    info!("Frame saved to {}", output_path);
    return Ok(());
}

/// Actualy launches the window, showing the rendered system.
/// Takes struct, defining execution context.
pub fn run(params: Params) -> Result<(), Box<dyn Error>> {
    let geometry = Arc::new(load_mesh(&params.asset_path)?);

    if let Some(output_path) = &params.output_path {
        return render_to_file(&params, output_path, &geometry);
    }

    let lens = params.lens;
    let system = SolarSystem::default();
    let mut camera = Camera::default();
    let mut renderer = Renderer::new(&lens, params.threads, params.seed);

    let window_options: WindowOptions = WindowOptions {
        size: Some([lens.width, lens.height]),
        ..Default::default()
    };
    let window = create_window("orrery", window_options)?;
    let event_channel = window.event_channel()?;

    let mut exit = false;
    let time_begin = time::Instant::now();
    let mut frame_counter_time_begin = time::Instant::now();
    let mut frame_counter: u32 = 0;
    while !exit {
        let time = time_begin.elapsed().as_secs_f32();

        let uniforms = camera.uniforms(&system, &lens, time);
        let meshes = system.meshes(&geometry, &uniforms, time);
        let stats = renderer.draw(meshes, FrameContext { time, light_direction: light_direction() });
        debug!("{:?}", stats);

        let render_data = renderer.render_data();
        let image_data = ImageView::new(ImageInfo::rgb8(lens.width, lens.height), &render_data);
        window.set_image("image", image_data)?;

        // Unloading all the events, that have piled up during the frame.
        for window_event in event_channel.try_iter() {
            exit |= handle_event(window_event, &mut camera);
        }

        if params.print_fps {
            // Counting frames to printout stats every second.
            frame_counter += 1;
            if frame_counter_time_begin.elapsed().as_secs_f32() > 1.0 {
                info!("FPS --- {}", frame_counter);
                frame_counter_time_begin = time::Instant::now();
                frame_counter = 0;
            }
        }
    }

    return Ok(());
}
