mod scene;
mod system;
mod error;
mod app;

use std::env;

use error::RenderError;
use system::Lens;

const WIDTH: u32  = 1000;
const HEIGHT: u32 = 800;
const FOV_DEGREES: f32 = 130.0;
const NEAR: f32 = 0.1;
const FAR: f32  = 100.0;

fn value<'a>(args: &'a [String], i: usize) -> Result<&'a str, RenderError> {
    return args
        .get(i + 1)
        .map(|value| value.as_str())
        .ok_or_else(|| RenderError::MissingValue(args[i].clone()));
}

fn parsed<T: std::str::FromStr>(args: &[String], i: usize) -> Result<T, RenderError> {
    let raw = value(args, i)?;
    return raw.parse().map_err(|_| RenderError::InvalidValue {
        option: args[i].clone(),
        value: raw.to_string(),
    });
}

/// Reads the command line, without the program name, into the execution context.
fn parse_args(args: &[String]) -> Result<app::Params, RenderError> {
    // Default values.
    let mut params = app::Params {
        lens: Lens { width: WIDTH, height: HEIGHT, fov: FOV_DEGREES, near: NEAR, far: FAR },
        print_fps: false,
        asset_path: String::from("assets/sphere.obj"),
        output_path: None,
        time: 0.0,
        threads: 1,
        seed: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-p" => { params.asset_path = value(args, i)?.to_string(); i += 1; }
            "-o" => { params.output_path = Some(value(args, i)?.to_string()); i += 1; }
            "-t" => { params.time = parsed(args, i)?; i += 1; }
            "-j" => { params.threads = parsed(args, i)?; i += 1; }
            "--seed" => { params.seed = Some(parsed(args, i)?); i += 1; }
            "--fps" => { params.print_fps = true; }
            other => return Err(RenderError::UnknownOption(other.to_string())),
        }
        i += 1;
    }

    return Ok(params);
}

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let params = parse_args(&args)?;

    app::run(params)?;

    return Ok(());
}
