mod app;

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};

use soft_rasterizer::config::RenderConfig;
use soft_rasterizer::scene::RenderMode;

const USAGE: &str = "usage: soft_rasterizer [-m model.obj] [-t texture] [-o output.tga] [-c config.json] \
[-s wireframe|flat|depth|textured] [-j threads] [--depth-out depth.tga] [--show]";

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next().ok_or_else(|| anyhow!("missing value for {}\n{}", flag, USAGE))
}

#[cfg_attr(feature = "preview", show_image::main)]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Default values.
    let mut model_path = PathBuf::from("assets/african_head.obj");
    let mut texture_path = None;
    let mut output_path = PathBuf::from("output.tga");
    let mut depth_output_path = None;
    let mut config_path = None;
    let mut mode = None;
    let mut threads = None;
    let mut show = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-m" => model_path = PathBuf::from(next_value(&mut args, "-m")?),
            "-t" => texture_path = Some(PathBuf::from(next_value(&mut args, "-t")?)),
            "-o" => output_path = PathBuf::from(next_value(&mut args, "-o")?),
            "-c" => config_path = Some(PathBuf::from(next_value(&mut args, "-c")?)),
            "-s" => {
                let value = next_value(&mut args, "-s")?;
                let parsed: RenderMode = serde_json::from_value(serde_json::Value::String(value.clone()))
                    .with_context(|| format!("unknown render mode {:?}", value))?;
                mode = Some(parsed);
            }
            "-j" => {
                let value = next_value(&mut args, "-j")?;
                threads = Some(value.parse::<usize>().with_context(|| format!("bad thread count {:?}", value))?);
            }
            "--depth-out" => depth_output_path = Some(PathBuf::from(next_value(&mut args, "--depth-out")?)),
            "--show" => show = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            other => bail!("unknown argument {:?}\n{}", other, USAGE),
        }
    }

    let mut config = match &config_path {
        Some(path) => RenderConfig::load(path).with_context(|| format!("failed to read config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    // Flags win over the config file.
    if let Some(mode) = mode {
        config.mode = mode;
    }
    if let Some(threads) = threads {
        config.threads = threads;
    }
    if texture_path.is_some() && mode.is_none() && config_path.is_none() {
        config.mode = RenderMode::Textured;
    }

    let params = app::Params {
        model_path,
        texture_path,
        output_path,
        depth_output_path,
        config,
        show,
    };

    app::run(params)?;

    return Ok(());
}
