/// wire3d Terminal Viewer - Mouse-steered wireframe
///
/// Usage: wire3d-terminal [model.stl] [palette]
///
/// Without a model a cube is shown. Palettes: braille, braille-d, ascii,
/// blocks, blocks-d, combined.
/// Controls:
///   - Mouse: Move the camera target, wheel to shift it in depth
///   - Space: Pause the orbit
///   - P: Cycle palettes
///   - Q/ESC: Quit
///
/// Logging is off by default since stderr shares the screen with the
/// grid. Set `WIRE3D_LOG=<file>` to log there (level from `RUST_LOG`,
/// default `warn`), or set `RUST_LOG` and redirect stderr.
use anyhow::{bail, Context, Result};
use env_logger::{Env, Target};
use std::env;
use std::fs::File;
use wire3d_core::{stl, Mesh, Preset};
use wire3d_terminal::{AppConfig, TerminalApp};

/// Default filter when `RUST_LOG` is unset. Nothing reaches stderr
/// unless asked for.
fn default_filter(to_file: bool) -> &'static str {
    if to_file {
        "warn"
    } else {
        "off"
    }
}

fn init_logging() -> Result<()> {
    match env::var_os("WIRE3D_LOG") {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create log file {}", path.to_string_lossy()))?;
            env_logger::Builder::from_env(Env::default().default_filter_or(default_filter(true)))
                .target(Target::Pipe(Box::new(file)))
                .init();
        }
        None => {
            env_logger::Builder::from_env(Env::default().default_filter_or(default_filter(false)))
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;

    let args: Vec<String> = env::args().collect();
    let mut config = AppConfig::default();

    if let Some(name) = args.get(2) {
        match Preset::from_name(name) {
            Some(preset) => config.renderer.palette = preset.into(),
            None => bail!("unknown palette '{name}'"),
        }
    }

    let lines = match args.get(1) {
        Some(path) => {
            println!("Loading STL file: {}", path);
            let lines = stl::open_stl_file(path);
            if lines.is_empty() {
                eprintln!("No geometry loaded from {path}, nothing will be drawn");
            } else {
                println!("Loaded {} lines", lines.len());
            }
            lines
        }
        None => Mesh::cube(2.0).edges(),
    };

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(&lines, config)?;
    app.run()?;

    println!("Thank you for using wire3d!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_logging_off_by_default() {
        assert_eq!(default_filter(false), "off");
        assert_eq!(default_filter(true), "warn");
    }
}
