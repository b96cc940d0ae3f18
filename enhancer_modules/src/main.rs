// src/main.rs

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::path::PathBuf;
use std::time::Duration;

use enhancer_modules::app::{EnhancerApp, KEY_HELP};
use enhancer_modules::config::EnhancerConfig;
use enhancer_modules::controller::EffectController;
use enhancer_modules::render::{render_file, RenderPlan};

#[derive(Parser, Debug)]
#[command(name = "enhancer", version, about = "Spatial and bass effects for a local track, recorded as you listen")]
struct Args {
    /// Audio files; `n` cycles through them
    files: Vec<PathBuf>,

    /// JSON config file (omitted fields keep their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where recordings are written
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Render every file offline instead of playing, e.g. `8d,bass`
    #[arg(short, long, value_name = "PLAN")]
    render: Option<RenderPlan>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EnhancerConfig::load_from_disk(path)?,
        None => EnhancerConfig::default(),
    };
    if let Some(dir) = args.out_dir {
        config.output_dir = dir;
    }

    if let Some(plan) = args.render {
        return render_all(&args.files, &plan, &config);
    }

    let mut app = EnhancerApp::new(EffectController::new(config), args.files);
    app.load_next();

    println!("{KEY_HELP}");

    enable_raw_mode()?;
    let result = run_loop(&mut app);
    disable_raw_mode()?;

    app.shutdown();
    println!("\n🛑 Exiting enhancer.");
    result
}

fn run_loop(app: &mut EnhancerApp) -> Result<(), anyhow::Error> {
    // Target 20 FPS (50ms per frame)
    let target_frame_duration = Duration::from_millis(50);

    app.run_tick()?;

    loop {
        if event::poll(target_frame_duration)? {
            if let Event::Key(ev) = event::read()? {
                if ev.kind == KeyEventKind::Press {
                    if app.should_quit(ev.code, ev.modifiers) {
                        return Ok(());
                    }
                    app.handle_key(ev.code, ev.modifiers);
                    // Redraw right away on input
                    app.run_tick()?;
                    continue;
                }
            }
        }

        app.run_tick()?;
    }
}

fn render_all(files: &[PathBuf], plan: &RenderPlan, config: &EnhancerConfig) -> Result<(), anyhow::Error> {
    anyhow::ensure!(!files.is_empty(), "--render needs at least one input file");

    for (i, path) in files.iter().enumerate() {
        let artifact = render_file(path, plan, config)?;
        // One subdirectory per input so the fixed artifact name never collides
        let dir = if files.len() == 1 {
            config.output_dir.clone()
        } else {
            config.output_dir.join(format!("{:02}", i + 1))
        };
        let saved = artifact
            .save_to(&dir)
            .with_context(|| format!("saving render of {}", path.display()))?;
        println!("✅ {} -> {}", path.display(), saved.display());
    }
    Ok(())
}
