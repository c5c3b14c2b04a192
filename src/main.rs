//! Real-time PPE detection dashboard
//!
//! Opens a camera, runs a YOLOv8 PPE model on every frame and shows the
//! annotated stream with a status dashboard.
//!
//! Usage:
//!   cargo run --release --features opencv -- --model ppe_local.onnx
//!   cargo run --release --features opencv,cuda -- --use-gpu --camera 1
//!   cargo run --release --features opencv -- --stub   # no model needed
//!
//! Keys: q/Esc quit, s save snapshot, +/- confidence, space pause.

use anyhow::{Context, Result};
use clap::Parser;
use ppe_dashboard::video::{CameraSource, HighGuiDisplay, WINDOW_NAME};
use ppe_dashboard::{App, AppConfig, Detector, StubDetector};
use std::sync::atomic::Ordering;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::parse();
    config.validate()?;

    print_banner();
    ppe_dashboard::init()?;

    let detector = load_detector(&config)?;
    eprintln!("🧠 Detector: {}", detector.name());
    eprintln!("📋 Classes ({}):", detector.class_names().len());
    for (id, name) in detector.class_names().iter().enumerate() {
        eprintln!("   {:>2}: {}", id, name);
    }

    eprint!("📹 Opening camera {}... ", config.camera);
    let source = CameraSource::open(config.camera, config.capture_size())
        .with_context(|| format!("Could not open camera {}", config.camera))?;
    eprintln!("✓");

    let display = HighGuiDisplay::open(WINDOW_NAME).context("Could not open display window")?;

    let mut app = App::new(detector, source, display, config.app_options());

    let shutdown = app.shutdown_flag();
    ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    eprintln!("\n🎬 Running. Press Q or ESC to quit\n");
    let outcome = app.run();

    // Releases the camera and closes the window before reporting
    let summary = app.finish();
    println!("{}", summary);

    if let Some(path) = &config.summary_json {
        summary
            .write_json(path)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        eprintln!("💾 Summary written to {}", path.display());
    }

    match outcome {
        Ok(reason) => {
            eprintln!("✅ Session ended: {}", reason);
            Ok(())
        }
        Err(e) => Err(e).context("Detection loop stopped on a frame error"),
    }
}

fn print_banner() {
    eprintln!("{}", "=".repeat(60));
    eprintln!("  PPE DETECTION DASHBOARD v{}", ppe_dashboard::version());
    eprintln!("  Personal protective equipment monitoring");
    eprintln!("{}", "=".repeat(60));
}

fn load_detector(config: &AppConfig) -> Result<Box<dyn Detector>> {
    if config.stub {
        eprintln!("🧪 Stub mode: replaying a canned scene, no model loaded");
        return Ok(Box::new(StubDetector::demo()));
    }

    load_model(config)
}

#[cfg(feature = "onnx")]
fn load_model(config: &AppConfig) -> Result<Box<dyn Detector>> {
    eprintln!("📦 Loading model: {}", config.model);
    let detector = ppe_dashboard::YoloV8Detector::new(config.detector_config())
        .with_context(|| format!("Failed to load model {}", config.model))?;
    eprintln!("✓ Model loaded");
    Ok(Box::new(detector))
}

#[cfg(not(feature = "onnx"))]
fn load_model(_config: &AppConfig) -> Result<Box<dyn Detector>> {
    anyhow::bail!("Built without the `onnx` feature; rebuild with it or pass --stub")
}
