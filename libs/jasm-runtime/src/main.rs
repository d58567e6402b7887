//! Headless camera-loop runtime.
//!
//! Builds the fixed graph
//! `source -> convert(AYUV) -> flip(horizontal) -> tee -> {display, preview}`,
//! activates it, opens the UDP control listener, and runs until Ctrl-C.
//! Without a real window system the display branch presents onto a
//! logging surface; the preview branch just counts frames.
//!
//! Environment:
//! - `JASM_SOURCE`: `test-pattern` (default) or `capture`; without a real
//!   camera device the capture source fails activation with a clear error
//! - `JASM_CONTROL_PORT`: UDP control port (default 19999)
//! - `JASM_FPS`: source frame rate (default 30)
//! - `RUST_LOG`: log filter (default `info`)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use jasm::prelude::*;

/// Surface that logs every Nth frame instead of rendering it.
struct LoggingSurface {
    label: &'static str,
    presented: AtomicU64,
}

impl LoggingSurface {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            presented: AtomicU64::new(0),
        }
    }
}

impl PresentationSurface for LoggingSurface {
    fn present(&self, frame: &VideoFrame) {
        let total = self.presented.fetch_add(1, Ordering::Relaxed) + 1;
        if total % 300 == 1 {
            tracing::info!(
                "[{}] frame #{} ({}), {} presented so far",
                self.label,
                frame.frame_number,
                frame.caps(),
                total
            );
        }
    }
}

fn source_stage(kind: &str, fps: f64) -> anyhow::Result<StageSpec> {
    match kind {
        "test-pattern" => Ok(StageSpec::new("cam", "test-pattern-source")
            .with("pattern", "gradient")
            .with("fps", fps)),
        // No device handle is available headlessly; activation reports
        // the missing camera instead of falling back silently.
        "capture" => Ok(StageSpec::new("cam", "capture-source")),
        other => anyhow::bail!("unknown JASM_SOURCE '{other}'"),
    }
}

fn camera_loop_spec(source: StageSpec, display: SurfaceHandle) -> GraphSpec {
    let mut spec = GraphSpec::new();
    spec.add_stage(source);
    spec.add_stage(StageSpec::new("convert", "convert").with("caps", "video/x-raw,format=AYUV"));
    spec.add_stage(StageSpec::new("flip", "flip").with("method", "horizontal"));
    spec.add_stage(StageSpec::new("tee", "tee"));
    spec.add_stage(StageSpec::new("display", "surface-sink").with("surface", display));
    spec.add_stage(StageSpec::new("preview", "counting-sink"));
    spec.connect("cam", "convert");
    spec.connect("convert", "flip");
    spec.connect("flip", "tee");
    spec.connect("tee.display_out", "display");
    spec.connect("tee.preview_out", "preview");
    spec
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let control_port: u16 = match std::env::var("JASM_CONTROL_PORT") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("bad JASM_CONTROL_PORT '{value}'"))?,
        Err(_) => DEFAULT_CONTROL_PORT,
    };
    let fps: f64 = match std::env::var("JASM_FPS") {
        Ok(value) => value.parse().with_context(|| format!("bad JASM_FPS '{value}'"))?,
        Err(_) => 30.0,
    };

    let source_kind = std::env::var("JASM_SOURCE").unwrap_or_else(|_| "test-pattern".into());
    let source = source_stage(&source_kind, fps)?;

    let display = SurfaceHandle::new(Arc::new(LoggingSurface::new("display")));
    let spec = camera_loop_spec(source, display);

    let registry = StageRegistry::with_builtins();
    let graph = spec.build(&registry).context("graph validation failed")?;
    tracing::info!(
        "graph validated: {} stages, {} edges",
        graph.stage_count(),
        graph.edge_count()
    );

    let mut running =
        activate(&graph, &BuiltinBackend::new()).context("graph activation failed")?;

    let mut control = ControlListener::bind(control_port).context("control listener failed")?;

    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("failed to install Ctrl-C handler")?;

    tracing::info!("running; press Ctrl-C to stop");
    let _ = stop_rx.recv();

    tracing::info!("shutting down");
    control.shutdown();
    running.teardown();
    Ok(())
}
