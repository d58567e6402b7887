//! End-to-end graph lifecycle tests: build, activate, run, tear down.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use jasm::prelude::*;

const STARTUP_WINDOW: Duration = Duration::from_secs(3);

struct CountingSurface(AtomicU64);

impl PresentationSurface for CountingSurface {
    fn present(&self, _frame: &VideoFrame) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Surface that stalls on every frame, standing in for a renderer that
/// has fallen over.
struct StallingSurface;

impl PresentationSurface for StallingSurface {
    fn present(&self, _frame: &VideoFrame) {
        std::thread::sleep(Duration::from_secs(10));
    }
}

/// Backend wrapper that counts instantiations.
struct TrackingBackend {
    inner: BuiltinBackend,
    instantiations: Arc<AtomicUsize>,
}

impl StageBackend for TrackingBackend {
    fn instantiate(
        &self,
        spec: &StageSpec,
    ) -> Result<Box<dyn StageInstance>, InstantiationError> {
        self.instantiations.fetch_add(1, Ordering::SeqCst);
        self.inner.instantiate(spec)
    }
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    done()
}

fn camera_loop_spec(display: SurfaceHandle, preview: SurfaceHandle) -> GraphSpec {
    let mut spec = GraphSpec::new();
    spec.add_stage(
        StageSpec::new("cam", "test-pattern-source")
            .with("width", 64)
            .with("height", 48)
            .with("fps", 60.0),
    );
    spec.add_stage(StageSpec::new("flip", "flip").with("method", 4));
    spec.add_stage(StageSpec::new("tee", "tee"));
    spec.add_stage(StageSpec::new("display", "surface-sink").with("surface", display));
    spec.add_stage(StageSpec::new("preview", "surface-sink").with("surface", preview));
    spec.connect("cam", "flip");
    spec.connect("flip", "tee");
    spec.connect("tee.display_out", "display");
    spec.connect("tee.preview_out", "preview");
    spec
}

#[test]
fn test_camera_loop_runs_end_to_end() {
    let display = Arc::new(CountingSurface(AtomicU64::new(0)));
    let preview = Arc::new(CountingSurface(AtomicU64::new(0)));
    let spec = camera_loop_spec(
        SurfaceHandle::new(display.clone()),
        SurfaceHandle::new(preview.clone()),
    );

    let registry = StageRegistry::with_builtins();
    let graph = spec.build(&registry).unwrap();
    assert_eq!(graph.stage_count(), 5);
    assert_eq!(graph.edge_count(), 4);

    let mut running = activate(&graph, &BuiltinBackend::new()).unwrap();
    assert!(running.is_running());
    for id in ["cam", "flip", "tee", "display", "preview"] {
        assert_eq!(running.stage_state(id), Some(StageState::Running));
    }

    // Both branches should see frames shortly after activation.
    assert!(wait_until(STARTUP_WINDOW, || {
        display.0.load(Ordering::Relaxed) > 0 && preview.0.load(Ordering::Relaxed) > 0
    }));

    running.teardown();
    for id in ["cam", "flip", "tee", "display", "preview"] {
        assert_eq!(running.stage_state(id), Some(StageState::Stopped));
    }
}

#[test]
fn test_build_touches_no_backend() {
    let display = Arc::new(CountingSurface(AtomicU64::new(0)));
    let preview = Arc::new(CountingSurface(AtomicU64::new(0)));
    let spec = camera_loop_spec(
        SurfaceHandle::new(display.clone()),
        SurfaceHandle::new(preview),
    );

    let instantiations = Arc::new(AtomicUsize::new(0));
    let backend = TrackingBackend {
        inner: BuiltinBackend::new(),
        instantiations: Arc::clone(&instantiations),
    };

    let registry = StageRegistry::with_builtins();
    let graph = spec.build(&registry).unwrap();
    assert_eq!(instantiations.load(Ordering::SeqCst), 0);

    let mut running = activate(&graph, &backend).unwrap();
    assert_eq!(instantiations.load(Ordering::SeqCst), 5);
    running.teardown();
}

#[test]
fn test_dangling_edge_rejected_before_activation() {
    let mut spec = GraphSpec::new();
    spec.add_stage(StageSpec::new("cam", "test-pattern-source"));
    spec.add_stage(StageSpec::new("flip", "flip"));
    spec.add_stage(StageSpec::new("out", "counting-sink"));
    spec.connect("cam", "flip");
    spec.connect("flip", "flip2"); // no such stage
    spec.connect("flip", "out");

    let registry = StageRegistry::with_builtins();
    let err = spec.build(&registry).unwrap_err();
    match err {
        ValidationError::DanglingEdge { stage, .. } => assert_eq!(stage, "flip2"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_capture_device_fails_activation_cleanly() {
    let mut spec = GraphSpec::new();
    spec.add_stage(StageSpec::new("cam", "capture-source")); // no device handle
    spec.add_stage(StageSpec::new("out", "counting-sink"));
    spec.connect("cam", "out");

    let registry = StageRegistry::with_builtins();
    let graph = spec.build(&registry).unwrap();

    let err = activate(&graph, &BuiltinBackend::new()).unwrap_err();
    assert_eq!(err.from_stage, "cam");
    assert!(matches!(err.reason, LinkFailure::Instantiation(_)));
}

/// A branch whose surface blocks must not starve its sibling: the leaky
/// queue in front of the stalled sink absorbs the damage.
#[test]
fn test_stalled_branch_does_not_starve_sibling() {
    let healthy = Arc::new(CountingSurface(AtomicU64::new(0)));
    let spec = camera_loop_spec(
        SurfaceHandle::new(Arc::new(StallingSurface)),
        SurfaceHandle::new(healthy.clone()),
    );

    let registry = StageRegistry::with_builtins();
    let graph = spec.build(&registry).unwrap();
    let mut running = activate(&graph, &BuiltinBackend::new()).unwrap();

    // The healthy branch keeps flowing even though the display branch's
    // worker is stuck inside present().
    assert!(wait_until(STARTUP_WINDOW, || {
        healthy.0.load(Ordering::Relaxed) >= 30
    }));

    running.teardown();
}

#[test]
fn test_custom_stage_kind_flows_through_registry() {
    let mut registry = StageRegistry::with_builtins();
    registry
        .register(
            StageDescriptor::new("null-transform", StageRole::Transform, "passes frames through")
                .with_input(PortDescriptor::new(PRIMARY_PORT, "in", true))
                .with_output(PortDescriptor::new(PRIMARY_PORT, "out", false)),
        )
        .unwrap();

    let mut spec = GraphSpec::new();
    spec.add_stage(StageSpec::new("cam", "test-pattern-source"));
    spec.add_stage(StageSpec::new("nop", "null-transform"));
    spec.add_stage(StageSpec::new("out", "counting-sink"));
    spec.connect("cam", "nop");
    spec.connect("nop", "out");

    // Validates against the extended registry even though the built-in
    // backend could not instantiate it.
    let graph = spec.build(&registry).unwrap();
    assert_eq!(graph.stage_count(), 3);

    let err = activate(&graph, &BuiltinBackend::new()).unwrap_err();
    assert_eq!(err.from_stage, "nop");
}
