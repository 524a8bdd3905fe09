//! Integration tests for background transform computation
//!
//! Fitting runs on the worker thread; these tests cover result
//! marshalling, the pending-refresh guard, and the use-after-close
//! discard path.

mod common;

use common::builders::engine_with_curve;
use common::{assert_float_eq, worker_timeout};
use plotlink::{
    CoreEvent, CurveId, Engine, EngineConfig, ParamValue, PlotRef, Severity, TransformKind,
    TransformOutput, TransformParams, TransformRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn linear() -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..200).map(|i| i as f64 * 0.05).collect();
    let y: Vec<f64> = x.iter().map(|&v| 2.0 * v + 1.0).collect();
    (x, y)
}

#[test]
fn test_background_fit_applies_asynchronously() {
    let (x, y) = linear();
    let (mut engine, plot, curve) = engine_with_curve("W1", "c1", x.clone(), y);

    let derived = engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    assert_eq!(derived.as_str(), "W1fit");

    // The derived window opens immediately with an empty pending curve.
    let fit_curve = engine.curve(&derived, &CurveId::from("c1fit")).unwrap();
    assert!(fit_curve.is_empty());

    let applied = engine.wait_for_workers(worker_timeout());
    assert_eq!(applied, 1);

    let fit_curve = engine.curve(&derived, &CurveId::from("c1fit")).unwrap();
    assert_eq!(fit_curve.len(), 200);
    // A degree-1 fit of exact linear data reproduces it.
    assert_float_eq(fit_curve.y[0], 1.0, 1e-9);
    assert_float_eq(fit_curve.y[199], 2.0 * x[199] + 1.0, 1e-9);
    assert_eq!(fit_curve.meta.legend.as_deref(), Some("polynomial fit (degree 1)"));

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::CurveUpdated { curve, .. } if curve == &CurveId::from("c1fit")
    )));
}

#[test]
fn test_quadratic_fit_recovers_coefficients() {
    let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
    let y: Vec<f64> = x.iter().map(|&v| 0.5 * v * v - 3.0 * v + 2.0).collect();
    let (mut engine, plot, curve) = engine_with_curve("W1", "c1", x.clone(), y.clone());

    let params = TransformParams::new().set("degree", ParamValue::Int(2));
    let derived = engine
        .enable_transform(&plot, &curve, TransformKind::Fit, params)
        .unwrap();
    assert_eq!(engine.wait_for_workers(worker_timeout()), 1);

    let fit_curve = engine.curve(&derived, &CurveId::from("c1fit")).unwrap();
    for i in [0, 25, 50, 99] {
        assert_float_eq(fit_curve.y[i], y[i], 1e-6);
    }
}

#[test]
fn test_result_discarded_after_disable() {
    let (x, y) = linear();
    let (mut engine, plot, curve) = engine_with_curve("W1", "c1", x, y);

    let derived = engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    engine.disable_transform(&plot, TransformKind::Fit).unwrap();
    assert!(!engine.has_window(&derived));
    engine.drain_events();

    // Let the worker finish; its result has no edge left and is dropped.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(engine.poll_workers(), 0);
    assert!(!engine.has_window(&derived));
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_result_discarded_after_source_close() {
    let (x, y) = linear();
    let (mut engine, plot, curve) = engine_with_curve("W1", "c1", x, y);

    engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    engine.close_window(&plot).unwrap();
    engine.drain_events();

    thread::sleep(Duration::from_millis(200));
    assert_eq!(engine.poll_workers(), 0);
    assert_eq!(engine.window_count(), 0);
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_reenabled_fit_discards_result_of_its_predecessor() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TransformRegistry::with_builtins();
    let counter = Arc::clone(&calls);
    let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();
    registry.register_background(
        TransformKind::Fit,
        Arc::new(move |sel, _| {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 1 {
                // Signal that the first job is executing, then keep it
                // in flight across the disable/re-enable below.
                let _ = started_tx.send(());
                thread::sleep(Duration::from_millis(300));
            }
            Ok(TransformOutput::new(
                sel.x.clone(),
                sel.y.clone(),
                format!("run {call}"),
            ))
        }),
    );
    let mut engine = Engine::with_transforms(EngineConfig::default(), registry);
    let plot = PlotRef::from("W1");
    let curve = CurveId::from("c1");
    let (x, y) = linear();
    engine.open_window(plot.clone()).unwrap();
    engine
        .add_curve(&plot, curve.clone(), x, y, plotlink::CurveMeta::new("signal", "V"))
        .unwrap();

    engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    // Wait until job 1 provably runs so the disable cannot cancel it
    // before the worker dequeues it.
    started_rx
        .recv_timeout(worker_timeout())
        .expect("first background job never started");
    engine.disable_transform(&plot, TransformKind::Fit).unwrap();
    let derived = engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    engine.drain_events();

    // Only the re-enabled edge's own computation may land on its curve;
    // the first run finished after its edge died and must be dropped.
    assert_eq!(engine.wait_for_workers(worker_timeout()), 1);
    let fit_curve = engine.curve(&derived, &CurveId::from("c1fit")).unwrap();
    assert_eq!(fit_curve.meta.legend.as_deref(), Some("run 2"));
}

#[test]
fn test_disabling_inline_sibling_keeps_refresh_guard() {
    let (x, y) = linear();
    let (mut engine, plot, curve) = engine_with_curve("W1", "c1", x.clone(), y.clone());

    engine
        .enable_transform(&plot, &curve, TransformKind::Integral, TransformParams::new())
        .unwrap();
    engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    engine.disable_transform(&plot, TransformKind::Integral).unwrap();
    engine.drain_events();

    // The fit is still outstanding, so refreshes stay blocked.
    let y2: Vec<f64> = y.iter().map(|v| v * 10.0).collect();
    engine.refresh(&plot, &curve, x.clone(), y2, None).unwrap();
    assert!(engine.drain_events().is_empty());
    assert_float_eq(engine.curve(&plot, &curve).unwrap().y[0], y[0], 1e-12);

    assert_eq!(engine.wait_for_workers(worker_timeout()), 1);
}

#[test]
fn test_refresh_skipped_while_fit_pending() {
    let (x, y) = linear();
    let (mut engine, plot, curve) = engine_with_curve("W1", "c1", x.clone(), y.clone());

    engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    engine.drain_events();

    // A refresh arriving while the fit is outstanding is skipped whole.
    let y2: Vec<f64> = y.iter().map(|v| v * 10.0).collect();
    engine.refresh(&plot, &curve, x.clone(), y2, None).unwrap();
    assert!(engine.drain_events().is_empty());
    assert_float_eq(engine.curve(&plot, &curve).unwrap().y[0], y[0], 1e-12);

    // Once the result lands, refreshes flow again.
    assert_eq!(engine.wait_for_workers(worker_timeout()), 1);
    let y3: Vec<f64> = y.iter().map(|v| v + 1.0).collect();
    engine.refresh(&plot, &curve, x, y3.clone(), None).unwrap();
    assert_eq!(engine.wait_for_workers(worker_timeout()), 1);
    assert_float_eq(engine.curve(&plot, &curve).unwrap().y[0], y3[0], 1e-12);
}

#[test]
fn test_fit_failure_surfaces_on_status_channel() {
    let x = vec![1.0; 8];
    let y: Vec<f64> = (0..8).map(|i| i as f64).collect();
    let (mut engine, plot, curve) = engine_with_curve("W1", "c1", x, y);

    let derived = engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();
    engine.drain_events();

    engine.wait_for_workers(worker_timeout());

    // The pending curve keeps its last (empty) state.
    assert!(engine.curve(&derived, &CurveId::from("c1fit")).unwrap().is_empty());
    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Status { severity: Severity::Error, message } if message.contains("fit")
    )));
}

#[test]
fn test_inline_fit_when_background_disabled() {
    let (x, y) = linear();
    let mut engine = Engine::new(EngineConfig {
        background_fit: false,
        ..EngineConfig::default()
    });
    let plot = PlotRef::from("W1");
    let curve = CurveId::from("c1");
    engine.open_window(plot.clone()).unwrap();
    engine
        .add_curve(&plot, curve.clone(), x, y, plotlink::CurveMeta::new("signal", "V"))
        .unwrap();

    let derived = engine
        .enable_transform(&plot, &curve, TransformKind::Fit, TransformParams::new())
        .unwrap();

    // No worker involved: the result is there synchronously.
    let fit_curve = engine.curve(&derived, &CurveId::from("c1fit")).unwrap();
    assert_eq!(fit_curve.len(), 200);
    assert_float_eq(fit_curve.y[0], 1.0, 1e-9);
}
