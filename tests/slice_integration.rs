//! Integration tests for 2D fields and slice markers
//!
//! Markers of one orientation share a single derived window; removing
//! the last marker closes it, and closing the 2D window cascades over
//! every slice window.

mod common;

use common::builders::{engine_with_field, small_field};
use common::assert_slice_eq;
use plotlink::{
    AxisOrientation, CoreEvent, CurveId, MarkerSpec, PlotRef, SliceOrientation,
};

#[test]
fn test_first_marker_opens_shared_slice_window() {
    let (mut engine, plot) = engine_with_field("P", "f1");

    let marker = engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 1.0,
            },
        )
        .unwrap();

    let derived = PlotRef::from("Pvertical");
    assert!(engine.has_window(&derived));
    assert_eq!(engine.edge_count(), 1);

    let group = engine.slice_group(&plot, SliceOrientation::Vertical).unwrap();
    assert_eq!(group.markers.len(), 1);
    assert_eq!(group.markers[0].id, marker);

    // Column xi=1 of z[xi][yi] = 10*xi + yi over the y axis.
    let curve = engine.curve(&derived, &CurveId::from("f1vertical0")).unwrap();
    assert_slice_eq(&curve.x, &[0.0, 1.0, 2.0], 1e-12);
    assert_slice_eq(&curve.y, &[10.0, 11.0, 12.0], 1e-12);

    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, CoreEvent::WindowOpened { plot } if plot == &derived)));
}

#[test]
fn test_second_marker_of_same_orientation_joins_window() {
    let (mut engine, plot) = engine_with_field("P", "f1");

    let first = engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 0.0,
            },
        )
        .unwrap();
    let second = engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 3.0,
            },
        )
        .unwrap();
    assert_ne!(first, second);

    let derived = PlotRef::from("Pvertical");
    // One shared window with one curve per marker; one edge total.
    assert_eq!(engine.window_count(), 2);
    assert_eq!(engine.curves(&derived).len(), 2);
    assert_eq!(engine.edge_count(), 1);
}

#[test]
fn test_orientations_get_separate_windows() {
    let (mut engine, plot) = engine_with_field("P", "f1");

    engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 1.0,
            },
        )
        .unwrap();
    engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Horizontal,
                position: 2.0,
            },
        )
        .unwrap();

    assert!(engine.has_window(&PlotRef::from("Pvertical")));
    assert!(engine.has_window(&PlotRef::from("Phorizontal")));
    assert_eq!(engine.edge_count(), 2);

    // Row yi=2 across the x axis.
    let curve = engine
        .curve(&PlotRef::from("Phorizontal"), &CurveId::from("f1horizontal1"))
        .unwrap();
    assert_slice_eq(&curve.y, &[2.0, 12.0, 22.0, 32.0], 1e-12);
}

#[test]
fn test_removing_last_marker_closes_slice_window() {
    let (mut engine, plot) = engine_with_field("P", "f1");

    let a = engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 0.0,
            },
        )
        .unwrap();
    let b = engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 2.0,
            },
        )
        .unwrap();
    engine.drain_events();

    engine.remove_slice_marker(&plot, a).unwrap();
    let derived = PlotRef::from("Pvertical");
    assert!(engine.has_window(&derived));
    assert_eq!(engine.curves(&derived).len(), 1);

    engine.remove_slice_marker(&plot, b).unwrap();
    assert!(!engine.has_window(&derived));
    assert_eq!(engine.edge_count(), 0);
    assert!(engine.slice_group(&plot, SliceOrientation::Vertical).is_none());

    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, CoreEvent::WindowClosed { plot, .. } if plot == &derived)));
}

#[test]
fn test_closing_field_window_detaches_markers_and_cascades() {
    let (mut engine, plot) = engine_with_field("P", "f1");

    let a = engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 1.0,
            },
        )
        .unwrap();
    let b = engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Region {
                orientation: AxisOrientation::Horizontal,
                a: 0.0,
                b: 1.0,
            },
        )
        .unwrap();
    engine.drain_events();

    engine.close_window(&plot).unwrap();

    assert_eq!(engine.window_count(), 0);
    assert_eq!(engine.edge_count(), 0);
    assert!(engine.field(&plot).is_none());

    let events = engine.drain_events();
    let detached: Vec<&Vec<u32>> = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::MarkersDetached { markers, .. } => Some(markers),
            _ => None,
        })
        .collect();
    assert_eq!(detached.len(), 2);
    let mut all: Vec<u32> = detached.into_iter().flatten().copied().collect();
    all.sort_unstable();
    assert_eq!(all, vec![a.0, b.0]);
}

#[test]
fn test_field_refresh_recomputes_marker_curves() {
    let (mut engine, plot) = engine_with_field("P", "f1");

    engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 1.0,
            },
        )
        .unwrap();
    engine.drain_events();

    // Same shape, every z value doubled.
    let mut field = small_field("f1");
    for col in &mut field.z {
        for v in col.iter_mut() {
            *v *= 2.0;
        }
    }
    engine.refresh_field(&plot, field).unwrap();

    let curve = engine
        .curve(&PlotRef::from("Pvertical"), &CurveId::from("f1vertical0"))
        .unwrap();
    assert_slice_eq(&curve.y, &[20.0, 22.0, 24.0], 1e-12);

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::CurveUpdated { curve, .. } if curve == &CurveId::from("f1vertical0")
    )));
}

#[test]
fn test_segment_marker_uses_arbitrary_window() {
    let (mut engine, plot) = engine_with_field("P", "f1");

    engine
        .add_slice_marker(
            &plot,
            MarkerSpec::Segment {
                start: (0.0, 0.0),
                end: (3.0, 0.0),
            },
        )
        .unwrap();

    let derived = PlotRef::from("Parbitrary");
    assert!(engine.has_window(&derived));
    let curve = engine.curve(&derived, &CurveId::from("f1arbitrary0")).unwrap();
    // A segment along the x axis at y=0 samples z[xi][0] at three
    // evenly spaced positions (index distance 3).
    assert_eq!(curve.x.len(), curve.y.len());
    assert_slice_eq(&curve.x, &[0.0, 1.5, 3.0], 1e-12);
    assert_slice_eq(&curve.y, &[0.0, 20.0, 30.0], 1e-12);
}

#[test]
fn test_marker_on_plain_window_is_rejected() {
    let (mut engine, _) = engine_with_field("P", "f1");
    let other = PlotRef::from("W1");
    engine.open_window(other.clone()).unwrap();

    let err = engine
        .add_slice_marker(
            &other,
            MarkerSpec::Point {
                orientation: AxisOrientation::Vertical,
                position: 0.0,
            },
        )
        .unwrap_err();
    assert!(err.is_unknown_reference());
}
