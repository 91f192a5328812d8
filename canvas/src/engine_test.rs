#![allow(clippy::float_cmp)]

use serde_json::{Value, json};

use super::*;
use crate::render::StatusSink;

// =============================================================================
// HELPERS
// =============================================================================

#[derive(Debug)]
struct RecordingShell {
    visible: bool,
    title: String,
    presents: usize,
    statuses: Vec<String>,
}

impl Default for RecordingShell {
    fn default() -> Self {
        Self { visible: true, title: String::new(), presents: 0, statuses: Vec::new() }
    }
}

impl StatusSink for RecordingShell {
    fn show_status(&mut self, message: &str) {
        self.statuses.push(message.to_owned());
    }
}

impl ExportHost for RecordingShell {}

impl Shell for RecordingShell {
    fn set_title(&mut self, title: &str) {
        title.clone_into(&mut self.title);
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn dpi(&self) -> (f64, f64) {
        (96.0, 96.0)
    }

    fn present(&mut self, _buffer: &Pixmap) {
        self.presents += 1;
    }
}

fn viewer() -> Viewer<RecordingShell> {
    Viewer::new(RecordingShell::default(), FontBook::empty())
}

fn send(viewer: &mut Viewer<RecordingShell>, value: Value) -> Result<Outcome, ViewerError> {
    let frame = Frame::from_value(value).expect("frame");
    viewer.dispatch(&frame)
}

fn ok(viewer: &mut Viewer<RecordingShell>, value: Value) {
    let action = value["action"].clone();
    assert_eq!(send(viewer, value).expect("command succeeds"), Outcome::Continue, "{action}");
}

fn begin_full_view(viewer: &mut Viewer<RecordingShell>) {
    ok(
        viewer,
        json!({
            "action": "beginView",
            "viewfracs": {"left": 0.0, "bottom": 0.0, "right": 1.0, "top": 1.0},
            "usercoords": {"left": 0.0, "bottom": 0.0, "right": 100.0, "top": 100.0},
        }),
    );
}

fn draw_small_rect(viewer: &mut Viewer<RecordingShell>) {
    ok(
        viewer,
        json!({
            "action": "drawRectangle",
            "left": 10.0, "bottom": 10.0, "right": 20.0, "top": 20.0,
            "fill": {"color": "red"},
        }),
    );
}

fn fill_view(viewer: &mut Viewer<RecordingShell>, color: &str) {
    ok(
        viewer,
        json!({
            "action": "drawRectangle",
            "left": 0.0, "bottom": 0.0, "right": 100.0, "top": 100.0,
            "fill": {"color": color},
        }),
    );
}

fn pixel(viewer: &Viewer<RecordingShell>, x: u32, y: u32) -> (u8, u8, u8, u8) {
    let p = viewer.buffer().expect("buffer").pixel(x, y).expect("pixel in range");
    (p.red(), p.green(), p.blue(), p.alpha())
}

// =============================================================================
// VIEW LIFECYCLE
// =============================================================================

#[test]
fn begin_then_end_without_draws_adds_nothing() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    ok(&mut viewer, json!({"action": "endView"}));
    assert!(viewer.pictures().is_empty());
    assert_eq!(viewer.active_view(), None);
}

#[test]
fn end_view_while_idle_is_a_no_op() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "endView"}));
    assert!(viewer.pictures().is_empty());
    assert_eq!(viewer.shell().presents, 0);
}

#[test]
fn end_view_appends_and_presents() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    draw_small_rect(&mut viewer);
    assert_eq!(viewer.active_count(), Some(1));
    ok(&mut viewer, json!({"action": "endView"}));
    assert_eq!(viewer.pictures().len(), 1);
    assert_eq!(viewer.state().last_picture_drawn, 1);
    assert_eq!(viewer.shell().presents, 1);
    assert_eq!(viewer.shell().statuses, ["Drawing (piece 1 of 1)", "Ready"]);
}

#[test]
fn begin_view_while_recording_ends_previous_without_update() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    draw_small_rect(&mut viewer);
    begin_full_view(&mut viewer);
    assert_eq!(viewer.pictures().len(), 1);
    assert_eq!(viewer.active_count(), Some(0));
    assert_eq!(viewer.shell().presents, 0);
}

#[test]
fn invalid_view_leaves_viewer_idle() {
    let mut viewer = viewer();
    let err = send(
        &mut viewer,
        json!({
            "action": "beginView",
            "viewfracs": {"left": 0.5, "bottom": 0.0, "right": 0.5, "top": 1.0},
            "usercoords": {"left": 0.0, "bottom": 0.0, "right": 1.0, "top": 1.0},
        }),
    )
    .expect_err("degenerate view");
    assert_eq!(err.error_code(), "E_INVALID_VIEW_BOUNDS");
    assert!(err.is_fatal());
    assert_eq!(viewer.active_view(), None);
}

#[test]
fn drawing_without_view_fails() {
    let mut viewer = viewer();
    let err = send(&mut viewer, json!({"action": "drawText", "text": "hi"})).expect_err("no view");
    assert_eq!(err.error_code(), "E_NO_ACTIVE_VIEW");
    let err = send(&mut viewer, json!({"action": "clipView", "clip": false})).expect_err("no view");
    assert_eq!(err.error_code(), "E_NO_ACTIVE_VIEW");
}

#[test]
fn update_cycles_non_empty_view_only() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    ok(&mut viewer, json!({"action": "update"}));
    assert!(viewer.pictures().is_empty());
    assert_eq!(viewer.shell().presents, 0);

    draw_small_rect(&mut viewer);
    ok(&mut viewer, json!({"action": "update"}));
    assert_eq!(viewer.pictures().len(), 1);
    assert_eq!(viewer.active_count(), Some(0));
    assert_eq!(viewer.shell().presents, 1);
}

#[test]
fn clip_toggle_survives_view_restart() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    ok(&mut viewer, json!({"action": "clipView", "clip": false}));
    draw_small_rect(&mut viewer);
    ok(&mut viewer, json!({"action": "update"}));
    assert_eq!(viewer.active_view().map(|view| view.clip), Some(false));
}

#[test]
fn primitive_ceiling_triggers_one_implicit_update() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    let opened = viewer.active_view();
    for _ in 0..MAX_DRAWS_PER_PICTURE - 1 {
        draw_small_rect(&mut viewer);
    }
    assert!(viewer.pictures().is_empty());
    assert_eq!(viewer.active_count(), Some(MAX_DRAWS_PER_PICTURE - 1));

    draw_small_rect(&mut viewer);
    assert_eq!(viewer.pictures().len(), 1);
    assert_eq!(viewer.pictures()[0].primitive_count(), MAX_DRAWS_PER_PICTURE);
    assert_eq!(viewer.active_count(), Some(0));
    assert_eq!(viewer.active_view(), opened);
    assert_eq!(viewer.shell().presents, 1);
}

#[test]
fn point_batch_counts_each_point_toward_ceiling() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    let points: Vec<[f64; 2]> = (0..300).map(|i| [f64::from(i % 100), 50.0]).collect();
    ok(&mut viewer, json!({"action": "drawPoints", "points": points, "symbol": "o", "size": 4.0}));
    assert_eq!(viewer.pictures().len(), 1);
    assert_eq!(viewer.active_count(), Some(0));
}

#[test]
fn failed_grid_draws_nothing() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    let colors: Vec<Value> = (0..5).map(|_| json!({"color": "blue"})).collect();
    let err = send(
        &mut viewer,
        json!({
            "action": "drawMulticolorRectangle",
            "left": 0.0, "bottom": 0.0, "right": 10.0, "top": 10.0,
            "numrows": 2, "numcols": 3, "colors": colors,
        }),
    )
    .expect_err("too few colors");
    assert_eq!(err.error_code(), "E_INSUFFICIENT_COLORS");
    assert_eq!(viewer.active_count(), Some(0));
}

// =============================================================================
// CLEAR AND REDRAW
// =============================================================================

#[test]
fn clear_drops_pictures_and_fills_with_new_colour() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    fill_view(&mut viewer, "red");
    ok(&mut viewer, json!({"action": "endView"}));
    assert_eq!(pixel(&viewer, 5, 5), (255, 0, 0, 255));

    ok(&mut viewer, json!({"action": "clear", "color": "black"}));
    assert!(viewer.pictures().is_empty());
    assert_eq!(viewer.state().clear_color, Color::BLACK);
    assert_eq!(pixel(&viewer, 5, 5), (0, 0, 0, 255));
}

#[test]
fn clear_without_colour_keeps_previous() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "clear", "color": "black"}));
    ok(&mut viewer, json!({"action": "clear"}));
    ok(&mut viewer, json!({"action": "clear", "color": "not-a-colour"}));
    assert_eq!(viewer.state().clear_color, Color::BLACK);
}

#[test]
fn clear_reopens_active_view_and_discards_its_drawing() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    let opened = viewer.active_view();
    draw_small_rect(&mut viewer);
    ok(&mut viewer, json!({"action": "clear"}));
    assert!(viewer.pictures().is_empty());
    assert_eq!(viewer.active_view(), opened);
    assert_eq!(viewer.active_count(), Some(0));
}

#[test]
fn redraw_keeps_pictures_and_replays_them() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    fill_view(&mut viewer, "red");
    ok(&mut viewer, json!({"action": "redraw"}));
    assert_eq!(viewer.pictures().len(), 1);
    assert_eq!(viewer.active_count(), Some(0));
    assert_eq!(viewer.state().last_picture_drawn, 1);
    assert_eq!(pixel(&viewer, 5, 5), (255, 0, 0, 255));
}

// =============================================================================
// SIZE AND SCALE
// =============================================================================

#[test]
fn resize_converts_thousandths_of_inch_and_clamps() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "resize", "width": 5000, "height": 4000}));
    assert_eq!((viewer.state().width, viewer.state().height), (480, 384));
    let buffer = viewer.buffer().expect("buffer");
    assert_eq!((buffer.width(), buffer.height()), (480, 384));

    ok(&mut viewer, json!({"action": "resize", "width": 1000, "height": 1000}));
    assert_eq!((viewer.state().width, viewer.state().height), (MIN_CANVAS_SIZE, MIN_CANVAS_SIZE));
}

#[test]
fn scale_round_trip_restores_size() {
    let mut viewer = viewer();
    let original = (viewer.state().width, viewer.state().height);
    ok(&mut viewer, json!({"action": "scale", "factor": 2.0}));
    assert_eq!((viewer.state().width, viewer.state().height), (2220, 1780));
    assert_eq!(viewer.state().scale, 2.0);
    ok(&mut viewer, json!({"action": "scale", "factor": 1.0}));
    assert_eq!((viewer.state().width, viewer.state().height), original);

    ok(&mut viewer, json!({"action": "scale", "factor": 0.5}));
    ok(&mut viewer, json!({"action": "scale", "factor": 1.0}));
    assert_eq!((viewer.state().width, viewer.state().height), original);
}

#[test]
fn inexact_scale_round_trip_restores_size() {
    let mut viewer = viewer();
    let original = (viewer.state().width, viewer.state().height);
    ok(&mut viewer, json!({"action": "scale", "factor": 0.33}));
    assert_eq!((viewer.state().width, viewer.state().height), (366, 294));
    ok(&mut viewer, json!({"action": "scale", "factor": 0.7}));
    ok(&mut viewer, json!({"action": "scale", "factor": 1.0}));
    assert_eq!((viewer.state().width, viewer.state().height), original);
    assert_eq!(viewer.state().scale, 1.0);
}

#[test]
fn clamped_scale_round_trip_restores_size() {
    let mut viewer = viewer();
    let original = (viewer.state().width, viewer.state().height);
    ok(&mut viewer, json!({"action": "scale", "factor": 0.1}));
    assert_eq!(viewer.state().height, MIN_CANVAS_SIZE);
    ok(&mut viewer, json!({"action": "scale", "factor": 1.0}));
    assert_eq!((viewer.state().width, viewer.state().height), original);
}

#[test]
fn resize_while_scaled_keeps_unscaled_base() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "scale", "factor": 2.0}));
    ok(&mut viewer, json!({"action": "resize", "width": 10000, "height": 8000}));
    assert_eq!((viewer.state().width, viewer.state().height), (960, 768));
    assert_eq!((viewer.state().base_width, viewer.state().base_height), (480.0, 384.0));
    ok(&mut viewer, json!({"action": "scale", "factor": 1.0}));
    assert_eq!((viewer.state().width, viewer.state().height), (480, 384));
}

#[test]
fn scale_below_minimum_pins_shorter_side() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "scale", "factor": 0.1}));
    let state = viewer.state();
    assert_eq!(state.height, MIN_CANVAS_SIZE);
    assert_eq!(state.width, 319);
    assert!((state.scale - 256.0 / 890.0).abs() < 1e-12);
}

#[test]
fn non_positive_scale_is_rejected() {
    let mut viewer = viewer();
    let err = send(&mut viewer, json!({"action": "scale", "factor": 0.0})).expect_err("zero");
    assert_eq!(err.error_code(), "E_INVALID_SCALE");
}

#[test]
fn view_after_scale_uses_unscaled_pixels() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "scale", "factor": 2.0}));
    begin_full_view(&mut viewer);
    fill_view(&mut viewer, "red");
    ok(&mut viewer, json!({"action": "endView"}));
    assert_eq!(viewer.pictures()[0].clip().width, 1110.0);
    assert_eq!(pixel(&viewer, 2210, 1770), (255, 0, 0, 255));
}

// =============================================================================
// SHELL AND OUTPUT
// =============================================================================

#[test]
fn hidden_viewer_defers_compositing_until_show() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "hide"}));
    begin_full_view(&mut viewer);
    draw_small_rect(&mut viewer);
    ok(&mut viewer, json!({"action": "endView"}));
    assert_eq!(viewer.shell().presents, 0);
    assert_eq!(viewer.state().last_picture_drawn, 0);

    ok(&mut viewer, json!({"action": "show"}));
    assert!(viewer.shell().visible);
    assert_eq!(viewer.shell().presents, 1);
    assert_eq!(viewer.state().last_picture_drawn, 1);
}

#[test]
fn show_with_nothing_new_still_presents_fresh_buffer() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "show"}));
    assert_eq!(viewer.shell().presents, 1);
    ok(&mut viewer, json!({"action": "show"}));
    assert_eq!(viewer.shell().presents, 1);
}

#[test]
fn dpi_replies_and_exit_stops() {
    let mut viewer = viewer();
    assert_eq!(send(&mut viewer, json!({"action": "dpi"})).expect("dpi"), Outcome::Reply(Response::Dpi(96.0, 96.0)));
    assert_eq!(send(&mut viewer, json!({"action": "exit"})).expect("exit"), Outcome::Exit);
}

#[test]
fn set_title_reaches_shell() {
    let mut viewer = viewer();
    ok(&mut viewer, json!({"action": "setTitle", "title": "Plot 1"}));
    assert_eq!(viewer.shell().title, "Plot 1");
}

#[test]
fn unknown_action_is_fatal() {
    let mut viewer = viewer();
    let err = send(&mut viewer, json!({"action": "explode"})).expect_err("unknown");
    assert_eq!(err.error_code(), "E_UNKNOWN_ACTION");
    assert!(err.is_fatal());
    assert_eq!(
        Response::fatal(&err),
        Response::Error("**ERROR E_UNKNOWN_ACTION: unknown command action `explode`".to_owned())
    );
}

#[test]
fn failed_save_is_not_fatal() {
    let mut viewer = viewer();
    let err = send(&mut viewer, json!({"action": "save", "filename": "scene.pdf"})).expect_err("pdf");
    assert_eq!(err.error_code(), "E_UNSUPPORTED_FORMAT");
    assert!(!err.is_fatal());
}

#[test]
fn save_writes_finalized_pictures_only() {
    let mut viewer = viewer();
    begin_full_view(&mut viewer);
    fill_view(&mut viewer, "red");
    ok(&mut viewer, json!({"action": "endView"}));
    begin_full_view(&mut viewer);
    draw_small_rect(&mut viewer);

    let path = std::env::temp_dir().join(format!("pipedview-engine-{}.svg", std::process::id()));
    ok(&mut viewer, json!({"action": "save", "filename": path.to_string_lossy(), "transparentbkg": true}));
    let doc = std::fs::read_to_string(&path).expect("svg");
    assert_eq!(doc.matches("<path").count(), 1);
    std::fs::remove_file(&path).expect("cleanup");
}
