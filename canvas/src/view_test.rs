#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn full_frac() -> Sides {
    Sides::new(0.0, 0.0, 1.0, 1.0)
}

fn thousand() -> Sides {
    Sides::new(0.0, 0.0, 1000.0, 1000.0)
}

/// Map a Y-up user point all the way to device pixels.
fn to_device(geometry: &ViewGeometry, x: f64, y: f64) -> Point {
    geometry.transform.map(geometry.adjust(Point::new(x, y)))
}

// --- Coordinate mapper ---

#[test]
fn adjust_flips_against_user_top() {
    let flipped = adjust(Point::new(100.0, 900.0), 1000.0);
    assert_eq!(flipped, Point::new(100.0, 100.0));
}

#[test]
fn adjust_leaves_x_untouched() {
    let flipped = adjust(Point::new(-42.5, 3.0), 10.0);
    assert_eq!(flipped.x, -42.5);
    assert_eq!(flipped.y, 7.0);
}

#[test]
fn geometry_adjust_uses_view_top() {
    let geometry = build_view(&full_frac(), &thousand(), 1000, 1000, 1.0).expect("view");
    assert_eq!(geometry.user_ymax, 1000.0);
    assert_eq!(geometry.adjust(Point::new(100.0, 900.0)), Point::new(100.0, 100.0));
}

// --- Sides ---

#[test]
fn sides_missing_keys_default_to_zero() {
    let sides: Sides = serde_json::from_value(serde_json::json!({"right": 5.0, "top": 2})).expect("sides");
    assert_eq!(sides, Sides::new(0.0, 0.0, 5.0, 2.0));
}

// --- Transform builder ---

#[test]
fn full_view_maps_user_corners_to_canvas_corners() {
    let geometry = build_view(&full_frac(), &thousand(), 1110, 890, 1.0).expect("view");
    assert!(point_approx_eq(to_device(&geometry, 0.0, 0.0), Point::new(0.0, 890.0)));
    assert!(point_approx_eq(to_device(&geometry, 1000.0, 0.0), Point::new(1110.0, 890.0)));
    assert!(point_approx_eq(to_device(&geometry, 0.0, 1000.0), Point::new(0.0, 0.0)));
    assert!(point_approx_eq(to_device(&geometry, 1000.0, 1000.0), Point::new(1110.0, 0.0)));
}

#[test]
fn sub_view_maps_user_corners_onto_device_rect_corners() {
    let cases = [
        (Sides::new(0.0, 0.5, 0.5, 1.0), Sides::new(0.0, 0.0, 1000.0, 1000.0)),
        (Sides::new(0.05, 0.05, 0.95, 0.95), Sides::new(-3.0, 10.0, 7.0, 12.5)),
        (Sides::new(0.25, 0.1, 0.3, 0.9), Sides::new(100.0, -50.0, 400.0, -10.0)),
    ];
    for (frac, user) in cases {
        let geometry = build_view(&frac, &user, 800, 600, 1.0).expect("view");
        let device = geometry.device;
        assert!(point_approx_eq(to_device(&geometry, user.left, user.top), Point::new(device.x, device.y)));
        assert!(point_approx_eq(
            to_device(&geometry, user.right, user.top),
            Point::new(device.right(), device.y)
        ));
        assert!(point_approx_eq(
            to_device(&geometry, user.left, user.bottom),
            Point::new(device.x, device.bottom())
        ));
        assert!(point_approx_eq(
            to_device(&geometry, user.right, user.bottom),
            Point::new(device.right(), device.bottom())
        ));
    }
}

#[test]
fn device_rect_is_top_down() {
    let geometry =
        build_view(&Sides::new(0.0, 0.5, 0.5, 1.0), &thousand(), 1000, 800, 1.0).expect("view");
    assert_eq!(geometry.device, Rect::new(0.0, 0.0, 500.0, 400.0));
}

#[test]
fn scale_factor_shrinks_unscaled_canvas() {
    let geometry = build_view(&full_frac(), &thousand(), 2000, 1600, 2.0).expect("view");
    assert_eq!(geometry.device, Rect::new(0.0, 0.0, 1000.0, 800.0));
}

#[test]
fn window_rect_starts_at_zero_y() {
    let geometry = build_view(&full_frac(), &Sides::new(5.0, 20.0, 15.0, 60.0), 100, 100, 1.0).expect("view");
    assert_eq!(geometry.window, Rect::new(5.0, 0.0, 10.0, 40.0));
}

#[test]
fn inverted_fractions_fail() {
    let err = build_view(&Sides::new(0.6, 0.0, 0.4, 1.0), &thousand(), 100, 100, 1.0).expect_err("invalid");
    assert!(matches!(err, ViewError::InvalidViewBounds { sides: "left, right", .. }));
}

#[test]
fn fractions_beyond_canvas_fail() {
    let err = build_view(&Sides::new(0.0, 0.0, 1.0, 1.5), &thousand(), 100, 100, 1.0).expect_err("invalid");
    assert!(matches!(err, ViewError::InvalidViewBounds { sides: "bottom, top", .. }));
    let err = build_view(&Sides::new(-0.1, 0.0, 1.0, 1.0), &thousand(), 100, 100, 1.0).expect_err("invalid");
    assert!(matches!(err, ViewError::InvalidViewBounds { sides: "left, right", .. }));
}

#[test]
fn degenerate_fractions_fail() {
    let err = build_view(&Sides::new(0.0, 0.3, 1.0, 0.3), &thousand(), 100, 100, 1.0).expect_err("invalid");
    assert!(matches!(err, ViewError::InvalidViewBounds { .. }));
}

#[test]
fn inverted_user_sides_fail() {
    let err = build_view(&full_frac(), &Sides::new(10.0, 0.0, 0.0, 1.0), 100, 100, 1.0).expect_err("invalid");
    assert!(matches!(err, ViewError::InvalidUserBounds { sides: "left, right", .. }));
    let err = build_view(&full_frac(), &Sides::new(0.0, 1.0, 10.0, 1.0), 100, 100, 1.0).expect_err("invalid");
    assert!(matches!(err, ViewError::InvalidUserBounds { sides: "bottom, top", .. }));
}

#[test]
fn nan_fraction_fails() {
    let err = build_view(&Sides::new(f64::NAN, 0.0, 1.0, 1.0), &thousand(), 100, 100, 1.0).expect_err("invalid");
    assert!(matches!(err, ViewError::InvalidViewBounds { .. }));
}

// --- Affine ---

#[test]
fn then_applies_inner_transform_first() {
    let inner = Affine { sx: 2.0, sy: 3.0, tx: 1.0, ty: -1.0 };
    let outer = Affine::placement(Point::new(10.0, 20.0), 0.5);
    let p = Point::new(4.0, 5.0);
    assert!(point_approx_eq(inner.then(outer).map(p), outer.map(inner.map(p))));
}

#[test]
fn placement_offsets_before_scaling() {
    let placement = Affine::placement(Point::new(10.0, 20.0), 2.0);
    assert_eq!(placement.map(Point::new(1.0, 1.0)), Point::new(22.0, 42.0));
}

#[test]
fn identity_leaves_points_alone() {
    let p = Point::new(3.5, -7.25);
    assert_eq!(Affine::IDENTITY.map(p), p);
}

#[test]
fn map_rect_normalizes_negative_scale() {
    let flip = Affine { sx: -1.0, sy: 1.0, tx: 0.0, ty: 0.0 };
    let mapped = flip.map_rect(Rect::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(mapped, Rect::new(-4.0, 2.0, 3.0, 4.0));
}
