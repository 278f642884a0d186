//! Round-trip and scale-invariance properties of the geocentric transform.

use projection::{GeocentricTransformer, RadialType, TransformerConfig, EARTH_RADIUS_M};
use test_utils::{assert_rel_eq, assert_triple_approx_eq, bounds, linspace};
use volume_common::{CartesianBounds, NativeBounds, NativeCoordinate};

fn transformer(scale: f64, radial_type: RadialType, negative: bool) -> GeocentricTransformer {
    GeocentricTransformer::new(&TransformerConfig {
        reference_radius: EARTH_RADIUS_M,
        radial_scale_factor: scale,
        use_negative_longitudes: negative,
        radial_type,
    })
    .unwrap()
}

#[test]
fn test_round_trip_grid() {
    let t = transformer(10.0, RadialType::Altitude, true);

    for radial in linspace(-50_000.0, 70_000.0, 7) {
        for lat in linspace(-89.0, 89.0, 9) {
            for lon in linspace(-179.0, 180.0, 13) {
                let native = t.to_native(&t.to_transformed(radial, lat, lon));
                assert_rel_eq!(native.radial, radial, 1e-9);
                assert_rel_eq!(native.latitude, lat, 1e-9);
                assert_rel_eq!(native.longitude, lon, 1e-9);
            }
        }
    }
}

#[test]
fn test_round_trip_positive_convention() {
    let t = transformer(1.0, RadialType::Altitude, false);

    for lon in linspace(0.0, 355.0, 72) {
        let native = t.to_native(&t.to_transformed(1000.0, 30.0, lon));
        assert_rel_eq!(native.longitude, lon, 1e-9);
    }
}

#[test]
fn test_round_trip_radius_type() {
    let t = transformer(2.0, RadialType::Radius, true);
    let native = t.to_native(&t.to_transformed(3_000_000.0, -45.0, 120.0));
    assert_rel_eq!(native.radial, 3_000_000.0, 1e-9);
    assert_rel_eq!(native.latitude, -45.0, 1e-9);
    assert_rel_eq!(native.longitude, 120.0, 1e-9);
}

#[test]
fn test_longitudes_above_180_wrap() {
    let t = transformer(1.0, RadialType::Altitude, true);
    let native = t.to_native(&t.to_transformed(0.0, 10.0, 270.0));
    assert_rel_eq!(native.longitude, -90.0, 1e-9);
}

#[test]
fn test_scale_invariance() {
    for scale in [0.5, 1.0, 10.0, 250.0] {
        let scaled = transformer(scale, RadialType::Altitude, true);
        let unit = transformer(1.0, RadialType::Altitude, true);

        for radial in linspace(0.0, 68_000.0, 5) {
            for (lat, lon) in [(0.0, 0.0), (45.0, -120.0), (-60.0, 170.0)] {
                let a = scaled.to_transformed(radial, lat, lon);
                let b = unit.to_transformed(radial * scale, lat, lon);
                assert_triple_approx_eq!((a.x, a.y, a.z), (b.x, b.y, b.z), 1e-6);
            }
        }
    }
}

#[test]
fn test_batch_matches_single() {
    let t = transformer(10.0, RadialType::Altitude, true);
    let coords: Vec<_> = linspace(-80.0, 80.0, 33)
        .into_iter()
        .map(|lat| NativeCoordinate::new(1000.0, lat, lat * 2.0))
        .collect();

    let points = t.to_transformed_many(&coords);
    let back = t.to_native_many(&points);
    for (c, n) in coords.iter().zip(&back) {
        assert_rel_eq!(n.latitude, c.latitude, 1e-9);
        assert_rel_eq!(n.longitude, c.longitude, 1e-9);
    }
}

#[test]
fn test_cartesian_bounds_enclose_fixture_regions() {
    let t = transformer(10.0, RadialType::Altitude, true);

    for (radial, lat, lon) in [
        bounds::WESTERN_NORTH_AMERICA,
        bounds::EQUATORIAL_COLUMN,
        bounds::GLOBAL,
    ] {
        let native = NativeBounds::new(radial, lat, lon).unwrap();
        let cart = t.cartesian_bounds(&native).unwrap();

        for r in linspace(radial[0], radial[1], 4) {
            for la in linspace(lat[0], lat[1], 9) {
                for lo in linspace(lon[0], lon[1], 9) {
                    let p = t.to_transformed(r, la, lo);
                    for (axis, v) in [p.x, p.y, p.z].into_iter().enumerate() {
                        assert!(v >= cart.min[axis] - 1e-6 && v <= cart.max[axis] + 1e-6);
                    }
                }
            }
        }
    }
}

#[test]
fn test_native_envelope_encloses_box_points() {
    for radial_type in [RadialType::Altitude, RadialType::Depth] {
        let t = transformer(10.0, radial_type, true);

        for half in [3.0e5, 3.0e6] {
            for lat in linspace(-80.0, 90.0, 6) {
                for lon in linspace(-170.0, 180.0, 8) {
                    let c = t.to_transformed(5_000.0, lat, lon);
                    let cart = CartesianBounds::new(
                        [c.x - half, c.y - half, c.z - half],
                        [c.x + half, c.y + half, c.z + half],
                    );
                    let env = t.native_envelope(&cart);

                    for x in linspace(cart.min[0], cart.max[0], 5) {
                        for y in linspace(cart.min[1], cart.max[1], 5) {
                            for z in linspace(cart.min[2], cart.max[2], 5) {
                                let n = t.to_native_xyz(x, y, z);
                                let point = NativeBounds::new(
                                    [n.radial, n.radial],
                                    [n.latitude, n.latitude],
                                    [n.longitude, n.longitude],
                                )
                                .unwrap();
                                assert!(
                                    env.intersects(&point),
                                    "{:?} outside {:?}",
                                    n,
                                    env
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}
