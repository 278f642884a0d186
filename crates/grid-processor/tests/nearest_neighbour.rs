//! Nearest-neighbour lookup behaviour on synthetic source grids.

use grid_processor::{
    AxisNormalization, GridProcessorConfig, GridProcessorError, GridResampler, LookupMethod,
    ResampleConfig, SourceDataset, SourceSample, SpatialIndex, VerticalCoordinate,
};
use test_utils::{create_height_volume, create_test_volume, linspace, with_nans};
use volume_common::{GridShape, LongitudeConvention, NativeCoordinate};

/// Dataset whose radial coordinate is the level value itself.
fn level_dataset(levels: &[f64], lats: &[f64], lons: &[f64], values: Vec<f64>) -> SourceDataset {
    SourceDataset::new(levels.to_vec(), lats.to_vec(), lons.to_vec()).with_field("v", values)
}

fn level_config(lookup: LookupMethod) -> GridProcessorConfig {
    GridProcessorConfig {
        vertical: VerticalCoordinate::Level,
        resample: ResampleConfig {
            lookup,
            ..ResampleConfig::default()
        },
        ..GridProcessorConfig::default()
    }
}

// =============================================================================
// 2x2x2 Grid
// =============================================================================

#[test]
fn test_exact_node_returns_node_value() {
    let axis = [0.0, 10.0];
    let ds = level_dataset(&axis, &axis, &axis, create_test_volume(2, 2, 2));
    let r = GridResampler::from_dataset(&ds, &level_config(LookupMethod::KdTree)).unwrap();

    for level in 0..2 {
        for lat in 0..2 {
            for lon in 0..2 {
                let target = NativeCoordinate::new(axis[level], axis[lat], axis[lon]);
                let cell = r.query_cell_values(&[target])[0].clone().unwrap();
                let expected = (level * 10000 + lat * 100 + lon) as f64;
                assert_eq!(cell.values, vec![expected]);
                assert_eq!(cell.distance, 0.0);
            }
        }
    }
}

#[test]
fn test_midpoint_returns_either_neighbour() {
    let axis = [0.0, 10.0];
    let ds = level_dataset(&axis, &axis, &axis, create_test_volume(2, 2, 2));
    let r = GridResampler::from_dataset(&ds, &level_config(LookupMethod::KdTree)).unwrap();

    // halfway between (0, 0, 0) and (10, 0, 0)
    let target = NativeCoordinate::new(5.0, 0.0, 0.0);
    let first = r.query_cell_values(&[target])[0].clone().unwrap();
    assert!(first.values == vec![0.0] || first.values == vec![10000.0]);
    assert_eq!(first.distance, 5.0);

    for _ in 0..5 {
        let again = r.query_cell_values(&[target])[0].clone().unwrap();
        assert_eq!(again.flat_index, first.flat_index);
    }
}

// =============================================================================
// Exclusion of non-finite samples
// =============================================================================

#[test]
fn test_seven_of_ten_indexed() {
    let lons = linspace(0.0, 9.0, 10);
    let values = with_nans(create_test_volume(1, 1, 10), &[1, 4, 9]);
    let ds = level_dataset(&[0.0], &[0.0], &lons, values);

    let set = ds
        .samples(VerticalCoordinate::Level, LongitudeConvention::Signed, None)
        .unwrap();
    let index = SpatialIndex::build(&set.samples, set.shape, AxisNormalization::None).unwrap();
    assert_eq!(index.len(), 7);
    assert_eq!(index.excluded(), 3);

    for lon in linspace(-2.0, 11.0, 131) {
        let m = index.nearest(&NativeCoordinate::new(0.0, 0.0, lon)).unwrap();
        assert!(![1, 4, 9].contains(&m.flat_index), "lon {lon} matched {}", m.flat_index);
    }
}

#[test]
fn test_all_non_finite_is_empty_index() {
    let values = vec![f64::NAN; 8];
    let axis = [0.0, 1.0];
    let ds = level_dataset(&axis, &axis, &axis, values);
    let err = GridResampler::from_dataset(&ds, &level_config(LookupMethod::KdTree)).unwrap_err();
    assert!(matches!(err, GridProcessorError::EmptyIndex { total: 8 }));
}

// =============================================================================
// Layered grids against brute force
// =============================================================================

fn brute_force_distance(samples: &[SourceSample], target: &NativeCoordinate) -> f64 {
    samples
        .iter()
        .filter(|s| s.finite)
        .map(|s| {
            let d = [
                s.coordinate.radial - target.radial,
                s.coordinate.latitude - target.latitude,
                s.coordinate.longitude - target.longitude,
            ];
            d.iter().map(|v| v * v).sum::<f64>()
        })
        .fold(f64::INFINITY, f64::min)
        .sqrt()
}

#[test]
fn test_kdtree_matches_brute_force_on_layered_grid() {
    const LEVELS: usize = 12;
    const LATS: usize = 30;
    const LONS: usize = 40;
    let holes = [7, 1234, 9001];

    // Every node of a level shares one radial value
    let ds = SourceDataset::new(
        linspace(1000.0, 100.0, LEVELS),
        linspace(-60.0, 60.0, LATS),
        linspace(0.0, 351.0, LONS),
    )
    .with_heights(create_height_volume(LEVELS, LATS, LONS, 0.0, 1500.0))
    .with_field("v", with_nans(create_test_volume(LEVELS, LATS, LONS), &holes));

    for vertical in [VerticalCoordinate::LevelMean, VerticalCoordinate::Level] {
        let set = ds
            .samples(vertical, LongitudeConvention::Signed, None)
            .unwrap();
        let index = SpatialIndex::build(&set.samples, set.shape, AxisNormalization::None).unwrap();
        assert_eq!(index.len(), LEVELS * LATS * LONS - holes.len());

        let radial = &set.axes.as_ref().unwrap().radial;
        let r_lo = radial.iter().copied().fold(f64::INFINITY, f64::min);
        let r_hi = radial.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        for q in 0..500 {
            let t = q as f64;
            let target = NativeCoordinate::new(
                r_lo + (r_hi - r_lo) * ((t * 0.618_034) % 1.0),
                -65.0 + 130.0 * ((t * 0.414_214) % 1.0),
                -180.0 + 360.0 * ((t * 0.732_051) % 1.0),
            );
            let found = index.nearest(&target).unwrap();
            let expected = brute_force_distance(&set.samples, &target);
            assert!(
                (found.distance - expected).abs() <= 1e-9 * expected.max(1.0),
                "{vertical}: query {q} found {} expected {}",
                found.distance,
                expected
            );
            assert!(!holes.contains(&found.flat_index));
        }
    }
}

// =============================================================================
// Rectilinear lookup
// =============================================================================

#[test]
fn test_rectilinear_matches_kdtree_on_grid_nodes() {
    let levels = [0.0, 1500.0, 3200.0, 5000.0];
    let lats = linspace(-10.0, 10.0, 5);
    let lons = linspace(-30.0, 20.0, 6);
    let values = with_nans(create_test_volume(4, 5, 6), &[3, 17, 44, 101]);
    let ds = level_dataset(&levels, &lats, &lons, values);

    let kd = GridResampler::from_dataset(&ds, &level_config(LookupMethod::KdTree)).unwrap();
    let rect = GridResampler::from_dataset(&ds, &level_config(LookupMethod::Rectilinear)).unwrap();
    assert_eq!(rect.lookup_name(), "rectilinear");

    let mut targets = Vec::new();
    for &r in &levels {
        for &lat in &lats {
            for &lon in &lons {
                targets.push(NativeCoordinate::new(r, lat, lon));
            }
        }
    }

    let a = kd.query_cell_values(&targets);
    let b = rect.query_cell_values(&targets);
    for (i, (x, y)) in a.iter().zip(&b).enumerate() {
        let (x, y) = (x.as_ref().unwrap(), y.as_ref().unwrap());
        assert_eq!(x.flat_index, y.flat_index, "target {i}");
        assert_eq!(x.values, y.values);
    }
}

#[test]
fn test_rectilinear_matches_kdtree_between_nodes() {
    let levels = linspace(0.0, 9.0, 4);
    let lats = linspace(-9.0, 9.0, 7);
    let lons = linspace(0.0, 15.0, 6);
    let ds = level_dataset(&levels, &lats, &lons, create_test_volume(4, 7, 6));

    let kd = GridResampler::from_dataset(&ds, &level_config(LookupMethod::KdTree)).unwrap();
    let rect = GridResampler::from_dataset(&ds, &level_config(LookupMethod::Rectilinear)).unwrap();

    // offsets well away from the half-spacing ties
    let mut targets = Vec::new();
    for &r in &levels {
        for &lat in &lats {
            for &lon in &lons {
                targets.push(NativeCoordinate::new(r + 0.7, lat - 0.9, lon + 1.1));
            }
        }
    }

    let a = kd.query_cell_values(&targets);
    let b = rect.query_cell_values(&targets);
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(
            x.as_ref().unwrap().flat_index,
            y.as_ref().unwrap().flat_index
        );
    }
}

// =============================================================================
// Distance cutoff and raw queries
// =============================================================================

#[test]
fn test_max_match_distance() {
    let axis = [0.0, 10.0];
    let ds = level_dataset(&axis, &axis, &axis, create_test_volume(2, 2, 2));
    let mut config = level_config(LookupMethod::KdTree);
    config.resample.max_match_distance = Some(2.0);
    let r = GridResampler::from_dataset(&ds, &config).unwrap();

    let near = NativeCoordinate::new(1.0, 1.0, 1.0);
    let far = NativeCoordinate::new(5.0, 5.0, 5.0);
    let out = r.query_cell_values(&[near, far]);
    assert!(out[0].is_some());
    assert!(out[1].is_none());
}

#[test]
fn test_query_flat_axis_count() {
    let axis = [0.0, 10.0];
    let ds = level_dataset(&axis, &axis, &axis, create_test_volume(2, 2, 2));
    let r = GridResampler::from_dataset(&ds, &level_config(LookupMethod::KdTree)).unwrap();

    assert!(matches!(
        r.query_flat(&[0.0, 0.0, 0.0, 0.0], 4),
        Err(GridProcessorError::DimensionMismatch(_))
    ));
    assert_eq!(r.shape(), GridShape::new(2, 2, 2));
}
