//! End-to-end tests of the regridding pipeline on synthetic reanalysis
//! data.

use grid_processor::{
    build_session, AggregateSpec, AggregationOp, DerivedFieldSpec, GridProcessorConfig,
    RefineConfig, SourceDataset,
};
use test_utils::{
    assert_approx_eq, create_constant_volume, create_height_volume, create_humidity_volume,
    fields, grids, linspace, with_nans,
};
use volume_common::NativeBounds;

const LEVELS: usize = 6;
const LATS: usize = 9;
const LONS: usize = 12;

fn merra_like() -> SourceDataset {
    let qv = with_nans(create_humidity_volume(LEVELS, LATS, LONS), &[5, 77, 300]);
    let rh: Vec<f64> = (0..LEVELS * LATS * LONS)
        .map(|i| if i % 7 == 0 { 0.0 } else { (i % 100) as f64 / 100.0 })
        .collect();

    SourceDataset::new(
        linspace(1000.0, 500.0, LEVELS),
        linspace(-20.0, 20.0, LATS),
        // positive longitudes crossing the prime meridian: 330..385 -> -30..25
        linspace(330.0, 385.0, LONS).into_iter().map(|l| l % 360.0).collect(),
    )
    .with_heights(create_height_volume(LEVELS, LATS, LONS, 0.0, 2000.0))
    .with_field(fields::QV, qv)
    .with_field(fields::RH, rh)
}

fn bounds() -> NativeBounds {
    NativeBounds::new([0.0, 10_000.0], [-20.0, 20.0], [-30.0, 25.0]).unwrap()
}

fn config() -> GridProcessorConfig {
    let mut config = GridProcessorConfig::humidity();
    config.resolution = [12, 12, 12];
    config.resample.fill_value = -999.0;
    config.refine = RefineConfig {
        enabled: true,
        refine_by: 2,
        min_block_size: 2,
        max_iterations: 2000,
    };
    config
}

fn same(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()))
}

#[test]
fn test_level_altitudes_follow_heights() {
    let altitudes = merra_like().level_altitudes().unwrap();
    assert_eq!(altitudes.len(), LEVELS);
    for (k, alt) in altitudes.iter().enumerate() {
        assert_approx_eq!(*alt, k as f64 * 2000.0, 20.0);
    }
}

#[test]
fn test_refinement_matches_unrefined() {
    let ds = merra_like();
    let refined_config = config();
    let mut plain_config = config();
    plain_config.refine = RefineConfig::disabled();

    let (refined, refined_report) = build_session(&ds, &bounds(), &refined_config).unwrap();
    let (plain, plain_report) = build_session(&ds, &bounds(), &plain_config).unwrap();

    assert_eq!(refined_report.stats.matched, plain_report.stats.matched);
    assert_eq!(refined_report.stats.inside, plain_report.stats.inside);
    assert!(refined_report.stats.blocks >= plain_report.stats.blocks);

    // Dropped blocks are never mapped back or looked up
    assert_eq!(plain_report.stats.evaluated, plain_report.stats.cells);
    assert!(
        refined_report.stats.evaluated < plain_report.stats.evaluated,
        "refined pass evaluated {} of {} cells",
        refined_report.stats.evaluated,
        plain_report.stats.evaluated
    );
    assert!(refined_report.stats.evaluated >= refined_report.stats.inside);

    for name in plain.field_names() {
        assert!(
            same(plain.field(name).unwrap(), refined.field(name).unwrap()),
            "field {name} differs"
        );
    }
}

#[test]
fn test_cells_outside_bounds_are_filled() {
    let (session, report) = build_session(&merra_like(), &bounds(), &config()).unwrap();
    let transformer = session.transformer();
    let convention = transformer.convention();
    let grid = session.grid();
    let qv = grid.field(fields::QV).unwrap();

    let mut outside = 0;
    for (flat, value) in qv.iter().enumerate() {
        let center = grid.cell_center_flat(flat).unwrap();
        let native = transformer.to_native(&center);
        if session.native_bounds().contains(&native, convention) {
            assert_ne!(*value, -999.0, "inside cell {flat} was filled");
        } else {
            assert_eq!(*value, -999.0, "outside cell {flat} was not filled");
            outside += 1;
        }
    }

    assert!(outside > 0, "grid should have corners outside the shell");
    assert_eq!(report.stats.filled, outside);
    assert_eq!(report.stats.cells, 12 * 12 * 12);
}

#[test]
fn test_humidity_derived_fields() {
    let (session, report) = build_session(&merra_like(), &bounds(), &config()).unwrap();
    assert_eq!(report.aggregate_fields, vec!["QV_mean", "QV_max", "QV_min"]);

    let qv_n = session.field("QV_n").unwrap();
    let dqv_n = session.field("dQV_n").unwrap();
    let rh = session.field("RH_filtered").unwrap();

    assert!(qv_n.iter().all(|v| v.is_finite()));
    assert!(dqv_n.iter().all(|v| v.is_finite() && *v >= 0.0));

    // Only zero and non-finite values are floored; fill cells pass through
    let rh_raw = session.field(fields::RH).unwrap();
    for (raw, filtered) in rh_raw.iter().zip(rh) {
        assert!(filtered.is_finite() && *filtered != 0.0);
        if *raw == -999.0 {
            assert_eq!(*filtered, -999.0);
        } else {
            assert!(*filtered > 0.0);
        }
    }

    // fill value cells have min == max, so the fraction is 0
    let qv = session.field(fields::QV).unwrap();
    for (raw, frac) in qv.iter().zip(dqv_n) {
        if *raw == -999.0 {
            assert_eq!(*frac, 0.0);
        }
    }
}

#[test]
fn test_aggregates_bracket_values() {
    let mut config = config();
    config.derived.clear();
    config.aggregates = vec![AggregateSpec {
        field: fields::QV.to_string(),
        ops: vec![AggregationOp::Min, AggregationOp::Max],
    }];

    let (session, _) = build_session(&merra_like(), &bounds(), &config).unwrap();
    let qv = session.field(fields::QV).unwrap();
    let lo = session.field("QV_min").unwrap();
    let hi = session.field("QV_max").unwrap();

    for i in 0..qv.len() {
        if qv[i] == -999.0 || qv[i].is_nan() {
            continue;
        }
        assert!(lo[i] <= qv[i] && qv[i] <= hi[i], "cell {i}");
    }
}

#[test]
fn test_set_raw_field_updates_derived() {
    let mut config = config();
    config.derived = vec![DerivedFieldSpec::floor_protected("RH_filtered", fields::RH)];
    let (mut session, _) = build_session(&merra_like(), &bounds(), &config).unwrap();

    let cells = session.grid().len();
    session.set_raw_field(fields::RH, vec![0.0; cells]).unwrap();
    assert!(session
        .field("RH_filtered")
        .unwrap()
        .iter()
        .all(|&v| v == 1e-12));
}

#[test]
fn test_missing_aggregate_field() {
    let mut config = config();
    config.aggregates = vec![AggregateSpec {
        field: "T".to_string(),
        ops: vec![AggregationOp::Mean],
    }];
    assert!(build_session(&merra_like(), &bounds(), &config).is_err());
}

#[test]
fn test_constant_field_has_zero_fraction() {
    let ds = merra_like().with_field(fields::QV, create_constant_volume(LEVELS, LATS, LONS, 0.01));
    let mut config = config();
    config.resolution = grids::SMALL_RESOLUTION;

    let (session, report) = build_session(&ds, &bounds(), &config).unwrap();
    assert_eq!(report.stats.cells, 16 * 16 * 16);

    // min == max on every level, so no division and no fraction
    assert!(session.field("dQV_n").unwrap().iter().all(|&v| v == 0.0));
    let qv_n = session.field("QV_n").unwrap();
    assert!(qv_n.iter().all(|&v| v == 0.01 || v == -999.0));
}
