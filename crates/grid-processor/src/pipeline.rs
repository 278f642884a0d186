//! End-to-end regridding pass.

use tracing::info;

use projection::GeocentricTransformer;
use volume_common::{GridShape, NativeBounds};

use crate::config::GridProcessorConfig;
use crate::error::Result;
use crate::render_grid::RenderGrid;
use crate::resample::{GridResampler, ResampleStats};
use crate::session::RenderSession;
use crate::source::SourceDataset;

/// Summary of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub source_shape: GridShape,
    /// Samples held by the nearest-neighbour lookup.
    pub indexed_samples: usize,
    pub aggregate_fields: Vec<String>,
    pub stats: ResampleStats,
}

/// Add aggregates, resample onto a grid covering `bounds` and compute the
/// derived fields.
pub fn build_session(
    dataset: &SourceDataset,
    bounds: &NativeBounds,
    config: &GridProcessorConfig,
) -> Result<(RenderSession, PipelineReport)> {
    config.validate()?;
    dataset.validate()?;

    let transformer = GeocentricTransformer::new(&config.transformer)?;
    let convention = transformer.convention();

    let mut aggregates: Vec<(String, Vec<f64>)> = Vec::new();
    for aggregate in &config.aggregates {
        aggregates.extend(dataset.horizontal_aggregates(
            &aggregate.field,
            bounds,
            &aggregate.ops,
            convention,
        )?);
    }
    let aggregate_fields: Vec<String> = aggregates.iter().map(|(name, _)| name.clone()).collect();

    // Raw and aggregate columns are borrowed, never copied
    let set = dataset.samples(config.vertical, convention, config.mask_field.as_deref())?;
    let columns = dataset
        .fields
        .iter()
        .map(|(name, values)| (name.as_str(), values.as_slice()))
        .chain(
            aggregates
                .iter()
                .map(|(name, values)| (name.as_str(), values.as_slice())),
        );
    let resampler = GridResampler::build(set, columns, &config.resample)?;

    let mut grid = RenderGrid::covering(&transformer, bounds, config.resolution)?;
    let stats = resampler.resample_refined(&mut grid, &transformer, bounds, &config.refine)?;

    let session = RenderSession::new(transformer, *bounds, grid, config.derived.clone())?;

    info!(
        source = %dataset.shape(),
        resolution = ?config.resolution,
        raw_fields = resampler.field_names().len(),
        derived_fields = session.derived().len(),
        "Built render session"
    );

    let report = PipelineReport {
        source_shape: dataset.shape(),
        indexed_samples: resampler.len(),
        aggregate_fields,
        stats,
    };

    Ok((session, report))
}
