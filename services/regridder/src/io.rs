//! Reading source documents and writing regrid results.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use grid_processor::{PipelineReport, RenderSession, SourceDataset};
use projection::{LineSegment, TransformerConfig};
use volume_common::{CartesianBounds, NativeBounds};

/// Read a JSON source dataset and check its shape.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<SourceDataset> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    let dataset: SourceDataset = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;
    dataset
        .validate()
        .with_context(|| format!("Invalid dataset: {}", path.display()))?;
    Ok(dataset)
}

/// Counts reported alongside the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub source_shape: [usize; 3],
    pub indexed_samples: usize,
    pub cells: usize,
    /// Cells mapped back to native coordinates after block refinement.
    pub evaluated: usize,
    pub inside: usize,
    pub matched: usize,
    pub filled: usize,
    pub blocks: usize,
}

/// JSON document written by the regridder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegridResult {
    /// Cells along x, y, z; arrays are x-fastest.
    pub resolution: [usize; 3],
    pub cartesian_bounds: CartesianBounds,
    pub native_bounds: NativeBounds,
    pub transformer: TransformerConfig,
    pub summary: ResultSummary,
    #[serde(with = "grid_processor::serde_nan::map")]
    pub fields: BTreeMap<String, Vec<f64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlay: Vec<[[f64; 3]; 2]>,
}

impl RegridResult {
    /// Collect the selected fields of a session. All fields when
    /// `selected` is empty.
    pub fn from_session(
        session: &RenderSession,
        report: &PipelineReport,
        transformer: &TransformerConfig,
        selected: &[String],
        overlay: &[LineSegment],
    ) -> Result<Self> {
        let names: Vec<String> = if selected.is_empty() {
            session.field_names().into_iter().map(String::from).collect()
        } else {
            selected.to_vec()
        };

        let mut fields = BTreeMap::new();
        for name in names {
            let values = session
                .field(&name)
                .with_context(|| format!("Unknown output field: {}", name))?;
            fields.insert(name, values.to_vec());
        }

        let grid = session.grid();
        let shape = report.source_shape;
        Ok(Self {
            resolution: grid.resolution(),
            cartesian_bounds: *grid.bounds(),
            native_bounds: *session.native_bounds(),
            transformer: transformer.clone(),
            summary: ResultSummary {
                source_shape: [shape.levels, shape.latitudes, shape.longitudes],
                indexed_samples: report.indexed_samples,
                cells: report.stats.cells,
                evaluated: report.stats.evaluated,
                inside: report.stats.inside,
                matched: report.stats.matched,
                filled: report.stats.filled,
                blocks: report.stats.blocks,
            },
            fields,
            overlay: overlay
                .iter()
                .map(|[a, b]| [[a.x, a.y, a.z], [b.x, b.y, b.z]])
                .collect(),
        })
    }
}

/// Write a result document, creating parent directories.
pub fn write_result<P: AsRef<Path>>(path: P, result: &RegridResult, pretty: bool) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output: {}", path.display()))?;
    let writer = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(writer, result)?;
    } else {
        serde_json::to_writer(writer, result)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_processor::{build_session, GridProcessorConfig, VerticalCoordinate};
    use test_utils::{create_test_volume, grids, linspace, temp_test_dir, temp_test_dir_with_prefix};

    fn small_dataset() -> SourceDataset {
        SourceDataset::new(
            linspace(0.0, 3000.0, 3),
            linspace(-2.0, 2.0, 3),
            linspace(-92.0, -86.0, 4),
        )
        .with_field("QV", create_test_volume(3, 3, 4))
    }

    #[test]
    fn test_read_dataset() {
        let dir = temp_test_dir();
        let path = dir.path().join("ds.json");
        fs::write(&path, serde_json::to_string(&small_dataset()).unwrap()).unwrap();

        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.shape().len(), 36);

        fs::write(&path, r#"{"levels":[0],"latitudes":[0],"longitudes":[0],"fields":{"QV":[1,2]}}"#)
            .unwrap();
        assert!(read_dataset(&path).is_err());
        assert!(read_dataset(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_write_result_roundtrip() {
        let mut config = GridProcessorConfig::default();
        config.vertical = VerticalCoordinate::Level;
        config.resolution = grids::SMALL_RESOLUTION;
        let bounds = NativeBounds::new([0.0, 3000.0], [-2.0, 2.0], [-92.0, -86.0]).unwrap();
        let (session, report) = build_session(&small_dataset(), &bounds, &config).unwrap();

        let result =
            RegridResult::from_session(&session, &report, &config.transformer, &[], &[]).unwrap();
        assert_eq!(result.fields["QV"].len(), 4096);

        let dir = temp_test_dir_with_prefix("regridder_");
        let path = dir.path().join("out/result.json");
        write_result(&path, &result, true).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        // fill cells outside the shell are NaN and written as null
        assert!(text.contains("null"));
        let back: RegridResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back.resolution, grids::SMALL_RESOLUTION);
        assert_eq!(back.summary, result.summary);
    }

    #[test]
    fn test_unknown_output_field() {
        let mut config = GridProcessorConfig::default();
        config.vertical = VerticalCoordinate::Level;
        config.resolution = [2, 2, 2];
        let bounds = NativeBounds::new([0.0, 3000.0], [-2.0, 2.0], [-92.0, -86.0]).unwrap();
        let (session, report) = build_session(&small_dataset(), &bounds, &config).unwrap();

        let err = RegridResult::from_session(
            &session,
            &report,
            &config.transformer,
            &["dQV_n".to_string()],
            &[],
        );
        assert!(err.is_err());
    }
}
