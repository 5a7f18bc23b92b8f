//! JSON run configuration: grid shape, stress-period schedule, output options
//! and active packages of one engine run.

use crate::domain::{FieldKind, OutputError, OutputResult};
use crate::grid::GridGeometry;
use crate::output::{OutputFiles, OutputReader, RecordLayout};
use crate::schema::{
    ActivePackageSet, ConstantHeadPresence, OutputFrequencies, OutputFrequency, RunSchema,
    SimulationKind, StressPeriod,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct GridConfig {
    pub layers: usize,
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PeriodConfig {
    pub length: f64,
    pub steps: usize,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

/// Raw output flags as written in the run files: 0 off, 1 every step,
/// 2 end of period.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    pub head: i64,
    pub drawdown: i64,
    pub flow: i64,
    pub budget: i64,
    pub header_bytes: u64,
    pub files: OutputFiles,
}

impl OutputConfig {
    fn flag(&self, field: FieldKind) -> i64 {
        match field {
            FieldKind::Head => self.head,
            FieldKind::Drawdown => self.drawdown,
            FieldKind::Flow => self.flow,
            FieldKind::Budget => self.budget,
        }
    }

    pub fn frequencies(&self) -> OutputResult<OutputFrequencies> {
        let mut frequencies = OutputFrequencies::default();
        for field in FieldKind::ALL {
            let frequency = OutputFrequency::from_flag(field, self.flag(field))?;
            frequencies = frequencies.with(field, frequency);
        }
        Ok(frequencies)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub simulation: SimulationKind,
    pub periods: Vec<PeriodConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub packages: ActivePackageSet,
    /// Boundary codes indexed `[layer][row][col]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<Vec<Vec<Vec<i32>>>>,
}

/// Validated pieces needed to decode a run's output.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSetup {
    pub geometry: GridGeometry,
    pub schema: RunSchema,
    pub files: OutputFiles,
    pub header_bytes: u64,
}

impl RunSetup {
    pub fn into_reader(self, output_dir: impl Into<PathBuf>) -> OutputReader {
        OutputReader::new(output_dir, self.files, self.geometry, self.schema)
            .with_header_bytes(self.header_bytes)
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> OutputResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| OutputError::IoUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(path, &source)?;
        debug!(
            path = %path.display(),
            periods = config.periods.len(),
            packages = config.packages.len(),
            "loaded run configuration"
        );
        Ok(config)
    }

    /// Parses configuration text; `path` only labels errors.
    pub fn parse(path: &Path, source: &str) -> OutputResult<Self> {
        serde_json::from_str(source).map_err(|source| OutputError::InvalidConfiguration {
            path: path.to_path_buf(),
            message: source.to_string(),
        })
    }

    pub fn build(&self) -> OutputResult<RunSetup> {
        let geometry = GridGeometry::new(self.grid.layers, self.grid.rows, self.grid.cols)?;
        let constant_head = match &self.boundary {
            Some(layers) => {
                let codes = flatten_boundary(&geometry, layers)?;
                ConstantHeadPresence::from_boundary_codes(&geometry, &codes)?
            }
            None => ConstantHeadPresence::none(),
        };
        let periods = self
            .periods
            .iter()
            .map(|period| StressPeriod::new(period.length, period.steps, period.multiplier))
            .collect();
        let schema = RunSchema::new(
            periods,
            self.output.frequencies()?,
            self.packages.clone(),
            self.simulation,
            constant_head,
        )?;
        for field in FieldKind::ALL {
            if schema.is_produced(field) {
                RecordLayout::for_field(field, &schema).instance_bytes(&geometry)?;
            }
        }

        Ok(RunSetup {
            geometry,
            schema,
            files: self.output.files.clone(),
            header_bytes: self.output.header_bytes,
        })
    }
}

/// Flattens nested boundary codes layer-major, row-major after checking that
/// every layer and row has the grid's extent.
fn flatten_boundary(geometry: &GridGeometry, layers: &[Vec<Vec<i32>>]) -> OutputResult<Vec<i32>> {
    let expected = geometry.layers() * geometry.cell_count();
    let ragged = layers.len() != geometry.layers()
        || layers.iter().any(|rows| {
            rows.len() != geometry.rows() || rows.iter().any(|row| row.len() != geometry.cols())
        });
    let codes: Vec<i32> = layers.iter().flatten().flatten().copied().collect();
    if ragged {
        return Err(OutputError::BoundaryShapeMismatch {
            expected,
            actual: codes.len(),
        });
    }
    Ok(codes)
}
