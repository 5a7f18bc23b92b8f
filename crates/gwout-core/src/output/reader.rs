use super::cursor::OutputCursor;
use super::decoder::{BudgetSnapshot, DecodedField, FieldDecoder, FlowComponents, SeriesPoint};
use super::files::OutputFiles;
use crate::domain::{FieldKind, OutputCoordinate, OutputError, OutputResult};
use crate::grid::{GridGeometry, LayerGrid};
use crate::schema::RunSchema;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decodes fields out of one engine output directory.
///
/// Every request opens its own read-only handle and drops it before
/// returning, so a reader can be shared across threads by reference.
#[derive(Debug, Clone)]
pub struct OutputReader {
    output_dir: PathBuf,
    files: OutputFiles,
    geometry: GridGeometry,
    schema: RunSchema,
    header_bytes: u64,
}

impl OutputReader {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        files: OutputFiles,
        geometry: GridGeometry,
        schema: RunSchema,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            files,
            geometry,
            schema,
            header_bytes: 0,
        }
    }

    pub fn with_header_bytes(mut self, header_bytes: u64) -> Self {
        self.header_bytes = header_bytes;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub const fn schema(&self) -> &RunSchema {
        &self.schema
    }

    pub fn decoder(&self) -> FieldDecoder<'_> {
        FieldDecoder::new(&self.geometry, &self.schema).with_header_bytes(self.header_bytes)
    }

    pub fn path_for(&self, field: FieldKind) -> OutputResult<PathBuf> {
        self.files.resolve(&self.output_dir, field)
    }

    pub fn open(&self, field: FieldKind) -> OutputResult<OutputCursor<BufReader<File>>> {
        let path = self.path_for(field)?;
        debug!(field = %field, path = %path.display(), "opening output stream");
        let file = File::open(&path).map_err(|source| OutputError::IoUnavailable {
            path: path.clone(),
            source,
        })?;
        OutputCursor::new(BufReader::new(file), self.geometry)
    }

    pub fn read(
        &self,
        field: FieldKind,
        coordinate: OutputCoordinate,
    ) -> OutputResult<DecodedField> {
        let decoder = self.decoder();
        decoder.validate(field, coordinate)?;
        let mut cursor = self.open(field)?;
        decoder.decode(&mut cursor, field, coordinate)
    }

    pub fn head(&self, coordinate: OutputCoordinate) -> OutputResult<LayerGrid> {
        let decoder = self.decoder();
        decoder.validate(FieldKind::Head, coordinate)?;
        decoder.decode_head(&mut self.open(FieldKind::Head)?, coordinate)
    }

    pub fn drawdown(&self, coordinate: OutputCoordinate) -> OutputResult<LayerGrid> {
        let decoder = self.decoder();
        decoder.validate(FieldKind::Drawdown, coordinate)?;
        decoder.decode_drawdown(&mut self.open(FieldKind::Drawdown)?, coordinate)
    }

    pub fn flow(&self, coordinate: OutputCoordinate) -> OutputResult<FlowComponents> {
        let decoder = self.decoder();
        decoder.validate(FieldKind::Flow, coordinate)?;
        decoder.decode_flow(&mut self.open(FieldKind::Flow)?, coordinate)
    }

    pub fn budget(&self, coordinate: OutputCoordinate) -> OutputResult<BudgetSnapshot> {
        let decoder = self.decoder();
        decoder.validate(FieldKind::Budget, coordinate)?;
        decoder.decode_budget(&mut self.open(FieldKind::Budget)?, coordinate)
    }

    pub fn row(
        &self,
        field: FieldKind,
        coordinate: OutputCoordinate,
        row: usize,
    ) -> OutputResult<Vec<f32>> {
        let decoder = self.decoder();
        decoder.validate_row(field, coordinate, row)?;
        decoder.decode_row(&mut self.open(field)?, field, coordinate, row)
    }

    pub fn cell_series(
        &self,
        field: FieldKind,
        layer: usize,
        row: usize,
        col: usize,
    ) -> OutputResult<Vec<SeriesPoint>> {
        let decoder = self.decoder();
        decoder.validate_cell(field, layer, row, col)?;
        decoder.cell_series(&mut self.open(field)?, field, layer, row, col)
    }
}
