use super::cursor::OutputCursor;
use super::layout::RecordLayout;
use crate::common::constants::{FLOAT_BYTES, FLOW_COMPONENTS};
use crate::domain::{FieldKind, OutputCoordinate, OutputError, OutputResult};
use crate::grid::{GridGeometry, LayerGrid};
use crate::schema::RunSchema;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use tracing::{debug, warn};

/// Face-flow grids of one layer, one per direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowComponents {
    pub labels: [String; FLOW_COMPONENTS],
    pub x: LayerGrid,
    pub y: LayerGrid,
    pub z: LayerGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetTerm {
    pub name: String,
    pub grid: LayerGrid,
}

/// All budget terms of one instance at one layer, in stream order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BudgetSnapshot {
    terms: Vec<BudgetTerm>,
}

impl BudgetSnapshot {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[BudgetTerm] {
        &self.terms
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.name.as_str())
    }

    /// First term carrying `name`.
    pub fn get(&self, name: &str) -> Option<&LayerGrid> {
        self.terms
            .iter()
            .find(|term| term.name == name)
            .map(|term| &term.grid)
    }

    /// Name-keyed view; when a label repeats, the first occurrence wins.
    pub fn to_map(&self) -> BTreeMap<String, LayerGrid> {
        let mut map = BTreeMap::new();
        for term in &self.terms {
            map.entry(term.name.clone())
                .or_insert_with(|| term.grid.clone());
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DecodedField {
    Layer { field: FieldKind, grid: LayerGrid },
    Flow(FlowComponents),
    Budget(BudgetSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: usize,
    pub step: usize,
    pub time: f64,
    pub value: f32,
}

/// Locates and decodes single coordinates of an output stream.
///
/// The decoder itself holds no stream state; every call positions the
/// supplied cursor from the start of the stream, so one decoder can serve any
/// number of cursors.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecoder<'a> {
    geometry: &'a GridGeometry,
    schema: &'a RunSchema,
    header_bytes: u64,
}

impl<'a> FieldDecoder<'a> {
    pub fn new(geometry: &'a GridGeometry, schema: &'a RunSchema) -> Self {
        Self {
            geometry,
            schema,
            header_bytes: 0,
        }
    }

    /// Bytes preceding the first record of the stream.
    pub fn with_header_bytes(mut self, header_bytes: u64) -> Self {
        self.header_bytes = header_bytes;
        self
    }

    pub fn layout(&self, field: FieldKind) -> RecordLayout {
        RecordLayout::for_field(field, self.schema)
    }

    pub fn ensure_produced(&self, field: FieldKind) -> OutputResult<()> {
        if self.schema.is_produced(field) {
            Ok(())
        } else {
            Err(OutputError::FieldNotProduced { field })
        }
    }

    pub fn validate(&self, field: FieldKind, coordinate: OutputCoordinate) -> OutputResult<()> {
        self.ensure_produced(field)?;
        check_axis(field, "period", coordinate.period, self.schema.period_count())?;
        check_axis(
            field,
            "step",
            coordinate.step,
            self.schema.instance_count(field, coordinate.period),
        )?;
        check_axis(field, "layer", coordinate.layer, self.geometry.layers())
    }

    pub fn validate_row(
        &self,
        field: FieldKind,
        coordinate: OutputCoordinate,
        row: usize,
    ) -> OutputResult<()> {
        self.validate(field, coordinate)?;
        ensure_layered(field)?;
        check_axis(field, "row", row, self.geometry.rows())
    }

    pub fn validate_cell(
        &self,
        field: FieldKind,
        layer: usize,
        row: usize,
        col: usize,
    ) -> OutputResult<()> {
        self.ensure_produced(field)?;
        ensure_layered(field)?;
        check_axis(field, "layer", layer, self.geometry.layers())?;
        check_axis(field, "row", row, self.geometry.rows())?;
        check_axis(field, "col", col, self.geometry.cols())
    }

    /// Closed-form byte offset of the first record of an instance.
    pub fn instance_offset(
        &self,
        field: FieldKind,
        period: usize,
        step: usize,
    ) -> OutputResult<u64> {
        let instance_bytes = self.layout(field).instance_bytes(self.geometry)?;
        let instance = self.schema.instances_before(field, period) + step;
        u64::try_from(instance)
            .ok()
            .and_then(|instance| instance.checked_mul(instance_bytes))
            .and_then(|bytes| bytes.checked_add(self.header_bytes))
            .ok_or(OutputError::LayoutOverflow { field })
    }

    /// Positions the cursor at the start of the requested instance by
    /// skipping whole periods, then whole steps.
    pub fn seek_instance<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        field: FieldKind,
        period: usize,
        step: usize,
    ) -> OutputResult<RecordLayout> {
        let layout = self.layout(field);
        cursor.seek_to(self.header_bytes)?;
        for skipped in 0..period {
            cursor.skip_instances(&layout, self.schema.instance_count(field, skipped))?;
        }
        cursor.skip_instances(&layout, step)?;
        debug!(
            field = %field,
            period,
            step,
            offset = cursor.position(),
            "positioned at output instance"
        );
        Ok(layout)
    }

    pub fn decode<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        field: FieldKind,
        coordinate: OutputCoordinate,
    ) -> OutputResult<DecodedField> {
        match field {
            FieldKind::Head | FieldKind::Drawdown => Ok(DecodedField::Layer {
                field,
                grid: self.decode_layered(cursor, field, coordinate)?,
            }),
            FieldKind::Flow => self.decode_flow(cursor, coordinate).map(DecodedField::Flow),
            FieldKind::Budget => self
                .decode_budget(cursor, coordinate)
                .map(DecodedField::Budget),
        }
    }

    pub fn decode_head<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        coordinate: OutputCoordinate,
    ) -> OutputResult<LayerGrid> {
        self.decode_layered(cursor, FieldKind::Head, coordinate)
    }

    pub fn decode_drawdown<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        coordinate: OutputCoordinate,
    ) -> OutputResult<LayerGrid> {
        self.decode_layered(cursor, FieldKind::Drawdown, coordinate)
    }

    pub fn decode_flow<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        coordinate: OutputCoordinate,
    ) -> OutputResult<FlowComponents> {
        self.validate(FieldKind::Flow, coordinate)?;
        let layout =
            self.seek_instance(cursor, FieldKind::Flow, coordinate.period, coordinate.step)?;

        let (x_label, x) = self.read_group(cursor, &layout, coordinate.layer, false)?;
        let (y_label, y) = self.read_group(cursor, &layout, coordinate.layer, false)?;
        let (z_label, z) = self.read_group(cursor, &layout, coordinate.layer, true)?;
        Ok(FlowComponents {
            labels: [x_label, y_label, z_label],
            x,
            y,
            z,
        })
    }

    pub fn decode_budget<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        coordinate: OutputCoordinate,
    ) -> OutputResult<BudgetSnapshot> {
        self.validate(FieldKind::Budget, coordinate)?;
        let layout =
            self.seek_instance(cursor, FieldKind::Budget, coordinate.period, coordinate.step)?;

        let catalog = self.schema.budget_term_catalog();
        let mut terms = Vec::with_capacity(catalog.len());
        for index in 0..catalog.len() {
            let last = index + 1 == catalog.len();
            let (name, grid) = self.read_group(cursor, &layout, coordinate.layer, last)?;
            terms.push(BudgetTerm { name, grid });
        }

        let drifted = terms
            .iter()
            .zip(catalog.iter())
            .filter(|(term, expected)| term.name != *expected)
            .count();
        if drifted > 0 {
            warn!(
                drifted,
                terms = terms.len(),
                "budget labels differ from the configured term catalog"
            );
        }

        Ok(BudgetSnapshot { terms })
    }

    /// One row of a head or drawdown layer.
    pub fn decode_row<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        field: FieldKind,
        coordinate: OutputCoordinate,
        row: usize,
    ) -> OutputResult<Vec<f32>> {
        self.validate_row(field, coordinate, row)?;

        let layout = self.seek_instance(cursor, field, coordinate.period, coordinate.step)?;
        cursor.skip_layers(&layout, coordinate.layer)?;
        cursor.skip_bytes(layout.preamble_bytes() + row as u64 * self.geometry.row_block_bytes())?;
        cursor.read_values(self.geometry.cols())
    }

    /// Value of one head or drawdown cell at every stored instance.
    pub fn cell_series<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        field: FieldKind,
        layer: usize,
        row: usize,
        col: usize,
    ) -> OutputResult<Vec<SeriesPoint>> {
        self.validate_cell(field, layer, row, col)?;

        let layout = self.layout(field);
        let within_instance = layer as u64 * self.geometry.layer_block_bytes()
            + layout.preamble_bytes()
            + row as u64 * self.geometry.row_block_bytes()
            + (col * FLOAT_BYTES) as u64;

        self.schema
            .instance_times(field)
            .into_iter()
            .map(|instant| {
                let offset = self
                    .instance_offset(field, instant.period, instant.step)?
                    .checked_add(within_instance)
                    .ok_or(OutputError::LayoutOverflow { field })?;
                cursor.seek_to(offset)?;
                let value = cursor.read_values(1)?[0];
                Ok(SeriesPoint {
                    period: instant.period,
                    step: instant.step,
                    time: instant.time,
                    value,
                })
            })
            .collect()
    }

    fn decode_layered<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        field: FieldKind,
        coordinate: OutputCoordinate,
    ) -> OutputResult<LayerGrid> {
        self.validate(field, coordinate)?;
        ensure_layered(field)?;

        let layout = self.seek_instance(cursor, field, coordinate.period, coordinate.step)?;
        cursor.skip_layers(&layout, coordinate.layer)?;
        cursor.read_preamble(&layout)?;
        cursor.read_grid()
    }

    /// Reads one layer out of a group; unless it is the instance's last group,
    /// also moves past the remaining layers to the next group's preamble.
    fn read_group<R: Read + Seek>(
        &self,
        cursor: &mut OutputCursor<R>,
        layout: &RecordLayout,
        layer: usize,
        last: bool,
    ) -> OutputResult<(String, LayerGrid)> {
        let preamble = cursor.read_preamble(layout)?;
        cursor.skip_grids(layer)?;
        let grid = cursor.read_grid()?;
        if !last {
            cursor.skip_grids(self.geometry.layers() - layer - 1)?;
        }
        Ok((preamble.label, grid))
    }
}

fn ensure_layered(field: FieldKind) -> OutputResult<()> {
    if field.is_layered() {
        Ok(())
    } else {
        Err(OutputError::UnsupportedLayerSkip { field })
    }
}

fn check_axis(
    field: FieldKind,
    axis: &'static str,
    index: usize,
    limit: usize,
) -> OutputResult<()> {
    if index < limit {
        Ok(())
    } else {
        Err(OutputError::CoordinateOutOfRange {
            field,
            axis,
            index,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodedField, FieldDecoder};
    use crate::domain::{FieldKind, OutputCoordinate, OutputError};
    use crate::grid::GridGeometry;
    use crate::output::cursor::OutputCursor;
    use crate::schema::{
        ActivePackageSet, ConstantHeadPresence, OutputFrequencies, OutputFrequency, Package,
        RunSchema, SimulationKind, StressPeriod,
    };
    use std::io::Cursor;

    const FLOW_LABELS: [&str; 3] = ["FLOW RIGHT FACE", "FLOW FRONT FACE", "FLOW LOWER FACE"];

    fn geometry() -> GridGeometry {
        GridGeometry::new(2, 2, 3).expect("geometry should build")
    }

    fn schema() -> RunSchema {
        RunSchema::new(
            vec![StressPeriod::new(4.0, 2, 1.0), StressPeriod::new(6.0, 3, 1.0)],
            OutputFrequencies::default()
                .with(FieldKind::Head, OutputFrequency::PerStep)
                .with(FieldKind::Flow, OutputFrequency::PerPeriod)
                .with(FieldKind::Budget, OutputFrequency::PerStep),
            ActivePackageSet::new([Package::Well]),
            SimulationKind::Transient,
            ConstantHeadPresence::none(),
        )
        .expect("schema should build")
    }

    fn cell_values(base: f32, cells: usize) -> Vec<f32> {
        (0..cells).map(|cell| base + cell as f32).collect()
    }

    fn push_floats(stream: &mut Vec<u8>, values: &[f32]) {
        for value in values {
            stream.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn push_ints(stream: &mut Vec<u8>, values: &[i32]) {
        for value in values {
            stream.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn head_stream(geometry: &GridGeometry, instances: usize) -> Vec<u8> {
        let mut stream = Vec::new();
        for instance in 0..instances {
            for layer in 0..geometry.layers() {
                push_ints(&mut stream, &[instance as i32 + 1, 1]);
                push_floats(&mut stream, &[1.0, instance as f32]);
                stream.extend_from_slice(format!("{:>16}", "HEAD").as_bytes());
                push_ints(
                    &mut stream,
                    &[geometry.cols() as i32, geometry.rows() as i32, layer as i32 + 1],
                );
                push_floats(
                    &mut stream,
                    &cell_values((instance * 100 + layer * 10) as f32, geometry.cell_count()),
                );
            }
        }
        stream
    }

    fn group_stream(geometry: &GridGeometry, instances: usize, labels: &[&str]) -> Vec<u8> {
        let mut stream = Vec::new();
        for instance in 0..instances {
            for (group, label) in labels.iter().enumerate() {
                push_ints(&mut stream, &[1, 1]);
                stream.extend_from_slice(format!("{label:>16}").as_bytes());
                push_ints(
                    &mut stream,
                    &[
                        geometry.cols() as i32,
                        geometry.rows() as i32,
                        -(geometry.layers() as i32),
                    ],
                );
                for layer in 0..geometry.layers() {
                    let base = (instance * 1000 + group * 100 + layer * 10) as f32;
                    push_floats(&mut stream, &cell_values(base, geometry.cell_count()));
                }
            }
        }
        stream
    }

    #[test]
    fn disabled_fields_fail_without_reading() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);
        let mut cursor = OutputCursor::new(Cursor::new(Vec::new()), geometry).expect("cursor");

        let error = decoder
            .decode_drawdown(&mut cursor, OutputCoordinate::new(0, 0, 0))
            .expect_err("drawdown is disabled");
        assert!(matches!(
            error,
            OutputError::FieldNotProduced {
                field: FieldKind::Drawdown
            }
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn coordinates_at_the_limit_are_out_of_range() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);

        let cases = [
            (FieldKind::Head, OutputCoordinate::new(0, 0, 2), "layer", 2),
            (FieldKind::Head, OutputCoordinate::new(0, 2, 0), "step", 2),
            (FieldKind::Head, OutputCoordinate::new(2, 0, 0), "period", 2),
            (FieldKind::Flow, OutputCoordinate::new(1, 1, 0), "step", 1),
        ];
        for (field, coordinate, expected_axis, expected_limit) in cases {
            match decoder.validate(field, coordinate) {
                Err(OutputError::CoordinateOutOfRange { axis, limit, .. }) => {
                    assert_eq!(axis, expected_axis, "{field} {coordinate}");
                    assert_eq!(limit, expected_limit, "{field} {coordinate}");
                }
                other => panic!("expected out-of-range for {field} {coordinate}, got {other:?}"),
            }
        }

        assert!(decoder
            .validate(FieldKind::Head, OutputCoordinate::new(1, 2, 1))
            .is_ok());
    }

    #[test]
    fn head_layers_are_located_by_period_step_and_layer() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);
        let stream = head_stream(&geometry, schema.total_instances(FieldKind::Head));
        let mut cursor = OutputCursor::new(Cursor::new(stream), geometry).expect("cursor");

        // period 1 step 2 is the fifth stored instance
        let grid = decoder
            .decode_head(&mut cursor, OutputCoordinate::new(1, 2, 1))
            .expect("last head layer should decode");
        assert_eq!(grid.to_rows(), vec![vec![410.0, 411.0, 412.0], vec![413.0, 414.0, 415.0]]);
        assert_eq!(cursor.position(), cursor.stream_len());

        let first = decoder
            .decode(&mut cursor, FieldKind::Head, OutputCoordinate::new(0, 1, 0))
            .expect("earlier instance should decode after a later one");
        match first {
            DecodedField::Layer { field, grid } => {
                assert_eq!(field, FieldKind::Head);
                assert_eq!(grid.get(0, 0), Some(100.0));
            }
            other => panic!("expected a layer, got {other:?}"),
        }
    }

    #[test]
    fn instance_offsets_match_the_seek_path() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema).with_header_bytes(12);

        for field in [FieldKind::Head, FieldKind::Flow, FieldKind::Budget] {
            let mut cursor =
                OutputCursor::new(Cursor::new(vec![0_u8; 8192]), geometry).expect("cursor");
            for instant in schema.instance_times(field) {
                let offset = decoder
                    .instance_offset(field, instant.period, instant.step)
                    .expect("offset should fit");
                decoder
                    .seek_instance(&mut cursor, field, instant.period, instant.step)
                    .expect("seek should stay inside the stream");
                assert_eq!(
                    cursor.position(),
                    offset,
                    "{field} period {} step {}",
                    instant.period,
                    instant.step
                );
            }
        }

        let head = decoder.layout(FieldKind::Head);
        let mut cursor =
            OutputCursor::new(Cursor::new(vec![0_u8; 8192]), geometry).expect("cursor");
        for instant in schema.instance_times(FieldKind::Head) {
            let offset = decoder
                .instance_offset(FieldKind::Head, instant.period, instant.step)
                .expect("offset should fit");
            for layer in 0..geometry.layers() {
                decoder
                    .seek_instance(&mut cursor, FieldKind::Head, instant.period, instant.step)
                    .expect("seek should stay inside the stream");
                cursor
                    .skip_layers(&head, layer)
                    .expect("layer skip should stay inside the stream");
                assert_eq!(
                    cursor.position(),
                    offset + layer as u64 * geometry.layer_block_bytes(),
                    "period {} step {} layer {layer}",
                    instant.period,
                    instant.step
                );
            }
        }

        let offset = |period, step| {
            decoder
                .instance_offset(FieldKind::Head, period, step)
                .expect("offset should fit")
        };
        assert_eq!(offset(0, 0), 12);
        assert_eq!(offset(1, 0), 12 + 2 * 2 * 68);
    }

    #[test]
    fn flow_returns_the_requested_layer_of_each_direction() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);
        let stream = group_stream(&geometry, 2, &FLOW_LABELS);
        let mut cursor = OutputCursor::new(Cursor::new(stream), geometry).expect("cursor");

        let flow = decoder
            .decode_flow(&mut cursor, OutputCoordinate::new(1, 0, 1))
            .expect("flow should decode");
        assert_eq!(flow.labels, FLOW_LABELS.map(str::to_string));
        assert_eq!(flow.x.get(0, 0), Some(1010.0));
        assert_eq!(flow.y.get(1, 2), Some(1115.0));
        assert_eq!(flow.z.get(0, 1), Some(1211.0));
        assert_eq!(cursor.position(), cursor.stream_len());
    }

    #[test]
    fn budget_terms_follow_the_catalog() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);
        let labels = ["STORAGE", "FLOW BALANCE", "WELLS"];
        let stream = group_stream(&geometry, 5, &labels);
        let mut cursor = OutputCursor::new(Cursor::new(stream), geometry).expect("cursor");

        let budget = decoder
            .decode_budget(&mut cursor, OutputCoordinate::new(0, 1, 0))
            .expect("budget should decode");
        assert_eq!(budget.names().collect::<Vec<_>>(), labels);
        assert_eq!(budget.get("WELLS").and_then(|grid| grid.get(0, 0)), Some(1200.0));
        assert_eq!(budget.to_map().len(), 3);
    }

    #[test]
    fn budget_labels_are_taken_from_the_stream() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);
        let stream = group_stream(&geometry, 5, &["STORAGE", "FLOW BALANCE", "RECHARGE"]);
        let mut cursor = OutputCursor::new(Cursor::new(stream), geometry).expect("cursor");

        let budget = decoder
            .decode_budget(&mut cursor, OutputCoordinate::new(0, 0, 1))
            .expect("drifted labels still decode");
        assert_eq!(budget.terms()[2].name, "RECHARGE");
        assert!(budget.get("WELLS").is_none());
    }

    #[test]
    fn rows_and_cell_series_read_partial_layers() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);
        let stream = head_stream(&geometry, schema.total_instances(FieldKind::Head));
        let mut cursor = OutputCursor::new(Cursor::new(stream), geometry).expect("cursor");

        let row = decoder
            .decode_row(&mut cursor, FieldKind::Head, OutputCoordinate::new(0, 1, 1), 1)
            .expect("row should decode");
        assert_eq!(row, vec![113.0, 114.0, 115.0]);

        let series = decoder
            .cell_series(&mut cursor, FieldKind::Head, 1, 0, 2)
            .expect("series should decode");
        let values: Vec<f32> = series.iter().map(|point| point.value).collect();
        assert_eq!(values, vec![12.0, 112.0, 212.0, 312.0, 412.0]);
        let times: Vec<f64> = series.iter().map(|point| point.time).collect();
        assert_eq!(times, vec![2.0, 4.0, 6.0, 8.0, 10.0]);

        assert!(matches!(
            decoder.cell_series(&mut cursor, FieldKind::Flow, 0, 0, 0),
            Err(OutputError::UnsupportedLayerSkip {
                field: FieldKind::Flow
            })
        ));
        assert!(matches!(
            decoder.decode_row(&mut cursor, FieldKind::Head, OutputCoordinate::new(0, 0, 0), 2),
            Err(OutputError::CoordinateOutOfRange { axis: "row", .. })
        ));
    }

    #[test]
    fn short_streams_surface_as_truncation() {
        let geometry = geometry();
        let schema = schema();
        let decoder = FieldDecoder::new(&geometry, &schema);
        let stream = head_stream(&geometry, 2);
        let mut cursor = OutputCursor::new(Cursor::new(stream), geometry).expect("cursor");

        assert!(matches!(
            decoder.decode_head(&mut cursor, OutputCoordinate::new(1, 0, 0)),
            Err(OutputError::TruncatedStream { .. })
        ));
    }
}
