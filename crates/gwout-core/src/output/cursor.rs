use super::layout::RecordLayout;
use crate::common::constants::{
    FLOAT_BYTES, GROUP_PREAMBLE_BYTES, LABEL_BYTES, LAYER_PREAMBLE_BYTES,
};
use crate::domain::{OutputError, OutputResult};
use crate::grid::{GridGeometry, LayerGrid};
use serde::Serialize;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use tracing::trace;

/// Metadata carried in front of every payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPreamble {
    pub step: i32,
    pub period: i32,
    /// Only per-layer preambles carry times.
    pub period_time: Option<f32>,
    pub total_time: Option<f32>,
    pub label: String,
    pub cols: i32,
    pub rows: i32,
    /// Layer number for per-layer records, layer count for group records.
    pub layer: i32,
}

impl RecordPreamble {
    fn parse(layout: &RecordLayout, bytes: &[u8]) -> Option<Self> {
        let mut offset = 0;
        let step = take_i32(bytes, &mut offset)?;
        let period = take_i32(bytes, &mut offset)?;
        let (period_time, total_time) = match layout {
            RecordLayout::PerLayerPreamble { .. } => (
                Some(take_f32(bytes, &mut offset)?),
                Some(take_f32(bytes, &mut offset)?),
            ),
            RecordLayout::PerGroupPreamble { .. } => (None, None),
        };
        let label = take_label(bytes, &mut offset)?;
        let cols = take_i32(bytes, &mut offset)?;
        let rows = take_i32(bytes, &mut offset)?;
        let layer = take_i32(bytes, &mut offset)?;

        Some(Self {
            step,
            period,
            period_time,
            total_time,
            label,
            cols,
            rows,
            layer,
        })
    }
}

/// Seekable position in an output stream that moves in whole record units.
///
/// Every skip and read is checked against the stream length first, so a
/// short file surfaces as [`OutputError::TruncatedStream`] instead of a seek
/// past the end.
#[derive(Debug)]
pub struct OutputCursor<R> {
    reader: R,
    geometry: GridGeometry,
    position: u64,
    length: u64,
}

impl<R: Read + Seek> OutputCursor<R> {
    pub fn new(mut reader: R, geometry: GridGeometry) -> OutputResult<Self> {
        let length = reader
            .seek(SeekFrom::End(0))
            .map_err(|source| OutputError::Stream { offset: 0, source })?;
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|source| OutputError::Stream { offset: 0, source })?;
        Ok(Self {
            reader,
            geometry,
            position: 0,
            length,
        })
    }

    pub const fn position(&self) -> u64 {
        self.position
    }

    pub const fn stream_len(&self) -> u64 {
        self.length
    }

    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    pub fn seek_to(&mut self, offset: u64) -> OutputResult<()> {
        if offset > self.length {
            return Err(OutputError::TruncatedStream {
                offset: self.position,
                required: offset.saturating_sub(self.position),
                available: self.length,
            });
        }
        if offset != self.position {
            self.reader
                .seek(SeekFrom::Start(offset))
                .map_err(|source| OutputError::Stream {
                    offset: self.position,
                    source,
                })?;
            self.position = offset;
        }
        Ok(())
    }

    pub fn skip_bytes(&mut self, bytes: u64) -> OutputResult<()> {
        self.ensure_available(bytes)?;
        self.seek_to(self.position + bytes)
    }

    /// Moves past `count` whole instances with a single seek.
    pub fn skip_instances(&mut self, layout: &RecordLayout, count: usize) -> OutputResult<()> {
        let bytes = self.span(layout.instance_bytes(&self.geometry)?, count)?;
        trace!(field = %layout.field(), count, bytes, "skipping instances");
        self.skip_bytes(bytes)
    }

    /// Moves past `count` preamble-plus-layer blocks of a per-layer record.
    pub fn skip_layers(&mut self, layout: &RecordLayout, count: usize) -> OutputResult<()> {
        match layout {
            RecordLayout::PerLayerPreamble { .. } => {
                let bytes = self.span(self.geometry.layer_block_bytes(), count)?;
                self.skip_bytes(bytes)
            }
            RecordLayout::PerGroupPreamble { field, .. } => {
                Err(OutputError::UnsupportedLayerSkip { field: *field })
            }
        }
    }

    /// Moves past `count` layer payloads that carry no preamble of their own.
    pub fn skip_grids(&mut self, count: usize) -> OutputResult<()> {
        let bytes = self.span(self.geometry.grid_bytes(), count)?;
        self.skip_bytes(bytes)
    }

    pub fn read_preamble(&mut self, layout: &RecordLayout) -> OutputResult<RecordPreamble> {
        let size = match layout {
            RecordLayout::PerLayerPreamble { .. } => LAYER_PREAMBLE_BYTES,
            RecordLayout::PerGroupPreamble { .. } => GROUP_PREAMBLE_BYTES,
        };
        let bytes = self.read_bytes(size)?;
        RecordPreamble::parse(layout, &bytes).ok_or(OutputError::TruncatedStream {
            offset: self.position - size as u64,
            required: size as u64,
            available: self.length,
        })
    }

    pub fn read_grid(&mut self) -> OutputResult<LayerGrid> {
        let values = self.read_values(self.geometry.cell_count())?;
        Ok(LayerGrid::from_row_major(
            self.geometry.rows(),
            self.geometry.cols(),
            &values,
        ))
    }

    /// Reads `count` consecutive little-endian f32 values.
    pub fn read_values(&mut self, count: usize) -> OutputResult<Vec<f32>> {
        let size = count
            .checked_mul(FLOAT_BYTES)
            .ok_or_else(|| self.past_addressable_end())?;
        let bytes = self.read_bytes(size)?;
        Ok(bytes
            .chunks_exact(FLOAT_BYTES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn read_bytes(&mut self, size: usize) -> OutputResult<Vec<u8>> {
        self.ensure_available(size as u64)?;
        let mut buffer = vec![0_u8; size];
        self.reader.read_exact(&mut buffer).map_err(|source| {
            if source.kind() == ErrorKind::UnexpectedEof {
                OutputError::TruncatedStream {
                    offset: self.position,
                    required: size as u64,
                    available: self.length,
                }
            } else {
                OutputError::Stream {
                    offset: self.position,
                    source,
                }
            }
        })?;
        self.position += size as u64;
        Ok(buffer)
    }

    /// Bytes covered by `count` units of `unit` bytes each.
    fn span(&self, unit: u64, count: usize) -> OutputResult<u64> {
        u64::try_from(count)
            .ok()
            .and_then(|count| unit.checked_mul(count))
            .ok_or_else(|| self.past_addressable_end())
    }

    /// A span wider than `u64` cannot fit in any stream.
    fn past_addressable_end(&self) -> OutputError {
        OutputError::TruncatedStream {
            offset: self.position,
            required: u64::MAX,
            available: self.length,
        }
    }

    fn ensure_available(&self, bytes: u64) -> OutputResult<()> {
        match self.position.checked_add(bytes) {
            Some(end) if end <= self.length => Ok(()),
            _ => Err(OutputError::TruncatedStream {
                offset: self.position,
                required: bytes,
                available: self.length,
            }),
        }
    }
}

fn take_i32(bytes: &[u8], offset: &mut usize) -> Option<i32> {
    let end = offset.checked_add(std::mem::size_of::<i32>())?;
    let slice = bytes.get(*offset..end)?;
    let value = i32::from_le_bytes(slice.try_into().ok()?);
    *offset = end;
    Some(value)
}

fn take_f32(bytes: &[u8], offset: &mut usize) -> Option<f32> {
    let end = offset.checked_add(std::mem::size_of::<f32>())?;
    let slice = bytes.get(*offset..end)?;
    let value = f32::from_le_bytes(slice.try_into().ok()?);
    *offset = end;
    Some(value)
}

fn take_label(bytes: &[u8], offset: &mut usize) -> Option<String> {
    let end = offset.checked_add(LABEL_BYTES)?;
    let slice = bytes.get(*offset..end)?;
    *offset = end;
    Some(
        String::from_utf8_lossy(slice)
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .to_string(),
    )
}
