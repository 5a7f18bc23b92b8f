use super::FieldKind;
use std::path::PathBuf;

pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidation,
    IoSystem,
    Computation,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidation => 2,
            Self::IoSystem => 3,
            Self::Computation => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidation => "InputValidationError",
            Self::IoSystem => "IoSystemError",
            Self::Computation => "ComputationError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error(
        "grid of {layers} layers x {rows} rows x {cols} cols is not addressable: dimensions must \
         be positive and one stored instance must fit in 64-bit byte offsets"
    )]
    InvalidGeometry {
        layers: usize,
        rows: usize,
        cols: usize,
    },
    #[error("boundary codes cover {actual} cells but the grid has {expected}")]
    BoundaryShapeMismatch { expected: usize, actual: usize },
    #[error("run schedule does not define any stress periods")]
    EmptySchedule,
    #[error("stress period {period} is invalid: {reason}")]
    InvalidStressPeriod { period: usize, reason: String },
    #[error("output frequency flag {value} for {field} is not one of 0, 1 or 2")]
    InvalidOutputFrequency { field: FieldKind, value: i64 },
    #[error("{field} output is disabled for this run")]
    FieldNotProduced { field: FieldKind },
    #[error("{axis} index {index} is out of range for {field} (valid: 0..{limit})")]
    CoordinateOutOfRange {
        field: FieldKind,
        axis: &'static str,
        index: usize,
        limit: usize,
    },
    #[error("{field} records carry no per-layer preamble; single layers cannot be addressed")]
    UnsupportedLayerSkip { field: FieldKind },
    #[error("{field} records of this run do not fit in 64-bit byte offsets")]
    LayoutOverflow { field: FieldKind },
    #[error(
        "output stream ends at byte {available} but {required} bytes are needed \
         from offset {offset}"
    )]
    TruncatedStream {
        offset: u64,
        required: u64,
        available: u64,
    },
    #[error("failed to access output '{}': {source}", path.display())]
    IoUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid run configuration '{}': {message}", path.display())]
    InvalidConfiguration { path: PathBuf, message: String },
    #[error("unable to resolve {field} output in '{}': {message}", directory.display())]
    OutputFileUnresolved {
        field: FieldKind,
        directory: PathBuf,
        message: String,
    },
    #[error("output stream I/O failed at byte {offset}: {source}")]
    Stream { offset: u64, source: std::io::Error },
}

impl OutputError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidGeometry { .. }
            | Self::BoundaryShapeMismatch { .. }
            | Self::EmptySchedule
            | Self::InvalidStressPeriod { .. }
            | Self::InvalidOutputFrequency { .. }
            | Self::FieldNotProduced { .. }
            | Self::CoordinateOutOfRange { .. }
            | Self::UnsupportedLayerSkip { .. }
            | Self::LayoutOverflow { .. }
            | Self::InvalidConfiguration { .. } => ErrorCategory::InputValidation,
            Self::IoUnavailable { .. }
            | Self::OutputFileUnresolved { .. }
            | Self::Stream { .. } => ErrorCategory::IoSystem,
            Self::TruncatedStream { .. } => ErrorCategory::Computation,
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::InvalidGeometry { .. } => "INPUT.GRID_GEOMETRY",
            Self::BoundaryShapeMismatch { .. } => "INPUT.BOUNDARY_SHAPE",
            Self::EmptySchedule => "INPUT.EMPTY_SCHEDULE",
            Self::InvalidStressPeriod { .. } => "INPUT.STRESS_PERIOD",
            Self::InvalidOutputFrequency { .. } => "INPUT.OUTPUT_FREQUENCY",
            Self::FieldNotProduced { .. } => "INPUT.FIELD_NOT_PRODUCED",
            Self::CoordinateOutOfRange { .. } => "INPUT.COORDINATE_RANGE",
            Self::InvalidConfiguration { .. } => "INPUT.RUN_CONFIG",
            Self::IoUnavailable { .. } => "IO.OUTPUT_UNAVAILABLE",
            Self::OutputFileUnresolved { .. } => "IO.OUTPUT_RESOLVE",
            Self::Stream { .. } => "IO.OUTPUT_STREAM",
            Self::TruncatedStream { .. } => "RUN.TRUNCATED_STREAM",
            Self::UnsupportedLayerSkip { .. } => "INPUT.LAYER_ACCESS",
            Self::LayoutOverflow { .. } => "INPUT.LAYOUT_SIZE",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}
