pub mod common;
pub mod domain;
pub mod grid;
pub mod output;
pub mod schema;

pub use common::config::{RunConfig, RunSetup};
pub use domain::{ErrorCategory, FieldKind, OutputCoordinate, OutputError, OutputResult};
pub use grid::{GridGeometry, LayerGrid};
pub use output::{
    BudgetSnapshot, BudgetTerm, DecodedField, FieldDecoder, FlowComponents, OutputCursor,
    OutputFiles, OutputReader, RecordLayout, RecordPreamble, SeriesPoint,
};
pub use schema::{
    ActivePackageSet, BudgetTermCatalog, ConstantHeadPresence, InstanceTime, OutputFrequencies,
    OutputFrequency, Package, RunSchema, SimulationKind, StressPeriod,
};
