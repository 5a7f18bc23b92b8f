//! Random access into the engine's binary output streams.

pub mod cursor;
pub mod decoder;
pub mod files;
pub mod layout;
pub mod reader;

pub use cursor::{OutputCursor, RecordPreamble};
pub use decoder::{
    BudgetSnapshot, BudgetTerm, DecodedField, FieldDecoder, FlowComponents, SeriesPoint,
};
pub use files::OutputFiles;
pub use layout::RecordLayout;
pub use reader::OutputReader;
