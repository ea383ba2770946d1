pub mod csv;
pub mod export;

pub use crate::csv::{
    load_bank, load_internal, CsvError, LedgerProfile, LoadedLedger, UndatedRow,
};
pub use export::{export_to_dir, write_bank, write_internal, write_matches, ExportError};
