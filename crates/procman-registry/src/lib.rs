//! procman Process Registry
//!
//! Owns every process record known to the manager and persists them
//! across runs as a flat `id;name;priority` text file.
//!
//! Records live in a slot arena. Callers that need to refer to a record
//! without borrowing the registry (the dispatch queue, for instance) hold a
//! [`ProcessHandle`], which stops resolving as soon as the record is removed
//! or the registry is cleared.

mod handle;
mod persistence;
mod process;
mod registry;

pub use handle::ProcessHandle;
pub use persistence::{
    decode_record, encode_record, LoadReport, PersistenceError, RecordError, DEFAULT_DATA_FILE,
};
pub use process::{Priority, Process, ProcessId};
pub use registry::ProcessRegistry;
