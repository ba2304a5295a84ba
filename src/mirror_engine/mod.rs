pub mod copy;
pub mod engine;
pub mod export;
pub mod ingest;
pub mod mapping_store;
pub mod naming;
pub mod reconciler;
pub mod types;

pub use engine::MirrorEngine;
pub use export::ExportService;
pub use ingest::{Clock, IngestionService};
pub use mapping_store::MappingStore;
pub use reconciler::Reconciler;
pub use types::{
    CopyOptions, ExportOutcome, IngestResult, MappingTable, MirrorEntry, ReconcileReport,
    VisibilityState,
};
