//! PDF ingestion pipeline.

pub mod chunker;
pub mod extract;
pub mod pdf;
pub mod pipeline;

pub use chunker::ChunkingConfig;
pub use extract::{CppExtraction, CppExtractor, CppRecord};
pub use pdf::PdfPage;
pub use pipeline::{IngestOptions, IngestPipeline, IngestReport};
