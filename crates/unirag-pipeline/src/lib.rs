//! unirag-pipeline
//!
//! Wires the lexical, semantic, fusion and rerank stages into a single
//! `retrieve(query)` entry point, with every tunable in `RetrievalConfig`.

pub mod config;
pub mod pipeline;

pub use config::RetrievalConfig;
pub use pipeline::{PipelineBuilder, RetrievalPipeline};
