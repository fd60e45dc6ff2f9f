//! autods - Automated data science for tabular data
//!
//! Three stages turn a raw table into a trained model:
//! - [`cleaning`] - deduplication, missing values, outliers, column drops
//! - [`features`] - encodings, interactions, aggregations, selection
//! - [`training`] - seeded split, candidate models, scoring, selection
//!
//! [`pipeline`] chains the stages and [`cli`] exposes them on the command line.
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Typed columns, profiling and CSV I/O
//! - [`imputation`] - Median/mode and KNN imputation
//!
//! ## Stages
//! - [`cleaning`] - The `Cleaner` and its report
//! - [`features`] - The `FeatureSynthesizer` and its catalog
//! - [`training`] - The `ModelSearch` and its candidate models
//!
//! ## Orchestration
//! - [`pipeline`] - End-to-end runs
//! - [`cli`] - Command-line interface

// Core error handling and settings
pub mod config;
pub mod error;

// Data
pub mod dataset;
pub mod imputation;

// Stages
pub mod cleaning;
pub mod features;
pub mod training;

// Orchestration
pub mod cli;
pub mod pipeline;

pub use cleaning::{clean, Cleaner, CleaningReport};
pub use config::PipelineConfig;
pub use dataset::{Column, ColumnKind, Dataset};
pub use error::{AutoDsError, CandidateFailure, Result};
pub use features::{synthesize, FeatureSet, FeatureSynthesizer};
pub use pipeline::{run, AutoPipeline, PipelineRun, RunSummary};
pub use training::{search, Metrics, ModelSearch, TaskType, TrainingOutcome};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{AutoDsError, CandidateFailure, Result};

    // Settings
    pub use crate::config::PipelineConfig;

    // Data
    pub use crate::dataset::{Column, ColumnKind, Dataset, DatasetProfile};

    // Cleaning
    pub use crate::cleaning::{
        clean, detect_target, Cleaner, CleaningReport, CleaningWarning, DefaultTargetPolicy, DropReason,
        IdentifierPolicy, TargetPolicy,
    };

    // Features
    pub use crate::features::{synthesize, FeatureCatalog, FeatureSet, FeatureSynthesizer, Provenance};

    // Training
    pub use crate::training::{
        search, Estimator, Metrics, ModelSearch, Predictions, SearchWarning, TaskType, TrainingOutcome,
        REGISTRY,
    };

    // Pipeline
    pub use crate::pipeline::{run, AutoPipeline, PipelineRun, RunSummary};
}
