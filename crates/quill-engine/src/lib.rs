//! Orchestration engine: specialist registry, iteration policy, tool-error
//! classification, and the specialist/plan executors.

pub mod assembler;
pub mod classify;
pub mod error;
pub mod executor;
pub mod plan;
pub mod policy;
pub mod registry;

pub use assembler::{AssemblyContext, BasicAssembler, PromptAssembler};
pub use classify::{classify, enhance, ToolFailureKind};
pub use error::EngineError;
pub use executor::SpecialistExecutor;
pub use plan::{PlanExecutor, ProgressCallback};
pub use policy::{IterationDecision, IterationPolicy};
pub use registry::{
    ScanReport, SpecialistCategory, SpecialistConfig, SpecialistFilter, SpecialistRegistry,
};
