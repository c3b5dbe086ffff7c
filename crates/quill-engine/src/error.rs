#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown specialist: {0}")]
    UnknownSpecialist(String),

    #[error("specialist '{specialist}' exceeded its iteration limit of {limit}")]
    IterationLimitExceeded { specialist: String, limit: u32 },

    #[error("prompt assembly failed: {0}")]
    Assembly(String),
}
