mod aggregator;
mod explanation;
mod recommendation;

pub use aggregator::aggregate;
pub use explanation::{explain, Explanation};
pub use recommendation::{decide, find_structural_block, StructuralBlock};

/// Input the aggregator cannot score. Indicates the invoker contract was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssessmentError {
    #[error("no signals to aggregate")]
    EmptySignalSet,
    #[error("weighted signal '{0}' is missing from the signal set")]
    MissingSignal(String),
}
