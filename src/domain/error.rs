use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid time '{0}': expected HH:mm")]
    InvalidFormat(String),
    #[error("invalid task: {0}")]
    InvalidTask(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("a conflict proposal is awaiting confirmation")]
    ProposalPending,
    #[error("no conflict proposal is pending")]
    NoPendingProposal,
}
