// 批量传输结果
use crate::utils::error::TargetErrorKind;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    /// The path as the caller gave it.
    pub target: PathBuf,
    /// What was actually sent: the target itself, or its archive.
    pub sent_path: PathBuf,
    pub succeeded: bool,
    pub error_kind: Option<TargetErrorKind>,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl TransferReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    pub fn total_bytes(&self) -> u64 {
        self.succeeded().map(|o| o.bytes).sum()
    }
}
