// 传输模块入口
pub mod backup;
pub mod logbook;
pub mod progress;
pub mod report;
pub mod targets;

pub use backup::BackupUploader;
pub use logbook::{BackupLog, ConsoleSink, EventSink};
pub use report::{TargetOutcome, TransferReport};
