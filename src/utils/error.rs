// 错误类型
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Raised while building a [`BackupUploader`](crate::transfer::BackupUploader).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("keyfile path or password is necessary")]
    MissingCredential,

    #[error("keyfile path and password are mutually exclusive")]
    ConflictingCredentials,

    #[error("SSH host must not be empty")]
    EmptyHost,

    #[error("SSH username must not be empty")]
    EmptyUsername,
}

/// Failure to establish or keep the SSH session. Fatal to the batch.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("SSH connection failed. The host key given by {host} did not match what we were expecting")]
    BadHostKey { host: String },

    #[error("SSH authentication failed for {user}@{host}: {message}")]
    Authentication {
        user: String,
        host: String,
        message: String,
    },

    #[error("SSH protocol error: {0}")]
    Protocol(String),

    #[error("SSH connection was lost or timed out: {0}")]
    Socket(#[source] std::io::Error),
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::BadHostKey { .. } => "bad-host-key",
            SessionError::Authentication { .. } => "authentication",
            SessionError::Protocol(_) => "protocol",
            SessionError::Socket(_) => "socket",
        }
    }
}

/// Failure confined to a single target. The batch carries on.
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("failed to archive {path}: {source}")]
    Compression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send {path}: {message}")]
    Put { path: PathBuf, message: String },
}

impl TargetError {
    pub fn kind(&self) -> TargetErrorKind {
        match self {
            TargetError::Compression { .. } => TargetErrorKind::Compression,
            TargetError::Put { .. } => TargetErrorKind::Put,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetErrorKind {
    Compression,
    Put,
}

impl fmt::Display for TargetErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetErrorKind::Compression => f.write_str("compression"),
            TargetErrorKind::Put => f.write_str("put"),
        }
    }
}

/// Outcome of a single SCP put: either this file failed, or the session did.
#[derive(Error, Debug)]
pub enum PutError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_kinds_are_stable() {
        let err = SessionError::Authentication {
            user: "backup".into(),
            host: "example.org".into(),
            message: "denied".into(),
        };
        assert_eq!(err.kind(), "authentication");
        assert!(err.to_string().contains("backup@example.org"));

        let err = SessionError::Socket(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert_eq!(err.kind(), "socket");
    }

    #[test]
    fn target_error_reports_its_kind() {
        let err = TargetError::Put {
            path: PathBuf::from("/data/report.txt"),
            message: "permission denied".into(),
        };
        assert_eq!(err.kind(), TargetErrorKind::Put);
        assert_eq!(err.kind().to_string(), "put");

        let put: PutError = err.into();
        assert!(matches!(put, PutError::Target(_)));
    }
}
