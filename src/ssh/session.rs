// SSH会话管理
use crate::config::{Credential, TransferConfig};
use crate::ssh::SshClient;
use crate::utils::error::{PutError, SessionError};
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// An open, authenticated session able to push files to the remote host.
pub trait RemoteSession {
    /// Copies `local` into the remote directory `remote_dir`, returning the bytes sent.
    fn put(&mut self, local: &Path, remote_dir: &str) -> Result<u64, PutError>;

    /// Ends the session. Must tolerate being called more than once.
    fn close(&mut self);
}

/// Opens sessions; one per batch.
pub trait Connector {
    type Session: RemoteSession;

    fn connect(&self, config: &TransferConfig, credential: &Credential) -> Result<Self::Session, SessionError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Session = SshClient;

    fn connect(&self, config: &TransferConfig, credential: &Credential) -> Result<SshClient, SessionError> {
        SshClient::connect(config, credential)
    }
}

/// Holds a session for the length of a batch and closes it when dropped,
/// whichever way the batch ends.
pub struct SessionGuard<S: RemoteSession> {
    session: S,
}

impl<S: RemoteSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: RemoteSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: RemoteSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: RemoteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.close();
    }
}
