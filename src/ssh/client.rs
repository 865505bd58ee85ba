// SSH客户端封装
use crate::config::{Credential, TransferConfig};
use crate::transfer::progress::ProgressTracker;
use crate::utils::error::{PutError, SessionError, TargetError};
use crate::ssh::RemoteSession;
use ssh2::{CheckResult, DisconnectCode, ErrorCode, KnownHostFileKind, Session};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

const CHUNK_SIZE: usize = 64 * 1024;

// libssh2 错误码：会话已不可用
const LIBSSH2_ERROR_SOCKET_SEND: i32 = -7;
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_SOCKET_DISCONNECT: i32 = -13;
const LIBSSH2_ERROR_SOCKET_TIMEOUT: i32 = -30;
const LIBSSH2_ERROR_SOCKET_RECV: i32 = -43;

pub struct SshClient {
    session: Session,
    host: String,
    show_progress: bool,
    closed: bool,
}

impl SshClient {
    pub fn connect(config: &TransferConfig, credential: &Credential) -> Result<Self, SessionError> {
        log::debug!("Connecting to {}:{}...", config.host, config.port);

        let tcp = open_tcp(&config.host, config.port, config.timeout)?;

        let mut session = Session::new().map_err(|e| SessionError::Protocol(e.to_string()))?;
        session.set_tcp_stream(tcp);
        if let Some(timeout) = config.timeout {
            session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
        }
        session.handshake().map_err(session_error)?;

        if let Some(known_hosts) = &config.known_hosts {
            verify_host_key(&session, known_hosts, &config.host, config.port)?;
        }

        log::debug!("SSH handshake completed. Authenticating as {}...", config.username);

        let auth = match credential {
            Credential::PrivateKey(key_path) => session.userauth_pubkey_file(&config.username, None, key_path, None),
            Credential::Password(password) => session.userauth_password(&config.username, password),
        };
        let authentication_failed = |message: String| SessionError::Authentication {
            user: config.username.clone(),
            host: config.host.clone(),
            message,
        };
        if let Err(e) = auth {
            if is_connection_lost(&e) {
                return Err(session_error(e));
            }
            return Err(authentication_failed(e.message().to_string()));
        }
        if !session.authenticated() {
            return Err(authentication_failed("server did not accept the credential".into()));
        }

        log::debug!("Authentication successful");
        Ok(SshClient {
            session,
            host: config.host.clone(),
            show_progress: config.show_progress,
            closed: false,
        })
    }

    fn send(&mut self, local: &Path, remote_dir: &str) -> Result<u64, PutError> {
        let target_failed = |message: String| {
            PutError::Target(TargetError::Put {
                path: local.to_path_buf(),
                message,
            })
        };

        let metadata = fs::metadata(local).map_err(|e| target_failed(e.to_string()))?;
        if !metadata.is_file() {
            return Err(target_failed("not a regular file".into()));
        }
        let file_name = local
            .file_name()
            .ok_or_else(|| target_failed("cannot determine file name".into()))?
            .to_string_lossy();
        let remote_path = remote_file_path(remote_dir, &file_name);
        let size = metadata.len();

        let mut local_file = File::open(local).map_err(|e| target_failed(e.to_string()))?;

        log::debug!("scp {} -> {}:{} ({} bytes)", local.display(), self.host, remote_path, size);
        let mut channel = self
            .session
            .scp_send(Path::new(&remote_path), file_mode(&metadata), size, file_times(&metadata))
            .map_err(|e| classify_ssh(e, &target_failed))?;

        let progress = if self.show_progress {
            ProgressTracker::new(size, &format!("Uploading {}", local.display()))
        } else {
            ProgressTracker::hidden(size)
        };

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut transferred: u64 = 0;
        loop {
            let bytes_read = match local_file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    progress.finish_with_error(&e.to_string());
                    return Err(target_failed(format!("local read error: {}", e)));
                }
            };
            if let Err(e) = channel.write_all(&buffer[..bytes_read]) {
                progress.finish_with_error(&e.to_string());
                return Err(classify_io(e, &target_failed));
            }
            transferred += bytes_read as u64;
            progress.update(transferred);
        }

        channel.send_eof().map_err(|e| classify_ssh(e, &target_failed))?;
        channel.wait_eof().map_err(|e| classify_ssh(e, &target_failed))?;
        channel.close().map_err(|e| classify_ssh(e, &target_failed))?;
        channel.wait_close().map_err(|e| classify_ssh(e, &target_failed))?;

        progress.finish();
        Ok(transferred)
    }
}

impl RemoteSession for SshClient {
    fn put(&mut self, local: &Path, remote_dir: &str) -> Result<u64, PutError> {
        self.send(local, remote_dir)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self
            .session
            .disconnect(Some(DisconnectCode::ByApplication), "backup finished", None)
        {
            log::warn!("SSH disconnect from {} failed: {}", self.host, e);
        }
    }
}

impl Drop for SshClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn open_tcp(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream, SessionError> {
    let Some(timeout) = timeout else {
        return TcpStream::connect((host, port)).map_err(SessionError::Socket);
    };

    let mut last_err = io::Error::new(io::ErrorKind::NotFound, format!("no address found for {}", host));
    for addr in (host, port).to_socket_addrs().map_err(SessionError::Socket)? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = e,
        }
    }
    Err(SessionError::Socket(last_err))
}

fn verify_host_key(session: &Session, known_hosts: &Path, host: &str, port: u16) -> Result<(), SessionError> {
    let (key, _) = session
        .host_key()
        .ok_or_else(|| SessionError::Protocol("server did not present a host key".into()))?;

    let mut known = session.known_hosts().map_err(session_error)?;
    known
        .read_file(known_hosts, KnownHostFileKind::OpenSSH)
        .map_err(|e| SessionError::Protocol(format!("cannot read {}: {}", known_hosts.display(), e)))?;

    match known.check_port(host, port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => {
            log::warn!("Host {} is not in {}; accepting its key", host, known_hosts.display());
            Ok(())
        }
        CheckResult::Mismatch => Err(SessionError::BadHostKey { host: host.to_string() }),
        CheckResult::Failure => Err(SessionError::Protocol(format!("host key check for {} failed", host))),
    }
}

fn is_connection_lost(err: &ssh2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::Session(
            LIBSSH2_ERROR_SOCKET_SEND
                | LIBSSH2_ERROR_TIMEOUT
                | LIBSSH2_ERROR_SOCKET_DISCONNECT
                | LIBSSH2_ERROR_SOCKET_TIMEOUT
                | LIBSSH2_ERROR_SOCKET_RECV
        )
    )
}

fn session_error(err: ssh2::Error) -> SessionError {
    if is_connection_lost(&err) {
        SessionError::Socket(io::Error::from(err))
    } else {
        SessionError::Protocol(err.to_string())
    }
}

fn classify_ssh(err: ssh2::Error, target_failed: &impl Fn(String) -> PutError) -> PutError {
    if is_connection_lost(&err) {
        PutError::Session(session_error(err))
    } else {
        target_failed(err.to_string())
    }
}

fn classify_io(err: io::Error, target_failed: &impl Fn(String) -> PutError) -> PutError {
    // ssh2 把自己的错误包在 io::Error 里
    let lost = match err.get_ref().and_then(|inner| inner.downcast_ref::<ssh2::Error>()) {
        Some(inner) => is_connection_lost(inner),
        None => matches!(
            err.kind(),
            io::ErrorKind::TimedOut
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
        ),
    };
    if lost {
        PutError::Session(SessionError::Socket(err))
    } else {
        target_failed(err.to_string())
    }
}

pub(crate) fn remote_file_path(remote_dir: &str, file_name: &str) -> String {
    if remote_dir.is_empty() {
        return file_name.to_string();
    }
    format!("{}/{}", remote_dir.trim_end_matches('/'), file_name)
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> i32 {
    use std::os::unix::fs::PermissionsExt;
    (metadata.permissions().mode() & 0o777) as i32
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> i32 {
    0o644
}

fn file_times(metadata: &fs::Metadata) -> Option<(u64, u64)> {
    let mtime = metadata.modified().ok()?.duration_since(UNIX_EPOCH).ok()?.as_secs();
    let atime = metadata
        .accessed()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(mtime);
    Some((mtime, atime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_path_joins_directory_and_name() {
        assert_eq!(remote_file_path("/backup", "db1.zip"), "/backup/db1.zip");
        assert_eq!(remote_file_path("/backup/", "report.txt"), "/backup/report.txt");
        assert_eq!(remote_file_path("/", "report.txt"), "/report.txt");
        assert_eq!(remote_file_path("", "report.txt"), "report.txt");
    }

    #[test]
    fn io_timeouts_abort_the_session() {
        let failed = |m: String| {
            PutError::Target(TargetError::Put {
                path: "/a".into(),
                message: m,
            })
        };
        let err = classify_io(io::Error::from(io::ErrorKind::TimedOut), &failed);
        assert!(matches!(err, PutError::Session(SessionError::Socket(_))));

        let err = classify_io(io::Error::from(io::ErrorKind::PermissionDenied), &failed);
        assert!(matches!(err, PutError::Target(_)));
    }

    #[test]
    fn refused_connection_is_a_socket_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = open_tcp("127.0.0.1", port, Some(Duration::from_secs(2))).unwrap_err();
        assert_eq!(err.kind(), "socket");
    }
}
