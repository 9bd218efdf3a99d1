//! Blocking SSH session management: resolve, connect, authenticate, run one
//! command and stream its output.

use std::io::{BufRead, BufReader};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use ssh2::{CheckResult, KnownHostFileKind, Session};

use crate::error::CollectError;

/// Timeout for the TCP connect and the SSH handshake/auth phases. Generous on
/// purpose; these hosts are sometimes behind slow links. The remote command
/// itself runs without a deadline.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(300);

const SSH_PORT: u16 = 22;

/// Location of the private key. No alternative path is supported;
/// provisioning puts the key pair there on both ends.
pub fn private_key_path() -> Result<PathBuf, CollectError> {
    let home = std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .ok_or(CollectError::NoHome)?;
    let path = PathBuf::from(home).join(".ssh").join("id_rsa");
    if path.is_file() {
        Ok(path)
    } else {
        Err(CollectError::MissingKey { path })
    }
}

/// Splits `user@host` into the login user and the bare host name, defaulting
/// to the invoking user when no prefix is present. With neither a prefix nor
/// USER in the environment there is no name worth guessing, so this fails.
pub fn split_user_host(server: &str) -> Result<(String, String), CollectError> {
    match server.split_once('@') {
        Some((user, host)) if !user.is_empty() => Ok((user.to_string(), host.to_string())),
        _ => {
            let user = std::env::var("USER")
                .ok()
                .filter(|user| !user.is_empty())
                .ok_or(CollectError::NoUser)?;
            Ok((user, server.trim_start_matches('@').to_string()))
        }
    }
}

/// An authenticated session to one host. The underlying transport closes when
/// the session drops, on every exit path.
pub struct RemoteSession {
    session: Session,
    host: String,
}

impl RemoteSession {
    /// Connects and authenticates with the given private key, trusting
    /// whatever host key the server presents.
    pub fn connect(server: &str, key: &Path) -> Result<Self, CollectError> {
        let (user, host) = split_user_host(server)?;

        let addr = (host.as_str(), SSH_PORT)
            .to_socket_addrs()
            .map_err(|source| CollectError::Resolve {
                host: host.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| CollectError::Resolve {
                host: host.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
            })?;
        let tcp =
            TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(|source| {
                CollectError::Connect {
                    addr: addr.to_string(),
                    source,
                }
            })?;

        let mut session = Session::new()?;
        session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
        session.set_tcp_stream(tcp);
        session.handshake()?;
        check_host_key(&session, &host);
        session.userauth_pubkey_file(&user, None, key, None)?;
        debug!("Authenticated as {user}@{host}");

        // Only the connection phase is bounded; hashing a large tree may take
        // arbitrarily long.
        session.set_timeout(0);

        Ok(Self { session, host })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Runs `command` on the remote host, feeding each stdout line to `sink`
    /// in arrival order and echoing stderr lines to the operator's stderr.
    /// Returns the remote exit status.
    pub fn exec_streaming(
        &self,
        command: &str,
        mut sink: impl FnMut(&str) -> Result<(), CollectError>,
    ) -> Result<i32, CollectError> {
        let mut channel = self.session.channel_session()?;
        channel.exec(command)?;

        route_output(
            BufReader::new(channel.stream(0)),
            BufReader::new(channel.stderr()),
            &mut sink,
            &mut |line| eprintln!("{line}"),
        )?;

        channel.wait_close()?;
        Ok(channel.exit_status()?)
    }
}

/// Drains remote stdout into `out` line by line, in arrival order, then
/// drains remote stderr into `err`. Stderr lines never reach `out`, so they
/// can never end up in a report file fed by it.
pub(crate) fn route_output<O, E>(
    stdout: O,
    stderr: E,
    out: &mut impl FnMut(&str) -> Result<(), CollectError>,
    err: &mut impl FnMut(&str),
) -> Result<(), CollectError>
where
    O: BufRead,
    E: BufRead,
{
    for line in stdout.lines() {
        let line = line.map_err(CollectError::Stream)?;
        out(&line)?;
    }
    for line in stderr.lines() {
        let line = line.map_err(CollectError::Stream)?;
        err(&line);
    }
    Ok(())
}

/// Match against ~/.ssh/known_hosts when possible, but accept any new or
/// changed key. Host verification is deliberately relaxed here: these runs
/// are operator-triggered against provisioned hosts, and a strict check
/// would turn every re-imaged server into a failed task.
fn check_host_key(session: &Session, host: &str) {
    let Some((key, _)) = session.host_key() else {
        return;
    };
    let Ok(mut known) = session.known_hosts() else {
        return;
    };

    let file = std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"));
    if let Some(file) = file.filter(|f| f.is_file()) {
        let _ = known.read_file(&file, KnownHostFileKind::OpenSSH);
    }

    match known.check_port(host, SSH_PORT, key) {
        CheckResult::Match => debug!("Host key for {host} matches known_hosts"),
        CheckResult::NotFound => info!("Trusting new host key for {host}"),
        CheckResult::Mismatch => info!("Host key for {host} changed, trusting it anyway"),
        CheckResult::Failure => debug!("Host key check failed for {host}, continuing"),
    }
}
