use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while collecting checksums from the remote host.
///
/// Connection-level variants are transient and worth another attempt; local
/// ones (missing key, report I/O) surface immediately.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The host name did not resolve to any address.
    #[error("could not resolve '{host}': {source}")]
    Resolve { host: String, source: io::Error },

    /// TCP connection to the resolved address failed.
    #[error("could not connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    /// SSH transport, handshake or authentication failure.
    #[error("ssh: {0}")]
    Ssh(#[from] ssh2::Error),

    /// Reading the remote command's output streams failed mid-run.
    #[error("remote stream: {0}")]
    Stream(io::Error),

    /// HOME is not set, so the key location cannot be derived.
    #[error("cannot locate the private key: HOME is not set")]
    NoHome,

    /// The server spec has no `user@` prefix and USER is not set either.
    #[error("cannot determine the login user: no user@ prefix and USER is not set")]
    NoUser,

    /// No private key at the expected location.
    #[error("private key not found at '{}'", .path.display())]
    MissingKey { path: PathBuf },

    /// The local report file could not be created or written.
    #[error("writing report '{}': {source}", .path.display())]
    Report { path: PathBuf, source: io::Error },
}

impl CollectError {
    /// Whether the whole connect-and-run sequence should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. } | Self::Connect { .. } | Self::Ssh(_) | Self::Stream(_)
        )
    }
}

/// Failure while turning a raw checksum report into a table.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The raw report could not be read.
    #[error("reading '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// A line did not split into exactly two tokens.
    #[error("line {line}: expected '<checksum> <file>', got '{content}'")]
    Malformed { line: usize, content: String },

    /// The table could not be written to the destination.
    #[error("writing '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}
