//! Remote checksum collection: one SSH command over a directory tree,
//! retried on connection-level failure.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::ProgressBar;
use log::{error, info};

use crate::error::CollectError;
use crate::retry::{run_with_retry, uniform_backoff, RetryOutcome};
use crate::ssh::{private_key_path, RemoteSession};

/// Everything one collection run needs.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Remote server, `host` or `user@host`.
    pub server: String,
    /// Directory tree to hash on the remote side.
    pub remote_path: String,
    /// Local destination for the raw report.
    pub report: PathBuf,
    /// Retry budget for the connect-and-run sequence.
    pub retries: u32,
}

/// The remote invocation: every regular file under the target directory,
/// hashed in binary mode so the output carries the `*` marker.
pub fn remote_command(remote_path: &str) -> String {
    format!("/usr/bin/find {remote_path} -type f | /usr/bin/xargs /usr/bin/sha256sum --binary")
}

/// Connects to the server and writes `<hash>  <path>` lines to the report,
/// echoing them to stdout as they arrive.
///
/// Connection-level failures sleep a random 1-59 seconds and retry; once the
/// retry budget is gone the run gives up quietly and still returns the
/// normal status line, with no report guaranteed on disk. Local I/O and
/// missing-key errors are fatal and propagate instead.
pub fn collect(opts: &CollectOptions) -> Result<String, CollectError> {
    let key = private_key_path()?;

    let outcome = run_with_retry(
        opts.retries,
        |attempt| run_once(opts, &key, attempt),
        CollectError::is_transient,
        || uniform_backoff(1, 60),
    );

    match outcome {
        RetryOutcome::Completed(()) => {}
        RetryOutcome::Exhausted => {
            error!(
                "Giving up on {} after exhausting {} retries",
                opts.server, opts.retries
            );
        }
        RetryOutcome::Fatal(e) => return Err(e),
    }

    Ok(format!(
        "SHA256 collected and calculated from {}:{} was written to {}",
        opts.server,
        opts.remote_path,
        opts.report.display()
    ))
}

fn run_once(opts: &CollectOptions, key: &Path, attempt: u32) -> Result<(), CollectError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!(
        "Connecting to {} (attempt {attempt})...",
        opts.server
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let session = RemoteSession::connect(&opts.server, key);
    spinner.finish_and_clear();
    let session = session?;

    info!(
        "SSH connected to {}, getting remote checksums. It will take a while...",
        session.host()
    );

    let file = File::create(&opts.report).map_err(|source| CollectError::Report {
        path: opts.report.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let status = session.exec_streaming(&remote_command(&opts.remote_path), |line| {
        writeln!(writer, "{line}").map_err(|source| CollectError::Report {
            path: opts.report.clone(),
            source,
        })?;
        println!("{line}");
        Ok(())
    })?;

    writer.flush().map_err(|source| CollectError::Report {
        path: opts.report.clone(),
        source,
    })?;

    if status != 0 {
        // Advisory only; whatever went wrong remotely is already on stderr.
        info!("Remote command exited with status {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn remote_command_pipes_find_into_sha256sum() {
        let cmd = remote_command("/srv/reports");
        assert_eq!(
            cmd,
            "/usr/bin/find /srv/reports -type f | /usr/bin/xargs /usr/bin/sha256sum --binary"
        );
    }

    #[test]
    fn connection_failures_are_transient() {
        let resolve = CollectError::Resolve {
            host: "nowhere.example".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such host"),
        };
        assert!(resolve.is_transient());

        let connect = CollectError::Connect {
            addr: "192.0.2.1:22".into(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(connect.is_transient());

        let stream = CollectError::Stream(io::Error::new(io::ErrorKind::BrokenPipe, "eof"));
        assert!(stream.is_transient());
    }

    #[test]
    fn local_failures_are_fatal() {
        let report = CollectError::Report {
            path: PathBuf::from("/tmp/report.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!report.is_transient());

        let key = CollectError::MissingKey {
            path: PathBuf::from("/home/op/.ssh/id_rsa"),
        };
        assert!(!key.is_transient());

        assert!(!CollectError::NoHome.is_transient());
        assert!(!CollectError::NoUser.is_transient());
    }

    #[test]
    fn report_gets_stdout_only_verbatim_and_in_order() {
        use std::io::Cursor;

        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("raw.txt");
        let file = File::create(&report).unwrap();
        let mut writer = BufWriter::new(file);

        // Same sink shape as run_once: write each line to the report, echo.
        let stdout = Cursor::new("deadbeef *one.bin\ncafebabe *two.bin\n");
        let stderr = Cursor::new("find: '/srv/x': Permission denied\n");
        crate::ssh::route_output(
            stdout,
            stderr,
            &mut |line| {
                writeln!(writer, "{line}").map_err(|source| CollectError::Report {
                    path: report.clone(),
                    source,
                })?;
                println!("{line}");
                Ok(())
            },
            &mut |_| {},
        )
        .unwrap();
        writer.flush().unwrap();

        let written = std::fs::read_to_string(&report).unwrap();
        assert_eq!(written, "deadbeef *one.bin\ncafebabe *two.bin\n");
        assert!(!written.contains("Permission denied"));
    }
}
