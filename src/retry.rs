use std::fmt::Display;
use std::time::Duration;

use log::warn;
use rand::Rng;

/// Outcome of driving a fallible operation through the retry loop.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded on some attempt.
    Completed(T),
    /// Every attempt failed with a transient error and the budget ran out.
    Exhausted,
    /// The operation failed with an error that must not be retried.
    Fatal(E),
}

/// Runs `op` until it succeeds, fails fatally, or the attempt budget runs out.
///
/// The attempt counter starts at 1 and the loop runs while `attempt < bound`,
/// so a bound of B performs at most B - 1 attempts and a bound of 1 performs
/// none. Callers pass the operator-facing retry count straight through and
/// rely on these exact semantics; do not make the bound inclusive.
///
/// Every transient failure sleeps for `backoff()` before the counter moves,
/// including the final one. Exhaustion is silent: no error is carried out.
///
/// `op` receives the 1-based attempt number so callers can show it to the
/// operator.
pub fn run_with_retry<T, E, F, C, B>(
    bound: u32,
    mut op: F,
    is_transient: C,
    mut backoff: B,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    C: Fn(&E) -> bool,
    B: FnMut() -> Duration,
    E: Display,
{
    let mut attempt = 1u32;
    while attempt < bound {
        match op(attempt) {
            Ok(value) => return RetryOutcome::Completed(value),
            Err(e) if is_transient(&e) => {
                let delay = backoff();
                warn!(
                    "Could not connect, will try again in {} seconds ({attempt}): {e}",
                    delay.as_secs()
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return RetryOutcome::Fatal(e),
        }
    }
    RetryOutcome::Exhausted
}

/// Uniformly random whole-second delay in `[min, max)`.
pub fn uniform_backoff(min: u64, max: u64) -> Duration {
    Duration::from_secs(rand::thread_rng().gen_range(min..max))
}
