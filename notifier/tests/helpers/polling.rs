use std::thread;
use std::time::{Duration, Instant};

const INITIAL_DELAY_MS: u64 = 10;
const MAX_DELAY_MS: u64 = 250;

/// Poll `condition` with exponential backoff until it holds or `timeout`
/// elapses. Returns whether the condition was observed.
pub fn wait_until<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let mut delay = Duration::from_millis(INITIAL_DELAY_MS);

    loop {
        if condition() {
            return true;
        }
        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return false;
        }
        thread::sleep(delay.min(remaining));
        delay = delay
            .checked_mul(2)
            .unwrap_or(Duration::from_millis(MAX_DELAY_MS))
            .min(Duration::from_millis(MAX_DELAY_MS));
    }
}
