use rand::Rng;
use std::time::Duration;

/// Delay before retrying a failed classification call: base * 2^attempt with
/// ±25% jitter. The exponent cap keeps the worst case around a minute with
/// the default base; a feed batch is not worth stalling longer than that.
pub fn retry_delay(attempt: u32, base_delay_secs: u32) -> Duration {
    let capped_attempt = attempt.min(5);
    let base = base_delay_secs.saturating_mul(2_u32.saturating_pow(capped_attempt));
    let jitter = rand::thread_rng().gen_range(0.75..1.25);
    Duration::from_millis((f64::from(base) * 1000.0 * jitter).round() as u64)
}
