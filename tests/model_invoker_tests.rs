use async_trait::async_trait;
use foodpal::model_invoker::{invoke_with_retry, InvokeError, RetryPolicy, TextGenerator};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Fails the first `failures` calls, then answers.
struct FlakyGenerator {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyGenerator {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FlakyGenerator {
    async fn generate(&self, _prompt: &str, timeout: Duration) -> Result<String, InvokeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(InvokeError::Timeout(timeout))
        } else {
            Ok(format!("reply after {} calls", call))
        }
    }
}

struct BlankGenerator;

#[async_trait]
impl TextGenerator for BlankGenerator {
    async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, InvokeError> {
        Ok("\n  \t".to_string())
    }
}

#[tokio::test]
async fn test_first_success_returns_immediately() {
    let generator = FlakyGenerator::new(0);
    let reply = invoke_with_retry(&generator, "prompt", Duration::from_secs(1), &RetryPolicy::immediate(2))
        .await
        .unwrap();
    assert_eq!(reply, "reply after 1 calls");
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_retries_until_success() {
    let generator = FlakyGenerator::new(2);
    let reply = invoke_with_retry(&generator, "prompt", Duration::from_secs(1), &RetryPolicy::immediate(2))
        .await
        .unwrap();
    assert_eq!(reply, "reply after 3 calls");
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let generator = FlakyGenerator::new(10);
    let error = invoke_with_retry(&generator, "prompt", Duration::from_secs(1), &RetryPolicy::immediate(2))
        .await
        .unwrap_err();
    assert_eq!(error.attempts, 3);
    assert!(matches!(error.last_error, InvokeError::Timeout(_)));
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_zero_retries_means_one_attempt() {
    let generator = FlakyGenerator::new(1);
    let error = invoke_with_retry(&generator, "prompt", Duration::from_secs(1), &RetryPolicy::immediate(0))
        .await
        .unwrap_err();
    assert_eq!(error.attempts, 1);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_blank_reply_counts_as_failure() {
    let error = invoke_with_retry(&BlankGenerator, "prompt", Duration::from_secs(1), &RetryPolicy::immediate(1))
        .await
        .unwrap_err();
    assert_eq!(error.attempts, 2);
    assert!(matches!(error.last_error, InvokeError::EmptyResponse));
}

#[tokio::test]
async fn test_backoff_is_applied_between_attempts() {
    let generator = FlakyGenerator::new(2);
    let policy = RetryPolicy::new(2, vec![Duration::from_millis(30)]);
    let started = Instant::now();
    invoke_with_retry(&generator, "prompt", Duration::from_secs(1), &policy)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[test]
fn test_backoff_schedule_repeats_last_entry() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts(), 3);
    assert_eq!(policy.delay_before_retry(1), Duration::from_millis(500));
    assert_eq!(policy.delay_before_retry(2), Duration::from_secs(1));
    assert_eq!(policy.delay_before_retry(7), Duration::from_secs(1));
    assert_eq!(RetryPolicy::immediate(3).delay_before_retry(2), Duration::ZERO);
}
