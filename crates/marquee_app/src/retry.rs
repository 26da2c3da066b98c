use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use marquee_domain::{ChatCompletion, ChatRequest, CompletionService, Error, RetryConfig};
use tracing::warn;

pub async fn retry_with_config<F, Fut, T, C>(
    config: &RetryConfig,
    operation: F,
    notify: Option<C>,
) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
    C: Fn(&anyhow::Error, Duration) + Send + Sync + 'static,
{
    let strategy = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.min_delay_ms))
        .with_factor(config.backoff_factor as f32)
        .with_max_times(config.max_retry_attempts)
        .with_jitter();

    let retryable = operation.retry(&strategy).when(should_retry);

    match notify {
        Some(callback) => retryable.notify(callback).await,
        None => retryable.await,
    }
}

/// Sends `request`, retrying failures the provider marked as retryable.
pub async fn chat_with_retry<C: CompletionService + ?Sized>(
    completion: &C,
    config: &RetryConfig,
    request: ChatRequest,
) -> anyhow::Result<ChatCompletion> {
    let model = request.model.clone();
    retry_with_config(
        config,
        || completion.chat(request.clone()),
        Some(move |error: &anyhow::Error, delay: Duration| {
            warn!(model = %model, error = %error, delay_ms = delay.as_millis() as u64, "Retrying completion");
        }),
    )
    .await
}

/// Only `Error::Retryable` triggers another attempt.
fn should_retry(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<Error>()
        .is_some_and(|error| matches!(error, Error::Retryable(_)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    fn config() -> RetryConfig {
        RetryConfig::default().min_delay_ms(1u64).max_retry_attempts(2usize)
    }

    #[tokio::test]
    async fn test_retryable_errors_are_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let operation = move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), anyhow::Error>(Error::Retryable(anyhow::anyhow!("503")).into())
            }
        };

        let actual = retry_with_config(&config(), operation, None::<fn(&anyhow::Error, Duration)>).await;

        assert!(actual.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_fail_immediately() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let operation = move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), anyhow::Error>(anyhow::anyhow!("bad request"))
            }
        };

        let actual = retry_with_config(&config(), operation, None::<fn(&anyhow::Error, Duration)>).await;

        assert!(actual.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
