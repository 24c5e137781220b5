use anyhow::Result;
use ic_proto::bus::RetryPolicy;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay between connection attempts. Injected so tests don't wait.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, d: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await
    }
}

/// Runs `attempt` up to `policy.max_retries` times (at least once),
/// sleeping the policy delay between failures. The last error is returned
/// with the attempt count attached.
pub async fn bounded<T, F, Fut, S>(policy: &RetryPolicy, sleeper: &S, what: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    S: Sleeper,
{
    let max = policy.max_retries.max(1);
    let mut n = 0;
    loop {
        n += 1;
        match attempt().await {
            Ok(v) => return Ok(v),
            Err(e) if n < max => {
                warn!("{}: attempt {}/{} failed: {:#}", what, n, max, e);
                sleeper.sleep(policy.delay()).await;
            }
            Err(e) => return Err(e.context(format!("{} failed after {} attempts", what, n))),
        }
    }
}
