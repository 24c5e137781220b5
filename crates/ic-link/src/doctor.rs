use ic_proto::bus::RetryPolicy;

pub fn check_retry(policy: &RetryPolicy) -> anyhow::Result<()> {
    anyhow::ensure!(policy.max_retries >= 1, "client.max_retries must be >= 1");
    anyhow::ensure!(policy.max_retries <= 1_000, "client.max_retries too large");
    anyhow::ensure!(policy.retry_delay_ms <= 60_000, "client.retry_delay_ms should be <= 60s");
    Ok(())
}
