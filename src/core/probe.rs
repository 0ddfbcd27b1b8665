use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::{sleep_until, timeout, Instant};

/// 以固定間隔輪詢 endpoint，直到回應 2xx 或逾時
pub struct AvailabilityProbe {
    client: Client,
    endpoint: String,
    poke_interval: Duration,
    timeout: Duration,
}

impl AvailabilityProbe {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        poke_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            poke_interval,
            timeout,
        }
    }

    /// 成功時回傳嘗試次數
    pub async fn wait_until_available(&self) -> Result<u32> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            // 單次請求以剩餘時間為上限，落在 deadline 上的最後一次保有一個 interval
            let budget = deadline
                .saturating_duration_since(Instant::now())
                .max(self.poke_interval.min(self.timeout));
            match timeout(budget, self.client.get(&self.endpoint).send()).await {
                Ok(Ok(response)) if response.status().is_success() => {
                    tracing::info!(
                        "✅ {} is available (attempt {}, {:?})",
                        self.endpoint,
                        attempts,
                        started.elapsed()
                    );
                    return Ok(attempts);
                }
                Ok(Ok(response)) => {
                    tracing::debug!(
                        "Probe attempt {} got status {} from {}",
                        attempts,
                        response.status(),
                        self.endpoint
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!("Probe attempt {} failed: {}", attempts, e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Probe attempt {} to {} did not answer within {:?}",
                        attempts,
                        self.endpoint,
                        budget
                    );
                }
            }

            if Instant::now() >= deadline {
                return Err(EtlError::SensorTimeoutError {
                    endpoint: self.endpoint.clone(),
                    waited_secs: started.elapsed().as_secs(),
                    attempts,
                });
            }

            // 最後一次輪詢落在 timeout 的時間點上
            sleep_until((Instant::now() + self.poke_interval).min(deadline)).await;
        }
    }
}
