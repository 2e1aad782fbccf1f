use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, warn};

/// TCP-проверка доступности сети. Таймаут считается недоступностью.
pub async fn probe_reachability(addr: &str, timeout: Duration) -> bool {
    let start = Instant::now();

    match time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => {
            debug!(
                address = %addr,
                latency_ms = start.elapsed().as_millis() as u64,
                "сеть доступна"
            );
            true
        }
        Ok(Err(err)) => {
            warn!(address = %addr, error = %err, "проверка сети не удалась");
            false
        }
        Err(_elapsed) => {
            warn!(address = %addr, timeout_ms = timeout.as_millis() as u64, "таймаут проверки сети");
            false
        }
    }
}
