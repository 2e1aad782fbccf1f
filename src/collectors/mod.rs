pub mod checks;
pub mod gpu;
pub mod system;

use crate::config::Config;
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{System, SystemExt};
use tracing::debug;

/// Один срез показаний хоста. Хранится только последний срез.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Sample {
    pub taken_at_unix: i64,
    pub ram_usage_percent: f64,
    pub cpu_temperature_celsius: Option<f64>,
    pub gpu_temperature_celsius: Option<f64>,
    pub internet_reachable: bool,
    pub processes: Vec<String>,
}

impl Sample {
    pub fn process_running(&self, name: &str) -> bool {
        self.processes.binary_search_by(|p| p.as_str().cmp(name)).is_ok()
    }
}

/// Единственное место, где читаются датчики хоста. Результат раздаётся
/// фоновому циклу, дашборду и метрикам.
pub struct Sampler {
    system: System,
    cfg: Arc<Config>,
    metrics: Arc<Metrics>,
}

impl Sampler {
    pub fn new(cfg: Arc<Config>, metrics: Arc<Metrics>) -> Self {
        Self {
            system: System::new(),
            cfg,
            metrics,
        }
    }

    pub async fn sample(&mut self) -> Sample {
        let host = system::collect_host(&mut self.system);

        let reachability = &self.cfg.reachability;
        let address = reachability.address();
        let (gpu_temperature, internet_reachable) = tokio::join!(
            gpu::query_gpu_temperature(&self.cfg.gpu),
            checks::probe_reachability(&address, Duration::from_millis(reachability.timeout_ms)),
        );

        let gpu_temperature_celsius = match gpu_temperature {
            Ok(v) => Some(v),
            Err(err) => {
                debug!(error = %err, "температура GPU недоступна");
                self.metrics.inc_collect_error("gpu_temperature");
                None
            }
        };
        Sample {
            taken_at_unix: now_unix(),
            ram_usage_percent: host.ram_usage_percent,
            cpu_temperature_celsius: host.cpu_temperature_celsius,
            gpu_temperature_celsius,
            internet_reachable,
            processes: host.processes,
        }
    }
}

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_running_matches_exact_name() {
        let sample = Sample {
            processes: vec!["bash".to_string(), "firefox".to_string(), "sshd".to_string()],
            ..Sample::default()
        };
        assert!(sample.process_running("firefox"));
        assert!(!sample.process_running("fire"));
        assert!(!sample.process_running("nginx"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sampler_combines_all_readings() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut cfg = Config::default();
        cfg.reachability.host = "127.0.0.1".to_string();
        cfg.reachability.port = port;
        cfg.gpu.command = "sh".to_string();
        cfg.gpu.args = vec!["-c".to_string(), "echo 58".to_string()];

        let metrics = Metrics::new().expect("инициализация метрик");
        let mut sampler = Sampler::new(Arc::new(cfg), metrics);
        let sample = sampler.sample().await;

        assert!(sample.internet_reachable);
        assert_eq!(sample.gpu_temperature_celsius, Some(58.0));
        assert!((0.0..=100.0).contains(&sample.ram_usage_percent));
        assert!(sample.taken_at_unix > 0);
        assert!(sample.processes.windows(2).all(|w| w[0] < w[1]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_cpu_sensor_is_not_a_collect_error() {
        let mut cfg = Config::default();
        cfg.reachability.host = "127.0.0.1".to_string();
        cfg.reachability.port = 1;
        cfg.reachability.timeout_ms = 500;
        cfg.gpu.command = "sh".to_string();
        cfg.gpu.args = vec!["-c".to_string(), "echo 40".to_string()];

        let metrics = Metrics::new().expect("инициализация метрик");
        let mut sampler = Sampler::new(Arc::new(cfg), metrics.clone());
        sampler.sample().await;
        sampler.sample().await;

        let text = String::from_utf8(metrics.encode_metrics().unwrap()).unwrap();
        assert!(!text.contains("collector=\"cpu_temperature\""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sampler_reports_unavailable_gpu() {
        let mut cfg = Config::default();
        cfg.reachability.host = "127.0.0.1".to_string();
        cfg.reachability.port = 1;
        cfg.reachability.timeout_ms = 500;
        cfg.gpu.command = "sh".to_string();
        cfg.gpu.args = vec!["-c".to_string(), "echo '[N/A]'".to_string()];

        let metrics = Metrics::new().expect("инициализация метрик");
        let mut sampler = Sampler::new(Arc::new(cfg), metrics.clone());
        let sample = sampler.sample().await;

        assert_eq!(sample.gpu_temperature_celsius, None);
        assert!(!sample.internet_reachable);
        let text = String::from_utf8(metrics.encode_metrics().unwrap()).unwrap();
        assert!(text.contains("collector=\"gpu_temperature\""));
    }
}
