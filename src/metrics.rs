use crate::collectors::{now_unix, Sample};
use crate::evaluate::{Verdict, Verdicts};
use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, GaugeVec, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    started_at_unix: i64,
    pub sysalarm_ram_usage_percent: Gauge,
    pub sysalarm_cpu_temperature_celsius: Gauge,
    pub sysalarm_gpu_temperature_celsius: Gauge,
    pub sysalarm_sensor_available: GaugeVec,
    pub sysalarm_internet_up: Gauge,
    pub sysalarm_process_count: Gauge,
    pub sysalarm_verdict: GaugeVec,
    pub sysalarm_alarm_active: Gauge,
    pub sysalarm_alarms_triggered_total: Counter,
    pub sysalarm_collect_errors_total: CounterVec,
    pub sysalarm_scrape_count_total: Counter,
    pub sysalarm_uptime_seconds: Gauge,
    pub sysalarm_last_sample_timestamp_seconds: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let sysalarm_ram_usage_percent = Gauge::with_opts(opts!(
            "sysalarm_ram_usage_percent",
            "RAM usage in percent (0..100)"
        ))?;
        let sysalarm_cpu_temperature_celsius = Gauge::with_opts(opts!(
            "sysalarm_cpu_temperature_celsius",
            "Maximum CPU sensor temperature in Celsius (if available)"
        ))?;
        let sysalarm_gpu_temperature_celsius = Gauge::with_opts(opts!(
            "sysalarm_gpu_temperature_celsius",
            "GPU temperature reported by the query tool in Celsius (if available)"
        ))?;
        let sysalarm_sensor_available = GaugeVec::new(
            opts!(
                "sysalarm_sensor_available",
                "Whether the sensor produced a reading in the last sample 0/1"
            ),
            &["sensor"],
        )?;
        let sysalarm_internet_up = Gauge::with_opts(opts!(
            "sysalarm_internet_up",
            "Reachability probe status 0/1"
        ))?;
        let sysalarm_process_count = Gauge::with_opts(opts!(
            "sysalarm_process_count",
            "Number of distinct process names"
        ))?;
        let sysalarm_verdict = GaugeVec::new(
            opts!(
                "sysalarm_verdict",
                "Verdict by metric: 0 OK, 1 Alarm, -1 Unknown"
            ),
            &["metric"],
        )?;
        let sysalarm_alarm_active = Gauge::with_opts(opts!(
            "sysalarm_alarm_active",
            "Alarm state 0/1"
        ))?;
        let sysalarm_alarms_triggered_total = Counter::with_opts(opts!(
            "sysalarm_alarms_triggered_total",
            "Number of Inactive -> Active alarm transitions"
        ))?;
        let sysalarm_collect_errors_total = CounterVec::new(
            opts!(
                "sysalarm_collect_errors_total",
                "Collector errors total by collector"
            ),
            &["collector"],
        )?;
        let sysalarm_scrape_count_total = Counter::with_opts(opts!(
            "sysalarm_scrape_count_total",
            "Number of /metrics scrapes"
        ))?;
        let sysalarm_uptime_seconds =
            Gauge::with_opts(opts!("sysalarm_uptime_seconds", "Process uptime in seconds"))?;
        let sysalarm_last_sample_timestamp_seconds = Gauge::with_opts(opts!(
            "sysalarm_last_sample_timestamp_seconds",
            "Unix timestamp of the last sample"
        ))?;

        register(&registry, &sysalarm_ram_usage_percent)?;
        register(&registry, &sysalarm_cpu_temperature_celsius)?;
        register(&registry, &sysalarm_gpu_temperature_celsius)?;
        register(&registry, &sysalarm_sensor_available)?;
        register(&registry, &sysalarm_internet_up)?;
        register(&registry, &sysalarm_process_count)?;
        register(&registry, &sysalarm_verdict)?;
        register(&registry, &sysalarm_alarm_active)?;
        register(&registry, &sysalarm_alarms_triggered_total)?;
        register(&registry, &sysalarm_collect_errors_total)?;
        register(&registry, &sysalarm_scrape_count_total)?;
        register(&registry, &sysalarm_uptime_seconds)?;
        register(&registry, &sysalarm_last_sample_timestamp_seconds)?;

        Ok(Arc::new(Self {
            registry,
            started_at_unix: now_unix(),
            sysalarm_ram_usage_percent,
            sysalarm_cpu_temperature_celsius,
            sysalarm_gpu_temperature_celsius,
            sysalarm_sensor_available,
            sysalarm_internet_up,
            sysalarm_process_count,
            sysalarm_verdict,
            sysalarm_alarm_active,
            sysalarm_alarms_triggered_total,
            sysalarm_collect_errors_total,
            sysalarm_scrape_count_total,
            sysalarm_uptime_seconds,
            sysalarm_last_sample_timestamp_seconds,
        }))
    }

    pub fn update_from_sample(&self, sample: &Sample, verdicts: &Verdicts) {
        self.sysalarm_ram_usage_percent
            .set(sample.ram_usage_percent);
        self.sysalarm_last_sample_timestamp_seconds
            .set(sample.taken_at_unix as f64);

        self.sysalarm_sensor_available
            .with_label_values(&["cpu_temperature"])
            .set(if sample.cpu_temperature_celsius.is_some() { 1.0 } else { 0.0 });
        self.sysalarm_sensor_available
            .with_label_values(&["gpu_temperature"])
            .set(if sample.gpu_temperature_celsius.is_some() { 1.0 } else { 0.0 });
        // Без показания оставлять прошлое значение нельзя.
        self.sysalarm_cpu_temperature_celsius
            .set(sample.cpu_temperature_celsius.unwrap_or(f64::NAN));
        self.sysalarm_gpu_temperature_celsius
            .set(sample.gpu_temperature_celsius.unwrap_or(f64::NAN));

        self.sysalarm_internet_up
            .set(if sample.internet_reachable { 1.0 } else { 0.0 });
        self.sysalarm_process_count
            .set(sample.processes.len() as f64);

        for (metric, verdict) in verdicts {
            let value = match verdict {
                Verdict::Ok => 0.0,
                Verdict::Alarm => 1.0,
                Verdict::Unknown => -1.0,
            };
            self.sysalarm_verdict
                .with_label_values(&[metric.as_str()])
                .set(value);
        }

        let uptime = now_unix().saturating_sub(self.started_at_unix) as f64;
        self.sysalarm_uptime_seconds.set(uptime);
    }

    pub fn set_alarm_active(&self, active: bool) {
        self.sysalarm_alarm_active
            .set(if active { 1.0 } else { 0.0 });
    }

    pub fn inc_alarm_triggered(&self) {
        self.sysalarm_alarms_triggered_total.inc();
    }

    pub fn inc_scrape_count(&self) {
        self.sysalarm_scrape_count_total.inc();
    }

    pub fn inc_collect_error(&self, collector: &str) {
        self.sysalarm_collect_errors_total
            .with_label_values(&[collector])
            .inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}
