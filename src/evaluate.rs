use crate::collectors::Sample;
use crate::settings::AlarmSettings;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Metric {
    #[serde(rename = "RAM Usage")]
    RamUsage,
    #[serde(rename = "CPU Temperature")]
    CpuTemperature,
    #[serde(rename = "GPU Temperature")]
    GpuTemperature,
    #[serde(rename = "Internet")]
    Internet,
    #[serde(rename = "Monitored Process")]
    MonitoredProcess,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::RamUsage,
        Metric::CpuTemperature,
        Metric::GpuTemperature,
        Metric::Internet,
        Metric::MonitoredProcess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::RamUsage => "RAM Usage",
            Metric::CpuTemperature => "CPU Temperature",
            Metric::GpuTemperature => "GPU Temperature",
            Metric::Internet => "Internet",
            Metric::MonitoredProcess => "Monitored Process",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "OK")]
    Ok,
    Alarm,
    /// Показание недоступно. Никогда не вызывает тревогу.
    Unknown,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::Alarm => "Alarm",
            Verdict::Unknown => "N/A",
        }
    }
}

pub type Verdicts = BTreeMap<Metric, Verdict>;

pub fn evaluate_threshold(value: f64, threshold: f64) -> Verdict {
    if value >= threshold {
        Verdict::Alarm
    } else {
        Verdict::Ok
    }
}

pub fn evaluate_reading(value: Option<f64>, threshold: f64) -> Verdict {
    match value {
        Some(v) => evaluate_threshold(v, threshold),
        None => Verdict::Unknown,
    }
}

pub fn evaluate_reachability(reachable: bool) -> Verdict {
    if reachable {
        Verdict::Ok
    } else {
        Verdict::Alarm
    }
}

/// `None` означает, что процесс не отслеживается.
pub fn evaluate_process(running: Option<bool>) -> Verdict {
    match running {
        Some(true) => Verdict::Ok,
        Some(false) => Verdict::Alarm,
        None => Verdict::Unknown,
    }
}

/// Вердикты считаются для всех метрик, флаг `enabled` на них не влияет.
pub fn evaluate_all(sample: &Sample, settings: &AlarmSettings) -> Verdicts {
    let process_running = settings
        .selected_process()
        .map(|name| sample.process_running(name));

    let mut verdicts = Verdicts::new();
    verdicts.insert(
        Metric::RamUsage,
        evaluate_threshold(sample.ram_usage_percent, settings.ram.threshold),
    );
    verdicts.insert(
        Metric::CpuTemperature,
        evaluate_reading(
            sample.cpu_temperature_celsius,
            settings.cpu_temperature.threshold,
        ),
    );
    verdicts.insert(
        Metric::GpuTemperature,
        evaluate_reading(
            sample.gpu_temperature_celsius,
            settings.gpu_temperature.threshold,
        ),
    );
    verdicts.insert(
        Metric::Internet,
        evaluate_reachability(sample.internet_reachable),
    );
    verdicts.insert(Metric::MonitoredProcess, evaluate_process(process_running));
    verdicts
}

pub fn is_enabled(metric: Metric, settings: &AlarmSettings) -> bool {
    match metric {
        Metric::RamUsage => settings.ram.enabled,
        Metric::CpuTemperature => settings.cpu_temperature.enabled,
        Metric::GpuTemperature => settings.gpu_temperature.enabled,
        Metric::Internet => settings.internet.enabled,
        Metric::MonitoredProcess => settings.process.enabled,
    }
}

/// Метрики, которые должны поднять тревогу в этом цикле.
pub fn breached(verdicts: &Verdicts, settings: &AlarmSettings) -> Vec<Metric> {
    verdicts
        .iter()
        .filter(|(metric, verdict)| **verdict == Verdict::Alarm && is_enabled(**metric, settings))
        .map(|(metric, _)| *metric)
        .collect()
}
