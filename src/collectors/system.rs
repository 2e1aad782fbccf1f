use sysinfo::{ComponentExt, ProcessExt, System, SystemExt};
use tracing::debug;

const CPU_SENSOR_MARKERS: [&str; 7] = ["coretemp", "k10temp", "package", "tctl", "tdie", "cpu", "core"];
const NON_CPU_SENSOR_MARKERS: [&str; 7] = [
    "gpu",
    "nvidia",
    "amdgpu",
    "radeon",
    "acpi",
    "thermal zone",
    "_tz",
];

#[derive(Debug, Clone)]
pub struct HostReading {
    pub ram_usage_percent: f64,
    pub cpu_temperature_celsius: Option<f64>,
    pub processes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TempStat {
    pub sensor: String,
    pub temperature_celsius: f64,
}

pub fn collect_host(system: &mut System) -> HostReading {
    system.refresh_memory();
    system.refresh_processes();
    if system.components().is_empty() {
        system.refresh_components_list();
    }
    system.refresh_components();

    let ram_usage_percent = ram_usage_percent(system.used_memory(), system.total_memory());

    let temps: Vec<TempStat> = system
        .components()
        .iter()
        .map(|c| TempStat {
            sensor: c.label().to_string(),
            temperature_celsius: c.temperature() as f64,
        })
        .collect();
    let cpu_temperature_celsius = cpu_temperature(&temps);

    let processes = process_names(system.processes().values().map(|p| p.name()));

    debug!(
        sensors = temps.len(),
        processes = processes.len(),
        ram_usage_percent,
        "собраны показания хоста"
    );

    HostReading {
        ram_usage_percent,
        cpu_temperature_celsius,
        processes,
    }
}

pub fn ram_usage_percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Максимальная температура среди датчиков CPU. `None`, если таких датчиков нет.
pub fn cpu_temperature(temps: &[TempStat]) -> Option<f64> {
    temps
        .iter()
        .filter(|t| (0.0..=130.0).contains(&t.temperature_celsius))
        .filter(|t| t.temperature_celsius > 0.0)
        .filter(|t| {
            let s = t.sensor.to_lowercase();
            CPU_SENSOR_MARKERS.iter().any(|m| s.contains(m))
                && !NON_CPU_SENSOR_MARKERS.iter().any(|m| s.contains(m))
        })
        .map(|t| t.temperature_celsius)
        .max_by(|a, b| a.total_cmp(b))
}

/// Отсортированный список имён без повторов.
pub fn process_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = names
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}
