use crate::collectors::Sample;
use crate::evaluate::{evaluate_all, Metric, Verdict, Verdicts};
use crate::settings::AlarmSettings;
use crate::state::{State, Status};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Orange,
    Red,
    Gray,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub display: String,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmLevel {
    pub label: &'static str,
    pub color: Color,
}

/// То, что получает поверхность отображения на каждом обновлении.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub status: Status,
    pub monitoring: bool,
    pub alarm_active: bool,
    pub started_at_unix: i64,
    pub last_sample_unix: Option<i64>,
    pub last_sample_at: Option<String>,
    pub values: BTreeMap<Metric, Reading>,
    pub verdicts: Verdicts,
    pub levels: BTreeMap<Metric, AlarmLevel>,
}

pub fn usage_color(value: f64) -> Color {
    if value < 60.0 {
        Color::Green
    } else if value < 80.0 {
        Color::Orange
    } else {
        Color::Red
    }
}

pub fn temperature_color(value: f64) -> Color {
    if value < 60.0 {
        Color::Green
    } else if value < 80.0 {
        Color::Orange
    } else {
        Color::Red
    }
}

pub fn level(verdict: Verdict) -> AlarmLevel {
    let color = match verdict {
        Verdict::Ok => Color::Green,
        Verdict::Alarm => Color::Red,
        Verdict::Unknown => Color::Gray,
    };
    AlarmLevel {
        label: verdict.label(),
        color,
    }
}

fn unavailable() -> Reading {
    Reading {
        display: "N/A".to_string(),
        color: Color::Gray,
    }
}

fn temperature_reading(value: Option<f64>, precision: usize) -> Reading {
    match value {
        Some(v) => Reading {
            display: format!("{v:.precision$}°C"),
            color: temperature_color(v),
        },
        None => unavailable(),
    }
}

fn process_reading(sample: &Sample, settings: &AlarmSettings) -> Reading {
    if !settings.process.enabled {
        return Reading {
            display: "Disabled".to_string(),
            color: Color::Gray,
        };
    }
    let Some(name) = settings.selected_process() else {
        return Reading {
            display: "None selected".to_string(),
            color: Color::Gray,
        };
    };
    if sample.process_running(name) {
        Reading {
            display: format!("{name} (Running)"),
            color: Color::Green,
        }
    } else {
        Reading {
            display: format!("{name} (Not Running)"),
            color: Color::Red,
        }
    }
}

pub fn readings(sample: &Sample, settings: &AlarmSettings) -> BTreeMap<Metric, Reading> {
    let mut out = BTreeMap::new();
    out.insert(
        Metric::RamUsage,
        Reading {
            display: format!("{:.1}%", sample.ram_usage_percent),
            color: usage_color(sample.ram_usage_percent),
        },
    );
    out.insert(
        Metric::CpuTemperature,
        temperature_reading(sample.cpu_temperature_celsius, 1),
    );
    out.insert(
        Metric::GpuTemperature,
        temperature_reading(sample.gpu_temperature_celsius, 0),
    );
    let internet = if sample.internet_reachable {
        Reading {
            display: "Connected".to_string(),
            color: Color::Green,
        }
    } else {
        Reading {
            display: "Disconnected".to_string(),
            color: Color::Red,
        }
    };
    out.insert(Metric::Internet, internet);
    out.insert(Metric::MonitoredProcess, process_reading(sample, settings));
    out
}

pub fn build_dashboard(state: &State, sample: Option<&Sample>) -> Dashboard {
    let (values, verdicts) = match sample {
        Some(sample) => (
            readings(sample, &state.settings),
            evaluate_all(sample, &state.settings),
        ),
        None => (
            Metric::ALL.iter().map(|m| (*m, unavailable())).collect(),
            Metric::ALL.iter().map(|m| (*m, Verdict::Unknown)).collect(),
        ),
    };
    let levels = verdicts.iter().map(|(m, v)| (*m, level(*v))).collect();

    Dashboard {
        status: state.status.clone(),
        monitoring: state.monitoring,
        alarm_active: state.alarm_active(),
        started_at_unix: state.started_at_unix,
        last_sample_unix: sample.map(|s| s.taken_at_unix),
        last_sample_at: sample.map(|s| format_unix(s.taken_at_unix)),
        values,
        verdicts,
        levels,
    }
}

fn format_unix(ts: i64) -> String {
    let st = UNIX_EPOCH + Duration::from_secs(ts.max(0) as u64);
    humantime::format_rfc3339_seconds(st).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ProcessSetting;

    fn sample() -> Sample {
        Sample {
            taken_at_unix: 0,
            ram_usage_percent: 90.0,
            cpu_temperature_celsius: None,
            gpu_temperature_celsius: Some(65.0),
            internet_reachable: false,
            processes: vec!["sshd".to_string()],
        }
    }

    #[test]
    fn color_scale_breakpoints() {
        assert_eq!(usage_color(59.9), Color::Green);
        assert_eq!(usage_color(60.0), Color::Orange);
        assert_eq!(usage_color(79.9), Color::Orange);
        assert_eq!(usage_color(80.0), Color::Red);
        assert_eq!(temperature_color(90.0), Color::Red);
    }

    #[test]
    fn ram_over_threshold_is_red_alarm() {
        let mut state = State::new(0, AlarmSettings::default());
        state.settings.ram.enabled = true;
        let dash = build_dashboard(&state, Some(&sample()));

        let ram = &dash.values[&Metric::RamUsage];
        assert_eq!(ram.display, "90.0%");
        assert_eq!(ram.color, Color::Red);
        assert_eq!(dash.verdicts[&Metric::RamUsage], Verdict::Alarm);
        assert_eq!(dash.levels[&Metric::RamUsage].label, "Alarm");
    }

    #[test]
    fn missing_sensor_shows_na() {
        let state = State::new(0, AlarmSettings::default());
        let dash = build_dashboard(&state, Some(&sample()));

        let cpu = &dash.values[&Metric::CpuTemperature];
        assert_eq!(cpu.display, "N/A");
        assert_eq!(cpu.color, Color::Gray);
        assert_eq!(dash.verdicts[&Metric::CpuTemperature], Verdict::Unknown);
        assert_eq!(dash.levels[&Metric::CpuTemperature].label, "N/A");

        let gpu = &dash.values[&Metric::GpuTemperature];
        assert_eq!(gpu.display, "65°C");
        assert_eq!(gpu.color, Color::Orange);

        assert_eq!(dash.values[&Metric::Internet].display, "Disconnected");
    }

    #[test]
    fn process_display_follows_selection() {
        let mut state = State::new(0, AlarmSettings::default());
        let dash = build_dashboard(&state, Some(&sample()));
        assert_eq!(dash.values[&Metric::MonitoredProcess].display, "Disabled");

        state.settings.process = ProcessSetting::new(true, None);
        let dash = build_dashboard(&state, Some(&sample()));
        assert_eq!(dash.values[&Metric::MonitoredProcess].display, "None selected");

        state.settings.process = ProcessSetting::new(true, Some("sshd".to_string()));
        let dash = build_dashboard(&state, Some(&sample()));
        assert_eq!(dash.values[&Metric::MonitoredProcess].display, "sshd (Running)");

        state.settings.process = ProcessSetting::new(true, Some("nginx".to_string()));
        let dash = build_dashboard(&state, Some(&sample()));
        let reading = &dash.values[&Metric::MonitoredProcess];
        assert_eq!(reading.display, "nginx (Not Running)");
        assert_eq!(reading.color, Color::Red);
    }

    #[test]
    fn no_sample_yet_is_all_unknown() {
        let state = State::new(0, AlarmSettings::default());
        let dash = build_dashboard(&state, None);
        assert_eq!(dash.values.len(), Metric::ALL.len());
        assert!(dash.verdicts.values().all(|v| *v == Verdict::Unknown));
        assert!(dash.last_sample_at.is_none());
    }

    #[test]
    fn serializes_metric_names_as_keys() {
        let state = State::new(0, AlarmSettings::default());
        let dash = build_dashboard(&state, Some(&sample()));
        let json = serde_json::to_value(&dash).unwrap();
        assert_eq!(json["verdicts"]["RAM Usage"], "Alarm");
        assert_eq!(json["values"]["Internet"]["color"], "red");
        assert_eq!(json["status"]["text"], "Not monitoring");
        assert_eq!(json["last_sample_at"], "1970-01-01T00:00:00Z");
    }
}
