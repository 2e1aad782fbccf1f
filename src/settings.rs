use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RAM_THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;
pub const TEMPERATURE_THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 0.0..=150.0;

/// Пользовательские настройки тревог. Каждый цикл работает со своей копией,
/// поэтому изменения применяются целиком, начиная со следующего цикла.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AlarmSettings {
    #[serde(default = "default_ram")]
    pub ram: ThresholdSetting,
    #[serde(default = "default_cpu_temperature")]
    pub cpu_temperature: ThresholdSetting,
    #[serde(default = "default_gpu_temperature")]
    pub gpu_temperature: ThresholdSetting,
    #[serde(default)]
    pub internet: ToggleSetting,
    #[serde(default)]
    pub process: ProcessSetting,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThresholdSetting {
    #[serde(default)]
    pub enabled: bool,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct ToggleSetting {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProcessSetting {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("порог {field} должен быть числом, получено {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("порог {field} должен быть в диапазоне {min}..{max}, получено {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            ram: default_ram(),
            cpu_temperature: default_cpu_temperature(),
            gpu_temperature: default_gpu_temperature(),
            internet: ToggleSetting::default(),
            process: ProcessSetting::default(),
        }
    }
}

impl AlarmSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_threshold("ram", self.ram.threshold, RAM_THRESHOLD_RANGE)?;
        check_threshold(
            "cpu_temperature",
            self.cpu_temperature.threshold,
            TEMPERATURE_THRESHOLD_RANGE,
        )?;
        check_threshold(
            "gpu_temperature",
            self.gpu_temperature.threshold,
            TEMPERATURE_THRESHOLD_RANGE,
        )?;
        Ok(())
    }

    /// Имя выбранного процесса, если мониторинг процесса включён и имя не пустое.
    pub fn selected_process(&self) -> Option<&str> {
        if !self.process.enabled {
            return None;
        }
        self.process
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl ProcessSetting {
    pub fn new(enabled: bool, name: Option<String>) -> Self {
        if enabled {
            Self { enabled, name }
        } else {
            Self::default()
        }
    }
}

fn check_threshold(
    field: &'static str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), SettingsError> {
    if !value.is_finite() {
        return Err(SettingsError::NotFinite { field, value });
    }
    if !range.contains(&value) {
        return Err(SettingsError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

const fn default_ram() -> ThresholdSetting {
    ThresholdSetting {
        enabled: false,
        threshold: 85.0,
    }
}

const fn default_cpu_temperature() -> ThresholdSetting {
    ThresholdSetting {
        enabled: false,
        threshold: 105.0,
    }
}

const fn default_gpu_temperature() -> ThresholdSetting {
    ThresholdSetting {
        enabled: false,
        threshold: 80.0,
    }
}
