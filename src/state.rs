use crate::dashboard::Color;
use crate::settings::{AlarmSettings, ProcessSetting, SettingsError};
use serde::Serialize;
use thiserror::Error;

pub const STATUS_NOT_MONITORING: &str = "Not monitoring";
pub const STATUS_MONITORING: &str = "Monitoring...";
pub const STATUS_SELECT_PROCESS: &str = "Please select a process";
pub const STATUS_ALARM_TRIGGERED: &str = "Alarm triggered!";
pub const STATUS_ALARM_STOPPED: &str = "Alarm stopped";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub text: String,
    pub color: Color,
}

impl Status {
    fn new(text: &str, color: Color) -> Self {
        Self {
            text: text.to_string(),
            color,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("мониторинг процесса включён, но процесс не выбран")]
    NoProcessSelected,
}

#[derive(Debug, Clone)]
pub struct State {
    pub started_at_unix: i64,
    pub settings: AlarmSettings,
    pub monitoring: bool,
    pub alarm: AlarmState,
    pub status: Status,
}

impl State {
    pub fn new(now_unix: i64, settings: AlarmSettings) -> Self {
        Self {
            started_at_unix: now_unix,
            settings,
            monitoring: false,
            alarm: AlarmState::Inactive,
            status: Status::new(STATUS_NOT_MONITORING, Color::Gray),
        }
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm == AlarmState::Active
    }

    pub fn start_monitoring(&mut self) -> Result<(), StartError> {
        if self.settings.process.enabled && self.settings.selected_process().is_none() {
            self.status = Status::new(STATUS_SELECT_PROCESS, Color::Red);
            return Err(StartError::NoProcessSelected);
        }
        self.monitoring = true;
        self.status = Status::new(STATUS_MONITORING, Color::Green);
        Ok(())
    }

    pub fn set_process(&mut self, enabled: bool, name: Option<String>) {
        self.settings.process = ProcessSetting::new(enabled, name);
    }

    /// Заменяет настройки целиком. При ошибке остаются прежние.
    pub fn update_settings(&mut self, mut settings: AlarmSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        settings.process = ProcessSetting::new(settings.process.enabled, settings.process.name);
        self.settings = settings;
        Ok(())
    }

    /// Переход Inactive -> Active. Возвращает `true`, только если тревога была неактивна.
    pub fn trigger_alarm(&mut self) -> bool {
        if self.alarm_active() {
            return false;
        }
        self.alarm = AlarmState::Active;
        self.status = Status::new(STATUS_ALARM_TRIGGERED, Color::Red);
        true
    }

    /// Единственный путь Active -> Inactive. Повторный вызов ничего не меняет.
    pub fn stop_alarm(&mut self) -> bool {
        if !self.alarm_active() {
            return false;
        }
        self.alarm = AlarmState::Inactive;
        self.status = Status::new(STATUS_ALARM_STOPPED, Color::Orange);
        true
    }
}
