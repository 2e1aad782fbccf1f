use crate::config::SirenConfig;
use crate::metrics::Metrics;
use crate::state::State;
use std::io::Write;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Звуковой сигнал тревоги.
pub trait Siren: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Проигрывает сигнал не более `loops` раз: внешней командой или звонком терминала.
pub struct LoopingSiren {
    cfg: SirenConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LoopingSiren {
    pub fn new(cfg: SirenConfig) -> Self {
        Self {
            cfg,
            task: Mutex::new(None),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.task
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|t| !t.is_finished()))
            .unwrap_or(false)
    }
}

impl Siren for LoopingSiren {
    fn start(&self) {
        if self.is_playing() {
            debug!("сигнал уже звучит, перезапуск");
        }
        let cfg = self.cfg.clone();
        let handle = tokio::spawn(async move {
            let pause = Duration::from_millis(cfg.interval_ms);
            for round in 0..cfg.loops {
                match &cfg.command {
                    Some(command) => play_command(command).await,
                    None => ring_bell(),
                }
                debug!(round, loops = cfg.loops, "сигнал тревоги");
                tokio::time::sleep(pause).await;
            }
        });

        match self.task.lock() {
            Ok(mut guard) => {
                if let Some(previous) = guard.replace(handle) {
                    previous.abort();
                }
            }
            Err(_) => handle.abort(),
        }
    }

    fn stop(&self) {
        if let Ok(mut guard) = self.task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}

async fn play_command(command: &[String]) {
    let Some((program, args)) = command.split_first() else {
        return;
    };
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;
    if let Err(err) = status {
        warn!(program = %program, error = %err, "не удалось воспроизвести сигнал");
    }
}

fn ring_bell() {
    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(b"\x07");
    let _ = stderr.flush();
}

/// Тревога с "залипанием": снимается только явной командой.
#[derive(Clone)]
pub struct AlarmController {
    state: Arc<RwLock<State>>,
    siren: Arc<dyn Siren>,
    metrics: Arc<Metrics>,
}

impl AlarmController {
    pub fn new(state: Arc<RwLock<State>>, siren: Arc<dyn Siren>, metrics: Arc<Metrics>) -> Self {
        Self {
            state,
            siren,
            metrics,
        }
    }

    /// Сирена и метрика меняются под той же блокировкой, что и `AlarmState`.
    pub async fn trigger(&self) -> bool {
        let mut guard = self.state.write().await;
        let entered = guard.trigger_alarm();
        if entered {
            self.siren.start();
            self.metrics.inc_alarm_triggered();
            self.metrics.set_alarm_active(true);
            warn!("тревога включена");
        }
        entered
    }

    pub async fn stop(&self) -> bool {
        let mut guard = self.state.write().await;
        let left = guard.stop_alarm();
        if left {
            self.siren.stop();
            self.metrics.set_alarm_active(false);
            info!("тревога остановлена пользователем");
        }
        left
    }

    pub async fn is_active(&self) -> bool {
        self.state.read().await.alarm_active()
    }
}
