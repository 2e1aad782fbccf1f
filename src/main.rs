mod alarm;
mod collectors;
mod config;
mod dashboard;
mod evaluate;
mod http;
mod metrics;
mod monitor;
mod settings;
mod state;

use alarm::{AlarmController, LoopingSiren};
use axum::serve;
use clap::Parser;
use collectors::{now_unix, Sample, Sampler};
use config::{Config, ConfigError};
use metrics::Metrics;
use state::State;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sysalarm")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    /// Включить мониторинг процесса с этим именем
    #[arg(long)]
    process: Option<String>,
    /// Сразу запустить мониторинг
    #[arg(long)]
    start: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli.config) {
        Ok(cfg) => Arc::new(cfg),
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };

    info!(
        listen = %cfg.listen,
        refresh_interval = %humantime::format_duration(Duration::from_secs(cfg.refresh_interval_secs)),
        monitor_interval = %humantime::format_duration(Duration::from_secs(cfg.monitor_interval_secs)),
        "запуск sysalarm"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "не удалось инициализировать метрики");
            std::process::exit(1);
        }
    };

    let shared_state = Arc::new(RwLock::new(State::new(now_unix(), cfg.alarms.clone())));
    apply_launch_options(
        &mut *shared_state.write().await,
        cli.process.clone(),
        cli.start,
    );

    let siren = Arc::new(LoopingSiren::new(cfg.siren.clone()));
    let alarm = AlarmController::new(shared_state.clone(), siren, metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (sample_tx, sample_rx) = watch::channel::<Option<Sample>>(None);

    let http_task = {
        let cfg = cfg.clone();
        let app = http::build_router(
            metrics.clone(),
            shared_state.clone(),
            alarm.clone(),
            sample_rx.clone(),
        );
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let addr: SocketAddr = match cfg.listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %cfg.listen, "некорректный адрес listen");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "не удалось запустить HTTP-сервер");
                    return;
                }
            };
            info!(%addr, "HTTP-интерфейс запущен");

            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "ошибка HTTP-сервера");
            }
        })
    };

    let sampler_task = tokio::spawn(monitor::run_sampler(
        Sampler::new(cfg.clone(), metrics.clone()),
        shared_state.clone(),
        metrics.clone(),
        sample_tx,
        Duration::from_secs(cfg.refresh_interval_secs),
        shutdown_rx.clone(),
    ));

    let monitor_task = tokio::spawn(monitor::run_monitor(
        shared_state.clone(),
        alarm.clone(),
        sample_rx,
        Duration::from_secs(cfg.monitor_interval_secs),
        shutdown_rx.clone(),
    ));

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "не удалось дождаться Ctrl+C");
    }
    info!("получен Ctrl+C, выполняется остановка");

    if alarm.is_active().await {
        info!("тревога активна при остановке, сигнал выключается");
        alarm.stop().await;
    }
    let _ = shutdown_tx.send(true);

    let _ = sampler_task.await;
    let _ = monitor_task.await;
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Отсутствующий файл не ошибка: работаем с настройками по умолчанию.
fn load_config(path: &str) -> Result<Config, ConfigError> {
    match Config::load_from_file(path) {
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!(path, "файл конфигурации не найден, используются значения по умолчанию");
            Ok(Config::default())
        }
        other => other,
    }
}

/// Флаги `--process` и `--start`: выбор процесса до запуска мониторинга.
fn apply_launch_options(state: &mut State, process: Option<String>, start: bool) {
    if let Some(name) = process {
        state.set_process(true, Some(name));
    }
    if start {
        if let Err(err) = state.start_monitoring() {
            warn!(error = %err, status = %state.status.text, "мониторинг не запущен");
        }
    }
}
