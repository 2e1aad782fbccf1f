use crate::alarm::AlarmController;
use crate::collectors::{Sample, Sampler};
use crate::evaluate::{breached, evaluate_all, Metric};
use crate::metrics::Metrics;
use crate::state::State;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Цикл опроса: раз в `interval` снимает срез, обновляет метрики
/// и публикует срез всем потребителям.
pub async fn run_sampler(
    mut sampler: Sampler,
    state: Arc<RwLock<State>>,
    metrics: Arc<Metrics>,
    samples: watch::Sender<Option<Sample>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("получен сигнал остановки цикла опроса");
                break;
            }
            _ = ticker.tick() => {
                let sample = sampler.sample().await;
                let settings = state.read().await.settings.clone();
                let verdicts = evaluate_all(&sample, &settings);
                metrics.update_from_sample(&sample, &verdicts);
                samples.send_replace(Some(sample));
            }
        }
    }
}

/// Фоновый цикл: раз в `interval` сверяет последний срез с порогами.
pub async fn run_monitor(
    state: Arc<RwLock<State>>,
    alarm: AlarmController,
    samples: watch::Receiver<Option<Sample>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("получен сигнал остановки фонового цикла");
                break;
            }
            _ = ticker.tick() => {
                let sample = samples.borrow().clone();
                run_cycle(&state, &alarm, sample.as_ref()).await;
            }
        }
    }
}

/// Один цикл проверки. Возвращает метрики, вышедшие за порог.
pub async fn run_cycle(
    state: &RwLock<State>,
    alarm: &AlarmController,
    sample: Option<&Sample>,
) -> Vec<Metric> {
    let (monitoring, settings) = {
        let guard = state.read().await;
        (guard.monitoring, guard.settings.clone())
    };
    if !monitoring {
        return Vec::new();
    }
    let Some(sample) = sample else {
        debug!("срез ещё не получен, цикл пропущен");
        return Vec::new();
    };

    let verdicts = evaluate_all(sample, &settings);
    let hits = breached(&verdicts, &settings);
    if !hits.is_empty() {
        let names: Vec<&str> = hits.iter().map(|m| m.as_str()).collect();
        if alarm.trigger().await {
            warn!(metrics = ?names, "превышен порог");
        } else {
            debug!(metrics = ?names, "порог превышен, тревога уже активна");
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::tests::RecordingSiren;
    use crate::config::Config;
    use crate::settings::AlarmSettings;

    fn setup(settings: AlarmSettings) -> (Arc<RwLock<State>>, AlarmController) {
        let state = Arc::new(RwLock::new(State::new(0, settings)));
        let siren = Arc::new(RecordingSiren::default());
        let metrics = Metrics::new().expect("инициализация метрик");
        let alarm = AlarmController::new(state.clone(), siren, metrics);
        (state, alarm)
    }

    fn calm_sample() -> Sample {
        Sample {
            taken_at_unix: 1,
            ram_usage_percent: 30.0,
            cpu_temperature_celsius: Some(40.0),
            gpu_temperature_celsius: Some(40.0),
            internet_reachable: true,
            processes: vec!["sshd".to_string()],
        }
    }

    fn ram_settings() -> AlarmSettings {
        let mut settings = AlarmSettings::default();
        settings.ram.enabled = true;
        settings.ram.threshold = 85.0;
        settings
    }

    #[tokio::test]
    async fn nothing_happens_before_start() {
        let (state, alarm) = setup(ram_settings());
        let mut hot = calm_sample();
        hot.ram_usage_percent = 90.0;

        assert!(run_cycle(&state, &alarm, Some(&hot)).await.is_empty());
        assert!(!alarm.is_active().await);
    }

    #[tokio::test]
    async fn breach_triggers_and_alarm_stays_after_recovery() {
        let (state, alarm) = setup(ram_settings());
        state.write().await.start_monitoring().unwrap();

        let mut hot = calm_sample();
        hot.ram_usage_percent = 90.0;
        assert_eq!(
            run_cycle(&state, &alarm, Some(&hot)).await,
            vec![Metric::RamUsage]
        );
        assert!(alarm.is_active().await);

        for _ in 0..10 {
            assert!(run_cycle(&state, &alarm, Some(&calm_sample())).await.is_empty());
        }
        assert!(alarm.is_active().await);

        assert!(alarm.stop().await);
        assert!(!alarm.is_active().await);
    }

    #[tokio::test]
    async fn unknown_gpu_reading_never_triggers() {
        let mut settings = AlarmSettings::default();
        settings.gpu_temperature.enabled = true;
        settings.gpu_temperature.threshold = 0.0;
        let (state, alarm) = setup(settings);
        state.write().await.start_monitoring().unwrap();

        let mut sample = calm_sample();
        sample.gpu_temperature_celsius = None;
        assert!(run_cycle(&state, &alarm, Some(&sample)).await.is_empty());
        assert!(!alarm.is_active().await);
    }

    #[tokio::test]
    async fn settings_change_applies_next_cycle() {
        let (state, alarm) = setup(AlarmSettings::default());
        state.write().await.start_monitoring().unwrap();

        let mut hot = calm_sample();
        hot.ram_usage_percent = 90.0;
        assert!(run_cycle(&state, &alarm, Some(&hot)).await.is_empty());

        state.write().await.update_settings(ram_settings()).unwrap();
        assert_eq!(
            run_cycle(&state, &alarm, Some(&hot)).await,
            vec![Metric::RamUsage]
        );
    }

    #[tokio::test]
    async fn loop_uses_latest_sample_and_stops_on_shutdown() {
        let (state, alarm) = setup(ram_settings());
        state.write().await.start_monitoring().unwrap();

        let mut hot = calm_sample();
        hot.ram_usage_percent = 95.0;
        let (_sample_tx, sample_rx) = watch::channel(Some(hot));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_monitor(
            state.clone(),
            alarm.clone(),
            sample_rx,
            Duration::from_millis(20),
            shutdown_rx,
        ));

        tokio::time::timeout(Duration::from_secs(2), async {
            while !alarm.is_active().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("тревога должна сработать");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("цикл должен завершиться")
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sampler_loop_publishes_and_exports() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut cfg = Config::default();
        cfg.reachability.host = "127.0.0.1".to_string();
        cfg.reachability.port = listener.local_addr().unwrap().port();
        cfg.gpu.command = "sh".to_string();
        cfg.gpu.args = vec!["-c".to_string(), "echo 91".to_string()];
        let cfg = Arc::new(cfg);

        let mut settings = AlarmSettings::default();
        settings.gpu_temperature.enabled = true;
        settings.gpu_temperature.threshold = 80.0;
        let state = Arc::new(RwLock::new(State::new(0, settings)));
        let metrics = Metrics::new().expect("инициализация метрик");
        let (sample_tx, mut sample_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_sampler(
            Sampler::new(cfg, metrics.clone()),
            state,
            metrics.clone(),
            sample_tx,
            Duration::from_millis(50),
            shutdown_rx,
        ));

        tokio::time::timeout(Duration::from_secs(5), sample_rx.changed())
            .await
            .expect("срез должен появиться")
            .unwrap();
        let sample = sample_rx.borrow().clone().expect("срез опубликован");
        assert_eq!(sample.gpu_temperature_celsius, Some(91.0));
        assert!(sample.internet_reachable);

        let text = String::from_utf8(metrics.encode_metrics().unwrap()).unwrap();
        assert!(text.contains("sysalarm_gpu_temperature_celsius 91"));
        assert!(text.contains("sysalarm_verdict{metric=\"GPU Temperature\"} 1"));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("цикл должен завершиться")
            .unwrap();
    }
}
