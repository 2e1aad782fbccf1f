use crate::config::GpuQueryConfig;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time;

#[derive(Debug, Error)]
pub enum GpuQueryError {
    #[error("не удалось запустить {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} не ответил за {timeout_ms} мс")]
    Timeout { command: String, timeout_ms: u64 },
    #[error("{command} завершился с кодом {code:?}")]
    ExitStatus { command: String, code: Option<i32> },
    #[error("некорректный ответ утилиты GPU: {0:?}")]
    Parse(String),
}

/// Запускает утилиту опроса GPU и возвращает температуру в градусах.
pub async fn query_gpu_temperature(cfg: &GpuQueryConfig) -> Result<f64, GpuQueryError> {
    let child = Command::new(&cfg.command)
        .args(&cfg.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match time::timeout(Duration::from_millis(cfg.timeout_ms), child).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(GpuQueryError::Spawn {
                command: cfg.command.clone(),
                source,
            })
        }
        Err(_elapsed) => {
            return Err(GpuQueryError::Timeout {
                command: cfg.command.clone(),
                timeout_ms: cfg.timeout_ms,
            })
        }
    };

    if !output.status.success() {
        return Err(GpuQueryError::ExitStatus {
            command: cfg.command.clone(),
            code: output.status.code(),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_gpu_temperature(&text)
}

/// Ожидается ровно одно целое число, всё остальное считается ошибкой.
pub fn parse_gpu_temperature(stdout: &str) -> Result<f64, GpuQueryError> {
    let trimmed = stdout.trim();
    trimmed
        .parse::<i64>()
        .map(|v| v as f64)
        .map_err(|_| GpuQueryError::Parse(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_query(script: &str, timeout_ms: u64) -> GpuQueryConfig {
        GpuQueryConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_ms,
        }
    }

    #[test]
    fn parses_single_integer() {
        assert_eq!(parse_gpu_temperature("67\n").unwrap(), 67.0);
        assert_eq!(parse_gpu_temperature("  42  ").unwrap(), 42.0);
    }

    #[test]
    fn rejects_non_numeric_output() {
        assert!(matches!(
            parse_gpu_temperature("[N/A]"),
            Err(GpuQueryError::Parse(_))
        ));
        assert!(parse_gpu_temperature("").is_err());
        assert!(parse_gpu_temperature("67.5").is_err());
        assert!(parse_gpu_temperature("61\n63\n").is_err());
    }

    #[tokio::test]
    async fn missing_tool_is_spawn_error() {
        let cfg = GpuQueryConfig {
            command: "sysalarm-no-such-gpu-tool".to_string(),
            args: vec![],
            timeout_ms: 1000,
        };
        assert!(matches!(
            query_gpu_temperature(&cfg).await,
            Err(GpuQueryError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_temperature_from_tool_output() {
        let cfg = shell_query("echo 71", 2000);
        assert_eq!(query_gpu_temperature(&cfg).await.unwrap(), 71.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_is_unavailable() {
        let cfg = shell_query("echo 'NVIDIA-SMI has failed'; exit 9", 2000);
        assert!(matches!(
            query_gpu_temperature(&cfg).await,
            Err(GpuQueryError::ExitStatus { code: Some(9), .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_tool_times_out() {
        let cfg = shell_query("sleep 5", 100);
        assert!(matches!(
            query_gpu_temperature(&cfg).await,
            Err(GpuQueryError::Timeout { .. })
        ));
    }
}
