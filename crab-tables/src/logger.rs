//! Logging Infrastructure
//!
//! Console output (pretty or JSON) plus, when a log directory is given:
//! - Daily rotating application logs (deleted after 14 days)
//! - Daily rotating audit logs for session stops and force-frees (never deleted)

use std::fs;
use std::path::{Path, PathBuf};
use tracing::Metadata;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::filter_fn, fmt, prelude::*};

/// Target that routes events to the audit file
pub const AUDIT_TARGET: &str = "audit";

const APP_LOG_RETENTION_DAYS: i64 = 14;

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Remove `app-YYYY-MM-DD*` files older than the retention window
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(());
    }

    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date_part) = name.strip_prefix("app.").or_else(|| name.strip_prefix("app-"))
        else {
            continue;
        };
        if let Some(date) = date_part
            .get(..10)
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }
    Ok(())
}

/// Initialize the global subscriber
///
/// `RUST_LOG` overrides `level` when set. Fails if a subscriber is already
/// installed.
///
/// ```no_run
/// // Development: pretty console only
/// crab_tables::logger::init_logger("debug", false, None)?;
///
/// // Production: JSON console plus rolling files
/// crab_tables::logger::init_logger("info", true, Some("./logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    });

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let app_log_dir = log_dir.join("app");
        let audit_log_dir = log_dir.join("audit");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&audit_log_dir)?;

        let app_log = RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app");
        layers.push(file_layer(app_log, json_format, |meta| {
            meta.target() != AUDIT_TARGET
        }));

        let audit_log = RollingFileAppender::new(Rotation::DAILY, audit_log_dir, "audit");
        layers.push(file_layer(audit_log, json_format, |meta| {
            meta.target() == AUDIT_TARGET
        }));

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(periodic_cleanup(log_dir.to_path_buf()));
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;
    Ok(())
}

fn file_layer<W>(writer: W, json_format: bool, keep: fn(&Metadata<'_>) -> bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .with_filter(filter_fn(keep))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter_fn(keep))
            .boxed()
    }
}

async fn periodic_cleanup(log_dir: PathBuf) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(3600));
    loop {
        ticker.tick().await;
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Audit log helper - records operations that close or discard a session
///
/// ```no_run
/// crab_tables::audit_log!("Alice", "stop_session", "table:Billiard 3");
/// crab_tables::audit_log!("local", "force_free", "table:Bar 5", "orphaned occupancy cleared");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($actor:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            actor = $actor,
            action = $action,
            resource = $resource,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
    ($actor:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            actor = $actor,
            action = $action,
            resource = $resource,
            details = $details,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_only_expired_app_logs() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("app");
        fs::create_dir_all(&app_dir).unwrap();

        let today = chrono::Local::now().date_naive();
        let old = today - chrono::Duration::days(APP_LOG_RETENTION_DAYS + 1);
        let old_file = app_dir.join(format!("app.{}", old.format("%Y-%m-%d")));
        let fresh_file = app_dir.join(format!("app.{}", today.format("%Y-%m-%d")));
        let other_file = app_dir.join("notes.txt");
        for file in [&old_file, &fresh_file, &other_file] {
            fs::write(file, b"x").unwrap();
        }

        cleanup_old_logs(dir.path()).unwrap();
        assert!(!old_file.exists());
        assert!(fresh_file.exists());
        assert!(other_file.exists());
    }

    #[test]
    fn test_cleanup_without_app_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        cleanup_old_logs(dir.path()).unwrap();
    }
}
