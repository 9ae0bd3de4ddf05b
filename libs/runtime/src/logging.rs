use crate::config::{LoggingConfig, Section};
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use parking_lot::Mutex;
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{
    filter::Targets,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

const DEFAULT_KEY: &str = "default";

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target == prefix
        || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

// -------- rotating file writers --------

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

/// A write handle that drops output when no file is routed for the target.
struct RoutedWriter(Option<SharedRotate>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(w) => w.lock().write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(w) => w.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-subsystem files by target prefix, falling back to
/// the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<SharedRotate>,
    by_prefix: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn resolve_for(&self, target: &str) -> Option<SharedRotate> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_prefix(target, prefix))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.resolve_for(meta.target()))
    }
}

/// Relative log paths live under `base_dir` (the resolved home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(section: &Section, base_dir: &Path) -> std::io::Result<Option<SharedRotate>> {
    if section.file.trim().is_empty() {
        return Ok(None);
    }
    let path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let limit = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(1)),
    };
    let rot = FileRotate::new(
        &path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Some(Arc::new(Mutex::new(rot))))
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter::default();
    for (name, section) in cfg {
        match open_rotating(section, base_dir) {
            Ok(Some(w)) if name == DEFAULT_KEY => router.default = Some(w),
            Ok(Some(w)) => router.by_prefix.push((name.clone(), w)),
            Ok(None) => {}
            Err(e) => eprintln!(
                "failed to open log file '{}' for '{}': {}",
                section.file, name, e
            ),
        }
    }
    router
}

/// Explicit subsystems get their own level; everything else falls through
/// to the "default" section.
fn build_targets(cfg: &LoggingConfig, level_of: impl Fn(&Section) -> &str) -> Targets {
    let default_level = cfg
        .get(DEFAULT_KEY)
        .and_then(|s| parse_tracing_level(level_of(s)))
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::OFF);

    cfg.iter()
        .filter(|(k, _)| k.as_str() != DEFAULT_KEY)
        .fold(Targets::new().with_default(default_level), |t, (name, s)| {
            let level = parse_tracing_level(level_of(s))
                .map(LevelFilter::from_level)
                .unwrap_or(LevelFilter::OFF);
            t.with_target(name.clone(), level)
        })
}

/// Initialize logging from a configuration.
/// Relative log files are resolved against `base_dir` (usually server.home_dir).
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before the subscriber is installed
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let console_layer = fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(build_targets(cfg, |s| s.console_level.as_str()));

    let router = build_file_router(cfg, base_dir);
    if router.is_empty() {
        let _ = Registry::default().with(console_layer).try_init();
        return;
    }

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_current_span(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(router)
        .with_filter(build_targets(cfg, |s| s.file_level.as_str()));

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Console-only logging honoring `RUST_LOG`, used when no sections are configured.
pub fn init_default_logging() {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(LevelFilter::INFO));
    let _ = Registry::default()
        .with(
            fmt::layer()
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(filter),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_logging_config, AppConfig};
    use std::fs;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("bogus"), Some(Level::INFO));
    }

    #[test]
    fn test_prefix_matching_respects_module_boundaries() {
        assert!(matches_prefix("users", "users"));
        assert!(matches_prefix("users::saga", "users"));
        assert!(!matches_prefix("users_extra::x", "users"));
        assert!(!matches_prefix("owncloud", "users"));
    }

    #[test]
    fn test_router_routes_by_prefix_with_default_fallback() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("owncloud".into(), section("info", "logs/owncloud.log", "debug"));

        let router = build_file_router(&cfg, tmp.path());
        assert!(router.default.is_some());
        assert_eq!(router.by_prefix.len(), 1);

        let oc = router.resolve_for("owncloud::infra").unwrap();
        let def = router.resolve_for("users::service").unwrap();
        assert!(!Arc::ptr_eq(&oc, &def));

        assert!(tmp.path().join("logs").exists());
    }

    #[test]
    fn test_empty_file_disables_file_output() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_KEY.into(), section("info", "", "debug"));

        let router = build_file_router(&cfg, tmp.path());
        assert!(router.is_empty());

        let mut w = RoutedWriter(router.resolve_for("anything"));
        assert_eq!(w.write(b"dropped").unwrap(), 7);
    }

    #[test]
    fn test_targets_fall_back_to_default_level() {
        let mut cfg = default_logging_config();
        cfg.insert("lapin".into(), section("off", "", "off"));

        let targets = build_targets(&cfg, |s| s.console_level.as_str());
        assert!(targets.would_enable("users::service", &Level::INFO));
        assert!(!targets.would_enable("users::service", &Level::DEBUG));
        assert!(!targets.would_enable("lapin::channel", &Level::ERROR));
    }

    #[test]
    fn test_file_paths_resolved_against_home_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("cfg.yaml");
        let home = temp_dir.path().join("home").to_string_lossy().replace('\\', "/");

        fs::write(
            &config_path,
            format!(
                "server:\n  home_dir: \"{home}\"\n  host: 127.0.0.1\n  port: 8088\nlogging:\n  users:\n    console_level: debug\n    file: logs/users.log\n    file_level: warn\n"
            ),
        )
        .unwrap();

        let config = AppConfig::load_layered(&config_path).unwrap();
        let abs = resolve_log_path("logs/users.log", Path::new(&config.server.home_dir));
        assert!(abs.starts_with(&config.server.home_dir));
        assert!(abs.ends_with("logs/users.log"));

        let absolute = temp_dir.path().join("x.log");
        assert_eq!(
            resolve_log_path(&absolute.to_string_lossy(), Path::new("/ignored")),
            absolute
        );
    }

    #[test]
    fn test_unused_sections_map_is_tolerated() {
        let cfg = LoggingConfig::new();
        assert!(build_file_router(&cfg, Path::new(".")).is_empty());
    }
}
