//! 日志子系统.
//!
//! 控制台与文件两路输出, 文件按日期命名 `<prefix>.<YYYY-MM-DD>.log`.
//! 库 crate 通过 `log` 门面输出, 由订阅器初始化时安装的 `LogTracer` 转入 tracing.
//! 在 tokio 运行时内初始化时, 后台任务定时压缩历史日志并清理过期文件.

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

mod task;

pub use task::{CleanupReport, cleanup_logs};

/// 日志配置, 缺省字段取 [`Default`] 中的值
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 文件输出级别, EnvFilter 语法
    pub level: String,
    /// 控制台输出级别
    pub console_level: String,
    pub directory: String,
    /// 文件名前缀: `<prefix>.<YYYY-MM-DD>.log`
    pub file_prefix: String,
    pub retention_days: i64,
    /// 是否把今天之前的日志压缩为 .gz
    pub compress_history: bool,
    pub cleanup_interval_seconds: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            console_level: "warn".into(),
            directory: "logs".into(),
            file_prefix: "avcref".into(),
            retention_days: 30,
            compress_history: true,
            cleanup_interval_seconds: 3600,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            bail!("日志文件前缀无效: {:?}", self.file_prefix);
        }
        if self.retention_days < 1 {
            bail!("日志保留天数必须大于 0, 当前为 {}", self.retention_days);
        }
        if self.cleanup_interval_seconds == 0 {
            bail!("日志清理间隔不能为 0");
        }
        EnvFilter::try_new(&self.level)
            .with_context(|| format!("文件日志级别无效: {}", self.level))?;
        EnvFilter::try_new(&self.console_level)
            .with_context(|| format!("控制台日志级别无效: {}", self.console_level))?;
        Ok(())
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 安装全局订阅器. 进程内只能成功调用一次.
pub fn init(config: LoggingConfig) -> Result<()> {
    config.validate()?;
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("创建日志目录失败, path={}", config.directory))?;

    let file_writer = DailyFileWriter::open(Path::new(&config.directory), &config.file_prefix)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_writer);
    LOG_GUARD.set(guard).ok();

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(LineFormatter { console: true })
        .with_filter(EnvFilter::new(&config.console_level));

    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(LineFormatter { console: false })
        .with_filter(EnvFilter::new(&config.level));

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("全局日志订阅器已安装")?;

    if tokio::runtime::Handle::try_current().is_ok() {
        task::spawn_log_maintenance_task(config);
    } else {
        // 无运行时: 只在启动时清理一次
        let report = cleanup_logs(&config)?;
        tracing::debug!(
            "日志清理完成: 删除 {} 个, 压缩 {} 个",
            report.removed,
            report.compressed
        );
    }

    Ok(())
}

/// 按本地日期写入 `<prefix>.<YYYY-MM-DD>.log`, 跨过午夜后的首次写入切换到新文件
struct DailyFileWriter {
    directory: PathBuf,
    prefix: String,
    date: NaiveDate,
    file: File,
}

impl DailyFileWriter {
    fn open(directory: &Path, prefix: &str) -> Result<Self> {
        let date = Local::now().date_naive();
        let file = open_append_file(&build_current_log_path(directory, prefix, date))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            date,
            file,
        })
    }
}

impl Write for DailyFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let today = Local::now().date_naive();
        if today != self.date {
            let path = build_current_log_path(&self.directory, &self.prefix, today);
            self.file = open_append_file(&path).map_err(std::io::Error::other)?;
            self.date = today;
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn open_append_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志文件失败, path={}", path.display()))
}

pub(crate) fn build_current_log_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

/// 单行事件格式: `[MM-DD hh:mm:ss.mmm] LEVEL 位置 > 消息`.
///
/// 控制台带颜色、位置取 target; 文件不带颜色、位置取源文件与行号.
struct LineFormatter {
    console: bool,
}

impl LineFormatter {
    fn level_color(level: tracing::Level) -> &'static str {
        match level {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let now = Local::now();
        write!(
            writer,
            "[{}.{:03}] ",
            now.format("%m-%d %H:%M:%S"),
            now.timestamp_subsec_millis()
        )?;
        let level = meta.level().to_string();
        if self.console {
            let color = Self::level_color(*meta.level());
            write!(writer, "{}{:5}\x1b[0m {} > ", color, level, meta.target())?;
        } else {
            let file = meta.file().unwrap_or(meta.target());
            write!(writer, "{:5} {}:{} > ", level, file, meta.line().unwrap_or(0))?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
