use super::{LoggingConfig, build_current_log_path};
use anyhow::{Context, Result};
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// 一次清理的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// 超过保留期被删除的文件数
    pub removed: usize,
    /// 被压缩为 .gz 的历史文件数
    pub compressed: usize,
}

/// 定时清理; 每天午夜后预先创建当天文件并立即压缩前一天的日志
pub(super) fn spawn_log_maintenance_task(config: LoggingConfig) {
    tokio::spawn(async move {
        let mut cleanup_interval =
            tokio::time::interval(Duration::from_secs(config.cleanup_interval_seconds));
        let mut next_rollover_at = next_rollover_or_retry(Local::now());

        loop {
            tokio::select! {
                _ = cleanup_interval.tick() => {
                    run_cleanup(&config, "定时清理");
                }
                _ = tokio::time::sleep_until(next_rollover_at) => {
                    match ensure_current_log_file(&config) {
                        Ok(path) => debug!("日志已翻滚到 {}", path.display()),
                        Err(err) => error!("日志翻滚失败: {:#}", err),
                    }
                    run_cleanup(&config, "翻滚后清理");
                    next_rollover_at = next_rollover_or_retry(Local::now());
                }
            }
        }
    });
}

fn run_cleanup(config: &LoggingConfig, stage: &str) {
    match cleanup_logs(config) {
        Ok(report) => debug!(
            "{}: 删除 {} 个, 压缩 {} 个",
            stage, report.removed, report.compressed
        ),
        Err(err) => error!("{}失败: {:#}", stage, err),
    }
}

fn next_rollover_or_retry(now: DateTime<Local>) -> tokio::time::Instant {
    let wait = until_next_midnight(now).unwrap_or_else(|err| {
        error!("计算下一次翻滚时间失败: {:#}", err);
        Duration::from_secs(1)
    });
    tokio::time::Instant::now() + wait
}

/// 确保当天的日志文件存在, 返回其路径
fn ensure_current_log_file(config: &LoggingConfig) -> Result<PathBuf> {
    let directory = Path::new(&config.directory);
    fs::create_dir_all(directory)?;
    let current_path =
        build_current_log_path(directory, &config.file_prefix, Local::now().date_naive());
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&current_path)
        .with_context(|| format!("创建当前日志文件失败, path={}", current_path.display()))?;
    Ok(current_path)
}

/// 删除超过保留期的日志, 压缩今天之前的未压缩日志
pub fn cleanup_logs(config: &LoggingConfig) -> Result<CleanupReport> {
    cleanup_logs_at(config, Local::now().date_naive())
}

fn cleanup_logs_at(config: &LoggingConfig, today: NaiveDate) -> Result<CleanupReport> {
    let directory = Path::new(&config.directory);
    let mut report = CleanupReport::default();
    if !directory.exists() {
        return Ok(report);
    }

    let cutoff = today - Days::new(config.retention_days as u64);
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some((date, compressed)) = parse_dated_log_name(&file_name, &config.file_prefix)
        else {
            continue;
        };

        let file_path = entry.path();
        if date < cutoff {
            if fs::remove_file(&file_path).is_ok() {
                report.removed += 1;
            }
            continue;
        }
        if config.compress_history && !compressed && date < today {
            match compress_to_gz(&file_path) {
                Ok(true) => report.compressed += 1,
                Ok(false) => {}
                Err(err) => error!("压缩历史日志失败: {:#}", err),
            }
        }
    }
    Ok(report)
}

/// 压缩为同名 .gz 并删除原文件; 目标已存在时跳过并返回 false
fn compress_to_gz(path: &Path) -> Result<bool> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    if gz_path.exists() {
        return Ok(false);
    }

    let mut input =
        File::open(path).with_context(|| format!("打开待压缩日志失败, path={}", path.display()))?;
    let output = File::create(&gz_path)
        .with_context(|| format!("创建压缩日志失败, path={}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
        .with_context(|| format!("删除已压缩日志失败, path={}", path.display()))?;
    Ok(true)
}

fn parse_dated_log_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('.')?;
    let (date_part, compressed) = match rest.strip_suffix(".log.gz") {
        Some(date_part) => (date_part, true),
        None => (rest.strip_suffix(".log")?, false),
    };
    if date_part.len() != 10 {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((date, compressed))
}

/// 距离下一个本地午夜的时长
fn until_next_midnight(now: DateTime<Local>) -> Result<Duration> {
    let midnight = (now.date_naive() + Days::new(1))
        .and_hms_opt(0, 0, 0)
        .context("构造午夜时间失败")?;
    let next = Local
        .from_local_datetime(&midnight)
        .earliest()
        .context("本地时区中不存在该午夜时间")?;
    Ok((next - now).to_std().unwrap_or(Duration::ZERO))
}
