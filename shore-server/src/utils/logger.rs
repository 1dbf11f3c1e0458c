//! 日志初始化
//!
//! 过滤规则来自 `RUST_LOG`（标准 env-filter 语法），未设置时退回给定
//! 的默认级别。传入日志目录时额外写按天滚动的文件。

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize logging with the default level and no file output.
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize logging, optionally mirroring to a daily-rolling file.
///
/// `RUST_LOG` always wins over `default_level`.
pub fn init_logger_with_file(default_level: Option<&str>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.unwrap_or("info")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_dir.map(Path::new) {
        Some(dir) if dir.exists() => {
            let file_appender = tracing_appender::rolling::daily(dir, "shore-server");
            subscriber.with_writer(file_appender).init();
        }
        _ => subscriber.init(),
    }
}
