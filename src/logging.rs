//! 日志初始化：tracing + EnvFilter，输出到 stderr
//! - `-v` 调试，`-vv` 追踪，`-q` 仅错误
//! - 设置 `RUST_LOG` 时以其为准

use std::io::{self, IsTerminal};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub(crate) fn init_logging(verbose: u8, quiet: bool) {
    let directive = if quiet {
        "stforge=error"
    } else {
        match verbose {
            0 => "stforge=info",
            1 => "stforge=debug",
            _ => "stforge=trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let layer = fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
