//! 外部转换器：调用编辑器把中间格式配色（.YAML-tmTheme）转换为 .tmTheme
//! - 先检查命令是否在 PATH 中（就绪检查），失败时给出修复提示
//! - 打开文件后发出转换命令，轮询输出文件；超过重试间隔仍未出现则重发命令，直到超时

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    thread,
    time::{Duration, Instant, SystemTime},
};

use crate::{config::ConverterSettings, error::ForgeError};

const REMEDIATION: &str = "修复方法：将 Sublime Text 的命令行工具加入 `PATH`，并通过 Package Control 安装 \"PackageDev\"；运行任务前先打开 Sublime Text。";

/// 配色转换器
pub(crate) trait SchemeConverter {
    /// 转换前的就绪检查
    fn ensure_ready(&self) -> Result<(), ForgeError>;
    /// 转换单个中间文件，返回生成的文件路径
    fn convert(&self, input: &Path) -> Result<PathBuf, ForgeError>;
}

/// 通过 `subl` 驱动 Sublime Text + PackageDev 的转换器
pub(crate) struct SublimeConverter {
    settings: ConverterSettings,
}

impl SublimeConverter {
    pub(crate) fn new(settings: ConverterSettings) -> Self {
        Self { settings }
    }

    fn tool_error(&self, reason: impl Into<String>) -> ForgeError {
        ForgeError::ExternalTool {
            tool: self.settings.command.clone(),
            reason: reason.into(),
            remediation: REMEDIATION.to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<(), ForgeError> {
        tracing::debug!(task = "convert:schemes", command = %self.settings.command, ?args, "调用编辑器");
        let output = Command::new(&self.settings.command)
            .args(args)
            .output()
            .map_err(|e| self.tool_error(format!("无法启动: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.tool_error(format!("退出状态 {}: {}", output.status, stderr.trim())));
        }
        Ok(())
    }

    fn timing(&self) -> Timing {
        Timing {
            timeout: Duration::from_secs(self.settings.timeout_secs),
            poll: Duration::from_millis(self.settings.poll_interval_ms.max(10)),
            retry: Duration::from_millis(self.settings.retry_interval_ms.max(10)),
        }
    }
}

impl SchemeConverter for SublimeConverter {
    fn ensure_ready(&self) -> Result<(), ForgeError> {
        which::which(&self.settings.command)
            .map(|p| tracing::debug!(task = "convert:schemes", path = %p.display(), "找到编辑器命令"))
            .map_err(|e| self.tool_error(format!("在 PATH 中找不到命令: {}", e)))
    }

    fn convert(&self, input: &Path) -> Result<PathBuf, ForgeError> {
        let output = converted_path(input, &self.settings.output_extension);
        let baseline = modified_time(&output);
        let input_str = input.to_string_lossy().to_string();
        self.run(&[input_str.as_str()])?;
        let produced = wait_for_output(&output, baseline, &self.timing(), || {
            self.run(&["--command", self.settings.convert_command.as_str()])
        })?;
        if produced {
            Ok(output)
        } else {
            Err(self.tool_error(format!(
                "等待转换结果超时（{} 秒）: {}",
                self.settings.timeout_secs,
                output.display()
            )))
        }
    }
}

/// `schemes/Boxy Dark.YAML-tmTheme` -> `schemes/Boxy Dark.tmTheme`
pub(crate) fn converted_path(input: &Path, output_extension: &str) -> PathBuf {
    input.with_extension(output_extension.trim_start_matches('.'))
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    timeout: Duration,
    poll: Duration,
    retry: Duration,
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

// 输出文件存在，且相对基线（转换前的修改时间）有更新
fn is_fresh(path: &Path, baseline: Option<SystemTime>) -> bool {
    match modified_time(path) {
        Some(t) => baseline.map_or(true, |b| t > b),
        None => false,
    }
}

// 发出命令后轮询输出；每个重试间隔重发一次，直到出现或超时
fn wait_for_output(
    output: &Path,
    baseline: Option<SystemTime>,
    timing: &Timing,
    mut issue: impl FnMut() -> Result<(), ForgeError>,
) -> Result<bool, ForgeError> {
    let deadline = Instant::now() + timing.timeout;
    loop {
        issue()?;
        let retry_at = Instant::now() + timing.retry;
        loop {
            if is_fresh(output, baseline) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            if now >= retry_at {
                break;
            }
            thread::sleep(timing.poll);
        }
    }
}
