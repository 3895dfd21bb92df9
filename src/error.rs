//! 错误类型：
//! - 变体级错误（配置解析、未解析引用、模板错误）只中止当前变体
//! - 外部工具错误中止所在分类，并附带修复提示
//! - 命令层使用 anyhow 汇总上下文

use std::path::PathBuf;
use thiserror::Error;

/// 构建过程中的类型化错误
#[derive(Error, Debug)]
pub(crate) enum ForgeError {
    /// JSON 配置格式错误，或根节点不是映射
    #[error("解析配置失败: {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// 模板引用了合并配置中不存在的键
    #[error("变体 `{variant}` 的模板引用了不存在的键 `{key}`")]
    UnresolvedReference { variant: String, key: String },

    /// 模板语法错误、缺失的 partial 等
    #[error("变体 `{variant}` 渲染模板失败 {template}: {message}")]
    Template { variant: String, template: String, message: String },

    /// 外部转换器不可用或执行失败
    #[error("外部工具 `{tool}` 失败: {reason}\n{remediation}")]
    ExternalTool { tool: String, reason: String, remediation: String },

    /// 清理用的 glob 模式无效
    #[error("清理模式无效 `{pattern}`: {message}")]
    CleanPattern { pattern: String, message: String },

    /// 版本文件中找不到版本号
    #[error("未在 {path} 中找到版本号")]
    VersionNotFound { path: PathBuf },

    /// 版本号不是合法的 semver
    #[error("{path} 中的版本号无效: {version}")]
    InvalidVersion { path: PathBuf, version: String },

    #[error("读写文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ForgeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_reference_names_variant_and_key() {
        let err = ForgeError::UnresolvedReference {
            variant: "dark-blue".into(),
            key: "colors.accent".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("dark-blue"));
        assert!(msg.contains("colors.accent"));
    }

    #[test]
    fn external_tool_error_carries_remediation() {
        let err = ForgeError::ExternalTool {
            tool: "subl".into(),
            reason: "not found".into(),
            remediation: "install PackageDev".into(),
        };
        assert!(err.to_string().contains("install PackageDev"));
    }

    #[test]
    fn clean_pattern_error_names_the_pattern() {
        let err = ForgeError::CleanPattern {
            pattern: "/proj/schemes/*.tmTheme".into(),
            message: "invalid range pattern".into(),
        };
        assert!(err.to_string().contains("/proj/schemes/*.tmTheme"));
    }
}
