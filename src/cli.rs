//! CLI 定义模块：仅负责命令行参数结构体与解析
//! 将 clap 的声明与业务逻辑解耦，便于在其它模块中复用参数。

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::{build::Category, bump::Severity};

/// 顶层 CLI 入口
#[derive(Parser, Debug)]
#[command(name = "stforge", about = "Sublime Text 主题 / 配色 / 小部件构建工具", version)]
pub(crate) struct Cli {
    /// 清单文件路径，默认：stforge.yaml / stforge.yml，不存在时使用内置布局
    #[arg(short, long, global = true, value_name = "FILE")]
    pub(crate) manifest: Option<PathBuf>,
    /// 输出更详细的日志（可重复：-vv）
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub(crate) verbose: u8,
    /// 只输出错误
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub(crate) quiet: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// 子命令定义
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// 清理旧产物后重新生成
    Build {
        /// 要构建的分类
        #[arg(value_enum, default_value_t = Target::All)]
        target: Target,
        /// 跳过外部配色转换（只生成 .YAML-tmTheme）
        #[arg(long)]
        no_convert: bool,
    },
    /// 删除生成的产物
    Clean {
        #[arg(value_enum, default_value_t = Target::All)]
        target: Target,
    },
    /// 构建一次，然后监视源文件变更并重建受影响的分类
    Watch {
        /// 跳过外部配色转换
        #[arg(long)]
        no_convert: bool,
    },
    /// 升级版本号（默认 patch）
    Bump {
        #[arg(long, conflicts_with_all = ["minor", "major"])]
        patch: bool,
        #[arg(long, conflicts_with = "major")]
        minor: bool,
        #[arg(long)]
        major: bool,
    },
    /// 初始化示例清单与源文件
    Init {
        /// 强制覆盖已存在文件
        #[arg(long)]
        force: bool,
        /// 目标目录（默认当前目录）
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

/// 构建目标
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Themes,
    Schemes,
    Widgets,
    All,
}

impl Target {
    pub(crate) fn categories(self) -> Vec<Category> {
        match self {
            Target::Themes => vec![Category::Themes],
            Target::Schemes => vec![Category::Schemes],
            Target::Widgets => vec![Category::Widgets],
            Target::All => Category::ALL.to_vec(),
        }
    }
}

/// 由互斥的标志得到升级幅度；都未指定时为 patch
pub(crate) fn severity_from_flags(_patch: bool, minor: bool, major: bool) -> Severity {
    if major {
        Severity::Major
    } else if minor {
        Severity::Minor
    } else {
        Severity::Patch
    }
}
