//! 命令调度模块：
//! - 接收解析好的 CLI 参数，叠加环境变量得到“有效参数”
//! - 调用清单加载、构建、清理、监视、版本升级、初始化等模块

use anyhow::{bail, Context, Result};
use std::{env, path::PathBuf};
use tracing::info;

use crate::{
    build::{clean, BuildOptions, CategoryReport, Pipeline, PipelineOutcome},
    bump::bump_project,
    cli::{severity_from_flags, Cli, Command},
    config::{self, Project},
    convert::SublimeConverter,
    init::init_scaffold,
    utils::{env_bool_truthy, env_opt_path, env_opt_string},
    watch::watch_and_rebuild,
};

/// 运行指定的子命令
pub(crate) fn run(cli: Cli) -> Result<()> {
    let manifest = cli.manifest;
    match cli.command {
        Command::Build { target, no_convert } => {
            let project = load_project(manifest)?;
            let opts = build_options(no_convert);
            let converter = SublimeConverter::new(project.manifest.converter.clone());
            let outcome = Pipeline::new(target.categories()).run(&project, opts, &converter);
            print_outcome(&outcome);
            if !outcome.succeeded() {
                bail!("构建失败");
            }
            println!("✅ 构建完成");
            Ok(())
        }
        Command::Clean { target } => {
            let project = load_project(manifest)?;
            for category in target.categories() {
                let removed = clean(&project, category)?;
                println!("🧹 {}: 删除 {} 个文件", category, removed.len());
            }
            Ok(())
        }
        Command::Watch { no_convert } => {
            let project = load_project(manifest)?;
            let opts = build_options(no_convert);
            let converter = SublimeConverter::new(project.manifest.converter.clone());
            // 首次构建失败不影响进入监视
            let outcome = Pipeline::all().run(&project, opts, &converter);
            print_outcome(&outcome);
            watch_and_rebuild(&project, opts, &converter)
        }
        Command::Bump { patch, minor, major } => {
            let project = load_project(manifest)?;
            let severity = severity_from_flags(patch, minor, major);
            let results = bump_project(&project, severity).context("升级版本号失败")?;
            for r in &results {
                println!("⬆️ {}: {} -> {}", r.path.display(), r.from, r.to);
            }
            println!("✅ 版本升级完成");
            Ok(())
        }
        Command::Init { force, dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            init_scaffold(&dir, force)
        }
    }
}

/// 加载清单并叠加环境变量（CLI 优先于环境变量）
fn load_project(cli_manifest: Option<PathBuf>) -> Result<Project> {
    let cwd = env::current_dir().context("获取当前目录失败")?;
    let explicit = cli_manifest.or_else(|| env_opt_path("STFORGE_MANIFEST"));
    let mut project = config::load_project(explicit.as_deref(), &cwd)?;
    if let Some(src) = env_opt_path("STFORGE_SOURCE_DIR") {
        project.manifest.source_dir = src;
    }
    if let Some(cmd) = env_opt_string("STFORGE_CONVERTER") {
        project.manifest.converter.command = cmd;
    }
    info!("本次使用的配置来源: {}", config::describe_source(&project.source));
    Ok(project)
}

fn build_options(no_convert_cli: bool) -> BuildOptions {
    let no_convert = no_convert_cli || env_bool_truthy("STFORGE_NO_CONVERT").unwrap_or(false);
    BuildOptions { convert: !no_convert }
}

fn print_outcome(outcome: &PipelineOutcome) {
    for report in &outcome.reports {
        print_report(report);
    }
    for category in &outcome.skipped {
        println!("⏭ {}: 未执行（前序分类失败）", category);
    }
}

fn print_report(report: &CategoryReport) {
    if report.succeeded() {
        let converted = if report.converted.is_empty() {
            String::new()
        } else {
            format!("，转换 {} 个配色", report.converted.len())
        };
        println!(
            "✅ {}: 清理 {} 个，写入 {} 个文件{}",
            report.category,
            report.removed.len(),
            report.written.len(),
            converted
        );
        return;
    }
    println!("❌ {}: 在 {:?} 阶段失败", report.category, report.stage);
    for failure in &report.failures {
        println!("   - {}: {}", failure.variant, failure.error);
    }
    if report.convert_skipped > 0 {
        println!("   ⏭ {} 个配色未转换（存在失败的变体）", report.convert_skipped);
    }
    if let Some(err) = &report.fatal {
        println!("   {}", err);
    }
}
