//! 初始化脚手架模块
//! - `stforge init` 写出示例清单与内置的最小源文件树（.src）

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::{fs, path::Path};

// 内置示例（用于 init）
const SAMPLE_MANIFEST: &str = include_str!("assets/sample.stforge.yaml");
static SCAFFOLD_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/scaffold");

/// 初始化示例清单与源文件树
pub(crate) fn init_scaffold(dir: &Path, force: bool) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("创建目录失败: {}", dir.display()))?;
    }

    // 写入示例清单
    let manifest_path = dir.join("stforge.yaml");
    if manifest_path.exists() && !force {
        eprintln!("跳过: {} 已存在，使用 --force 可覆盖", manifest_path.display());
    } else {
        fs::write(&manifest_path, SAMPLE_MANIFEST.as_bytes())
            .with_context(|| format!("写入示例清单失败: {}", manifest_path.display()))?;
        println!("写入: {}", manifest_path.display());
    }

    // 写入源文件树
    let source_root = dir.join(".src");
    if source_root.exists() && !force {
        eprintln!("跳过: {} 已存在，使用 --force 可覆盖", source_root.display());
    } else {
        write_embedded(&SCAFFOLD_DIR, &source_root)?;
        println!("写入: {}", source_root.display());
    }

    println!("✅ 初始化完成，在该目录运行: stforge build --no-convert");
    Ok(())
}

/// 递归写出内置目录；文件路径相对内置根目录
fn write_embedded(embedded: &Dir<'_>, target_dir: &Path) -> Result<()> {
    for f in embedded.files() {
        let out_path = target_dir.join(f.path());
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, f.contents())
            .with_context(|| format!("写出脚手架文件失败: {}", out_path.display()))?;
    }
    for d in embedded.dirs() {
        write_embedded(d, target_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        build::{BuildOptions, Pipeline},
        config::load_project,
        convert::SublimeConverter,
    };

    #[test]
    fn scaffold_contains_a_buildable_tree() {
        let dir = tempfile::tempdir().unwrap();
        init_scaffold(dir.path(), false).unwrap();
        assert!(dir.path().join("stforge.yaml").is_file());
        assert!(dir.path().join(".src/settings/specific/dark.json").is_file());
        assert!(dir.path().join(".src/partials/sidebar.json").is_file());

        let project = load_project(None, dir.path()).unwrap();
        let converter = SublimeConverter::new(project.manifest.converter.clone());
        let outcome = Pipeline::all().run(&project, BuildOptions { convert: false }, &converter);
        assert!(outcome.succeeded(), "{outcome:?}");

        let theme = fs::read_to_string(dir.path().join("Boxy Light.sublime-theme")).unwrap();
        assert!(theme.contains("\"layer1.tint\": \"#1e88e5\""));
        assert!(theme.contains("\"row_padding\": [8, 3]"));
        let widget = fs::read_to_string(dir.path().join("widgets/Widget - Boxy Dark.stTheme")).unwrap();
        assert!(widget.contains("<string>#181a1f</string>"));
    }

    #[test]
    fn existing_files_are_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stforge.yaml"), "source_dir: mine\n").unwrap();
        init_scaffold(dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("stforge.yaml")).unwrap(), "source_dir: mine\n");

        init_scaffold(dir.path(), true).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("stforge.yaml")).unwrap(), SAMPLE_MANIFEST);
    }

    #[test]
    fn sample_manifest_parses() {
        let manifest: crate::config::Manifest = serde_yaml::from_str(SAMPLE_MANIFEST).unwrap();
        assert_eq!(manifest.version_files.len(), 2);
        assert_eq!(manifest.converter.command, "subl");
    }
}
