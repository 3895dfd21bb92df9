//! 配置与加载模块：
//! - 定义项目清单 `Manifest`（stforge.yaml）及各分类的输出约定
//! - 提供 `load_project` 支持显式路径 / 自动发现 / 内置默认（三者按优先级）
//! - 读取 JSON 设置文件、枚举变体文件

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{build::Category, error::ForgeError, merge::Mapping};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct Manifest {
    /// 源文件根目录（相对清单所在目录），默认 `.src`
    pub(crate) source_dir: PathBuf,
    pub(crate) settings: SettingsPaths,
    /// 可 include 的公共模板片段目录（相对 source_dir）
    pub(crate) partials_dir: PathBuf,
    pub(crate) themes: CategorySettings,
    pub(crate) schemes: CategorySettings,
    pub(crate) widgets: CategorySettings,
    pub(crate) converter: ConverterSettings,
    /// 需要同步版本号的文件
    pub(crate) version_files: Vec<VersionFile>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(".src"),
            settings: SettingsPaths::default(),
            partials_dir: PathBuf::from("partials"),
            themes: CategorySettings::default(),
            schemes: CategorySettings::default(),
            widgets: CategorySettings::default(),
            converter: ConverterSettings::default(),
            version_files: vec![
                VersionFile { path: PathBuf::from("package.json"), key: "version".into() },
                VersionFile { path: PathBuf::from("boxy_environment.py"), key: "__version__".into() },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct SettingsPaths {
    /// 公共设置（相对 source_dir）
    pub(crate) common: PathBuf,
    /// 变体设置目录，每个 `*.json` 即一个变体
    pub(crate) variants_dir: PathBuf,
}

impl Default for SettingsPaths {
    fn default() -> Self {
        Self {
            common: PathBuf::from("settings/common.json"),
            variants_dir: PathBuf::from("settings/specific"),
        }
    }
}

/// 分类设置，未填写的字段回退到该分类的内置约定
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CategorySettings {
    #[serde(default)]
    pub(crate) out_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) prefix: Option<String>,
    /// 模板路径（相对 source_dir），可含 `{variant}`
    #[serde(default)]
    pub(crate) templates: Option<Vec<String>>,
    /// 覆盖输出扩展名；缺省取模板文件自身的扩展名
    #[serde(default)]
    pub(crate) extension: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct ConverterSettings {
    pub(crate) enabled: bool,
    /// 编辑器命令行工具
    pub(crate) command: String,
    /// 在编辑器内执行的转换命令
    pub(crate) convert_command: String,
    pub(crate) output_extension: String,
    pub(crate) timeout_secs: u64,
    pub(crate) poll_interval_ms: u64,
    pub(crate) retry_interval_ms: u64,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "subl".into(),
            convert_command: "convert_file".into(),
            output_extension: ".tmTheme".into(),
            timeout_secs: 30,
            poll_interval_ms: 250,
            retry_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VersionFile {
    pub(crate) path: PathBuf,
    /// 版本号所在的键，例如 `version` 或 `__version__`
    #[serde(default = "default_version_key")]
    pub(crate) key: String,
}

fn default_version_key() -> String { "version".into() }

/// 某一分类解析后的输出约定（路径均已拼接为项目内路径）
#[derive(Debug, Clone)]
pub(crate) struct CategoryLayout {
    pub(crate) out_dir: PathBuf,
    pub(crate) prefix: String,
    pub(crate) templates: Vec<String>,
    pub(crate) extension: Option<String>,
}

/// 清单来源（用于打印和调试）
#[derive(Debug, Clone)]
pub(crate) enum ManifestSource {
    Explicit(PathBuf),
    Auto(PathBuf),
    Builtin,
}

/// 人类可读的来源描述
pub(crate) fn describe_source(src: &ManifestSource) -> String {
    match src {
        ManifestSource::Explicit(p) => format!("清单文件: {}", p.display()),
        ManifestSource::Auto(p) => format!("清单文件(自动发现): {}", p.display()),
        ManifestSource::Builtin => "内置默认布局".to_string(),
    }
}

/// 项目：根目录 + 清单
#[derive(Debug, Clone)]
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) manifest: Manifest,
    pub(crate) source: ManifestSource,
}

impl Project {
    pub(crate) fn new(root: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self { root: root.into(), manifest, source: ManifestSource::Builtin }
    }

    pub(crate) fn source_dir(&self) -> PathBuf {
        self.root.join(&self.manifest.source_dir)
    }

    pub(crate) fn common_settings(&self) -> PathBuf {
        self.source_dir().join(&self.manifest.settings.common)
    }

    pub(crate) fn variants_dir(&self) -> PathBuf {
        self.source_dir().join(&self.manifest.settings.variants_dir)
    }

    pub(crate) fn partials_dir(&self) -> PathBuf {
        self.source_dir().join(&self.manifest.partials_dir)
    }

    /// 合并分类设置与内置约定
    pub(crate) fn layout(&self, category: Category) -> CategoryLayout {
        let (settings, out_dir, prefix, templates, extension): (&CategorySettings, &str, &str, &[&str], Option<&str>) =
            match category {
                Category::Themes => (
                    &self.manifest.themes,
                    ".",
                    "Boxy ",
                    &["themes/{variant}.json"][..],
                    Some(".sublime-theme"),
                ),
                Category::Schemes => (
                    &self.manifest.schemes,
                    "schemes",
                    "Boxy ",
                    &["schemes/scheme.YAML-tmTheme"][..],
                    None,
                ),
                Category::Widgets => (
                    &self.manifest.widgets,
                    "widgets",
                    "Widget - Boxy ",
                    &["widgets/widget.stTheme", "widgets/widget.sublime-settings"][..],
                    None,
                ),
            };
        CategoryLayout {
            out_dir: self.root.join(settings.out_dir.clone().unwrap_or_else(|| PathBuf::from(out_dir))),
            prefix: settings.prefix.clone().unwrap_or_else(|| prefix.to_string()),
            templates: settings
                .templates
                .clone()
                .unwrap_or_else(|| templates.iter().map(|t| t.to_string()).collect()),
            extension: settings.extension.clone().or_else(|| extension.map(str::to_string)),
        }
    }
}

const MANIFEST_CANDIDATES: [&str; 2] = ["stforge.yaml", "stforge.yml"];

// 自动发现：当前目录下的 stforge.yaml / stforge.yml
fn resolve_manifest_path(dir: &Path) -> Option<PathBuf> {
    MANIFEST_CANDIDATES
        .iter()
        .map(|c| dir.join(c))
        .find(|p| p.is_file())
}

/// 加载项目清单：显式路径 > 自动发现 > 内置默认
pub(crate) fn load_project(explicit: Option<&Path>, cwd: &Path) -> Result<Project> {
    let (path, source) = match explicit {
        Some(p) => {
            let p = if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) };
            if !p.is_file() {
                bail!("清单文件不存在: {}", p.display());
            }
            (p.clone(), ManifestSource::Explicit(p))
        }
        None => match resolve_manifest_path(cwd) {
            Some(p) => (p.clone(), ManifestSource::Auto(p)),
            None => return Ok(Project::new(cwd, Manifest::default())),
        },
    };
    let raw = fs::read_to_string(&path).with_context(|| format!("读取清单失败: {}", path.display()))?;
    let manifest: Manifest = if raw.trim().is_empty() {
        Manifest::default()
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("解析 YAML 失败: {}", path.display()))?
    };
    let root = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
    let mut project = Project::new(root, manifest);
    project.source = source;
    Ok(project)
}

/// 读取 JSON 设置文件，根节点必须是对象
pub(crate) fn load_mapping(path: &Path) -> Result<Mapping, ForgeError> {
    let text = fs::read_to_string(path).map_err(|e| ForgeError::io(path, e))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| ForgeError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match value {
        Value::Object(m) => Ok(m),
        other => Err(ForgeError::ConfigParse {
            path: path.to_path_buf(),
            message: format!("根节点必须是 JSON 对象，实际为 {}", json_kind(&other)),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "布尔值",
        Value::Number(_) => "数字",
        Value::String(_) => "字符串",
        Value::Array(_) => "数组",
        Value::Object(_) => "对象",
    }
}

/// 一个主题变体：名称取设置文件的文件名（不含扩展名）
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Variant {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
}

/// 枚举变体目录下的 `*.json`，按名称排序
pub(crate) fn discover_variants(dir: &Path) -> Result<Vec<Variant>, ForgeError> {
    let entries = fs::read_dir(dir).map_err(|e| ForgeError::io(dir, e))?;
    let mut variants = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ForgeError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            variants.push(Variant { name: stem.to_string(), path: path.clone() });
        }
    }
    variants.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layout_matches_boxy_conventions() {
        let project = Project::new("/proj", Manifest::default());
        let themes = project.layout(Category::Themes);
        assert_eq!(themes.out_dir, PathBuf::from("/proj/."));
        assert_eq!(themes.prefix, "Boxy ");
        assert_eq!(themes.templates, vec!["themes/{variant}.json".to_string()]);
        assert_eq!(themes.extension.as_deref(), Some(".sublime-theme"));

        let widgets = project.layout(Category::Widgets);
        assert_eq!(widgets.prefix, "Widget - Boxy ");
        assert_eq!(widgets.templates.len(), 2);
        assert!(widgets.extension.is_none());
        assert_eq!(project.common_settings(), PathBuf::from("/proj/.src/settings/common.json"));
    }

    #[test]
    fn manifest_overrides_only_given_fields() {
        let yaml = "source_dir: src\nschemes:\n  prefix: \"Nord \"\nconverter:\n  enabled: false\n";
        let manifest: Manifest = serde_yaml::from_str(yaml).unwrap();
        let project = Project::new("/p", manifest);
        let schemes = project.layout(Category::Schemes);
        assert_eq!(schemes.prefix, "Nord ");
        assert_eq!(schemes.out_dir, PathBuf::from("/p/schemes"));
        assert!(!project.manifest.converter.enabled);
        assert_eq!(project.manifest.converter.command, "subl");
        assert_eq!(project.variants_dir(), PathBuf::from("/p/src/settings/specific"));
    }

    #[test]
    fn load_project_prefers_explicit_then_auto_then_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let builtin = load_project(None, dir.path()).unwrap();
        assert!(matches!(builtin.source, ManifestSource::Builtin));
        assert_eq!(builtin.root, dir.path());

        fs::write(dir.path().join("stforge.yaml"), "source_dir: assets\n").unwrap();
        let auto = load_project(None, dir.path()).unwrap();
        assert!(matches!(auto.source, ManifestSource::Auto(_)));
        assert_eq!(auto.root, dir.path());
        assert_eq!(auto.manifest.source_dir, PathBuf::from("assets"));

        let sub = dir.path().join("nested");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("custom.yml"), "").unwrap();
        let explicit = load_project(Some(Path::new("nested/custom.yml")), dir.path()).unwrap();
        assert!(matches!(explicit.source, ManifestSource::Explicit(_)));
        assert_eq!(explicit.root, sub);

        assert!(load_project(Some(Path::new("missing.yaml")), dir.path()).is_err());
    }

    #[test]
    fn load_mapping_rejects_malformed_and_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ \"a\": ").unwrap();
        assert!(matches!(load_mapping(&bad), Err(ForgeError::ConfigParse { .. })));

        let arr = dir.path().join("arr.json");
        fs::write(&arr, "[1, 2]").unwrap();
        match load_mapping(&arr) {
            Err(ForgeError::ConfigParse { message, .. }) => assert!(message.contains("数组")),
            other => panic!("unexpected: {other:?}"),
        }

        let ok = dir.path().join("ok.json");
        fs::write(&ok, "{\"accent\": \"#fff\"}").unwrap();
        assert_eq!(load_mapping(&ok).unwrap()["accent"], "#fff");
    }

    #[test]
    fn discovers_json_variants_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ocean.json", "dark-blue.json", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let names: Vec<String> = discover_variants(dir.path())
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["dark-blue", "ocean"]);
    }
}
