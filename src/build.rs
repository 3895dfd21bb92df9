//! 构建与渲染模块：
//! - 每个分类按 Clean -> Render -> Write -> (Convert) -> Done 顺序执行
//! - 变体级错误只中止该变体，其余变体继续；分类内任何失败都会使该分类失败
//! - `Pipeline` 显式列出要执行的分类，前一个分类失败时后续分类不再执行

use std::{
    collections::BTreeSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use tracing::{debug, error, info, warn};

use crate::{
    config::{discover_variants, load_mapping, CategoryLayout, Project, Variant},
    convert::SchemeConverter,
    error::ForgeError,
    merge::{merge, Mapping},
    naming::{derive_name, extension_of},
    template::Renderer,
};

/// 构建分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Category {
    Themes,
    Schemes,
    Widgets,
}

impl Category {
    pub(crate) const ALL: [Category; 3] = [Category::Themes, Category::Schemes, Category::Widgets];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Category::Themes => "themes",
            Category::Schemes => "schemes",
            Category::Widgets => "widgets",
        }
    }

    fn task(self) -> &'static str {
        match self {
            Category::Themes => "build:themes",
            Category::Schemes => "build:schemes",
            Category::Widgets => "build:widgets",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 分类内的执行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    Clean,
    Render,
    Write,
    Convert,
    Done,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BuildOptions {
    /// 是否对配色执行外部转换
    pub(crate) convert: bool,
}

/// 渲染完成、尚未写盘的产物
#[derive(Debug, Clone)]
pub(crate) struct RenderedAsset {
    pub(crate) path: PathBuf,
    pub(crate) contents: String,
}

#[derive(Debug)]
pub(crate) struct VariantFailure {
    pub(crate) variant: String,
    pub(crate) error: ForgeError,
}

/// 单个分类的执行结果
#[derive(Debug)]
pub(crate) struct CategoryReport {
    pub(crate) category: Category,
    /// 最后进入的阶段
    pub(crate) stage: Stage,
    pub(crate) removed: Vec<PathBuf>,
    pub(crate) written: Vec<PathBuf>,
    pub(crate) converted: Vec<PathBuf>,
    pub(crate) failures: Vec<VariantFailure>,
    /// 因变体失败而未转换的配色数
    pub(crate) convert_skipped: usize,
    /// 中止整个分类的错误
    pub(crate) fatal: Option<ForgeError>,
}

impl CategoryReport {
    fn new(category: Category) -> Self {
        Self {
            category,
            stage: Stage::Clean,
            removed: Vec::new(),
            written: Vec::new(),
            converted: Vec::new(),
            failures: Vec::new(),
            convert_skipped: 0,
            fatal: None,
        }
    }

    pub(crate) fn succeeded(&self) -> bool {
        self.fatal.is_none() && self.failures.is_empty()
    }

    fn abort(mut self, err: ForgeError) -> Self {
        error!(task = self.category.task(), stage = ?self.stage, "构建出错:\n{}", err);
        self.fatal = Some(err);
        self
    }
}

/// 流水线执行结果
#[derive(Debug)]
pub(crate) struct PipelineOutcome {
    pub(crate) reports: Vec<CategoryReport>,
    /// 因前序分类失败而未执行的分类
    pub(crate) skipped: Vec<Category>,
}

impl PipelineOutcome {
    pub(crate) fn succeeded(&self) -> bool {
        self.skipped.is_empty() && self.reports.iter().all(CategoryReport::succeeded)
    }
}

/// 显式的分类列表，按顺序执行
#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    categories: Vec<Category>,
}

impl Pipeline {
    pub(crate) fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub(crate) fn all() -> Self {
        Self::new(Category::ALL.to_vec())
    }

    /// 依次执行各分类；某分类失败后其余分类被跳过
    pub(crate) fn run(
        &self,
        project: &Project,
        opts: BuildOptions,
        converter: &dyn SchemeConverter,
    ) -> PipelineOutcome {
        let mut reports = Vec::new();
        let mut skipped = Vec::new();
        for (idx, &category) in self.categories.iter().enumerate() {
            let report = run_category(project, category, opts, converter);
            let ok = report.succeeded();
            reports.push(report);
            if !ok {
                skipped.extend_from_slice(&self.categories[idx + 1..]);
                if !skipped.is_empty() {
                    warn!(task = "build", ?skipped, "{} 失败，后续分类不再执行", category);
                }
                break;
            }
        }
        PipelineOutcome { reports, skipped }
    }
}

/// 执行单个分类：Clean -> Render -> Write -> (Convert)
pub(crate) fn run_category(
    project: &Project,
    category: Category,
    opts: BuildOptions,
    converter: &dyn SchemeConverter,
) -> CategoryReport {
    let mut report = CategoryReport::new(category);
    let layout = project.layout(category);
    let task = category.task();

    // Clean
    match clean(project, category) {
        Ok(removed) => report.removed = removed,
        Err(e) => return report.abort(e),
    }

    // Render
    report.stage = Stage::Render;
    let base = match load_mapping(&project.common_settings()) {
        Ok(b) => b,
        Err(e) => return report.abort(e),
    };
    let variants = match discover_variants(&project.variants_dir()) {
        Ok(v) => v,
        Err(e) => return report.abort(e),
    };
    if variants.is_empty() {
        warn!(task, dir = %project.variants_dir().display(), "没有找到任何变体设置");
    }
    let mut renderer = match Renderer::with_partials(&project.partials_dir()) {
        Ok(r) => r,
        Err(e) => return report.abort(e),
    };
    let mut assets: Vec<RenderedAsset> = Vec::new();
    for variant in &variants {
        match render_variant(&mut renderer, project, &layout, &base, variant) {
            Ok(mut rendered) => {
                debug!(task, variant = %variant.name, count = rendered.len(), "变体渲染完成");
                assets.append(&mut rendered);
            }
            Err(e) => {
                warn!(task, variant = %variant.name, "变体渲染失败:\n{}", e);
                report.failures.push(VariantFailure { variant: variant.name.clone(), error: e });
            }
        }
    }

    // Write
    report.stage = Stage::Write;
    match write_assets(&layout.out_dir, &assets) {
        Ok(written) => report.written = written,
        Err(e) => return report.abort(e),
    }
    let convert = category == Category::Schemes && opts.convert && project.manifest.converter.enabled;
    if !report.failures.is_empty() {
        error!(task, failed = report.failures.len(), "部分变体构建失败");
        if convert && !report.written.is_empty() {
            report.convert_skipped = report.written.len();
            warn!(
                task = "convert:schemes",
                skipped = report.convert_skipped,
                "存在失败的变体，已写出的配色不做转换；修复后重新构建"
            );
        }
        return report;
    }

    // Convert
    if convert {
        report.stage = Stage::Convert;
        if let Err(e) = convert_all(converter, &report.written, &mut report.converted) {
            return report.abort(e);
        }
    }

    report.stage = Stage::Done;
    info!(task, written = report.written.len(), converted = report.converted.len(), "构建完成");
    report
}

/// 渲染一个变体的全部模板；任一模板失败则整个变体失败
fn render_variant(
    renderer: &mut Renderer,
    project: &Project,
    layout: &CategoryLayout,
    base: &Mapping,
    variant: &Variant,
) -> Result<Vec<RenderedAsset>, ForgeError> {
    let specific = load_mapping(&variant.path)?;
    let merged = merge(base, specific);
    let source_dir = project.source_dir();
    let mut out = Vec::with_capacity(layout.templates.len());
    for template in &layout.templates {
        let rel = template.replace("{variant}", &variant.name);
        let template_path = source_dir.join(&rel);
        // 按变体命名的模板可以缺省：该变体在此分类下不产出文件
        if rel != *template && !template_path.is_file() {
            debug!(variant = %variant.name, template = %template_path.display(), "没有该变体的模板，跳过");
            continue;
        }
        let text = fs::read_to_string(&template_path).map_err(|e| ForgeError::Template {
            variant: variant.name.clone(),
            template: template_path.display().to_string(),
            message: format!("读取模板失败: {}", e),
        })?;
        let contents = renderer.render(&variant.name, &rel, &text, &merged)?;
        let extension = layout
            .extension
            .clone()
            .unwrap_or_else(|| extension_of(&template_path));
        let file_name = derive_name(&variant.name, &layout.prefix, &extension);
        out.push(RenderedAsset { path: layout.out_dir.join(file_name), contents });
    }
    Ok(out)
}

fn write_assets(out_dir: &Path, assets: &[RenderedAsset]) -> Result<Vec<PathBuf>, ForgeError> {
    if !out_dir.exists() {
        fs::create_dir_all(out_dir).map_err(|e| ForgeError::io(out_dir, e))?;
    }
    let mut written = Vec::with_capacity(assets.len());
    for asset in assets {
        fs::write(&asset.path, asset.contents.as_bytes()).map_err(|e| ForgeError::io(&asset.path, e))?;
        debug!(path = %asset.path.display(), "写入");
        written.push(asset.path.clone());
    }
    written.sort();
    Ok(written)
}

// 转换严格串行：编辑器一次只处理一个文件
fn convert_all(
    converter: &dyn SchemeConverter,
    inputs: &[PathBuf],
    converted: &mut Vec<PathBuf>,
) -> Result<(), ForgeError> {
    if inputs.is_empty() {
        return Ok(());
    }
    converter.ensure_ready()?;
    for input in inputs {
        let out = converter.convert(input)?;
        info!(task = "convert:schemes", from = %input.display(), to = %out.display(), "转换完成");
        converted.push(out);
    }
    Ok(())
}

/// 分类的清理模式：输出目录下每种输出扩展名一个 glob
pub(crate) fn clean_patterns(project: &Project, category: Category) -> Vec<String> {
    let layout = project.layout(category);
    let mut exts: BTreeSet<String> = BTreeSet::new();
    for template in &layout.templates {
        let ext = layout
            .extension
            .clone()
            .unwrap_or_else(|| extension_of(Path::new(template)));
        exts.insert(ext);
    }
    if category == Category::Schemes {
        // 转换产物与中间文件同目录
        let converted = project.manifest.converter.output_extension.trim_start_matches('.');
        exts.insert(format!(".{}", converted));
    }
    let dir = glob::Pattern::escape(&layout.out_dir.to_string_lossy());
    exts.into_iter()
        .filter(|e| !e.is_empty())
        .map(|ext| format!("{}/*{}", dir, glob::Pattern::escape(&ext)))
        .collect()
}

/// 删除分类的历史产物
pub(crate) fn clean(project: &Project, category: Category) -> Result<Vec<PathBuf>, ForgeError> {
    let mut removed = Vec::new();
    for pattern in clean_patterns(project, category) {
        let paths = glob::glob(&pattern).map_err(|e| ForgeError::CleanPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for path in paths.flatten() {
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| ForgeError::io(&path, e))?;
                debug!(task = "clean", path = %path.display(), "删除");
                removed.push(path);
            }
        }
    }
    removed.sort();
    if !removed.is_empty() {
        info!(task = %format!("clean:{}", category), count = removed.len(), "已清理旧产物");
    }
    Ok(removed)
}
