//! 模板渲染模块：
//! - 基于 Tera，占位符语法 `{{ key }}` / `{{ nested.key }}`
//! - 可选加载 partials 目录，模板中用 `{% include "name" %}` 引用
//! - 将 Tera 的“变量不存在”错误转换为带变体名与键名的 `UnresolvedReference`

use std::{error::Error as StdError, path::Path};

use serde_json::Value;
use tera::{Context as TContext, Tera};

use crate::{error::ForgeError, merge::Mapping};

/// 渲染器：持有已加载 partials 的 Tera 实例，关闭自动转义
pub(crate) struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// 不带 partials 的渲染器
    pub(crate) fn plain() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        Self { tera }
    }

    /// 加载 `partials_dir/**/*` 作为可 include 的模板；目录不存在时等同于 `plain()`
    pub(crate) fn with_partials(partials_dir: &Path) -> Result<Self, ForgeError> {
        if !partials_dir.is_dir() {
            return Ok(Self::plain());
        }
        let pattern = partials_dir.join("**").join("*");
        let pattern_str = pattern.to_string_lossy().to_string();
        let mut tera = Tera::new(&pattern_str).map_err(|e| ForgeError::Template {
            variant: "*".to_string(),
            template: pattern_str.clone(),
            message: error_chain(&e),
        })?;
        tera.autoescape_on(vec![]);
        tracing::debug!(partials = %pattern_str, "已加载 partials");
        Ok(Self { tera })
    }

    /// 用合并后的配置渲染模板文本
    pub(crate) fn render(
        &mut self,
        variant: &str,
        template_name: &str,
        template_text: &str,
        config: &Mapping,
    ) -> Result<String, ForgeError> {
        let ctx = TContext::from_value(Value::Object(config.clone())).map_err(|e| {
            ForgeError::Template {
                variant: variant.to_string(),
                template: template_name.to_string(),
                message: error_chain(&e),
            }
        })?;
        self.tera
            .render_str(template_text, &ctx)
            .map_err(|e| classify(variant, template_name, &e))
    }
}

fn classify(variant: &str, template_name: &str, err: &tera::Error) -> ForgeError {
    let chain = error_chain(err);
    match missing_variable(&chain) {
        Some(key) => ForgeError::UnresolvedReference {
            variant: variant.to_string(),
            key,
        },
        None => ForgeError::Template {
            variant: variant.to_string(),
            template: template_name.to_string(),
            message: chain,
        },
    }
}

// Tera 的错误信息分层嵌套在 source() 链中
fn error_chain(err: &tera::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut cur: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = cur {
        parts.push(e.to_string());
        cur = e.source();
    }
    parts.join(": ")
}

// 匹配 "Variable `colors.bg` not found in context ..."
fn missing_variable(message: &str) -> Option<String> {
    const HEAD: &str = "Variable `";
    const TAIL: &str = "` not found";
    let start = message.find(HEAD)? + HEAD.len();
    let rest = &message[start..];
    let end = rest.find(TAIL)?;
    let key = &rest[..end];
    if key.is_empty() { None } else { Some(key.to_string()) }
}
