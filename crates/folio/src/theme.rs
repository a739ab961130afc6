use crate::config::SiteConfig;
use crate::error::{IoContext, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use walkdir::WalkDir;

const DEFAULT_BASE_TEMPLATE: &str = include_str!("../themes/default/templates/base.html");
const DEFAULT_PAGE_TEMPLATE: &str = include_str!("../themes/default/templates/page.html");

pub const PAGE_TEMPLATE: &str = "page.html";

/// Per-page values exposed to templates as `page`.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub path: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical_url: String,
}

/// Wraps composed page markup in an HTML document shell.
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    pub fn builtin_default() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", DEFAULT_BASE_TEMPLATE),
            (PAGE_TEMPLATE, DEFAULT_PAGE_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    /// Builtin templates, replaced by any same-named `.html` file found
    /// under `templates_dir`.
    pub fn with_overrides(templates_dir: &Path) -> Result<Self> {
        let mut engine = Self::builtin_default()?;
        if !templates_dir.is_dir() {
            return Ok(engine);
        }

        let mut overrides = Vec::new();
        for entry in WalkDir::new(templates_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|extension| extension.to_str()) != Some("html")
            {
                continue;
            }
            let name = path
                .strip_prefix(templates_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read_to_string(path).io_context("reading template", path)?;
            overrides.push((name, content));
        }

        if !overrides.is_empty() {
            tracing::info!("Loaded {} template overrides", overrides.len());
            engine.tera.add_raw_templates(overrides)?;
        }
        Ok(engine)
    }

    pub fn render_page(
        &self,
        site: &SiteConfig,
        page: &PageView,
        content: &str,
        stylesheet_url: &str,
        sitemap_url: Option<&str>,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("page", page);
        context.insert("content", content);
        context.insert("stylesheet_url", stylesheet_url);
        context.insert("sitemap_url", &sitemap_url);
        Ok(self.tera.render(PAGE_TEMPLATE, &context)?)
    }
}
