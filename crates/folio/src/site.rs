use crate::config::{SiteConfig, SiteManifest};
use crate::content::Page;
use crate::error::{FolioError, Result};
use crate::generators::{run_generators, sitemap_url};
use crate::images::{AssetStore, DirectoryAssetStore, optimize_images};
use crate::markdown::MarkdownPipeline;
use crate::output::{BuildOutput, OutputFile};
use crate::partials::PartialRegistry;
use crate::routing::{RouteEntry, RouteTable, canonical_url, normalize, output_file, validate_route};
use crate::styles::{STYLESHEET_PATH, generate_stylesheet};
use crate::theme::{PageView, ThemeEngine};
use crate::tree::RenderedTree;
use chrono::{DateTime, NaiveDate};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Directory under the site root that image keys resolve against.
pub const PUBLIC_DIR: &str = "public";
/// Directory under the site root holding theme template overrides.
pub const TEMPLATES_DIR: &str = "templates";

/// Result of a successful build: the validated configuration, the derived
/// route table and every output file, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct Site {
    pub config: SiteConfig,
    pub routes: RouteTable,
    pub output: BuildOutput,
}

pub struct SiteBuilder {
    input_dir: PathBuf,
    base_url_override: Option<String>,
    registry: PartialRegistry,
    asset_store: Option<Box<dyn AssetStore>>,
}

impl SiteBuilder {
    pub fn new(input_dir: impl AsRef<Path>) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            base_url_override: None,
            registry: PartialRegistry::with_builtin(),
            asset_store: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url_override = Some(url.into());
        self
    }

    pub fn registry(mut self, registry: PartialRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the default `public/` directory store.
    pub fn asset_store(mut self, store: impl AssetStore + 'static) -> Self {
        self.asset_store = Some(Box::new(store));
        self
    }

    /// Loads `folio.toml` from the input directory and builds it.
    pub fn build(&self) -> Result<Site> {
        let manifest = SiteManifest::load(&self.input_dir)?;
        self.build_manifest(manifest)
    }

    /// Builds, then replaces `output_dir` with the result. Nothing is written
    /// when any phase fails.
    pub fn build_and_publish(&self, output_dir: &Path) -> Result<Site> {
        let site = self.build()?;
        site.output.publish(output_dir)?;
        Ok(site)
    }

    pub fn build_manifest(&self, manifest: SiteManifest) -> Result<Site> {
        let start = Instant::now();
        let SiteManifest { mut config, pages } = manifest;

        if let Some(url) = &self.base_url_override {
            config = config.with_base_url(url)?;
        }

        let entries = route_entries(&config, &pages)?;
        tracing::info!("Validated {} routes", entries.len());

        let resolved = pages
            .iter()
            .map(|page| self.registry.resolve_page(page))
            .collect::<Result<Vec<_>>>()?;

        let markdown = MarkdownPipeline::new(&config)?;
        let mut trees = resolved
            .par_iter()
            .map(|page| {
                tracing::debug!("Composing {}", page.route);
                page.render(&markdown)
            })
            .collect::<Result<Vec<RenderedTree>>>()?;
        tracing::info!("Composed {} pages", trees.len());

        let base_path = config.base_path();
        let public_store;
        let store: &dyn AssetStore = match &self.asset_store {
            Some(store) => store.as_ref(),
            None => {
                public_store = DirectoryAssetStore::new(self.input_dir.join(PUBLIC_DIR));
                &public_store
            }
        };
        let images = optimize_images(
            trees.iter().flat_map(|tree| tree.images()),
            store,
            &config.images,
        )?;
        for tree in &mut trees {
            images.rewrite(tree, &base_path);
        }
        tracing::info!("Optimized {} images", images.len());

        let mut seen = HashSet::new();
        let class_names: Vec<String> = trees
            .iter()
            .flat_map(|tree| tree.class_names())
            .filter(|name| seen.insert(name.clone()))
            .collect();
        let stylesheet = generate_stylesheet(&class_names, &config, &self.input_dir)?;
        tracing::info!("Generated stylesheet from {} classes", class_names.len());

        let theme = ThemeEngine::with_overrides(&self.input_dir.join(TEMPLATES_DIR))?;
        let stylesheet_url = format!("{}/{}", base_path, STYLESHEET_PATH);
        let sitemap = sitemap_url(&config);
        let documents = trees
            .par_iter()
            .zip(pages.par_iter())
            .zip(entries.par_iter())
            .map(|((tree, page), entry)| -> Result<OutputFile> {
                let view = PageView {
                    path: entry.path.clone(),
                    title: page.title.clone(),
                    description: page.description.clone(),
                    canonical_url: entry.url.clone(),
                };
                let html = theme.render_page(
                    &config,
                    &view,
                    &tree.to_html(),
                    &stylesheet_url,
                    sitemap.as_deref(),
                )?;
                let contents = if config.minify {
                    minify_page(&html)
                } else {
                    html.into_bytes()
                };
                Ok(OutputFile::new(output_file(&entry.path), contents))
            })
            .collect::<Result<Vec<OutputFile>>>()?;

        let routes = RouteTable::new(entries);
        let mut files = documents;
        files.push(OutputFile::new(STYLESHEET_PATH, stylesheet));
        files.extend(images.into_files());
        files.extend(run_generators(&routes, &config));

        tracing::info!(
            "Built {} routes into {} files in {:.2?}",
            routes.len(),
            files.len(),
            start.elapsed()
        );

        Ok(Site {
            config,
            routes,
            output: BuildOutput { files },
        })
    }
}

fn minify_page(html: &str) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.minify_css = true;
    cfg.keep_closing_tags = true;
    minify_html::minify(html.as_bytes(), &cfg)
}

/// Validates every declared route and derives its table entry, in
/// declaration order. Two routes that serve the same file collide.
fn route_entries(config: &SiteConfig, pages: &[Page]) -> Result<Vec<RouteEntry>> {
    let mut served: HashMap<PathBuf, &str> = HashMap::new();
    let mut entries = Vec::with_capacity(pages.len());

    for page in pages {
        validate_route(&page.path).map_err(|message| FolioError::Config {
            message: format!("invalid route '{}': {}", page.path, message),
        })?;

        let path = normalize(&page.path, config.trailing_slash);
        if let Some(existing) = served.insert(output_file(&path), &page.path) {
            return Err(FolioError::DuplicateRoute {
                route: path,
                path: page.path.clone(),
                existing_path: existing.to_string(),
            });
        }

        let lastmod = page
            .lastmod
            .as_deref()
            .map(|raw| parse_lastmod(raw, &page.path))
            .transpose()?;

        entries.push(RouteEntry {
            url: canonical_url(&config.base_url, &page.path, config.trailing_slash),
            path,
            lastmod,
            in_sitemap: page.sitemap,
        });
    }

    Ok(entries)
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_lastmod(raw: &str, route: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|date| date.date_naive()))
        .map_err(|_| FolioError::Config {
            message: format!("invalid lastmod '{}' on page '{}'", raw, route),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PartialSpec;
    use crate::error::ErrorKind;
    use crate::images::MemoryAssetStore;
    use crate::partials::PartialKind;
    use crate::routing::TrailingSlash;
    use serde_json::json;

    const AVATAR_SVG: &[u8] =
        b"<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"8\" height=\"8\"></svg>";

    fn store() -> MemoryAssetStore {
        let mut store = MemoryAssetStore::new();
        store.insert("assets/images/avatar.svg", AVATAR_SVG.to_vec());
        store
    }

    fn prose(body: &str) -> PartialSpec {
        PartialSpec::new("Prose").prop("body", json!(body))
    }

    fn manifest(pages: Vec<Page>) -> SiteManifest {
        SiteManifest {
            config: SiteConfig::new("https://example.com/").unwrap(),
            pages,
        }
    }

    fn builder() -> SiteBuilder {
        SiteBuilder::new("does-not-exist").asset_store(store())
    }

    #[test]
    fn test_build_in_memory() {
        let pages = vec![
            Page::new("/").with_partial(prose("Hello *world*")),
            Page::new("/about").with_partial(prose("About me")),
        ];
        let site = builder().build_manifest(manifest(pages)).unwrap();

        let index = site.output.get("index.html").unwrap().contents_str().unwrap();
        assert!(index.contains("<em>world</em>"));
        assert!(index.contains("href=\"/_assets/site.css\""));
        assert!(site.output.get("about/index.html").is_some());
        assert!(site.output.get(STYLESHEET_PATH).is_some());
        assert!(site.output.get("sitemap.xml").is_some());
        assert!(site.output.get("robots.txt").is_some());
        assert_eq!(site.routes.len(), 2);
    }

    #[test]
    fn test_route_table_keeps_declaration_order() {
        let mut manifest = manifest(
            ["/z", "/a", "/m", "/"]
                .iter()
                .map(|path| Page::new(*path).with_partial(prose(path)))
                .collect(),
        );
        manifest.config.trailing_slash = TrailingSlash::Always;
        let site = builder().build_manifest(manifest).unwrap();
        let paths: Vec<&str> = site.routes.iter().map(|entry| entry.path.as_str()).collect();
        assert_eq!(paths, vec!["/z/", "/a/", "/m/", "/"]);
    }

    #[test]
    fn test_duplicate_route_after_normalization() {
        let mut manifest = manifest(vec![
            Page::new("/about").with_partial(prose("a")),
            Page::new("/about/").with_partial(prose("b")),
        ]);
        manifest.config.trailing_slash = TrailingSlash::Never;
        let error = builder().build_manifest(manifest).unwrap_err();
        assert!(matches!(error, FolioError::DuplicateRoute { ref route, .. } if route == "/about"));
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_ignore_policy_still_rejects_same_output_file() {
        let error = builder()
            .build_manifest(manifest(vec![
                Page::new("/about").with_partial(prose("a")),
                Page::new("/about/").with_partial(prose("b")),
            ]))
            .unwrap_err();
        assert!(matches!(error, FolioError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_invalid_route_rejected() {
        let error = builder()
            .build_manifest(manifest(vec![Page::new("about").with_partial(prose("a"))]))
            .unwrap_err();
        assert!(matches!(error, FolioError::Config { .. }));
    }

    #[test]
    fn test_lastmod_formats() {
        assert_eq!(
            parse_lastmod("2023-09-01", "/").unwrap(),
            NaiveDate::from_ymd_opt(2023, 9, 1).unwrap()
        );
        assert_eq!(
            parse_lastmod("2023-09-01T10:00:00+02:00", "/").unwrap(),
            NaiveDate::from_ymd_opt(2023, 9, 1).unwrap()
        );
        assert!(matches!(
            parse_lastmod("September", "/"),
            Err(FolioError::Config { .. })
        ));
    }

    #[test]
    fn test_base_url_override_revalidated() {
        let error = builder()
            .base_url("not a url")
            .build_manifest(manifest(vec![Page::new("/").with_partial(prose("a"))]))
            .unwrap_err();
        assert!(matches!(error, FolioError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_base_path_prefixes_asset_urls() {
        let page = Page::new("/").with_partial(
            PartialSpec::new("Hero")
                .prop("title", json!("Hi"))
                .prop("description", json!("Bio"))
                .prop(
                    "avatar",
                    json!({"src": "/assets/images/avatar.svg", "alt": "Avatar image"}),
                ),
        );
        let site = builder()
            .base_url("https://example.com/me/")
            .build_manifest(manifest(vec![page]))
            .unwrap();
        let index = site.output.get("index.html").unwrap().contents_str().unwrap();
        assert!(index.contains("href=\"/me/_assets/site.css\""));
        assert!(index.contains("src=\"/me/_images/avatar."));
        assert!(index.contains("href=\"https://example.com/me/\""));
    }

    #[test]
    fn test_custom_partial_name() {
        let mut registry = PartialRegistry::with_builtin();
        registry.register("Intro", PartialKind::Prose);
        let page = Page::new("/").with_partial(PartialSpec::new("Intro").prop("body", json!("x")));
        let site = builder()
            .registry(registry)
            .build_manifest(manifest(vec![page]))
            .unwrap();
        assert!(site.output.get("index.html").is_some());
    }

    #[test]
    fn test_minified_output() {
        let mut manifest = manifest(vec![Page::new("/").with_partial(prose("Hello"))]);
        manifest.config.minify = true;
        let site = builder().build_manifest(manifest).unwrap();
        let index = site.output.get("index.html").unwrap().contents_str().unwrap();
        assert!(!index.contains("\n  "));
        assert!(index.contains("Hello"));
    }
}
