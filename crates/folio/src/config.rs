use crate::content::Page;
use crate::error::{FolioError, IoContext, Result};
use crate::generators::GeneratorKind;
use crate::images::ImageConfig;
use crate::markdown::{TextTransform, TreeTransform};
use crate::robots::RobotsConfig;
use crate::routing::TrailingSlash;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "folio.toml";

/// `[site]` table as written by the user, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfigFile {
    #[serde(alias = "baseURL")]
    pub base_url: String,
    #[serde(default, alias = "trailingSlash")]
    pub trailing_slash: TrailingSlash,
    #[serde(default, alias = "markdownExtensions")]
    pub markdown_extensions: Vec<String>,
    #[serde(default, alias = "markdownOutputExtensions")]
    pub markdown_output_extensions: Vec<String>,
    #[serde(default = "default_generators", alias = "enabledGenerators")]
    pub enabled_generators: Vec<String>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub minify: bool,
    #[serde(default = "default_syntax_theme")]
    pub syntax_theme: String,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub robots: RobotsConfig,
    #[serde(default)]
    pub stylesheet: Option<PathBuf>,
}

fn default_generators() -> Vec<String> {
    vec!["sitemap".to_string(), "robots".to_string()]
}

fn default_title() -> String {
    "Portfolio".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

pub fn default_syntax_theme() -> String {
    "base16-ocean.dark".to_string()
}

/// Validated, build-wide configuration. Created once and passed by reference
/// to every composition and generation step.
#[derive(Debug, Clone, Serialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub trailing_slash: TrailingSlash,
    pub markdown_extensions: Vec<TextTransform>,
    pub markdown_output_extensions: Vec<TreeTransform>,
    pub enabled_generators: Vec<GeneratorKind>,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub language: String,
    pub minify: bool,
    pub syntax_theme: String,
    pub images: ImageConfig,
    pub robots: RobotsConfig,
    pub stylesheet: Option<PathBuf>,
}

impl SiteConfig {
    /// Configuration with every optional field at its default.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_file(SiteConfigFile {
            base_url: base_url.to_string(),
            trailing_slash: TrailingSlash::default(),
            markdown_extensions: Vec::new(),
            markdown_output_extensions: Vec::new(),
            enabled_generators: default_generators(),
            title: default_title(),
            description: None,
            author: None,
            language: default_language(),
            minify: false,
            syntax_theme: default_syntax_theme(),
            images: ImageConfig::default(),
            robots: RobotsConfig::default(),
            stylesheet: None,
        })
    }

    pub fn from_file(file: SiteConfigFile) -> Result<Self> {
        let base_url = validate_base_url(&file.base_url)?;

        let markdown_extensions = file
            .markdown_extensions
            .iter()
            .map(|name| {
                name.parse::<TextTransform>()
                    .map_err(|_| FolioError::UnknownExtension {
                        chain: "markdown",
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let markdown_output_extensions = file
            .markdown_output_extensions
            .iter()
            .map(|name| {
                name.parse::<TreeTransform>()
                    .map_err(|_| FolioError::UnknownExtension {
                        chain: "markdown output",
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut enabled_generators = Vec::new();
        for name in &file.enabled_generators {
            let kind = name
                .parse::<GeneratorKind>()
                .map_err(|_| FolioError::UnknownGenerator { name: name.clone() })?;
            if !enabled_generators.contains(&kind) {
                enabled_generators.push(kind);
            }
        }
        enabled_generators.sort();

        file.images
            .validate()
            .map_err(|message| FolioError::Config { message })?;

        if !crate::markdown::is_known_theme(&file.syntax_theme) {
            return Err(FolioError::Config {
                message: format!("unknown syntax theme '{}'", file.syntax_theme),
            });
        }

        Ok(Self {
            base_url,
            trailing_slash: file.trailing_slash,
            markdown_extensions,
            markdown_output_extensions,
            enabled_generators,
            title: file.title,
            description: file.description,
            author: file.author,
            language: file.language,
            minify: file.minify,
            syntax_theme: file.syntax_theme,
            images: file.images,
            robots: file.robots,
            stylesheet: file.stylesheet,
        })
    }

    pub fn generator_enabled(&self, kind: GeneratorKind) -> bool {
        self.enabled_generators.contains(&kind)
    }

    pub fn math_enabled(&self) -> bool {
        self.markdown_extensions.contains(&TextTransform::Math)
    }

    /// Replaces the base URL, e.g. from a command-line override.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self> {
        self.base_url = validate_base_url(raw)?;
        Ok(self)
    }

    /// Path prefix of the base URL without its trailing slash: `""` for
    /// `https://example.com/`, `"/me"` for `https://example.com/me/`.
    pub fn base_path(&self) -> String {
        Url::parse(&self.base_url)
            .map(|url| url.path().trim_end_matches('/').to_string())
            .unwrap_or_default()
    }
}

fn validate_base_url(raw: &str) -> Result<String> {
    let invalid = |message: &str| FolioError::InvalidBaseUrl {
        url: raw.to_string(),
        message: message.to_string(),
    };

    let url = Url::parse(raw).map_err(|error| invalid(&error.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query strings and fragments are not allowed"));
    }

    Ok(url.to_string())
}

/// Contents of `folio.toml`: the site table plus the declared pages.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteManifestFile {
    pub site: SiteConfigFile,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone)]
pub struct SiteManifest {
    pub config: SiteConfig,
    pub pages: Vec<Page>,
}

impl SiteManifest {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let file: SiteManifestFile =
            toml::from_str(content).map_err(|error| FolioError::TomlParse {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;
        Ok(Self {
            config: SiteConfig::from_file(file.site)?,
            pages: file.pages,
        })
    }

    pub fn load(input_dir: &Path) -> Result<Self> {
        let config_path = input_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(FolioError::ConfigNotFound { path: config_path });
        }
        let content =
            fs::read_to_string(&config_path).io_context("reading config", &config_path)?;
        Self::parse(&content, &config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(content: &str) -> Result<SiteManifest> {
        SiteManifest::parse(content, Path::new("folio.toml"))
    }

    #[test]
    fn test_defaults() {
        let manifest = parse("[site]\nbase_url = \"https://example.com\"\n").unwrap();
        let config = &manifest.config;
        assert_eq!(config.base_url, "https://example.com/");
        assert_eq!(config.trailing_slash, TrailingSlash::Ignore);
        assert_eq!(
            config.enabled_generators,
            vec![GeneratorKind::Sitemap, GeneratorKind::Robots]
        );
        assert!(config.markdown_extensions.is_empty());
        assert_eq!(config.language, "en");
        assert!(manifest.pages.is_empty());
    }

    #[test]
    fn test_camel_case_aliases() {
        let manifest = parse(
            r#"
[site]
baseURL = "https://example.com/"
trailingSlash = "always"
markdownExtensions = ["remark-math"]
markdownOutputExtensions = ["rehype-katex"]
enabledGenerators = ["sitemap"]
"#,
        )
        .unwrap();
        let config = &manifest.config;
        assert_eq!(config.trailing_slash, TrailingSlash::Always);
        assert_eq!(config.markdown_extensions, vec![TextTransform::Math]);
        assert_eq!(config.markdown_output_extensions, vec![TreeTransform::Math]);
        assert_eq!(config.enabled_generators, vec![GeneratorKind::Sitemap]);
        assert!(config.math_enabled());
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let error = parse("[site]\nbase_url = \"/relative\"\n").unwrap_err();
        assert!(matches!(error, FolioError::InvalidBaseUrl { .. }));
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let error = parse("[site]\nbase_url = \"ftp://example.com\"\n").unwrap_err();
        assert!(matches!(error, FolioError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let error = parse(
            "[site]\nbase_url = \"https://example.com\"\nmarkdown_extensions = [\"emoji\"]\n",
        )
        .unwrap_err();
        assert!(matches!(error, FolioError::UnknownExtension { ref name, .. } if name == "emoji"));
    }

    #[test]
    fn test_unknown_generator_rejected() {
        let error = parse(
            "[site]\nbase_url = \"https://example.com\"\nenabled_generators = [\"rss\"]\n",
        )
        .unwrap_err();
        assert!(matches!(error, FolioError::UnknownGenerator { .. }));
    }

    #[test]
    fn test_unknown_syntax_theme_rejected() {
        let error = parse(
            "[site]\nbase_url = \"https://example.com\"\nsyntax_theme = \"no-such-theme\"\n",
        )
        .unwrap_err();
        assert!(matches!(error, FolioError::Config { .. }));
    }

    #[test]
    fn test_invalid_trailing_slash_is_parse_error() {
        let error = parse(
            "[site]\nbase_url = \"https://example.com\"\ntrailing_slash = \"sometimes\"\n",
        )
        .unwrap_err();
        assert!(matches!(error, FolioError::TomlParse { .. }));
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let error = SiteManifest::load(dir.path()).unwrap_err();
        assert!(matches!(error, FolioError::ConfigNotFound { .. }));
    }
}
