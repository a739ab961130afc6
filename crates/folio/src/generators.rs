use crate::config::SiteConfig;
use crate::output::OutputFile;
use crate::robots::{ROBOTS_FILE_NAME, generate_robots};
use crate::routing::RouteTable;
use crate::sitemap::{SITEMAP_FILE_NAME, generate_sitemap};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Auxiliary artifacts derived from the route table and site config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Sitemap,
    Robots,
}

impl GeneratorKind {
    pub fn id(&self) -> &'static str {
        match self {
            GeneratorKind::Sitemap => "sitemap",
            GeneratorKind::Robots => "robots",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.id())
    }
}

impl FromStr for GeneratorKind {
    type Err = String;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sitemap" => Ok(GeneratorKind::Sitemap),
            "robots" | "robots-txt" | "robotstxt" => Ok(GeneratorKind::Robots),
            other => Err(format!("unknown generator '{}'", other)),
        }
    }
}

/// Absolute sitemap location, when the sitemap generator is enabled.
pub fn sitemap_url(config: &SiteConfig) -> Option<String> {
    config
        .generator_enabled(GeneratorKind::Sitemap)
        .then(|| format!("{}/{}", config.base_url.trim_end_matches('/'), SITEMAP_FILE_NAME))
}

/// Runs every enabled generator. Read-only over the route table.
pub fn run_generators(routes: &RouteTable, config: &SiteConfig) -> Vec<OutputFile> {
    config
        .enabled_generators
        .iter()
        .map(|kind| match kind {
            GeneratorKind::Sitemap => OutputFile::new(SITEMAP_FILE_NAME, generate_sitemap(routes)),
            GeneratorKind::Robots => OutputFile::new(
                ROBOTS_FILE_NAME,
                generate_robots(&config.robots, sitemap_url(config).as_deref()),
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{RouteEntry, TrailingSlash, canonical_url};
    use std::path::PathBuf;

    fn routes(config: &SiteConfig, paths: &[&str]) -> RouteTable {
        RouteTable::new(
            paths
                .iter()
                .map(|path| RouteEntry {
                    path: path.to_string(),
                    url: canonical_url(&config.base_url, path, config.trailing_slash),
                    lastmod: None,
                    in_sitemap: true,
                })
                .collect(),
        )
    }

    #[test]
    fn test_parse_generator_ids() {
        assert_eq!("sitemap".parse::<GeneratorKind>(), Ok(GeneratorKind::Sitemap));
        assert_eq!("robots-txt".parse::<GeneratorKind>(), Ok(GeneratorKind::Robots));
        assert!("rss".parse::<GeneratorKind>().is_err());
    }

    #[test]
    fn test_all_generators() {
        let mut config = SiteConfig::new("https://example.com/").unwrap();
        config.trailing_slash = TrailingSlash::Always;
        let files = run_generators(&routes(&config, &["/", "/about"]), &config);

        let paths: Vec<PathBuf> = files.iter().map(|file| file.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("sitemap.xml"), PathBuf::from("robots.txt")]);
        let robots = files[1].contents_str().unwrap();
        assert!(robots.ends_with("Sitemap: https://example.com/sitemap.xml\n"));
    }

    #[test]
    fn test_robots_without_sitemap() {
        let mut config = SiteConfig::new("https://example.com/").unwrap();
        config.enabled_generators = vec![GeneratorKind::Robots];
        let files = run_generators(&routes(&config, &["/"]), &config);
        assert_eq!(files.len(), 1);
        assert!(!files[0].contents_str().unwrap().contains("Sitemap:"));
        assert_eq!(sitemap_url(&config), None);
    }

    #[test]
    fn test_no_generators() {
        let mut config = SiteConfig::new("https://example.com/").unwrap();
        config.enabled_generators.clear();
        assert!(run_generators(&routes(&config, &["/"]), &config).is_empty());
    }
}
