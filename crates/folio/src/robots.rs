use serde::{Deserialize, Serialize};

pub const ROBOTS_FILE_NAME: &str = "robots.txt";

/// Crawl rules for `robots.txt`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotsConfig {
    #[serde(default = "default_policies")]
    pub policies: Vec<RobotsPolicy>,
    #[serde(default)]
    pub host: Option<String>,
    /// Adds a `Sitemap:` line when the sitemap generator is enabled.
    #[serde(default = "default_sitemap")]
    pub sitemap: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotsPolicy {
    #[serde(default = "default_user_agent", alias = "userAgent")]
    pub user_agent: String,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub disallow: Vec<String>,
    #[serde(default, alias = "crawlDelay")]
    pub crawl_delay: Option<u32>,
}

fn default_policies() -> Vec<RobotsPolicy> {
    vec![RobotsPolicy {
        user_agent: default_user_agent(),
        allow: vec!["/".to_string()],
        disallow: Vec::new(),
        crawl_delay: None,
    }]
}

fn default_user_agent() -> String {
    "*".to_string()
}

fn default_sitemap() -> bool {
    true
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            policies: default_policies(),
            host: None,
            sitemap: default_sitemap(),
        }
    }
}

/// Renders `robots.txt`. `sitemap_url` is the absolute sitemap location, or
/// `None` when no sitemap is generated.
pub fn generate_robots(config: &RobotsConfig, sitemap_url: Option<&str>) -> String {
    let mut output = String::new();

    for (index, policy) in config.policies.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&format!("User-agent: {}\n", policy.user_agent));
        for path in &policy.allow {
            output.push_str(&format!("Allow: {}\n", path));
        }
        for path in &policy.disallow {
            output.push_str(&format!("Disallow: {}\n", path));
        }
        if let Some(delay) = policy.crawl_delay {
            output.push_str(&format!("Crawl-delay: {}\n", delay));
        }
    }

    if let Some(host) = &config.host {
        output.push_str(&format!("\nHost: {}\n", host));
    }

    if config.sitemap
        && let Some(url) = sitemap_url
    {
        output.push_str(&format!("\nSitemap: {}\n", url));
    }

    output
}
