use folio_ssg::{CONFIG_FILE_NAME, SiteBuilder};
use std::fs;
use std::path::Path;
use std::time::Instant;

const AVATAR_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="256" height="320" viewBox="0 0 256 320"><rect width="256" height="320" rx="24" fill="#1e293b"/><circle cx="128" cy="120" r="56" fill="#38bdf8"/><rect x="48" y="200" width="160" height="96" rx="48" fill="#38bdf8"/></svg>
"##;

const PROJECT_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="360" viewBox="0 0 640 360"><rect width="640" height="360" fill="#0f172a"/><path d="M0 300 L200 140 L340 260 L460 180 L640 320 L640 360 L0 360 Z" fill="#10b981"/></svg>
"##;

fn escape_toml_string(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for character in input.chars() {
        match character {
            '\\' => output.push_str("\\\\"),
            '"' => output.push_str("\\\""),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            control if control < '\u{0020}' => {
                output.push_str(&format!("\\u{:04X}", control as u32));
            }
            other => output.push(other),
        }
    }
    output
}

fn starter_config(name: &str) -> String {
    let escaped_name = escape_toml_string(name);
    format!(
        r#"[site]
base_url = "https://example.com/"
title = "{escaped_name}"
description = "Portfolio of {escaped_name}"
trailing_slash = "always"
markdown_extensions = ["math"]
markdown_output_extensions = ["math", "external-links"]

[[pages]]
path = "/"
title = "Home"

[[pages.partials]]
name = "Hero"

[pages.partials.props]
title = "Hi there, I'm "
highlight = "{escaped_name}"
title_suffix = " 👋"
description = "I build things for the web. This paragraph is **markdown**."
avatar = {{ src = "/assets/images/avatar.svg", alt = "Avatar image" }}

[[pages.partials]]
name = "ProjectList"

[pages.partials.props]
title = "Recent"
highlight = "Projects"

[[pages.partials.props.projects]]
name = "First project"
description = "Describe the project here. Inline math works too: \\(e^{{i\\pi}} + 1 = 0\\)."
link = "https://example.com/"
image = {{ src = "/assets/images/project.svg", alt = "First project" }}
tags = [{{ label = "Rust", color = "orange" }}, {{ label = "Web", color = "sky" }}]

[[pages.partials]]
name = "Footer"

[pages.partials.props]
text = "© {escaped_name}"
"#
    )
}

fn scaffold(site_dir: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let images_dir = site_dir.join("public").join("assets").join("images");
    fs::create_dir_all(&images_dir)?;
    fs::create_dir_all(site_dir.join("templates"))?;

    fs::write(site_dir.join(CONFIG_FILE_NAME), starter_config(name))?;
    fs::write(images_dir.join("avatar.svg"), AVATAR_SVG)?;
    fs::write(images_dir.join("project.svg"), PROJECT_SVG)?;
    Ok(())
}

pub fn new_site(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let site_dir = Path::new(name);

    if site_dir.exists() {
        return Err(format!("Directory '{}' already exists", name).into());
    }

    scaffold(site_dir, name)?;

    println!("Created new site: {name}");
    println!("  cd {name}");
    println!("  folio build");

    Ok(())
}

pub fn build_site(
    input: Option<&Path>,
    output: &Path,
    base_url: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let input_dir = input.unwrap_or(Path::new("."));

    tracing::info!("Building site from {}", input_dir.display());
    let start = Instant::now();

    let mut builder = SiteBuilder::new(input_dir);
    if let Some(url) = base_url {
        builder = builder.base_url(url);
    }

    let site = builder.build_and_publish(output)?;

    println!(
        "Built {} pages ({} files) to {} in {:.2?}",
        site.routes.len(),
        site.output.len(),
        output.display(),
        start.elapsed()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_escape_toml_string_plain() {
        assert_eq!(escape_toml_string("hello world"), "hello world");
    }

    #[test]
    fn test_escape_toml_string_backslash() {
        assert_eq!(escape_toml_string("path\\to\\file"), "path\\\\to\\\\file");
    }

    #[test]
    fn test_escape_toml_string_quotes() {
        assert_eq!(escape_toml_string("say \"hello\""), "say \\\"hello\\\"");
    }

    #[test]
    fn test_escape_toml_string_newline() {
        assert_eq!(escape_toml_string("line1\nline2"), "line1\\nline2");
    }

    #[test]
    fn test_escape_toml_string_control_char() {
        assert_eq!(escape_toml_string("null\u{0000}byte"), "null\\u0000byte");
    }

    #[test]
    fn test_scaffolded_site_builds() {
        let temp = TempDir::new().unwrap();
        let site_dir = temp.path().join("site");
        scaffold(&site_dir, "Ada \"The Countess\"").unwrap();

        let dist = temp.path().join("dist");
        let site = SiteBuilder::new(&site_dir).build_and_publish(&dist).unwrap();

        assert_eq!(site.routes.len(), 1);
        let index = fs::read_to_string(dist.join("index.html")).unwrap();
        assert!(index.contains("Ada &quot;The Countess&quot;"));
        assert!(index.contains("<math"));
        assert!(dist.join("sitemap.xml").exists());
        assert!(dist.join("robots.txt").exists());
        assert!(dist.join("_assets").join("site.css").exists());
    }

    #[test]
    fn test_new_site_refuses_existing_directory() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().to_string_lossy().to_string();
        assert!(new_site(&existing).is_err());
    }
}
