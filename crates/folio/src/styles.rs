//! Stylesheet generation from the class annotations of rendered pages.
//!
//! Every class name found in the composed trees is matched against a fixed
//! set of utility families (spacing, sizing, flex, typography, palette). A
//! class may carry `hover:` and `md:` variant prefixes. Names that match no
//! family are skipped.

use crate::config::SiteConfig;
use crate::error::{FolioError, Result};
use std::fmt::Write;
use std::path::Path;

pub const STYLESHEET_PATH: &str = "_assets/site.css";

const MEDIUM_BREAKPOINT: &str = "768px";

const BASE_CSS: &str = r#"*,::before,::after{box-sizing:border-box;border-width:0;border-style:solid}
html{line-height:1.5;-webkit-text-size-adjust:100%;font-family:ui-sans-serif,system-ui,-apple-system,"Segoe UI",Roboto,"Helvetica Neue",Arial,sans-serif}
body{margin:0;background-color:#111827;color:#f3f4f6}
h1,h2,h3,h4,h5,h6,p,pre,figure{margin:0}
a{color:inherit;text-decoration:inherit}
img,svg,picture{display:block;max-width:100%;height:auto}
code,pre{font-family:ui-monospace,SFMono-Regular,Menlo,Consolas,monospace}
.prose p,.prose ul,.prose ol,.prose pre,.prose table{margin-top:1rem}
.prose a{color:#22d3ee;text-decoration:underline}
.prose pre{padding:1rem;border-radius:0.375rem;overflow-x:auto}
.math-display{display:block;overflow-x:auto;text-align:center;margin:1rem 0}
"#;

const PALETTE: &[(&str, [&str; 4])] = &[
    ("slate", ["#94a3b8", "#64748b", "#1e293b", "#0f172a"]),
    ("gray", ["#9ca3af", "#6b7280", "#1f2937", "#111827"]),
    ("zinc", ["#a1a1aa", "#71717a", "#27272a", "#18181b"]),
    ("neutral", ["#a3a3a3", "#737373", "#262626", "#171717"]),
    ("stone", ["#a8a29e", "#78716c", "#292524", "#1c1917"]),
    ("red", ["#f87171", "#ef4444", "#991b1b", "#7f1d1d"]),
    ("orange", ["#fb923c", "#f97316", "#9a3412", "#7c2d12"]),
    ("amber", ["#fbbf24", "#f59e0b", "#92400e", "#78350f"]),
    ("yellow", ["#facc15", "#eab308", "#854d0e", "#713f12"]),
    ("lime", ["#a3e635", "#84cc16", "#3f6212", "#365314"]),
    ("green", ["#4ade80", "#22c55e", "#166534", "#14532d"]),
    ("emerald", ["#34d399", "#10b981", "#065f46", "#064e3b"]),
    ("teal", ["#2dd4bf", "#14b8a6", "#115e59", "#134e4a"]),
    ("cyan", ["#22d3ee", "#06b6d4", "#155e75", "#164e63"]),
    ("sky", ["#38bdf8", "#0ea5e9", "#075985", "#0c4a6e"]),
    ("blue", ["#60a5fa", "#3b82f6", "#1e40af", "#1e3a8a"]),
    ("indigo", ["#818cf8", "#6366f1", "#3730a3", "#312e81"]),
    ("violet", ["#a78bfa", "#8b5cf6", "#5b21b6", "#4c1d95"]),
    ("purple", ["#c084fc", "#a855f7", "#6b21a8", "#581c87"]),
    ("fuchsia", ["#e879f9", "#d946ef", "#86198f", "#701a75"]),
    ("pink", ["#f472b6", "#ec4899", "#9d174d", "#831843"]),
    ("rose", ["#fb7185", "#f43f5e", "#9f1239", "#881337"]),
];

const SHADES: [&str; 4] = ["400", "500", "800", "900"];

/// Builds the site stylesheet: the optional SCSS entry, base rules, then one
/// rule per recognized utility class.
pub fn generate_stylesheet(
    class_names: &[String],
    config: &SiteConfig,
    input_dir: &Path,
) -> Result<String> {
    let mut css = String::new();

    if let Some(entry) = &config.stylesheet {
        let path = input_dir.join(entry);
        let compiled = grass::from_path(&path, &grass::Options::default()).map_err(|error| {
            FolioError::Stylesheet {
                message: format!("{}: {}", path.display(), error),
            }
        })?;
        css.push_str(&compiled);
        css.push('\n');
    }

    css.push_str(BASE_CSS);
    css.push_str(&utility_rules(class_names));

    if config.minify {
        css = minify_css(&css).map_err(|message| FolioError::Stylesheet { message })?;
    }

    Ok(css)
}

pub fn minify_css(css: &str) -> std::result::Result<String, String> {
    use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|error| format!("CSS parse error: {}", error))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|error| format!("CSS minify error: {}", error))?;

    Ok(minified.code)
}

fn utility_rules(class_names: &[String]) -> String {
    let mut sorted: Vec<&String> = class_names.iter().collect();
    sorted.sort();
    sorted.dedup();

    let mut plain = String::new();
    let mut hover = String::new();
    let mut medium = String::new();

    for class_name in sorted {
        let (variants, utility) = split_variants(class_name);
        let Some(declarations) = declarations(utility) else {
            tracing::debug!("No utility rule for class '{}'", class_name);
            continue;
        };

        let mut selector = format!(".{}", escape_class(class_name));
        let is_hover = variants.contains(&"hover");
        if is_hover {
            selector.push_str(":hover");
        }
        let rule = format!("{}{{{}}}\n", selector, declarations);

        if variants.contains(&"md") {
            medium.push_str(&rule);
        } else if is_hover {
            hover.push_str(&rule);
        } else {
            plain.push_str(&rule);
        }
    }

    let mut css = plain;
    css.push_str(&hover);
    if !medium.is_empty() {
        let _ = write!(css, "@media (min-width: {}){{\n{}}}\n", MEDIUM_BREAKPOINT, medium);
    }
    css
}

fn split_variants(class_name: &str) -> (Vec<&str>, &str) {
    let mut parts: Vec<&str> = class_name.split(':').collect();
    let utility = parts.pop().unwrap_or(class_name);
    (parts, utility)
}

fn escape_class(class_name: &str) -> String {
    let mut escaped = String::with_capacity(class_name.len());
    for character in class_name.chars() {
        if matches!(character, ':' | '.' | '/' | '[' | ']' | '%') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

/// Spacing scale: `n` quarter-rems, allowing `.5` steps.
fn spacing(value: &str) -> Option<String> {
    if value == "0" {
        return Some("0px".to_string());
    }
    if value == "px" {
        return Some("1px".to_string());
    }
    let number: f64 = value.parse().ok()?;
    if !(0.0..=96.0).contains(&number) || (number * 2.0).fract() != 0.0 {
        return None;
    }
    Some(format!("{}rem", number * 0.25))
}

fn color(name: &str) -> Option<&'static str> {
    match name {
        "white" => return Some("#ffffff"),
        "black" => return Some("#000000"),
        "transparent" => return Some("transparent"),
        _ => {}
    }
    let (family, shade) = name.rsplit_once('-')?;
    let (_, shades) = PALETTE.iter().find(|(palette, _)| *palette == family)?;
    let index = SHADES.iter().position(|candidate| *candidate == shade)?;
    Some(shades[index])
}

fn declarations(utility: &str) -> Option<String> {
    let fixed = match utility {
        "flex" => Some("display:flex"),
        "block" => Some("display:block"),
        "inline-block" => Some("display:inline-block"),
        "hidden" => Some("display:none"),
        "flex-col" => Some("flex-direction:column"),
        "flex-row" => Some("flex-direction:row"),
        "flex-wrap" => Some("flex-wrap:wrap"),
        "items-center" => Some("align-items:center"),
        "items-start" => Some("align-items:flex-start"),
        "justify-center" => Some("justify-content:center"),
        "justify-between" => Some("justify-content:space-between"),
        "shrink-0" => Some("flex-shrink:0"),
        "mx-auto" => Some("margin-left:auto;margin-right:auto"),
        "text-center" => Some("text-align:center"),
        "text-left" => Some("text-align:left"),
        "text-right" => Some("text-align:right"),
        "text-xs" => Some("font-size:0.75rem;line-height:1rem"),
        "text-sm" => Some("font-size:0.875rem;line-height:1.25rem"),
        "text-base" => Some("font-size:1rem;line-height:1.5rem"),
        "text-lg" => Some("font-size:1.125rem;line-height:1.75rem"),
        "text-xl" => Some("font-size:1.25rem;line-height:1.75rem"),
        "text-2xl" => Some("font-size:1.5rem;line-height:2rem"),
        "text-3xl" => Some("font-size:1.875rem;line-height:2.25rem"),
        "text-4xl" => Some("font-size:2.25rem;line-height:2.5rem"),
        "font-medium" => Some("font-weight:500"),
        "font-semibold" => Some("font-weight:600"),
        "font-bold" => Some("font-weight:700"),
        "rounded" => Some("border-radius:0.25rem"),
        "rounded-md" => Some("border-radius:0.375rem"),
        "rounded-lg" => Some("border-radius:0.5rem"),
        "rounded-full" => Some("border-radius:9999px"),
        "max-w-screen-sm" => Some("max-width:640px"),
        "max-w-screen-md" => Some("max-width:768px"),
        "max-w-screen-lg" => Some("max-width:1024px"),
        "max-w-screen-xl" => Some("max-width:1280px"),
        "w-full" => Some("width:100%"),
        "h-full" => Some("height:100%"),
        "bg-clip-text" => Some("-webkit-background-clip:text;background-clip:text"),
        "bg-gradient-to-r" => Some(
            "background-image:linear-gradient(to right,var(--folio-gradient-from,transparent),var(--folio-gradient-to,transparent))",
        ),
        "bg-gradient-to-br" => Some(
            "background-image:linear-gradient(to bottom right,var(--folio-gradient-from,transparent),var(--folio-gradient-to,transparent))",
        ),
        _ => None,
    };
    if let Some(fixed) = fixed {
        return Some(fixed.to_string());
    }

    if let Some(value) = utility.strip_prefix("translate-y-") {
        return spacing(value).map(|length| format!("transform:translateY({})", length));
    }
    if let Some(value) = utility.strip_prefix("leading-") {
        return spacing(value).map(|length| format!("line-height:{}", length));
    }
    if let Some(value) = utility.strip_prefix("from-") {
        return color(value).map(|hex| format!("--folio-gradient-from:{}", hex));
    }
    if let Some(value) = utility.strip_prefix("to-") {
        return color(value).map(|hex| format!("--folio-gradient-to:{}", hex));
    }
    if let Some(value) = utility.strip_prefix("bg-") {
        return color(value).map(|hex| format!("background-color:{}", hex));
    }
    if let Some(value) = utility.strip_prefix("text-") {
        return color(value).map(|hex| format!("color:{}", hex));
    }

    let (prefix, value) = utility.split_once('-')?;
    let properties: &[&str] = match prefix {
        "p" => &["padding"],
        "px" => &["padding-left", "padding-right"],
        "py" => &["padding-top", "padding-bottom"],
        "pt" => &["padding-top"],
        "pb" => &["padding-bottom"],
        "pl" => &["padding-left"],
        "pr" => &["padding-right"],
        "m" => &["margin"],
        "mx" => &["margin-left", "margin-right"],
        "my" => &["margin-top", "margin-bottom"],
        "mt" => &["margin-top"],
        "mb" => &["margin-bottom"],
        "ml" => &["margin-left"],
        "mr" => &["margin-right"],
        "w" => &["width"],
        "h" => &["height"],
        "gap" => match value.split_once('-') {
            Some(("x", _)) => &["column-gap"],
            Some(("y", _)) => &["row-gap"],
            _ => &["gap"],
        },
        _ => return None,
    };
    let value = match (prefix, value.split_once('-')) {
        ("gap", Some(("x" | "y", rest))) => rest,
        _ => value,
    };
    let length = spacing(value)?;
    Some(
        properties
            .iter()
            .map(|property| format!("{}:{}", property, length))
            .collect::<Vec<_>>()
            .join(";"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_spacing_utilities() {
        assert_eq!(declarations("px-3").unwrap(), "padding-left:0.75rem;padding-right:0.75rem");
        assert_eq!(declarations("gap-x-24").unwrap(), "column-gap:6rem");
        assert_eq!(declarations("gap-6").unwrap(), "gap:1.5rem");
        assert_eq!(declarations("h-80").unwrap(), "height:20rem");
        assert_eq!(declarations("mt-0.5").unwrap(), "margin-top:0.125rem");
        assert!(declarations("px-huge").is_none());
    }

    #[test]
    fn test_palette_utilities() {
        assert_eq!(declarations("bg-fuchsia-400").unwrap(), "background-color:#e879f9");
        assert_eq!(declarations("text-blue-900").unwrap(), "color:#1e3a8a");
        assert_eq!(declarations("from-sky-500").unwrap(), "--folio-gradient-from:#0ea5e9");
        assert_eq!(declarations("text-transparent").unwrap(), "color:transparent");
        assert!(declarations("bg-chartreuse-400").is_none());
    }

    #[test]
    fn test_every_tag_color_has_badge_rules() {
        for tag_color in crate::content::TagColor::ALL {
            let name = tag_color.name();
            assert!(declarations(&format!("bg-{name}-400")).is_some(), "{name}");
            assert!(declarations(&format!("text-{name}-900")).is_some(), "{name}");
        }
    }

    #[test]
    fn test_variants() {
        let css = utility_rules(&classes(&["md:flex-row", "hover:translate-y-1", "flex", "unknown-thing"]));
        assert!(css.starts_with(".flex{display:flex}\n"));
        assert!(css.contains(".hover\\:translate-y-1:hover{transform:translateY(0.25rem)}"));
        assert!(css.contains("@media (min-width: 768px){\n.md\\:flex-row{flex-direction:row}\n}"));
        assert!(!css.contains("unknown-thing"));
    }

    #[test]
    fn test_generate_and_minify() {
        let temp = TempDir::new().unwrap();
        let mut config = SiteConfig::new("https://example.com/").unwrap();
        config.minify = true;
        let css = generate_stylesheet(&classes(&["flex", "text-center"]), &config, temp.path()).unwrap();
        assert!(css.contains(".flex{display:flex}"));
        assert!(!css.contains('\n'));
    }

    #[test]
    fn test_scss_entry_is_compiled_first() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("site.scss"), "$accent: #22d3ee;\n.accent { color: $accent; }\n").unwrap();
        let mut config = SiteConfig::new("https://example.com/").unwrap();
        config.stylesheet = Some("site.scss".into());
        let css = generate_stylesheet(&classes(&[]), &config, temp.path()).unwrap();
        assert!(css.starts_with(".accent {"));
        assert!(css.contains("#22d3ee"));
    }

    #[test]
    fn test_missing_scss_entry() {
        let temp = TempDir::new().unwrap();
        let mut config = SiteConfig::new("https://example.com/").unwrap();
        config.stylesheet = Some("missing.scss".into());
        let error = generate_stylesheet(&classes(&[]), &config, temp.path()).unwrap_err();
        assert!(matches!(error, FolioError::Stylesheet { .. }));
    }
}
