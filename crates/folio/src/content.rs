use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A declared route and the partials it is assembled from, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lastmod: Option<String>,
    #[serde(default = "default_in_sitemap")]
    pub sitemap: bool,
    #[serde(default)]
    pub partials: Vec<PartialSpec>,
}

fn default_in_sitemap() -> bool {
    true
}

impl Page {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
            description: None,
            lastmod: None,
            sitemap: true,
            partials: Vec::new(),
        }
    }

    pub fn with_partial(mut self, partial: PartialSpec) -> Self {
        self.partials.push(partial);
        self
    }
}

/// Reference to a registered partial by name, with the props passed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialSpec {
    pub name: String,
    #[serde(default)]
    pub props: Props,
}

impl PartialSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Props::default(),
        }
    }

    pub fn prop(mut self, key: &str, value: Value) -> Self {
        self.props.raw.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Props {
    #[serde(flatten)]
    pub raw: HashMap<String, Value>,
}

impl Props {
    pub fn contains(&self, key: &str) -> bool {
        self.raw.get(key).is_some_and(|value| !value.is_null())
    }
}

/// A local or remote image with fallback alt text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

impl ImageRef {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        let lower = self.src.to_ascii_lowercase();
        lower.starts_with("http://")
            || lower.starts_with("https://")
            || lower.starts_with("//")
            || lower.starts_with("data:")
    }

    /// Asset store key: the source path without its leading separator.
    pub fn key(&self) -> &str {
        self.src.trim_start_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    pub image: ImageRef,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Project {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.link.trim().is_empty() {
            return Err("link must not be empty".to_string());
        }
        let parsed = url::Url::parse(&self.link)
            .map_err(|error| format!("link '{}' is not an absolute URL: {}", self.link, error))?;
        if parsed.cannot_be_a_base() {
            return Err(format!("link '{}' is not an absolute URL", self.link));
        }
        if self.image.src.trim().is_empty() {
            return Err("image src must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    #[serde(default)]
    pub color: TagColor,
}

/// Fixed palette for tag badges. Presentational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagColor {
    Slate,
    #[default]
    Gray,
    Zinc,
    Neutral,
    Stone,
    Red,
    Orange,
    Amber,
    Yellow,
    Lime,
    Green,
    Emerald,
    Teal,
    Cyan,
    Sky,
    Blue,
    Indigo,
    Violet,
    Purple,
    Fuchsia,
    Pink,
    Rose,
}

impl TagColor {
    pub const ALL: [TagColor; 22] = [
        TagColor::Slate,
        TagColor::Gray,
        TagColor::Zinc,
        TagColor::Neutral,
        TagColor::Stone,
        TagColor::Red,
        TagColor::Orange,
        TagColor::Amber,
        TagColor::Yellow,
        TagColor::Lime,
        TagColor::Green,
        TagColor::Emerald,
        TagColor::Teal,
        TagColor::Cyan,
        TagColor::Sky,
        TagColor::Blue,
        TagColor::Indigo,
        TagColor::Violet,
        TagColor::Purple,
        TagColor::Fuchsia,
        TagColor::Pink,
        TagColor::Rose,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TagColor::Slate => "slate",
            TagColor::Gray => "gray",
            TagColor::Zinc => "zinc",
            TagColor::Neutral => "neutral",
            TagColor::Stone => "stone",
            TagColor::Red => "red",
            TagColor::Orange => "orange",
            TagColor::Amber => "amber",
            TagColor::Yellow => "yellow",
            TagColor::Lime => "lime",
            TagColor::Green => "green",
            TagColor::Emerald => "emerald",
            TagColor::Teal => "teal",
            TagColor::Cyan => "cyan",
            TagColor::Sky => "sky",
            TagColor::Blue => "blue",
            TagColor::Indigo => "indigo",
            TagColor::Violet => "violet",
            TagColor::Purple => "purple",
            TagColor::Fuchsia => "fuchsia",
            TagColor::Pink => "pink",
            TagColor::Rose => "rose",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|color| color.name() == name)
    }
}

impl fmt::Display for TagColor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(link: &str) -> Project {
        Project {
            name: "AI Research Assistant".to_string(),
            description: "Query papers".to_string(),
            link: link.to_string(),
            image: ImageRef::new("/assets/images/project-fire.png", "AI Research Assistant"),
            tags: vec![],
        }
    }

    #[test]
    fn test_project_requires_link() {
        assert!(project("").validate().is_err());
        assert!(project("   ").validate().is_err());
        assert!(project("not a url").validate().is_err());
        assert!(project("https://research-copilot.example/").validate().is_ok());
    }

    #[test]
    fn test_tag_color_names_round_trip() {
        for color in TagColor::ALL {
            assert_eq!(TagColor::from_name(color.name()), Some(color));
        }
        assert_eq!(TagColor::from_name("chartreuse"), None);
    }

    #[test]
    fn test_tag_deserialize() {
        let tag: Tag = serde_json::from_value(json!({"label": "Next.js", "color": "blue"})).unwrap();
        assert_eq!(tag.color, TagColor::Blue);
    }

    #[test]
    fn test_image_ref_key_and_remote() {
        let local = ImageRef::new("/assets/images/avatar.svg", "Avatar");
        assert_eq!(local.key(), "assets/images/avatar.svg");
        assert!(!local.is_remote());
        assert!(ImageRef::new("https://cdn.example.com/a.png", "").is_remote());
    }

    #[test]
    fn test_props_contains_ignores_null() {
        let spec = PartialSpec::new("Footer")
            .prop("text", json!("hi"))
            .prop("empty", Value::Null);
        assert!(spec.props.contains("text"));
        assert!(!spec.props.contains("empty"));
        assert!(!spec.props.contains("missing"));
    }
}
