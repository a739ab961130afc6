pub mod config;
pub mod content;
pub mod error;
pub mod generators;
pub mod images;
pub mod markdown;
pub mod math;
pub mod output;
pub mod partials;
pub mod robots;
pub mod routing;
pub mod site;
pub mod sitemap;
pub mod styles;
pub mod theme;
pub mod tree;
pub mod widgets;
pub mod xml;

pub use config::{CONFIG_FILE_NAME, SiteConfig, SiteManifest};
pub use content::{ImageRef, Page, PartialSpec, Project, Props, Tag, TagColor};
pub use error::{ErrorKind, FolioError, Result};
pub use generators::{GeneratorKind, run_generators};
pub use images::{AssetStore, DirectoryAssetStore, ImageConfig, MemoryAssetStore};
pub use markdown::{MarkdownPipeline, TextTransform, TreeTransform};
pub use output::{BuildOutput, OutputFile};
pub use partials::{PartialKind, PartialRegistry, compose_page};
pub use robots::{RobotsConfig, RobotsPolicy};
pub use routing::{RouteEntry, RouteTable, TrailingSlash, canonical_url, normalize};
pub use site::{Site, SiteBuilder};
pub use theme::ThemeEngine;
pub use tree::{Element, Node, RenderedTree};
