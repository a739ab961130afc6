use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::content::ImageRef;
use crate::error::{FolioError, IoContext, Result};
use crate::output::OutputFile;
use crate::tree::{Element, ImageNode, Node, RenderedTree};

pub const IMAGES_DIR: &str = "_images";

const SUPPORTED_FORMATS: &[&str] = &["webp", "jpg", "jpeg", "png"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_widths")]
    pub widths: Vec<u32>,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_widths() -> Vec<u32> {
    vec![320, 640, 1024, 1920]
}

fn default_quality() -> u8 {
    80
}

fn default_formats() -> Vec<String> {
    vec!["webp".to_string(), "jpg".to_string()]
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            widths: default_widths(),
            quality: default_quality(),
            formats: default_formats(),
        }
    }
}

impl ImageConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.widths.is_empty() {
            return Err("images.widths must not be empty".to_string());
        }
        if self.widths.contains(&0) {
            return Err("images.widths must be greater than zero".to_string());
        }
        if !(1..=100).contains(&self.quality) {
            return Err(format!(
                "images.quality must be between 1 and 100, got {}",
                self.quality
            ));
        }
        if self.formats.is_empty() {
            return Err("images.formats must not be empty".to_string());
        }
        for format in &self.formats {
            if !SUPPORTED_FORMATS.contains(&format.as_str()) {
                return Err(format!("unsupported image format '{}'", format));
            }
        }
        Ok(())
    }
}

/// Source of image bytes, keyed by the reference path without its leading `/`.
pub trait AssetStore: Sync {
    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Assets under a directory on disk, usually `public/`.
pub struct DirectoryAssetStore {
    root: PathBuf,
}

impl DirectoryAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for DirectoryAssetStore {
    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Ok(None);
        }
        let path = self.root.join(relative);
        if !path.is_file() {
            return Ok(None);
        }
        fs::read(&path).io_context("reading image", &path).map(Some)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(key.into(), bytes);
    }
}

impl AssetStore for MemoryAssetStore {
    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.assets.get(key).cloned())
    }
}

#[derive(Debug, Clone)]
pub struct ImageVariant {
    /// Output-relative path, e.g. `_images/avatar-320w.1a2b3c4d.webp`.
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub key: String,
    /// Vector sources are copied once and never resized.
    pub vector: bool,
    pub variants: Vec<ImageVariant>,
}

impl OptimizedImage {
    /// Largest width in the last configured format.
    pub fn fallback(&self) -> Option<&ImageVariant> {
        let format = self.variants.last()?.format.as_str();
        self.variants
            .iter()
            .filter(|variant| variant.format == format)
            .max_by_key(|variant| variant.width)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageManifest {
    images: HashMap<String, OptimizedImage>,
}

impl ImageManifest {
    pub fn get(&self, key: &str) -> Option<&OptimizedImage> {
        self.images.get(key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Replaces every local image in `tree` with its optimized markup.
    pub fn rewrite(&self, tree: &mut RenderedTree, base_path: &str) {
        tree.rewrite_images(|node| match self.get(node.image.key()) {
            Some(optimized) => picture_node(node, optimized, base_path),
            None => Node::Image(node.clone()),
        });
    }

    /// Variant files sorted by path.
    pub fn into_files(self) -> Vec<OutputFile> {
        let mut files: Vec<OutputFile> = self
            .images
            .into_values()
            .flat_map(|image| image.variants)
            .map(|variant| OutputFile::new(variant.path, variant.bytes))
            .collect();
        files.sort_by(|left, right| left.path.cmp(&right.path));
        files.dedup_by(|left, right| left.path == right.path);
        files
    }
}

/// Resolves and optimizes every distinct local image. The first missing or
/// undecodable asset aborts the whole run.
pub fn optimize_images<'a>(
    references: impl IntoIterator<Item = &'a ImageRef>,
    store: &dyn AssetStore,
    config: &ImageConfig,
) -> Result<ImageManifest> {
    let mut seen = HashSet::new();
    let keys: Vec<String> = references
        .into_iter()
        .filter(|reference| !reference.is_remote())
        .map(|reference| reference.key().to_string())
        .filter(|key| seen.insert(key.clone()))
        .collect();

    let optimized = keys
        .par_iter()
        .map(|key| optimize_image(key, store, config))
        .collect::<Result<Vec<_>>>()?;

    Ok(ImageManifest {
        images: optimized
            .into_iter()
            .map(|image| (image.key.clone(), image))
            .collect(),
    })
}

fn optimize_image(key: &str, store: &dyn AssetStore, config: &ImageConfig) -> Result<OptimizedImage> {
    let bytes = store.fetch(key)?.ok_or_else(|| FolioError::AssetNotFound {
        key: key.to_string(),
    })?;

    let path = Path::new(key);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("image");
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if extension == "svg" {
        let name = format!("{}.{}.svg", stem, short_hash(&bytes));
        tracing::debug!("Copied vector image {}", key);
        return Ok(OptimizedImage {
            key: key.to_string(),
            vector: true,
            variants: vec![ImageVariant {
                path: format!("{}/{}", IMAGES_DIR, name),
                width: 0,
                height: 0,
                format: "svg".to_string(),
                bytes,
            }],
        });
    }

    let processing_error = |message: String| FolioError::ImageProcessing {
        key: key.to_string(),
        message,
    };

    let source = image::load_from_memory(&bytes).map_err(|error| processing_error(error.to_string()))?;
    let original_width = source.width();
    let original_height = source.height();

    let mut variants = Vec::new();
    for target_width in target_widths(&config.widths, original_width) {
        let resized = if target_width == original_width {
            source.clone()
        } else {
            let scale_factor = target_width as f64 / original_width as f64;
            let target_height = ((original_height as f64 * scale_factor).round() as u32).max(1);
            source.resize_exact(target_width, target_height, FilterType::Lanczos3)
        };

        for format in &config.formats {
            let format = normalize_format(format);
            let encoded =
                encode(&resized, format, config.quality).map_err(processing_error)?;
            let name = format!(
                "{}-{}w.{}.{}",
                stem,
                target_width,
                short_hash(&encoded),
                format
            );
            variants.push(ImageVariant {
                path: format!("{}/{}", IMAGES_DIR, name),
                width: resized.width(),
                height: resized.height(),
                format: format.to_string(),
                bytes: encoded,
            });
        }
    }

    tracing::debug!("Optimized {} into {} variants", key, variants.len());

    Ok(OptimizedImage {
        key: key.to_string(),
        vector: false,
        variants,
    })
}

/// Configured widths that do not upscale; the source width when none fit.
fn target_widths(configured: &[u32], original_width: u32) -> Vec<u32> {
    let mut widths: Vec<u32> = configured
        .iter()
        .copied()
        .filter(|&width| width <= original_width)
        .collect();
    widths.sort_unstable();
    widths.dedup();
    if widths.is_empty() {
        widths.push(original_width);
    }
    widths
}

fn normalize_format(format: &str) -> &str {
    if format == "jpeg" { "jpg" } else { format }
}

fn encode(image: &DynamicImage, format: &str, quality: u8) -> std::result::Result<Vec<u8>, String> {
    match format {
        "webp" => {
            let rgba_image = image.to_rgba8();
            let encoder = webp::Encoder::from_rgba(rgba_image.as_raw(), image.width(), image.height());
            Ok(encoder.encode(quality as f32).to_vec())
        }
        "jpg" => {
            let mut buffer = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            let rgb_image = image.to_rgb8();
            encoder
                .write_image(
                    rgb_image.as_raw(),
                    image.width(),
                    image.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(|error| error.to_string())?;
            Ok(buffer)
        }
        "png" => {
            let mut buffer = Vec::new();
            let rgba_image = image.to_rgba8();
            PngEncoder::new(&mut buffer)
                .write_image(
                    rgba_image.as_raw(),
                    image.width(),
                    image.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|error| error.to_string())?;
            Ok(buffer)
        }
        other => Err(format!("unsupported image format '{}'", other)),
    }
}

fn short_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hash_hex = format!("{:x}", hasher.finalize());
    hash_hex[..8].to_string()
}

fn format_to_mime(format: &str) -> &'static str {
    match format {
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// `<picture>` with one `<source>` per format, falling back to an `<img>`
/// that points at the largest variant of the last format.
pub fn picture_node(node: &ImageNode, optimized: &OptimizedImage, base_path: &str) -> Node {
    let Some(fallback) = optimized.fallback() else {
        return Node::Image(node.clone());
    };

    let mut img = Element::new("img")
        .attr("src", format!("{}/{}", base_path, fallback.path))
        .attr("alt", node.image.alt.clone());
    if let Some(class) = &node.class {
        img = img.class(class.clone());
    }
    if !optimized.vector {
        img = img
            .attr("width", fallback.width.to_string())
            .attr("height", fallback.height.to_string());
    }
    if node.lazy {
        img = img.attr("loading", "lazy");
    }

    if optimized.vector {
        return img.into();
    }

    let mut formats_seen: Vec<&str> = Vec::new();
    for variant in &optimized.variants {
        if !formats_seen.contains(&variant.format.as_str()) {
            formats_seen.push(&variant.format);
        }
    }

    let mut picture = Element::new("picture");
    for format in formats_seen {
        let srcset: Vec<String> = optimized
            .variants
            .iter()
            .filter(|variant| variant.format == format)
            .map(|variant| format!("{}/{} {}w", base_path, variant.path, variant.width))
            .collect();
        picture = picture.child(
            Element::new("source")
                .attr("type", format_to_mime(format))
                .attr("srcset", srcset.join(", ")),
        );
    }
    picture.child(img).into()
}
