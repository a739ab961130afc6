use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {action} {path}: {source}")]
    IoAt {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Unknown {chain} extension '{name}'")]
    UnknownExtension { chain: &'static str, name: String },

    #[error("Unknown artifact generator '{name}'")]
    UnknownGenerator { name: String },

    #[error("Duplicate route '{route}': declared by '{path}' and '{existing_path}'")]
    DuplicateRoute {
        route: String,
        path: String,
        existing_path: String,
    },

    #[error("Page '{page}' references unregistered partial '{partial}'")]
    UnknownPartial { page: String, partial: String },

    #[error("Partial '{partial}' on page '{page}' is missing required prop '{prop}'")]
    MissingProp {
        page: String,
        partial: String,
        prop: String,
    },

    #[error("Partial '{partial}' on page '{page}' has invalid props: {message}")]
    InvalidProp {
        page: String,
        partial: String,
        message: String,
    },

    #[error("Invalid project '{name}' on page '{page}': {message}")]
    InvalidProject {
        page: String,
        name: String,
        message: String,
    },

    #[error("Transform '{transform}' failed on {document}: {message}")]
    Transform {
        document: String,
        transform: String,
        message: String,
    },

    #[error("Image asset not found: {key}")]
    AssetNotFound { key: String },

    #[error("Image processing error for {key}: {message}")]
    ImageProcessing { key: String, message: String },

    #[error("Stylesheet error: {message}")]
    Stylesheet { message: String },

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

/// Coarse classification used by callers that only care which build phase failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Composition,
    Transform,
    AssetResolution,
    Io,
}

impl FolioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FolioError::Io(_) | FolioError::IoAt { .. } => ErrorKind::Io,
            FolioError::TomlParse { .. }
            | FolioError::ConfigNotFound { .. }
            | FolioError::Config { .. }
            | FolioError::InvalidBaseUrl { .. }
            | FolioError::UnknownExtension { .. }
            | FolioError::UnknownGenerator { .. }
            | FolioError::DuplicateRoute { .. } => ErrorKind::Configuration,
            FolioError::UnknownPartial { .. }
            | FolioError::MissingProp { .. }
            | FolioError::InvalidProp { .. }
            | FolioError::InvalidProject { .. } => ErrorKind::Composition,
            FolioError::Transform { .. }
            | FolioError::Stylesheet { .. }
            | FolioError::Template(_) => ErrorKind::Transform,
            FolioError::AssetNotFound { .. } | FolioError::ImageProcessing { .. } => {
                ErrorKind::AssetResolution
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;

pub trait IoContext<T> {
    fn io_context(self, action: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, action: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| FolioError::IoAt {
            action,
            path: path.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let error = FolioError::UnknownPartial {
            page: "/".to_string(),
            partial: "Nope".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Composition);

        let error = FolioError::AssetNotFound {
            key: "images/missing.png".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::AssetResolution);
        assert!(error.to_string().contains("images/missing.png"));

        let error = FolioError::DuplicateRoute {
            route: "/about/".to_string(),
            path: "/about".to_string(),
            existing_path: "/about/".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_io_context_names_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let error = result.io_context("reading", "folio.toml").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("reading"));
        assert!(message.contains("folio.toml"));
        assert_eq!(error.kind(), ErrorKind::Io);
    }
}
