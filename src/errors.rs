use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevframeError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing image, empty name, zero-area region. Recoverable by the user.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Persistence(String),

    /// Degenerate spans or sizes handed to the geometry helpers.
    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("An export is already running")]
    ExportInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl serde::Serialize for DevframeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type DevframeResult<T> = Result<T, DevframeError>;
