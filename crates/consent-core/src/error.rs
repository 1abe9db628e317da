use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsentError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read upload: {0}")]
    Read(String),

    #[error("Could not decode image: {0}")]
    InvalidImage(String),

    #[error("Failed to load form template: {0}")]
    TemplateLoad(String),

    #[error("Failed to assemble document: {0}")]
    Packaging(String),
}
