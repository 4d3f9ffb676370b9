use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ManifestError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("manifest must be a mapping")]
    NotAMapping,

    #[error("manifest field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("repository has no clone URL")]
    MissingSourceUrl,
}

impl ManifestError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ManifestError::Syntax {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
