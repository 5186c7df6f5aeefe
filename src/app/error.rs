// error.rs

pub type ConverterResult<T> = Result<T, ConverterError>;

/// Everything that can go wrong between picking a file and saving the result.
///
/// `Display` is the message shown to the user; the payload carries the
/// underlying cause for the log.
#[derive(Debug, thiserror::Error)]
pub enum ConverterError {
    #[error("Please upload a WEBP image.")]
    InvalidInputType { mime: String },

    #[error("Please select a file first.")]
    NoFileSelected,

    /// The raster surface for the scaled image could not be set up or encoded.
    #[error("Could not process the image.")]
    EncodeContextUnavailable(String),

    #[error("Could not load the image for conversion.")]
    DecodeFailure(String),

    #[error("Could not read the selected file.")]
    ReadFailure(#[source] std::io::Error),

    #[error("Could not save the converted image.")]
    SaveFailure(#[source] std::io::Error),
}

impl ConverterError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn encode_context(msg: impl Into<String>) -> Self {
        Self::EncodeContextUnavailable(msg.into())
    }

    /// Cause of the error, for the conversion log.
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidInputType { mime } => format!("declared type {}", mime),
            Self::NoFileSelected => "no file loaded".to_string(),
            Self::EncodeContextUnavailable(reason) | Self::DecodeFailure(reason) => reason.clone(),
            Self::ReadFailure(err) | Self::SaveFailure(err) => err.to_string(),
        }
    }
}
