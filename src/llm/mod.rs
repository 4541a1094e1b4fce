pub mod gemini;
pub mod media;
pub mod parser;
pub mod prompt;

pub use gemini::{AnalysisClient, AnalysisResult, AnalysisStatus};
pub use media::{ImageDecodeError, ImagePayload, UploadedImage};
