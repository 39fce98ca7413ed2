pub mod config;
pub mod decode;
pub mod embed;
pub mod error;
pub mod matcher;
pub mod session;
pub mod tensor;

// Re-export commonly used types
pub use config::Config;
pub use embed::Embedding;
pub use error::FaceMatchError;
pub use matcher::{compare_faces, ComparisonResult, FaceMatcher};
pub use tensor::{ColorOrder, TensorLayout};
