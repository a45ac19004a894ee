//! Loading resume and job description files as text

pub mod file_detector;
pub mod loader;
pub mod text_extractor;

pub use file_detector::FileType;
pub use loader::InputLoader;
