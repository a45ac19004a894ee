//! LaTeX assembly, compilation and rasterizing

pub mod builder;
pub mod fake;
pub mod latex;
pub mod raster;
pub mod template;

pub use builder::{LayoutSettings, ResumeBuilder};
pub use latex::{LatexTypesetter, RenderedDocument, Typesetter};
pub use template::{Template, TemplateStore};
