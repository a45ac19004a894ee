//! Resume tailoring stages

pub mod analyzer;
pub mod coverage;
pub mod document;
pub mod feedback;
pub mod grounding;
pub mod parser;
pub mod ranker;

pub use analyzer::JobAnalyzer;
pub use feedback::{FeedbackOutcome, FeedbackResult, VisualFeedbackLoop};
pub use parser::ResumeParser;
pub use ranker::{ContentRanker, RankerSettings};
