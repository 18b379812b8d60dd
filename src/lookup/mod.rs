pub mod api;
pub mod merge;
pub mod resolver;

pub use api::{BookCandidate, HttpBookSource};
pub use resolver::{BookFinder, BookSource, FindOutcome};
