//! [`StaticExtractor`](crate::domain::ports::StaticExtractor) implementations.

pub mod regex_extractor;

pub use regex_extractor::RegexExtractor;
