pub mod json_body;

pub use json_body::{JsonBodyLimit, ParsedJson, parse_json_body};
