pub mod generated;
pub mod grammar;
pub mod haproxy;
pub mod regex_error;

pub use generated::HAPROXY_HTTP;
pub use grammar::Grammar;
pub use haproxy::{HaproxyParser, ParseOutcome, ParsedLine};
pub use regex_error::RegexError;
