pub mod buffer;
pub mod client_options;
pub mod config;
pub mod escape;
pub mod exec;
pub mod format;
pub mod fuzz_helper;
pub mod quote;
pub mod resolve;
pub mod scan;
pub mod session;
pub mod template;

pub use buffer::StatementBuffer;
pub use format::{Arg, FormatError, format, format_into};
pub use resolve::{MapSource, ProcessSource, VariableSource};
pub use template::{ExpandError, Expander};

/// Expands [template] against the process environment, files and stdin.
pub fn expand(template: &str) -> Result<String, ExpandError> {
    Expander::new(ProcessSource::new()).expand(template)
}
