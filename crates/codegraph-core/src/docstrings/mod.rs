//! Docstring extraction and lookup.
//!
//! - [`extract_from_file`] / [`extract_from_directory`] build the
//!   `{path: {function: docstring}}` map
//! - [`find_docstring`] and [`resolve`] look a function up across that map
//! - [`DocstringSections`] splits a Google-style docstring into parts

mod extract;
mod search;
mod sections;

pub use extract::{
    docstrings_from_source, extract_from_directory, extract_from_directory_with, extract_from_file,
    try_extract_from_file, DirectoryDocstrings, ExtractError, FunctionDocstrings,
};
pub use search::{
    find_docstring, is_not_found_message, not_found_message, resolve, AmbiguousName, DocstringMatch,
    Resolution, ResolutionStrategy,
};
pub use sections::DocstringSections;
