pub mod summary;

pub use summary::{format_summary, print_summary};
