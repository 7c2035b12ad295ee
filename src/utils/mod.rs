pub mod environment;
pub mod paths;
pub mod terminal;

pub use environment::{DATA_DIR_ENV, get_data_dir};
pub use paths::{encode_entry_component, format_path_with_tilde};
pub use terminal::{sanitize_line, strip_ansi_codes};
