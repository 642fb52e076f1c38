// Reports module - export formats for calculation results

pub mod export;

pub use export::{default_export_file_name, to_csv, write_csv};
