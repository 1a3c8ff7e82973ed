pub mod aggregator;
pub mod renderer;
pub mod report_writer;
pub mod source_files;

pub use aggregator::{build_report, generate_validation_report};
pub use renderer::render_markdown;
pub use report_writer::save_validation_report;
pub use source_files::collect_source_files;
