pub mod compress;
pub mod filename;
pub mod progress;

pub use compress::{create_output, is_gzip_path, open_input};
pub use filename::generate_default_output_filename;
pub use progress::ProgressReporter;
