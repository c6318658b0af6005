pub mod history;
pub mod paths;

pub use history::HistoryStore;
pub use paths::{config_dir, config_file, ensure_dirs, history_dir};
