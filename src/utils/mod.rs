pub mod paths;
pub mod text;

pub use paths::{data_dir, embedding_cache_dir, memory_db_path, user_env_file};
pub use text::{normalize, sanitize_input, validate_input};
