mod refresh_token_repo_memory;

pub use refresh_token_repo_memory::*;
