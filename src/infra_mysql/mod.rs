mod refresh_token_repo_mysql;
mod util;

pub use refresh_token_repo_mysql::*;
pub use util::*;
