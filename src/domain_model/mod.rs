mod pair;
mod user;

pub use pair::*;
pub use user::*;
