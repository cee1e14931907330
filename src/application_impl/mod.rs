mod secret_hasher_impl;
mod token_codec_impl;
mod token_service_impl;

pub use secret_hasher_impl::*;
pub use token_codec_impl::*;
pub use token_service_impl::*;
