//! Share links

mod manager;
mod token;

pub use manager::{ShareLinkManager, ShareResolution};
pub use token::generate_token;
