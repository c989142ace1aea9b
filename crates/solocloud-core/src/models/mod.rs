pub mod media;
pub mod share;

pub use media::{FileCategory, StoredObject};
pub use share::{ShareDenial, ShareLink, ShareLinkState, ShareLinkView};
