//! Image thumbnails

mod thumbnail;

pub use thumbnail::{encode_thumbnail, fit_within, select_filter, ImageThumbnailer};
