//! SoloCloud services layer
//!
//! Business logic that sits between the HTTP handlers and the catalog: share-link
//! issuance, resolution and revocation. Keep thin request handling in solocloud-api.

pub mod share;

pub use share::{generate_token, ShareLinkManager, ShareResolution};
