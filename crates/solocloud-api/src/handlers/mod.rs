pub mod files;
pub mod health;
pub mod shares;
pub mod storage;
