pub mod answers;
pub mod collections;
pub mod files;
pub mod health;
pub mod sessions;
pub mod stream;
