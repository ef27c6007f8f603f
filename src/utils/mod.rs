pub mod keys;
pub mod mime;
