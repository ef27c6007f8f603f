pub mod convert;
pub mod download;
pub mod image_processor;
pub mod metadata;
pub mod progress;
pub mod storage;
pub mod upload;
