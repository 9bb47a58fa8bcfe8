pub mod config;
pub mod error;
pub mod hwpx;
pub mod ir;
pub mod progress;
pub mod records;
pub mod textutil;
