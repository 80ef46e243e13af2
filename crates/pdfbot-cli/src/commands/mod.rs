pub mod compare;
pub mod config;
pub mod watermark;

mod retriever;
