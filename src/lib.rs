pub mod commands;
pub mod config;
pub mod errors;
pub mod media;
pub mod presentation;
pub mod security;
pub mod uploader;
