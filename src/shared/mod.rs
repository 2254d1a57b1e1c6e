//! Serializable types shared by the library and the CLI

pub mod config;
