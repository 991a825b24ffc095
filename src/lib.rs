pub mod combiner;
pub mod config;
pub mod correspondence;
pub mod domain;
pub mod error;
pub mod input;
pub mod output;
pub mod scorer;
pub mod text;
