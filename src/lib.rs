pub mod app;
pub mod command;
pub mod host;
pub mod output;
pub mod range_mapper;
pub mod settings;
pub mod spindle;
