mod args;
mod ask;
mod chat;
mod commands;
mod config_cmd;
mod models;
mod post;
mod util;

pub use args::Cli;
