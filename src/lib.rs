#[macro_use]
extern crate log;

pub mod checker;
pub mod cli;
pub mod cmdline;
pub mod domains;
pub mod env;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod ports;
pub mod probe;
pub mod procs;
pub mod resolver;
pub mod servers;
pub mod spawn;
pub mod state;
pub mod web;

pub use miette::Result;
