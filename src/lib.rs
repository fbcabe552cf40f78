pub mod cli;
pub mod commands;
pub mod cpu;
pub mod error;
pub mod heap;
pub mod jdk;
pub mod process;

pub use error::{Error, Result};
