pub use self::config::Config;

mod config;

pub mod logging;
