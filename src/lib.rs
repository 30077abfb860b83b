pub mod bmp;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod extract;
pub mod font;
pub mod image;
pub mod ranges;
pub mod resource;

pub use crate::error::Error;

#[cfg(feature = "cli")]
pub mod logging {
    use env_logger::Env;
    use log::LevelFilter;

    pub fn initialize_logger(filter: LevelFilter) {
        env_logger::Builder::from_env(Env::default().default_filter_or(filter.as_str()))
            .format_target(false)
            .init();
    }
}
