pub mod config;
pub mod limits;
pub mod text;
pub mod types;

pub use config::Config;
pub use limits::*;
pub use text::*;
pub use types::*;
