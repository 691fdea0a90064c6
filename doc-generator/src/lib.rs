pub mod cli;
pub mod config;
pub mod driver;
pub mod logging;
pub mod plugin;
pub mod render;

pub use config::{ConfigError, PluginConfig, TemplateSource};
pub use driver::{DocGenerator, GenerateError, OutputFile, Phase};
pub use plugin::generate_response;
pub use render::{RenderError, ScalarValueType, render};
