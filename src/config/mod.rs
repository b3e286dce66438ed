pub mod builder;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod settings;

pub use builder::{build_configuration, build_configuration_from};
pub use descriptor::{Configuration, NamedServer, ServerDescriptor, StreamTransport};
pub use env::{EnvSource, ProcessEnv, ensure_env_loaded, load_env_file};
pub use error::ConfigError;
pub use settings::AppSettings;
