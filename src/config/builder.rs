use std::path::{Path, PathBuf};

use tracing::debug;

use super::env::EnvSource;
use super::environment::Environment;
use super::loader::{PklPropertySourceLoader, PropertySourceLoader, TomlPropertySourceLoader};
use super::resource::Resource;
use super::ConfigError;

/// A configuration source in the loading pipeline.
#[derive(Debug)]
enum ConfigSource {
    File { path: PathBuf, required: bool },
    Resource(Resource),
    Env { prefix: String, separator: String },
}

/// Builder assembling an [`Environment`] from configuration files, in-memory
/// resources and environment variables.
///
/// Sources are layered in registration order: a later source overrides an
/// earlier one for every path it declares. Each file is handed to the loader
/// registered for its extension; `.pkl` and `.pcf` modules are evaluated with
/// a `pkl server` process and `.toml` files are parsed directly.
///
/// ## Example
///
/// ```no_run
/// use pkl_props::Config;
///
/// let environment = Config::builder()
///     .with_file("config/defaults.toml", true)
///     .with_file("config/application.pkl", true)
///     .with_env("MYAPP", "__")
///     .build()?;
///
/// let port: u16 = environment.get_required_property_as("server.port")?;
/// # Ok::<(), pkl_props::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    sources: Vec<ConfigSource>,
    loaders: Vec<Box<dyn PropertySourceLoader>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            loaders: vec![
                Box::new(PklPropertySourceLoader::new()),
                Box::new(TomlPropertySourceLoader),
            ],
        }
    }
}

impl Config {
    /// Creates a builder with the default loaders registered.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a configuration file to be loaded.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.sources.push(ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds a resource that is not backed by a local file.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.sources.push(ConfigSource::Resource(resource));
        self
    }

    /// Adds environment variables with the given prefix as a property source.
    ///
    /// `MYAPP__DATABASE__HOST=localhost` with prefix `MYAPP` and separator `__`
    /// provides `database.host`. Values are coerced to the most specific
    /// scalar: integer, float, boolean, or string.
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.sources.push(ConfigSource::Env {
            prefix: prefix.into(),
            separator: separator.into(),
        });
        self
    }

    /// Registers a loader. It takes precedence over earlier loaders claiming
    /// the same extension.
    pub fn with_loader(mut self, loader: impl PropertySourceLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Loads every source in order. Nothing is returned if any source fails.
    pub fn build(self) -> Result<Environment, ConfigError> {
        let mut environment = Environment::new();

        for source in &self.sources {
            match source {
                ConfigSource::File { path, required } => {
                    match self.load_into(&mut environment, &Resource::file(path)) {
                        Err(ConfigError::FileNotFound(missing)) if !required => {
                            debug!(
                                path = %missing.display(),
                                "skipping missing optional config file"
                            );
                        }
                        result => result?,
                    }
                }
                ConfigSource::Resource(resource) => self.load_into(&mut environment, resource)?,
                ConfigSource::Env { prefix, separator } => {
                    let source = EnvSource::new(prefix.as_str(), separator.as_str()).load();
                    debug!(
                        name = source.name(),
                        entries = source.len(),
                        "registered property source"
                    );
                    environment.add_source(source);
                }
            }
        }

        Ok(environment)
    }

    fn loader_for(&self, resource: &Resource) -> Result<&dyn PropertySourceLoader, ConfigError> {
        let unsupported = || ConfigError::UnsupportedExtension(resource.uri().to_string());
        let extension = resource.extension().ok_or_else(unsupported)?;
        self.loaders
            .iter()
            .rev()
            .find(|loader| {
                loader
                    .file_extensions()
                    .iter()
                    .any(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|loader| loader.as_ref())
            .ok_or_else(unsupported)
    }

    fn load_into(
        &self,
        environment: &mut Environment,
        resource: &Resource,
    ) -> Result<(), ConfigError> {
        let loader = self.loader_for(resource)?;
        for source in loader.load(resource.uri(), resource)? {
            debug!(name = source.name(), entries = source.len(), "registered property source");
            environment.add_source(source);
        }
        Ok(())
    }
}
