//! Application context for managing shared application state.

use crate::config::{ConfigError, Environment};
use crate::Error;

/// Central application context holding the property environment and the
/// typed settings bound from it.
///
/// ## Example
///
/// ```no_run
/// use pkl_props::{AppContext, Config, ConfigError, Environment};
///
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// impl Server {
///     fn bind(env: &Environment) -> Result<Self, ConfigError> {
///         Ok(Self {
///             host: env.get_required_property("server.host")?,
///             port: env.get_required_property_as("server.port")?,
///         })
///     }
/// }
///
/// let ctx = AppContext::builder()
///     .with_environment(Config::builder().with_file("application.pkl", true).build()?)
///     .bind_config(Server::bind)?
///     .build()?;
///
/// let server = ctx.config();
/// # Ok::<(), pkl_props::Error>(())
/// ```
#[derive(Debug)]
pub struct AppContext<C> {
    environment: Environment,
    config: C,
}

impl<C> AppContext<C> {
    /// Returns a reference to the typed configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

impl AppContext<()> {
    /// Creates a new builder for constructing an `AppContext`.
    pub fn builder() -> AppContextBuilder<()> {
        AppContextBuilder {
            environment: None,
            config: None,
        }
    }
}

/// Builder for constructing an [`AppContext`].
///
/// The builder starts with no config (`AppContextBuilder<()>`) and transitions
/// to `AppContextBuilder<C>` when a configuration is attached.
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct AppContextBuilder<C> {
    environment: Option<Environment>,
    config: Option<C>,
}

impl<C> AppContextBuilder<C> {
    /// Attaches the environment, typically the result of
    /// [`Config::build`](crate::Config::build).
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Builds the `AppContext`.
    ///
    /// Returns an error if no environment or no configuration was provided.
    pub fn build(self) -> Result<AppContext<C>, Error> {
        Ok(AppContext {
            environment: self.environment.ok_or(Error::MissingEnvironment)?,
            config: self.config.ok_or(Error::MissingConfig)?,
        })
    }
}

impl AppContextBuilder<()> {
    /// Attaches an already constructed configuration.
    pub fn with_config<C>(self, config: C) -> AppContextBuilder<C> {
        AppContextBuilder {
            environment: self.environment,
            config: Some(config),
        }
    }

    /// Binds the configuration from the attached environment.
    pub fn bind_config<C, F>(self, bind: F) -> Result<AppContextBuilder<C>, Error>
    where
        F: FnOnce(&Environment) -> Result<C, ConfigError>,
    {
        let environment = self.environment.ok_or(Error::MissingEnvironment)?;
        let config = bind(&environment)?;
        Ok(AppContextBuilder {
            environment: Some(environment),
            config: Some(config),
        })
    }
}
