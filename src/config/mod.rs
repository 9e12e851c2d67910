//! Configuration loading and management.

mod builder;
mod convert;
mod env;
mod environment;
mod error;
mod evaluator;
mod flatten;
mod loader;
mod property;
mod resource;
mod value;
mod wire;

pub use builder::Config;
pub use convert::PropertyDeserializer;
pub use env::EnvSource;
pub use environment::Environment;
pub use error::ConfigError;
pub use evaluator::{
    evaluate_module, Evaluator, EvaluatorBuilder, ServerEvaluator, ServerEvaluatorBuilder,
    PKL_EXEC_ENV,
};
pub use flatten::{flatten, flatten_module, Properties};
pub use loader::{PklPropertySourceLoader, PropertySourceLoader, TomlPropertySourceLoader};
pub use property::{EmptyContainer, PropertySource, PropertyValue};
pub use resource::{ModuleSource, Resource};
pub use value::{Composite, Scalar, SequenceKind, Value};
