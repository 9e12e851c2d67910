//! Loaders turning resources into property sources.

use std::fmt;

use tracing::debug;

use super::evaluator::{evaluate_module, EvaluatorBuilder, ServerEvaluatorBuilder};
use super::flatten::flatten_module;
use super::property::PropertySource;
use super::resource::{ModuleSource, Resource};
use super::value::{Composite, Value};
use super::ConfigError;

/// Loads the property sources contained in a resource.
pub trait PropertySourceLoader: fmt::Debug {
    /// Extensions (without the dot) this loader handles.
    fn file_extensions(&self) -> &[&'static str];

    /// Loads `resource` into one or more property sources named after `name`.
    ///
    /// Nothing is returned unless the whole resource loaded successfully.
    fn load(&self, name: &str, resource: &Resource) -> Result<Vec<PropertySource>, ConfigError>;
}

/// Loads `.pkl` and `.pcf` modules through an evaluator.
#[derive(Debug, Clone, Default)]
pub struct PklPropertySourceLoader<B = ServerEvaluatorBuilder> {
    evaluator: B,
}

impl PklPropertySourceLoader {
    pub fn new() -> Self {
        Self::with_evaluator(ServerEvaluatorBuilder::preconfigured())
    }
}

impl<B> PklPropertySourceLoader<B> {
    pub fn with_evaluator(evaluator: B) -> Self {
        Self { evaluator }
    }
}

impl<B> PropertySourceLoader for PklPropertySourceLoader<B>
where
    B: EvaluatorBuilder + fmt::Debug,
{
    fn file_extensions(&self) -> &[&'static str] {
        &["pkl", "pcf"]
    }

    fn load(&self, name: &str, resource: &Resource) -> Result<Vec<PropertySource>, ConfigError> {
        let source = ModuleSource::from_resource(resource)?;
        let module = evaluate_module(&self.evaluator, &source, resource.stem())?;
        let properties = flatten_module(&module);
        debug!(name, entries = properties.len(), "loaded pkl property source");
        Ok(vec![PropertySource::new(name, properties)])
    }
}

/// Loads `.toml` files, flattened the same way as evaluated modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlPropertySourceLoader;

impl PropertySourceLoader for TomlPropertySourceLoader {
    fn file_extensions(&self) -> &[&'static str] {
        &["toml"]
    }

    fn load(&self, name: &str, resource: &Resource) -> Result<Vec<PropertySource>, ConfigError> {
        let contents = resource.read_to_string()?;
        let table: toml::Table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            location: resource.uri().to_string(),
            source: e,
        })?;
        let module = Composite::from_value(resource.stem(), Value::from(toml::Value::Table(table)))
            .ok_or_else(|| ConfigError::NotAModule {
                uri: resource.uri().to_string(),
            })?;
        let properties = flatten_module(&module);
        debug!(name, entries = properties.len(), "loaded toml property source");
        Ok(vec![PropertySource::new(name, properties)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::evaluator::tests::StaticEvaluatorBuilder;
    use crate::config::property::{EmptyContainer, PropertyValue};
    use crate::config::value::Scalar;
    use std::io::Write;

    fn person(name: &str, age: i64) -> Composite {
        Composite::new("Person")
            .with_property("name", name)
            .with_property("age", age)
    }

    #[test]
    fn test_pkl_loader_extensions() {
        assert_eq!(PklPropertySourceLoader::new().file_extensions(), ["pkl", "pcf"]);
    }

    #[test]
    fn test_pkl_loader_flattens_module() {
        let module = Composite::new("AppConfig")
            .with_property("intProp", 42)
            .with_property("nullableInt2", Value::Null)
            .with_property("complexList", Value::list([person("Pigeon", 42), person("Parrot", 21)]))
            .with_property("simpleEmptySet", Value::set(Vec::<Value>::new()));
        let builder = StaticEvaluatorBuilder::returning(module);
        let loader = PklPropertySourceLoader::with_evaluator(builder.clone());

        let sources = loader
            .load("app", &Resource::in_memory("mem:/app.pkl", "ignored"))
            .unwrap();

        assert_eq!(sources.len(), 1);
        let source = &sources[0];
        assert_eq!(source.name(), "app");
        let names: Vec<&str> = source.property_names().collect();
        assert_eq!(
            names,
            [
                "intProp",
                "nullableInt2",
                "complexList[0].name",
                "complexList[0].age",
                "complexList[1].name",
                "complexList[1].age",
                "simpleEmptySet"
            ]
        );
        assert_eq!(source.get("nullableInt2"), Some(&PropertyValue::Null));
        assert_eq!(
            source.get("simpleEmptySet"),
            Some(&PropertyValue::Empty(EmptyContainer::Set))
        );
        assert_eq!(builder.lifecycle.dropped.get(), 1);
    }

    #[test]
    fn test_pkl_loader_passes_canonical_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.pkl");
        std::fs::write(&path, "name = \"Pigeon\"").unwrap();
        let builder = StaticEvaluatorBuilder::returning(Value::mapping([("name", "Pigeon")]));
        let loader = PklPropertySourceLoader::with_evaluator(builder.clone());

        loader.load("app", &Resource::file(&path)).unwrap();

        let sources = builder.lifecycle.sources.borrow();
        assert_eq!(
            sources.as_slice(),
            [ModuleSource::File(path.canonicalize().unwrap())]
        );
    }

    #[test]
    fn test_pkl_loader_missing_file_skips_evaluator() {
        let builder = StaticEvaluatorBuilder::returning(Value::mapping([("name", "Pigeon")]));
        let loader = PklPropertySourceLoader::with_evaluator(builder.clone());

        let result = loader.load("app", &Resource::file("/nonexistent/app.pkl"));

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
        assert_eq!(builder.lifecycle.built.get(), 0);
    }

    #[test]
    fn test_pkl_loader_propagates_evaluation_error() {
        let builder = StaticEvaluatorBuilder::failing("Type mismatch.");
        let loader = PklPropertySourceLoader::with_evaluator(builder);

        let result = loader.load("app", &Resource::in_memory("mem:/app.pkl", "x: Int = \"a\""));

        assert!(matches!(
            result,
            Err(ConfigError::Evaluation { ref message, .. }) if message == "Type mismatch."
        ));
    }

    #[test]
    fn test_toml_loader() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            name = "Pigeon"
            tags = []

            [server]
            port = 8080
            "#
        )
        .unwrap();

        let sources = TomlPropertySourceLoader
            .load("defaults", &Resource::file(file.path()))
            .unwrap();

        let source = &sources[0];
        assert_eq!(source.get("name"), Some(&PropertyValue::Scalar("Pigeon".into())));
        assert_eq!(
            source.get("server.port"),
            Some(&PropertyValue::Scalar(Scalar::Integer(8080)))
        );
        assert_eq!(source.get("tags"), Some(&PropertyValue::Empty(EmptyContainer::List)));
    }

    #[test]
    fn test_toml_loader_parse_error() {
        let resource = Resource::in_memory("mem:/broken.toml", "name = ");
        let result = TomlPropertySourceLoader.load("broken", &resource);

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
