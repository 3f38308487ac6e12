use crate::{
    field::{Field, FieldList},
    module::{AbstractScope, Module, ModuleId, ModuleKind},
    registry::{ModuleRegistry, RegistryBuilder, SchemaError},
    value::ValueType,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("schema configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

///
/// SchemaConfig
///
/// Declarative schema: the phase-1 input to the registry build. Property
/// templates are blueprints; modules are the declared concrete (and
/// abstract) modules. Derived modules are never declared here.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub property_templates: Vec<ModuleConfig>,

    pub modules: Vec<ModuleConfig>,
}

impl SchemaConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Run both build phases and seal the registry.
    pub fn build(self) -> Result<ModuleRegistry, ConfigError> {
        Ok(self.into_builder()?.build()?)
    }

    pub fn into_builder(self) -> Result<RegistryBuilder, SchemaError> {
        let mut builder = RegistryBuilder::new();
        for template in self.property_templates {
            builder.register_base_property_template(template.into_module());
        }
        for module in self.modules {
            builder.register_module(module.into_module())?;
        }
        Ok(builder)
    }
}

///
/// ModuleConfig
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModuleConfig {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    pub kind: ModuleKind,

    #[serde(default)]
    pub abstract_scope: Option<AbstractScope>,
    #[serde(default = "default_true")]
    pub top_level: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub container_managed: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub has_default_template: bool,
    #[serde(default)]
    pub parent: Option<i32>,
    #[serde(default)]
    pub child: Option<i32>,
    #[serde(default)]
    pub display_field: Option<i32>,

    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl ModuleConfig {
    fn into_module(self) -> Module {
        let id = ModuleId::new(self.id);
        let table = self.table.unwrap_or_else(|| self.name.clone());
        let fields: FieldList = self
            .fields
            .into_iter()
            .map(|f| f.into_field(id))
            .collect();

        let mut module = Module::new(id, self.kind, self.name, table).with_fields(fields);
        module.abstract_scope = self.abstract_scope;
        module.top_level = self.top_level;
        module.enabled = self.enabled;
        module.container_managed = self.container_managed;
        module.shared = self.shared;
        module.has_default_template = self.has_default_template;
        module.parent = self.parent.map(ModuleId::new);
        module.child = self.child.map(ModuleId::new);
        module.display_field = self.display_field;
        module
    }
}

///
/// FieldConfig
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FieldConfig {
    pub index: i32,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub value_type: ValueType,

    #[serde(default)]
    pub ui_only: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default)]
    pub max_length: u32,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub referenced_module: Option<i32>,
}

impl FieldConfig {
    fn into_field(self, module: ModuleId) -> Field {
        let mut field = Field::new(self.index, module, self.name, self.value_type);
        if let Some(label) = self.label {
            field.label = label;
        }
        field.ui_only = self.ui_only;
        field.enabled = self.enabled;
        field.read_only = self.read_only;
        field.searchable = self.searchable;
        field.max_length = self.max_length;
        field.column = self.column;
        field.referenced_module = self.referenced_module.map(ModuleId::new);
        field
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "property_templates": [
            {
                "id": 70, "name": "genre", "kind": "Property",
                "top_level": false, "display_field": 1,
                "fields": [
                    { "index": 1, "name": "name", "value_type": "String", "column": "name" }
                ]
            }
        ],
        "modules": [
            {
                "id": 50, "name": "media", "table": "", "kind": "Media",
                "abstract_scope": { "Kind": "Media" },
                "fields": [
                    { "index": 1, "name": "title", "value_type": "String", "column": "title" }
                ]
            },
            {
                "id": 51, "name": "movie", "kind": "Media",
                "fields": [
                    { "index": 1, "name": "title", "value_type": "String", "column": "title" },
                    { "index": 2, "name": "year", "value_type": "LongInt", "column": "year" },
                    { "index": 3, "name": "genres", "value_type": "ReferenceCollection",
                      "referenced_module": 70 }
                ]
            }
        ]
    }"#;

    #[test]
    fn config_builds_a_sealed_registry() {
        let registry = SchemaConfig::from_json(CATALOG).unwrap().build().unwrap();

        let movie = registry.get(ModuleId::new(51)).unwrap();
        assert_eq!(movie.table, "movie");
        assert_eq!(movie.kind, ModuleKind::Media);

        // Derivation ran: the genre property module and its junction exist.
        let derived = ModuleId::property(ModuleId::new(51), ModuleId::new(70));
        assert!(registry.module(derived).is_some());
        assert_eq!(
            registry.resolve_abstract(ModuleId::new(50)).unwrap(),
            vec![ModuleId::new(51)]
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            SchemaConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
