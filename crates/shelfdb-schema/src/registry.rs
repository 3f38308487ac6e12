use crate::{
    field::{Field, FieldList, system_fields},
    module::{Module, ModuleId, ModuleKind},
    value::{StorageClass, ValueType},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

/// Field indices of the two junction-table columns.
pub const MAPPING_OBJECT_FIELD: i32 = 1;
pub const MAPPING_REFERENCED_FIELD: i32 = 2;

/// Field indices appended to synthesized template modules.
pub const TEMPLATE_NAME_FIELD: i32 = 251;
pub const TEMPLATE_DEFAULT_FIELD: i32 = 252;

///
/// SchemaError
///
/// Programming errors in schema composition. Not recoverable at runtime:
/// an id collision is fatal at registry-build time, an unknown field or
/// module is a caller bug at compile-call time.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("module id {id} already names a structurally different module ('{existing}' vs '{candidate}')")]
    IdCollision {
        id: ModuleId,
        existing: String,
        candidate: String,
    },

    #[error("unknown module {0}")]
    UnknownModule(ModuleId),

    #[error("module {module} has no field {index}")]
    UnknownField { module: ModuleId, index: i32 },

    #[error("module {0} is not registered as a property template")]
    NotATemplate(ModuleId),

    #[error("field {index} on module {module} is not collection-valued")]
    NotACollection { module: ModuleId, index: i32 },
}

///
/// RegistryBuilder
///
/// Phase 1 of the two-phase build protocol: register base property
/// templates and concrete modules declared from configuration. Phase 2
/// (`build`) runs derivation for every concrete module's fields exactly
/// once, in registration order, and seals the result. Consuming the
/// builder is the one-shot initialization gate; the sealed registry is
/// immutable shared state.
///

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    modules: BTreeMap<ModuleId, Module>,
    order: Vec<ModuleId>,
    templates: BTreeMap<ModuleId, Module>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a module blueprint keyed by its own id. Blueprints are never
    /// queried directly; they are cloned into derived property modules.
    pub fn register_base_property_template(&mut self, template: Module) {
        self.templates.insert(template.id, template);
    }

    /// Register a declared module. Re-registration of a structurally equal
    /// module is idempotent; a structurally different module under the same
    /// id is an [`SchemaError::IdCollision`].
    pub fn register_module(&mut self, module: Module) -> Result<ModuleId, SchemaError> {
        let id = module.id;
        match self.modules.get(&id) {
            None => {
                self.modules.insert(id, module);
                self.order.push(id);
                Ok(id)
            }
            Some(existing) if *existing == module => Ok(id),
            Some(existing) => Err(SchemaError::IdCollision {
                id,
                existing: existing.name.clone(),
                candidate: module.name,
            }),
        }
    }

    /// Instantiate a property template for `owner`, merging any
    /// owner-declared extra fields by index (duplicates skipped).
    ///
    /// A template marked shared keeps its own id and table; otherwise the
    /// id is `template + owner` and the table is `owner_table_template_table`.
    pub fn derive_property_module(
        &mut self,
        owner: ModuleId,
        template: ModuleId,
        extra_fields: Option<&FieldList>,
    ) -> Result<ModuleId, SchemaError> {
        let template = self
            .templates
            .get(&template)
            .ok_or(SchemaError::NotATemplate(template))?
            .clone();
        let owner = self
            .modules
            .get(&owner)
            .ok_or(SchemaError::UnknownModule(owner))?;

        let (id, table) = if template.shared {
            (template.id, template.table.clone())
        } else {
            (
                ModuleId::property(owner.id, template.id),
                format!("{}_{}", owner.table, template.table),
            )
        };

        let mut fields = FieldList::new();
        for f in template.fields.iter() {
            let mut f = f.clone();
            f.module = id;
            fields.insert(f);
        }
        if let Some(extra) = extra_fields {
            for f in extra.iter() {
                let mut f = f.clone();
                f.module = id;
                extra_insert(&mut fields, f);
            }
        }

        let mut derived = Module::new(id, ModuleKind::Property, template.name.clone(), table)
            .with_fields(fields)
            .not_top_level();
        derived.shared = template.shared;
        derived.display_field = template.display_field;

        self.insert_derived(derived)
    }

    /// Synthesize the two-column junction module backing one
    /// collection-valued field of `owner`.
    pub fn derive_mapping_module(
        &mut self,
        owner: ModuleId,
        referenced: ModuleId,
        field_index: i32,
    ) -> Result<ModuleId, SchemaError> {
        let owner_module = self
            .modules
            .get(&owner)
            .ok_or(SchemaError::UnknownModule(owner))?;
        let field = owner_module
            .fields
            .get(field_index)
            .ok_or(SchemaError::UnknownField {
                module: owner,
                index: field_index,
            })?;
        if field.value_type.storage_class() != StorageClass::JunctionRouted {
            return Err(SchemaError::NotACollection {
                module: owner,
                index: field_index,
            });
        }

        let id = ModuleId::mapping(owner, referenced, field_index);
        let table = format!("x_{}_{}", owner_module.table, field.name);
        let fields = FieldList::from_iter([
            Field::new(MAPPING_OBJECT_FIELD, id, "objectid", ValueType::SingleReference)
                .with_column("objectID")
                .with_reference(owner),
            Field::new(
                MAPPING_REFERENCED_FIELD,
                id,
                "referencedid",
                ValueType::SingleReference,
            )
            .with_column("referencedID")
            .with_reference(referenced),
        ]);

        let derived = Module::new(id, ModuleKind::Mapping, format!("{}_{}", owner_module.name, field.name), table)
            .with_fields(fields)
            .not_top_level();

        self.insert_derived(derived)
    }

    /// Synthesize the default-value template module of `owner`: the owner's
    /// field shape plus a template name and an is-default flag.
    pub fn derive_template_module(&mut self, owner: ModuleId) -> Result<ModuleId, SchemaError> {
        let owner = self
            .modules
            .get(&owner)
            .ok_or(SchemaError::UnknownModule(owner))?;

        let id = ModuleId::template(owner.id);
        let mut fields = FieldList::new();
        for f in owner.fields.iter() {
            let mut f = f.clone();
            f.module = id;
            fields.insert(f);
        }
        fields.insert(
            Field::new(TEMPLATE_NAME_FIELD, id, "template_name", ValueType::String)
                .with_column("template_name"),
        );
        fields.insert(
            Field::new(TEMPLATE_DEFAULT_FIELD, id, "is_default", ValueType::Boolean)
                .with_column("is_default"),
        );

        let derived = Module::new(
            id,
            ModuleKind::Template,
            format!("{}_template", owner.name),
            format!("{}_template", owner.table),
        )
        .with_fields(fields)
        .not_top_level();

        self.insert_derived(derived)
    }

    /// Phase 2: walk declared modules in registration order and derive
    /// every synthesized module their fields require, then seal.
    /// Re-running derivation over an already-derived set is idempotent.
    pub fn build(mut self) -> Result<ModuleRegistry, SchemaError> {
        let declared = self.order.clone();

        for id in declared {
            // Fields may be rewritten below (template references resolve to
            // derived module ids, collections gain mirrors).
            let fields: Vec<Field> = self
                .modules
                .get(&id)
                .ok_or(SchemaError::UnknownModule(id))?
                .fields
                .iter()
                .cloned()
                .collect();

            for field in fields {
                let Some(referenced) = field.referenced_module else {
                    continue;
                };

                // References into base templates resolve to a derived
                // property module instantiated for this owner.
                let target = if self.templates.contains_key(&referenced) {
                    let derived = self.derive_property_module(id, referenced, None)?;
                    self.retarget_field(id, field.index, derived)?;
                    derived
                } else {
                    referenced
                };

                if field.value_type.storage_class() == StorageClass::JunctionRouted {
                    self.derive_mapping_module(id, target, field.index)?;
                    if let Some(mirror) = self
                        .modules
                        .get(&id)
                        .and_then(|m| m.fields.get(field.index))
                        .and_then(Field::mirror)
                    {
                        let module = self.modules.get_mut(&id).expect("module registered above");
                        if !module.fields.contains(mirror.index) {
                            module.fields.insert(mirror);
                        }
                    }
                }
            }

            if self
                .modules
                .get(&id)
                .is_some_and(|m| m.has_default_template)
            {
                self.derive_template_module(id)?;
            }
        }

        Ok(ModuleRegistry {
            modules: self.modules,
            order: self.order,
        })
    }

    fn retarget_field(
        &mut self,
        module: ModuleId,
        index: i32,
        target: ModuleId,
    ) -> Result<(), SchemaError> {
        let m = self
            .modules
            .get_mut(&module)
            .ok_or(SchemaError::UnknownModule(module))?;
        let mut field = m
            .fields
            .get(index)
            .ok_or(SchemaError::UnknownField { module, index })?
            .clone();
        field.referenced_module = Some(target);
        m.fields.insert(field);
        Ok(())
    }

    /// Insert a derived module, enforcing the id-space invariant:
    /// re-deriving a structurally equal module is idempotent, anything
    /// else under an occupied id is a collision.
    fn insert_derived(&mut self, module: Module) -> Result<ModuleId, SchemaError> {
        let id = module.id;
        match self.modules.get(&id) {
            None => {
                self.modules.insert(id, module);
                self.order.push(id);
                Ok(id)
            }
            Some(existing) if *existing == module => Ok(id),
            Some(existing) if existing.shared && module.shared && existing.table == module.table => {
                // A shared template serves multiple owners under one id.
                Ok(id)
            }
            Some(existing) => Err(SchemaError::IdCollision {
                id,
                existing: existing.name.clone(),
                candidate: module.name,
            }),
        }
    }
}

// Owner-declared extras must not clobber template fields.
fn extra_insert(fields: &mut FieldList, field: Field) {
    if !fields.contains(field.index) {
        fields.insert(field);
    }
}

///
/// ModuleRegistry
///
/// The authoritative `ModuleId -> Module` map, sealed after the two-phase
/// build. Read-only for the remainder of the process; safe to share across
/// threads without locking.
///

#[derive(Clone, Debug)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, Module>,
    order: Vec<ModuleId>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    pub fn get(&self, id: ModuleId) -> Result<&Module, SchemaError> {
        self.module(id).ok_or(SchemaError::UnknownModule(id))
    }

    /// Modules in registration order (declared first, derived after their
    /// owners).
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(|id| self.modules.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Member modules of an abstract module, in registration order. An
    /// empty result is legal: no compatible concrete module is enabled.
    /// Concrete modules resolve to themselves.
    pub fn resolve_abstract(&self, id: ModuleId) -> Result<Vec<ModuleId>, SchemaError> {
        let module = self.get(id)?;

        let Some(scope) = module.abstract_scope else {
            return Ok(vec![id]);
        };

        Ok(self
            .modules()
            .filter(|m| m.matches_scope(scope))
            .map(|m| m.id)
            .collect())
    }

    /// Look up a field on a module's own set, falling back to the shared
    /// system fields.
    #[must_use]
    pub fn field_of(&self, module: ModuleId, index: i32) -> Option<&Field> {
        self.module(module)?
            .fields
            .get(index)
            .or_else(|| system_fields().get(index))
    }

    /// The junction module backing a collection-valued field.
    pub fn mapping_module(&self, owner: &Module, field: &Field) -> Result<&Module, SchemaError> {
        let referenced = field
            .referenced_module
            .ok_or(SchemaError::UnknownField {
                module: owner.id,
                index: field.index,
            })?;
        let id = ModuleId::mapping(owner.id, referenced, field.index);
        self.get(id)
    }
}
