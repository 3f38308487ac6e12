use crate::field::FieldList;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// ModuleId
///
/// Opaque module identity. Three identities are assigned, three are
/// derived arithmetically; within one registry the derivation rules must
/// never map two structurally different modules to the same id.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct ModuleId(i32);

impl ModuleId {
    /// Owner of the shared system fields.
    pub const SYSTEM: Self = Self(0);

    /// Id-space offset for synthesized junction (mapping) modules.
    pub const MAPPING_OFFSET: i32 = 100_000;

    /// Id-space offset for synthesized default-value template modules.
    pub const TEMPLATE_OFFSET: i32 = 1_000_000;

    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Identity of a property module instantiated privately for `owner`.
    #[must_use]
    pub const fn property(owner: Self, template: Self) -> Self {
        Self(template.0 + owner.0)
    }

    /// Identity of the junction module backing one collection-valued field.
    #[must_use]
    pub const fn mapping(owner: Self, referenced: Self, field_index: i32) -> Self {
        Self(owner.0 + referenced.0 + Self::MAPPING_OFFSET + field_index)
    }

    /// Identity of the default-value template module of `owner`.
    #[must_use]
    pub const fn template(owner: Self) -> Self {
        Self(owner.0 + Self::TEMPLATE_OFFSET)
    }
}

///
/// ModuleKind
///
/// Closed tagged union replacing the source's module class hierarchy.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[remain::sorted]
pub enum ModuleKind {
    Associate,
    ExternalReference,
    Mapping,
    Media,
    Plain,
    Property,
    Template,
}

///
/// AbstractScope
///
/// Member predicate of an abstract module: which concrete modules the
/// union spans.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AbstractScope {
    /// Every enabled, concrete, top-level module of this kind.
    Kind(ModuleKind),
    /// Every enabled, concrete, top-level module managed by a container.
    ContainerManaged,
}

///
/// Module
///
/// One schema entity: a category of stored records and its field set.
/// Abstract modules (`abstract_scope` set) own no table; they resolve to a
/// union of concrete modules.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Module {
    pub id: ModuleId,
    pub kind: ModuleKind,
    pub name: String,
    pub table: String,
    pub fields: FieldList,
    pub parent: Option<ModuleId>,
    pub child: Option<ModuleId>,
    pub abstract_scope: Option<AbstractScope>,
    pub top_level: bool,
    pub enabled: bool,
    pub container_managed: bool,
    /// Property template shared across owners: keeps its own id and table.
    pub shared: bool,
    pub has_default_template: bool,
    /// Canonical display field, used when ordering by a reference to this
    /// module.
    pub display_field: Option<i32>,
    pub pk_column: String,
}

impl Module {
    pub fn new(id: ModuleId, kind: ModuleKind, name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            table: table.into(),
            fields: FieldList::new(),
            parent: None,
            child: None,
            abstract_scope: None,
            top_level: true,
            enabled: true,
            container_managed: false,
            shared: false,
            has_default_template: false,
            display_field: None,
            pk_column: "ID".to_string(),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: FieldList) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: AbstractScope) -> Self {
        self.abstract_scope = Some(scope);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ModuleId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: ModuleId) -> Self {
        self.child = Some(child);
        self
    }

    #[must_use]
    pub fn with_display_field(mut self, index: i32) -> Self {
        self.display_field = Some(index);
        self
    }

    #[must_use]
    pub fn container_managed(mut self) -> Self {
        self.container_managed = true;
        self
    }

    #[must_use]
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    #[must_use]
    pub fn templated(mut self) -> Self {
        self.has_default_template = true;
        self
    }

    #[must_use]
    pub fn not_top_level(mut self) -> Self {
        self.top_level = false;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.abstract_scope.is_some()
    }

    /// Whether this module can appear as a member of `scope`.
    #[must_use]
    pub fn matches_scope(&self, scope: AbstractScope) -> bool {
        if self.is_abstract() || !self.enabled || !self.top_level {
            return false;
        }
        match scope {
            AbstractScope::Kind(kind) => self.kind == kind,
            AbstractScope::ContainerManaged => self.container_managed,
        }
    }

    #[must_use]
    pub fn pk(&self) -> &str {
        &self.pk_column
    }

    /// Column backing the canonical display field, if any.
    #[must_use]
    pub fn display_column(&self) -> Option<&str> {
        self.fields
            .get(self.display_field?)
            .and_then(|f| f.sql_column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_differ_per_owner() {
        let genre = ModuleId::new(70);
        let movie = ModuleId::new(51);
        let book = ModuleId::new(54);

        assert_eq!(ModuleId::property(movie, genre).raw(), 121);
        assert_eq!(ModuleId::property(book, genre).raw(), 124);
        assert_ne!(
            ModuleId::property(movie, genre),
            ModuleId::property(book, genre)
        );
    }

    #[test]
    fn mapping_ids_distinguish_fields() {
        let movie = ModuleId::new(51);
        let person = ModuleId::new(60);

        let actors = ModuleId::mapping(movie, person, 7);
        let directors = ModuleId::mapping(movie, person, 8);
        assert_ne!(actors, directors);
    }

    #[test]
    fn scope_excludes_disabled_and_abstract_modules() {
        let movie = Module::new(ModuleId::new(51), ModuleKind::Media, "movie", "movie");
        assert!(movie.matches_scope(AbstractScope::Kind(ModuleKind::Media)));

        let disabled = movie.clone().disabled();
        assert!(!disabled.matches_scope(AbstractScope::Kind(ModuleKind::Media)));

        let media = Module::new(ModuleId::new(50), ModuleKind::Media, "media", "")
            .with_scope(AbstractScope::Kind(ModuleKind::Media));
        assert!(!media.matches_scope(AbstractScope::Kind(ModuleKind::Media)));
    }
}
