//! Explicit settings schema.
//!
//! A [`Schema`] lists groups, each group lists fields. Every field carries
//! closures reading and writing the live value it stands for, so the values
//! themselves stay wherever the application keeps them.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, SettingsError};

use super::page::SettingsPage;

/// Getter/setter pair for one live field.
pub struct FieldAccessor<T> {
    get: Rc<dyn Fn() -> T>,
    set: Rc<dyn Fn(T)>,
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            get: Rc::clone(&self.get),
            set: Rc::clone(&self.set),
        }
    }
}

impl<T: 'static> FieldAccessor<T> {
    pub fn new(get: impl Fn() -> T + 'static, set: impl Fn(T) + 'static) -> Self {
        Self {
            get: Rc::new(get),
            set: Rc::new(set),
        }
    }

    /// Accessor over a shared cell.
    pub fn shared(cell: &Rc<RefCell<T>>) -> Self
    where
        T: Clone,
    {
        let read = Rc::clone(cell);
        let write = Rc::clone(cell);
        Self::new(move || read.borrow().clone(), move |value| *write.borrow_mut() = value)
    }

    #[inline]
    pub fn get(&self) -> T {
        (self.get)()
    }

    #[inline]
    pub fn set(&self, value: T) {
        (self.set)(value)
    }

    /// Accessor of another type converting on every read and write.
    pub fn map<U: 'static>(&self, into: fn(T) -> U, from: fn(U) -> T) -> FieldAccessor<U> {
        let get = Rc::clone(&self.get);
        let set = Rc::clone(&self.set);
        FieldAccessor::new(move || into(get()), move |value| set(from(value)))
    }
}

/// Enumerations selectable by name.
pub trait Choice: Copy + PartialEq + 'static {
    /// All variants in display order.
    fn variants() -> &'static [Self];
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::variants().iter().copied().find(|v| v.name() == name)
    }
}

/// Name-based view of a [`Choice`] field.
#[derive(Clone)]
pub struct ChoiceField {
    pub options: Vec<&'static str>,
    pub accessor: FieldAccessor<String>,
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Optional field metadata consumed by the key factories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAttributes {
    pub label: Option<String>,
    pub range: Option<Range>,
    /// Toggles sharing a group name are mutually exclusive.
    pub exclusive_group: Option<String>,
}

/// One declared field.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    accessor: Rc<dyn Any>,
    choice: Option<ChoiceField>,
    attributes: FieldAttributes,
}

impl FieldDescriptor {
    pub fn new<T: 'static>(name: impl Into<String>, accessor: FieldAccessor<T>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            accessor: Rc::new(accessor),
            choice: None,
            attributes: FieldAttributes::default(),
        }
    }

    /// Field over a [`Choice`] enumeration.
    pub fn choice<E: Choice>(name: impl Into<String>, accessor: FieldAccessor<E>) -> Self {
        let get = accessor.clone();
        let set = accessor.clone();
        let by_name = FieldAccessor::new(
            move || get.get().name().to_string(),
            move |name: String| match E::from_name(&name) {
                Some(value) => set.set(value),
                None => tracing::warn!(choice = %name, "ignoring unknown choice"),
            },
        );
        let mut field = Self::new(name, accessor);
        field.choice = Some(ChoiceField {
            options: E::variants().iter().map(Choice::name).collect(),
            accessor: by_name,
        });
        field
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.attributes.label = Some(label.into());
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.attributes.range = Some(Range { min, max });
        self
    }

    pub fn exclusive(mut self, group: impl Into<String>) -> Self {
        self.attributes.exclusive_group = Some(group.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attributes(&self) -> &FieldAttributes {
        &self.attributes
    }

    pub fn choice_field(&self) -> Option<&ChoiceField> {
        self.choice.as_ref()
    }

    /// Whether the field is declared with type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// The typed accessor, if the field is declared with type `T`.
    pub fn accessor<T: 'static>(&self) -> Option<&FieldAccessor<T>> {
        self.accessor.downcast_ref::<FieldAccessor<T>>()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Predicate deciding whether a group is shown, given the page state.
pub type VisibilityFn = Rc<dyn Fn(&SettingsPage) -> bool>;

#[derive(Clone, Debug)]
pub enum GroupEntry {
    Field(FieldDescriptor),
    /// Decorative header shown between fields.
    Header(String),
}

/// Fields declared together under one name.
#[derive(Clone)]
pub struct GroupSchema {
    name: String,
    label: Option<String>,
    entries: Vec<GroupEntry>,
    visibility: Option<VisibilityFn>,
}

impl GroupSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            entries: Vec::new(),
            visibility: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.entries.push(GroupEntry::Field(field));
        self
    }

    pub fn header(mut self, text: impl Into<String>) -> Self {
        self.entries.push(GroupEntry::Header(text.into()));
        self
    }

    pub fn visible_when(mut self, predicate: impl Fn(&SettingsPage) -> bool + 'static) -> Self {
        self.visibility = Some(Rc::new(predicate));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn entries(&self) -> &[GroupEntry] {
        &self.entries
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.entries.iter().filter_map(|entry| match entry {
            GroupEntry::Field(field) => Some(field),
            GroupEntry::Header(_) => None,
        })
    }

    pub(crate) fn visibility(&self) -> Option<&VisibilityFn> {
        self.visibility.as_ref()
    }
}

/// A full settings declaration: a named list of groups.
#[derive(Clone)]
pub struct Schema {
    name: String,
    groups: Vec<GroupSchema>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn group(mut self, group: GroupSchema) -> Self {
        self.groups.push(group);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[GroupSchema] {
        &self.groups
    }

    /// Every field with its key id (`Group.Field`).
    pub fn fields(&self) -> impl Iterator<Item = (String, &FieldDescriptor)> {
        self.groups.iter().flat_map(|group| {
            group
                .fields()
                .map(move |field| (key_id(group.name(), field.name()), field))
        })
    }

    /// Checks the construction-time contract of the schema.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SettingsError::Schema("schema name is empty".into()));
        }

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() || group.name.contains('.') {
                return Err(SettingsError::Schema(format!(
                    "invalid group name `{}` in `{}`",
                    group.name, self.name
                )));
            }
            if !group_names.insert(group.name.as_str()) {
                return Err(SettingsError::Schema(format!(
                    "duplicate group `{}` in `{}`",
                    group.name, self.name
                )));
            }

            let mut field_names = HashSet::new();
            for field in group.fields() {
                let id = key_id(&group.name, &field.name);
                if field.name.trim().is_empty() {
                    return Err(SettingsError::Schema(format!(
                        "empty field name in group `{}`",
                        group.name
                    )));
                }
                if !field_names.insert(field.name.as_str()) {
                    return Err(SettingsError::Schema(format!("duplicate key `{}`", id)));
                }
                if field.attributes.exclusive_group.is_some() && !field.is::<bool>() {
                    return Err(SettingsError::Schema(format!(
                        "`{}` has an exclusive group but is not a boolean field",
                        id
                    )));
                }
                if let Some(range) = field.attributes.range
                    && !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max)
                {
                    return Err(SettingsError::Schema(format!(
                        "`{}` has an invalid range {}..={}",
                        id, range.min, range.max
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Key id of a field: `Group.Field`.
#[inline]
pub fn key_id(group: &str, field: &str) -> String {
    format!("{}.{}", group, field)
}
