//! Key factories: turn a schema field into the matching key.
//!
//! Factories are tried in order and the first one recognizing the field wins.
//! User factories come first, the built-in ones are the fallback; a field no
//! factory recognizes gets no key.

use crate::input::Binding;

use super::defaults::DefaultRegistry;
use super::key::{AnyKey, KeyKind, SettingsKey};
use super::kinds::{BindingKind, Number, Selection, Toggle};
use super::schema::{FieldAccessor, FieldDescriptor};

/// Where a key is being created.
pub struct KeyContext<'a> {
    pub schema: &'a str,
    pub group: &'a str,
    pub id: &'a str,
    pub defaults: &'a DefaultRegistry,
}

impl KeyContext<'_> {
    /// Builds a typed key for `field` in this context.
    pub fn key<K: KeyKind>(
        &self,
        field: &FieldDescriptor,
        kind: K,
        accessor: FieldAccessor<K::Value>,
    ) -> Box<dyn AnyKey> {
        Box::new(SettingsKey::new(
            self.schema,
            self.id.to_string(),
            field.name(),
            field.attributes().label.clone(),
            kind,
            accessor,
            self.defaults,
        ))
    }
}

pub trait KeyFactory {
    /// Returns a key if this factory handles the field's type.
    fn create(&self, field: &FieldDescriptor, cx: &KeyContext<'_>) -> Option<Box<dyn AnyKey>>;
}

impl<F> KeyFactory for F
where
    F: Fn(&FieldDescriptor, &KeyContext<'_>) -> Option<Box<dyn AnyKey>>,
{
    fn create(&self, field: &FieldDescriptor, cx: &KeyContext<'_>) -> Option<Box<dyn AnyKey>> {
        self(field, cx)
    }
}

/// `bool` fields.
pub struct ToggleFactory;

impl KeyFactory for ToggleFactory {
    fn create(&self, field: &FieldDescriptor, cx: &KeyContext<'_>) -> Option<Box<dyn AnyKey>> {
        let accessor = field.accessor::<bool>()?;
        let kind = Toggle {
            exclusive_group: field.attributes().exclusive_group.clone(),
        };
        Some(cx.key(field, kind, accessor.clone()))
    }
}

/// Integer and floating point fields.
pub struct NumberFactory;

/// A numeric field seen as `f64`, with the bounds of its declared type.
struct NumericField {
    accessor: FieldAccessor<f64>,
    integer: bool,
    limits: Option<(f64, f64)>,
}

impl NumberFactory {
    fn numeric_accessor(field: &FieldDescriptor) -> Option<NumericField> {
        macro_rules! try_numeric {
            ($ty:ty, $integer:expr) => {
                if let Some(accessor) = field.accessor::<$ty>() {
                    return Some(NumericField {
                        accessor: accessor.map::<f64>(|v| v as f64, |v| v as $ty),
                        integer: $integer,
                        limits: Some((<$ty>::MIN as f64, <$ty>::MAX as f64)),
                    });
                }
            };
        }

        if let Some(accessor) = field.accessor::<f64>() {
            return Some(NumericField {
                accessor: accessor.clone(),
                integer: false,
                limits: None,
            });
        }
        try_numeric!(f32, false);
        try_numeric!(i32, true);
        try_numeric!(i64, true);
        try_numeric!(u32, true);
        try_numeric!(u8, true);
        None
    }
}

impl KeyFactory for NumberFactory {
    fn create(&self, field: &FieldDescriptor, cx: &KeyContext<'_>) -> Option<Box<dyn AnyKey>> {
        let numeric = Self::numeric_accessor(field)?;
        let range = field.attributes().range;
        // The declared range narrows, never widens, what the field type holds.
        let (min, max) = match (range, numeric.limits) {
            (Some(r), Some((lo, hi))) => (Some(r.min.max(lo)), Some(r.max.min(hi))),
            (Some(r), None) => (Some(r.min), Some(r.max)),
            (None, Some((lo, hi))) => (Some(lo), Some(hi)),
            (None, None) => (None, None),
        };
        let kind = Number {
            min,
            max,
            integer: numeric.integer,
        };
        Some(cx.key(field, kind, numeric.accessor))
    }
}

/// Fields declared through [`FieldDescriptor::choice`].
pub struct SelectionFactory;

impl KeyFactory for SelectionFactory {
    fn create(&self, field: &FieldDescriptor, cx: &KeyContext<'_>) -> Option<Box<dyn AnyKey>> {
        let choice = field.choice_field()?;
        let kind = Selection::new(choice.options.clone());
        Some(cx.key(field, kind, choice.accessor.clone()))
    }
}

/// [`Binding`] fields.
pub struct BindingFactory;

impl KeyFactory for BindingFactory {
    fn create(&self, field: &FieldDescriptor, cx: &KeyContext<'_>) -> Option<Box<dyn AnyKey>> {
        let accessor = field.accessor::<Binding>()?;
        Some(cx.key(field, BindingKind, accessor.clone()))
    }
}

/// Ordered factory list: user factories, then built-ins.
pub struct FactoryChain {
    user: Vec<Box<dyn KeyFactory>>,
    builtin: Vec<Box<dyn KeyFactory>>,
}

impl FactoryChain {
    pub fn new(user: Vec<Box<dyn KeyFactory>>) -> Self {
        Self {
            user,
            builtin: vec![
                Box::new(ToggleFactory) as Box<dyn KeyFactory>,
                Box::new(NumberFactory),
                Box::new(SelectionFactory),
                Box::new(BindingFactory),
            ],
        }
    }

    pub fn create(&self, field: &FieldDescriptor, cx: &KeyContext<'_>) -> Option<Box<dyn AnyKey>> {
        self.user
            .iter()
            .chain(self.builtin.iter())
            .find_map(|factory| factory.create(field, cx))
    }

    pub fn user_factory_count(&self) -> usize {
        self.user.len()
    }
}

impl Default for FactoryChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
