//! The bus-facing property reflection layer.
//!
//! Each object that exposes properties over the bus (a
//! [`crate::service::Service`], a [`crate::device::Device`]) builds a
//! `PropertyStore` once at construction time, registering an explicit
//! `(name, kind, accessor)` tuple per property rather than relying on
//! runtime type introspection. `get`/`set` then type-dispatch on the
//! supplied [`Value`]'s variant against the registered `kind`, matching
//! `DispatchOnType`'s contract: a signature mismatch or a write to a
//! read-only property both yield [`Error::InvalidArguments`], and an
//! unregistered name yields [`Error::InvalidProperty`].

use std::collections::HashMap;

use crate::{
    common::Property,
    core::{Error, Result},
    store::Value,
};

/// The variant a registered property accepts, checked before a setter is
/// ever invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Int`].
    Int,
    /// [`Value::Uint`].
    Uint,
    /// [`Value::Double`].
    Double,
    /// [`Value::String`].
    String,
    /// [`Value::Strings`].
    Strings,
    /// [`Value::Stringmap`].
    Stringmap,
}

impl ValueKind {
    fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueKind::Bool, Value::Bool(_))
                | (ValueKind::Int, Value::Int(_))
                | (ValueKind::Uint, Value::Uint(_))
                | (ValueKind::Double, Value::Double(_))
                | (ValueKind::String, Value::String(_))
                | (ValueKind::Strings, Value::Strings(_))
                | (ValueKind::Stringmap, Value::Stringmap(_))
        )
    }
}

type Getter = Box<dyn Fn() -> Value + Send + Sync>;
type Setter = Box<dyn Fn(Value) -> Result<()> + Send + Sync>;

struct Entry {
    kind: ValueKind,
    getter: Getter,
    setter: Option<Setter>,
}

/// An object's full set of bus-visible properties.
#[derive(Default)]
pub struct PropertyStore {
    entries: HashMap<String, Entry>,
}

impl PropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a read-only property. A write to `name` always fails with
    /// [`Error::InvalidArguments`].
    pub fn register_read_only<F>(&mut self, name: impl Into<String>, kind: ValueKind, getter: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Entry { kind, getter: Box::new(getter), setter: None });
    }

    /// Registers a read-write property.
    pub fn register_read_write<F, S>(&mut self, name: impl Into<String>, kind: ValueKind, getter: F, setter: S)
    where
        F: Fn() -> Value + Send + Sync + 'static,
        S: Fn(Value) -> Result<()> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Entry { kind, getter: Box::new(getter), setter: Some(Box::new(setter)) });
    }

    /// Binds a boolean [`Property`] directly, without a caller-supplied
    /// getter/setter pair.
    pub fn bind_bool(&mut self, name: impl Into<String>, property: &Property<bool>, read_only: bool) {
        let get_property = property.clone();
        let getter = move || Value::Bool(get_property.get());
        if read_only {
            self.register_read_only(name, ValueKind::Bool, getter);
        } else {
            let set_property = property.clone();
            self.register_read_write(name, ValueKind::Bool, getter, move |value| match value {
                Value::Bool(b) => {
                    set_property.set(b);
                    Ok(())
                }
                other => Err(Error::InvalidArguments(format!("expected a bool, got {other:?}"))),
            });
        }
    }

    /// Binds a string [`Property`] directly.
    pub fn bind_string(&mut self, name: impl Into<String>, property: &Property<String>, read_only: bool) {
        let get_property = property.clone();
        let getter = move || Value::String(get_property.get());
        if read_only {
            self.register_read_only(name, ValueKind::String, getter);
        } else {
            let set_property = property.clone();
            self.register_read_write(name, ValueKind::String, getter, move |value| match value {
                Value::String(s) => {
                    set_property.set(s);
                    Ok(())
                }
                other => Err(Error::InvalidArguments(format!("expected a string, got {other:?}"))),
            });
        }
    }

    /// Reads a single property by name.
    ///
    /// # Errors
    /// Returns [`Error::InvalidProperty`] if `name` is not registered.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.entries
            .get(name)
            .map(|entry| (entry.getter)())
            .ok_or_else(|| Error::InvalidProperty(name.to_string()))
    }

    /// Writes a single property by name, type-dispatching `value` against
    /// the property's registered kind.
    ///
    /// # Errors
    /// Returns [`Error::InvalidProperty`] if `name` is not registered,
    /// [`Error::InvalidArguments`] if the property is read-only or `value`
    /// does not match its registered kind, and whatever the accessor itself
    /// returns otherwise.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let entry = self.entries.get(name).ok_or_else(|| Error::InvalidProperty(name.to_string()))?;
        let Some(setter) = entry.setter.as_ref() else {
            return Err(Error::InvalidArguments(format!("{name} is read-only")));
        };
        if !entry.kind.matches(&value) {
            return Err(Error::InvalidArguments(format!("{name} does not accept {value:?}")));
        }
        setter(value)
    }

    /// Enumerates every registered property and its current value.
    #[must_use]
    pub fn get_properties(&self) -> HashMap<String, Value> {
        self.entries.iter().map(|(name, entry)| (name.clone(), (entry.getter)())).collect()
    }

    /// The names of every registered property.
    #[must_use]
    pub fn property_names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
