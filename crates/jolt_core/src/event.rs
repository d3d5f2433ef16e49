//! In-process event bus.
//!
//! Rust code publishes typed events keyed by their `TypeId`; scripts use
//! named events carrying a [`Payload`]. Both kinds also raise an occurrence
//! flag that stays set until cleared, so pollers can ask "did X happen since
//! I last looked".

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::entity::Entity;
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Entity(Entity),
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Bool(v) => write!(f, "{v}"),
            PayloadValue::Int(v) => write!(f, "{v}"),
            PayloadValue::Number(v) => write!(f, "{v}"),
            PayloadValue::Text(v) => f.write_str(v),
            PayloadValue::Entity(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        PayloadValue::Bool(v)
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        PayloadValue::Int(v)
    }
}

impl From<f64> for PayloadValue {
    fn from(v: f64) -> Self {
        PayloadValue::Number(v)
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        PayloadValue::Text(v.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        PayloadValue::Text(v)
    }
}

impl From<Entity> for PayloadValue {
    fn from(v: Entity) -> Self {
        PayloadValue::Entity(v)
    }
}

/// Fields of a named event.
pub type Payload = BTreeMap<String, PayloadValue>;

pub type NamedListener = Rc<dyn Fn(&Payload)>;
type Listener<E> = Rc<dyn Fn(&E)>;

#[derive(Default)]
pub struct EventBus {
    /// `TypeId::of::<E>()` -> `Vec<Listener<E>>`.
    typed: HashMap<TypeId, Box<dyn Any>>,
    named: HashMap<String, Vec<NamedListener>>,
    occurred: HashMap<String, bool>,
    warned: HashSet<TypeId>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<E: 'static>(&mut self, listener: impl Fn(&E) + 'static) {
        let slot = self
            .typed
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<Listener<E>>::new()));
        if let Some(listeners) = slot.downcast_mut::<Vec<Listener<E>>>() {
            listeners.push(Rc::new(listener));
        }
    }

    /// Delivers `event` to every listener of `E`. Returns how many ran.
    pub fn publish<E: 'static>(&mut self, event: &E) -> usize {
        self.occurred.insert(type_name::<E>().to_string(), true);
        let listeners: Vec<Listener<E>> = match self
            .typed
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<Vec<Listener<E>>>())
        {
            Some(listeners) => listeners.clone(),
            None => {
                if self.warned.insert(TypeId::of::<E>()) {
                    log::warn!(
                        "{}",
                        CoreError::OutOfContract(format!(
                            "event {} published with no subscribers",
                            type_name::<E>()
                        ))
                    );
                }
                return 0;
            }
        };
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Drops every listener of `E`.
    pub fn reset<E: 'static>(&mut self) {
        self.typed.remove(&TypeId::of::<E>());
    }

    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.typed
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<Vec<Listener<E>>>())
            .map_or(0, Vec::len)
    }

    pub fn subscribe_named(&mut self, name: &str, listener: NamedListener) {
        self.named.entry(name.to_string()).or_default().push(listener);
    }

    pub fn publish_named(&mut self, name: &str, payload: &Payload) -> usize {
        self.occurred.insert(name.to_string(), true);
        let listeners = self.named.get(name).cloned().unwrap_or_default();
        if listeners.is_empty() {
            log::debug!("Named event '{name}' has no listeners");
        }
        for listener in &listeners {
            listener(payload);
        }
        listeners.len()
    }

    pub fn mark_occurred(&mut self, name: &str) {
        self.occurred.insert(name.to_string(), true);
    }

    pub fn has_occurred(&self, name: &str) -> bool {
        self.occurred.get(name).copied().unwrap_or(false)
    }

    pub fn set_occurred(&mut self, name: &str, value: bool) {
        self.occurred.insert(name.to_string(), value);
    }

    /// Occurrence flag of a typed event.
    pub fn has_occurred_type<E: 'static>(&self) -> bool {
        self.has_occurred(type_name::<E>())
    }

    pub fn clear_all(&mut self) {
        self.typed.clear();
        self.named.clear();
        self.occurred.clear();
        self.warned.clear();
    }
}
