//! Per-field rule validation bound to a [`FormValues`] store.
//!
//! # Design
//! A `FieldValidator` owns its rules and two derived maps: `errors` (one
//! entry per rule-bearing field, `None` when the field is clean) and `dirty`
//! (explicit "touched" marks). It never writes to the form.
//!
//! On construction the validator watches its form; every mutation batch
//! revalidates exactly the fields the batch changed, before any host watcher
//! of the same batch runs. The watch holds only a weak reference, and
//! dropping the last validator handle removes it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::form::{ChangeSet, FormValues};
use crate::observe::{Observers, SubscriptionId};

/// Maps a field's current value to an optional violation message.
pub type Rule<V = Value> = Box<dyn Fn(&V) -> Option<String>>;

/// Ordered rule lists keyed by field name.
pub struct Rules<V = Value> {
    fields: BTreeMap<String, Vec<Rule<V>>>,
}

impl<V> Rules<V> {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Append one rule to `field`. Rules run in the order they were added.
    pub fn rule(mut self, field: impl Into<String>, rule: impl Fn(&V) -> Option<String> + 'static) -> Self {
        self.fields.entry(field.into()).or_default().push(Box::new(rule));
        self
    }

    /// Append a list of already boxed rules to `field`.
    pub fn field(mut self, field: impl Into<String>, rules: impl IntoIterator<Item = Rule<V>>) -> Self {
        self.fields.entry(field.into()).or_default().extend(rules);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn check(&self, field: &str, value: &V) -> Option<Vec<String>> {
        let rules = self.fields.get(field)?;
        let messages: Vec<String> = rules.iter().filter_map(|rule| rule(value)).collect();
        (!messages.is_empty()).then_some(messages)
    }
}

impl<V> Default for Rules<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Rules<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

/// Owned copy of the validator's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSnapshot {
    pub errors: BTreeMap<String, Option<Vec<String>>>,
    pub dirty: BTreeMap<String, bool>,
    pub is_valid: bool,
}

struct State<V> {
    rules: Rules<V>,
    form: FormValues<V>,
    errors: BTreeMap<String, Option<Vec<String>>>,
    dirty: BTreeMap<String, bool>,
    watch: Option<SubscriptionId>,
    observers: Observers<ValidationSnapshot>,
}

impl<V> State<V> {
    fn is_valid(&self) -> bool {
        self.errors.values().all(Option::is_none)
    }

    fn snapshot(&self) -> ValidationSnapshot {
        ValidationSnapshot {
            errors: self.errors.clone(),
            dirty: self.dirty.clone(),
            is_valid: self.is_valid(),
        }
    }
}

impl<V> Drop for State<V> {
    fn drop(&mut self) {
        if let Some(id) = self.watch.take() {
            self.form.unwatch(id);
        }
    }
}

pub struct FieldValidator<V = Value> {
    state: Rc<RefCell<State<V>>>,
}

impl<V> FieldValidator<V>
where
    V: Clone + PartialEq + Default + 'static,
{
    /// Bind `rules` to `form` and start watching it.
    ///
    /// Every rule-bearing field starts with no errors and not dirty. No rule
    /// runs until a field changes or a `validate_*` method is called.
    pub fn new(rules: Rules<V>, form: &FormValues<V>) -> Self {
        let errors = rules.field_names().map(|f| (f.to_string(), None)).collect();
        let dirty = rules.field_names().map(|f| (f.to_string(), false)).collect();

        let state = Rc::new(RefCell::new(State {
            rules,
            form: form.clone(),
            errors,
            dirty,
            watch: None,
            observers: Observers::new(),
        }));

        let weak: Weak<RefCell<State<V>>> = Rc::downgrade(&state);
        let id = form.watch_first(move |changes: &ChangeSet<V>| {
            if let Some(state) = weak.upgrade() {
                FieldValidator { state }.revalidate(&changes.fields);
            }
        });
        state.borrow_mut().watch = Some(id);

        Self { state }
    }

    /// Run `field`'s rules against its current value. No-op for fields
    /// without rules. A field missing from the form is checked against
    /// `V::default()`.
    pub fn validate_field(&self, field: &str) {
        let outcome = {
            let state = self.state.borrow();
            if !state.rules.contains(field) {
                return;
            }
            let value = state.form.get(field).unwrap_or_default();
            state.rules.check(field, &value)
        };

        let changed = {
            let mut state = self.state.borrow_mut();
            let slot = state.errors.entry(field.to_string()).or_default();
            let changed = *slot != outcome;
            *slot = outcome;
            changed
        };
        debug!(field, changed, "field validated");

        if changed {
            self.notify();
        }
    }

    /// Validate every rule-bearing field. True iff none has errors.
    pub fn validate_all(&self) -> bool {
        let fields: Vec<String> = self
            .state
            .borrow()
            .rules
            .field_names()
            .map(str::to_string)
            .collect();
        for field in &fields {
            self.validate_field(field);
        }
        self.is_valid()
    }

    fn revalidate(&self, fields: &[String]) {
        debug!(?fields, "form values changed");
        for field in fields {
            self.validate_field(field);
        }
    }
}

impl<V> FieldValidator<V> {
    /// Mark `field` as interacted with. Does not validate.
    pub fn touch(&self, field: &str) {
        let changed = {
            let mut state = self.state.borrow_mut();
            state.dirty.insert(field.to_string(), true) != Some(true)
        };
        if changed {
            self.notify();
        }
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.state.borrow().dirty.get(field).copied().unwrap_or(false)
    }

    /// True iff no field currently has errors.
    pub fn is_valid(&self) -> bool {
        self.state.borrow().is_valid()
    }

    pub fn errors_for(&self, field: &str) -> Option<Vec<String>> {
        self.state.borrow().errors.get(field).cloned().flatten()
    }

    pub fn errors(&self) -> BTreeMap<String, Option<Vec<String>>> {
        self.state.borrow().errors.clone()
    }

    pub fn dirty(&self) -> BTreeMap<String, bool> {
        self.state.borrow().dirty.clone()
    }

    pub fn snapshot(&self) -> ValidationSnapshot {
        self.state.borrow().snapshot()
    }

    pub fn form(&self) -> FormValues<V> {
        self.state.borrow().form.clone()
    }

    /// Register a callback that runs whenever `errors` or `dirty` change.
    pub fn subscribe(&self, observer: impl Fn(&ValidationSnapshot) + 'static) -> SubscriptionId {
        self.state.borrow_mut().observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.borrow_mut().observers.unsubscribe(id)
    }

    fn notify(&self) {
        let (snapshot, callbacks) = {
            let state = self.state.borrow();
            if state.observers.is_empty() {
                return;
            }
            (state.snapshot(), state.observers.callbacks())
        };
        for callback in callbacks {
            callback(&snapshot);
        }
    }
}

impl<V> Clone for FieldValidator<V> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<V> fmt::Debug for FieldValidator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FieldValidator")
            .field("rules", &state.rules)
            .field("errors", &state.errors)
            .field("dirty", &state.dirty)
            .finish()
    }
}
