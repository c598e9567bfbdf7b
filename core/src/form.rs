//! Shared, observable store of form values.
//!
//! # Design
//! `FormValues` is a cheap `Clone` handle; every clone sees the same map.
//! Each mutation batch (`set`, `remove`, `update`) compares the map before and
//! after, key by key, and notifies watchers with the names of the fields that
//! changed. A batch that changes nothing notifies no one.
//!
//! Watchers run after the map's borrow is released, so they may read the
//! store (or even mutate it again) from inside the callback. Validator
//! watches run first, then host watches in registration order.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::observe::{Observers, SubscriptionId};

/// Fields touched by one mutation batch, plus the map as it stands after it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet<V = Value> {
    pub fields: Vec<String>,
    pub values: BTreeMap<String, V>,
}

impl<V> ChangeSet<V> {
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

struct Shared<V> {
    values: RefCell<BTreeMap<String, V>>,
    watchers: RefCell<Observers<ChangeSet<V>>>,
}

pub struct FormValues<V = Value> {
    shared: Rc<Shared<V>>,
}

impl<V> FormValues<V> {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                values: RefCell::new(BTreeMap::new()),
                watchers: RefCell::new(Observers::new()),
            }),
        }
    }

    pub fn unwatch(&self, id: SubscriptionId) -> bool {
        self.shared.watchers.borrow_mut().unsubscribe(id)
    }

    pub fn watcher_count(&self) -> usize {
        self.shared.watchers.borrow().len()
    }

    pub fn len(&self) -> usize {
        self.shared.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.values.borrow().is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.shared.values.borrow().contains_key(field)
    }
}

impl<V: Clone + PartialEq> FormValues<V> {
    pub fn get(&self, field: &str) -> Option<V> {
        self.shared.values.borrow().get(field).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, V> {
        self.shared.values.borrow().clone()
    }

    pub fn set(&self, field: impl Into<String>, value: V) {
        let field = field.into();
        self.update(move |values| {
            values.insert(field, value);
        });
    }

    pub fn remove(&self, field: &str) -> Option<V> {
        self.update(|values| values.remove(field))
    }

    /// Mutate several fields as one batch; watchers fire once afterwards.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut BTreeMap<String, V>) -> R) -> R {
        let (result, changes) = {
            let mut values = self.shared.values.borrow_mut();
            let before = values.clone();
            let result = mutate(&mut *values);
            let fields = changed_fields(&before, &*values);
            let changes = (!fields.is_empty()).then(|| ChangeSet {
                fields,
                values: values.clone(),
            });
            (result, changes)
        };

        if let Some(changes) = changes {
            let callbacks = self.shared.watchers.borrow().callbacks();
            for callback in callbacks {
                callback(&changes);
            }
        }
        result
    }

    pub fn watch(&self, watcher: impl Fn(&ChangeSet<V>) + 'static) -> SubscriptionId {
        self.shared.watchers.borrow_mut().subscribe(watcher)
    }

    /// Like `watch`, but the watcher runs before every `watch`er of the same
    /// batch, whenever it was registered. Used by `FieldValidator`.
    pub(crate) fn watch_first(&self, watcher: impl Fn(&ChangeSet<V>) + 'static) -> SubscriptionId {
        self.shared.watchers.borrow_mut().subscribe_first(watcher)
    }
}

/// Keys whose value differs between the two maps, including keys present in
/// only one of them.
fn changed_fields<V: PartialEq>(before: &BTreeMap<String, V>, after: &BTreeMap<String, V>) -> Vec<String> {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter(|key| before.get(*key) != after.get(*key))
        .cloned()
        .collect()
}

impl<V> Clone for FormValues<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<V> Default for FormValues<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for FormValues<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let form = Self::new();
        form.shared
            .values
            .borrow_mut()
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
        form
    }
}

impl<V: fmt::Debug> fmt::Debug for FormValues<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValues")
            .field("values", &*self.shared.values.borrow())
            .field("watchers", &self.shared.watchers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn recording(form: &FormValues) -> Rc<RefCell<Vec<Vec<String>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        form.watch(move |changes| sink.borrow_mut().push(changes.fields.clone()));
        log
    }

    #[test]
    fn set_notifies_with_the_changed_field() {
        let form: FormValues = [("age", json!(16))].into_iter().collect();
        let log = recording(&form);

        form.set("age", json!(20));
        assert_eq!(*log.borrow(), vec![vec!["age".to_string()]]);
        assert_eq!(form.get("age"), Some(json!(20)));
    }

    #[test]
    fn setting_an_equal_value_is_silent() {
        let form: FormValues = [("age", json!(16))].into_iter().collect();
        let log = recording(&form);

        form.set("age", json!(16));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn nested_values_compare_structurally() {
        let form: FormValues = [("address", json!({"city": "Oslo"}))].into_iter().collect();
        let log = recording(&form);

        form.set("address", json!({"city": "Oslo"}));
        assert!(log.borrow().is_empty());

        form.set("address", json!({"city": "Bergen"}));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn update_batches_report_only_changed_fields() {
        let form: FormValues = [("name", json!("Ada")), ("age", json!(16)), ("email", json!(""))]
            .into_iter()
            .collect();
        let log = recording(&form);

        form.update(|values| {
            values.insert("age".to_string(), json!(20));
            values.insert("name".to_string(), json!("Ada"));
            values.insert("email".to_string(), json!("ada@example.com"));
        });
        assert_eq!(
            *log.borrow(),
            vec![vec!["age".to_string(), "email".to_string()]]
        );
    }

    #[test]
    fn removal_counts_as_a_change() {
        let form: FormValues = [("age", json!(16))].into_iter().collect();
        let log = recording(&form);

        assert_eq!(form.remove("age"), Some(json!(16)));
        assert_eq!(form.remove("age"), None);
        assert_eq!(*log.borrow(), vec![vec!["age".to_string()]]);
        assert!(form.is_empty());
    }

    #[test]
    fn clones_share_the_same_store() {
        let form: FormValues = FormValues::new();
        let other = form.clone();
        other.set("name", json!("Grace"));
        assert_eq!(form.get("name"), Some(json!("Grace")));
        assert_eq!(form.len(), 1);
    }

    #[test]
    fn watchers_may_read_and_write_the_store() {
        let form: FormValues = FormValues::new();
        let inner = form.clone();
        form.watch(move |changes| {
            if changes.contains("email") {
                let email = inner.get("email").unwrap_or_default();
                inner.set("email_lower", json!(email.as_str().unwrap_or("").to_lowercase()));
            }
        });

        form.set("email", json!("Ada@Example.com"));
        assert_eq!(form.get("email_lower"), Some(json!("ada@example.com")));
    }

    #[test]
    fn priority_watchers_run_first() {
        let form: FormValues = FormValues::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&order);
        form.watch(move |_| sink.borrow_mut().push("host"));
        let sink = Rc::clone(&order);
        let id = form.watch_first(move |_| sink.borrow_mut().push("validator"));

        form.set("a", json!(1));
        assert_eq!(*order.borrow(), vec!["validator", "host"]);

        assert!(form.unwatch(id));
        assert_eq!(form.watcher_count(), 1);
    }

    #[test]
    fn unwatch_stops_notifications() {
        let form: FormValues = FormValues::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        let id = form.watch(move |_| *counter.borrow_mut() += 1);

        form.set("a", json!(1));
        assert!(form.unwatch(id));
        form.set("a", json!(2));
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(form.watcher_count(), 0);
    }
}
