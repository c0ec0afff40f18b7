//! Property values with per-property dirty tracking.

use crate::catalog::ClassDef;
use crate::value::Value;

/// One property of a business object.
#[derive(Debug, Clone, PartialEq)]
pub struct BoProp {
    name: String,
    value: Value,
    persisted_value: Value,
}

impl BoProp {
    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Value as last loaded or saved. For unsaved objects, the initial value.
    pub fn persisted_value(&self) -> &Value {
        &self.persisted_value
    }

    /// Whether the current value differs from the persisted one.
    pub fn is_dirty(&self) -> bool {
        self.value != self.persisted_value
    }
}

/// The property bag of a business object, in class definition order.
#[derive(Debug, Clone)]
pub struct BoPropCol {
    props: Vec<BoProp>,
}

impl BoPropCol {
    /// Property bag of a new object, holding initial values.
    pub(crate) fn initial(class: &ClassDef) -> Self {
        Self {
            props: class
                .props
                .iter()
                .map(|def| {
                    let value = def.initial_value();
                    BoProp {
                        name: def.name.clone(),
                        persisted_value: value.clone(),
                        value,
                    }
                })
                .collect(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&BoProp> {
        self.props.iter().find(|p| p.name == name)
    }

    /// Replace the current value. Returns whether it changed.
    pub(crate) fn set(&mut self, name: &str, value: Value) -> bool {
        match self.props.iter_mut().find(|p| p.name == name) {
            Some(prop) if prop.value != value => {
                prop.value = value;
                true
            }
            _ => false,
        }
    }

    /// Set both current and persisted values, as when loading.
    pub(crate) fn load(&mut self, name: &str, value: Value) {
        if let Some(prop) = self.props.iter_mut().find(|p| p.name == name) {
            prop.persisted_value = value.clone();
            prop.value = value;
        }
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, BoProp> {
        self.props.iter()
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.props.iter().any(BoProp::is_dirty)
    }

    pub(crate) fn dirty_names(&self) -> Vec<&str> {
        self.props
            .iter()
            .filter(|p| p.is_dirty())
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Revert every property to its persisted value.
    pub(crate) fn revert_all(&mut self) {
        for prop in &mut self.props {
            prop.value = prop.persisted_value.clone();
        }
    }

    /// Revert the named properties to their persisted values.
    pub(crate) fn revert(&mut self, names: &[&str]) {
        for prop in self.props.iter_mut().filter(|p| names.contains(&p.name.as_str())) {
            prop.value = prop.persisted_value.clone();
        }
    }

    /// Accept current values as persisted.
    pub(crate) fn mark_all_persisted(&mut self) {
        for prop in &mut self.props {
            prop.persisted_value = prop.value.clone();
        }
    }

    /// Accept the named properties' current values as persisted.
    pub(crate) fn mark_persisted(&mut self, names: &[&str]) {
        for prop in self.props.iter_mut().filter(|p| names.contains(&p.name.as_str())) {
            prop.persisted_value = prop.value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PropDef, PropType};

    fn props() -> BoPropCol {
        let class = ClassDef::new("Person", "PersonID")
            .with_prop(PropDef::new("Name", PropType::String))
            .with_prop(PropDef::new("Age", PropType::Int32).with_default(18));
        BoPropCol::initial(&class)
    }

    #[test]
    fn test_dirty_tracking() {
        let mut props = props();
        assert!(!props.is_dirty());
        assert_eq!(props.get("Age").unwrap().value(), &Value::Int32(18));

        assert!(props.set("Name", Value::from("Ann")));
        assert!(!props.set("Name", Value::from("Ann")));
        assert_eq!(props.dirty_names(), vec!["Name"]);

        props.set("Name", Value::Null);
        assert!(!props.is_dirty());
    }

    #[test]
    fn test_partial_persist_and_revert() {
        let mut props = props();
        props.set("Name", Value::from("Ann"));
        props.set("Age", Value::Int32(40));

        props.mark_persisted(&["Name"]);
        assert_eq!(props.dirty_names(), vec!["Age"]);

        props.revert(&["Age"]);
        assert!(!props.is_dirty());
        assert_eq!(props.get("Name").unwrap().persisted_value(), &Value::from("Ann"));
    }
}
