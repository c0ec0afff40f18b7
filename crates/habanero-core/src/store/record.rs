//! Stored form of a business object.

use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;
use crate::id::ObjectId;
use crate::value::Value;

/// One named property value.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StoredField {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: Value,
}

/// A business object as written to a data store.
///
/// The primary key is carried as `id` and not repeated in `fields`.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Object id.
    pub id: ObjectId,
    /// Class name.
    pub class: String,
    /// Property values.
    pub fields: Vec<StoredField>,
}

impl StoredRecord {
    /// Create an empty record.
    pub fn new(class: impl Into<String>, id: ObjectId) -> Self {
        Self {
            id,
            class: class.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Set a field value, adding the field if absent.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(StoredField { name, value }),
        }
    }

    /// Value of a field, treating the id as the primary key field.
    pub(crate) fn value_or_id(&self, name: &str, primary_key: &str) -> Value {
        if name == primary_key {
            Value::from(self.id)
        } else {
            self.get(name).cloned().unwrap_or(Value::Null)
        }
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // sled hands out unaligned buffers
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_bytes() {
        let record = StoredRecord::new("ContactPerson", ObjectId::generate())
            .with_field("Surname", "Smith")
            .with_field("Age", 42i32)
            .with_field("OrganisationID", Value::Null);
        let bytes = record.to_bytes().unwrap();
        let decoded = StoredRecord::from_bytes(&bytes).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_garbage_bytes() {
        let err = StoredRecord::from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_set_replaces() {
        let mut record = StoredRecord::new("Car", ObjectId::generate()).with_field("Make", "Ford");
        record.set("Make", Value::from("Fiat"));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.get("Make"), Some(&Value::from("Fiat")));
        assert_eq!(record.value_or_id("CarID", "CarID"), Value::from(record.id));
        assert_eq!(record.value_or_id("Colour", "CarID"), Value::Null);
    }
}
