//! Copying objects from one lopdf document into another.

use std::collections::HashMap;

use lopdf::{Document, Object, ObjectId};

/// Imports objects from `source` into `target`, giving each copied object a
/// fresh id in the target. An object reachable several times is copied once.
pub(crate) struct ObjectImporter<'a> {
    source: &'a Document,
    target: &'a mut Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectImporter<'a> {
    pub(crate) fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            copied: HashMap::new(),
        }
    }

    /// Import a direct object, following every reference it holds.
    pub(crate) fn import(&mut self, obj: &Object) -> lopdf::Result<Object> {
        match obj {
            Object::Reference(id) => Ok(Object::Reference(self.import_id(*id)?)),
            Object::Array(items) => Ok(Object::Array(
                items
                    .iter()
                    .map(|item| self.import(item))
                    .collect::<lopdf::Result<Vec<_>>>()?,
            )),
            Object::Dictionary(dict) => {
                let mut dict = dict.clone();
                for (_, value) in dict.iter_mut() {
                    *value = self.import(value)?;
                }
                Ok(Object::Dictionary(dict))
            }
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                for (_, value) in stream.dict.iter_mut() {
                    *value = self.import(value)?;
                }
                Ok(Object::Stream(stream))
            }
            other => Ok(other.clone()),
        }
    }

    fn import_id(&mut self, id: ObjectId) -> lopdf::Result<ObjectId> {
        if let Some(new_id) = self.copied.get(&id) {
            return Ok(*new_id);
        }

        // Reserve the id first so reference cycles resolve to it.
        let new_id = self.target.add_object(Object::Null);
        self.copied.insert(id, new_id);

        let source = self.source;
        let imported = self.import(source.get_object(id)?)?;
        self.target.objects.insert(new_id, imported);

        Ok(new_id)
    }
}
