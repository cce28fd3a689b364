//! Turn the model's JSON answer into an ordered tag list.
//!
//! The model is asked for an object like `{"1": "beach", "2": "sunset"}`.
//! Keys only exist to make the model number its answers, so they are dropped.
//! Values are kept in document order, which is why the object is walked with
//! a visitor instead of being decoded into a `HashMap`. A side index maps each
//! key to its slot so repeated keys are resolved in constant time.

use std::collections::hash_map::{Entry, HashMap};
use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::error::PipelineError;
use crate::types::TagList;

/// Parses raw model output into tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagExtractor;

impl TagExtractor {
    /// Extract tag values from a JSON object of strings.
    ///
    /// Fails with `MalformedModelResponse` if `raw` is not a JSON object or
    /// if any value is not a string. Tag content is passed through as-is.
    pub fn extract(&self, raw: &str) -> Result<TagList, PipelineError> {
        let TagValues(tags) =
            serde_json::from_str(raw).map_err(|e| PipelineError::MalformedModelResponse {
                message: e.to_string(),
            })?;
        Ok(tags)
    }
}

/// Values of a flat string-to-string JSON object, in document order.
struct TagValues(TagList);

impl<'de> Deserialize<'de> for TagValues {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TagValuesVisitor)
    }
}

struct TagValuesVisitor;

impl<'de> Visitor<'de> for TagValuesVisitor {
    type Value = TagValues;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object whose values are tag strings")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let capacity = map.size_hint().unwrap_or(0);
        let mut tags = TagList::with_capacity(capacity);
        let mut slots: HashMap<String, usize> = HashMap::with_capacity(capacity);
        while let Some((key, tag)) = map.next_entry::<String, String>()? {
            // A repeated key overwrites the earlier value but keeps its slot
            match slots.entry(key) {
                Entry::Occupied(slot) => tags[*slot.get()] = tag,
                Entry::Vacant(slot) => {
                    slot.insert(tags.len());
                    tags.push(tag);
                }
            }
        }
        Ok(TagValues(tags))
    }
}
