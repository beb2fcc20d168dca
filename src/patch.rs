//! Manual JSON patches
//!
//! Some upstream quirks are one-off and are fixed by hand. A patch file is named
//! after the namespace it applies to (`<namespace>.json`) and maps path
//! expressions to values:
//!
//! ```json
//! {
//!     "functions.%query.parameters.%details.optional": true,
//!     "types.$Tab.properties.+[]": [],
//!     "functions.-[]": ["%removeCSS", "#0"],
//!     "functions.%captureTab.!fixAsync": "dataUrl:string",
//!     "types.$Obsolete": null
//! }
//! ```
//!
//! Path segments are separated by `.`. A plain segment is an object key, `$id`
//! selects the array element with that `id`, `%name` the one with that `name`
//! and `#N` the element at index `N`. The last segment may be one of the special
//! forms `+[]` (append), `-[]` (remove by selectors) or `!fixAsync` (turn
//! `async: true` into an explicit callback parameter).
//!
//! Patches are applied to the JSON form of a namespace entry, which is then
//! classified again.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use walkdir::WalkDir;

use crate::error::{Result, SchemaError};
use crate::schema::SchemaEntry;

/// Path expressions and their values, in file order
pub type PatchFile = IndexMap<String, Value>;

/// All patch files of one directory, keyed by namespace
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    files: IndexMap<String, PatchFile>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<namespace>.json` in `dir`. A missing directory is an empty set.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut set = Self::new();
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no patch directory");
            return Ok(set);
        }

        for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| SchemaError::Io(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(namespace) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(path)?;
            let deserializer = &mut serde_json::Deserializer::from_str(&content);
            let patches: PatchFile = serde_path_to_error::deserialize(deserializer).map_err(|e| SchemaError::Parse {
                file: path.display().to_string(),
                path: e.path().to_string(),
                message: e.inner().to_string(),
            })?;
            set.insert(namespace, patches);
        }

        tracing::debug!(dir = %dir.display(), files = set.len(), "loaded patch files");
        Ok(set)
    }

    pub fn insert(&mut self, namespace: impl Into<String>, patches: PatchFile) {
        self.files.insert(namespace.into(), patches);
    }

    pub fn get(&self, namespace: &str) -> Option<&PatchFile> {
        self.files.get(namespace)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Apply a patch file to an entry and classify the result again
pub fn apply_patches(entry: SchemaEntry, patches: &PatchFile) -> Result<SchemaEntry> {
    let mut value = entry.to_value()?;
    for (path, patch) in patches {
        apply_patch(&mut value, path, patch.clone())?;
        tracing::debug!(namespace = %entry.namespace, path = %path, "applied patch");
    }
    SchemaEntry::from_value(value)
}

/// Apply a single path expression to a JSON document
pub fn apply_patch(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        return Err(SchemaError::patch(path, "empty path"));
    };

    let mut base = root;
    for part in parents {
        base = descend(base, part, path)?;
        if !base.is_array() && !base.is_object() {
            return Err(SchemaError::patch(path, format!("'{part}' is neither an array nor an object")));
        }
    }

    match *last {
        "+[]" => append(base, value, path),
        "-[]" => remove_selected(base, value, path),
        "!fixAsync" => fix_async(base, value, path),
        _ if value.is_null() && base.is_array() => remove_element(base, last, path),
        "$ref" => set_key(base, last, value, path),
        _ => assign(base, last, value, path),
    }
}

/// A `$id`, `%name` or `#N` selector
enum Selector<'a> {
    Id(&'a str),
    Name(&'a str),
    Index(&'a str),
}

impl<'a> Selector<'a> {
    fn parse(segment: &'a str) -> Option<Self> {
        if let Some(id) = segment.strip_prefix('$') {
            Some(Selector::Id(id))
        } else if let Some(name) = segment.strip_prefix('%') {
            Some(Selector::Name(name))
        } else {
            segment.strip_prefix('#').map(Selector::Index)
        }
    }

    /// Index of the selected element in `array`
    fn resolve(&self, array: &[Value], path: &str) -> Result<usize> {
        match self {
            Selector::Id(id) => find_by(array, "id", id)
                .ok_or_else(|| SchemaError::patch(path, format!("Could not find element with id '{id}'"))),
            Selector::Name(name) => find_by(array, "name", name)
                .ok_or_else(|| SchemaError::patch(path, format!("Could not find element with name '{name}'"))),
            Selector::Index(index) => {
                let index: usize = index
                    .parse()
                    .map_err(|_| SchemaError::patch(path, format!("Invalid index '{index}'")))?;
                if index >= array.len() {
                    return Err(SchemaError::patch(path, format!("Index {index} out of bounds")));
                }
                Ok(index)
            }
        }
    }
}

fn find_by(array: &[Value], field: &str, wanted: &str) -> Option<usize> {
    array
        .iter()
        .position(|e| e.get(field).and_then(Value::as_str) == Some(wanted))
}

fn as_array<'v>(base: &'v mut Value, path: &str) -> Result<&'v mut Vec<Value>> {
    base.as_array_mut()
        .ok_or_else(|| SchemaError::patch(path, "expected an array"))
}

fn as_object<'v>(base: &'v mut Value, path: &str) -> Result<&'v mut Map<String, Value>> {
    base.as_object_mut()
        .ok_or_else(|| SchemaError::patch(path, "expected an object"))
}

fn descend<'v>(base: &'v mut Value, part: &str, path: &str) -> Result<&'v mut Value> {
    match Selector::parse(part) {
        Some(selector) => {
            let array = as_array(base, path)?;
            let index = selector.resolve(array, path)?;
            Ok(&mut array[index])
        }
        None => as_object(base, path)?
            .get_mut(part)
            .ok_or_else(|| SchemaError::patch(path, format!("Missing key '{part}'"))),
    }
}

fn append(base: &mut Value, value: Value, path: &str) -> Result<()> {
    let target = as_array(base, path)?;
    match value {
        Value::Array(items) => {
            target.extend(items);
            Ok(())
        }
        _ => Err(SchemaError::patch(path, "+[] expects an array value")),
    }
}

fn remove_selected(base: &mut Value, value: Value, path: &str) -> Result<()> {
    let target = as_array(base, path)?;
    let Value::Array(selectors) = value else {
        return Err(SchemaError::patch(path, "-[] expects an array of selectors"));
    };

    let mut indices = BTreeSet::new();
    for selector in &selectors {
        let text = selector
            .as_str()
            .ok_or_else(|| SchemaError::patch(path, format!("Selector must be a string: {selector}")))?;
        let index = Selector::parse(text)
            .ok_or_else(|| SchemaError::patch(path, format!("Unknown selector: {text}")))?
            .resolve(target, path)?;
        if !indices.insert(index) {
            return Err(SchemaError::patch(path, format!("Selector {text} selects an element twice")));
        }
    }

    for index in indices.into_iter().rev() {
        target.remove(index);
    }
    Ok(())
}

fn fix_async(base: &mut Value, value: Value, path: &str) -> Result<()> {
    let function = as_object(base, path)?;
    if function.get("async") != Some(&Value::Bool(true)) {
        return Err(SchemaError::patch(path, "!fixAsync expects a function with async: true"));
    }

    let callback_parameters = match value.as_str().filter(|s| !s.is_empty()) {
        Some(parameter) => match parameter.split_once(':') {
            Some((name, kind)) => vec![json!({ "name": name, "type": kind })],
            None => vec![json!({ "name": parameter })],
        },
        None => Vec::new(),
    };

    let parameters = function
        .get_mut("parameters")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| SchemaError::patch(path, "!fixAsync expects a parameters array"))?;
    parameters.push(json!({
        "type": "function",
        "name": "callback",
        "parameters": callback_parameters,
    }));
    function.insert("async".to_string(), Value::from("callback"));
    Ok(())
}

fn remove_element(base: &mut Value, last: &str, path: &str) -> Result<()> {
    let target = as_array(base, path)?;
    let index = match Selector::parse(last) {
        Some(selector @ (Selector::Id(_) | Selector::Name(_))) => selector.resolve(target, path)?,
        _ => {
            return Err(SchemaError::patch(
                path,
                format!("Unknown method to remove from array: {last}"),
            ))
        }
    };
    target.remove(index);
    Ok(())
}

fn set_key(base: &mut Value, key: &str, value: Value, path: &str) -> Result<()> {
    as_object(base, path)?.insert(key.to_string(), value);
    Ok(())
}

fn assign(base: &mut Value, last: &str, value: Value, path: &str) -> Result<()> {
    match Selector::parse(last) {
        Some(selector) => {
            let target = as_array(base, path)?;
            let index = selector.resolve(target, path)?;
            target[index] = value;
            Ok(())
        }
        None => set_key(base, last, value, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Value {
        json!({
            "namespace": "tabs",
            "functions": [
                { "name": "get", "type": "function", "async": true, "parameters": [] },
                { "name": "query", "type": "function", "parameters": [{ "name": "info", "type": "object" }] },
                { "name": "remove", "type": "function", "parameters": [] }
            ],
            "types": [{ "id": "Tab", "type": "object", "properties": {} }]
        })
    }

    fn names(value: &Value) -> Vec<&str> {
        value["functions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_remove_by_index_in_any_order() {
        for selectors in [json!(["#0", "#2"]), json!(["#2", "#0"])] {
            let mut value = doc();
            apply_patch(&mut value, "functions.-[]", selectors).unwrap();
            assert_eq!(names(&value), vec!["query"]);
        }
    }

    #[test]
    fn test_remove_mixed_selectors() {
        let mut value = doc();
        apply_patch(&mut value, "functions.-[]", json!(["%remove", "#0"])).unwrap();
        assert_eq!(names(&value), vec!["query"]);
    }

    #[test]
    fn test_remove_rejects_duplicate_and_unknown_selectors() {
        let mut value = doc();
        assert!(apply_patch(&mut value, "functions.-[]", json!(["#0", "%get"])).is_err());
        assert!(apply_patch(&mut value, "functions.-[]", json!(["get"])).is_err());
        assert!(apply_patch(&mut value, "functions.-[]", json!(["#3"])).is_err());
        assert_eq!(names(&value).len(), 3);
    }

    #[test]
    fn test_append() {
        let mut value = doc();
        apply_patch(&mut value, "functions.+[]", json!([{ "name": "create", "type": "function" }])).unwrap();
        assert_eq!(names(&value), vec!["get", "query", "remove", "create"]);
    }

    #[test]
    fn test_fix_async() {
        let mut value = doc();
        apply_patch(&mut value, "functions.%get.!fixAsync", json!("tab:object")).unwrap();
        let get = &value["functions"][0];
        assert_eq!(get["async"], "callback");
        assert_eq!(
            get["parameters"][0],
            json!({ "type": "function", "name": "callback", "parameters": [{ "name": "tab", "type": "object" }] })
        );

        let err = apply_patch(&mut value, "functions.%query.!fixAsync", Value::Null).unwrap_err();
        assert!(matches!(err, SchemaError::Patch { .. }));
    }

    #[test]
    fn test_null_deletes_selected_element() {
        let mut value = doc();
        apply_patch(&mut value, "functions.%query", Value::Null).unwrap();
        assert_eq!(names(&value), vec!["get", "remove"]);
        assert!(apply_patch(&mut value, "functions.#0", Value::Null).is_err());
    }

    #[test]
    fn test_replace_and_assign() {
        let mut value = doc();
        apply_patch(&mut value, "types.$Tab.$ref", json!("other.Tab")).unwrap();
        assert_eq!(value["types"][0]["$ref"], "other.Tab");

        apply_patch(&mut value, "functions.%query.parameters.%info.optional", json!(true)).unwrap();
        assert_eq!(value["functions"][1]["parameters"][0]["optional"], true);

        apply_patch(&mut value, "functions.#1", json!({ "name": "replaced" })).unwrap();
        assert_eq!(names(&value), vec!["get", "replaced", "remove"]);

        apply_patch(&mut value, "types.$Tab", json!({ "id": "Tab", "type": "string" })).unwrap();
        assert_eq!(value["types"][0]["type"], "string");
    }

    #[test]
    fn test_addressing_errors() {
        let mut value = doc();
        assert!(apply_patch(&mut value, "functions.#9.name", json!("x")).is_err());
        assert!(apply_patch(&mut value, "functions.$missing.name", json!("x")).is_err());
        assert!(apply_patch(&mut value, "namespace.name", json!("x")).is_err());
        assert!(apply_patch(&mut value, "nothing.name", json!("x")).is_err());
    }

    #[test]
    fn test_apply_patches_reclassifies() {
        let entry = SchemaEntry::from_value(doc()).unwrap();
        let mut patches = PatchFile::new();
        patches.insert("types.$Tab.properties.id".to_string(), json!({ "$ref": "TabId" }));
        let entry = apply_patches(entry, &patches).unwrap();
        let tab = entry.find_type("Tab").unwrap();
        let id = &tab.as_object().unwrap().properties.as_ref().unwrap()["id"];
        assert!(matches!(id.kind, crate::schema::PropertyKind::Ref));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tabs.json"), r#"{ "functions.%get.async": false }"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = PatchSet::load_dir(dir.path()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("tabs").unwrap()["functions.%get.async"], json!(false));

        let missing = PatchSet::load_dir(&dir.path().join("absent")).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_load_dir_reports_json_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tabs.json"), r#"{ "a": 1, "b": }"#).unwrap();
        assert!(matches!(PatchSet::load_dir(dir.path()), Err(SchemaError::Parse { .. })));
    }
}
