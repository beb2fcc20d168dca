//! Schema data model
//!
//! Typed view of the extension API schema files. Every JSON file holds a list of
//! [`SchemaEntry`] values, one per namespace. Types, functions, events and
//! properties inside an entry are all [`SchemaProperty`] nodes: the fields shared
//! by every node live in [`PropertyCommon`], the fields that depend on the `type`
//! tag live in the [`PropertyKind`] payload.
//!
//! Nodes are never deserialized field-by-field from raw JSON. Both directions go
//! through [`classify`], which picks the variant (guessing the tag when the source
//! omits it) and rejects keys the variant does not know.

pub mod classify;

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::visitor::NodeKind;

// =============================================================================
// Flags
// =============================================================================

/// The `optional` marker. Sources spell it as a boolean, as the strings
/// `"true"`/`"false"`, or as `"omit-key-if-missing"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optional {
    #[default]
    No,
    Yes,
    OmitKeyIfMissing,
}

impl Optional {
    pub fn is_optional(&self) -> bool {
        !matches!(self, Optional::No)
    }

    fn is_no(&self) -> bool {
        matches!(self, Optional::No)
    }
}

impl Serialize for Optional {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Optional::No => serializer.serialize_bool(false),
            Optional::Yes => serializer.serialize_bool(true),
            Optional::OmitKeyIfMissing => serializer.serialize_str("omit-key-if-missing"),
        }
    }
}

impl<'de> Deserialize<'de> for Optional {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(true) => Ok(Optional::Yes),
            Value::Bool(false) => Ok(Optional::No),
            Value::String(s) if s == "true" => Ok(Optional::Yes),
            Value::String(s) if s == "false" => Ok(Optional::No),
            Value::String(s) if s == "omit-key-if-missing" => Ok(Optional::OmitKeyIfMissing),
            other => Err(de::Error::custom(format!("invalid optional marker: {other}"))),
        }
    }
}

/// `deprecated` is either a flag or a message explaining the replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Deprecated {
    Flag(bool),
    Message(String),
}

impl Deprecated {
    pub fn is_set(&self) -> bool {
        match self {
            Deprecated::Flag(flag) => *flag,
            Deprecated::Message(message) => !message.is_empty(),
        }
    }
}

/// Accepts `true`/`false` and their string spellings
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        other => Err(de::Error::custom(format!("invalid flag: {other}"))),
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// How a function delivers its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AsyncKind {
    Flag(bool),
    Style(CallbackStyle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallbackStyle {
    Callback,
    ResponseCallback,
}

/// A member of a string `enum`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Plain(String),
    Described {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl EnumValue {
    pub fn name(&self) -> &str {
        match self {
            EnumValue::Plain(name) => name,
            EnumValue::Described { name, .. } => name,
        }
    }
}

// =============================================================================
// Common fields
// =============================================================================

/// Fields every schema node may carry, whatever its tag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "$extend", default, skip_serializing_if = "Option::is_none")]
    pub extend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Optional::is_no")]
    pub optional: Optional,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipable_parameter: bool,
    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub unsupported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_contexts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(rename = "inline_doc", default, skip_serializing_if = "Option::is_none")]
    pub inline_doc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodoc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocess: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postprocess: Option<String>,
    #[serde(rename = "min_manifest_version", default, skip_serializing_if = "Option::is_none")]
    pub min_manifest_version: Option<u32>,
    #[serde(rename = "max_manifest_version", default, skip_serializing_if = "Option::is_none")]
    pub max_manifest_version: Option<u32>,
}

impl PropertyCommon {
    pub const KEYS: &'static [&'static str] = &[
        "id",
        "name",
        "$ref",
        "$extend",
        "description",
        "optional",
        "optionalNull",
        "skipableParameter",
        "unsupported",
        "deprecated",
        "permissions",
        "allowedContexts",
        "onError",
        "inline_doc",
        "nodoc",
        "preprocess",
        "postprocess",
        "min_manifest_version",
        "max_manifest_version",
    ];

    /// Unsupported or deprecated nodes are purged from the output
    pub fn is_flagged(&self) -> bool {
        self.unsupported || self.deprecated.as_ref().is_some_and(Deprecated::is_set)
    }
}

// =============================================================================
// Variant payloads
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoicesProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ChoicesProperty {
    pub const KEYS: &'static [&'static str] = &["choices", "default"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueProperty {
    pub value: Value,
}

impl ValueProperty {
    pub const KEYS: &'static [&'static str] = &["value"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringProperty {
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<EnumValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl StringProperty {
    pub const KEYS: &'static [&'static str] =
        &["enum", "minLength", "maxLength", "pattern", "format", "default"];

    pub fn enumeration(values: Vec<EnumValue>) -> Self {
        Self {
            enumeration: Some(values),
            ..Self::default()
        }
    }
}

/// `additionalProperties` is either a switch or the schema of the map values
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaProperty>),
}

impl AdditionalProperties {
    pub fn schema(&self) -> Option<&SchemaProperty> {
        match self {
            AdditionalProperties::Schema(schema) => Some(schema),
            AdditionalProperties::Allowed(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for AdditionalProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Bool(allowed) => Ok(AdditionalProperties::Allowed(allowed)),
            other => classify::classify(other)
                .map(|schema| AdditionalProperties::Schema(Box::new(schema)))
                .map_err(de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<IndexMap<String, SchemaProperty>>,
    #[serde(rename = "$import", default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_instance_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ObjectProperty {
    pub const KEYS: &'static [&'static str] = &[
        "properties",
        "additionalProperties",
        "patternProperties",
        "$import",
        "isInstanceOf",
        "functions",
        "events",
        "default",
    ];

    pub fn has_properties(&self) -> bool {
        self.properties.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Schema of the map values, when `additionalProperties` is a schema
    pub fn additional_schema(&self) -> Option<&SchemaProperty> {
        self.additional_properties.as_ref().and_then(AdditionalProperties::schema)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl NumberProperty {
    pub const KEYS: &'static [&'static str] = &["minimum", "maximum", "default"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl BooleanProperty {
    pub const KEYS: &'static [&'static str] = &["default"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ArrayProperty {
    pub const KEYS: &'static [&'static str] = &["items", "minItems", "maxItems", "default"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionProperty {
    #[serde(rename = "async", default, skip_serializing_if = "Option::is_none")]
    pub asynchronous: Option<AsyncKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_user_input: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_parameters: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Box<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ambiguous_optional_arguments: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_cross_origin_arguments: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignable_event: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl FunctionProperty {
    pub const KEYS: &'static [&'static str] = &[
        "async",
        "requireUserInput",
        "templateParams",
        "parameters",
        "extraParameters",
        "returns",
        "allowAmbiguousOptionalArguments",
        "allowCrossOriginArguments",
        "filters",
        "assignableEvent",
        "options",
    ];
}

// =============================================================================
// Schema property
// =============================================================================

/// Payload of a node, selected by its `type` tag
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Choices(ChoicesProperty),
    Any,
    Ref,
    Null,
    Value(ValueProperty),
    String(StringProperty),
    Object(ObjectProperty),
    /// Chrome's `binary`, structurally an object
    Binary(ObjectProperty),
    Number(NumberProperty),
    Integer(NumberProperty),
    Boolean(BooleanProperty),
    Array(ArrayProperty),
    Function(FunctionProperty),
    /// No tag given and none could be guessed; holds the remaining raw keys
    Untyped(Map<String, Value>),
}

impl PropertyKind {
    /// The `type` tag written for this payload
    pub fn tag(&self) -> Option<&'static str> {
        Some(match self {
            PropertyKind::Choices(_) => "choices",
            PropertyKind::Any => "any",
            PropertyKind::Ref => "ref",
            PropertyKind::Null => "null",
            PropertyKind::Value(_) => "value",
            PropertyKind::String(_) => "string",
            PropertyKind::Object(_) => "object",
            PropertyKind::Binary(_) => "binary",
            PropertyKind::Number(_) => "number",
            PropertyKind::Integer(_) => "integer",
            PropertyKind::Boolean(_) => "boolean",
            PropertyKind::Array(_) => "array",
            PropertyKind::Function(_) => "function",
            PropertyKind::Untyped(_) => return None,
        })
    }
}

/// A single schema node: a named type, a function, an event, a parameter or a
/// property
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    pub common: PropertyCommon,
    pub kind: PropertyKind,
}

impl SchemaProperty {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            common: PropertyCommon::default(),
            kind,
        }
    }

    /// A `ref` node pointing at `target`
    pub fn reference(target: impl Into<String>) -> Self {
        let mut node = Self::new(PropertyKind::Ref);
        node.common.reference = Some(target.into());
        node
    }

    /// Parse and classify a raw JSON node
    pub fn from_value(value: Value) -> Result<Self> {
        classify::classify(value)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, PropertyKind::Function(_))
    }

    pub fn is_flagged(&self) -> bool {
        self.common.is_flagged()
    }

    pub fn as_object(&self) -> Option<&ObjectProperty> {
        match &self.kind {
            PropertyKind::Object(object) | PropertyKind::Binary(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectProperty> {
        match &mut self.kind {
            PropertyKind::Object(object) | PropertyKind::Binary(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionProperty> {
        match &self.kind {
            PropertyKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionProperty> {
        match &mut self.kind {
            PropertyKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Values of a string enum, if this node is one
    pub fn enum_values(&self) -> Option<&[EnumValue]> {
        match &self.kind {
            PropertyKind::String(string) => string.enumeration.as_deref(),
            _ => None,
        }
    }

    /// Direct child nodes, in traversal order
    pub fn children(&self) -> Vec<&SchemaProperty> {
        let mut children = Vec::new();
        match &self.kind {
            PropertyKind::Choices(choices) => children.extend(choices.choices.iter().flatten()),
            PropertyKind::Object(object) | PropertyKind::Binary(object) => {
                children.extend(object.properties.iter().flat_map(|p| p.values()));
                children.extend(object.additional_schema());
                children.extend(object.pattern_properties.iter().flat_map(|p| p.values()));
                children.extend(object.functions.iter().flatten());
                children.extend(object.events.iter().flatten());
            }
            PropertyKind::Array(array) => children.extend(array.items.as_deref()),
            PropertyKind::Function(function) => {
                children.extend(function.parameters.iter().flatten());
                children.extend(function.extra_parameters.iter().flatten());
                children.extend(function.returns.as_deref());
                children.extend(function.filters.iter().flatten());
            }
            _ => {}
        }
        children
    }
}

/// Serialize a payload struct into the map that will become the node
fn object_fields<T: Serialize>(value: &T) -> std::result::Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ser::Error::custom(format!("expected an object, got {other}"))),
    }
}

impl Serialize for SchemaProperty {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = object_fields(&self.common).map_err(ser::Error::custom)?;
        if let Some(tag) = self.kind.tag() {
            map.insert("type".to_string(), Value::from(tag));
        }
        let payload = match &self.kind {
            PropertyKind::Choices(p) => object_fields(p),
            PropertyKind::Value(p) => object_fields(p),
            PropertyKind::String(p) => object_fields(p),
            PropertyKind::Object(p) | PropertyKind::Binary(p) => object_fields(p),
            PropertyKind::Number(p) | PropertyKind::Integer(p) => object_fields(p),
            PropertyKind::Boolean(p) => object_fields(p),
            PropertyKind::Array(p) => object_fields(p),
            PropertyKind::Function(p) => object_fields(p),
            PropertyKind::Untyped(raw) => Ok(raw.clone()),
            PropertyKind::Any | PropertyKind::Ref | PropertyKind::Null => Ok(Map::new()),
        }
        .map_err(ser::Error::custom)?;
        map.extend(payload);
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaProperty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        classify::classify(value).map_err(de::Error::custom)
    }
}

// =============================================================================
// Namespace entry
// =============================================================================

/// One namespace as declared in a schema file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaEntry {
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_contexts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_contexts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nocompile: Option<bool>,
    #[serde(rename = "$import", default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(rename = "min_manifest_version", default, skip_serializing_if = "Option::is_none")]
    pub min_manifest_version: Option<u32>,
    #[serde(rename = "max_manifest_version", default, skip_serializing_if = "Option::is_none")]
    pub max_manifest_version: Option<u32>,
}

impl SchemaEntry {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidFormat(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Entry consisting of nothing but `namespace` and `permissions`
    pub fn is_permissions_only(&self) -> bool {
        let bare = SchemaEntry {
            namespace: self.namespace.clone(),
            permissions: self.permissions.clone(),
            ..SchemaEntry::default()
        };
        self.permissions.is_some() && *self == bare
    }

    pub fn find_type(&self, id: &str) -> Option<&SchemaProperty> {
        self.types
            .as_ref()?
            .iter()
            .find(|t| t.common.id.as_deref() == Some(id))
    }

    pub fn types_mut(&mut self) -> &mut Vec<SchemaProperty> {
        self.types.get_or_insert_with(Vec::new)
    }

    /// Top-level nodes: types, functions, events, then properties
    pub fn nodes(&self) -> impl Iterator<Item = &SchemaProperty> {
        self.types
            .iter()
            .flatten()
            .chain(self.functions.iter().flatten())
            .chain(self.events.iter().flatten())
            .chain(self.properties.iter().flat_map(|p| p.values()))
    }

    /// The first node carrying `$extend` outside the top-level list of `allowed`
    /// (`Type` while loading, `Event` once listener types are built)
    pub fn misplaced_extend(&self, allowed: NodeKind) -> Option<&SchemaProperty> {
        let lists = [
            (NodeKind::Type, &self.types),
            (NodeKind::Function, &self.functions),
            (NodeKind::Event, &self.events),
        ];
        let mut stack: Vec<&SchemaProperty> = Vec::new();
        for (kind, list) in lists {
            for node in list.iter().flatten() {
                if kind == allowed {
                    stack.extend(node.children());
                } else {
                    stack.push(node);
                }
            }
        }
        stack.extend(self.properties.iter().flat_map(|p| p.values()));

        while let Some(node) = stack.pop() {
            if node.common.extend.is_some() {
                return Some(node);
            }
            stack.extend(node.children());
        }
        None
    }

    /// Fail when [`SchemaEntry::misplaced_extend`] finds a node
    pub fn check_extend_placement(&self, allowed: NodeKind) -> Result<()> {
        match self.misplaced_extend(allowed) {
            Some(node) => Err(SchemaError::Invariant(format!(
                "$extend '{}' on '{}' in namespace {} is outside the namespace {}s",
                node.common.extend.as_deref().unwrap_or_default(),
                node.common.id.as_deref().or(node.common.name.as_deref()).unwrap_or("<anonymous>"),
                self.namespace,
                allowed.to_string().to_lowercase(),
            ))),
            None => Ok(()),
        }
    }
}
