//! Synthesizes listener types for events with extra registration parameters
//!
//! Some events take additional arguments in `addListener` (a filter, a list of
//! extra info specs). For each such event a `<name>Event` type is created from a
//! copy of `Event.addListener` in the events namespace, with its callback typed
//! after the event and the extra parameters appended. The event then points at
//! that type through `$extend`.

use crate::error::{Result, SchemaError};
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::{
    AdditionalProperties, FunctionProperty, ObjectProperty, PropertyKind, SchemaEntry, SchemaProperty,
};
use crate::visitor::{SchemaVisitor, Visit};

use super::Fix;

pub struct ExtendEvents {
    events_namespace: String,
}

impl ExtendEvents {
    pub fn new(events_namespace: String) -> Self {
        Self { events_namespace }
    }
}

impl Fix for ExtendEvents {
    fn name(&self) -> &'static str {
        "extend events"
    }

    fn visitor<'a>(
        &'a self,
        namespace: &ImportedNamespace,
        namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        let events = if namespace.name() == self.events_namespace {
            Some(&namespace.entry)
        } else {
            namespaces.primary(&self.events_namespace).map(|ns| &ns.entry)
        };
        let template = events.and_then(add_listener).cloned();
        Ok(Some(Box::new(EventExtender {
            events_namespace: &self.events_namespace,
            template,
            created: Vec::new(),
        })))
    }
}

/// `Event.addListener` of the events namespace
fn add_listener(events: &SchemaEntry) -> Option<&SchemaProperty> {
    events
        .find_type("Event")?
        .as_object()?
        .functions
        .as_ref()?
        .iter()
        .find(|f| f.common.name.as_deref() == Some("addListener"))
}

struct EventExtender<'a> {
    events_namespace: &'a str,
    template: Option<SchemaProperty>,
    created: Vec<SchemaProperty>,
}

impl EventExtender<'_> {
    fn listener_type(&self, event: &mut SchemaProperty) -> Result<SchemaProperty> {
        let name = event
            .common
            .name
            .clone()
            .ok_or_else(|| SchemaError::MissingName("event without a name".to_string()))?;
        let mut add_listener = self
            .template
            .clone()
            .ok_or_else(|| SchemaError::MissingType(format!("{}.Event.addListener", self.events_namespace)))?;

        let signature = event
            .as_function_mut()
            .ok_or_else(|| SchemaError::Invariant(format!("event {name} is not a function")))?;
        let extra = signature.extra_parameters.take().unwrap_or_default();
        let callback = FunctionProperty {
            parameters: signature.parameters.take(),
            returns: signature.returns.clone(),
            ..FunctionProperty::default()
        };

        let parameters = add_listener
            .as_function_mut()
            .and_then(|f| f.parameters.as_mut())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SchemaError::Invariant("Event.addListener has no parameters".to_string()))?;
        parameters[0].kind = PropertyKind::Function(callback);
        if parameters.len() > 1 {
            parameters.pop();
        }
        parameters.extend(extra);

        let id = format!("{name}Event");
        let mut listener = SchemaProperty::new(PropertyKind::Object(ObjectProperty {
            additional_properties: Some(AdditionalProperties::Schema(Box::new(SchemaProperty::reference(
                format!("{}.Event", self.events_namespace),
            )))),
            functions: Some(vec![add_listener]),
            ..ObjectProperty::default()
        }));
        listener.common.id = Some(id.clone());
        listener.common.description = event.common.description.clone();
        event.common.extend = Some(id);
        Ok(listener)
    }
}

impl SchemaVisitor for EventExtender<'_> {
    fn visit_event(&mut self, mut node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        let has_extra = node.as_function().is_some_and(|f| f.extra_parameters.is_some());
        if has_extra {
            let listener = self.listener_type(&mut node)?;
            tracing::debug!(id = ?listener.common.id, "extended event");
            self.created.push(listener);
        }
        Ok(Visit::Keep(node))
    }

    fn finish(&mut self, entry: &mut SchemaEntry) -> Result<()> {
        if !self.created.is_empty() {
            entry.types_mut().append(&mut self.created);
        }
        Ok(())
    }
}
