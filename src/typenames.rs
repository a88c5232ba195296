//! Type-name annotation and extraction
//!
//! Invalidation works on type names, so every forwarded document must ask
//! the service to report the type of each returned object. `TypenameTyper`
//! does that by adding the type-name field to every selection set below an
//! operation's root, and reads the reported names back out of response data.

use crate::error::{ExchangeError, Result};
use crate::operation::Document;
use apollo_compiler::ast::{self, Definition, DirectiveList, Selection};
use apollo_compiler::{Name, Node};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use tracing::warn;

/// Default field used by GraphQL services to report an object's type
pub const TYPENAME_FIELD: &str = "__typename";

/// Document processing used by the cache stage
///
/// `annotate` must be idempotent: annotating an already annotated document
/// yields the same document.
pub trait DocumentTyper: Send + Sync {
    /// Request type names in every entity selection of the document
    fn annotate(&self, document: &Document) -> Document;

    /// Type names present in response data; empty when data is absent
    fn collect_type_names(&self, data: Option<&JsonValue>) -> BTreeSet<String>;
}

/// Typer driven by a type-name field such as `__typename`
#[derive(Debug, Clone)]
pub struct TypenameTyper {
    field: String,
}

impl TypenameTyper {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for TypenameTyper {
    fn default() -> Self {
        Self::new(TYPENAME_FIELD)
    }
}

impl DocumentTyper for TypenameTyper {
    /// Documents that fail to parse are forwarded as written
    fn annotate(&self, document: &Document) -> Document {
        match add_typenames(document.as_str(), &self.field) {
            Ok(annotated) => Document::new(annotated),
            Err(e) => {
                warn!("Forwarding document without type names: {}", e);
                document.clone()
            }
        }
    }

    fn collect_type_names(&self, data: Option<&JsonValue>) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let Some(data) = data {
            collect_typenames(data, &self.field, &mut names);
        }
        names
    }
}

/// Parse `source` and add `field` to every selection set except operation
/// roots, then print the document back out
///
/// Fragment definitions are annotated from their top-level selection set
/// down. A set already selecting `field` without an alias is left as is.
pub fn add_typenames(source: &str, field: &str) -> Result<String> {
    let field = Name::new(field)
        .map_err(|_| ExchangeError::ConfigError(format!("invalid type-name field {:?}", field)))?;
    let mut document = ast::Document::parse(source, "operation.graphql")
        .map_err(|e| ExchangeError::DocumentError(e.errors.to_string()))?;

    for definition in &mut document.definitions {
        match definition {
            Definition::OperationDefinition(operation) => {
                for selection in &mut operation.make_mut().selection_set {
                    annotate_below(selection, &field);
                }
            }
            Definition::FragmentDefinition(fragment) => {
                annotate_selection_set(&mut fragment.make_mut().selection_set, &field);
            }
            _ => {}
        }
    }

    Ok(document.to_string())
}

/// Annotate the selection sets nested inside `selection`, but not the set
/// holding it
fn annotate_below(selection: &mut Selection, field: &Name) {
    match selection {
        Selection::Field(node) => {
            if !node.selection_set.is_empty() {
                annotate_selection_set(&mut node.make_mut().selection_set, field);
            }
        }
        // Inline fragments share the type of the set they sit in
        Selection::InlineFragment(node) => {
            for child in &mut node.make_mut().selection_set {
                annotate_below(child, field);
            }
        }
        Selection::FragmentSpread(_) => {}
    }
}

fn annotate_selection_set(selections: &mut Vec<Selection>, field: &Name) {
    for selection in selections.iter_mut() {
        match selection {
            Selection::InlineFragment(node) => {
                annotate_selection_set(&mut node.make_mut().selection_set, field)
            }
            other => annotate_below(other, field),
        }
    }

    let selected = selections.iter().any(|selection| {
        matches!(selection, Selection::Field(node) if node.alias.is_none() && node.name == *field)
    });
    if !selected {
        selections.push(Selection::Field(Node::new(ast::Field {
            alias: None,
            name: field.clone(),
            arguments: Vec::new(),
            directives: DirectiveList::new(),
            selection_set: Vec::new(),
        })));
    }
}

/// Collect every string value of `field` found on objects in `value`
pub fn collect_typenames(value: &JsonValue, field: &str, names: &mut BTreeSet<String>) {
    match value {
        JsonValue::Object(map) => {
            if let Some(JsonValue::String(name)) = map.get(field) {
                names.insert(name.clone());
            }
            for child in map.values() {
                collect_typenames(child, field, names);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                collect_typenames(item, field, names);
            }
        }
        _ => {}
    }
}
