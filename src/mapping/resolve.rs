//! Walks a parsed location through a nested record.
//!
//! The walk keeps a focus that is either one node or, once the list
//! segment has been crossed, one slot per list element. A slot that loses
//! its key is marked missing instead of aborting the whole walk, so sibling
//! columns reading the same list stay positionally comparable.

use crate::error::{CrunchError, Result};
use crate::mapping::path::{PathExpression, Segment, SegmentKind};
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;

/// What happens to list elements that are missing the rest of the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListElementPolicy {
    /// Drop the element from the result
    #[default]
    Skip,
    /// Keep the element's position with a null value
    Null,
    /// Treat the whole path as absent if any element is missing
    Require,
}

/// Knobs that change how a path is walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub list_elements: ListElementPolicy,
    /// Parse strings holding JSON objects/arrays when the walk needs to look inside them
    pub decode_json_strings: bool,
    /// Count a present `null` as absence
    pub null_as_missing: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            list_elements: ListElementPolicy::Skip,
            decode_json_strings: true,
            null_as_missing: false,
        }
    }
}

/// Outcome of walking a path through one record
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Scalar(Cow<'a, Value>),
    /// One value per list element, in element order
    ScalarList(Vec<Cow<'a, Value>>),
    Absent,
}

impl<'a> Resolved<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Resolved::Absent)
    }
}

enum Focus<'a> {
    One(Cow<'a, Value>),
    Many(Vec<Option<Cow<'a, Value>>>),
}

/// Resolve `path` against `record` with default options
pub fn resolve<'a>(path: &PathExpression, record: &'a Value) -> Result<Resolved<'a>> {
    resolve_with(path, record, &ResolveOptions::default())
}

pub fn resolve_with<'a>(
    path: &PathExpression,
    record: &'a Value,
    options: &ResolveOptions,
) -> Result<Resolved<'a>> {
    let mut focus = Focus::One(Cow::Borrowed(record));

    for segment in path.segments() {
        focus = match focus {
            Focus::One(node) => {
                if segment.is_list() {
                    match enter_list(path, node, segment, options)? {
                        Some(items) => Focus::Many(
                            items
                                .into_iter()
                                .map(|item| present(item, options))
                                .collect(),
                        ),
                        None => return Ok(Resolved::Absent),
                    }
                } else {
                    match descend(node, segment, options) {
                        Some(next) => Focus::One(next),
                        None => return Ok(Resolved::Absent),
                    }
                }
            }
            Focus::Many(slots) => {
                if segment.is_list() {
                    return Err(CrunchError::unsupported(
                        path.location(),
                        "nested list segments are not supported",
                    ));
                }
                Focus::Many(
                    slots
                        .into_iter()
                        .map(|slot| slot.and_then(|node| descend(node, segment, options)))
                        .collect(),
                )
            }
        };
    }

    Ok(match focus {
        Focus::One(node) => Resolved::Scalar(node),
        Focus::Many(slots) => collect_slots(slots, options.list_elements),
    })
}

fn collect_slots(slots: Vec<Option<Cow<'_, Value>>>, policy: ListElementPolicy) -> Resolved<'_> {
    if slots.iter().all(Option::is_none) {
        return Resolved::Absent;
    }

    match policy {
        ListElementPolicy::Skip => Resolved::ScalarList(slots.into_iter().flatten().collect()),
        ListElementPolicy::Null => Resolved::ScalarList(
            slots
                .into_iter()
                .map(|slot| slot.unwrap_or(Cow::Owned(Value::Null)))
                .collect(),
        ),
        ListElementPolicy::Require => match slots.into_iter().collect::<Option<Vec<_>>>() {
            Some(values) => Resolved::ScalarList(values),
            None => Resolved::Absent,
        },
    }
}

/// Follow a key or indexed segment from one node
fn descend<'a>(node: Cow<'a, Value>, segment: &Segment, options: &ResolveOptions) -> Option<Cow<'a, Value>> {
    let found = child(prepare(node, options), &segment.name)?;

    let found = match segment.kind {
        SegmentKind::Index(index) => element(prepare(found, options), index)?,
        SegmentKind::Key | SegmentKind::List => found,
    };

    present(found, options)
}

fn present<'a>(node: Cow<'a, Value>, options: &ResolveOptions) -> Option<Cow<'a, Value>> {
    if options.null_as_missing && node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Follow a list segment; `None` means the path is absent
fn enter_list<'a>(
    path: &PathExpression,
    node: Cow<'a, Value>,
    segment: &Segment,
    options: &ResolveOptions,
) -> Result<Option<Vec<Cow<'a, Value>>>> {
    let Some(target) = child(prepare(node, options), &segment.name) else {
        return Ok(None);
    };

    match prepare(target, options) {
        Cow::Borrowed(Value::Array(items)) => Ok(non_empty(items.iter().map(Cow::Borrowed).collect())),
        Cow::Owned(Value::Array(items)) => Ok(non_empty(items.into_iter().map(Cow::Owned).collect())),
        Cow::Borrowed(Value::Null) | Cow::Owned(Value::Null) => Ok(None),
        _ => Err(CrunchError::unsupported(
            path.location(),
            format!("'{}' is marked as a list but is not one", segment.name),
        )),
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn prepare<'a>(node: Cow<'a, Value>, options: &ResolveOptions) -> Cow<'a, Value> {
    if options.decode_json_strings {
        decode_embedded(node)
    } else {
        node
    }
}

/// Replace a string holding a JSON object or array with the parsed value
fn decode_embedded(node: Cow<'_, Value>) -> Cow<'_, Value> {
    if let Value::String(text) = node.as_ref() {
        if let Ok(parsed @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(text) {
            return Cow::Owned(parsed);
        }
    }
    node
}

fn child<'a>(node: Cow<'a, Value>, name: &str) -> Option<Cow<'a, Value>> {
    match node {
        Cow::Borrowed(value) => value.as_object()?.get(name).map(Cow::Borrowed),
        Cow::Owned(Value::Object(mut map)) => map.remove(name).map(Cow::Owned),
        Cow::Owned(_) => None,
    }
}

fn element(node: Cow<'_, Value>, index: usize) -> Option<Cow<'_, Value>> {
    match node {
        Cow::Borrowed(value) => value.as_array()?.get(index).map(Cow::Borrowed),
        Cow::Owned(Value::Array(mut items)) if index < items.len() => {
            Some(Cow::Owned(items.swap_remove(index)))
        }
        Cow::Owned(_) => None,
    }
}
