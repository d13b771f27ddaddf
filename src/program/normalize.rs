//! Schema normalization for weekly program JSON.
//!
//! The model is asked for one schema but answers in many: a flat `blocks`
//! list, a `days` array with nested lists, or a map keyed by weekday, under
//! whatever key names it prefers, sometimes wrapped in `data` / `result`
//! envelopes. This module finds the program inside any of those and reduces
//! it to [`NormalizedProgram`].
//!
//! Key synonyms are plain tables so they can be tested without the recursion.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::days::{parse_day_key, parse_day_value};
use super::extract::parse_lenient;
use super::materialize::{BLOCK_TITLE_KEYS, BLOCK_TYPE_KEYS};

/// Maximum nesting depth searched below the top-level value.
pub const MAX_NORMALIZE_DEPTH: usize = 5;

/// Keys that hold a list of block records.
pub const BLOCK_LIST_KEYS: &[&str] = &[
    "blocks",
    "activities",
    "routine",
    "schedule",
    "sessions",
    "items",
    "timeline",
    "daily_blocks",
    "dailyBlocks",
    "program_blocks",
    "programBlocks",
    "slots",
    "periods",
    "entries",
];

/// Keys that hold a list (or weekday map) of per-day entries.
pub const DAY_LIST_KEYS: &[&str] = &[
    "days",
    "weekdays",
    "week",
    "daily_plans",
    "dailyPlans",
    "day_plans",
    "dayPlans",
    "daily_program",
    "plan_by_day",
];

/// Envelope keys searched first when the object itself has no program shape.
pub const CONTAINER_KEYS: &[&str] = &[
    "weekly_program",
    "weeklyProgram",
    "program",
    "data",
    "result",
    "response",
    "content",
    "payload",
    "output",
    "json",
];

/// Keys that carry a day identifier on a day entry or block.
pub const DAY_KEYS: &[&str] = &[
    "day_of_week",
    "dayOfWeek",
    "day",
    "weekday",
    "day_name",
    "dayName",
    "day_index",
    "day_number",
    "dayNumber",
    "date",
];

pub const PROGRAM_TITLE_KEYS: &[&str] = &["title", "program_title", "programTitle", "week_title"];
pub const PROGRAM_SUMMARY_KEYS: &[&str] = &["summary", "description", "overview"];

/// A weekly program reduced to one canonical shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedProgram {
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Flat block records with no day grouping.
    pub blocks: Vec<Value>,
    /// Day-grouped block records.
    pub days: Vec<RawDay>,
}

impl NormalizedProgram {
    /// True when at least one block record survived, flat or day-grouped.
    pub fn has_block_records(&self) -> bool {
        self.blocks.iter().any(is_block_record)
            || self
                .days
                .iter()
                .any(|day| day.blocks.iter().any(is_block_record))
    }
}

/// One day entry before materialization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDay {
    /// Resolved day, if the entry named one.
    pub day_of_week: Option<u8>,
    pub blocks: Vec<Value>,
}

/// Partial result of one shape matcher.
enum ShapeMatch {
    Blocks(Vec<Value>),
    Days(Vec<RawDay>),
}

type ShapeMatcher = fn(&Map<String, Value>) -> Option<ShapeMatch>;

/// Tried in order; the first `Blocks` and the first `Days` match are kept.
const SHAPE_MATCHERS: &[ShapeMatcher] = &[flat_blocks_shape, day_list_shape, day_map_shape];

/// Find a weekly program anywhere in `value`.
pub fn normalize(value: &Value) -> Option<NormalizedProgram> {
    let mut seen = HashSet::new();
    normalize_at(value, 0, &mut seen)
}

fn normalize_at(value: &Value, depth: usize, seen: &mut HashSet<usize>) -> Option<NormalizedProgram> {
    if depth > MAX_NORMALIZE_DEPTH {
        return None;
    }

    match value {
        Value::Object(map) => {
            if !seen.insert(value as *const Value as usize) {
                return None;
            }
            if let Some(program) = match_shapes(map) {
                return Some(inherit_text(program, map));
            }
            for key in CONTAINER_KEYS {
                if let Some(child) = map.get(*key) {
                    if let Some(program) = normalize_at(child, depth + 1, seen) {
                        return Some(inherit_text(program, map));
                    }
                }
            }
            for (key, child) in map {
                if CONTAINER_KEYS.contains(&key.as_str()) {
                    continue;
                }
                if let Some(program) = normalize_at(child, depth + 1, seen) {
                    return Some(inherit_text(program, map));
                }
            }
            None
        }
        Value::Array(items) => {
            if !seen.insert(value as *const Value as usize) {
                return None;
            }
            if let Some(shape) = array_shape(items) {
                let mut program = NormalizedProgram::default();
                match shape {
                    ShapeMatch::Blocks(blocks) => program.blocks = blocks,
                    ShapeMatch::Days(days) => program.days = days,
                }
                return Some(program);
            }
            items
                .iter()
                .find_map(|item| normalize_at(item, depth + 1, seen))
        }
        Value::String(s) => {
            let trimmed = s.trim_start();
            if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
                return None;
            }
            // Parsed strings are fresh trees; their addresses must not enter `seen`.
            let parsed = parse_lenient(trimmed)?;
            normalize_at(&parsed, depth + 1, &mut HashSet::new())
        }
        _ => None,
    }
}

fn match_shapes(map: &Map<String, Value>) -> Option<NormalizedProgram> {
    let mut blocks: Option<Vec<Value>> = None;
    let mut days: Option<Vec<RawDay>> = None;

    for matcher in SHAPE_MATCHERS {
        match matcher(map) {
            Some(ShapeMatch::Blocks(b)) if blocks.is_none() => blocks = Some(b),
            Some(ShapeMatch::Days(d)) if days.is_none() => days = Some(d),
            _ => {}
        }
    }

    if blocks.is_none() && days.is_none() {
        return None;
    }
    Some(NormalizedProgram {
        title: None,
        summary: None,
        blocks: blocks.unwrap_or_default(),
        days: days.unwrap_or_default(),
    })
}

/// Fill title/summary from `map` when the matched program lacks them.
fn inherit_text(mut program: NormalizedProgram, map: &Map<String, Value>) -> NormalizedProgram {
    if program.title.is_none() {
        program.title = first_text(map, PROGRAM_TITLE_KEYS);
    }
    if program.summary.is_none() {
        program.summary = first_text(map, PROGRAM_SUMMARY_KEYS);
    }
    program
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

// =============================================================================
// Shape matchers
// =============================================================================

/// `{"blocks": [...]}` (or a synonym) holding block records. An empty list
/// still counts so an empty program can be told apart from unrelated JSON.
fn flat_blocks_shape(map: &Map<String, Value>) -> Option<ShapeMatch> {
    BLOCK_LIST_KEYS.iter().find_map(|key| match map.get(*key) {
        Some(Value::Array(items))
            if (items.is_empty() || items.iter().any(is_block_record))
                && !items.iter().any(is_day_group) =>
        {
            Some(ShapeMatch::Blocks(items.clone()))
        }
        _ => None,
    })
}

/// `{"days": [{"day": ..., "blocks": [...]}]}`, a weekday map under a day or
/// block key, or a block key whose items are themselves day groups.
fn day_list_shape(map: &Map<String, Value>) -> Option<ShapeMatch> {
    for key in DAY_LIST_KEYS {
        match map.get(*key) {
            Some(Value::Array(entries)) => {
                return Some(ShapeMatch::Days(
                    entries.iter().filter_map(raw_day_from_entry).collect(),
                ));
            }
            Some(Value::Object(inner)) => {
                let days = day_map_entries(inner);
                if !days.is_empty() {
                    return Some(ShapeMatch::Days(days));
                }
            }
            _ => {}
        }
    }

    for key in BLOCK_LIST_KEYS {
        match map.get(*key) {
            Some(Value::Array(items)) if items.iter().any(is_day_group) => {
                return Some(ShapeMatch::Days(
                    items.iter().filter_map(raw_day_from_entry).collect(),
                ));
            }
            Some(Value::Object(inner)) => {
                let days = day_map_entries(inner);
                if !days.is_empty() {
                    return Some(ShapeMatch::Days(days));
                }
            }
            _ => {}
        }
    }
    None
}

/// `{"Monday": [...], "tue": [...]}` at this level.
fn day_map_shape(map: &Map<String, Value>) -> Option<ShapeMatch> {
    let days = day_map_entries(map);
    if days.is_empty() {
        None
    } else {
        Some(ShapeMatch::Days(days))
    }
}

/// Entries whose key parses as a weekday; anything else is discarded.
fn day_map_entries(map: &Map<String, Value>) -> Vec<RawDay> {
    let mut days: Vec<RawDay> = map
        .iter()
        .filter_map(|(key, value)| {
            let day = parse_day_key(key)?;
            let blocks = match value {
                Value::Array(items) => items.clone(),
                Value::Object(inner) => match nested_block_list(inner) {
                    Some(items) => items.clone(),
                    None => vec![value.clone()],
                },
                _ => return None,
            };
            Some(RawDay {
                day_of_week: Some(day),
                blocks,
            })
        })
        .collect();
    days.sort_by_key(|d| d.day_of_week);
    days
}

/// A top-level array: day groups, or block-like records.
fn array_shape(items: &[Value]) -> Option<ShapeMatch> {
    if items.iter().any(is_day_group) {
        return Some(ShapeMatch::Days(
            items.iter().filter_map(raw_day_from_entry).collect(),
        ));
    }
    if items.iter().any(looks_like_block) {
        return Some(ShapeMatch::Blocks(items.to_vec()));
    }
    None
}

fn raw_day_from_entry(entry: &Value) -> Option<RawDay> {
    let map = entry.as_object()?;
    let day_of_week = DAY_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(parse_day_value));
    let blocks = nested_block_list(map).cloned().unwrap_or_default();
    Some(RawDay {
        day_of_week,
        blocks,
    })
}

fn nested_block_list(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    BLOCK_LIST_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(|v| v.as_array()))
}

/// An object carrying a block list that contains at least one record.
///
/// A list of plain activity strings only counts when the object names a day
/// and has no block type, so a block with an `items` list stays a block.
fn is_day_group(item: &Value) -> bool {
    let Some(map) = item.as_object() else {
        return false;
    };
    let Some(list) = nested_block_list(map) else {
        return false;
    };
    if list.iter().any(Value::is_object) {
        return true;
    }
    let names_day = DAY_KEYS.iter().any(|key| map.contains_key(*key));
    let typed = BLOCK_TYPE_KEYS.iter().any(|key| map.contains_key(*key));
    names_day && !typed && list.iter().any(is_block_record)
}

/// An object, or a non-empty string naming an activity.
fn is_block_record(item: &Value) -> bool {
    match item {
        Value::Object(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        _ => false,
    }
}

fn looks_like_block(item: &Value) -> bool {
    item.as_object()
        .map(|map| {
            BLOCK_TITLE_KEYS
                .iter()
                .chain(BLOCK_TYPE_KEYS.iter())
                .any(|key| map.contains_key(*key))
        })
        .unwrap_or(false)
}
