//! Block materialization: raw JSON records → [`DailyProgramBlock`].
//!
//! Each canonical field has an ordered synonym list; the first key present
//! with a usable value wins.

use chrono::NaiveTime;
use serde_json::{Map, Value};

use super::days::parse_day_value;
use super::normalize::{NormalizedProgram, DAY_KEYS};
use crate::types::{BlockType, DailyProgramBlock};

pub const BLOCK_TITLE_KEYS: &[&str] = &["title", "name", "activity", "label", "activity_name", "activityName"];
pub const BLOCK_TYPE_KEYS: &[&str] = &["block_type", "blockType", "type", "category", "kind"];
pub const START_TIME_KEYS: &[&str] = &["start_time", "start", "startTime", "time_start"];
pub const END_TIME_KEYS: &[&str] = &["end_time", "end", "endTime", "time_end"];
pub const TIME_RANGE_KEYS: &[&str] = &["time", "time_slot", "timeSlot", "time_range"];
pub const ORDER_KEYS: &[&str] = &["block_order", "blockOrder", "order", "position", "sequence", "index"];
pub const OBJECTIVE_KEYS: &[&str] = &["objectives", "learning_objectives", "learningObjectives", "goals", "outcomes"];
pub const MATERIAL_KEYS: &[&str] = &["materials", "resources", "supplies", "materials_needed"];
pub const TRANSITION_KEYS: &[&str] = &["transition_cue", "transitionCue", "transition"];
pub const NOTES_KEYS: &[&str] = &["notes", "note", "description", "details", "teacher_notes"];
/// Parent tips are only ever copied from these exact keys.
pub const PARENT_TIP_KEYS: &[&str] = &["parent_tip", "parentTip"];

/// Convert a normalized program into typed blocks sorted by (day, order).
///
/// A non-empty flat `blocks` list takes precedence; `days` is ignored then.
pub fn materialize(program: &NormalizedProgram) -> Vec<DailyProgramBlock> {
    let mut blocks: Vec<DailyProgramBlock> = if !program.blocks.is_empty() {
        program
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| materialize_block(raw, i + 1, None))
            .collect()
    } else {
        program
            .days
            .iter()
            .enumerate()
            .flat_map(|(day_index, day)| {
                // Entries without a resolvable day fall back to their position.
                let fallback = day
                    .day_of_week
                    .unwrap_or_else(|| u8::try_from(day_index + 1).unwrap_or(u8::MAX).min(7));
                day.blocks
                    .iter()
                    .enumerate()
                    .filter_map(move |(i, raw)| materialize_block(raw, i + 1, Some(fallback)))
            })
            .collect()
    };

    blocks.sort_by_key(|b| (b.day_of_week, b.block_order));
    blocks
}

/// Materialize one record. `position` is its 1-based index in the source
/// list; `day_fallback` comes from the enclosing day entry.
pub fn materialize_block(
    raw: &Value,
    position: usize,
    day_fallback: Option<u8>,
) -> Option<DailyProgramBlock> {
    let position = u32::try_from(position).unwrap_or(u32::MAX);

    let map = match raw {
        Value::Object(map) => map,
        Value::String(title) if !title.trim().is_empty() => {
            return Some(DailyProgramBlock {
                day_of_week: day_fallback.unwrap_or(1),
                block_order: position,
                block_type: BlockType::Learning,
                title: title.trim().to_string(),
                start_time: None,
                end_time: None,
                objectives: Vec::new(),
                materials: Vec::new(),
                transition_cue: None,
                notes: None,
                parent_tip: None,
            });
        }
        _ => return None,
    };

    let day_of_week = DAY_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(parse_day_value))
        .or(day_fallback)
        .unwrap_or(1);

    let block_order = ORDER_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(parse_order))
        .unwrap_or(position);

    let block_type = first_text(map, BLOCK_TYPE_KEYS)
        .map(|t| BlockType::coerce(&t))
        .unwrap_or(BlockType::Learning);

    let title = first_text(map, BLOCK_TITLE_KEYS)
        .unwrap_or_else(|| format!("Learning Block {}", block_order));

    let (range_start, range_end) = first_text(map, TIME_RANGE_KEYS)
        .map(|range| split_time_range(&range))
        .unwrap_or((None, None));
    let start_time = first_time(map, START_TIME_KEYS).or(range_start);
    let end_time = first_time(map, END_TIME_KEYS).or(range_end);

    Some(DailyProgramBlock {
        day_of_week,
        block_order,
        block_type,
        title,
        start_time,
        end_time,
        objectives: first_list(map, OBJECTIVE_KEYS),
        materials: first_list(map, MATERIAL_KEYS),
        transition_cue: first_text(map, TRANSITION_KEYS),
        notes: first_text(map, NOTES_KEYS),
        parent_tip: first_text(map, PARENT_TIP_KEYS),
    })
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn first_time(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(|v| v.as_str()).and_then(normalize_time))
}

/// First list-valued field. Arrays keep their string/number items; a single
/// string is split on newlines and semicolons.
fn first_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        let items: Vec<String> = match map.get(*key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Object(o) => o
                        .get("text")
                        .or_else(|| o.get("name"))
                        .and_then(|t| t.as_str())
                        .map(|t| t.trim().to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(['\n', ';'])
                .map(|part| part.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            _ => continue,
        };
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

fn parse_order(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    if n == 0 {
        return None;
    }
    u32::try_from(n).ok()
}

/// Normalize a clock time to `HH:MM`; `None` when it cannot be read.
pub fn normalize_time(raw: &str) -> Option<String> {
    const FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

    let cleaned = raw.trim().to_uppercase().replace('.', ":").replace('H', ":");
    let cleaned = cleaned.trim_end_matches(':');
    if cleaned.is_empty() {
        return None;
    }
    // "9AM" / "9 am": chrono needs minutes, so supply them.
    let cleaned = if cleaned.contains(':') {
        cleaned.to_string()
    } else {
        let digits: String = cleaned.chars().take_while(|c| c.is_ascii_digit()).collect();
        let rest = &cleaned[digits.len()..];
        if digits.is_empty() || digits.len() > 2 || rest.trim().is_empty() {
            return None;
        }
        format!("{}:00{}", digits, rest)
    };
    FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&cleaned, fmt).ok())
        .map(|t| t.format("%H:%M").to_string())
}

/// Split "08:00 - 08:30" (also "08:00–08:30", "8:00 to 8:30").
pub fn split_time_range(range: &str) -> (Option<String>, Option<String>) {
    let lower = range.to_lowercase();
    let parts: Vec<&str> = lower
        .split(|c: char| c == '-' || c == '–' || c == '—')
        .flat_map(|p| p.split(" to "))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [start, end] => (normalize_time(start), normalize_time(end)),
        [single] => (normalize_time(single), None),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::normalize::{normalize, RawDay};
    use serde_json::json;

    #[test]
    fn test_materialize_flat_blocks_with_synonyms() {
        let program = NormalizedProgram {
            blocks: vec![json!({
                "name": "Bus song",
                "weekday": "tue",
                "startTime": "8:30",
                "time_end": "09:00",
                "type": "Music and movement",
                "goals": ["Sing along", "Clap the beat"],
                "resources": "Drum; Shakers",
                "transitionCue": "Drive to the mat",
                "note": "Use the big bus picture"
            })],
            ..Default::default()
        };
        let blocks = materialize(&program);
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.day_of_week, 2);
        assert_eq!(b.block_order, 1);
        assert_eq!(b.title, "Bus song");
        assert_eq!(b.block_type, BlockType::Movement);
        assert_eq!(b.start_time.as_deref(), Some("08:30"));
        assert_eq!(b.end_time.as_deref(), Some("09:00"));
        assert_eq!(b.objectives, vec!["Sing along", "Clap the beat"]);
        assert_eq!(b.materials, vec!["Drum", "Shakers"]);
        assert_eq!(b.transition_cue.as_deref(), Some("Drive to the mat"));
        assert_eq!(b.notes.as_deref(), Some("Use the big bus picture"));
        assert_eq!(b.parent_tip, None);
    }

    #[test]
    fn test_materialize_defaults() {
        let program = NormalizedProgram {
            blocks: vec![json!({}), json!({"block_type": "dragons"})],
            ..Default::default()
        };
        let blocks = materialize(&program);
        assert_eq!(blocks[0].day_of_week, 1);
        assert_eq!(blocks[0].block_order, 1);
        assert_eq!(blocks[0].title, "Learning Block 1");
        assert_eq!(blocks[1].title, "Learning Block 2");
        assert_eq!(blocks[1].block_type, BlockType::Learning);
        assert_eq!(blocks[0].start_time, None);
    }

    #[test]
    fn test_materialize_days_fallback_and_override() {
        let program = NormalizedProgram {
            days: vec![RawDay {
                day_of_week: Some(3),
                blocks: vec![json!({"title": "A"}), json!({"title": "B", "day": "Thursday"})],
            }],
            ..Default::default()
        };
        let blocks = materialize(&program);
        assert_eq!(blocks[0].day_of_week, 3);
        assert_eq!(blocks[1].day_of_week, 4);
    }

    #[test]
    fn test_materialize_day_entry_without_day_uses_position() {
        let program = NormalizedProgram {
            days: vec![
                RawDay { day_of_week: None, blocks: vec![json!({"title": "First"})] },
                RawDay { day_of_week: None, blocks: vec![json!({"title": "Second"})] },
            ],
            ..Default::default()
        };
        let blocks = materialize(&program);
        assert_eq!(blocks[0].day_of_week, 1);
        assert_eq!(blocks[1].day_of_week, 2);
    }

    #[test]
    fn test_materialize_flat_wins_over_days() {
        let program = NormalizedProgram {
            blocks: vec![json!({"title": "Flat", "day": 2})],
            days: vec![RawDay {
                day_of_week: Some(1),
                blocks: vec![json!({"title": "Grouped"})],
            }],
            ..Default::default()
        };
        let blocks = materialize(&program);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].title, "Flat");
    }

    #[test]
    fn test_materialize_sorted_by_day_then_order() {
        let program = NormalizedProgram {
            blocks: vec![
                json!({"title": "Fri", "day": 5, "order": 1}),
                json!({"title": "Mon 2", "day": 1, "order": 2}),
                json!({"title": "Mon 1", "day": 1, "order": 1}),
            ],
            ..Default::default()
        };
        let titles: Vec<String> = materialize(&program).into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Mon 1", "Mon 2", "Fri"]);
    }

    #[test]
    fn test_materialize_day_keyed_map_input() {
        let value = json!({
            "Mon": [{"title": "Sand play"}],
            "Tue": [{"title": "Shell sorting"}],
            "notes": "Ignore me"
        });
        let blocks = materialize(&normalize(&value).unwrap());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].day_of_week, 1);
        assert_eq!(blocks[1].day_of_week, 2);
    }

    #[test]
    fn test_materialize_string_entries_and_parent_tip() {
        let program = NormalizedProgram {
            blocks: vec![
                json!("Free painting"),
                json!({"title": "Read", "parent_tip": "Read a bedtime story together"}),
            ],
            ..Default::default()
        };
        let blocks = materialize(&program);
        assert_eq!(blocks[0].title, "Free painting");
        assert_eq!(blocks[1].parent_tip.as_deref(), Some("Read a bedtime story together"));
    }

    #[test]
    fn test_materialize_time_range_field() {
        let program = NormalizedProgram {
            blocks: vec![json!({"title": "Snack", "time": "10:00 - 10:20"})],
            ..Default::default()
        };
        let b = &materialize(&program)[0];
        assert_eq!(b.start_time.as_deref(), Some("10:00"));
        assert_eq!(b.end_time.as_deref(), Some("10:20"));
    }

    #[test]
    fn test_normalize_time_formats() {
        assert_eq!(normalize_time("8:05").as_deref(), Some("08:05"));
        assert_eq!(normalize_time("13:30:00").as_deref(), Some("13:30"));
        assert_eq!(normalize_time("1:15 pm").as_deref(), Some("13:15"));
        assert_eq!(normalize_time("9am").as_deref(), Some("09:00"));
        assert_eq!(normalize_time("morning"), None);
        assert_eq!(normalize_time(""), None);
    }

    #[test]
    fn test_parse_order_rejects_zero_and_garbage() {
        assert_eq!(parse_order(&json!(3)), Some(3));
        assert_eq!(parse_order(&json!("2")), Some(2));
        assert_eq!(parse_order(&json!(0)), None);
        assert_eq!(parse_order(&json!("first")), None);
    }
}
