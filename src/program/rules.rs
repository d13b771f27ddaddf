//! Domain rules applied to every materialized program.
//!
//! Passes run in a fixed order, each taking and returning the full block list:
//! 1. weekday coverage: Monday–Friday each get at least one block
//! 2. daily weather: every weekday carries the weather routine
//! 3. coverage: Home Language / Mathematics / Life Skills / Daily Weather per day
//! 4. gap annotation: days with missing strands are flagged on their first block
//!
//! Coverage is recomputed after annotation so the returned summary matches the
//! returned blocks.

use std::collections::BTreeMap;

use crate::program::days::{weekday_name, SCHOOL_DAYS};
use crate::types::{BlockType, CapsCoverage, CapsStrand, DailyProgramBlock, DayCoverageGap};

pub const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "forecast",
    "season",
    "temperature",
    "climate",
    "sunny",
    "rain",
    "cloud",
];

pub const HOME_LANGUAGE_KEYWORDS: &[&str] = &[
    "home language",
    "language",
    "phonics",
    "phonic",
    "story",
    "stories",
    "reading",
    "read aloud",
    "read-aloud",
    "book",
    "letter",
    "vocabulary",
    "rhyme",
    "poem",
    "song",
    "listening",
    "speaking",
    "conversation",
    "literacy",
    "writing",
    "alphabet",
    "word",
];

pub const MATHEMATICS_KEYWORDS: &[&str] = &[
    "math",
    "number",
    "count",
    "shape",
    "pattern",
    "measure",
    "measuring",
    "sorting",
    "numeracy",
    "compare",
    "comparing",
    "graph",
    "sequence",
    "size",
    "addition",
    "subtract",
    "tally",
];

pub const LIFE_SKILLS_KEYWORDS: &[&str] = &[
    "life skill",
    "personal",
    "social",
    "emotional",
    "feeling",
    "hygiene",
    "handwash",
    "wash hands",
    "health",
    "safety",
    "creative",
    "painting",
    "drawing",
    "craft",
    "collage",
    "music",
    "movement",
    "physical",
    "gross motor",
    "fine motor",
    "beginning knowledge",
    "self-care",
    "friendship",
    "dance",
    "play",
];

/// Block types that count as Life Skills on their own.
pub const LIFE_SKILLS_BLOCK_TYPES: &[BlockType] = &[
    BlockType::Movement,
    BlockType::Outdoor,
    BlockType::Meal,
    BlockType::Nap,
];

/// Prefix for annotation lines in `notes` / `transition_cue`. Lines carrying it
/// are ignored by signal matching.
pub const ANNOTATION_MARKER: &str = "[CAPS]";
/// Prefix of the reinforcement objective appended to gap days.
pub const REINFORCEMENT_PREFIX: &str = "CAPS reinforcement:";

const WEATHER_CHECK_IN_PREFIX: &str = "Weather Check-In: ";
const WEATHER_OBJECTIVE: &str = "Daily weather observation";
const WEATHER_CHECK_IN_CUE: &str = "Look outside together and name today's weather before moving on.";
/// Days this full get an existing block rewritten instead of a new one.
const WEATHER_REWRITE_THRESHOLD: usize = 6;
const MAX_WEATHER_OBJECTIVES: usize = 3;
const MAX_REINFORCEMENT_OBJECTIVES: usize = 4;

/// Checks per week: five weekdays times four strands.
pub const TOTAL_COVERAGE_CHECKS: u8 = 20;

/// Result of running every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforcedProgram {
    /// Monday–Friday only, sorted by (day, order), orders dense per day.
    pub blocks: Vec<DailyProgramBlock>,
    /// Computed from `blocks` as returned.
    pub caps_coverage: CapsCoverage,
    /// Human-readable record of every change made.
    pub adjustments: Vec<String>,
}

/// Run all passes in order.
pub fn enforce_invariants(blocks: Vec<DailyProgramBlock>) -> EnforcedProgram {
    let mut adjustments = Vec::new();

    let (blocks, notes) = ensure_weekday_coverage(blocks);
    adjustments.extend(notes);

    let (blocks, notes) = ensure_daily_weather(blocks);
    adjustments.extend(notes);

    let before_annotation = compute_caps_coverage(&blocks);
    let (blocks, notes) = annotate_caps_gaps(blocks, &before_annotation);
    adjustments.extend(notes);

    let caps_coverage = compute_caps_coverage(&blocks);

    EnforcedProgram {
        blocks,
        caps_coverage,
        adjustments,
    }
}

// =============================================================================
// Day grouping
// =============================================================================

/// Group blocks by school day (each sorted by order). Weekend blocks are
/// dropped; the second value counts them.
fn group_school_days(
    blocks: Vec<DailyProgramBlock>,
) -> (BTreeMap<u8, Vec<DailyProgramBlock>>, usize) {
    let mut by_day: BTreeMap<u8, Vec<DailyProgramBlock>> = BTreeMap::new();
    let mut dropped = 0;
    for block in blocks {
        if SCHOOL_DAYS.contains(&block.day_of_week) {
            by_day.entry(block.day_of_week).or_default().push(block);
        } else {
            dropped += 1;
        }
    }
    for day_blocks in by_day.values_mut() {
        day_blocks.sort_by_key(|b| b.block_order);
    }
    (by_day, dropped)
}

/// Flatten day groups in day order, numbering each day 1..N.
fn flatten_renumbered(by_day: BTreeMap<u8, Vec<DailyProgramBlock>>) -> Vec<DailyProgramBlock> {
    by_day
        .into_values()
        .flat_map(|day_blocks| {
            day_blocks.into_iter().enumerate().map(|(i, mut block)| {
                block.block_order = u32::try_from(i + 1).unwrap_or(u32::MAX);
                block
            })
        })
        .collect()
}

// =============================================================================
// Pass 1: weekday coverage
// =============================================================================

/// Every weekday 1–5 gets at least one block; weekend blocks are dropped.
pub fn ensure_weekday_coverage(
    blocks: Vec<DailyProgramBlock>,
) -> (Vec<DailyProgramBlock>, Vec<String>) {
    let mut notes = Vec::new();
    let (mut by_day, dropped) = group_school_days(blocks);

    if dropped > 0 {
        notes.push(format!(
            "Dropped {} weekend block(s); weekly programs cover Monday to Friday only.",
            dropped
        ));
    }

    for day in SCHOOL_DAYS {
        let day_blocks = by_day.entry(day).or_default();
        if day_blocks.is_empty() {
            day_blocks.push(routine_starter_block(day));
            notes.push(format!(
                "{} had no activities in the AI response; added a routine starter placeholder.",
                weekday_name(day)
            ));
        }
    }

    (flatten_renumbered(by_day), notes)
}

fn routine_starter_block(day: u8) -> DailyProgramBlock {
    let name = weekday_name(day);
    DailyProgramBlock {
        day_of_week: day,
        block_order: 1,
        block_type: BlockType::Transition,
        title: format!("{} Routine Starter", name),
        start_time: None,
        end_time: None,
        objectives: vec![
            "Settle into the day with a familiar welcome".to_string(),
            "Review the visual schedule together".to_string(),
        ],
        materials: vec!["Visual timetable".to_string(), "Name cards".to_string()],
        transition_cue: None,
        notes: Some(format!(
            "Auto-filled: the AI response had no activities for {}. Replace this with a planned activity.",
            name
        )),
        parent_tip: None,
    }
}

// =============================================================================
// Pass 2: daily weather routine
// =============================================================================

/// Every weekday gets a block carrying a weather signal.
///
/// Full days (6+ blocks) have their circle-time block (or first block)
/// rewritten as a weather check-in; other days get a weather circle appended.
pub fn ensure_daily_weather(blocks: Vec<DailyProgramBlock>) -> (Vec<DailyProgramBlock>, Vec<String>) {
    let mut notes = Vec::new();
    let (mut by_day, _) = group_school_days(blocks);

    for (day, day_blocks) in by_day.iter_mut() {
        if day_blocks.is_empty() || day_blocks.iter().any(has_weather_signal) {
            continue;
        }

        if day_blocks.len() >= WEATHER_REWRITE_THRESHOLD {
            let idx = day_blocks
                .iter()
                .position(|b| b.block_type == BlockType::CircleTime)
                .unwrap_or(0);
            let block = day_blocks.remove(idx);
            let title = block.title.clone();
            day_blocks.insert(idx, weather_check_in(block));
            notes.push(format!(
                "{}: turned \"{}\" into a weather check-in to keep the daily weather routine.",
                weekday_name(*day),
                title
            ));
        } else {
            let next_order = day_blocks.iter().map(|b| b.block_order).max().unwrap_or(0) + 1;
            day_blocks.push(weather_circle_block(*day, next_order));
            notes.push(format!(
                "{}: added a weather circle to keep the daily weather routine.",
                weekday_name(*day)
            ));
        }
    }

    (flatten_renumbered(by_day), notes)
}

fn weather_check_in(mut block: DailyProgramBlock) -> DailyProgramBlock {
    if !block.title.starts_with(WEATHER_CHECK_IN_PREFIX) {
        block.title = format!("{}{}", WEATHER_CHECK_IN_PREFIX, block.title);
    }
    if block
        .transition_cue
        .as_deref()
        .map(|cue| cue.trim().is_empty())
        .unwrap_or(true)
    {
        block.transition_cue = Some(WEATHER_CHECK_IN_CUE.to_string());
    }
    block.objectives = merge_capped(block.objectives, WEATHER_OBJECTIVE, MAX_WEATHER_OBJECTIVES);
    block
}

fn weather_circle_block(day: u8, block_order: u32) -> DailyProgramBlock {
    DailyProgramBlock {
        day_of_week: day,
        block_order,
        block_type: BlockType::CircleTime,
        title: "Weather Circle & Calendar Talk".to_string(),
        start_time: None,
        end_time: None,
        objectives: vec![
            "Observe and describe today's weather".to_string(),
            "Name the day and date on the class calendar".to_string(),
            "Notice how the weather changes across the week".to_string(),
        ],
        materials: vec![
            "Weather chart".to_string(),
            "Class calendar".to_string(),
            "Weather symbol cards".to_string(),
        ],
        transition_cue: Some("Walk to the carpet for weather circle.".to_string()),
        notes: Some("Auto-added so the weather routine repeats every day.".to_string()),
        parent_tip: None,
    }
}

// =============================================================================
// Signal matching
// =============================================================================

/// Lowercased text used for keyword matching. Annotation lines and
/// reinforcement objectives are excluded so annotating never changes a match.
fn signal_text(block: &DailyProgramBlock, include_lists: bool) -> String {
    let mut parts: Vec<&str> = vec![block.block_type.as_str(), block.title.as_str()];
    for field in [&block.notes, &block.transition_cue] {
        if let Some(text) = field {
            parts.extend(
                text.lines()
                    .filter(|line| !line.trim_start().starts_with(ANNOTATION_MARKER)),
            );
        }
    }
    if include_lists {
        parts.extend(
            block
                .objectives
                .iter()
                .map(String::as_str)
                .filter(|o| !o.starts_with(REINFORCEMENT_PREFIX)),
        );
        parts.extend(block.materials.iter().map(String::as_str));
    }
    parts.join(" ").to_lowercase()
}

fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Weather keyword in type, title, notes or transition cue.
pub fn has_weather_signal(block: &DailyProgramBlock) -> bool {
    matches_any(&signal_text(block, false), WEATHER_KEYWORDS)
}

fn block_has_strand(block: &DailyProgramBlock, strand: CapsStrand) -> bool {
    match strand {
        CapsStrand::DailyWeather => has_weather_signal(block),
        CapsStrand::HomeLanguage => matches_any(&signal_text(block, true), HOME_LANGUAGE_KEYWORDS),
        CapsStrand::Mathematics => matches_any(&signal_text(block, true), MATHEMATICS_KEYWORDS),
        CapsStrand::LifeSkills => {
            LIFE_SKILLS_BLOCK_TYPES.contains(&block.block_type)
                || matches_any(&signal_text(block, true), LIFE_SKILLS_KEYWORDS)
        }
    }
}

// =============================================================================
// Pass 3: coverage
// =============================================================================

/// Per-weekday strand coverage and the overall score.
pub fn compute_caps_coverage(blocks: &[DailyProgramBlock]) -> CapsCoverage {
    let mut coverage = CapsCoverage {
        total_checks: TOTAL_COVERAGE_CHECKS,
        ..Default::default()
    };

    for day in SCHOOL_DAYS {
        let day_blocks: Vec<&DailyProgramBlock> =
            blocks.iter().filter(|b| b.day_of_week == day).collect();
        let mut missing = Vec::new();

        for strand in CapsStrand::ALL {
            if day_blocks.iter().any(|b| block_has_strand(b, strand)) {
                coverage.passed_checks += 1;
                match strand {
                    CapsStrand::HomeLanguage => coverage.home_language_days.push(day),
                    CapsStrand::Mathematics => coverage.mathematics_days.push(day),
                    CapsStrand::LifeSkills => coverage.life_skills_days.push(day),
                    CapsStrand::DailyWeather => coverage.weather_days.push(day),
                }
            } else {
                missing.push(strand);
            }
        }

        if !missing.is_empty() {
            coverage.gaps.push(DayCoverageGap {
                day_of_week: day,
                day_name: weekday_name(day).to_string(),
                missing,
            });
        }
    }

    coverage.coverage_score = coverage_score(coverage.passed_checks, coverage.total_checks);
    coverage
}

/// `round(100 * passed / total)`, clamped to 0–100.
pub fn coverage_score(passed: u8, total: u8) -> u8 {
    if total == 0 {
        return 0;
    }
    let score = (100.0 * f64::from(passed) / f64::from(total)).round();
    score.clamp(0.0, 100.0) as u8
}

// =============================================================================
// Pass 4: gap annotation
// =============================================================================

/// Flag each gap day on its first block. Only appends; never removes content.
pub fn annotate_caps_gaps(
    blocks: Vec<DailyProgramBlock>,
    coverage: &CapsCoverage,
) -> (Vec<DailyProgramBlock>, Vec<String>) {
    let mut notes = Vec::new();
    let (mut by_day, _) = group_school_days(blocks);

    for gap in &coverage.gaps {
        let Some(first) = by_day.get_mut(&gap.day_of_week).and_then(|b| b.first_mut()) else {
            continue;
        };
        let labels = gap
            .missing
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ");

        first.objectives = append_within_cap(
            std::mem::take(&mut first.objectives),
            &format!("{} {}", REINFORCEMENT_PREFIX, labels),
            MAX_REINFORCEMENT_OBJECTIVES,
        );
        first.notes = Some(append_line(
            first.notes.take(),
            &format!(
                "{} Coverage gap: plan a short {} moment today.",
                ANNOTATION_MARKER, labels
            ),
        ));
        if gap.missing.contains(&CapsStrand::DailyWeather) {
            first.transition_cue = Some(append_line(
                first.transition_cue.take(),
                &format!(
                    "{} Add a quick weather check during this transition.",
                    ANNOTATION_MARKER
                ),
            ));
        }

        notes.push(format!("{}: flagged missing {}.", gap.day_name, labels));
    }

    (flatten_renumbered(by_day), notes)
}

/// Dedupe (case-insensitive), keep at most `cap` entries, and make sure `item`
/// is one of them.
fn merge_capped(list: Vec<String>, item: &str, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cap);
    for entry in list {
        let duplicate = out.iter().any(|e| e.eq_ignore_ascii_case(&entry));
        if !duplicate && !entry.eq_ignore_ascii_case(item) {
            out.push(entry);
        }
    }
    out.truncate(cap.saturating_sub(1));
    out.push(item.to_string());
    out
}

/// Append `item` when it is new and the list is under `cap`. Existing entries
/// are never dropped; a full list keeps only the note-level annotation.
fn append_within_cap(mut list: Vec<String>, item: &str, cap: usize) -> Vec<String> {
    let present = list.iter().any(|e| e.eq_ignore_ascii_case(item));
    if !present && list.len() < cap {
        list.push(item.to_string());
    }
    list
}

fn append_line(existing: Option<String>, line: &str) -> String {
    match existing {
        Some(text) if text.lines().any(|l| l.trim() == line) => text,
        Some(text) if !text.trim().is_empty() => format!("{}\n{}", text.trim_end(), line),
        _ => line.to_string(),
    }
}
