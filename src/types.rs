use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Weekly Program Draft
// =============================================================================

/// Lifecycle tag of a weekly program. This pipeline only ever creates drafts;
/// later transitions belong to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    Draft,
}

/// Who authored a weekly program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramSource {
    Ai,
}

/// AI-generated weekly activity plan pending review.
///
/// Built once per generation call and never mutated afterwards; the caller
/// owns persistence and later edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyProgramDraft {
    pub organization_id: String,
    pub created_by: String,
    /// Always a Monday.
    pub week_start_date: NaiveDate,
    /// Always `week_start_date + 4 days` (Friday).
    pub week_end_date: NaiveDate,
    pub theme: String,
    pub age_group: String,
    pub title: String,
    pub summary: String,
    pub status: ProgramStatus,
    pub source: ProgramSource,
    pub generation_context: GenerationContext,
    /// Sorted by (`day_of_week`, `block_order`).
    pub blocks: Vec<DailyProgramBlock>,
}

/// Enumerated activity kind. Unknown values coerce to `Learning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    CircleTime,
    Learning,
    Movement,
    Outdoor,
    Meal,
    Nap,
    Assessment,
    Transition,
    Other,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::CircleTime => "circle_time",
            BlockType::Learning => "learning",
            BlockType::Movement => "movement",
            BlockType::Outdoor => "outdoor",
            BlockType::Meal => "meal",
            BlockType::Nap => "nap",
            BlockType::Assessment => "assessment",
            BlockType::Transition => "transition",
            BlockType::Other => "other",
        }
    }

    /// Coerce a free-form type label from model output.
    ///
    /// Accepts the canonical names plus common synonyms ("snack", "rest",
    /// "morning ring"); anything else becomes `Learning`.
    pub fn coerce(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let key = key.trim_matches('_');

        match key {
            "circle_time" | "circle" | "circletime" | "morning_circle" | "morning_ring"
            | "ring_time" | "greeting" | "calendar" => BlockType::CircleTime,
            "learning" | "lesson" | "activity" | "theme" | "focus" => BlockType::Learning,
            "movement" | "music_and_movement" | "music_movement" | "physical"
            | "physical_education" | "gross_motor" | "dance" => BlockType::Movement,
            "outdoor" | "outdoor_play" | "outside" | "outside_play" | "free_play_outdoors" => {
                BlockType::Outdoor
            }
            "meal" | "snack" | "lunch" | "breakfast" | "snack_time" | "lunch_time" | "meals" => {
                BlockType::Meal
            }
            "nap" | "rest" | "rest_time" | "sleep" | "nap_time" | "quiet_time" => BlockType::Nap,
            "assessment" | "observation" | "evaluation" | "review" => BlockType::Assessment,
            "transition" | "tidy_up" | "clean_up" | "toilet" | "toilet_routine" | "arrival"
            | "departure" | "hygiene" => BlockType::Transition,
            "other" => BlockType::Other,
            _ => BlockType::Learning,
        }
    }
}

/// One schedulable activity slot within a school day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProgramBlock {
    /// 1 = Monday ... 7 = Sunday. Emitted drafts only contain 1–5.
    pub day_of_week: u8,
    /// Dense 1-based position within the day.
    pub block_order: u32,
    pub block_type: BlockType,
    pub title: String,
    /// `HH:MM`, never fabricated.
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub objectives: Vec<String>,
    pub materials: Vec<String>,
    pub transition_cue: Option<String>,
    pub notes: Option<String>,
    /// Only ever copied from model output, never synthesized.
    pub parent_tip: Option<String>,
}

// =============================================================================
// Generation Context (audit record)
// =============================================================================

/// Operator-facing audit record. Never consumed programmatically downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight: Option<PreflightAnswers>,
    #[serde(default)]
    pub routine_constraints: RoutineConstraints,
    #[serde(default)]
    pub weekly_objectives: Vec<String>,
    /// Human-readable assumptions and adjustments made while building the draft.
    #[serde(default)]
    pub assumptions: Vec<String>,
    pub caps_coverage: CapsCoverage,
    #[serde(default)]
    pub holidays: Vec<WeekHoliday>,
    #[serde(default)]
    pub repair_attempted: bool,
    /// Hex SHA-256 of the model output the blocks were recovered from.
    pub raw_response_sha256: String,
}

/// A public holiday falling on a weekday of the target week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekHoliday {
    pub day_of_week: u8,
    pub date: NaiveDate,
    pub name: String,
}

/// Curriculum strand checked per weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapsStrand {
    HomeLanguage,
    Mathematics,
    LifeSkills,
    DailyWeather,
}

impl CapsStrand {
    pub const ALL: [CapsStrand; 4] = [
        CapsStrand::HomeLanguage,
        CapsStrand::Mathematics,
        CapsStrand::LifeSkills,
        CapsStrand::DailyWeather,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CapsStrand::HomeLanguage => "Home Language",
            CapsStrand::Mathematics => "Mathematics",
            CapsStrand::LifeSkills => "Life Skills",
            CapsStrand::DailyWeather => "Daily Weather",
        }
    }
}

/// Strands missing on one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCoverageGap {
    pub day_of_week: u8,
    pub day_name: String,
    pub missing: Vec<CapsStrand>,
}

/// Curriculum-strand coverage across Monday–Friday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsCoverage {
    /// `round(100 * passed_checks / total_checks)`.
    pub coverage_score: u8,
    pub passed_checks: u8,
    pub total_checks: u8,
    pub home_language_days: Vec<u8>,
    pub mathematics_days: Vec<u8>,
    pub life_skills_days: Vec<u8>,
    pub weather_days: Vec<u8>,
    pub gaps: Vec<DayCoverageGap>,
}

// =============================================================================
// Generation Request
// =============================================================================

/// Structured "preflight" constraint answers collected before generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightAnswers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_negotiables: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_timings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learner_needs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_focus: Option<String>,
}

impl PreflightAnswers {
    /// Labelled non-empty answers, in prompt order.
    pub fn answered(&self) -> Vec<(&'static str, &str)> {
        [
            ("Non-negotiables", &self.non_negotiables),
            ("Fixed timings", &self.fixed_timings),
            ("Learner needs", &self.learner_needs),
            ("Resource constraints", &self.resource_constraints),
            ("Assessment focus", &self.assessment_focus),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (label, v))
        })
        .collect()
    }
}

/// Optional routine requirements, each translated into a prompt instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineConstraints {
    #[serde(default)]
    pub toilet_routine: bool,
    #[serde(default)]
    pub nap_time: bool,
    #[serde(default)]
    pub meal_blocks: bool,
    #[serde(default)]
    pub outdoor_play: bool,
    #[serde(default)]
    pub story_circle: bool,
    #[serde(default)]
    pub transition_cues: bool,
    #[serde(default)]
    pub hygiene_checks: bool,
}

/// Input to `generate_weekly_program_from_term`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProgramInput {
    pub organization_id: String,
    pub created_by: String,
    /// Any day of the target week.
    pub week_anchor_date: NaiveDate,
    pub theme: String,
    pub age_group: String,
    #[serde(default)]
    pub weekly_objectives: Vec<String>,
    #[serde(default)]
    pub preflight: Option<PreflightAnswers>,
    #[serde(default)]
    pub constraints: RoutineConstraints,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_coerce_canonical() {
        assert_eq!(BlockType::coerce("circle_time"), BlockType::CircleTime);
        assert_eq!(BlockType::coerce("Outdoor"), BlockType::Outdoor);
        assert_eq!(BlockType::coerce("nap"), BlockType::Nap);
    }

    #[test]
    fn test_block_type_coerce_synonyms() {
        assert_eq!(BlockType::coerce("Circle Time"), BlockType::CircleTime);
        assert_eq!(BlockType::coerce("snack"), BlockType::Meal);
        assert_eq!(BlockType::coerce("Rest time"), BlockType::Nap);
        assert_eq!(BlockType::coerce("tidy-up"), BlockType::Transition);
    }

    #[test]
    fn test_block_type_coerce_unknown_is_learning() {
        assert_eq!(BlockType::coerce("science experiment"), BlockType::Learning);
        assert_eq!(BlockType::coerce(""), BlockType::Learning);
    }

    #[test]
    fn test_block_type_serializes_snake_case() {
        let json = serde_json::to_string(&BlockType::CircleTime).unwrap();
        assert_eq!(json, "\"circle_time\"");
    }

    #[test]
    fn test_status_and_source_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ProgramStatus::Draft).unwrap(), "\"draft\"");
        assert_eq!(serde_json::to_string(&ProgramSource::Ai).unwrap(), "\"ai\"");
    }

    #[test]
    fn test_preflight_answered_skips_blank() {
        let preflight = PreflightAnswers {
            non_negotiables: Some("Assembly on Friday".to_string()),
            fixed_timings: Some("   ".to_string()),
            learner_needs: None,
            resource_constraints: Some("No projector".to_string()),
            assessment_focus: None,
        };
        let answered = preflight.answered();
        assert_eq!(
            answered,
            vec![
                ("Non-negotiables", "Assembly on Friday"),
                ("Resource constraints", "No projector"),
            ]
        );
    }

    #[test]
    fn test_generate_input_accepts_minimal_json() {
        let input: GenerateProgramInput = serde_json::from_str(
            r#"{
                "organizationId": "org-1",
                "createdBy": "teacher-1",
                "weekAnchorDate": "2025-03-05",
                "theme": "Transport",
                "ageGroup": "4-5 years"
            }"#,
        )
        .unwrap();
        assert!(input.weekly_objectives.is_empty());
        assert!(input.preflight.is_none());
        assert!(!input.constraints.nap_time);
    }
}
