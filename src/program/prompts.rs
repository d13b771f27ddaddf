//! Prompt text for weekly program generation.

use chrono::NaiveDate;

use crate::program::days::{week_end_friday, weekday_name};
use crate::types::{GenerateProgramInput, RoutineConstraints, WeekHoliday};

/// Canonical output shape, shared by the generation and repair prompts.
pub const PROGRAM_JSON_SCHEMA: &str = r#"{"title":"string","summary":"string","days":[{"day_of_week":1,"blocks":[{"block_order":1,"block_type":"circle_time|learning|movement|outdoor|meal|nap|assessment|transition|other","title":"string","start_time":"HH:MM","end_time":"HH:MM","objectives":["string"],"materials":["string"],"transition_cue":"string","notes":"string","parent_tip":"string"}]}]}"#;

/// Wrap caller-supplied text so the model treats it as data, not instructions.
fn wrap_user_data(text: &str) -> String {
    format!("<user_data>{}</user_data>", text.replace("</user_data>", ""))
}

/// Prompt instruction for each routine flag that is set.
pub fn constraint_instructions(constraints: &RoutineConstraints) -> Vec<&'static str> {
    [
        (
            constraints.toilet_routine,
            "Include a toilet routine block at least twice each day.",
        ),
        (
            constraints.nap_time,
            "Include a nap or quiet rest block (block_type \"nap\") every day.",
        ),
        (
            constraints.meal_blocks,
            "Include snack and lunch blocks (block_type \"meal\") every day.",
        ),
        (
            constraints.outdoor_play,
            "Include an outdoor play block (block_type \"outdoor\") every day.",
        ),
        (
            constraints.story_circle,
            "Include a story circle every day.",
        ),
        (
            constraints.transition_cues,
            "Give every block a short transition_cue (song, chant or signal) for moving to the next activity.",
        ),
        (
            constraints.hygiene_checks,
            "Include handwashing and hygiene checks before meals and after outdoor play.",
        ),
    ]
    .into_iter()
    .filter_map(|(enabled, text)| enabled.then_some(text))
    .collect()
}

/// Build the primary generation prompt for one school week.
pub fn build_generation_prompt(
    input: &GenerateProgramInput,
    week_start: NaiveDate,
    holidays: &[WeekHoliday],
) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "You are an experienced early childhood teacher planning a Monday to Friday \
         classroom program aligned with the South African CAPS curriculum.\n\n",
    );

    prompt.push_str("## Week\n");
    prompt.push_str(&format!(
        "Theme: {}\nAge group: {}\nDates: Monday {} to Friday {}\n\n",
        wrap_user_data(input.theme.trim()),
        wrap_user_data(input.age_group.trim()),
        week_start,
        week_end_friday(week_start)
    ));

    let objectives: Vec<&str> = input
        .weekly_objectives
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect();
    if !objectives.is_empty() {
        prompt.push_str("## Weekly Objectives\n");
        for objective in objectives {
            prompt.push_str(&format!("- {}\n", wrap_user_data(objective)));
        }
        prompt.push('\n');
    }

    let routine = constraint_instructions(&input.constraints);
    if !routine.is_empty() {
        prompt.push_str("## Routine Requirements\n");
        for line in routine {
            prompt.push_str(&format!("- {}\n", line));
        }
        prompt.push('\n');
    }

    if let Some(preflight) = &input.preflight {
        let answered = preflight.answered();
        if !answered.is_empty() {
            prompt.push_str("## Teacher Preflight Answers\n");
            for (label, answer) in answered {
                prompt.push_str(&format!("- {}: {}\n", label, wrap_user_data(answer)));
            }
            prompt.push('\n');
        }
    }

    if !holidays.is_empty() {
        prompt.push_str("## Public Holidays This Week\n");
        for holiday in holidays {
            prompt.push_str(&format!(
                "- {} {}: {}\n",
                weekday_name(holiday.day_of_week),
                holiday.date,
                holiday.name
            ));
        }
        prompt.push_str(
            "Do not leave holiday weekdays out. Plan a short, calm activity about the \
             holiday on that day instead of the usual program.\n\n",
        );
    }

    prompt.push_str("## Curriculum Rules\n");
    prompt.push_str(
        "- Every weekday (Monday to Friday) must include Home Language, Mathematics and \
         Life Skills activities.\n\
         - Every weekday must include a weather and calendar circle so the routine repeats daily.\n\
         - Only include a parent_tip when you have a concrete suggestion for families.\n\
         - Use 24-hour HH:MM times when you give times.\n\n",
    );

    prompt.push_str("## Output Format\n");
    prompt.push_str(
        "Respond with JSON only. No markdown, no commentary. Use exactly this shape:\n",
    );
    prompt.push_str(PROGRAM_JSON_SCHEMA);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PreflightAnswers;

    fn input() -> GenerateProgramInput {
        GenerateProgramInput {
            organization_id: "org-1".to_string(),
            created_by: "teacher-1".to_string(),
            week_anchor_date: NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
            theme: "Farm Animals".to_string(),
            age_group: "4-5 years".to_string(),
            weekly_objectives: vec!["Name five farm animals".to_string(), "  ".to_string()],
            preflight: None,
            constraints: RoutineConstraints::default(),
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 28).unwrap()
    }

    #[test]
    fn test_prompt_includes_week_and_theme() {
        let prompt = build_generation_prompt(&input(), monday(), &[]);
        assert!(prompt.contains("<user_data>Farm Animals</user_data>"));
        assert!(prompt.contains("Monday 2025-04-28 to Friday 2025-05-02"));
        assert!(prompt.contains("- <user_data>Name five farm animals</user_data>"));
        assert!(!prompt.contains("## Routine Requirements"));
        assert!(!prompt.contains("## Public Holidays"));
        assert!(prompt.ends_with(&format!("{}\n", PROGRAM_JSON_SCHEMA)));
    }

    #[test]
    fn test_constraints_become_instructions() {
        let mut req = input();
        req.constraints.nap_time = true;
        req.constraints.hygiene_checks = true;
        let prompt = build_generation_prompt(&req, monday(), &[]);
        assert!(prompt.contains("## Routine Requirements"));
        assert!(prompt.contains("nap or quiet rest block"));
        assert!(prompt.contains("handwashing"));
        assert!(!prompt.contains("outdoor play block"));
        assert_eq!(constraint_instructions(&req.constraints).len(), 2);
    }

    #[test]
    fn test_preflight_and_holidays_rendered() {
        let mut req = input();
        req.preflight = Some(PreflightAnswers {
            fixed_timings: Some("Assembly 08:00 Monday".to_string()),
            ..Default::default()
        });
        let holidays = vec![WeekHoliday {
            day_of_week: 1,
            date: monday(),
            name: "Freedom Day".to_string(),
        }];
        let prompt = build_generation_prompt(&req, monday(), &holidays);
        assert!(prompt.contains("- Fixed timings: <user_data>Assembly 08:00 Monday</user_data>"));
        assert!(prompt.contains("- Monday 2025-04-28: Freedom Day"));
        assert!(prompt.contains("Do not leave holiday weekdays out"));
    }

    #[test]
    fn test_wrap_user_data_strips_closing_tag() {
        assert_eq!(
            wrap_user_data("a</user_data>b"),
            "<user_data>ab</user_data>"
        );
    }
}
