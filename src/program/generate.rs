//! Weekly program generation entry point.
//!
//! Flow: prompt → completion → extract/normalize/materialize → (one repair if
//! extraction failed) → domain rules → draft. Any failure ends the call; no
//! partial draft is ever returned.

use chrono::NaiveDate;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::ProgramError;
use crate::holidays::{lookup_week_holidays, HolidayCalendar};
use crate::program::days::{week_end_friday, week_start_monday, weekday_name, SCHOOL_DAYS};
use crate::program::extract::extract_json;
use crate::program::materialize::materialize;
use crate::program::normalize::normalize;
use crate::program::prompts::build_generation_prompt;
use crate::program::repair::repair;
use crate::program::rules::enforce_invariants;
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::types::{
    GenerateProgramInput, GenerationContext, ProgramSource, ProgramStatus, WeekHoliday,
    WeeklyProgramDraft,
};

/// Characters of raw model output included in diagnostic logs.
const RAW_PREVIEW_CHARS: usize = 500;

/// Generate a draft weekly program for the week containing
/// `input.week_anchor_date`.
///
/// `holidays` is optional enrichment; a lookup failure is logged and the
/// program is generated without holiday context.
pub async fn generate_weekly_program_from_term(
    provider: &dyn CompletionProvider,
    holidays: Option<&dyn HolidayCalendar>,
    input: &GenerateProgramInput,
) -> Result<WeeklyProgramDraft, ProgramError> {
    validate_input(input)?;

    let week_start = week_start_monday(input.week_anchor_date);
    let mut assumptions = anchor_assumptions(input.week_anchor_date, week_start);

    let week_holidays = match holidays {
        Some(calendar) => match lookup_week_holidays(calendar, week_start).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Public holiday lookup failed, continuing without it: {}", e);
                assumptions.push(
                    "Public holidays could not be loaded; the program was planned without holiday context."
                        .to_string(),
                );
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let prompt = build_generation_prompt(input, week_start, &week_holidays);
    log::info!(
        "Generating weekly program for week of {} ({} chars of prompt)",
        week_start,
        prompt.len()
    );

    let request = CompletionRequest {
        prompt,
        metadata: json!({
            "purpose": "weekly_program_generation",
            "organizationId": input.organization_id,
            "weekStartDate": week_start.to_string(),
            "theme": input.theme,
        }),
    };

    let raw = provider.complete(&request).await.map_err(|e| {
        log::warn!("Weekly program completion failed: {}", e);
        ProgramError::from(e)
    })?;

    let (value, source_text, repair_attempted) = match extract_json(&raw) {
        Some(value) => (value, raw, false),
        None => {
            log::warn!(
                "AI output had no usable weekly program JSON ({} chars). Preview: {}",
                raw.chars().count(),
                preview(&raw)
            );
            match repair(provider, &raw).await {
                Some((value, repaired)) => {
                    assumptions.push(
                        "The first AI response was not valid JSON; the program was rebuilt from a repaired response."
                            .to_string(),
                    );
                    (value, repaired, true)
                }
                None => return Err(ProgramError::Unparseable),
            }
        }
    };

    build_draft(
        input,
        week_start,
        week_holidays,
        assumptions,
        &value,
        &source_text,
        repair_attempted,
    )
}

/// Build a draft from an already captured model response, without any
/// network calls. Repair is not attempted.
pub fn draft_from_response_text(
    input: &GenerateProgramInput,
    text: &str,
) -> Result<WeeklyProgramDraft, ProgramError> {
    validate_input(input)?;
    let week_start = week_start_monday(input.week_anchor_date);
    let assumptions = anchor_assumptions(input.week_anchor_date, week_start);

    let Some(value) = extract_json(text) else {
        log::warn!("Replayed response is not a weekly program. Preview: {}", preview(text));
        return Err(ProgramError::Unparseable);
    };

    build_draft(input, week_start, Vec::new(), assumptions, &value, text, false)
}

fn validate_input(input: &GenerateProgramInput) -> Result<(), ProgramError> {
    let required = [
        ("organizationId", &input.organization_id),
        ("createdBy", &input.created_by),
        ("theme", &input.theme),
        ("ageGroup", &input.age_group),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ProgramError::InvalidInput(format!("{} is required", field)));
        }
    }
    Ok(())
}

fn anchor_assumptions(anchor: NaiveDate, week_start: NaiveDate) -> Vec<String> {
    if anchor == week_start {
        Vec::new()
    } else {
        vec![format!(
            "Week anchor {} moved to Monday {} so the program covers Monday to Friday.",
            anchor, week_start
        )]
    }
}

/// Everything after a program value has been recovered.
fn build_draft(
    input: &GenerateProgramInput,
    week_start: NaiveDate,
    holidays: Vec<WeekHoliday>,
    mut assumptions: Vec<String>,
    value: &Value,
    source_text: &str,
    repair_attempted: bool,
) -> Result<WeeklyProgramDraft, ProgramError> {
    let program = normalize(value).ok_or(ProgramError::Unparseable)?;
    let blocks = materialize(&program);

    if !blocks.iter().any(|b| SCHOOL_DAYS.contains(&b.day_of_week)) {
        log::warn!(
            "Weekly program JSON produced no weekday blocks ({} materialized)",
            blocks.len()
        );
        return Err(ProgramError::EmptyProgram);
    }

    let theme = input.theme.trim();
    let title = match program.title {
        Some(title) => title,
        None => {
            assumptions.push("AI response had no title; named the program after the theme.".to_string());
            format!("{} Weekly Program", theme)
        }
    };
    let summary = match program.summary {
        Some(summary) => summary,
        None => {
            assumptions.push("AI response had no summary; used a default summary.".to_string());
            format!(
                "A Monday to Friday program exploring {} with {} learners.",
                theme,
                input.age_group.trim()
            )
        }
    };

    for holiday in &holidays {
        assumptions.push(format!(
            "{} falls on {} {}; the day stays in the plan.",
            holiday.name,
            weekday_name(holiday.day_of_week),
            holiday.date
        ));
    }

    let enforced = enforce_invariants(blocks);
    assumptions.extend(enforced.adjustments);

    log::info!(
        "Weekly program draft ready: {} blocks, CAPS coverage {}%{}",
        enforced.blocks.len(),
        enforced.caps_coverage.coverage_score,
        if repair_attempted { " (after repair)" } else { "" }
    );

    Ok(WeeklyProgramDraft {
        organization_id: input.organization_id.clone(),
        created_by: input.created_by.clone(),
        week_start_date: week_start,
        week_end_date: week_end_friday(week_start),
        theme: theme.to_string(),
        age_group: input.age_group.trim().to_string(),
        title,
        summary,
        status: ProgramStatus::Draft,
        source: ProgramSource::Ai,
        generation_context: GenerationContext {
            preflight: input.preflight.clone(),
            routine_constraints: input.constraints.clone(),
            weekly_objectives: input.weekly_objectives.clone(),
            assumptions,
            caps_coverage: enforced.caps_coverage,
            holidays,
            repair_attempted,
            raw_response_sha256: hex::encode(Sha256::digest(source_text.as_bytes())),
        },
        blocks: enforced.blocks,
    })
}

/// First `RAW_PREVIEW_CHARS` characters of `text`, for logs.
fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(RAW_PREVIEW_CHARS).collect();
    if text.chars().count() > RAW_PREVIEW_CHARS {
        out.push('…');
    }
    out
}
