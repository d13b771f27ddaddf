//! Generate a draft weekly program from a request file.
//!
//! Usage: `weekplan <request.json>`
//! Reads ~/.weekplan/config.json. Prints the draft as JSON on stdout; on
//! failure prints the error payload as JSON on stderr and exits 1.
//! Set `RUST_LOG=info` (or `debug`) to see pipeline logs.

use std::path::PathBuf;
use std::process::ExitCode;

use weekplan_lib::config::{load_config, load_request};
use weekplan_lib::holidays::{HolidayCalendar, NagerHolidayCalendar};
use weekplan_lib::provider::HttpCompletionProvider;
use weekplan_lib::types::WeeklyProgramDraft;
use weekplan_lib::{generate_weekly_program_from_term, GenerationErrorPayload, ProgramError};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(draft) => match serde_json::to_string_pretty(&draft) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Failed to serialize draft: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<WeeklyProgramDraft, ProgramError> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| ProgramError::InvalidInput("usage: weekplan <request.json>".to_string()))?;

    let input = load_request(&path)?;
    let config = load_config()?;
    config.validate()?;

    let provider = HttpCompletionProvider::new(&config.ai)?;
    let calendar = config
        .holidays
        .enabled
        .then(|| NagerHolidayCalendar::new(&config.holidays));

    generate_weekly_program_from_term(
        &provider,
        calendar.as_ref().map(|c| c as &dyn HolidayCalendar),
        &input,
    )
    .await
}

fn report(err: &ProgramError) {
    let payload = GenerationErrorPayload::from(err);
    match serde_json::to_string_pretty(&payload) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
}
