//! Rebuild a draft from a logged model response, offline.
//!
//! Usage: `replay_response <request.json> <response.txt>`
//! Runs extraction, normalization and the classroom rules exactly as a live
//! generation would, without calling the AI service (no repair step).

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use weekplan_lib::config::load_request;
use weekplan_lib::types::WeeklyProgramDraft;
use weekplan_lib::{draft_from_response_text, GenerationErrorPayload, ProgramError};

fn main() -> ExitCode {
    env_logger::init();

    match run() {
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
            let payload = GenerationErrorPayload::from(&e);
            match serde_json::to_string_pretty(&payload) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<WeeklyProgramDraft, ProgramError> {
    let mut args = std::env::args().skip(1);
    let (Some(request_path), Some(response_path)) = (args.next(), args.next()) else {
        return Err(ProgramError::InvalidInput(
            "usage: replay_response <request.json> <response.txt>".to_string(),
        ));
    };

    let input = load_request(&PathBuf::from(request_path))?;
    let text = fs::read_to_string(&response_path).map_err(|e| {
        ProgramError::InvalidInput(format!("Failed to read response {}: {}", response_path, e))
    })?;

    log::info!("Replaying {} chars of model output", text.chars().count());
    draft_from_response_text(&input, &text)
}
