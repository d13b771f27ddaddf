pub mod config;
pub mod error;
pub mod holidays;
pub mod program;
pub mod provider;
pub mod types;

pub use error::{GenerationErrorPayload, ProgramError};
pub use program::{draft_from_response_text, generate_weekly_program_from_term};
