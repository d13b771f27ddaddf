//! Weekly program generation: AI response recovery and classroom rules.

pub mod days;
pub mod extract;
pub mod generate;
pub mod materialize;
pub mod normalize;
pub mod prompts;
pub mod repair;
pub mod rules;

pub use extract::extract_json;
pub use generate::{draft_from_response_text, generate_weekly_program_from_term};
pub use materialize::materialize;
pub use normalize::{normalize, NormalizedProgram, RawDay};
pub use repair::repair;
pub use rules::{compute_caps_coverage, enforce_invariants, EnforcedProgram};
