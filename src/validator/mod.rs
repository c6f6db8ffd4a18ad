pub mod agent;
pub mod primitives;
pub mod schema;

pub use agent::{
    is_known_agent, validate_agent_schema, validate_agent_transition, AGENT_ROSTER,
    ALLOWED_TRANSITIONS, TERMINAL_AGENT,
};
pub use primitives::{is_null_sentinel, parse_bool, validate_pattern, validate_type, TypeKind};
pub use schema::{
    checkpoint_id_pattern, state_schema, validate_checkpoint_schema, validate_state_document,
    validate_state_file, validate_state_schema, validate_state_yaml, GIT_REF_PATTERN,
};
