use std::path::PathBuf;

use thiserror::Error;

use crate::modules::grid::GridPos;
use crate::modules::resource::{Amount, ResourceKind};

/// Non-fatal rejection of a requested action. State is never mutated when one
/// of these is returned.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("unknown job '{0}'")]
    UnknownJob(String),
    #[error("unknown building type '{0}'")]
    UnknownBuilding(String),
    #[error("{name} cannot perform {action} (wrong job: {job})")]
    WrongJob {
        name: String,
        action: &'static str,
        job: &'static str,
    },
    #[error("{name} too tired for {action} (stamina {stamina:.2} < {required:.2})")]
    TooTired {
        name: String,
        action: &'static str,
        stamina: f32,
        required: f32,
    },
    #[error("not enough {resource} for {action} (need {required}, have {available})")]
    InsufficientResource {
        action: &'static str,
        resource: ResourceKind,
        required: Amount,
        available: Amount,
    },
    #[error("actor '{0}' not found")]
    ActorNotFound(String),
    #[error("actor '{0}' already exists")]
    DuplicateActor(String),
    #[error("illegal job change for {name}: {from} (T{from_tier}) -> {to} (T{to_tier})")]
    IllegalPromotion {
        name: String,
        from: &'static str,
        from_tier: u8,
        to: &'static str,
        to_tier: u8,
    },
    #[error("job tier {0} is outside 1..=3")]
    InvalidTier(u8),
    #[error("position ({}, {}) out of bounds", .0.x, .0.y)]
    OutOfBounds(GridPos),
    #[error("target ({}, {}) is too far away (distance {distance}, max {max})", .target.x, .target.y)]
    TooFar {
        target: GridPos,
        distance: i32,
        max: i32,
    },
    #[error("tree {tree_id} at ({}, {}) not found or already cut", .position.x, .position.y)]
    TreeUnavailable { position: GridPos, tree_id: u64 },
    #[error("invalid action format: {0}")]
    InvalidFormat(String),
}

/// Failure talking to an external decision provider. Always recovered from by
/// falling back to the rule policy.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider returned an empty reply")]
    EmptyReply,
    #[error("decode: {0}")]
    Decode(String),
    #[error("missing LLM API key; set --llm-api-key or LLM_API_KEY")]
    MissingApiKey,
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Top-level errors surfaced to the CLI.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("builder '{0}' not found")]
    BuilderNotFound(String),
    #[error("builder '{0}' already exists")]
    BuilderExists(String),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
