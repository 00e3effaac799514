pub mod actions;
pub mod builder;
pub mod building;
pub mod config;
pub mod environment;
pub mod error;
pub mod grid;
pub mod llm;
pub mod oracle;
pub mod resource;
pub mod simulation;
pub mod stats;
pub mod view;
pub mod village;
