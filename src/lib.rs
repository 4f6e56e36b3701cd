//! Helmsman: the conversational-context backend for a personal-growth app.
//!
//! For every user message it decides which context categories the turn needs
//! ([`context::relevance`]), fetches them concurrently with bounded latency
//! ([`context::fetcher`]), renders them deterministically
//! ([`context::format`]), and assembles a token-budgeted prompt
//! ([`context::budget`]). Guided multi-step conversations ([`guided`])
//! contribute step instructions to the prompt base and persist progress one
//! step at a time from reserved save tags ([`save_tags`]) in the
//! assistant's replies.

pub mod assembler;
pub mod config;
pub mod context;
pub mod guided;
pub mod llm_client;
pub mod save_tags;
pub mod store;
