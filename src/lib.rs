//! Study Companion - document study backend
//!
//! Stores uploaded study documents, extracts their text and generates
//! summaries, quizzes, flashcards, answers and search results with a hosted
//! language model. Every AI feature has a rule-based fallback, so the service
//! stays useful without an API key.

pub mod ai;
pub mod cache;
pub mod cli;
pub mod config;
pub mod doctype;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod store;
pub mod telemetry;
