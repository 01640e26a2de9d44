//! Parley - Multilingual Chat Pipeline
//! 
//! Detects the language of each message, normalizes it to English, answers
//! with one of several local generation backends served by ollama, and
//! translates the reply into the requested output language.

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod generate;
pub mod history;
pub mod languages;
pub mod ollama;
pub mod pipeline;
pub mod setup;
pub mod translate;
