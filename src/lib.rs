//! Windward - Conversational Flight Search and Booking Assistant
//!
//! Collects trip parameters through multi-turn dialogue with a language
//! model, then runs a dependent two-phase flight search and assembles
//! bookable itineraries.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
