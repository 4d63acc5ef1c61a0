// src/ingest/providers/mod.rs
pub mod bandsintown;
pub mod countdown;
pub mod ticketmaster;
