//! API support shared by deckscope services

pub mod auth;
