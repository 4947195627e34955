//! Library entrypoint for PaperMarket.
//!
//! The binary in `main.rs` only wires configuration, storage and the quote
//! source together; everything else lives here so integration tests under
//! `tests/` can build an `AppState` over the in-memory store.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{locks::AccountLocks, quotes::QuoteSource, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn Store>,
    pub quotes: Arc<dyn QuoteSource>,
    pub locks: AccountLocks,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}

impl AppState {
    pub fn new(settings: config::Settings, store: Arc<dyn Store>, quotes: Arc<dyn QuoteSource>) -> Self {
        let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(64);
        Self {
            settings,
            store,
            quotes,
            locks: AccountLocks::new(),
            events_tx,
        }
    }

    /// Broadcasts event names so open `/events` streams can refresh.
    pub fn publish(&self, events: &[&str]) {
        for ev in events {
            // no subscribers is fine
            let _ = self.events_tx.send((*ev).to_string());
        }
    }
}
