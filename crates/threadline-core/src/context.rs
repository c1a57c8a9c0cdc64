//! Explicit execution context passed into every core entry point.
//!
//! Carries the run mode (which decides whether live connectivity checks and
//! live mailbox fetches happen) and injected fixture mailboxes for tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::account::AccountId;
use crate::mailbox::RawMessage;

/// How the engine is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Regular operation: live mailboxes, live connectivity checks.
    #[default]
    Normal,
    /// First-time setup: accounts are saved without connectivity checks.
    Install,
    /// Data migration: accounts are saved without connectivity checks.
    Patch,
    /// Tests: no network, mailboxes come from injected fixtures.
    Test,
}

/// Execution context for ingestion and account management.
#[derive(Debug, Default)]
pub struct Context {
    mode: RunMode,
    fixtures: Mutex<HashMap<AccountId, Vec<RawMessage>>>,
}

impl Context {
    /// Creates a context for regular operation.
    #[must_use]
    pub fn normal() -> Self {
        Self::with_mode(RunMode::Normal)
    }

    /// Creates a test context with no fixtures.
    #[must_use]
    pub fn test() -> Self {
        Self::with_mode(RunMode::Test)
    }

    /// Creates a context with the given mode.
    #[must_use]
    pub fn with_mode(mode: RunMode) -> Self {
        Self {
            mode,
            fixtures: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the run mode.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Returns true when running under tests.
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.mode == RunMode::Test
    }

    /// Live connectivity checks only run in normal mode.
    #[must_use]
    pub fn checks_connectivity(&self) -> bool {
        self.mode == RunMode::Normal
    }

    /// Queues raw messages that the next test-mode pull of `account` returns
    /// instead of contacting a server.
    pub fn inject_fixtures(&self, account: AccountId, messages: Vec<RawMessage>) {
        self.fixtures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(account)
            .or_default()
            .extend(messages);
    }

    /// Takes the queued fixtures for `account`, leaving none behind.
    #[must_use]
    pub fn take_fixtures(&self, account: AccountId) -> Vec<RawMessage> {
        self.fixtures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&account)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_only_in_normal_mode() {
        assert!(Context::normal().checks_connectivity());
        assert!(!Context::test().checks_connectivity());
        assert!(!Context::with_mode(RunMode::Install).checks_connectivity());
        assert!(!Context::with_mode(RunMode::Patch).checks_connectivity());
    }

    #[test]
    fn fixtures_are_taken_once() {
        let ctx = Context::test();
        let account = AccountId::new(1);
        ctx.inject_fixtures(account, vec![RawMessage::new(b"Subject: a\r\n\r\nx".to_vec())]);

        assert_eq!(ctx.take_fixtures(account).len(), 1);
        assert!(ctx.take_fixtures(account).is_empty());
        assert!(ctx.take_fixtures(AccountId::new(2)).is_empty());
    }
}
