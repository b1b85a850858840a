//! ==============================================================================
//! auth.rs - INSECURE DEMO AUTH
//! ==============================================================================
//!
//! purpose:
//!     gates the dashboard behind a section name + password.
//!
//! WARNING:
//!     passwords are stored in plaintext and the "forgot password" flow reveals
//!     them to anyone who knows a static answer. this is a demo gate for a lab
//!     bench, not an authentication system. do not reuse it.
//!
//! files:
//!     credentials.json  {"ECE": "1234"}   (created with the default entry)
//!
//! ==============================================================================

use crate::config::{AuthConfig, RecoveryEntry};

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Incorrect answer")]
    IncorrectAnswer,
    #[error("No recovery question for section {0}")]
    NoRecoveryQuestion(String),
}

// ==============================================================================
// credential store
// ==============================================================================

#[derive(Debug, Clone)]
pub struct CredentialStore {
    // sorted so the login selector is stable
    entries: BTreeMap<String, String>,
}

impl CredentialStore {
    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// load the credential file, creating it with one default entry if absent
    pub fn load_or_init(path: &Path, default_section: &str, default_password: &str) -> Result<Self> {
        if !path.exists() {
            let mut defaults = BTreeMap::new();
            defaults.insert(default_section.to_string(), default_password.to_string());
            let json = serde_json::to_string(&defaults)?;
            std::fs::write(path, json)
                .with_context(|| format!("failed to create {}", path.display()))?;
            tracing::info!("[AUTH] Created {} with default section {}", path.display(), default_section);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        Ok(Self::from_entries(entries))
    }

    pub fn sections(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn password(&self, section: &str) -> Option<&str> {
        self.entries.get(section).map(String::as_str)
    }

    pub fn verify(&self, section: &str, password: &str) -> Result<(), AuthError> {
        match self.entries.get(section) {
            Some(stored) if stored == password => Ok(()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

// ==============================================================================
// recovery questions
// ==============================================================================

#[derive(Debug, Clone)]
pub struct SecurityQuestion {
    pub question: String,
    answer: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryQuestions {
    by_section: HashMap<String, SecurityQuestion>,
}

impl RecoveryQuestions {
    pub fn from_config(entries: &[RecoveryEntry]) -> Self {
        let by_section = entries
            .iter()
            .map(|e| {
                let q = SecurityQuestion { question: e.question.clone(), answer: e.answer.clone() };
                (e.section.clone(), q)
            })
            .collect();
        Self { by_section }
    }

    pub fn question(&self, section: &str) -> Option<&str> {
        self.by_section.get(section).map(|q| q.question.as_str())
    }

    /// answers are trimmed and compared case-insensitively
    fn check(&self, section: &str, answer: &str) -> Result<(), AuthError> {
        let q = self
            .by_section
            .get(section)
            .ok_or_else(|| AuthError::NoRecoveryQuestion(section.to_string()))?;

        if answer.trim().to_lowercase() == q.answer.to_lowercase() {
            Ok(())
        } else {
            Err(AuthError::IncorrectAnswer)
        }
    }
}

// ==============================================================================
// demo auth - what the web layer talks to
// ==============================================================================

#[derive(Debug, Clone)]
pub struct DemoAuth {
    credentials: CredentialStore,
    questions: RecoveryQuestions,
}

impl DemoAuth {
    pub fn new(credentials: CredentialStore, questions: RecoveryQuestions) -> Self {
        Self { credentials, questions }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let credentials = CredentialStore::load_or_init(
            &config.credentials_file,
            &config.default_section,
            &config.default_password,
        )?;
        Ok(Self::new(credentials, RecoveryQuestions::from_config(&config.recovery)))
    }

    pub fn sections(&self) -> Vec<String> {
        self.credentials.sections()
    }

    /// (section, question) pairs for the recovery form
    pub fn questions(&self) -> Vec<(String, String)> {
        self.credentials
            .sections()
            .into_iter()
            .filter_map(|s| self.questions.question(&s).map(|q| (s.clone(), q.to_string())))
            .collect()
    }

    pub fn login(&self, section: &str, password: &str) -> Result<(), AuthError> {
        self.credentials.verify(section, password)
    }

    /// reveal a section's password if the recovery answer matches
    pub fn recover(&self, section: &str, answer: &str) -> Result<String, AuthError> {
        self.questions.check(section, answer)?;
        self.credentials
            .password(section)
            .map(str::to_string)
            .ok_or(AuthError::InvalidCredentials)
    }
}
