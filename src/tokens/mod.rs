//! Token management controller.
//!
//! Lists, creates, toggles and deletes merchant upload tokens through
//! [`TokensApi`], and tracks which secrets may be shown in cleartext. Every
//! call runs under the caller's authenticated session; there is no
//! shared-secret bypass.
//!
//! Every successful mutation refetches the list so rows match the backend.
//!
//! Secrets are masked by default. A row is shown in cleartext when it has
//! been toggled visible, or when it is the single token created in this
//! session. Visibility lives in memory only.

pub mod mask;

use std::collections::HashSet;

pub use mask::mask_token;

use crate::activity::ActivityLog;
use crate::api::{ApiError, ApiToken, ToggleOutcome, TokensApi};
use crate::utils::clipboard::Clipboard;

/// Longest token name the backend accepts.
pub const MAX_NAME_LEN: usize = 100;

pub struct TokenManager<B> {
    backend: B,
    tokens: Vec<ApiToken>,
    visible: HashSet<i64>,
    just_created: Option<i64>,
    activity: ActivityLog,
}

impl<B: TokensApi> TokenManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tokens: Vec::new(),
            visible: HashSet::new(),
            just_created: None,
            activity: ActivityLog::disabled(),
        }
    }

    pub fn with_activity(mut self, activity: ActivityLog) -> Self {
        self.activity = activity;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn tokens(&self) -> &[ApiToken] {
        &self.tokens
    }

    pub fn get(&self, id: i64) -> Option<&ApiToken> {
        self.tokens.iter().find(|t| t.id == id)
    }

    pub fn just_created(&self) -> Option<&ApiToken> {
        self.just_created.and_then(|id| self.get(id))
    }

    /// Fetch the token list from the backend.
    pub fn refresh(&mut self) -> Result<&[ApiToken], ApiError> {
        let tokens = self
            .activity
            .track("tokens.list", None, || self.backend.list_tokens())?;
        self.tokens = tokens;
        let ids: HashSet<i64> = self.tokens.iter().map(|t| t.id).collect();
        self.visible.retain(|id| ids.contains(id));
        if self.just_created.is_some_and(|id| !ids.contains(&id)) {
            self.just_created = None;
        }
        Ok(&self.tokens)
    }

    /// Load the list for display.
    pub fn list(&mut self) -> Result<&[ApiToken], ApiError> {
        self.refresh()
    }

    /// Refetch after a mutation. A failed refetch keeps the local rows.
    fn resync(&mut self) {
        let _ = self.refresh();
    }

    /// Ask the backend for a new token. The result goes first in the list
    /// and becomes the one cleartext "just created" token.
    pub fn create(&mut self, name: &str) -> Result<&ApiToken, ApiError> {
        let name = validate_name(name)?;
        let token = self.activity.track("tokens.create", Some(format!("name:{name}")), || {
            let token = self.backend.generate_token(name)?;
            if token.token.trim().is_empty() {
                return Err(ApiError::unknown("backend returned an empty token"));
            }
            Ok(token)
        })?;

        let id = token.id;
        self.resync();
        let pos = match self.tokens.iter().position(|t| t.id == id) {
            Some(pos) => pos,
            None => {
                self.tokens.insert(0, token);
                0
            }
        };
        self.just_created = Some(id);
        Ok(&self.tokens[pos])
    }

    /// Create a token and copy its secret. Returns the token and whether the
    /// copy worked; a failed copy only affects the returned flag.
    pub fn create_and_copy(
        &mut self,
        name: &str,
        clipboard: &dyn Clipboard,
    ) -> Result<(ApiToken, bool), ApiError> {
        let token = self.create(name)?.clone();
        let copied = clipboard.copy(&token.token);
        Ok((token, copied))
    }

    /// Flip `is_active`.
    pub fn toggle(&mut self, id: i64) -> Result<&ApiToken, ApiError> {
        let outcome = self
            .activity
            .track("tokens.toggle", Some(format!("token:{id}")), || {
                self.backend.toggle_token(id)
            })?;

        let pos = match self.tokens.iter().position(|t| t.id == id) {
            Some(pos) => pos,
            None => match outcome {
                ToggleOutcome::Token(ref token) => {
                    self.tokens.push(token.clone());
                    self.tokens.len() - 1
                }
                ToggleOutcome::Status { .. } => {
                    // Status-only answer for a row we never loaded.
                    self.refresh()?;
                    self.tokens
                        .iter()
                        .position(|t| t.id == id)
                        .ok_or_else(|| ApiError::NotFound {
                            message: format!("token {id} not found"),
                            status: None,
                        })?
                }
            },
        };

        match outcome {
            ToggleOutcome::Token(token) => self.tokens[pos] = token,
            ToggleOutcome::Status { is_active, .. } => self.tokens[pos].is_active = is_active,
        }
        self.resync();
        self.get(id).ok_or_else(|| ApiError::NotFound {
            message: format!("token {id} not found"),
            status: None,
        })
    }

    /// Delete one token; other rows are left untouched.
    ///
    /// Confirmation is the caller's job.
    pub fn delete(&mut self, id: i64) -> Result<(), ApiError> {
        self.activity
            .track("tokens.delete", Some(format!("token:{id}")), || {
                self.backend.delete_token(id)
            })?;
        self.tokens.retain(|t| t.id != id);
        self.visible.remove(&id);
        if self.just_created == Some(id) {
            self.just_created = None;
        }
        self.resync();
        Ok(())
    }

    // -- visibility ---------------------------------------------------------

    /// Flip per-row cleartext display. Returns the new state.
    pub fn toggle_visibility(&mut self, id: i64) -> bool {
        if self.visible.remove(&id) {
            false
        } else {
            self.visible.insert(id);
            true
        }
    }

    pub fn reveal(&mut self, id: i64) {
        self.visible.insert(id);
    }

    pub fn is_visible(&self, id: i64) -> bool {
        self.visible.contains(&id) || self.just_created == Some(id)
    }

    /// The string to show for `token`: cleartext if visible, masked otherwise.
    pub fn display_token(&self, token: &ApiToken) -> String {
        if self.is_visible(token.id) {
            token.token.clone()
        } else {
            mask_token(&token.token)
        }
    }

    /// Copy a listed token's secret.
    pub fn copy_token(&self, id: i64, clipboard: &dyn Clipboard) -> Result<bool, ApiError> {
        let token = self.get(id).ok_or_else(|| ApiError::NotFound {
            message: format!("token {id} not found"),
            status: None,
        })?;
        let copied = clipboard.copy(&token.token);
        self.activity
            .note("tokens.copy", Some(format!("token:{id}")), copied, "");
        Ok(copied)
    }
}

/// Trim and length-check a token name.
pub fn validate_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("token name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "token name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
