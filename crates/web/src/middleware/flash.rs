//! One-shot flash messages carried across a redirect in the session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session::keys;

/// How a flash message is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier class for the message.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    /// One error flash per message.
    pub fn errors<I>(messages: I) -> Vec<Self>
    where
        I: IntoIterator<Item = String>,
    {
        messages.into_iter().map(Self::error).collect()
    }
}

/// Queue a flash for the next page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push_flash(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    push_flashes(session, vec![flash]).await
}

/// Queue several flashes for the next page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push_flashes(
    session: &Session,
    flashes: Vec<Flash>,
) -> Result<(), tower_sessions::session::Error> {
    let mut queued: Vec<Flash> = session.get(keys::FLASHES).await?.unwrap_or_default();
    queued.extend(flashes);
    session.insert(keys::FLASHES, queued).await
}

/// Take every queued flash, leaving none behind.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(keys::FLASHES).await {
        Ok(flashes) => flashes.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flashes");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_kind_serializes_lowercase() {
        let json = serde_json::to_string(&Flash::success("Saved")).unwrap();
        assert_eq!(json, r#"{"kind":"success","message":"Saved"}"#);
    }

    #[test]
    fn test_errors_builds_one_flash_per_message() {
        let flashes = Flash::errors(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(flashes.len(), 2);
        assert!(flashes.iter().all(|f| f.kind == FlashKind::Error));
    }

    #[tokio::test]
    async fn test_flashes_are_taken_once() {
        let store = std::sync::Arc::new(tower_sessions::MemoryStore::default());
        let session = Session::new(None, store, None);

        push_flash(&session, Flash::info("one")).await.unwrap();
        push_flashes(&session, vec![Flash::error("two")]).await.unwrap();

        let taken = take_flashes(&session).await;
        assert_eq!(taken, vec![Flash::info("one"), Flash::error("two")]);
        assert!(take_flashes(&session).await.is_empty());
    }
}
