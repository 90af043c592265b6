//! Capability links and attendance PINs.
//!
//! Anyone holding a link is granted the access that link implies, so links are
//! drawn from a CSPRNG and carry no information about the record they point to.

use crate::types::{AppError, Result};
use rand::{distr::Alphanumeric, Rng};
use std::future::Future;

pub const DEFAULT_LINK_LENGTH: usize = 11;
pub const DEFAULT_PIN_LENGTH: usize = 6;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Fresh links for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub student: String,
    pub teacher: String,
    pub pin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShareLinkIssuer {
    link_length: usize,
    pin_length: usize,
    max_attempts: u32,
}

impl Default for ShareLinkIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_LENGTH, DEFAULT_PIN_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }
}

impl ShareLinkIssuer {
    pub fn new(link_length: usize, pin_length: usize, max_attempts: u32) -> Self {
        Self {
            link_length,
            pin_length,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Random alphanumeric string of `length` characters.
    pub fn generate(length: usize) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }

    /// Random numeric string of `length` digits. Leading zeros are kept.
    pub fn pin(length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect()
    }

    pub fn new_pin(&self) -> String {
        Self::pin(self.pin_length)
    }

    /// A student/teacher link pair, plus a PIN when `with_pin` is set.
    pub fn links(&self, with_pin: bool) -> ShareLinks {
        ShareLinks {
            student: Self::generate(self.link_length),
            teacher: Self::generate(self.link_length),
            pin: with_pin.then(|| self.new_pin()),
        }
    }

    /// Runs `insert` with fresh links, drawing new ones each time the store
    /// reports a unique-index collision.
    pub async fn with_unique_links<T, F, Fut>(&self, with_pin: bool, mut insert: F) -> Result<T>
    where
        F: FnMut(ShareLinks) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match insert(self.links(with_pin)).await {
                Err(AppError::Conflict(msg)) if attempt < self.max_attempts => {
                    tracing::warn!(attempt, "share link collision, retrying: {}", msg);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_generate_is_alphanumeric() {
        let link = ShareLinkIssuer::generate(11);
        assert_eq!(link.len(), 11);
        assert!(link.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_is_not_repeated() {
        let links: HashSet<String> = (0..1000).map(|_| ShareLinkIssuer::generate(11)).collect();
        assert_eq!(links.len(), 1000);
    }

    #[test]
    fn test_pin_is_numeric() {
        let pin = ShareLinkIssuer::pin(6);
        assert_eq!(pin.len(), 6);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_links_pin_only_when_requested() {
        let issuer = ShareLinkIssuer::default();

        let plain = issuer.links(false);
        assert!(plain.pin.is_none());
        assert_ne!(plain.student, plain.teacher);

        let attendance = issuer.links(true);
        assert_eq!(attendance.pin.map(|p| p.len()), Some(DEFAULT_PIN_LENGTH));
    }

    #[tokio::test]
    async fn test_retries_on_conflict() {
        let issuer = ShareLinkIssuer::default();
        let calls = AtomicU32::new(0);

        let result = issuer
            .with_unique_links(false, |links| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(AppError::Conflict("duplicate link".into()))
                    } else {
                        Ok(links.student)
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let issuer = ShareLinkIssuer::new(11, 6, 3);
        let calls = AtomicU32::new(0);

        let result: Result<()> = issuer
            .with_unique_links(false, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Conflict("duplicate link".into())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let issuer = ShareLinkIssuer::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = issuer
            .with_unique_links(false, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Database("disk full".into())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
