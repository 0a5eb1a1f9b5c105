//! Vouch Social - evidence from the social media API
//!
//! Everything the validator learns about a post or its author goes through
//! this crate:
//! - `EvidenceService` trait with "fetch profile" and "fetch content" queries
//! - `XApiClient`, an HTTP client for the v2 REST API
//! - `CredentialPool`, a round-robin sliding-window limiter over bearer tokens
//! - `MockEvidenceService` for tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │    EvidenceService       │
//! │  (profile / content)     │
//! └────────────┬─────────────┘
//!              │
//!      ┌───────┴────────┐
//!      ▼                ▼
//! ┌───────────┐   ┌───────────┐
//! │ XApiClient│   │   Mock    │
//! └─────┬─────┘   └───────────┘
//!       ▼
//! ┌───────────────┐
//! │CredentialPool │
//! └───────────────┘
//! ```

pub mod client;
pub mod mock;
pub mod rate_limit;
pub mod service;

pub use client::XApiClient;
pub use mock::MockEvidenceService;
pub use rate_limit::{Credential, CredentialPool, RateLimit};
pub use service::{is_platform_id, AuthorProfile, ContentDetails, EvidenceService, SocialError};
