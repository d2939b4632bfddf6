//! Coachway - authorization and identity-reconciliation core for a
//! multi-tenant training-management platform.
//!
//! Every other feature of the platform (sessions, programs, analytics,
//! messaging) is gated by this crate. It answers three questions:
//!
//! - **Who is calling, and in which organization?** —
//!   [`AuthContextResolver`] assembles a candidate [`AuthContext`]
//!   from a request's trusted signals.
//! - **May they do this?** — [`OrgAccessGuard`] confirms membership
//!   and role sufficiency against storage, and [`AccessGuard`]
//!   composes both around protected operations under an
//!   [`AccessPolicy`].
//! - **Are our records current?** — [`IdentityReconciler`] applies
//!   signed change-events from the external identity provider with
//!   idempotent upserts, tolerating reordered and duplicated delivery.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use coachway::{AccessGuard, AccessPolicy, OrgRole};
//!
//! coachway::init_tracing();
//!
//! let guard = AccessGuard::new(membership_store);
//! let response = guard
//!     .run(&signals, &AccessPolicy::org_with_min_role(OrgRole::Coach), |ctx| async move {
//!         let ctx = ctx.expect("org-scoped policies inject a context");
//!         start_session(&ctx).await
//!     })
//!     .await;
//! ```

pub mod access;
mod config;
pub mod context;
mod error;
pub mod guard;
pub mod reconcile;
pub mod roles;
pub mod storage;
pub mod webhook;

// Re-exports for public API
pub use access::OrgAccessGuard;
pub use config::{CoreConfig, LoggingConfig, WebhookConfig};
pub use context::{AuthContext, AuthContextResolver, RequestSignals};
pub use error::{CoachwayError, Result};
pub use guard::{AccessGuard, AccessPolicy};
pub use reconcile::{Applied, EventEnvelope, IdentityReconciler};
pub use roles::{role_satisfies, OrgRole, ParseRoleError};
pub use webhook::{HmacSha256Verifier, NoVerification, WebhookState, WebhookVerifier};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults.
///
/// Call early in `main()`, before constructing the guards.
///
/// # Environment Variables
///
/// - `RUST_LOG`: log level filter (e.g. "info", "coachway=debug")
/// - `COACHWAY_LOG_JSON`: set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("COACHWAY_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing from a [`CoreConfig`].
pub fn init_tracing_with_config(config: &CoreConfig) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
