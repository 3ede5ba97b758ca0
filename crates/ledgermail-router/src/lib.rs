//! ledgermail Router
//!
//! Routing-rule registry and its periodic refresh.
//!
//! The registry starts from [`default_rules`] and is replaced wholesale by
//! [`RuleRefresher`] whenever the remote source returns at least one enabled
//! rule. Empty, malformed, rejected or unreachable responses keep the current
//! list and are logged at `warn`.
//!
//! # Examples
//!
//! ```no_run
//! use ledgermail_router::{HttpRuleSource, RefreshConfig, RuleRefresher, RuleRegistry};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), ledgermail_router::RouterError> {
//! let registry = Arc::new(RuleRegistry::default());
//! let source = HttpRuleSource::new("https://config.example.com/rules", None)?;
//! let refresher = RuleRefresher::new(source, registry.clone(), &RefreshConfig::default());
//!
//! refresher.refresh_once().await;
//! let handle = refresher.spawn();
//!
//! if let Some(rule) = registry.find("no-replies@example.com", "Credits processed by Example") {
//!     println!("routed to {}", rule.destination.primary_folder_id);
//! }
//! # handle.abort();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod defaults;
mod error;
mod http;
mod refresh;
mod registry;

pub use defaults::default_rules;
pub use error::RouterError;
pub use http::{parse_rules_response, HttpRuleSource, FETCH_TIMEOUT_SECS};
pub use refresh::{RefreshConfig, RefreshOutcome, RuleRefresher};
pub use registry::RuleRegistry;
