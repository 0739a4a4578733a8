//! prdash Core - Provider and Work-Item Types
//!
//! Plain data shared by the filter DSL and the provider clients: which
//! code-hosting instances exist, how include/exclude patterns select them,
//! and the pull-request/issue records the clients produce.

pub mod error;
pub mod provider;
pub mod workitem;

pub use error::*;
pub use provider::*;
pub use workitem::*;

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
