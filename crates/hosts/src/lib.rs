//! Remote hosts-file blocklists.
//!
//! Hosts lists are downloaded by the [`Fetcher`], parsed line by line and merged into a
//! [`BlackholeStore`]. The [`RefreshScheduler`] repeats that for every configured
//! [`Source`] on a fixed interval, while queries read the store concurrently.

pub mod fetcher;
pub mod name;
pub mod parser;
pub mod reload;
pub mod scheduler;
pub mod source;
pub mod store;

pub use fetcher::{DEFAULT_FETCH_TIMEOUT, FetchError, FetchOutcome, Fetcher};
pub use name::{NormalizedName, normalize};
pub use parser::{parse_hosts, parse_line, parse_stream};
pub use reload::{ReloadCycle, ReloadError, ReloadPolicy, ReloadReport, Reloader};
pub use scheduler::{RefreshScheduler, SchedulerHandle};
pub use source::{Source, SourceError};
pub use store::BlackholeStore;
