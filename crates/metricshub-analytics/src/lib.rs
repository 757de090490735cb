//! Report building blocks for the Metrics Hub dashboard.
//!
//! - [`trend`]: period-over-period comparisons
//! - [`query`]: warehouse query interface and typed row decoding
//! - [`fanout`]: all-or-nothing concurrent query joins
//! - [`params`]: report window parameters and their cache keys
//! - [`refresh`]: read-through caching of computed payloads

pub mod fanout;
pub mod params;
pub mod query;
pub mod refresh;
pub mod trend;

pub use fanout::{join_all, join_bounded, with_deadline, with_optional_deadline};
pub use params::{ParamError, ReportParams, UserType};
pub use query::{Dataset, QueryError, QueryResult, QuerySource, QuerySourceExt, Row, first_or_default};
pub use refresh::{Cached, load_or_refresh};
pub use trend::{Polarity, TrendResult, TrendSet, trend, trend_opt, trend_with};
