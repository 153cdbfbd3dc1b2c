//! Statement classification, cost heuristics and rate limiting.

pub mod classifier;
pub mod complexity;
pub mod rate_limiter;

pub use classifier::{Classification, classify};
pub use complexity::{ComplexityAssessment, ComplexitySignal, assess_complexity};
pub use rate_limiter::{RateDecision, RateLimitStatus, RateLimiter, RateLimiterBuilder, RateWindow};
