//! Error types for onebuild.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Request(String),

    #[error("provider API error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("found no builds, but this build should at least see itself")]
    NoMatch,

    #[error("cancellation of build {0} never took effect")]
    CancelNotEffective(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
