use thiserror::Error;

/// Failure kinds for the line-page pipeline.
///
/// Transport and query failures come from the subgraph boundary; malformed
/// data is anything that deserialized badly or violated the payload contract
/// after the bytes arrived, so callers can report it separately from a
/// network outage.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("subgraph query failed: {0}")]
    Subgraph(String),

    #[error("malformed subgraph data: {0}")]
    MalformedData(String),

    #[error("price lookup failed for {symbol}: {reason}")]
    Price { symbol: String, reason: String },
}
