use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("relay stopped: {0}")]
    Serve(#[from] std::io::Error),

    #[error("room router is no longer running")]
    RouterUnavailable,

    #[error("invalid configuration: {0}")]
    Config(String),
}
