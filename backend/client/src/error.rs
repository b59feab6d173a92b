use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure or an undecodable response.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a structured error body.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error("No user id configured")]
    MissingUser,
}
