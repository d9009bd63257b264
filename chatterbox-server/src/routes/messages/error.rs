use eyre::Report;
use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum MessagesError {
    #[error("body or username missing from payload")]
    MissingFields,
    #[error("no message with the requested id")]
    UnknownId,
    #[error("storage error")]
    Storage(Report),
}

impl MessagesError {
    pub fn response(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingFields => (
                StatusCode::BAD_REQUEST,
                "Both 'body' and 'username' are required",
            ),
            Self::UnknownId => (StatusCode::NOT_FOUND, "Message not found"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        }
    }
}

impl From<Report> for MessagesError {
    fn from(report: Report) -> Self {
        Self::Storage(report)
    }
}
