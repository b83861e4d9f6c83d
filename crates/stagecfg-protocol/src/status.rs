//! Response status classification.

/// How a client must interpret the status of a configuration response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// 200: body is a token.
    Token,
    /// 204: the server does not know the application.
    UnknownApplication,
    /// Anything else: body is a human-readable error message.
    ServerError,
}

impl FetchStatus {
    pub const OK: u16 = 200;
    pub const NO_CONTENT: u16 = 204;

    pub fn from_code(code: u16) -> Self {
        match code {
            Self::OK => FetchStatus::Token,
            Self::NO_CONTENT => FetchStatus::UnknownApplication,
            _ => FetchStatus::ServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(FetchStatus::from_code(200), FetchStatus::Token);
        assert_eq!(FetchStatus::from_code(204), FetchStatus::UnknownApplication);
        assert_eq!(FetchStatus::from_code(205), FetchStatus::ServerError);
        assert_eq!(FetchStatus::from_code(400), FetchStatus::ServerError);
        assert_eq!(FetchStatus::from_code(500), FetchStatus::ServerError);
    }
}
