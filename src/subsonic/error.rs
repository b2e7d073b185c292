use thiserror::Error;

/// Error codes defined by the Subsonic protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Generic,
    MissingParameter,
    ClientTooOld,
    ServerTooOld,
    WrongCredentials,
    TokenAuthUnsupported,
    NotAuthorized,
    TrialExpired,
    NotFound,
    Other(u32),
}

impl ErrorCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Generic,
            10 => Self::MissingParameter,
            20 => Self::ClientTooOld,
            30 => Self::ServerTooOld,
            40 => Self::WrongCredentials,
            41 => Self::TokenAuthUnsupported,
            50 => Self::NotAuthorized,
            60 => Self::TrialExpired,
            70 => Self::NotFound,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubsonicError {
    #[error("no server configured (run `mice login`)")]
    NotConfigured,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("server error {code}: {message}")]
    Api { code: u32, message: String },
}

impl SubsonicError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(ErrorCode::from_code(*code)),
            _ => None,
        }
    }

    /// Credentials are wrong or not accepted; retrying will not help.
    pub fn is_auth(&self) -> bool {
        matches!(
            self.code(),
            Some(
                ErrorCode::WrongCredentials
                    | ErrorCode::TokenAuthUnsupported
                    | ErrorCode::NotAuthorized
            )
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }
}

impl From<serde_json::Error> for SubsonicError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_codes_are_classified() {
        let e = SubsonicError::Api {
            code: 40,
            message: "Wrong username or password".into(),
        };
        assert!(e.is_auth());
        assert_eq!(e.code(), Some(ErrorCode::WrongCredentials));

        let e = SubsonicError::Api {
            code: 70,
            message: "Album not found".into(),
        };
        assert!(!e.is_auth());
        assert!(e.is_not_found());
        assert_eq!(ErrorCode::from_code(99), ErrorCode::Other(99));
    }
}
