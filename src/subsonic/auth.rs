//! Subsonic token authentication.
//!
//! Every request carries `t = md5(password + salt)` and a fresh random salt,
//! so the password itself never goes over the wire.

use rand::{Rng, distr::Alphanumeric};

pub const API_VERSION: &str = "1.16.1";
pub const CLIENT_NAME: &str = "mice";

const SALT_LEN: usize = 12;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Query string fragment with a fresh salt.
    pub fn query(&self) -> String {
        self.query_with_salt(&make_salt())
    }

    pub fn query_with_salt(&self, salt: &str) -> String {
        format!(
            "u={}&t={}&s={}&v={}&c={}&f=json",
            urlencoding::encode(&self.username),
            token(&self.password, salt),
            salt,
            API_VERSION,
            CLIENT_NAME
        )
    }
}

pub fn make_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

pub fn token(password: &str, salt: &str) -> String {
    let digest = md5::compute(format!("{password}{salt}"));
    hex::encode(digest.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_matches_protocol_example() {
        // Example from the Subsonic API documentation.
        assert_eq!(token("sesame", "c19b2d"), "26719a1196d2a940705a59634eb18eab");
    }

    #[test]
    fn salts_are_random_alphanumeric() {
        let a = make_salt();
        let b = make_salt();
        assert_eq!(a.len(), SALT_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn query_never_contains_password() {
        let creds = Credentials::new("al ice", "sesame");
        let q = creds.query_with_salt("c19b2d");
        assert!(q.starts_with("u=al%20ice&t=26719a1196d2a940705a59634eb18eab&s=c19b2d"));
        assert!(q.ends_with("&c=mice&f=json"));
        assert!(!q.contains("sesame"));
        assert!(!format!("{creds:?}").contains("sesame"));
    }
}
