use crate::traits::CredentialStore;
use std::collections::HashMap;
use std::env;
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Fixed credentials, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    by_server: HashMap<String, Credentials>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, server: impl Into<String>, credentials: Credentials) -> Self {
        self.by_server.insert(server.into(), credentials);
        self
    }
}

impl CredentialStore for StaticCredentials {
    fn credentials_for(&self, server: &str) -> Option<Credentials> {
        self.by_server.get(server).cloned()
    }
}

/// Reads `LAPPS_<SERVER>_USER` and `LAPPS_<SERVER>_PASSWORD` at lookup time.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn variable_names(server: &str) -> (String, String) {
        let prefix = format!("LAPPS_{}", server.to_uppercase().replace('-', "_"));
        (format!("{}_USER", prefix), format!("{}_PASSWORD", prefix))
    }
}

impl CredentialStore for EnvCredentials {
    fn credentials_for(&self, server: &str) -> Option<Credentials> {
        let (user_var, password_var) = Self::variable_names(server);
        let user = env::var(user_var).ok()?;
        let password = env::var(password_var).ok()?;
        Some(Credentials { user, password })
    }
}
