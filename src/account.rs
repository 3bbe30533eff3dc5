//! Login, sign-up, and settings flows. Validation failures resolve at the
//! form with a fixed inline message; provider failures map through the
//! message tables below; nothing here is fatal.

use serde_json::Value;

use crate::config::AppConfig;
use crate::remote::{server_timestamp, AuthError, AuthProvider, DocumentStore, Fields};

fn login_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidEmail => "Invalid email address.",
        AuthError::UserNotFound => "No user found with this email.",
        AuthError::WrongPassword => "Incorrect password.",
        AuthError::TooManyAttempts => "Too many failed login attempts. Try again later.",
        AuthError::Network => "Network error. Please check your connection.",
        _ => "Login failed. Please try again.",
    }
}

fn sign_up_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::EmailInUse => "This email is already in use.",
        AuthError::InvalidEmail => "Invalid email format.",
        AuthError::WeakPassword => "Password must be at least 6 characters.",
        _ => "Sign Up Failed. Please try again.",
    }
}

/// Login screen state. `submit` validates, signs in, and verifies the
/// profile document exists before the session is considered good.
#[derive(Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    busy: bool,
    pub error: Option<&'static str>,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-flight guard; a shell disables the submit control while true.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Returns true on success; otherwise `error` holds the message to
    /// show. Re-entrant submission while busy is ignored.
    pub fn submit(
        &mut self,
        auth: &dyn AuthProvider,
        store: &dyn DocumentStore,
        config: &AppConfig,
    ) -> bool {
        if self.busy {
            return false;
        }
        self.error = None;
        if self.email.is_empty() || self.password.is_empty() {
            self.error = Some("Please enter both email and password.");
            return false;
        }

        self.busy = true;
        let outcome = run_login(auth, store, config, &self.email, &self.password);
        self.busy = false;

        match outcome {
            Ok(()) => true,
            Err(message) => {
                self.error = Some(message);
                false
            }
        }
    }
}

fn run_login(
    auth: &dyn AuthProvider,
    store: &dyn DocumentStore,
    config: &AppConfig,
    email: &str,
    password: &str,
) -> Result<(), &'static str> {
    let user = auth.sign_in(email, password).map_err(|err| {
        log::info!("sign-in rejected for {}: {}", email, err);
        login_message(&err)
    })?;

    // A credential without a profile document is a half-created account;
    // sign back out rather than leave a profileless session mounted.
    match store.get_document(&config.users_collection, &user.uid) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => {
            auth.sign_out();
            Err("User profile not found. Please sign up again.")
        }
        Err(err) => {
            log::error!("profile lookup failed for {}: {}", user.uid, err);
            auth.sign_out();
            Err("Login failed. Please try again.")
        }
    }
}

/// Sign-up screen state: four required fields, then account creation,
/// display-name profile update, and the profile document write.
#[derive(Default)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    busy: bool,
    pub error: Option<&'static str>,
}

impl SignUpForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn submit(
        &mut self,
        auth: &dyn AuthProvider,
        store: &dyn DocumentStore,
        config: &AppConfig,
    ) -> bool {
        if self.busy {
            return false;
        }
        self.error = None;
        if self.full_name.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            self.error = Some("All fields are required.");
            return false;
        }
        if self.password.len() < 6 {
            self.error = Some("Password must be at least 6 characters.");
            return false;
        }
        if self.password != self.confirm_password {
            self.error = Some("Passwords do not match.");
            return false;
        }

        self.busy = true;
        let outcome = run_sign_up(auth, store, config, &self.full_name, &self.email, &self.password);
        self.busy = false;

        match outcome {
            Ok(()) => true,
            Err(message) => {
                self.error = Some(message);
                false
            }
        }
    }
}

fn run_sign_up(
    auth: &dyn AuthProvider,
    store: &dyn DocumentStore,
    config: &AppConfig,
    full_name: &str,
    email: &str,
    password: &str,
) -> Result<(), &'static str> {
    let user = auth.sign_up(email, password).map_err(|err| {
        log::info!("sign-up rejected for {}: {}", email, err);
        sign_up_message(&err)
    })?;

    auth.update_profile(full_name).map_err(|err| {
        log::error!("profile update failed for {}: {}", user.uid, err);
        "Sign Up Failed. Please try again."
    })?;

    let mut fields = Fields::new();
    fields.insert("fullName".to_string(), Value::String(full_name.to_string()));
    fields.insert("email".to_string(), Value::String(email.to_string()));
    fields.insert("createdAt".to_string(), server_timestamp());
    store
        .set_document(&config.users_collection, &user.uid, fields)
        .map_err(|err| {
            log::error!("profile document write failed for {}: {}", user.uid, err);
            "Sign Up Failed. Please try again."
        })
}

/// Settings header data: display name and email of the signed-in user,
/// with placeholder values when absent.
pub fn profile_summary(auth: &dyn AuthProvider) -> (String, String) {
    match auth.current_user() {
        Some(user) => (
            user.display_name.unwrap_or_else(|| "User".to_string()),
            user.email,
        ),
        None => ("User".to_string(), "your.email@example.com".to_string()),
    }
}
