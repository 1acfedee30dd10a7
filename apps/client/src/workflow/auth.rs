use std::sync::Arc;

use tracing::info;

use crate::api_client::AnalysisService;
use crate::errors::ClientError;
use crate::models::session::{LoginRequest, Session, SignupRequest};
use crate::session::guard::Route;
use crate::session::store::SessionStore;

pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const SIGNUP_FAILED: &str = "Signup failed. Please try again.";

/// Account creation, login and logout. A successful call leaves the session
/// store holding (and persisting) the new session.
pub struct AuthController {
    session: Arc<SessionStore>,
    service: Arc<dyn AnalysisService>,
}

impl AuthController {
    pub fn new(session: Arc<SessionStore>, service: Arc<dyn AnalysisService>) -> Self {
        Self { session, service }
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let request = SignupRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.service.signup(&request).await?;
        info!("Account created for {}", response.user.email);
        self.session.login(response.user, response.token)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.service.login(&request).await?;
        self.session.login(response.user, response.token)
    }

    /// Clears the session and returns where to go next.
    pub fn logout(&self) -> Route {
        self.session.logout();
        Route::Landing
    }
}
