use tokio::sync::watch;
use tracing::{info, warn};

use shamba_types::api::LoginRequest;
use shamba_types::models::Profile;

use crate::client::MarketClient;
use crate::error::Result;
use crate::forms::SignUpForm;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
}

/// App-lifetime owner of the signed-in state.
///
/// Every change is published on a watch channel so screens can react to
/// sign-in and sign-out without polling.
pub struct SessionContext {
    client: MarketClient,
    tx: watch::Sender<Option<Session>>,
}

impl SessionContext {
    pub fn new(client: MarketClient) -> Self {
        let (tx, _) = watch::channel(None);
        Self { client, tx }
    }

    pub fn client(&self) -> &MarketClient {
        &self.client
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.tx.borrow().as_ref().map(|s| s.profile.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    fn publish(&self, session: Option<Session>) {
        self.client.set_token(session.as_ref().map(|s| s.token.clone()));
        self.tx.send_replace(session);
    }

    /// Validate locally, then register. An invalid form sends nothing.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<Session> {
        let req = form.to_request()?;
        let resp = self.client.register(&req).await?;
        info!("signed up as {}", resp.profile.email);
        let session = Session { token: resp.token, profile: resp.profile };
        self.publish(Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp = self.client.login(&req).await?;
        let session = Session { token: resp.token, profile: resp.profile };
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Forget the session locally even when the server could not be told.
    pub async fn sign_out(&self) -> Result<()> {
        let result = if self.client.token().is_some() {
            self.client.logout().await
        } else {
            Ok(())
        };
        if let Err(e) = &result {
            warn!("server-side sign out failed: {}", e);
        }
        self.publish(None);
        result
    }

    /// Resume a stored token. Returns `None` when it is no longer valid.
    pub async fn restore(&self, token: &str) -> Result<Option<Session>> {
        self.client.set_token(Some(token.to_string()));
        let session = match self.client.session().await {
            Ok(resp) => resp.user.map(|profile| Session {
                token: token.to_string(),
                profile,
            }),
            Err(e) => {
                self.client.set_token(None);
                return Err(e);
            }
        };
        self.publish(session.clone());
        Ok(session)
    }

    /// Replace the cached profile after an edit.
    pub fn update_profile(&self, profile: Profile) {
        self.tx.send_modify(|session| {
            if let Some(session) = session {
                session.profile = profile;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[tokio::test]
    async fn invalid_sign_up_sends_nothing() {
        // nothing listens here; reaching the network would be an Http error
        let ctx = SessionContext::new(MarketClient::new("http://127.0.0.1:9"));
        let mut rx = ctx.subscribe();
        let form = SignUpForm {
            email: "amani@example.com".into(),
            password: "mkulima1".into(),
            confirm_password: "mkulima2".into(),
            full_name: "Amani".into(),
            ..Default::default()
        };

        let err = ctx.sign_up(&form).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref m) if m == "Passwords do not match"));
        assert!(!ctx.is_signed_in());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn sign_out_without_session_is_quiet() {
        let ctx = SessionContext::new(MarketClient::new("http://127.0.0.1:9"));
        ctx.sign_out().await.unwrap();
        assert!(ctx.current().is_none());
    }
}
