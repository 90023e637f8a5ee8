use crate::core::errors::TrackerError;
use crate::core::models::user::{Identity, UserRecord};
use crate::infrastructure::auth::AuthProvider;
use crate::infrastructure::auth::jwt::{Claims, IdTokenSigner};
use async_trait::async_trait;
use bcrypt::{hash, verify};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::info;
use uuid::Uuid;

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Clone)]
pub struct InMemoryAuth {
    users_by_email: Arc<RwLock<HashMap<String, UserRecord>>>,
    identity: Arc<watch::Sender<Option<Identity>>>,
    signer: Arc<IdTokenSigner>,
    bcrypt_cost: u32,
    sign_out_calls: Arc<AtomicUsize>,
    sign_out_fault: Arc<Mutex<Option<TrackerError>>>,
}

impl InMemoryAuth {
    pub fn new(jwt_secret: String, token_ttl: Duration, bcrypt_cost: u32) -> Self {
        let (identity, _) = watch::channel(None);
        InMemoryAuth {
            users_by_email: Arc::new(RwLock::new(HashMap::new())),
            identity: Arc::new(identity),
            signer: Arc::new(IdTokenSigner::new(&jwt_secret, token_ttl)),
            bcrypt_cost,
            sign_out_calls: Arc::new(AtomicUsize::new(0)),
            sign_out_fault: Arc::new(Mutex::new(None)),
        }
    }

    pub fn verify_id_token(&self, token: &str) -> Result<Claims, TrackerError> {
        self.signer.verify(token)
    }

    /// Number of sign-out requests received, successful or not.
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Makes the next sign-out request fail with `error`.
    pub async fn fail_next_sign_out(&self, error: TrackerError) {
        *self.sign_out_fault.lock().await = Some(error);
    }

    fn validate_email(email: &str) -> Result<(), TrackerError> {
        if email.is_empty() {
            return Err(TrackerError::MissingEmail);
        }
        if !email.contains('@') || !email.contains('.') || email.len() < 5 {
            return Err(TrackerError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }

    fn establish(&self, user: &UserRecord) -> Result<Identity, TrackerError> {
        let identity = Identity {
            uid: user.uid.clone(),
            email: user.email.clone(),
            id_token: self.signer.issue(&user.uid, &user.email)?,
        };
        self.identity.send_replace(Some(identity.clone()));
        info!(user_id = %identity.uid, "User signed in");
        Ok(identity)
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, TrackerError> {
        let email = email.trim().to_lowercase();
        Self::validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(TrackerError::invalid_input(
                "password",
                "Weak password",
                "Password should be at least 6 characters",
            ));
        }

        let mut users = self.users_by_email.write().await;
        if users.contains_key(&email) {
            return Err(TrackerError::EmailAlreadyRegistered(email));
        }
        let user = UserRecord {
            uid: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash(password, self.bcrypt_cost)
                .map_err(|e| TrackerError::InternalServerError(format!("Password hashing error: {}", e)))?,
        };
        users.insert(email, user.clone());
        drop(users);

        self.establish(&user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, TrackerError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users_by_email
            .read()
            .await
            .get(&email)
            .cloned()
            .ok_or(TrackerError::InvalidCredentials)?;

        if verify(password, &user.password_hash)
            .map_err(|e| TrackerError::InternalServerError(format!("Password verification error: {}", e)))?
        {
            self.establish(&user)
        } else {
            Err(TrackerError::InvalidCredentials)
        }
    }

    async fn sign_out(&self) -> Result<(), TrackerError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_out_fault.lock().await.take() {
            return Err(err);
        }
        if let Some(previous) = self.identity.send_replace(None) {
            info!(user_id = %previous.uid, "User signed out");
        }
        Ok(())
    }
}
