use serde::{Deserialize, Serialize};

/// The signed-in identity as seen by the client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub id_token: String,
}

#[derive(Clone, Debug)]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
}
