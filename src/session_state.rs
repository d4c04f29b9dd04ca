use actix_session::{Session, SessionExt, SessionGetError, SessionInsertError};
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use serde::{de::DeserializeOwned, Serialize};
use std::future::{ready, Ready};
use std::marker::PhantomData;
use uuid::Uuid;

pub struct SessionStateKey<'a, T> {
    value_type: PhantomData<T>,
    session: &'a Session,
    key: &'static str,
}

impl<'a, T> SessionStateKey<'a, T>
where
    T: Serialize + DeserializeOwned,
{
    fn new(state: &'a SessionState, key: &'static str) -> Self {
        Self {
            value_type: PhantomData,
            session: &state.0,
            key,
        }
    }

    pub fn get(&self) -> Result<Option<T>, SessionGetError> {
        self.session.get(self.key)
    }

    pub fn insert(&self, value: T) -> Result<(), SessionInsertError> {
        self.session.insert(self.key, value)
    }
}

pub struct SessionState(Session);

impl SessionState {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub fn renew(&self) {
        self.0.renew();
    }

    /// Set by the authentication routes once a user logs in.
    pub fn user_id(&self) -> SessionStateKey<'_, Uuid> {
        SessionStateKey::new(self, "user_id")
    }

    /// Anti-forgery token mirrored into the `token` cookie.
    pub fn token(&self) -> SessionStateKey<'_, String> {
        SessionStateKey::new(self, "token")
    }

    pub fn is_logged_in(&self) -> Result<bool, SessionGetError> {
        Ok(self.user_id().get()?.is_some())
    }
}

impl FromRequest for SessionState {
    type Error = <Session as FromRequest>::Error;

    type Future = Ready<Result<SessionState, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(SessionState(req.get_session())))
    }
}

/// A fresh anti-forgery token: 32 lowercase hex characters.
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}
