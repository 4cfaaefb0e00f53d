use std::sync::Arc;

use course_core::model::{AuthSession, AuthToken, CourseId, UserProfile};
use storage::repository::Storage;

use crate::api::{CourseApi, HttpCourseApi};
use crate::config::{ApiConfig, PlayerConfig};
use crate::error::AppServicesError;
use crate::player::CoursePlayerController;

/// Assembles the player's collaborators and owns the stored sign-in.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    api: Arc<dyn CourseApi>,
    player_config: PlayerConfig,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP course API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or HTTP client
    /// construction fails.
    pub async fn new_sqlite(
        db_url: &str,
        api_config: &ApiConfig,
        player_config: PlayerConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let api: Arc<dyn CourseApi> = Arc::new(HttpCourseApi::new(api_config)?);
        Ok(Self::new(storage, api, player_config))
    }

    #[must_use]
    pub fn new(storage: Storage, api: Arc<dyn CourseApi>, player_config: PlayerConfig) -> Self {
        Self {
            storage,
            api,
            player_config,
        }
    }

    /// In-memory session storage with the given API, for tests and demos.
    #[must_use]
    pub fn in_memory(api: Arc<dyn CourseApi>, player_config: PlayerConfig) -> Self {
        Self::new(Storage::in_memory(), api, player_config)
    }

    /// A fresh controller for one course-viewing session.
    #[must_use]
    pub fn player(&self, course_id: CourseId) -> CoursePlayerController {
        CoursePlayerController::new(
            Arc::clone(&self.api),
            Arc::clone(&self.storage.sessions),
            course_id,
            self.player_config,
        )
    }

    /// Stores a session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// `AppServicesError::BlankToken` for an empty token, or a storage error.
    pub async fn sign_in(
        &self,
        token: &str,
        user: UserProfile,
    ) -> Result<AuthSession, AppServicesError> {
        let token = AuthToken::new(token).ok_or(AppServicesError::BlankToken)?;
        let session = AuthSession {
            token,
            user,
            saved_at: self.player_config.clock.now(),
        };
        self.storage.sessions.save_session(&session).await?;
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns a storage error if the session cannot be cleared.
    pub async fn sign_out(&self) -> Result<(), AppServicesError> {
        self.storage.sessions.clear_session().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a storage error if the session cannot be read.
    pub async fn current_session(&self) -> Result<Option<AuthSession>, AppServicesError> {
        Ok(self.storage.sessions.load_session().await?)
    }
}
