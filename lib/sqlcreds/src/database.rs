//! The capability surface exposed to a host process.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::executor::ConnectionProvider;
use crate::{
    CredentialError, CredentialManager, DeleteUserRequest, DeleteUserResponse, InitializeRequest,
    InitializeResponse, NewUserRequest, NewUserResponse, Result, UpdateUserRequest,
    UpdateUserResponse,
};

/// A database plugin managing dynamic credentials.
#[async_trait]
pub trait Database: Send + Sync {
    async fn initialize(
        &self,
        cancel: &CancellationToken,
        req: InitializeRequest,
    ) -> Result<InitializeResponse>;

    async fn new_user(
        &self,
        cancel: &CancellationToken,
        req: NewUserRequest,
    ) -> Result<NewUserResponse>;

    async fn update_user(
        &self,
        cancel: &CancellationToken,
        req: UpdateUserRequest,
    ) -> Result<UpdateUserResponse>;

    async fn delete_user(
        &self,
        cancel: &CancellationToken,
        req: DeleteUserRequest,
    ) -> Result<DeleteUserResponse>;

    fn type_name(&self) -> &str;

    /// `(secret, label)` pairs to scrub from error text.
    fn secret_values(&self) -> Vec<(String, String)>;

    async fn close(&self, cancel: &CancellationToken) -> Result<()>;
}

#[async_trait]
impl<P: ConnectionProvider> Database for CredentialManager<P> {
    async fn initialize(
        &self,
        cancel: &CancellationToken,
        req: InitializeRequest,
    ) -> Result<InitializeResponse> {
        CredentialManager::initialize(self, cancel, &req.config, req.verify_connection).await?;
        Ok(InitializeResponse { config: req.config })
    }

    async fn new_user(
        &self,
        cancel: &CancellationToken,
        req: NewUserRequest,
    ) -> Result<NewUserResponse> {
        let username = self.create_user(cancel, &req).await?;
        Ok(NewUserResponse { username })
    }

    async fn update_user(
        &self,
        cancel: &CancellationToken,
        req: UpdateUserRequest,
    ) -> Result<UpdateUserResponse> {
        CredentialManager::update_user(self, cancel, &req).await?;
        Ok(UpdateUserResponse {})
    }

    async fn delete_user(
        &self,
        cancel: &CancellationToken,
        req: DeleteUserRequest,
    ) -> Result<DeleteUserResponse> {
        CredentialManager::delete_user(self, cancel, &req).await?;
        Ok(DeleteUserResponse {})
    }

    fn type_name(&self) -> &str {
        CredentialManager::type_name(self)
    }

    fn secret_values(&self) -> Vec<(String, String)> {
        CredentialManager::secret_values(self)
    }

    async fn close(&self, cancel: &CancellationToken) -> Result<()> {
        CredentialManager::close(self, cancel).await
    }
}

/// Middleware that scrubs the wrapped database's secrets from every error.
pub struct ErrorSanitizer<D> {
    inner: D,
}

impl<D: Database> ErrorSanitizer<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn sanitize(&self, err: CredentialError) -> CredentialError {
        let secrets = self.inner.secret_values();
        let pairs: Vec<(&str, &str)> = secrets
            .iter()
            .map(|(secret, label)| (secret.as_str(), label.as_str()))
            .collect();
        err.redact(&pairs)
    }
}

#[async_trait]
impl<D: Database> Database for ErrorSanitizer<D> {
    async fn initialize(
        &self,
        cancel: &CancellationToken,
        req: InitializeRequest,
    ) -> Result<InitializeResponse> {
        self.inner
            .initialize(cancel, req)
            .await
            .map_err(|e| self.sanitize(e))
    }

    async fn new_user(
        &self,
        cancel: &CancellationToken,
        req: NewUserRequest,
    ) -> Result<NewUserResponse> {
        self.inner
            .new_user(cancel, req)
            .await
            .map_err(|e| self.sanitize(e))
    }

    async fn update_user(
        &self,
        cancel: &CancellationToken,
        req: UpdateUserRequest,
    ) -> Result<UpdateUserResponse> {
        self.inner
            .update_user(cancel, req)
            .await
            .map_err(|e| self.sanitize(e))
    }

    async fn delete_user(
        &self,
        cancel: &CancellationToken,
        req: DeleteUserRequest,
    ) -> Result<DeleteUserResponse> {
        self.inner
            .delete_user(cancel, req)
            .await
            .map_err(|e| self.sanitize(e))
    }

    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn secret_values(&self) -> Vec<(String, String)> {
        self.inner.secret_values()
    }

    async fn close(&self, cancel: &CancellationToken) -> Result<()> {
        self.inner.close(cancel).await.map_err(|e| self.sanitize(e))
    }
}
