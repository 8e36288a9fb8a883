//! Account endpoints: login, registration, password reset and profile.

use freshcart_core::{Account, AccountUpdate, Email};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use super::conversions::{account_update_request, convert_account};
use super::types::{
    LoginRequest, OtpRequest, OtpResponse, ResetPasswordRequest, SignupRequest, WireAccount,
};
use super::{ApiError, Auth, CommerceClient};

impl CommerceClient {
    /// Log in and store the issued token in the session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthFailed` with the server's message when the
    /// credentials are rejected.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &SecretString) -> Result<Account, ApiError> {
        let request = self
            .request(Method::POST, "checkmobile/login", Auth::Anonymous)
            .await?
            .json(&LoginRequest {
                gmail: email.as_str(),
                mat_khau: password.expose_secret(),
            });

        let wire: WireAccount = self
            .execute_json(request, Auth::Anonymous)
            .await
            .map_err(|e| e.reclassify(ApiError::AuthFailed))?;

        self.establish(wire).await
    }

    /// Create an account and log in with it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthFailed` with the server's message when
    /// registration is rejected (for example, the email is taken).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        full_name: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<Account, ApiError> {
        let request = self
            .request(Method::POST, "checkmobile/signup", Auth::Anonymous)
            .await?
            .json(&SignupRequest {
                ho_ten: full_name.trim(),
                gmail: email.as_str(),
                mat_khau: password.expose_secret(),
            });

        let wire: WireAccount = self
            .execute_json(request, Auth::Anonymous)
            .await
            .map_err(|e| e.reclassify(ApiError::AuthFailed))?;

        self.establish(wire).await
    }

    async fn establish(&self, mut wire: WireAccount) -> Result<Account, ApiError> {
        let token = wire
            .token
            .take()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::AuthFailed("server did not issue a token".to_string()))?;
        self.inner.session.establish(SecretString::from(token)).await?;

        let account = convert_account(wire, &self.inner.base_url);
        info!(account_id = ?account.id, "Logged in");
        Ok(account)
    }

    /// Ask the server to email a one-time password. Returns the OTP the
    /// server echoes back.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` (404 when the email is unknown).
    #[instrument(skip(self), fields(email = %email))]
    pub async fn send_otp(&self, email: &Email) -> Result<String, ApiError> {
        let request = self
            .request(Method::POST, "checkmobile/send-otp", Auth::Anonymous)
            .await?
            .json(&OtpRequest {
                gmail: email.as_str(),
            });

        let response: OtpResponse = self.execute_json(request, Auth::Anonymous).await?;
        match response.otp {
            Some(serde_json::Value::String(otp)) => Ok(otp),
            Some(serde_json::Value::Number(otp)) => Ok(otp.to_string()),
            _ => Err(ApiError::Parse("send-otp response without otp".to_string())),
        }
    }

    /// Set a new password using an emailed OTP.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthFailed` when the OTP is rejected.
    #[instrument(skip(self, new_password, otp), fields(email = %email))]
    pub async fn reset_password(
        &self,
        email: &Email,
        new_password: &SecretString,
        otp: &SecretString,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "checkmobile/quenmk", Auth::Anonymous)
            .await?
            .json(&ResetPasswordRequest {
                gmail: email.as_str(),
                mat_khau: new_password.expose_secret(),
                otp: otp.expose_secret(),
            });

        self.execute(request, Auth::Anonymous)
            .await
            .map_err(|e| e.reclassify(ApiError::AuthFailed))?;
        info!("Password reset");
        Ok(())
    }

    /// The logged-in account's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` without a token, or
    /// `ApiError::SessionExpired` when the server rejects it.
    #[instrument(skip(self))]
    pub async fn show_account(&self) -> Result<Account, ApiError> {
        let request = self
            .request(Method::GET, "checkmobile/showaccount", Auth::Bearer)
            .await?;
        let wire: WireAccount = self.execute_json(request, Auth::Bearer).await?;
        Ok(convert_account(wire, &self.inner.base_url))
    }

    /// Update profile fields.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self, update), fields(email = %update.email))]
    pub async fn update_account(&self, update: &AccountUpdate) -> Result<Account, ApiError> {
        let request = self
            .request(Method::POST, "checkmobile/updateaccount", Auth::Bearer)
            .await?
            .json(&account_update_request(update));
        let wire: WireAccount = self.execute_json(request, Auth::Bearer).await?;
        info!("Profile updated");
        Ok(convert_account(wire, &self.inner.base_url))
    }

    /// Upload a new avatar image.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or is rejected.
    #[instrument(skip(self, bytes), fields(email = %email, size = bytes.len()))]
    pub async fn upload_avatar(
        &self,
        email: &Email,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<Account, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new()
            .text("gmail", email.as_str().to_string())
            .part("file", part);

        let request = self
            .request(Method::POST, "checkmobile/uploadprofilepic", Auth::Bearer)
            .await?
            .multipart(form);
        let wire: WireAccount = self.execute_json(request, Auth::Bearer).await?;
        info!("Avatar uploaded");
        Ok(convert_account(wire, &self.inner.base_url))
    }
}
