//! Login, registration, password reset and profile commands.

use std::path::Path;

use chrono::NaiveDate;
use freshcart_core::{Account, AccountUpdate, Email};
use secrecy::SecretString;
use tracing::info;

use super::{CommandError, Context};

fn show(account: &Account) {
    info!("{} <{}>", account.full_name, account.email);
    if !account.phone.is_empty() {
        info!("  Phone: {}", account.phone);
    }
    if !account.address.is_empty() {
        info!("  Address: {}", account.address);
    }
    if let Some(birthday) = account.birthday {
        info!("  Birthday: {birthday}");
    }
    if let Some(avatar) = &account.avatar {
        info!("  Avatar: {avatar}");
    }
}

pub async fn login(ctx: &Context, email: &str, password: String) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let account = ctx.client.login(&email, &SecretString::from(password)).await?;
    info!("Logged in as {}", account.full_name);
    Ok(())
}

pub async fn register(
    ctx: &Context,
    name: &str,
    email: &str,
    password: String,
) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let account = ctx
        .client
        .register(name, &email, &SecretString::from(password))
        .await?;
    info!("Account created for {}", account.email);
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<(), CommandError> {
    ctx.session.clear().await?;
    info!("Logged out");
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<(), CommandError> {
    let account = ctx.client.show_account().await?;
    show(&account);
    Ok(())
}

pub async fn send_otp(ctx: &Context, email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    ctx.client.send_otp(&email).await?;
    info!("A reset code was sent to {email}");
    Ok(())
}

pub async fn reset_password(
    ctx: &Context,
    email: &str,
    otp: String,
    password: String,
) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    ctx.client
        .reset_password(&email, &SecretString::from(password), &SecretString::from(otp))
        .await?;
    info!("Password changed. Log in with the new password.");
    Ok(())
}

/// Profile fields to overwrite; `None` keeps the current value.
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<String>,
}

pub async fn update_profile(
    ctx: &Context,
    changes: ProfileChanges,
    avatar: Option<&Path>,
) -> Result<(), CommandError> {
    let current = ctx.client.show_account().await?;
    let mut update = AccountUpdate::from_account(&current)?;

    if let Some(name) = changes.name {
        update.full_name = name;
    }
    if let Some(phone) = changes.phone {
        update.phone = Some(phone);
    }
    if let Some(address) = changes.address {
        update.address = address;
    }
    if let Some(birthday) = changes.birthday {
        let date = NaiveDate::parse_from_str(&birthday, "%Y-%m-%d")
            .map_err(|e| CommandError::InvalidArgument(format!("birthday {birthday}: {e}")))?;
        update.birthday = Some(date);
    }

    let mut account = ctx.client.update_account(&update).await?;

    if let Some(path) = avatar {
        let bytes = tokio::fs::read(path).await.map_err(|source| CommandError::File {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "avatar".to_string(), |n| n.to_string_lossy().into_owned());
        account = ctx
            .client
            .upload_avatar(&update.email, &file_name, image_mime(path), bytes)
            .await?;
    }

    show(&account);
    Ok(())
}

fn image_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_from_extension() {
        assert_eq!(image_mime(Path::new("me.PNG")), "image/png");
        assert_eq!(image_mime(Path::new("me.jpg")), "image/jpeg");
        assert_eq!(image_mime(Path::new("avatar")), "image/jpeg");
    }
}
