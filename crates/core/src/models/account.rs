//! Shopper account profile.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Email, Recipient};

/// Gender as stored on the profile. The API encodes it as a boolean with
/// `true` meaning male.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum Gender {
    Male,
    Female,
}

impl From<bool> for Gender {
    fn from(male: bool) -> Self {
        if male { Self::Male } else { Self::Female }
    }
}

impl From<Gender> for bool {
    fn from(gender: Gender) -> Self {
        matches!(gender, Gender::Male)
    }
}

/// Account profile returned by login, registration and profile reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<AccountId>,
    pub email: String,
    pub role: String,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    /// Absolute avatar URL.
    pub avatar: Option<String>,
}

impl Account {
    /// Default delivery recipient for checkout.
    #[must_use]
    pub fn recipient(&self) -> Recipient {
        Recipient::new(&self.full_name, &self.phone, &self.address)
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub email: Email,
    pub full_name: String,
    pub address: String,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl AccountUpdate {
    /// Start an update from the current profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored email is not a valid address.
    pub fn from_account(account: &Account) -> Result<Self, crate::EmailError> {
        Ok(Self {
            email: Email::parse(&account.email)?,
            full_name: account.full_name.clone(),
            address: account.address.clone(),
            birthday: account.birthday,
            gender: account.gender,
            phone: Some(account.phone.clone()).filter(|p| !p.is_empty()),
            avatar: account.avatar.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: Some(AccountId::new(3)),
            email: "an@market.vn".to_string(),
            role: "user".to_string(),
            full_name: "Nguyen An".to_string(),
            address: "12 Le Loi".to_string(),
            phone: String::new(),
            gender: Some(Gender::Female),
            birthday: None,
            avatar: None,
        }
    }

    #[test]
    fn test_recipient_prefill() {
        let recipient = account().recipient();
        assert_eq!(recipient.name, "Nguyen An");
        assert_eq!(recipient.address, "12 Le Loi");
        // Empty phone is carried over and caught by checkout validation.
        assert!(recipient.validate().is_err());
    }

    #[test]
    fn test_update_from_account_drops_empty_phone() {
        let update = AccountUpdate::from_account(&account()).unwrap();
        assert_eq!(update.phone, None);
        assert_eq!(update.email.as_str(), "an@market.vn");
    }

    #[test]
    fn test_gender_wire_flag() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "true");
        assert_eq!(serde_json::from_str::<Gender>("false").unwrap(), Gender::Female);
    }
}
