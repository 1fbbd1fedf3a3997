use serde::{Deserialize, Serialize};

const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";
const OFFLINE_ACCESS_TOKEN: &str = "0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
    AuthServer,
}

/// Account data handed over by the account manager. Only the fields needed to
/// fill the game's argument placeholders are carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub mode: AccountMode,
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
}

impl Default for Account {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl Account {
    pub fn offline(username: &str) -> Self {
        Self {
            mode: AccountMode::Offline,
            username: username.trim().to_string(),
            uuid: OFFLINE_UUID.into(),
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            xuid: "0".into(),
            user_type: "legacy".into(),
        }
        .sanitized()
    }

    /// Temporary offline account keeping only this account's username.
    pub fn as_offline(&self) -> Self {
        Self::offline(&self.username)
    }

    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = OFFLINE_UUID.into();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = match self.mode {
                AccountMode::Offline | AccountMode::AuthServer => "legacy".into(),
                AccountMode::Microsoft => "msa".into(),
            };
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_copy_keeps_username_and_drops_credentials() {
        let online = Account {
            mode: AccountMode::Microsoft,
            username: "Steve".into(),
            uuid: "a8c1c0de-0000-4000-8000-000000000001".into(),
            access_token: "secret".into(),
            xuid: "2535".into(),
            user_type: "msa".into(),
        };

        let offline = online.as_offline();
        assert_eq!(offline.mode, AccountMode::Offline);
        assert_eq!(offline.username, "Steve");
        assert_eq!(offline.uuid, OFFLINE_UUID);
        assert_ne!(offline.access_token, "secret");
    }

    #[test]
    fn sanitized_fills_blank_fields() {
        let account = Account {
            mode: AccountMode::Microsoft,
            username: "  ".into(),
            uuid: String::new(),
            access_token: String::new(),
            xuid: String::new(),
            user_type: String::new(),
        }
        .sanitized();

        assert_eq!(account.username, "Player");
        assert_eq!(account.user_type, "msa");
        assert_eq!(account.xuid, "0");
    }
}
