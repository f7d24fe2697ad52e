use serde::Deserialize;

/// OAuth2 password grant, sent as `application/x-www-form-urlencoded`
#[derive(Deserialize, Debug)]
pub struct TokenForm {
    #[serde(default)]
    pub grant_type: Option<String>,
    pub username: String,
    pub password: String,
}
