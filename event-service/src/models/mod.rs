use gather_shared::models::Role;
use serde::Deserialize;

// Query strings; request and response bodies live in gather_shared::models

#[derive(Deserialize, Debug)]
pub struct RoleQuery {
    pub role: Role,
}

#[derive(Deserialize, Debug)]
pub struct EventDetailQuery {
    pub role: Role,
    #[serde(default)]
    pub delegate_org_code: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RegisterDelegateQuery {
    #[serde(default)]
    pub event_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct GeocodeQuery {
    #[serde(default)]
    pub address: String,
}
