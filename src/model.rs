use serde::{Deserialize, Serialize};

/// An activity as the API returns it. The server owns it; the client only caches copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    /// ISO-8601 timestamp, passed through untouched
    pub date: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub is_cancelled: bool,
    pub city: String,
    pub venue: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// The signed-in user, from `/account/user-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub display_name: String,
    pub password: String,
}
