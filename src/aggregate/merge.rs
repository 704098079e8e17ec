//! Overlay of profile-service data onto the auth service's user document.
//!
//! The auth document is kept as raw JSON so every identity field it carries
//! is relayed untouched. Profile data is read into [`ProfileEnrichment`], one
//! optional slot per field the unified read exposes.

use axum::http::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::aggregate::fields::ProfileField;

/// Profile fields copied onto `user` in a unified read.
///
/// A slot is `Some` whenever the key was present upstream, even with a JSON
/// `null`; only absent keys leave the user document untouched.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfileEnrichment {
    #[serde(deserialize_with = "present")]
    pub bio: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub nickname: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub personal_url: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub organization: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub country: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub profile_visibility: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub github_url: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub linkedin_url: Option<Value>,
    #[serde(deserialize_with = "present")]
    pub twitter_url: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ProfileEnrichment {
    /// `None` unless `value` is a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Self::deserialize(value).ok()
    }

    /// Each slot paired with the field it fills.
    fn into_fields(self) -> [(ProfileField, Option<Value>); 9] {
        let Self {
            bio,
            nickname,
            personal_url,
            organization,
            country,
            profile_visibility,
            github_url,
            linkedin_url,
            twitter_url,
        } = self;
        [
            (ProfileField::Bio, bio),
            (ProfileField::Nickname, nickname),
            (ProfileField::PersonalUrl, personal_url),
            (ProfileField::Organization, organization),
            (ProfileField::Country, country),
            (ProfileField::ProfileVisibility, profile_visibility),
            (ProfileField::GithubUrl, github_url),
            (ProfileField::LinkedinUrl, linkedin_url),
            (ProfileField::TwitterUrl, twitter_url),
        ]
    }

    /// Write present slots onto `user` under their external names.
    pub fn apply_to(self, user: &mut Map<String, Value>) {
        for (field, value) in self.into_fields() {
            if let Some(value) = value {
                user.insert(field.external_name().to_string(), value);
            }
        }
    }
}

/// Enrich `primary.user` with `secondary` when the secondary call succeeded.
///
/// Returns `primary` unchanged when the secondary document is missing, not an
/// object, its status is not 200, or `primary` has no `user` object.
pub fn merge(mut primary: Value, secondary: Option<&Value>, secondary_status: Option<StatusCode>) -> Value {
    if secondary_status != Some(StatusCode::OK) {
        return primary;
    }
    let Some(enrichment) = secondary.and_then(ProfileEnrichment::from_value) else {
        return primary;
    };
    if let Some(user) = primary.get_mut("user").and_then(Value::as_object_mut) {
        enrichment.apply_to(user);
    }
    primary
}
