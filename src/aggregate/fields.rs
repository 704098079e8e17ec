//! Update-payload routing: which upstream receives which field, under what name.
//!
//! The external API uses camelCase throughout. The auth service shares that
//! convention; the profile service expects snake_case for the names that
//! differ.

use serde_json::{Map, Value};

/// Fields the auth service accepts on `PATCH /accounts/{username}`.
pub const AUTH_FIELDS: [&str; 4] = ["firstName", "lastName", "phone", "email"];

/// Fields the profile service accepts on `PUT /profiles/me`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Bio,
    Nickname,
    PersonalUrl,
    Organization,
    Country,
    MailingAddress,
    ContactInfoPublic,
    ProfileVisibility,
    GithubUrl,
    LinkedinUrl,
    TwitterUrl,
    FacebookUrl,
    InstagramUrl,
    WebsiteUrl,
}

impl ProfileField {
    pub const ALL: [ProfileField; 14] = [
        ProfileField::Bio,
        ProfileField::Nickname,
        ProfileField::PersonalUrl,
        ProfileField::Organization,
        ProfileField::Country,
        ProfileField::MailingAddress,
        ProfileField::ContactInfoPublic,
        ProfileField::ProfileVisibility,
        ProfileField::GithubUrl,
        ProfileField::LinkedinUrl,
        ProfileField::TwitterUrl,
        ProfileField::FacebookUrl,
        ProfileField::InstagramUrl,
        ProfileField::WebsiteUrl,
    ];

    /// Name on the gateway's own API.
    pub const fn external_name(self) -> &'static str {
        match self {
            ProfileField::Bio => "bio",
            ProfileField::Nickname => "nickname",
            ProfileField::PersonalUrl => "personalUrl",
            ProfileField::Organization => "organization",
            ProfileField::Country => "country",
            ProfileField::MailingAddress => "mailingAddress",
            ProfileField::ContactInfoPublic => "contactInfoPublic",
            ProfileField::ProfileVisibility => "profileVisibility",
            ProfileField::GithubUrl => "githubUrl",
            ProfileField::LinkedinUrl => "linkedinUrl",
            ProfileField::TwitterUrl => "twitterUrl",
            ProfileField::FacebookUrl => "facebookUrl",
            ProfileField::InstagramUrl => "instagramUrl",
            ProfileField::WebsiteUrl => "websiteUrl",
        }
    }

    /// Name on the profile service's API.
    pub const fn upstream_name(self) -> &'static str {
        match self {
            ProfileField::Bio => "bio",
            ProfileField::Nickname => "nickname",
            ProfileField::PersonalUrl => "personal_url",
            ProfileField::Organization => "organization",
            ProfileField::Country => "country",
            ProfileField::MailingAddress => "mailing_address",
            ProfileField::ContactInfoPublic => "contact_info_public",
            ProfileField::ProfileVisibility => "profile_visibility",
            ProfileField::GithubUrl => "github_url",
            ProfileField::LinkedinUrl => "linkedin_url",
            ProfileField::TwitterUrl => "twitter_url",
            ProfileField::FacebookUrl => "facebook_url",
            ProfileField::InstagramUrl => "instagram_url",
            ProfileField::WebsiteUrl => "website_url",
        }
    }

    pub fn from_external(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.external_name() == name)
    }
}

/// External names of [`ProfileField::ALL`], in the same order.
pub const PROFILE_FIELDS: [&str; 14] = external_names();

const fn external_names() -> [&'static str; 14] {
    let mut names = [""; 14];
    let mut i = 0;
    while i < names.len() {
        names[i] = ProfileField::ALL[i].external_name();
        i += 1;
    }
    names
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn disjoint(left: &[&str], right: &[&str]) -> bool {
    let mut i = 0;
    while i < left.len() {
        let mut j = 0;
        while j < right.len() {
            if str_eq(left[i], right[j]) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

// A field routed to both services would be written twice; reject at build time.
const _: () = assert!(
    disjoint(&AUTH_FIELDS, &PROFILE_FIELDS),
    "auth and profile allow-lists overlap"
);

/// Profile-service name for an external field, if the field goes to the profile service.
pub fn translate(external: &str) -> Option<&'static str> {
    ProfileField::from_external(external).map(ProfileField::upstream_name)
}

/// Per-upstream sub-documents of one update request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldPartition {
    /// Keys in external naming.
    pub auth: Map<String, Value>,
    /// Keys already translated to the profile service's naming.
    pub profile: Map<String, Value>,
}

/// Split a flat update document. Keys in neither allow-list are dropped.
pub fn partition(document: Map<String, Value>) -> FieldPartition {
    let mut out = FieldPartition::default();
    for (key, value) in document {
        if AUTH_FIELDS.contains(&key.as_str()) {
            out.auth.insert(key, value);
        } else if let Some(upstream_name) = translate(&key) {
            out.profile.insert(upstream_name.to_string(), value);
        } else {
            tracing::debug!(field = %key, "Dropping field outside both allow-lists");
        }
    }
    out
}
