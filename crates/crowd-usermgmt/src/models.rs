//! Crowd request and response models.
//!
//! Creation payloads are typed: every attribute the server accepts has a field, and
//! attribute maps supplied at runtime are checked against that list before any request
//! is built.

use crate::Result;
use chrono::{DateTime, Utc};
use crowd_core::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the remote-address validation factor.
pub const REMOTE_ADDRESS_FACTOR: &str = "remote_address";

/// Remote address used when the caller does not supply one.
pub const DEFAULT_REMOTE_ADDRESS: &str = "127.0.0.1";

/// A user as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct User {
    /// Username.
    pub name: String,
    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the account is active.
    #[serde(default)]
    pub active: bool,
    /// Directory-unique key.
    #[serde(default)]
    pub key: Option<String>,
    /// Extended attributes (present when requested with `expand=attributes`).
    #[serde(default)]
    pub attributes: AttributeSet,
}

impl User {
    /// Values of an extended attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.values.as_slice())
    }
}

/// Envelope of extended attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttributeSet {
    /// Attribute entries.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// One extended attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute values.
    #[serde(default)]
    pub values: Vec<String>,
}

/// A session created or validated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Session {
    /// Opaque session token.
    pub token: String,
    /// The session's user, expanded by the server.
    #[serde(default)]
    pub user: Option<User>,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_date: Option<i64>,
    /// Expiry time in epoch milliseconds.
    #[serde(default)]
    pub expiry_date: Option<i64>,
}

impl Session {
    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_date.and_then(DateTime::from_timestamp_millis)
    }

    /// Expiry time.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date.and_then(DateTime::from_timestamp_millis)
    }
}

/// Contextual attribute checked when creating or validating a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFactor {
    /// Factor name.
    pub name: String,
    /// Factor value.
    pub value: String,
}

impl ValidationFactor {
    /// The originating network address of the user.
    #[must_use]
    pub fn remote_address(address: impl Into<String>) -> Self {
        Self {
            name: REMOTE_ADDRESS_FACTOR.to_string(),
            value: address.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidationFactors {
    #[serde(rename = "validationFactors")]
    pub(crate) validation_factors: Vec<ValidationFactor>,
}

impl ValidationFactors {
    pub(crate) fn remote_address(address: &str) -> Self {
        Self {
            validation_factors: vec![ValidationFactor::remote_address(address)],
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PasswordValue<'a> {
    pub(crate) value: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SessionRequest<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
    #[serde(rename = "validation-factors")]
    pub(crate) validation_factors: ValidationFactors,
}

#[derive(Serialize)]
pub(crate) struct EntityName<'a> {
    pub(crate) name: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct GroupNames {
    #[serde(default)]
    groups: Vec<Named>,
}

impl GroupNames {
    pub(crate) fn into_names(self) -> Vec<String> {
        self.groups.into_iter().map(|group| group.name).collect()
    }
}

#[derive(Deserialize)]
pub(crate) struct UserNames {
    #[serde(default)]
    users: Vec<Named>,
}

impl UserNames {
    pub(crate) fn into_names(self) -> Vec<String> {
        self.users.into_iter().map(|user| user.name).collect()
    }
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

/// Attributes accepted when creating a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    /// `email` (required)
    Email,
    /// `password` (required)
    Password,
    /// `first-name`
    FirstName,
    /// `last-name`
    LastName,
    /// `display-name`
    DisplayName,
    /// `active`
    Active,
}

impl UserField {
    /// Wire name of the attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::FirstName => "first-name",
            Self::LastName => "last-name",
            Self::DisplayName => "display-name",
            Self::Active => "active",
        }
    }
}

impl FromStr for UserField {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self> {
        match key.replace('_', "-").as_str() {
            "email" => Ok(Self::Email),
            "password" => Ok(Self::Password),
            "first-name" => Ok(Self::FirstName),
            "last-name" => Ok(Self::LastName),
            "display-name" => Ok(Self::DisplayName),
            "active" => Ok(Self::Active),
            _ => Err(Error::InvalidArgument(format!("invalid user attribute `{key}`"))),
        }
    }
}

/// A user to be created.
///
/// Built with [`NewUser::builder`] or [`NewUser::from_attributes`]; either way `email` and
/// `password` are guaranteed present and non-empty.
pub struct NewUser {
    name: String,
    email: String,
    password: SecretString,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    active: bool,
}

impl NewUser {
    /// Starts a builder for the given username.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> NewUserBuilder {
        NewUserBuilder {
            name: name.into(),
            email: None,
            password: None,
            first_name: None,
            last_name: None,
            display_name: None,
            active: true,
        }
    }

    /// Builds a user from attribute key/value pairs.
    ///
    /// Keys may be written `snake_case` or `kebab-case`. `active` accepts `true` or
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first unknown key, unparseable value,
    /// or missing required attribute.
    pub fn from_attributes<I, K, V>(name: impl Into<String>, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = Self::builder(name);
        for (key, value) in attributes {
            let value = value.into();
            builder = match key.as_ref().parse::<UserField>()? {
                UserField::Email => builder.email(value),
                UserField::Password => builder.password(value),
                UserField::FirstName => builder.first_name(value),
                UserField::LastName => builder.last_name(value),
                UserField::DisplayName => builder.display_name(value),
                UserField::Active => builder.active(parse_bool(UserField::Active.as_str(), &value)?),
            };
        }
        builder.build()
    }

    /// Username.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Whether the account will be active.
    #[must_use]
    pub const fn active(&self) -> bool {
        self.active
    }

    pub(crate) fn payload(&self) -> UserPayload<'_> {
        UserPayload {
            name: &self.name,
            first_name: self.first_name.as_deref().unwrap_or(&self.name),
            last_name: self.last_name.as_deref().unwrap_or(&self.name),
            display_name: self.display_name.as_deref().unwrap_or(&self.name),
            email: &self.email,
            password: PasswordValue {
                value: self.password.expose_secret(),
            },
            active: self.active,
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("display_name", &self.display_name)
            .field("active", &self.active)
            .finish()
    }
}

/// Builder for [`NewUser`].
pub struct NewUserBuilder {
    name: String,
    email: Option<String>,
    password: Option<SecretString>,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    active: bool,
}

impl NewUserBuilder {
    /// Sets the email address.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the initial password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Sets the first name (defaults to the username).
    #[must_use]
    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Sets the last name (defaults to the username).
    #[must_use]
    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// Sets the display name (defaults to the username).
    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets whether the account is active (defaults to `true`).
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Builds the [`NewUser`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the username is empty or `email` or
    /// `password` is missing or empty.
    pub fn build(self) -> Result<NewUser> {
        require_name("name", &self.name)?;
        let email = self
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| missing(UserField::Email.as_str()))?;
        let password = self
            .password
            .filter(|password| !password.expose_secret().is_empty())
            .ok_or_else(|| missing(UserField::Password.as_str()))?;

        Ok(NewUser {
            name: self.name,
            email,
            password,
            first_name: self.first_name,
            last_name: self.last_name,
            display_name: self.display_name,
            active: self.active,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct UserPayload<'a> {
    name: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    display_name: &'a str,
    email: &'a str,
    password: PasswordValue<'a>,
    active: bool,
}

/// Kind of group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupType {
    /// A regular group.
    #[default]
    Group,
    /// A legacy role.
    LegacyRole,
}

impl FromStr for GroupType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().replace('-', "_").as_str() {
            "GROUP" => Ok(Self::Group),
            "LEGACY_ROLE" => Ok(Self::LegacyRole),
            _ => Err(Error::InvalidArgument(format!("invalid group type `{value}`"))),
        }
    }
}

/// A group to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewGroup {
    name: String,
    description: String,
    active: bool,
    #[serde(rename = "type")]
    group_type: GroupType,
}

impl NewGroup {
    /// Creates an active group whose description defaults to its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        require_name("name", &name)?;
        Ok(Self {
            description: name.clone(),
            name,
            active: true,
            group_type: GroupType::Group,
        })
    }

    /// Builds a group from attribute key/value pairs.
    ///
    /// Recognized keys are `description`, `active` and `type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first unknown key or unparseable
    /// value.
    pub fn from_attributes<I, K, V>(name: impl Into<String>, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut group = Self::new(name)?;
        for (key, value) in attributes {
            let value = value.into();
            match key.as_ref() {
                "description" => group.description = value,
                "active" => group.active = parse_bool("active", &value)?,
                "type" => group.group_type = value.parse()?,
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "invalid group attribute `{other}`"
                    )))
                }
            }
        }
        Ok(group)
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets whether the group is active.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Sets the group type.
    #[must_use]
    pub const fn with_type(mut self, group_type: GroupType) -> Self {
        self.group_type = group_type;
        self
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

pub(crate) fn require_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(())
}

fn missing(field: &str) -> Error {
    Error::InvalidArgument(format!("missing {field}"))
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidArgument(format!(
            "invalid value `{value}` for {field}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invalid_message(err: Error) -> String {
        match err {
            Error::InvalidArgument(message) => message,
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn user_payload_defaults_names_to_username() {
        let user = NewUser::builder("jdoe")
            .email("jdoe@example.com")
            .password("s3cret")
            .build()
            .unwrap();

        let payload = serde_json::to_value(user.payload()).unwrap();
        assert_eq!(
            payload,
            json!({
                "name": "jdoe",
                "first-name": "jdoe",
                "last-name": "jdoe",
                "display-name": "jdoe",
                "email": "jdoe@example.com",
                "password": {"value": "s3cret"},
                "active": true
            })
        );
    }

    #[test]
    fn builder_requires_email_and_password() {
        let err = NewUser::builder("jdoe").password("pw").build().unwrap_err();
        assert!(invalid_message(err).contains("email"));

        let err = NewUser::builder("jdoe")
            .email("jdoe@example.com")
            .build()
            .unwrap_err();
        assert!(invalid_message(err).contains("password"));

        let err = NewUser::builder("")
            .email("a@b.c")
            .password("pw")
            .build()
            .unwrap_err();
        assert!(invalid_message(err).contains("name"));
    }

    #[test]
    fn from_attributes_accepts_both_key_styles() {
        let user = NewUser::from_attributes(
            "jdoe",
            [
                ("email", "jdoe@example.com"),
                ("password", "pw"),
                ("first_name", "John"),
                ("last-name", "Doe"),
                ("active", "false"),
            ],
        )
        .unwrap();

        let payload = serde_json::to_value(user.payload()).unwrap();
        assert_eq!(payload["first-name"], "John");
        assert_eq!(payload["last-name"], "Doe");
        assert_eq!(payload["display-name"], "jdoe");
        assert_eq!(payload["active"], false);
    }

    #[test]
    fn from_attributes_rejects_unknown_key() {
        let err = NewUser::from_attributes(
            "jdoe",
            [
                ("email", "jdoe@example.com"),
                ("password", "pw"),
                ("shoe_size", "11"),
            ],
        )
        .unwrap_err();
        assert!(invalid_message(err).contains("shoe_size"));
    }

    #[test]
    fn from_attributes_names_missing_field() {
        let err = NewUser::from_attributes("jdoe", [("password", "pw")]).unwrap_err();
        assert_eq!(invalid_message(err), "missing email");
    }

    #[test]
    fn debug_redacts_password() {
        let user = NewUser::builder("jdoe")
            .email("jdoe@example.com")
            .password("hunter2")
            .build()
            .unwrap();
        assert!(!format!("{user:?}").contains("hunter2"));
    }

    #[test]
    fn group_defaults_and_attributes() {
        let group = NewGroup::new("admins").unwrap();
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"name": "admins", "description": "admins", "active": true, "type": "GROUP"})
        );

        let group = NewGroup::from_attributes(
            "ops",
            [("description", "Operators"), ("type", "legacy_role"), ("active", "FALSE")],
        )
        .unwrap();
        assert_eq!(group.description(), "Operators");
        assert_eq!(
            serde_json::to_value(&group).unwrap()["type"],
            json!("LEGACY_ROLE")
        );

        let err = NewGroup::from_attributes("ops", [("colour", "blue")]).unwrap_err();
        assert!(invalid_message(err).contains("colour"));

        assert!(NewGroup::new(" ").is_err());
    }

    #[test]
    fn session_timestamps() {
        let session: Session = serde_json::from_value(json!({
            "token": "abc",
            "created-date": 1_700_000_000_000_i64,
            "expiry-date": 1_700_000_600_000_i64,
            "user": {"name": "jdoe", "active": true}
        }))
        .unwrap();
        assert_eq!(session.user.as_ref().unwrap().name, "jdoe");
        assert_eq!(
            session.expires_at().unwrap() - session.created_at().unwrap(),
            chrono::Duration::minutes(10)
        );
    }

    #[test]
    fn validation_factor_shapes() {
        let body = serde_json::to_value(SessionRequest {
            username: "jdoe",
            password: "pw",
            validation_factors: ValidationFactors::remote_address("10.0.0.1"),
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "username": "jdoe",
                "password": "pw",
                "validation-factors": {
                    "validationFactors": [{"name": "remote_address", "value": "10.0.0.1"}]
                }
            })
        );
    }
}
