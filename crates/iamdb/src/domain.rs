//! User domain model.
//!
//! A user is a base row plus exactly one trait: [`HumanUser`] or
//! [`MachineUser`]. The trait is selected by the `type` discriminator stored
//! on the base row.

use crate::error::{DbError, DbResult};
use crate::row::FromValue;
use crate::value::{Arg, IntoArg, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enum stored as a lowercase text value.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DbError;

            fn from_str(s: &str) -> DbResult<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DbError::validation(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl From<$name> for Value {
            fn from(v: $name) -> Self {
                Value::Text(v.as_str().to_string())
            }
        }

        impl IntoArg for $name {
            fn into_arg(self) -> Arg {
                Arg::Value(self.into())
            }
        }

        impl FromValue for $name {
            fn from_value(column: &str, value: Option<&Value>) -> DbResult<Self> {
                String::from_value(column, value)?
                    .parse()
                    .map_err(|e: DbError| DbError::decode(column, e.to_string()))
            }
        }
    };
}

text_enum! {
    /// Discriminator selecting the user trait.
    UserType {
        Human => "human",
        Machine => "machine",
    }
}

text_enum! {
    UserState {
        Active => "active",
        Inactive => "inactive",
        Locked => "locked",
        Initial => "initial",
    }
}

text_enum! {
    HumanGender {
        Female => "female",
        Male => "male",
        Diverse => "diverse",
    }
}

text_enum! {
    /// Token type issued for a machine user's personal access tokens.
    AccessTokenType {
        Bearer => "bearer",
        Jwt => "jwt",
    }
}

/// A user of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub instance_id: String,
    pub organization_id: String,
    pub id: String,
    pub username: String,
    pub state: UserState,
    pub login_names: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// `None` lets the database assign `NOW()` on create.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub kind: UserKind,
}

/// The trait attached to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserKind {
    Human(HumanUser),
    Machine(MachineUser),
}

impl UserKind {
    pub fn user_type(&self) -> UserType {
        match self {
            UserKind::Human(_) => UserType::Human,
            UserKind::Machine(_) => UserType::Machine,
        }
    }
}

impl User {
    pub fn user_type(&self) -> UserType {
        self.kind.user_type()
    }

    pub fn human(&self) -> Option<&HumanUser> {
        match &self.kind {
            UserKind::Human(human) => Some(human),
            UserKind::Machine(_) => None,
        }
    }

    pub fn machine(&self) -> Option<&MachineUser> {
        match &self.kind {
            UserKind::Machine(machine) => Some(machine),
            UserKind::Human(_) => None,
        }
    }
}

/// Profile and credential state of a human user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumanUser {
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub display_name: Option<String>,
    /// BCP 47 language tag.
    pub preferred_language: Option<String>,
    pub gender: Option<HumanGender>,
    pub avatar_key: Option<String>,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub phone: Option<String>,
    pub phone_verified_at: Option<DateTime<Utc>>,
    pub password_change_required: bool,
    pub failed_password_attempts: i16,
    pub multifactor_initialization_skipped_at: Option<DateTime<Utc>>,
}

/// A service account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineUser {
    pub name: String,
    pub description: Option<String>,
    pub access_token_type: AccessTokenType,
}

/// One entry of the per-user metadata table.
///
/// Unlike [`User::metadata`], which is a JSON document on the base row, each
/// entry is its own row keyed by `(instance_id, user_id, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub key: String,
    pub value: Vec<u8>,
    /// `None` lets the database assign `NOW()`.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserMetadata {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_round_trip_through_values() {
        assert_eq!(Value::from(UserType::Machine), Value::from("machine"));
        assert_eq!("human".parse::<UserType>().unwrap(), UserType::Human);
        assert!("robot".parse::<UserType>().is_err());
        assert_eq!(
            AccessTokenType::from_value("t", Some(&Value::from("jwt"))).unwrap(),
            AccessTokenType::Jwt
        );
    }

    #[test]
    fn unknown_stored_value_is_decode_error() {
        let err = UserState::from_value("state", Some(&Value::from("gone"))).unwrap_err();
        assert!(err.is_decode());
        let none = Option::<HumanGender>::from_value("gender", None).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn kind_selects_trait() {
        let user = User {
            instance_id: "i1".into(),
            organization_id: "o1".into(),
            id: "u1".into(),
            username: "svc".into(),
            state: UserState::Active,
            login_names: vec![],
            metadata: Default::default(),
            created_at: None,
            updated_at: None,
            kind: UserKind::Machine(MachineUser {
                name: "svc".into(),
                description: None,
                access_token_type: AccessTokenType::Bearer,
            }),
        };
        assert_eq!(user.user_type(), UserType::Machine);
        assert!(user.human().is_none());
        assert!(user.machine().is_some());
    }
}
