//! Shared domain enums

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Visitor demographic, optional and self-reported after registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(format!("Invalid gender: {}", s)),
        }
    }
}

// SQLx conversion for Gender (stored as TEXT)
impl sqlx::Type<Postgres> for Gender {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Gender {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Gender {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Broadcast audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    All,
    Male,
    Female,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::All, Segment::Male, Segment::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::All => "all",
            Segment::Male => "male",
            Segment::Female => "female",
        }
    }

    /// Gender filter applied to recipients, `None` for everyone
    pub fn gender(&self) -> Option<Gender> {
        match self {
            Segment::All => None,
            Segment::Male => Some(Gender::Male),
            Segment::Female => Some(Gender::Female),
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Segment::All => "Everyone",
            Segment::Male => "Men",
            Segment::Female => "Women",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Segment::All),
            "male" => Ok(Segment::Male),
            "female" => Ok(Segment::Female),
            _ => Err(format!("Invalid segment: {}", s)),
        }
    }
}
