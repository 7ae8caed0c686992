use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// An account row. The password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub business_name: Option<String>,
    pub profile_pic: Option<String>,
    pub cover_url: Option<String>,
    pub partner_profile_pic: Option<String>,
    pub partner_cover_url: Option<String>,
    /// Legacy single-role column; `user_roles` is authoritative.
    pub role: Option<String>,
    pub created_at: String,
}

impl User {
    pub const COLUMNS: &'static str = "id, email, username, business_name, profile_pic, \
         cover_url, partner_profile_pic, partner_cover_url, role, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            business_name: row.get(3)?,
            profile_pic: row.get(4)?,
            cover_url: row.get(5)?,
            partner_profile_pic: row.get(6)?,
            partner_cover_url: row.get(7)?,
            role: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

/// A user together with every role they hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Influencer,
    Merchant,
    /// Alias some older accounts carry for `merchant`.
    Partner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Influencer => "influencer",
            Role::Merchant => "merchant",
            Role::Partner => "partner",
        }
    }

    pub fn is_business(&self) -> bool {
        matches!(self, Role::Merchant | Role::Partner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignType {
    Drop,
    Mission,
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignType::Drop => "drop",
            CampaignType::Mission => "mission",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Scheduled,
    Ended,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($ty:ident, $kind:literal, [$($variant:ident),+]) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(UnknownVariant {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownVariant| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum!(Role, "role", [Influencer, Merchant, Partner]);
text_enum!(CampaignType, "campaign type", [Drop, Mission]);
text_enum!(CampaignStatus, "campaign status", [Active, Scheduled, Ended]);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub partner_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: CampaignType,
    pub status: CampaignStatus,
    pub reward_text: Option<String>,
    pub media_url: Option<String>,
    pub created_at: String,
}

impl Campaign {
    pub const COLUMNS: &'static str =
        "id, partner_id, title, description, type, status, reward_text, media_url, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Campaign {
            id: row.get(0)?,
            partner_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            kind: row.get(4)?,
            status: row.get(5)?,
            reward_text: row.get(6)?,
            media_url: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub id: i64,
    pub partner_id: i64,
    pub influencer_id: i64,
    pub source: Option<String>,
    /// Whole currency units; scans carry no cents.
    pub revenue: i64,
    pub traffic: i64,
    pub created_at: String,
}

impl Scan {
    pub const COLUMNS: &'static str =
        "id, partner_id, influencer_id, source, revenue, traffic, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Scan {
            id: row.get(0)?,
            partner_id: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
            influencer_id: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            source: row.get(3)?,
            revenue: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            traffic: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GigReward {
    pub id: i64,
    pub gig_name: String,
    pub status: String,
    pub reward: i64,
    pub date: String,
}

impl GigReward {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(GigReward {
            id: row.get(0)?,
            gig_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            status: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            reward: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            date: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    }
}

/// Per (influencer, partner) totals, rebuilt wholesale from `scans`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluencerRevenue {
    pub influencer_id: i64,
    pub partner_id: i64,
    pub total_revenue: i64,
    pub total_sales: i64,
}

impl InfluencerRevenue {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(InfluencerRevenue {
            influencer_id: row.get(0)?,
            partner_id: row.get(1)?,
            total_revenue: row.get(2)?,
            total_sales: row.get(3)?,
        })
    }
}
