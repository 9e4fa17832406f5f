//! Gigs: freelance jobs paid through the same escrow as product orders.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GigStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl GigStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for GigStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid gig status: {other}"
            ))),
        }
    }
}

/// Where the money of an escrowed subject currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    None,
    InEscrow,
    Released,
    Refunded,
}

impl EscrowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::InEscrow => "in_escrow",
            Self::Released => "released",
            Self::Refunded => "refunded",
        }
    }
}

impl TryFrom<&str> for EscrowStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "none" => Ok(Self::None),
            "in_escrow" => Ok(Self::InEscrow),
            "released" => Ok(Self::Released),
            "refunded" => Ok(Self::Refunded),
            other => Err(EngineError::Validation(format!(
                "invalid escrow status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gig {
    pub id: Uuid,
    pub client_id: String,
    pub title: String,
    pub budget: i64,
    pub status: GigStatus,
    pub freelancer_id: Option<String>,
    pub accepted_bid_id: Option<Uuid>,
    pub agreed_amount: Option<i64>,
    pub platform_fee: i64,
    pub escrow_status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gigs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub budget: i64,
    pub status: String,
    pub freelancer_id: Option<String>,
    pub accepted_bid_id: Option<String>,
    pub agreed_amount: Option<i64>,
    pub platform_fee: i64,
    pub escrow_status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bids::Entity")]
    Bids,
}

impl Related<super::bids::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bids.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Gig> for ActiveModel {
    fn from(gig: &Gig) -> Self {
        Self {
            id: ActiveValue::Set(gig.id.to_string()),
            client_id: ActiveValue::Set(gig.client_id.clone()),
            title: ActiveValue::Set(gig.title.clone()),
            budget: ActiveValue::Set(gig.budget),
            status: ActiveValue::Set(gig.status.as_str().to_string()),
            freelancer_id: ActiveValue::Set(gig.freelancer_id.clone()),
            accepted_bid_id: ActiveValue::Set(gig.accepted_bid_id.map(|id| id.to_string())),
            agreed_amount: ActiveValue::Set(gig.agreed_amount),
            platform_fee: ActiveValue::Set(gig.platform_fee),
            escrow_status: ActiveValue::Set(gig.escrow_status.as_str().to_string()),
            created_at: ActiveValue::Set(gig.created_at),
            updated_at: ActiveValue::Set(gig.updated_at),
        }
    }
}

impl TryFrom<Model> for Gig {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "gig")?,
            client_id: model.client_id,
            title: model.title,
            budget: model.budget,
            status: GigStatus::try_from(model.status.as_str())?,
            freelancer_id: model.freelancer_id,
            accepted_bid_id: model
                .accepted_bid_id
                .as_deref()
                .map(|id| parse_uuid(id, "bid"))
                .transpose()?,
            agreed_amount: model.agreed_amount,
            platform_fee: model.platform_fee,
            escrow_status: EscrowStatus::try_from(model.escrow_status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
