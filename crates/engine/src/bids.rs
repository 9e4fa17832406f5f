use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl BidStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl TryFrom<&str> for BidStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            other => Err(EngineError::Validation(format!(
                "invalid bid status: {other}"
            ))),
        }
    }
}

/// A freelancer's offer on a gig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub freelancer_id: String,
    pub amount: i64,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub gig_id: String,
    pub freelancer_id: String,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gigs::Entity",
        from = "Column::GigId",
        to = "super::gigs::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Gigs,
}

impl Related<super::gigs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gigs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Bid> for ActiveModel {
    fn from(bid: &Bid) -> Self {
        Self {
            id: ActiveValue::Set(bid.id.to_string()),
            gig_id: ActiveValue::Set(bid.gig_id.to_string()),
            freelancer_id: ActiveValue::Set(bid.freelancer_id.clone()),
            amount: ActiveValue::Set(bid.amount),
            status: ActiveValue::Set(bid.status.as_str().to_string()),
            created_at: ActiveValue::Set(bid.created_at),
        }
    }
}

impl TryFrom<Model> for Bid {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "bid")?,
            gig_id: parse_uuid(&model.gig_id, "gig")?,
            freelancer_id: model.freelancer_id,
            amount: model.amount,
            status: BidStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}
