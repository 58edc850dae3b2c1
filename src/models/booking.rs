use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl BookingStatus {
    /// Statuses that hold a table for their slot.
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_final(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

/// Hourly reservation windows, 17:00 through 22:00.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
pub enum TimeSlot {
    #[sea_orm(string_value = "17:00")]
    #[serde(rename = "17:00")]
    H1700,
    #[sea_orm(string_value = "18:00")]
    #[serde(rename = "18:00")]
    H1800,
    #[sea_orm(string_value = "19:00")]
    #[serde(rename = "19:00")]
    H1900,
    #[sea_orm(string_value = "20:00")]
    #[serde(rename = "20:00")]
    H2000,
    #[sea_orm(string_value = "21:00")]
    #[serde(rename = "21:00")]
    H2100,
    #[sea_orm(string_value = "22:00")]
    #[serde(rename = "22:00")]
    H2200,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 6] = [
        TimeSlot::H1700,
        TimeSlot::H1800,
        TimeSlot::H1900,
        TimeSlot::H2000,
        TimeSlot::H2100,
        TimeSlot::H2200,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::H1700 => "17:00",
            TimeSlot::H1800 => "18:00",
            TimeSlot::H1900 => "19:00",
            TimeSlot::H2000 => "20:00",
            TimeSlot::H2100 => "21:00",
            TimeSlot::H2200 => "22:00",
        }
    }

    /// 12-hour label shown to guests, e.g. "7:00 PM".
    pub fn display_time(self) -> &'static str {
        match self {
            TimeSlot::H1700 => "5:00 PM",
            TimeSlot::H1800 => "6:00 PM",
            TimeSlot::H1900 => "7:00 PM",
            TimeSlot::H2000 => "8:00 PM",
            TimeSlot::H2100 => "9:00 PM",
            TimeSlot::H2200 => "10:00 PM",
        }
    }

    pub fn start_hour(self) -> u32 {
        match self {
            TimeSlot::H1700 => 17,
            TimeSlot::H1800 => 18,
            TimeSlot::H1900 => 19,
            TimeSlot::H2000 => 20,
            TimeSlot::H2100 => 21,
            TimeSlot::H2200 => 22,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub table_id: i32,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub number_of_guests: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub special_requests: String,
    pub status: BookingStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::restaurant_table::Entity",
        from = "Column::TableId",
        to = "super::restaurant_table::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Table,
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::restaurant_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Table.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_past_due(&self, now: NaiveDateTime) -> bool {
        schedule::is_past_due(self.date, self.time_slot, now)
    }

    /// Status as observed at `now`, with elapsed bookings reported as completed.
    pub fn effective_status(&self, now: NaiveDateTime) -> BookingStatus {
        schedule::effective_status(self.status, self.date, self.time_slot, now)
    }

    /// One-line description used wherever an order points at this booking.
    pub fn summary(&self) -> String {
        format!(
            "Booking #{} - {} - {} {}",
            self.id,
            self.customer_name,
            self.date,
            self.time_slot.as_str()
        )
    }
}

/// Booking as rendered by the API: stored fields plus table/user details and
/// the status derived for the current moment.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: i32,
    pub user: i32,
    pub user_name: String,
    pub table: i32,
    pub table_number: i32,
    pub table_capacity: i32,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub number_of_guests: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub special_requests: String,
    pub status: BookingStatus,
    pub is_past_due: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingView {
    pub fn new(
        booking: Model,
        user_name: String,
        table: &super::restaurant_table::Model,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            status: booking.effective_status(now),
            is_past_due: booking.is_past_due(now),
            id: booking.id,
            user: booking.user_id,
            user_name,
            table: booking.table_id,
            table_number: table.number,
            table_capacity: table.capacity,
            date: booking.date,
            time_slot: booking.time_slot,
            number_of_guests: booking.number_of_guests,
            customer_name: booking.customer_name,
            customer_email: booking.customer_email,
            customer_phone: booking.customer_phone,
            special_requests: booking.special_requests,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}
