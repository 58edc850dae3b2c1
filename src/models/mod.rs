pub mod booking;
pub mod category;
pub mod menu_item;
pub mod order;
pub mod order_item;
pub mod restaurant_table;
pub mod user;

pub use booking::{BookingStatus, TimeSlot};
pub use order::OrderStatus;
