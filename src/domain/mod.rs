//! Plain data records and the store ports they travel through.

pub mod cart;
pub mod catalog;
pub mod ids;
pub mod money;
pub mod order;
pub mod ports;
pub mod wishlist;
