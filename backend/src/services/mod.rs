//! Business logic services for the Mandi Trade Management Platform

pub mod auth;
pub mod deal;
pub mod delivery;
pub mod dispatch;
pub mod pack_size;
pub mod price;
pub mod stock;

pub use auth::AuthService;
pub use deal::DealService;
pub use delivery::DeliveryService;
pub use dispatch::DispatchService;
pub use pack_size::PackSizeService;
pub use price::PriceService;
pub use stock::StockService;
