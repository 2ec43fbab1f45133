//! HTTP request handlers for the Mandi Trade Management Platform

pub mod auth;
pub mod deal;
pub mod delivery;
pub mod dispatch;
pub mod health;
pub mod pack_size;
pub mod price;
pub mod stock;

pub use auth::{login, refresh, register};
pub use deal::{
    cancel_deal, confirm_deal, create_deal, delete_deal, get_deal, list_deals, refresh_deal,
    update_deal,
};
pub use delivery::{
    allocate_fifo, cancel_delivery, create_delivery, delete_delivery, get_aggregated_lines,
    get_delivery, get_pending_deal_items, list_deliveries, submit_delivery, update_delivery,
};
pub use dispatch::{
    cancel_dispatch, create_dispatch, get_dispatch, get_undispatched_deliveries, list_dispatches,
    submit_dispatch,
};
pub use health::health_check;
pub use pack_size::{create_pack_size, list_pack_sizes, update_pack_size};
pub use price::{create_price, deactivate_price, get_area_prices, list_prices, resolve_rate};
pub use stock::{
    cancel_stock_entry, create_issue_from_delivery, create_stock_entry, get_stock_balances,
    get_stock_entry, list_stock_entries, submit_stock_entry,
};
