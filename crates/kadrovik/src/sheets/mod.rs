//! Spreadsheet delivery: gateway client and outbox drain loop

pub mod client;
pub mod writer;

pub use client::{HttpSheetsClient, SheetsClient};
