//! Outward-facing adapters. Only the batch CSV surface lives here.

pub mod csv;
