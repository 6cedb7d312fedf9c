//! packetview - Terminal viewer for inspecting, filtering, editing and
//! resending network packets
//!
//! This library provides the viewer core (packet registry, column model,
//! packet list, details views and the coordinator) and the terminal UI on
//! top of it.

pub mod app;
pub mod capture;
pub mod column;
pub mod config;
pub mod craft;
pub mod details;
pub mod filter;
pub mod inbox;
pub mod input;
pub mod logging;
pub mod packet;
pub mod tui;
