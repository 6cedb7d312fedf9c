//! Normal mode input handlers
//!
//! Handlers for keyboard input when no popup or input line is open.

mod details;
mod packet_list;

pub use details::handle_details_key;
pub use packet_list::handle_packet_list_key;
