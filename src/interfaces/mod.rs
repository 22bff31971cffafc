//! Inbound and outbound adapters: the CSV command stream, the balance CSV
//! writer, the replay loop and the JSON admin actions.

pub mod admin;
pub mod commands;
pub mod csv;
pub mod replay;
