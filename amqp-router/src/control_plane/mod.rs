//! Control-plane layer.
//!
//! Owns the endpoint maps and every transition on them. The dispatch loop is
//! the single writer; endpoint creation negotiates a dedicated session per
//! endpoint and leaves the maps untouched when negotiation fails, so a later
//! create command simply retries.

pub(crate) mod dispatch_loop;
pub(crate) mod endpoint_lifecycle;
pub(crate) mod endpoint_table;
