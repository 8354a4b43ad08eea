//! Canonical structured event names used across `amqp-router`.

// Dispatch loop events.
pub const ROUTER_START: &str = "router_start";
pub const DISPATCH_LOOP_START: &str = "dispatch_loop_start";
pub const DISPATCH_LOOP_STOP: &str = "dispatch_loop_stop";
pub const COMMAND_RECEIVED: &str = "command_received";
pub const COMMAND_INVALID: &str = "command_invalid";
pub const COMMAND_IGNORED: &str = "command_ignored";
pub const COMMAND_ACK_DROPPED: &str = "command_ack_dropped";
pub const ENDPOINTS_RELEASED: &str = "endpoints_released";
pub const SHUTDOWN_START: &str = "shutdown_start";
pub const SHUTDOWN_OK: &str = "shutdown_ok";
pub const SHUTDOWN_TIMED_OUT: &str = "shutdown_timed_out";

// Endpoint lifecycle events.
pub const SENDER_CREATE_OK: &str = "sender_create_ok";
pub const SENDER_CREATE_FAILED: &str = "sender_create_failed";
pub const SENDER_EXISTS: &str = "sender_exists";
pub const SENDER_DELETE_OK: &str = "sender_delete_ok";
pub const SENDER_NOT_FOUND: &str = "sender_not_found";
pub const SENDER_CLOSE_FAILED: &str = "sender_close_failed";
pub const SESSION_CLOSE_FAILED: &str = "session_close_failed";
pub const LISTENER_CREATE_OK: &str = "listener_create_ok";
pub const LISTENER_CREATE_FAILED: &str = "listener_create_failed";
pub const LISTENER_EXISTS: &str = "listener_exists";
pub const LISTENER_DELETE_OK: &str = "listener_delete_ok";
pub const LISTENER_NOT_FOUND: &str = "listener_not_found";

// Send task events.
pub const SEND_DISPATCHED: &str = "send_dispatched";
pub const SEND_DROPPED_NO_SENDER: &str = "send_dropped_no_sender";
pub const SEND_ACCEPTED: &str = "send_accepted";
pub const SEND_UNDELIVERED: &str = "send_undelivered";
pub const SEND_REJECTED: &str = "send_rejected";
pub const SEND_TIMED_OUT: &str = "send_timed_out";
pub const BROADCAST_DISPATCHED: &str = "broadcast_dispatched";

// Subscription task events.
pub const SUBSCRIPTION_START: &str = "subscription_start";
pub const SUBSCRIPTION_RECEIVE: &str = "subscription_receive";
pub const SUBSCRIPTION_HANDLER_FAILED: &str = "subscription_handler_failed";
pub const SUBSCRIPTION_RECEIVE_FAILED: &str = "subscription_receive_failed";
pub const SUBSCRIPTION_CANCELLED: &str = "subscription_cancelled";
pub const SUBSCRIPTION_CLOSE_FAILED: &str = "subscription_close_failed";

// Result bus events.
pub const RESULT_DROPPED_NO_SUBSCRIBER: &str = "result_dropped_no_subscriber";
