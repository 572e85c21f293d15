// Well-known paths and event names of the relay's HTTP surface.
// Existing publisher and browser clients hard-code these; do not rename.

// subscriber stream (open to any origin)
pub const SSE: &str = "/sse";

// control surface (loopback only)
pub const BCAST: &str = "/bcast";
pub const CLIENTS: &str = "/clients";
pub const EXIT: &str = "/exit";

// event types emitted by the relay itself
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_PING: &str = "ping";
pub const EVENT_SERVICE: &str = "service";

pub const WELCOME_TEXT: &str = "You are now connected to the SSE server.";
