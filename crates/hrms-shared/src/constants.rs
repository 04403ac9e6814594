/// Maximum number of hits returned by a single search query
pub const MAX_SEARCH_RESULTS: usize = 8;

/// Score contributed when every query token appears in some haystack string
pub const WEIGHT_ALL_TOKENS: u32 = 3;

/// Score contributed when the query and a haystack string contain one another
pub const WEIGHT_DIRECT: u32 = 2;

/// Score contributed when a haystack string starts with the query
pub const WEIGHT_PREFIX: u32 = 1;

/// Display name used for group conversations without a title
pub const GROUP_CHAT_FALLBACK: &str = "Group Chat";

/// Display name used for direct conversations without a resolvable peer name
pub const DIRECT_CHAT_FALLBACK: &str = "Direct Chat";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Delay before the push channel reconnects after the stream ends, in seconds
pub const DEFAULT_RECONNECT_SECS: u64 = 5;

/// Push event names carried in the `event` field of a socket frame
pub const EVENT_PRESENCE: &str = "presence";
pub const EVENT_MESSAGE: &str = "message";
