//! Reddit OAuth endpoints and flow parameters

/// Browser-facing authorization page.
pub const AUTHORIZE_ENDPOINT: &str = "https://www.reddit.com/api/v1/authorize";

/// Token endpoint for code exchange and refresh (basic auth with app id/secret).
pub const TOKEN_ENDPOINT: &str = "https://www.reddit.com/api/v1/access_token";

/// Base URL for bearer-authenticated API calls.
pub const API_BASE: &str = "https://oauth.reddit.com";

/// Scopes requested at authorization time.
/// `history` is needed to page through the user's own overview listing.
pub const SCOPES: &str = "identity read history edit";

/// `duration=permanent` makes the token endpoint issue a refresh token.
pub const TOKEN_DURATION: &str = "permanent";

/// Reddit rejects requests with generic user agents.
pub const DEFAULT_USER_AGENT: &str = concat!("reddit-retention:v", env!("CARGO_PKG_VERSION"));
