// handlers/session/mod.rs - Session endpoints answered (at least partly) by the gateway
//
// Login and refresh are plain forwarded routes. These are the ones that need
// gateway logic: logout clears cookies after forwarding, token-info and
// session read the token locally.

pub mod logout;
pub mod status;
pub mod token_info;

pub use logout::logout_post;
pub use status::session_get;
pub use token_info::token_info_get;

/*
SESSION ENDPOINTS:

1. **Logout**: POST /api/auth/logout
   - Forwarded to the auth service (or its mock)
   - Whatever the backend answers, the browser also receives removal
     cookies for the access and refresh tokens

2. **Token info**: GET /api/auth/token-info
   - Decodes the access token without verifying it
   - Returns: { userId, companyId, issuedAt, expiresAt, expiresIn, expiresAtIso, expired }
   - 401 when there is no token or it cannot be decoded

3. **Session**: GET /api/auth/session
   - Always 200: { authenticated, userId, companyId }
   - Lets the UI decide whether to show the login screen without a round trip
*/
