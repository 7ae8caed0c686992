// Client side of the action API: an HTTP client that folds the server's
// `{status, ...}` envelope into `ApiResponse`, and the session store a
// dashboard front end keeps around it.

pub mod api;
pub mod store;

pub use api::{normalize, ApiClient, ApiResponse, ClientError};
pub use store::{AppStore, ChatMessage, ChatSender, ClientUser, ProfileUpdates};
