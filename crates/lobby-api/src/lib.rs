pub mod error;
pub mod guestbook;
pub mod middleware;
pub mod notify;
pub mod ntfy;
pub mod state;

use axum::Json;

const GREETING: &str = "Hello from the lobby guestbook!";

/// GET / — liveness greeting, served as a JSON string like everything else.
pub async fn greeting() -> Json<&'static str> {
    Json(GREETING)
}
