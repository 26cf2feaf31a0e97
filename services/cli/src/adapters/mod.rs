pub mod classroom;
pub mod clock;
pub mod oauth;

pub use classroom::ClassroomAdapter;
pub use clock::SystemClock;
pub use oauth::{authorize, OAuthClient, TokenSource, TokenStore};
