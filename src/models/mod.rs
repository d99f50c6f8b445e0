// Re-export all model types
pub use self::errors::*;
pub use self::menu::*;
pub use self::order::*;
pub use self::restaurant::*;
pub use self::validation::*;

mod errors;
mod menu;
mod order;
mod restaurant;
mod validation;

/// Join the public assets base URL and a stored image key
pub fn asset_url(base: &str, key: &str) -> String {
    if base.is_empty() {
        return key.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
