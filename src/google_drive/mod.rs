mod api;
mod error;
pub mod flow;
pub mod oauth;
mod types;
mod utils;

use reqwest::Client;

pub use api::*;
pub use error::Error;
pub use types::*;

lazy_static::lazy_static! {
    pub static ref HTTP: Client = Client::new();
}
