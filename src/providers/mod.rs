pub mod awesome_api;
pub mod util;
