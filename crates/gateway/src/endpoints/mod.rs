//! # Gatewayエンドポイント

pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use upload::handle_upload;
