pub mod api_errors;
pub mod creem;
pub mod creem_client;
pub mod signature;
pub mod stripe;
pub mod stripe_client;
