//! Page Components

mod payment;
mod products;

pub use payment::OrderPaymentPage;
pub use products::ProductsPage;
