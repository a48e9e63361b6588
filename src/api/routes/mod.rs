//! Route handlers, one module per resource.

pub mod associations;
pub mod auth;
pub mod campaigns;
pub mod documents;
pub mod donations;
pub mod payments;
pub mod users;
