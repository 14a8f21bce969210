pub mod documents;
pub mod registry;
pub mod verification;
