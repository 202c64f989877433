pub mod index;
pub mod redirect;
