pub mod body;
pub mod dependency;
pub mod document;
pub mod index;
pub mod schema;
