pub mod color;
pub mod geo;
pub(crate) mod ids;
pub mod resolution;
pub mod url;
