pub mod pickup;

pub use pickup::*;
