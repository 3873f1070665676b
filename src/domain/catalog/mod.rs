//! Product catalog domain.

mod product;

pub use product::{NewProduct, Product};
