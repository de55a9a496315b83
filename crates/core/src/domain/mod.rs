pub mod batch;
pub mod case;
pub mod customer;
pub mod product;
pub mod recommendation;
