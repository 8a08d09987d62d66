//! Model implementations and the shared prediction trait.
pub mod forest;
pub mod lasso;
pub mod linear;
pub mod regressor_trait;

pub use regressor_trait::RegressionModel;
