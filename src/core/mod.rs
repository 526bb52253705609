pub mod error;
pub mod money;
pub mod selectable;

pub use error::{AppError, Result};
pub use selectable::{Selectable, SelectableOption};
