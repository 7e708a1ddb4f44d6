pub mod address;
pub mod collection;
pub mod coord;
pub mod error;
pub mod range;
pub mod value;

pub use address::*;
pub use collection::*;
pub use coord::*;
pub use error::*;
pub use range::*;
pub use value::*;
