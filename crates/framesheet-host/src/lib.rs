pub mod error;
pub mod memory;
pub mod style;
pub mod traits;

pub use error::HostError;
pub use memory::{ChartRecord, MemoryHost};
pub use style::{BorderStyle, BorderWeight, ChartId, Color, ColorScale, FontStyle};
pub use traits::SheetHost;
