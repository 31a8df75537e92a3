pub mod error;
pub mod record;
pub mod values;

pub use error::{GraphError, Result};
pub use record::{NodeRecord, RelationshipRecord, ENTRY_POINT_ATTR};
pub use values::NodeValues;
