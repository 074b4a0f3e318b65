//! Domain model of the semantic metadata registry.

pub mod aspect;
pub mod criteria;
pub mod device_type;
pub mod function;

pub use aspect::AspectNode;
pub use criteria::{FilterCriteria, Interaction};
pub use device_type::{Content, ContentVariable, DeviceType, Service, ServiceGroup};
pub use function::{Function, FunctionKind};
