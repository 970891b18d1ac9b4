pub mod descriptor;
pub mod error;
pub mod guid;
pub mod identity;
pub mod items;
pub mod loader;
pub mod parser;
pub mod registry;
pub mod resolve;

// Re-export commonly used types
pub use descriptor::TypeLibDescriptor;
pub use error::{LoadError, ParseError, ResolutionError};
pub use guid::Guid;
pub use identity::{LibraryIdentity, LibraryReference, NormalizedRef, RegisteredObject};
pub use items::{externals, BuiltinType, ItemMap, ParsedItem, TypeRef};
pub use loader::{DescriptorFileLoader, TypeLibLoader, TypeLibraryHandle};
pub use parser::{DescriptorParser, EntryParser};
pub use registry::{Registry, StaticRegistry};
pub use resolve::{parse_designator, resolve, Resolution};
