//! A read-only reflection engine over CLI (.NET) assemblies: given a PE file or memory blob,
//! exposes the object graph managed reflection sees - assemblies, modules, types, members -
//! including cross-module reference resolution, generic instantiation, inheritance, interface
//! implementation, method overriding, and name-based lookup.
//!
//! The loader (`loader::Loader`) is the entry point: it owns every loaded module and assembly,
//! the per-type membership tables built on top of them, and the bump arena everything is
//! allocated out of. Nothing elsewhere in the crate mutates shared state on its own.

pub mod assembly;
pub mod error;
pub mod loader;
pub mod locator;
pub mod membership;
pub mod metadata;
pub mod module;
pub mod name;
pub mod pe;
pub mod query;
pub mod signature;
pub(crate) mod utilities;

pub use assembly::{Assembly, AssemblyName};
pub use error::{LoadError, Result};
pub use loader::{Loader, ResolvedToken};
pub use locator::{DefaultLoaderConfiguration, FileSystemLocator, LoaderConfiguration, Location, ModuleLocator};
pub use membership::{MemberEntry, MemberKind, MemberTable};
pub use module::Module;
pub use name::NameMode;
pub use query::BindingFlags;
