//! The loader: the one mutable piece of state in the crate. Owns every [`Module`]/[`Assembly`]
//! it has ever loaded, the fundamental-type and namespace caches built on top of them, and the
//! bump arena everything above is allocated out of.
//!
//! Concurrency model (mirrors the teacher's single-threaded `structured::Context`, generalized
//! to be safely shared across threads): one [`parking_lot::ReentrantMutex`] guards the handful
//! of maps a load can touch more than once during a single resolution (an assembly load that
//! itself triggers resolving a `TypeRef` back into the loader, for instance - hence reentrant,
//! not a plain mutex). Everything reachable *through* an already-published `Module`/`Assembly`
//! reference - the per-module caches in particular - is lock-free once published, per
//! [`crate::module::ModuleCacheCell`]/[`crate::module::TokenCacheCell`].
//!
//! Tokens are only meaningful relative to the module that owns the table they index into, so
//! every resolution method here returns a `(module, token)` pair - [`ResolvedToken`] - rather
//! than a bare [`MetadataToken`], instead of trying to recover the owning module from the token
//! alone later.

use std::cell::RefCell;
use std::fmt::Debug;
use std::pin::Pin;

use bumpalo::Bump;
use fxhash::FxHashMap;
use parking_lot::ReentrantMutex;

use crate::assembly::{Assembly, AssemblyName};
use crate::error::{LoadError, Result};
use crate::locator::{LoaderConfiguration, Location, ModuleLocator};
use crate::membership::{MemberKind, MemberTable};
use crate::metadata::indices::table_index::TypeDefIndex;
use crate::metadata::indices::MetadataToken;
use crate::metadata::table::{ExportedTypeTable, FileTable, MemberRefTable, ModuleRefTable, NestedClassTable, TableKind, TypeRefTable};
use crate::module::Module;
use crate::signature::PrimitiveType;

/// A token paired with the module whose tables it indexes into. Every cross-reference
/// resolution - `TypeRef`, `MemberRef`, a coded index's target - produces one of these instead
/// of a bare token, since a token by itself does not say which module's `#~` stream it is valid
/// against.
pub type ResolvedToken<'l> = (&'l Module<'l>, MetadataToken);

struct LoaderState<'l> {
	/// Keyed by canonical location string.
	assemblies: FxHashMap<String, &'l Assembly<'l>>,
	/// Namespace name to the assembly that was asked for and found to provide it.
	namespaces: FxHashMap<String, &'l Assembly<'l>>,
	/// `System.$name` (or the configured system namespace) to its resolved type-def.
	fundamental_types: FxHashMap<&'static str, (&'l Module<'l>, TypeDefIndex)>,
	system_module: Option<&'l Module<'l>>,
	membership: FxHashMap<(MetadataToken, MemberKind), &'l MemberTable<'l>>,
}

pub struct Loader<'l> {
	bump: Pin<Box<Bump>>,
	locator: Box<dyn ModuleLocator>,
	config: Box<dyn LoaderConfiguration>,
	state: ReentrantMutex<RefCell<LoaderState<'l>>>,
}

impl Debug for Loader<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let guard = self.state.lock();
		let state = guard.borrow();
		f.debug_struct("Loader").field("assemblies", &state.assemblies.len()).field("system_module", &state.system_module.is_some()).finish()
	}
}

impl<'l> Loader<'l> {
	pub fn new(locator: impl ModuleLocator + 'static, config: impl LoaderConfiguration + 'static) -> Self {
		Self {
			bump: Box::pin(Bump::new()),
			locator: Box::new(locator),
			config: Box::new(config),
			state: ReentrantMutex::new(RefCell::new(LoaderState {
				assemblies: FxHashMap::default(),
				namespaces: FxHashMap::default(),
				fundamental_types: FxHashMap::default(),
				system_module: None,
				membership: FxHashMap::default(),
			})),
		}
	}

	pub fn config(&self) -> &dyn LoaderConfiguration {
		self.config.as_ref()
	}

	pub(crate) fn membership_cache_get(&'l self, key: (MetadataToken, MemberKind)) -> Option<&'l MemberTable<'l>> {
		let guard = self.state.lock();
		guard.borrow().membership.get(&key).copied()
	}

	pub(crate) fn membership_cache_insert(&'l self, key: (MetadataToken, MemberKind), table: &'l MemberTable<'l>) {
		let guard = self.state.lock();
		guard.borrow_mut().membership.insert(key, table);
	}

	pub(crate) fn alloc<T>(&'l self, value: T) -> &'l T {
		self.bump().alloc(value)
	}

	pub(crate) fn alloc_slice_copy<T: Copy>(&'l self, values: &[T]) -> &'l [T] {
		self.bump().alloc_slice_copy(values)
	}

	/// SAFETY: `self.bump` is a boxed, pinned arena: its backing allocation is never moved or
	/// freed for as long as `self` is alive, so anything handed out of it remains valid for that
	/// whole lifetime even though the borrow checker only sees `&self`'s lifetime here. This is
	/// the loader's one sanctioned unsafe surface; every allocation the loader ever hands a
	/// caller (modules, assemblies, membership tables, file bytes) is born through this method.
	fn bump(&self) -> &'l Bump {
		unsafe { std::mem::transmute::<&Bump, &'l Bump>(&self.bump) }
	}

	fn read_location(&'l self, location: &Location) -> Result<&'l [u8]> {
		match location {
			Location::Path(path) => {
				let bytes = std::fs::read(path)?;
				Ok(self.alloc_slice_copy(&bytes))
			}
			Location::Memory(bytes) => Ok(self.alloc_slice_copy(bytes)),
		}
	}

	fn canonicalize(location: &str) -> String {
		std::fs::canonicalize(location).map(|p| p.to_string_lossy().into_owned()).unwrap_or_else(|_| location.to_owned())
	}

	fn register_assembly(&'l self, key: String, module: &'l Module<'l>) -> &'l Assembly<'l> {
		let assembly = self.alloc(Assembly::new(module));
		let guard = self.state.lock();
		let mut state = guard.borrow_mut();
		if state.system_module.is_none() && assembly.is_system_assembly() {
			state.system_module = Some(module);
		}
		state.assemblies.insert(key, assembly);
		assembly
	}

	// ---- 1: get_or_load_assembly(location) -----------------------------------------------

	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn get_or_load_assembly(&'l self, location: &str) -> Result<&'l Assembly<'l>> {
		let key = Self::canonicalize(location);
		{
			let guard = self.state.lock();
			if let Some(assembly) = guard.borrow().assemblies.get(&key) {
				return Ok(*assembly);
			}
		}

		let data = self.read_location(&Location::Path(location.into()))?;
		let module = Module::parse(key.clone(), data, self.config.as_ref())?;
		let module = self.alloc(module);
		Ok(self.register_assembly(key, module))
	}

	// ---- 2: get_or_load_assembly(name) ----------------------------------------------------

	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn get_or_load_assembly_by_name(&'l self, name: &AssemblyName) -> Result<&'l Assembly<'l>> {
		{
			let guard = self.state.lock();
			let state = guard.borrow();
			for assembly in state.assemblies.values() {
				if assembly.name().ok().map(|n| n.name.as_str()) == Some(name.name.as_str()) {
					return Ok(*assembly);
				}
			}
		}

		let location = self.locator.locate_assembly(&name.name).ok_or_else(|| LoadError::UnresolvedReference(format!("could not locate assembly '{}'", name.name)))?;
		let key = match &location {
			Location::Path(path) => Self::canonicalize(&path.to_string_lossy()),
			Location::Memory(_) => format!("<memory:{}>", name.name),
		};
		let data = self.read_location(&location)?;
		let module = Module::parse(key.clone(), data, self.config.as_ref())?;
		let module = self.alloc(module);
		Ok(self.register_assembly(key, module))
	}

	pub(crate) fn load_sibling_module(&'l self, requesting_location: &str, module_name: &str) -> Result<&'l Module<'l>> {
		let location = self
			.locator
			.locate_module(requesting_location, module_name)
			.ok_or_else(|| LoadError::UnresolvedReference(format!("could not locate module '{module_name}'")))?;
		let key = match &location {
			Location::Path(path) => Self::canonicalize(&path.to_string_lossy()),
			Location::Memory(_) => format!("<memory:{module_name}>"),
		};
		{
			let guard = self.state.lock();
			if let Some(assembly) = guard.borrow().assemblies.get(&key) {
				return Ok(assembly.manifest_module());
			}
		}
		let data = self.read_location(&location)?;
		let module = Module::parse(key, data, self.config.as_ref())?;
		Ok(self.alloc(module))
	}

	// ---- 3: resolve_type_ref ---------------------------------------------------------------

	/// `rid` is the one-based `TypeRef` row id, as packed into a `TypeDefOrRef`/`ResolutionScope`
	/// coded index or read directly off a bare token.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn resolve_type_ref(&'l self, module: &'l Module<'l>, rid: u32) -> Result<ResolvedToken<'l>> {
		let idx = rid as usize - 1;
		if let Some((scope, row)) = module.type_ref_cache.get(idx).and_then(|c| c.get()) {
			return Ok((scope, TypeDefIndex(row).token()));
		}

		let table = module.root().tables.get_table::<TypeRefTable>().ok_or_else(|| LoadError::invalid_metadata("module has no TypeRef table"))?;
		let row = table.get(idx).ok_or_else(|| LoadError::invalid_metadata("TypeRef row out of range"))?;
		let name = module.root().strings.get(row.type_name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
		let namespace = module.root().strings.get(row.type_namespace).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;

		let (target_module, target_idx) = match row.resolution_scope.table_kind() {
			Some(TableKind::Module) => {
				let idx = module.find_type_def(namespace, name).ok_or_else(|| Self::unresolved_type(namespace, name))?;
				(module, idx)
			}
			Some(TableKind::ModuleRef) => {
				let mr_rid = row.resolution_scope.token().expect("table_kind implies a token").rid();
				let target = self.resolve_module_ref(module, mr_rid)?;
				let idx = target.find_type_def(namespace, name).ok_or_else(|| Self::unresolved_type(namespace, name))?;
				(target, idx)
			}
			Some(TableKind::AssemblyRef) => {
				let ar_rid = row.resolution_scope.token().expect("table_kind implies a token").rid();
				let target = self.resolve_assembly_ref(module, ar_rid)?;
				let idx = target.find_type_def(namespace, name).ok_or_else(|| Self::unresolved_type(namespace, name))?;
				(target, idx)
			}
			Some(TableKind::TypeRef) => {
				let parent_rid = row.resolution_scope.token().expect("table_kind implies a token").rid();
				let parent = self.resolve_type_ref(module, parent_rid)?;
				self.resolve_nested_type(parent, name)?
			}
			_ => self.resolve_exported_type(module, namespace, name)?,
		};

		module.type_ref_cache[idx].set(target_module, target_idx.0);
		Ok((target_module, target_idx.token()))
	}

	fn unresolved_type(namespace: &str, name: &str) -> LoadError {
		LoadError::UnresolvedReference(format!("could not resolve type '{namespace}.{name}'"))
	}

	/// A nested type ref's parent resolves to a `TypeDef`; the nested type itself is found by
	/// scanning that module's `NestedClass` table for the enclosing-class row and matching the
	/// simple name (nested types have an empty namespace by definition).
	fn resolve_nested_type(&'l self, parent: ResolvedToken<'l>, name: &str) -> Result<(&'l Module<'l>, TypeDefIndex)> {
		let (module, parent_token) = parent;
		let parent_idx = parent_token.index().ok_or_else(|| LoadError::invalid_metadata("nil parent token for nested type"))?;
		let nested = module.root().tables.get_table::<NestedClassTable>().ok_or_else(|| LoadError::invalid_metadata("module has no NestedClass table"))?;
		for row in nested.rows() {
			if row.enclosing_class.idx() != parent_idx {
				continue;
			}
			if let Some(def) = module.type_def(row.nested_class) {
				let def_name = module.root().strings.get(def.type_name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
				if def_name == name {
					return Ok((module, row.nested_class));
				}
			}
		}
		Err(Self::unresolved_type("", name))
	}

	/// A `TypeRef` with a null resolution scope names a type forwarded out of the current
	/// assembly: its definition lives wherever the matching `ExportedType` row's
	/// `implementation` points.
	fn resolve_exported_type(&'l self, module: &'l Module<'l>, namespace: &str, name: &str) -> Result<(&'l Module<'l>, TypeDefIndex)> {
		let table = module.root().tables.get_table::<ExportedTypeTable>().ok_or_else(|| Self::unresolved_type(namespace, name))?;
		for row in table.rows() {
			let row_name = module.root().strings.get(row.type_name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
			let row_ns = module.root().strings.get(row.type_namespace).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
			if row_name != name || row_ns != namespace {
				continue;
			}
			return match row.implementation.table_kind() {
				Some(TableKind::AssemblyRef) => {
					let rid = row.implementation.token().expect("checked above").rid();
					let target = self.resolve_assembly_ref(module, rid)?;
					let idx = target.find_type_def(namespace, name).ok_or_else(|| Self::unresolved_type(namespace, name))?;
					Ok((target, idx))
				}
				Some(TableKind::File) => {
					let file_rid = row.implementation.token().expect("checked above").rid();
					let files = module.root().tables.get_table::<FileTable>().ok_or_else(|| Self::unresolved_type(namespace, name))?;
					let file = files.get(file_rid as usize - 1).ok_or_else(|| Self::unresolved_type(namespace, name))?;
					let file_name = module.root().strings.get(file.name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
					let target = self.load_sibling_module(module.location(), file_name)?;
					let idx = target.find_type_def(namespace, name).ok_or_else(|| Self::unresolved_type(namespace, name))?;
					Ok((target, idx))
				}
				_ => Err(Self::unresolved_type(namespace, name)),
			};
		}
		Err(Self::unresolved_type(namespace, name))
	}

	fn resolve_module_ref(&'l self, module: &'l Module<'l>, rid: u32) -> Result<&'l Module<'l>> {
		let idx = rid as usize - 1;
		if let Some(target) = module.module_ref_cache.get(idx).and_then(|c| c.get()) {
			return Ok(target);
		}
		let table = module.root().tables.get_table::<ModuleRefTable>().ok_or_else(|| LoadError::invalid_metadata("module has no ModuleRef table"))?;
		let row = table.get(idx).ok_or_else(|| LoadError::invalid_metadata("ModuleRef row out of range"))?;
		let name = module.root().strings.get(row.name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
		let target = self.load_sibling_module(module.location(), name)?;
		module.module_ref_cache[idx].set(target);
		Ok(target)
	}

	fn resolve_assembly_ref(&'l self, module: &'l Module<'l>, rid: u32) -> Result<&'l Module<'l>> {
		let idx = rid as usize - 1;
		if let Some(target) = module.assembly_ref_cache.get(idx).and_then(|c| c.get()) {
			return Ok(target);
		}
		let row = module.assembly_refs().get(idx).ok_or_else(|| LoadError::invalid_metadata("AssemblyRef row out of range"))?;
		let name = AssemblyName::from_assembly_ref_row(row, module.root()).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
		let assembly = self.get_or_load_assembly_by_name(&name)?;
		let target = assembly.manifest_module();
		module.assembly_ref_cache[idx].set(target);
		Ok(target)
	}

	// ---- 4: resolve_fundamental_type --------------------------------------------------------

	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn resolve_fundamental_type(&'l self, primitive: PrimitiveType) -> Result<(&'l Module<'l>, TypeDefIndex)> {
		self.resolve_system_type(fundamental_type_name(primitive))
	}

	/// Resolves a named type in the system assembly's configured namespace, caching the result
	/// under `name` - the same cache `resolve_fundamental_type` uses, since a primitive's CLR name
	/// (`Int32`, `String`, ...) and a structural name this crate needs by convention rather than
	/// by element-type tag (`Array`, for the array-signature membership fallback) are both just
	/// names in that one namespace.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn resolve_system_type(&'l self, name: &'static str) -> Result<(&'l Module<'l>, TypeDefIndex)> {
		{
			let guard = self.state.lock();
			if let Some(found) = guard.borrow().fundamental_types.get(name) {
				return Ok(*found);
			}
		}

		let system_module = self.system_module()?;
		let idx = system_module.find_type_def(self.config.system_namespace(), name).ok_or_else(|| Self::unresolved_type(self.config.system_namespace(), name))?;

		let guard = self.state.lock();
		guard.borrow_mut().fundamental_types.insert(name, (system_module, idx));
		Ok((system_module, idx))
	}

	/// The assembly with zero `AssemblyRef` rows, designated the first time any assembly whose
	/// reference graph bottoms out there is loaded. If nothing has been loaded yet, nothing can
	/// be designated: the caller must load at least one assembly first.
	pub fn system_module(&'l self) -> Result<&'l Module<'l>> {
		let guard = self.state.lock();
		guard.borrow().system_module.ok_or_else(|| LoadError::LogicViolation("no system assembly has been loaded yet".into()))
	}

	// ---- 5: resolve_namespace ----------------------------------------------------------------

	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn resolve_namespace(&'l self, namespace: &str) -> Result<&'l Assembly<'l>> {
		{
			let guard = self.state.lock();
			if let Some(assembly) = guard.borrow().namespaces.get(namespace) {
				return Ok(*assembly);
			}
		}

		let location = self.locator.locate_namespace(namespace).ok_or_else(|| LoadError::UnresolvedReference(format!("could not locate namespace '{namespace}'")))?;
		let key = match &location {
			Location::Path(path) => Self::canonicalize(&path.to_string_lossy()),
			Location::Memory(_) => format!("<memory:{namespace}>"),
		};
		let data = self.read_location(&location)?;
		let module = Module::parse(key.clone(), data, self.config.as_ref())?;
		let module = self.alloc(module);
		let assembly = self.register_assembly(key, module);

		let guard = self.state.lock();
		guard.borrow_mut().namespaces.insert(namespace.to_owned(), assembly);
		Ok(assembly)
	}

	// ---- 6: resolve_member_ref ---------------------------------------------------------------

	/// Resolves a `MemberRef` to the `Field` or `MethodDef` it actually names, by resolving its
	/// parent type then scanning that type's declared-and-inherited members (via the membership
	/// engine, so a member forwarded through a base class is reachable too) for a
	/// name-and-signature match.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn resolve_member_ref(&'l self, module: &'l Module<'l>, rid: u32) -> Result<ResolvedToken<'l>> {
		let idx = rid as usize - 1;
		if let Some((scope, row)) = module.member_ref_cache.get(idx).and_then(|c| c.get()) {
			return Ok((scope, MetadataToken(row)));
		}

		let table = module.root().tables.get_table::<MemberRefTable>().ok_or_else(|| LoadError::invalid_metadata("module has no MemberRef table"))?;
		let row = table.get(idx).ok_or_else(|| LoadError::invalid_metadata("MemberRef row out of range"))?;
		let name = module.root().strings.get(row.name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
		let signature = module.root().blobs.get(row.signature).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;

		let (owner, parent_idx) = match row.class.table_kind() {
			Some(TableKind::TypeDef) => {
				let rid = row.class.token().expect("checked above").rid();
				(module, TypeDefIndex(rid))
			}
			Some(TableKind::TypeRef) => {
				let rid = row.class.token().expect("checked above").rid();
				let (owner, token) = self.resolve_type_ref(module, rid)?;
				(owner, TypeDefIndex(token.rid()))
			}
			Some(TableKind::ModuleRef) => {
				let rid = row.class.token().expect("checked above").rid();
				let target = self.resolve_module_ref(module, rid)?;
				let idx = target.find_type_def("", name).ok_or_else(|| Self::unresolved_type("", name))?;
				(target, idx)
			}
			_ => return Err(LoadError::UnresolvedReference(format!("unsupported MemberRef parent for '{name}'"))),
		};

		let (target_module, token) = crate::membership::resolve_member_ref_target(self, owner, parent_idx, name, signature)?;
		module.member_ref_cache[idx].set(target_module, token.0);
		Ok((target_module, token))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::locator::{DefaultLoaderConfiguration, FileSystemLocator};

	/// Builds a minimal `BSJB` metadata root out of named stream bodies, computing every stream
	/// directory offset and padded name field from their actual lengths.
	fn build_metadata_root(streams: &[(&str, &[u8])]) -> Vec<u8> {
		let mut header = Vec::new();
		header.extend_from_slice(b"BSJB");
		header.extend_from_slice(&1u16.to_le_bytes());
		header.extend_from_slice(&0u16.to_le_bytes());
		header.extend_from_slice(&0u32.to_le_bytes());
		header.extend_from_slice(&4u32.to_le_bytes());
		header.extend_from_slice(b"v4\0\0");
		header.extend_from_slice(&0u16.to_le_bytes());
		header.extend_from_slice(&(streams.len() as u16).to_le_bytes());

		let name_fields: Vec<Vec<u8>> = streams
			.iter()
			.map(|(name, _)| {
				let mut nf = name.as_bytes().to_vec();
				nf.push(0);
				while nf.len() % 4 != 0 {
					nf.push(0);
				}
				nf
			})
			.collect();

		let dir_len: usize = streams.len() * 8 + name_fields.iter().map(|n| n.len()).sum::<usize>();
		let mut body_offset = header.len() + dir_len;
		let mut dir = Vec::new();
		let mut bodies = Vec::new();
		for ((_, bytes), nf) in streams.iter().zip(name_fields.iter()) {
			dir.extend_from_slice(&(body_offset as u32).to_le_bytes());
			dir.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
			dir.extend_from_slice(nf);
			bodies.extend_from_slice(bytes);
			body_offset += bytes.len();
		}

		let mut buf = header;
		buf.extend_from_slice(&dir);
		buf.extend_from_slice(&bodies);
		buf
	}

	/// A `#~` stream with one `TypeDef` row named by the given (namespace, name) string-heap
	/// offsets, and no other tables (so the module qualifies as a system assembly).
	fn type_def_table_stream(namespace_offset: u32, name_offset: u32) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&0u32.to_le_bytes());
		buf.push(1);
		buf.push(0);
		buf.push(0); // heap_sizes: all 2-byte indices
		buf.push(0);
		buf.extend_from_slice(&(1u64 << 0x02).to_le_bytes()); // valid: TypeDef
		buf.extend_from_slice(&0u64.to_le_bytes());
		buf.extend_from_slice(&1u32.to_le_bytes()); // one row

		buf.extend_from_slice(&0u32.to_le_bytes()); // flags
		buf.extend_from_slice(&(name_offset as u16).to_le_bytes()); // type_name
		buf.extend_from_slice(&(namespace_offset as u16).to_le_bytes()); // type_namespace
		buf.extend_from_slice(&0u16.to_le_bytes()); // extends
		buf.extend_from_slice(&1u16.to_le_bytes()); // field_list
		buf.extend_from_slice(&1u16.to_le_bytes()); // method_list
		buf
	}

	/// A system-assembly-shaped module: `System.Object`, reachable by namespace lookup, with no
	/// `AssemblyRef` rows of its own.
	fn system_assembly_bytes() -> Vec<u8> {
		let mut strings = vec![0u8]; // offset 0: empty string
		strings.extend_from_slice(b"System\0"); // offset 1
		strings.extend_from_slice(b"Object\0"); // offset 8
		let table_stream = type_def_table_stream(1, 8);
		build_metadata_root(&[("#Strings", &strings), ("#~", &table_stream)])
	}

	fn write_temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
		let path = std::env::temp_dir().join(format!("reflect-cil-loader-test-{}-{}", std::process::id(), name));
		std::fs::write(&path, bytes).unwrap();
		path
	}

	#[test]
	fn system_module_is_unavailable_before_anything_is_loaded() {
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		assert!(loader.system_module().is_err());
	}

	#[test]
	fn loading_an_assembly_with_no_assembly_refs_designates_it_the_system_assembly() {
		let path = write_temp_file("system.dll", &system_assembly_bytes());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);

		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		assert!(assembly.is_system_assembly());
		assert!(loader.system_module().is_ok());

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn resolve_fundamental_type_and_resolve_system_type_agree_on_object() {
		let path = write_temp_file("system2.dll", &system_assembly_bytes());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();

		let via_name = loader.resolve_system_type("Object").unwrap();
		let via_primitive = loader.resolve_fundamental_type(PrimitiveType::Object).unwrap();
		assert_eq!(via_name.1, via_primitive.1);

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn loading_the_same_location_twice_returns_the_same_assembly() {
		let path = write_temp_file("system3.dll", &system_assembly_bytes());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);

		let first = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let second = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		assert!(std::ptr::eq(first, second));

		std::fs::remove_file(&path).ok();
	}
}

/// CLR name for each primitive element type, as declared in the system assembly's namespace.
fn fundamental_type_name(primitive: PrimitiveType) -> &'static str {
	match primitive {
		PrimitiveType::Void => "Void",
		PrimitiveType::Boolean => "Boolean",
		PrimitiveType::Char => "Char",
		PrimitiveType::SByte => "SByte",
		PrimitiveType::Byte => "Byte",
		PrimitiveType::Int16 => "Int16",
		PrimitiveType::UInt16 => "UInt16",
		PrimitiveType::Int32 => "Int32",
		PrimitiveType::UInt32 => "UInt32",
		PrimitiveType::Int64 => "Int64",
		PrimitiveType::UInt64 => "UInt64",
		PrimitiveType::Single => "Single",
		PrimitiveType::Double => "Double",
		PrimitiveType::String => "String",
		PrimitiveType::IntPtr => "IntPtr",
		PrimitiveType::UIntPtr => "UIntPtr",
		PrimitiveType::Object => "Object",
		PrimitiveType::TypedReference => "TypedReference",
	}
}
