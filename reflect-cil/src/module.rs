//! A single loaded CLI module: the parsed metadata database plus the type-def index and
//! reference-resolution caches built on top of it.
//!
//! A module never resolves anything by itself - `AssemblyRef`/`ModuleRef`/`TypeRef`/`MemberRef`
//! rows only ever name *what* to resolve, the [`crate::loader::Loader`] decides *how*. What a
//! module owns is the published result of that decision, one cache cell per row, so a second
//! lookup of the same reference never has to retrace the loader's resolution logic.

use std::fmt::Debug;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crate::error::{LoadError, Result};
use crate::locator::LoaderConfiguration;
use crate::metadata::indices::table_index::TypeDefIndex;
use crate::metadata::root::MetadataRoot;
use crate::metadata::table::{AssemblyRef, AssemblyRefTable, MemberRef, MemberRefTable, ModuleRefTable, TypeDef, TypeDefTable, TypeRefTable};

/// A reference-resolution cell that publishes a pointer to a sibling [`Module`].
///
/// Written once: `set` stores the pointer with `Release` ordering, `get` loads it with
/// `Acquire`, so a reader that observes a non-null pointer also observes everything the writer
/// did before publishing it (the module's own metadata, in particular).
pub(crate) struct ModuleCacheCell<'l>(AtomicPtr<Module<'l>>);

impl<'l> ModuleCacheCell<'l> {
	fn empty() -> Self {
		Self(AtomicPtr::new(std::ptr::null_mut()))
	}

	pub fn get(&self) -> Option<&'l Module<'l>> {
		let ptr = self.0.load(Ordering::Acquire);
		(!ptr.is_null()).then(|| unsafe { &*ptr })
	}

	pub fn set(&self, module: &'l Module<'l>) {
		self.0.store(module as *const _ as *mut _, Ordering::Release);
	}
}

impl Debug for ModuleCacheCell<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "ModuleCacheCell({})", self.get().is_some())
	}
}

/// A reference-resolution cell that publishes `(module, row id)`, the shape a `TypeRef` or
/// `MemberRef` resolves to (a token local to some module, not necessarily this one).
///
/// The row id is written with `Relaxed` ordering *before* the scope pointer is published with
/// `Release`; a reader that sees a non-null scope is therefore guaranteed to see the final row
/// id too, without the cell needing its own lock.
pub(crate) struct TokenCacheCell<'l> {
	scope: AtomicPtr<Module<'l>>,
	row: AtomicU32,
}

impl<'l> TokenCacheCell<'l> {
	fn empty() -> Self {
		Self { scope: AtomicPtr::new(std::ptr::null_mut()), row: AtomicU32::new(0) }
	}

	pub fn get(&self) -> Option<(&'l Module<'l>, u32)> {
		let scope = self.scope.load(Ordering::Acquire);
		if scope.is_null() {
			return None;
		}
		Some((unsafe { &*scope }, self.row.load(Ordering::Relaxed)))
	}

	pub fn set(&self, scope: &'l Module<'l>, row: u32) {
		self.row.store(row, Ordering::Relaxed);
		self.scope.store(scope as *const _ as *mut _, Ordering::Release);
	}
}

impl Debug for TokenCacheCell<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "TokenCacheCell({})", self.get().is_some())
	}
}

/// One loaded PE module: its metadata database, a type-def index sorted by `(namespace, name)`,
/// and the four lock-free reference caches `TypeRef`/`MemberRef` resolution publishes into.
#[derive(Debug)]
pub struct Module<'l> {
	location: String,
	root: MetadataRoot<'l>,
	type_def_index: Vec<(&'l str, &'l str, TypeDefIndex)>,
	pub(crate) assembly_ref_cache: Vec<ModuleCacheCell<'l>>,
	pub(crate) module_ref_cache: Vec<ModuleCacheCell<'l>>,
	pub(crate) type_ref_cache: Vec<TokenCacheCell<'l>>,
	pub(crate) member_ref_cache: Vec<TokenCacheCell<'l>>,
}

impl<'l> Module<'l> {
	pub fn parse(location: impl Into<String>, data: &'l [u8], config: &dyn LoaderConfiguration) -> Result<Self> {
		let root = MetadataRoot::parse(data).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;

		let type_def_index = match root.tables.get_table::<TypeDefTable>() {
			None => Vec::new(),
			Some(table) => {
				let mut index = Vec::with_capacity(table.len());
				for (i, row) in table.rows().iter().enumerate() {
					let token = TypeDefIndex(i as u32 + 1);
					if config.is_filtered_type(token.token()) {
						continue;
					}
					let namespace = root.strings.get(row.type_namespace).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
					let name = root.strings.get(row.type_name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
					index.push((namespace, name, token));
				}
				index.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
				index
			}
		};

		let assembly_ref_len = row_count::<AssemblyRefTable>(&root);
		let module_ref_len = row_count::<ModuleRefTable>(&root);
		let type_ref_len = row_count::<TypeRefTable>(&root);
		let member_ref_len = row_count::<MemberRefTable>(&root);

		Ok(Self {
			location: location.into(),
			root,
			type_def_index,
			assembly_ref_cache: (0..assembly_ref_len).map(|_| ModuleCacheCell::empty()).collect(),
			module_ref_cache: (0..module_ref_len).map(|_| ModuleCacheCell::empty()).collect(),
			type_ref_cache: (0..type_ref_len).map(|_| TokenCacheCell::empty()).collect(),
			member_ref_cache: (0..member_ref_len).map(|_| TokenCacheCell::empty()).collect(),
		})
	}

	pub fn location(&self) -> &str {
		&self.location
	}

	pub fn root(&self) -> &MetadataRoot<'l> {
		&self.root
	}

	/// The assembly-level `AssemblyRef` table, or `&[]` if this module has none (an auxiliary
	/// module: non-manifest modules carry no `AssemblyRef`/`Assembly` rows of their own).
	pub fn assembly_refs(&self) -> &[AssemblyRef] {
		self.root.tables.get_table::<AssemblyRefTable>().map(|t| t.rows()).unwrap_or(&[])
	}

	pub fn member_refs(&self) -> &[MemberRef] {
		self.root.tables.get_table::<MemberRefTable>().map(|t| t.rows()).unwrap_or(&[])
	}

	pub fn type_defs(&self) -> &[TypeDef] {
		self.root.tables.get_table::<TypeDefTable>().map(|t| t.rows()).unwrap_or(&[])
	}

	pub fn type_def(&self, index: TypeDefIndex) -> Option<&TypeDef> {
		self.root.tables.get_table::<TypeDefTable>().and_then(|t| t.get(index.idx()))
	}

	/// Binary search over the `(namespace, name)`-sorted index; `O(log n)` regardless of how the
	/// `TypeDef` table itself happened to be ordered on disk.
	pub fn find_type_def(&self, namespace: &str, name: &str) -> Option<TypeDefIndex> {
		self.type_def_index.binary_search_by(|(ns, n, _)| (*ns, *n).cmp(&(namespace, name))).ok().map(|i| self.type_def_index[i].2)
	}

	/// All type-defs under `namespace`, in name order. An equal-range scan over the same sorted
	/// index `find_type_def` binary-searches.
	pub fn types_in_namespace<'m>(&'m self, namespace: &'m str) -> impl Iterator<Item = TypeDefIndex> + 'm {
		let start = self.type_def_index.partition_point(|(ns, _, _)| *ns < namespace);
		self.type_def_index[start..].iter().take_while(move |(ns, _, _)| *ns == namespace).map(|(_, _, idx)| *idx)
	}

	/// Every distinct namespace this module declares a type in, in sorted order, deduplicated.
	pub fn namespaces(&self) -> impl Iterator<Item = &str> + '_ {
		let mut last: Option<&str> = None;
		self.type_def_index.iter().filter_map(move |(ns, _, _)| match last {
			Some(prev) if prev == *ns => None,
			_ => {
				last = Some(ns);
				Some(*ns)
			}
		})
	}
}

fn row_count<T: crate::metadata::table::Table + 'static>(root: &MetadataRoot) -> usize {
	root.tables.get_table::<T>().map(|t| t.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::locator::DefaultLoaderConfiguration;

	#[test]
	fn module_cache_cell_starts_empty_and_publishes_once_set() {
		let cell = ModuleCacheCell::empty();
		assert!(cell.get().is_none());
	}

	#[test]
	fn token_cache_cell_starts_empty() {
		let cell = TokenCacheCell::empty();
		assert!(cell.get().is_none());
	}

	/// A `#~` table stream with a single nil-flagged `TypeDef` row (empty name/namespace, one
	/// field and one method, no base type), the rest of the header left zeroed.
	fn single_type_def_table_stream() -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&0u32.to_le_bytes()); // reserved_0
		buf.push(1); // major_version
		buf.push(0); // minor_version
		buf.push(0); // heap_sizes
		buf.push(0); // reserved_1
		buf.extend_from_slice(&(1u64 << 0x02).to_le_bytes()); // valid: TypeDef only
		buf.extend_from_slice(&0u64.to_le_bytes()); // sorted
		buf.extend_from_slice(&1u32.to_le_bytes()); // one TypeDef row

		buf.extend_from_slice(&0u32.to_le_bytes()); // flags
		buf.extend_from_slice(&0u16.to_le_bytes()); // type_name
		buf.extend_from_slice(&0u16.to_le_bytes()); // type_namespace
		buf.extend_from_slice(&0u16.to_le_bytes()); // extends (nil coded index)
		buf.extend_from_slice(&1u16.to_le_bytes()); // field_list
		buf.extend_from_slice(&1u16.to_le_bytes()); // method_list
		buf
	}

	/// A minimal `BSJB` metadata root wrapping a single `#~` stream.
	fn metadata_root_bytes() -> Vec<u8> {
		let table_stream = single_type_def_table_stream();

		let mut buf = Vec::new();
		buf.extend_from_slice(b"BSJB");
		buf.extend_from_slice(&1u16.to_le_bytes()); // major_version
		buf.extend_from_slice(&0u16.to_le_bytes()); // minor_version
		buf.extend_from_slice(&0u32.to_le_bytes()); // reserved
		buf.extend_from_slice(&4u32.to_le_bytes()); // version_length
		buf.extend_from_slice(b"v4\0\0");
		buf.extend_from_slice(&0u16.to_le_bytes()); // flags
		buf.extend_from_slice(&1u16.to_le_bytes()); // stream_count

		let stream_offset = buf.len() + 4 + 4 + 4; // past this entry's own offset/size/name fields
		buf.extend_from_slice(&(stream_offset as u32).to_le_bytes());
		buf.extend_from_slice(&(table_stream.len() as u32).to_le_bytes());
		buf.extend_from_slice(b"#~\0\0");

		assert_eq!(buf.len(), stream_offset);
		buf.extend_from_slice(&table_stream);
		buf
	}

	#[test]
	fn parse_indexes_type_defs_by_namespace_and_name() {
		let data = metadata_root_bytes();
		let config = DefaultLoaderConfiguration;
		let module = Module::parse("test.dll", &data, &config).unwrap();

		assert_eq!(module.type_defs().len(), 1);
		assert_eq!(module.namespaces().collect::<Vec<_>>(), vec![""]);

		let found = module.find_type_def("", "").unwrap();
		assert_eq!(found.idx(), 0);
		assert!(module.type_def(found).is_some());

		assert!(module.find_type_def("", "DoesNotExist").is_none());
	}

	#[test]
	fn types_in_namespace_scans_the_sorted_range() {
		let data = metadata_root_bytes();
		let config = DefaultLoaderConfiguration;
		let module = Module::parse("test.dll", &data, &config).unwrap();

		let types: Vec<_> = module.types_in_namespace("").collect();
		assert_eq!(types.len(), 1);
		assert!(module.types_in_namespace("NoSuchNamespace").next().is_none());
	}
}
