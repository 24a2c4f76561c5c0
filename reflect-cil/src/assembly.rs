//! An assembly: one manifest module plus whatever auxiliary (non-manifest) modules its `File`
//! table names. Both the module list and the assembly's own name are realized lazily, on first
//! demand, since the common case - a single-module assembly queried for a handful of types -
//! never needs either.

use std::sync::OnceLock;

use crate::error::{LoadError, Result};
use crate::loader::Loader;
use crate::metadata::table::{AssemblyRef, AssemblyTable, FileAttributes, FileTable};

/// An assembly's identity, as read from its `Assembly` table row (or, for an `AssemblyRef`,
/// the row describing how another module refers to it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyName {
	pub name: String,
	pub culture: String,
	pub major_version: u16,
	pub minor_version: u16,
	pub build_number: u16,
	pub revision_number: u16,
	pub public_key_or_token: Vec<u8>,
}

impl AssemblyName {
	pub(crate) fn from_assembly_row(row: &crate::metadata::table::Assembly, root: &crate::metadata::root::MetadataRoot) -> std::io::Result<Self> {
		Ok(Self {
			name: root.strings.get(row.name)?.to_owned(),
			culture: root.strings.get(row.culture)?.to_owned(),
			major_version: row.major_version,
			minor_version: row.minor_version,
			build_number: row.build_number,
			revision_number: row.revision_number,
			public_key_or_token: root.blobs.get(row.public_key)?.to_owned(),
		})
	}

	pub(crate) fn from_assembly_ref_row(row: &AssemblyRef, root: &crate::metadata::root::MetadataRoot) -> std::io::Result<Self> {
		Ok(Self {
			name: root.strings.get(row.name)?.to_owned(),
			culture: root.strings.get(row.culture)?.to_owned(),
			major_version: row.major_version,
			minor_version: row.minor_version,
			build_number: row.build_number,
			revision_number: row.revision_number,
			public_key_or_token: root.blobs.get(row.public_key_or_token)?.to_owned(),
		})
	}
}

#[derive(Debug)]
pub struct Assembly<'l> {
	manifest_module: &'l crate::module::Module<'l>,
	name: OnceLock<AssemblyName>,
	modules: OnceLock<Vec<&'l crate::module::Module<'l>>>,
}

impl<'l> Assembly<'l> {
	pub(crate) fn new(manifest_module: &'l crate::module::Module<'l>) -> Self {
		Self { manifest_module, name: OnceLock::new(), modules: OnceLock::new() }
	}

	pub fn manifest_module(&self) -> &'l crate::module::Module<'l> {
		self.manifest_module
	}

	/// Zero `AssemblyRef` rows is the defining property of the one system assembly in a loaded
	/// universe (§4.6): every other assembly references it, directly or transitively, and it
	/// references nothing back.
	pub fn is_system_assembly(&self) -> bool {
		self.manifest_module.assembly_refs().is_empty()
	}

	pub fn name(&self) -> Result<&AssemblyName> {
		if let Some(name) = self.name.get() {
			return Ok(name);
		}
		let table = self.manifest_module.root().tables.get_table::<AssemblyTable>();
		let row = table.and_then(|t| t.get(0)).ok_or_else(|| LoadError::invalid_metadata("module has no Assembly row"))?;
		let name = AssemblyName::from_assembly_row(row, self.manifest_module.root()).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
		Ok(self.name.get_or_init(|| name))
	}

	/// The manifest module plus every auxiliary module named by a `File` row that actually
	/// carries metadata (`CONTAINS_NO_METADATA` rows are resources, not modules, and are
	/// skipped). Realized once, via the loader, then cached for the assembly's lifetime.
	pub fn modules(&self, loader: &Loader<'l>) -> Result<&[&'l crate::module::Module<'l>]> {
		if let Some(modules) = self.modules.get() {
			return Ok(modules);
		}

		let mut modules = vec![self.manifest_module];
		if let Some(files) = self.manifest_module.root().tables.get_table::<FileTable>() {
			for file in files.rows() {
				if file.flags.contains(FileAttributes::CONTAINS_NO_METADATA) {
					continue;
				}
				let file_name = self.manifest_module.root().strings.get(file.name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
				let module = loader.load_sibling_module(self.manifest_module.location(), file_name)?;
				modules.push(module);
			}
		}

		Ok(self.modules.get_or_init(|| modules))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::locator::DefaultLoaderConfiguration;
	use crate::module::Module;

	/// A `BSJB` metadata root with an empty `#~` stream (no tables at all).
	fn empty_metadata_root_bytes() -> Vec<u8> {
		let mut table_stream = Vec::new();
		table_stream.extend_from_slice(&0u32.to_le_bytes()); // reserved_0
		table_stream.push(1); // major_version
		table_stream.push(0); // minor_version
		table_stream.push(0); // heap_sizes
		table_stream.push(0); // reserved_1
		table_stream.extend_from_slice(&0u64.to_le_bytes()); // valid
		table_stream.extend_from_slice(&0u64.to_le_bytes()); // sorted

		let mut buf = Vec::new();
		buf.extend_from_slice(b"BSJB");
		buf.extend_from_slice(&1u16.to_le_bytes());
		buf.extend_from_slice(&0u16.to_le_bytes());
		buf.extend_from_slice(&0u32.to_le_bytes());
		buf.extend_from_slice(&4u32.to_le_bytes());
		buf.extend_from_slice(b"v4\0\0");
		buf.extend_from_slice(&0u16.to_le_bytes());
		buf.extend_from_slice(&1u16.to_le_bytes());

		let stream_offset = buf.len() + 4 + 4 + 4;
		buf.extend_from_slice(&(stream_offset as u32).to_le_bytes());
		buf.extend_from_slice(&(table_stream.len() as u32).to_le_bytes());
		buf.extend_from_slice(b"#~\0\0");
		buf.extend_from_slice(&table_stream);
		buf
	}

	#[test]
	fn an_assembly_with_no_assembly_refs_is_the_system_assembly() {
		let data = empty_metadata_root_bytes();
		let config = DefaultLoaderConfiguration;
		let module = Module::parse("mscorlib.dll", &data, &config).unwrap();
		let assembly = Assembly::new(&module);
		assert!(assembly.is_system_assembly());
	}

	#[test]
	fn name_fails_cleanly_when_the_module_has_no_assembly_row() {
		let data = empty_metadata_root_bytes();
		let config = DefaultLoaderConfiguration;
		let module = Module::parse("mscorlib.dll", &data, &config).unwrap();
		let assembly = Assembly::new(&module);
		assert!(assembly.name().is_err());
	}
}
