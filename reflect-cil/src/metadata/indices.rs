//! Row indices, coded indices and metadata tokens: the integer vocabulary the `#~` stream's
//! tables are built from (ECMA-335 §II.22, §II.24.2.6).

use crate::metadata::table::TableKind;
use crate::utilities::FromByteStream;

pub mod sizes {
	use super::{coded, TableKind};

	/// Byte widths for every heap index, coded index and table-row index in a module, derived
	/// once from the `#~` stream header and the per-table row counts. Every `FromByteStream`
	/// impl on the metadata side takes a `&IndexSizes`, even types that never consult it - this
	/// keeps the derived table-row reader uniform.
	#[derive(Debug, Clone)]
	pub struct IndexSizes {
		pub string: usize,
		pub guid: usize,
		pub blob: usize,
		pub tables: [usize; 64],
		pub coded: [usize; 14],
	}

	pub trait SizeOf<T> {
		fn size_of(&self) -> usize;
	}

	impl IndexSizes {
		/// Placeholder used by reads that don't actually depend on any index width (plain
		/// integers, fixed byte arrays, the compressed-integer reader).
		pub const ZERO: IndexSizes = IndexSizes {
			string: 2,
			guid: 2,
			blob: 2,
			tables: [2; 64],
			coded: [2; 14],
		};

		pub fn new(heap_sizes: u8, table_lens: &[u32; 64]) -> Self {
			let string = if heap_sizes & 0x01 != 0 { 4 } else { 2 };
			let guid = if heap_sizes & 0x02 != 0 { 4 } else { 2 };
			let blob = if heap_sizes & 0x04 != 0 { 4 } else { 2 };

			let mut tables = [2usize; 64];
			for (size, len) in tables.iter_mut().zip(table_lens.iter()) {
				*size = if *len > 0xFFFF { 4 } else { 2 };
			}

			let mut coded = [2usize; 14];
			for (size, kind) in coded.iter_mut().zip(coded::CodedIndexKind::ALL.iter()) {
				*size = kind.width(&tables);
			}

			Self { string, guid, blob, tables, coded }
		}
	}
}

use sizes::IndexSizes;

/// The high byte of every on-disk `MetadataToken` identifies the table a row belongs to; the
/// low three bytes are its one-based row id (a zero row id stands for "no row").
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataToken(pub u32);

impl MetadataToken {
	pub fn new(kind: TableKind, rid: u32) -> Self {
		Self(((kind as u32) << 24) | (rid & 0x00FF_FFFF))
	}

	pub fn kind(&self) -> Option<TableKind> {
		TableKind::from_repr((self.0 >> 24) as usize)
	}

	pub fn rid(&self) -> u32 {
		self.0 & 0x00FF_FFFF
	}

	/// Zero-based row index, or `None` for a nil token.
	pub fn index(&self) -> Option<usize> {
		match self.rid() {
			0 => None,
			rid => Some(rid as usize - 1),
		}
	}
}

impl std::fmt::Debug for MetadataToken {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self.kind() {
			Some(kind) => write!(f, "MetadataToken({kind:?}, {})", self.rid()),
			None => write!(f, "MetadataToken(0x{:08X})", self.0),
		}
	}
}

impl FromByteStream for MetadataToken {
	fn read(stream: &mut std::io::Cursor<&[u8]>, sizes: &IndexSizes) -> std::io::Result<Self> {
		Ok(Self(u32::read(stream, sizes)?))
	}
}

#[cfg(test)]
mod token_tests {
	use super::*;

	#[test]
	fn new_packs_kind_into_the_high_byte() {
		let token = MetadataToken::new(TableKind::TypeDef, 0x2A);
		assert_eq!(token.kind(), Some(TableKind::TypeDef));
		assert_eq!(token.rid(), 0x2A);
	}

	#[test]
	fn nil_rid_has_no_zero_based_index() {
		let token = MetadataToken::new(TableKind::TypeDef, 0);
		assert_eq!(token.index(), None);
	}

	#[test]
	fn one_based_rid_becomes_zero_based_index() {
		let token = MetadataToken::new(TableKind::TypeDef, 1);
		assert_eq!(token.index(), Some(0));
	}

	#[test]
	fn unrecognised_table_byte_yields_no_kind() {
		let token = MetadataToken(0xFF00_0001);
		assert_eq!(token.kind(), None);
	}
}

/// Declares a zero-based row-index newtype for a single fixed table, used by table-row columns
/// that always point into one specific table (`TypeDef.field_list`, `Event.event_type`'s owner
/// row, and so on).
macro_rules! define_table_index {
	($($(#[$meta:meta])* $name:ident => $kind:ident),* $(,)?) => {$(
		$(#[$meta])*
		#[repr(transparent)]
		#[derive(Clone, Copy, PartialEq, Eq, Hash)]
		pub struct $name(pub u32);

		impl $name {
			/// Zero-based offset into the owning table. Row ids on disk are one-based; a
			/// range-marker column reading past the end of its table legitimately holds
			/// `rows.len() + 1`, so this never needs to fail, only saturate at 0.
			pub fn idx(&self) -> usize {
				self.0.saturating_sub(1) as usize
			}

			pub fn token(&self) -> MetadataToken {
				MetadataToken::new(TableKind::$kind, self.0)
			}
		}

		impl std::fmt::Debug for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}

		impl FromByteStream for $name {
			fn read(stream: &mut std::io::Cursor<&[u8]>, sizes: &IndexSizes) -> std::io::Result<Self> {
				match sizes.tables[TableKind::$kind as usize] {
					2 => Ok(Self(u16::read(stream, sizes)? as u32)),
					_ => Ok(Self(u32::read(stream, sizes)?)),
				}
			}
		}
	)*};
}

pub mod table_index {
	use super::*;

	define_table_index! {
		TypeDefIndex => TypeDef,
		FieldIndex => Field,
		MethodDefIndex => MethodDef,
		ParamIndex => Param,
		EventIndex => Event,
		PropertyIndex => Property,
		ModuleRefIndex => ModuleRef,
		GenericParamIndex => GenericParam,
		AssemblyRefIndex => AssemblyRef,
	}

	#[cfg(test)]
	mod tests {
		use super::*;

		#[test]
		fn one_based_rid_becomes_zero_based_idx() {
			assert_eq!(TypeDefIndex(1).idx(), 0);
			assert_eq!(TypeDefIndex(5).idx(), 4);
		}

		#[test]
		fn nil_rid_saturates_instead_of_underflowing() {
			assert_eq!(TypeDefIndex(0).idx(), 0);
		}

		#[test]
		fn token_carries_the_fixed_table_kind() {
			assert_eq!(MethodDefIndex(3).token(), MetadataToken::new(TableKind::MethodDef, 3));
		}
	}
}

/// Declares a coded-index newtype: a table-row reference that packs a small "tag" selecting one
/// of several possible tables into the low bits of the value, the row id into the rest
/// (ECMA-335 §II.24.2.6). `$bits` is the tag width in bits; `$tag => $variant` pairs give the
/// tag value for each reachable table (sequential `0, 1, 2, ...` for every coded index except
/// `CustomAttributeType`, which reuses tags `2` and `3` from a wider historical tag space).
macro_rules! define_coded_index {
	($name:ident, $bits:expr, [$($tag:expr => $variant:ident),* $(,)?]) => {
		#[repr(transparent)]
		#[derive(Clone, Copy, PartialEq, Eq, Hash)]
		pub struct $name(pub u32);

		impl $name {
			const BITS: u32 = $bits;
			const MASK: u32 = (1 << $bits) - 1;
			const TAGS: &'static [(u32, TableKind)] = &[$(($tag, TableKind::$variant)),*];

			pub fn is_valid(value: u32) -> bool {
				let tag = value & Self::MASK;
				Self::TAGS.iter().any(|(t, _)| *t == tag)
			}

			pub fn table_kind(&self) -> Option<TableKind> {
				let tag = self.0 & Self::MASK;
				Self::TAGS.iter().find(|(t, _)| *t == tag).map(|(_, k)| *k)
			}

			pub fn token(&self) -> Option<MetadataToken> {
				let rid = self.0 >> Self::BITS;
				self.table_kind().map(|kind| MetadataToken::new(kind, rid))
			}

			fn width(table_lens: &[usize; 64]) -> usize {
				let max_len = Self::TAGS.iter().map(|(_, k)| table_lens[*k as usize]).max().unwrap_or(0);
				if max_len < (1usize << (16 - Self::BITS)) { 2 } else { 4 }
			}
		}

		impl std::fmt::Debug for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
				match self.token() {
					Some(token) => write!(f, "{}({:?})", stringify!($name), token),
					None => write!(f, "{}(invalid, 0x{:08X})", stringify!($name), self.0),
				}
			}
		}

		impl FromByteStream for $name {
			fn read(stream: &mut std::io::Cursor<&[u8]>, sizes: &IndexSizes) -> std::io::Result<Self> {
				let raw = match sizes.coded[coded::CodedIndexKind::$name as usize] {
					2 => u16::read(stream, sizes)? as u32,
					_ => u32::read(stream, sizes)?,
				};
				if !Self::is_valid(raw) {
					return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid coded index tag"));
				}
				Ok(Self(raw))
			}
		}
	};
}

pub mod coded {
	use super::*;

	/// Identifies one of the fourteen coded-index shapes ECMA-335 defines, in the fixed order
	/// `IndexSizes::coded` stores their byte widths.
	#[repr(usize)]
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub enum CodedIndexKind {
		TypeDefOrRef = 0,
		HasConstant = 1,
		HasCustomAttribute = 2,
		HasFieldMarshal = 3,
		HasDeclSecurity = 4,
		MemberRefParent = 5,
		HasSemantics = 6,
		MethodDefOrRef = 7,
		MemberForwarded = 8,
		Implementation = 9,
		CustomAttributeType = 10,
		ResolutionScope = 11,
		TypeOrMethodDef = 12,
		HasCustomDebugInformation = 13,
	}

	impl CodedIndexKind {
		pub const ALL: [CodedIndexKind; 14] = [
			CodedIndexKind::TypeDefOrRef,
			CodedIndexKind::HasConstant,
			CodedIndexKind::HasCustomAttribute,
			CodedIndexKind::HasFieldMarshal,
			CodedIndexKind::HasDeclSecurity,
			CodedIndexKind::MemberRefParent,
			CodedIndexKind::HasSemantics,
			CodedIndexKind::MethodDefOrRef,
			CodedIndexKind::MemberForwarded,
			CodedIndexKind::Implementation,
			CodedIndexKind::CustomAttributeType,
			CodedIndexKind::ResolutionScope,
			CodedIndexKind::TypeOrMethodDef,
			CodedIndexKind::HasCustomDebugInformation,
		];

		pub fn width(&self, table_lens: &[usize; 64]) -> usize {
			match self {
				CodedIndexKind::TypeDefOrRef => TypeDefOrRef::width(table_lens),
				CodedIndexKind::HasConstant => HasConstant::width(table_lens),
				CodedIndexKind::HasCustomAttribute => HasCustomAttribute::width(table_lens),
				CodedIndexKind::HasFieldMarshal => HasFieldMarshal::width(table_lens),
				CodedIndexKind::HasDeclSecurity => HasDeclSecurity::width(table_lens),
				CodedIndexKind::MemberRefParent => MemberRefParent::width(table_lens),
				CodedIndexKind::HasSemantics => HasSemantics::width(table_lens),
				CodedIndexKind::MethodDefOrRef => MethodDefOrRef::width(table_lens),
				CodedIndexKind::MemberForwarded => MemberForwarded::width(table_lens),
				CodedIndexKind::Implementation => Implementation::width(table_lens),
				CodedIndexKind::CustomAttributeType => CustomAttributeType::width(table_lens),
				CodedIndexKind::ResolutionScope => ResolutionScope::width(table_lens),
				CodedIndexKind::TypeOrMethodDef => TypeOrMethodDef::width(table_lens),
				CodedIndexKind::HasCustomDebugInformation => HasCustomDebugInformation::width(table_lens),
			}
		}
	}

	define_coded_index!(TypeDefOrRef, 2, [0 => TypeDef, 1 => TypeRef, 2 => TypeSpec]);

	define_coded_index!(HasConstant, 2, [0 => Field, 1 => Param, 2 => Property]);

	define_coded_index!(HasCustomAttribute, 5, [
		0 => MethodDef, 1 => Field, 2 => TypeRef, 3 => TypeDef, 4 => Param, 5 => InterfaceImpl,
		6 => MemberRef, 7 => Module, 8 => DeclSecurity, 9 => Property, 10 => Event,
		11 => StandAloneSig, 12 => ModuleRef, 13 => TypeSpec, 14 => Assembly, 15 => AssemblyRef,
		16 => File, 17 => ExportedType, 18 => ManifestResource, 19 => GenericParam,
		20 => GenericParamConstraint, 21 => MethodSpec,
	]);

	define_coded_index!(HasFieldMarshal, 1, [0 => Field, 1 => Param]);

	define_coded_index!(HasDeclSecurity, 2, [0 => TypeDef, 1 => MethodDef, 2 => Assembly]);

	define_coded_index!(MemberRefParent, 3, [
		0 => TypeDef, 1 => TypeRef, 2 => ModuleRef, 3 => MethodDef, 4 => TypeSpec,
	]);

	define_coded_index!(HasSemantics, 1, [0 => Event, 1 => Property]);

	define_coded_index!(MethodDefOrRef, 1, [0 => MethodDef, 1 => MemberRef]);

	define_coded_index!(MemberForwarded, 1, [0 => Field, 1 => MethodDef]);

	define_coded_index!(Implementation, 2, [0 => File, 1 => AssemblyRef, 2 => ExportedType]);

	// ECMA-335 reserves a 3-bit tag here even though only two tables are reachable; the extra
	// bit is historical and the discriminants 2/3 do not start at 0.
	define_coded_index!(CustomAttributeType, 3, [2 => MethodDef, 3 => MemberRef]);

	define_coded_index!(ResolutionScope, 2, [0 => Module, 1 => ModuleRef, 2 => AssemblyRef, 3 => TypeRef]);

	define_coded_index!(TypeOrMethodDef, 1, [0 => TypeDef, 1 => MethodDef]);

	define_coded_index!(HasCustomDebugInformation, 5, [
		0 => MethodDef, 1 => Field, 2 => TypeRef, 3 => TypeDef, 4 => Param, 5 => InterfaceImpl,
		6 => MemberRef, 7 => Module, 8 => DeclSecurity, 9 => Property, 10 => Event,
		11 => StandAloneSig, 12 => ModuleRef, 13 => TypeSpec, 14 => Assembly, 15 => AssemblyRef,
		16 => File, 17 => ExportedType, 18 => ManifestResource, 19 => GenericParam,
		20 => GenericParamConstraint, 21 => MethodSpec, 22 => Document, 23 => LocalScope,
		24 => LocalVariable, 25 => LocalConstant, 26 => ImportScope,
	]);

	#[cfg(test)]
	mod tests {
		use super::*;

		#[test]
		fn type_def_or_ref_tag_and_rid_round_trip() {
			// tag 1 => TypeRef, rid 7, packed into the low 2 bits per ECMA-335 §II.24.2.6
			let coded = TypeDefOrRef((7 << 2) | 1);
			assert_eq!(coded.table_kind(), Some(TableKind::TypeRef));
			assert_eq!(coded.token(), Some(MetadataToken::new(TableKind::TypeRef, 7)));
		}

		#[test]
		fn type_def_or_ref_rejects_unused_tag() {
			assert!(!TypeDefOrRef::is_valid(3));
			assert!(TypeDefOrRef::is_valid(0));
			assert!(TypeDefOrRef::is_valid(1));
			assert!(TypeDefOrRef::is_valid(2));
		}

		#[test]
		fn custom_attribute_type_tags_do_not_start_at_zero() {
			assert!(!CustomAttributeType::is_valid(0));
			assert!(!CustomAttributeType::is_valid(1));
			let coded = CustomAttributeType((5 << 3) | 2);
			assert_eq!(coded.table_kind(), Some(TableKind::MethodDef));
		}

		#[test]
		fn coded_index_width_grows_with_table_size() {
			let mut small = [0usize; 64];
			small[TableKind::TypeDef as usize] = 10;
			small[TableKind::TypeRef as usize] = 10;
			small[TableKind::TypeSpec as usize] = 10;
			assert_eq!(TypeDefOrRef::width(&small), 2);

			let mut large = small;
			large[TableKind::TypeRef as usize] = 1 << 20;
			assert_eq!(TypeDefOrRef::width(&large), 4);
		}
	}
}
