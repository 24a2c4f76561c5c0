//! The `#~` (or `#-`) table stream: row layouts for every ECMA-335 metadata table (§II.22) plus
//! the flag enumerations (`*Attributes`) their columns carry.

use std::any::TypeId;
use std::fmt::Debug;
use std::io::{Cursor, Error, ErrorKind};
use std::sync::Arc;

use bitflags::bitflags;
use reflect_cil_derive::{FromRepr, Table};

use crate::metadata::indices::coded::*;
use crate::metadata::indices::sizes::IndexSizes;
use crate::metadata::indices::table_index::*;
use crate::metadata::heaps::{BlobIndex, GuidIndex, StringIndex};
use crate::utilities::{enumerate_set_bits, impl_from_byte_stream, FromByteStream};

/// Identifies one of the metadata tables by its fixed ECMA-335 table id. Ids `0x30`-`0x37` are
/// the portable-PDB debug tables; this crate recognises them so an unexpected `valid` bit
/// produces a clean error instead of an unknown-table one, but does not model their rows -
/// ordinary CLI metadata blobs never set them.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum TableKind {
	Module = 0x00,
	TypeRef = 0x01,
	TypeDef = 0x02,
	FieldPtr = 0x03,
	Field = 0x04,
	MethodPtr = 0x05,
	MethodDef = 0x06,
	ParamPtr = 0x07,
	Param = 0x08,
	InterfaceImpl = 0x09,
	MemberRef = 0x0A,
	Constant = 0x0B,
	CustomAttribute = 0x0C,
	FieldMarshal = 0x0D,
	DeclSecurity = 0x0E,
	ClassLayout = 0x0F,
	FieldLayout = 0x10,
	StandAloneSig = 0x11,
	EventMap = 0x12,
	EventPtr = 0x13,
	Event = 0x14,
	PropertyMap = 0x15,
	PropertyPtr = 0x16,
	Property = 0x17,
	MethodSemantics = 0x18,
	MethodImpl = 0x19,
	ModuleRef = 0x1A,
	TypeSpec = 0x1B,
	ImplMap = 0x1C,
	FieldRVA = 0x1D,
	EncLog = 0x1E,
	EncMap = 0x1F,
	Assembly = 0x20,
	AssemblyProcessor = 0x21,
	AssemblyOS = 0x22,
	AssemblyRef = 0x23,
	AssemblyRefProcessor = 0x24,
	AssemblyRefOS = 0x25,
	File = 0x26,
	ExportedType = 0x27,
	ManifestResource = 0x28,
	NestedClass = 0x29,
	GenericParam = 0x2A,
	MethodSpec = 0x2B,
	GenericParamConstraint = 0x2C,
	Document = 0x30,
	MethodDebugInformation = 0x31,
	LocalScope = 0x32,
	LocalVariable = 0x33,
	LocalConstant = 0x34,
	ImportScope = 0x35,
	StateMachineMethod = 0x36,
	CustomDebugInformation = 0x37,
}

impl TableKind {
	fn is_portable_pdb(self) -> bool {
		matches!(
			self,
			TableKind::Document
				| TableKind::MethodDebugInformation
				| TableKind::LocalScope
				| TableKind::LocalVariable
				| TableKind::LocalConstant
				| TableKind::ImportScope
				| TableKind::StateMachineMethod
				| TableKind::CustomDebugInformation
		)
	}
}

pub trait Table: 'static + Debug + Send + Sync {
	fn len(&self) -> usize;
	fn kind(&self) -> TableKind;
	fn type_id(&self) -> TypeId {
		TypeId::of::<Self>()
	}
}

/// The parsed `#~` stream: every present table, indexed by the `valid` bitmap at load time and
/// retrieved later by concrete row type.
#[derive(Debug)]
pub struct TableHeap {
	major_version: u8,
	minor_version: u8,
	tables: Vec<Arc<dyn Table>>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct Header {
	reserved_0: u32,
	major_version: u8,
	minor_version: u8,
	heap_sizes: u8,
	reserved_1: u8,
	valid: u64,
	sorted: u64,
}

impl_from_byte_stream!(Header);

impl TableHeap {
	pub fn major_version(&self) -> u8 {
		self.major_version
	}

	pub fn minor_version(&self) -> u8 {
		self.minor_version
	}

	pub fn get_table<T: Table + 'static>(&self) -> Option<&T> {
		let id = TypeId::of::<T>();
		self.tables.iter().find(|t| t.type_id() == id).map(|t| unsafe { &*(Arc::as_ptr(t) as *const dyn Table as *const T) })
	}

	pub fn read(data: &[u8]) -> std::io::Result<Self> {
		let mut stream = Cursor::new(data);
		let header = Header::read(&mut stream, &IndexSizes::ZERO)?;

		let mut table_lens = [0u32; 64];
		for i in enumerate_set_bits(header.valid) {
			table_lens[i] = u32::read(&mut stream, &IndexSizes::ZERO)?;
		}

		let sizes = IndexSizes::new(header.heap_sizes, &table_lens);
		let mut tables: Vec<Arc<dyn Table>> = Vec::new();

		for i in enumerate_set_bits(header.valid) {
			let len = table_lens[i] as usize;
			let kind = TableKind::from_repr(i).ok_or_else(|| Error::new(ErrorKind::InvalidData, "unrecognised metadata table id"))?;
			if kind.is_portable_pdb() {
				return Err(Error::new(ErrorKind::InvalidData, "portable PDB debug tables are not readable from an ordinary CLI metadata stream"));
			}
			let table: Arc<dyn Table> = match kind {
				TableKind::Module => Arc::new(ModuleTable::read(&mut stream, &sizes, len)?),
				TableKind::TypeRef => Arc::new(TypeRefTable::read(&mut stream, &sizes, len)?),
				TableKind::TypeDef => Arc::new(TypeDefTable::read(&mut stream, &sizes, len)?),
				TableKind::FieldPtr => Arc::new(FieldPtrTable::read(&mut stream, &sizes, len)?),
				TableKind::Field => Arc::new(FieldTable::read(&mut stream, &sizes, len)?),
				TableKind::MethodPtr => Arc::new(MethodPtrTable::read(&mut stream, &sizes, len)?),
				TableKind::MethodDef => Arc::new(MethodDefTable::read(&mut stream, &sizes, len)?),
				TableKind::ParamPtr => Arc::new(ParamPtrTable::read(&mut stream, &sizes, len)?),
				TableKind::Param => Arc::new(ParamTable::read(&mut stream, &sizes, len)?),
				TableKind::InterfaceImpl => Arc::new(InterfaceImplTable::read(&mut stream, &sizes, len)?),
				TableKind::MemberRef => Arc::new(MemberRefTable::read(&mut stream, &sizes, len)?),
				TableKind::Constant => Arc::new(ConstantTable::read(&mut stream, &sizes, len)?),
				TableKind::CustomAttribute => Arc::new(CustomAttributeTable::read(&mut stream, &sizes, len)?),
				TableKind::FieldMarshal => Arc::new(FieldMarshalTable::read(&mut stream, &sizes, len)?),
				TableKind::DeclSecurity => Arc::new(DeclSecurityTable::read(&mut stream, &sizes, len)?),
				TableKind::ClassLayout => Arc::new(ClassLayoutTable::read(&mut stream, &sizes, len)?),
				TableKind::FieldLayout => Arc::new(FieldLayoutTable::read(&mut stream, &sizes, len)?),
				TableKind::StandAloneSig => Arc::new(StandAloneSigTable::read(&mut stream, &sizes, len)?),
				TableKind::EventMap => Arc::new(EventMapTable::read(&mut stream, &sizes, len)?),
				TableKind::EventPtr => Arc::new(EventPtrTable::read(&mut stream, &sizes, len)?),
				TableKind::Event => Arc::new(EventTable::read(&mut stream, &sizes, len)?),
				TableKind::PropertyMap => Arc::new(PropertyMapTable::read(&mut stream, &sizes, len)?),
				TableKind::PropertyPtr => Arc::new(PropertyPtrTable::read(&mut stream, &sizes, len)?),
				TableKind::Property => Arc::new(PropertyTable::read(&mut stream, &sizes, len)?),
				TableKind::MethodSemantics => Arc::new(MethodSemanticsTable::read(&mut stream, &sizes, len)?),
				TableKind::MethodImpl => Arc::new(MethodImplTable::read(&mut stream, &sizes, len)?),
				TableKind::ModuleRef => Arc::new(ModuleRefTable::read(&mut stream, &sizes, len)?),
				TableKind::TypeSpec => Arc::new(TypeSpecTable::read(&mut stream, &sizes, len)?),
				TableKind::ImplMap => Arc::new(ImplMapTable::read(&mut stream, &sizes, len)?),
				TableKind::FieldRVA => Arc::new(FieldRVATable::read(&mut stream, &sizes, len)?),
				TableKind::EncLog => Arc::new(EncLogTable::read(&mut stream, &sizes, len)?),
				TableKind::EncMap => Arc::new(EncMapTable::read(&mut stream, &sizes, len)?),
				TableKind::Assembly => Arc::new(AssemblyTable::read(&mut stream, &sizes, len)?),
				TableKind::AssemblyProcessor => Arc::new(AssemblyProcessorTable::read(&mut stream, &sizes, len)?),
				TableKind::AssemblyOS => Arc::new(AssemblyOSTable::read(&mut stream, &sizes, len)?),
				TableKind::AssemblyRef => Arc::new(AssemblyRefTable::read(&mut stream, &sizes, len)?),
				TableKind::AssemblyRefProcessor => Arc::new(AssemblyRefProcessorTable::read(&mut stream, &sizes, len)?),
				TableKind::AssemblyRefOS => Arc::new(AssemblyRefOSTable::read(&mut stream, &sizes, len)?),
				TableKind::File => Arc::new(FileTable::read(&mut stream, &sizes, len)?),
				TableKind::ExportedType => Arc::new(ExportedTypeTable::read(&mut stream, &sizes, len)?),
				TableKind::ManifestResource => Arc::new(ManifestResourceTable::read(&mut stream, &sizes, len)?),
				TableKind::NestedClass => Arc::new(NestedClassTable::read(&mut stream, &sizes, len)?),
				TableKind::GenericParam => Arc::new(GenericParamTable::read(&mut stream, &sizes, len)?),
				TableKind::MethodSpec => Arc::new(MethodSpecTable::read(&mut stream, &sizes, len)?),
				TableKind::GenericParamConstraint => Arc::new(GenericParamConstraintTable::read(&mut stream, &sizes, len)?),
				_ => unreachable!("portable PDB tables are rejected above"),
			};
			tables.push(table);
		}

		Ok(Self { major_version: header.major_version, minor_version: header.minor_version, tables })
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct TypeAttributes: u32 {
		const VISIBILITY_MASK = 0x0000_0007;
		const PUBLIC = 0x0000_0001;
		const NESTED_PUBLIC = 0x0000_0002;
		const NESTED_PRIVATE = 0x0000_0003;
		const NESTED_FAMILY = 0x0000_0004;
		const NESTED_ASSEMBLY = 0x0000_0005;
		const NESTED_FAM_AND_ASSEM = 0x0000_0006;
		const NESTED_FAM_OR_ASSEM = 0x0000_0007;
		const LAYOUT_MASK = 0x0000_0018;
		const SEQUENTIAL_LAYOUT = 0x0000_0008;
		const EXPLICIT_LAYOUT = 0x0000_0010;
		const INTERFACE = 0x0000_0020;
		const ABSTRACT = 0x0000_0080;
		const SEALED = 0x0000_0100;
		const SPECIAL_NAME = 0x0000_0400;
		const RT_SPECIAL_NAME = 0x0000_0800;
		const IMPORT = 0x0000_1000;
		const SERIALIZABLE = 0x0000_2000;
		const WINDOWS_RUNTIME = 0x0000_4000;
		const STRING_FORMAT_MASK = 0x0003_0000;
		const UNICODE_CLASS = 0x0001_0000;
		const AUTO_CLASS = 0x0002_0000;
		const CUSTOM_FORMAT_CLASS = 0x0003_0000;
		const HAS_SECURITY = 0x0004_0000;
		const IS_TYPE_FORWARDER = 0x0020_0000;
		const BEFORE_FIELD_INIT = 0x0010_0000;
		const CUSTOM_STRING_FORMAT_MASK = 0x00C0_0000;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct FieldAttributes: u16 {
		const FIELD_ACCESS_MASK = 0x0007;
		const PRIVATE = 0x0001;
		const FAM_AND_ASSEM = 0x0002;
		const ASSEMBLY = 0x0003;
		const FAMILY = 0x0004;
		const FAM_OR_ASSEM = 0x0005;
		const PUBLIC = 0x0006;
		const STATIC = 0x0010;
		const INIT_ONLY = 0x0020;
		const LITERAL = 0x0040;
		const NOT_SERIALIZED = 0x0080;
		const SPECIAL_NAME = 0x0200;
		const PINVOKE_IMPL = 0x2000;
		const RT_SPECIAL_NAME = 0x0400;
		const HAS_FIELD_MARSHAL = 0x1000;
		const HAS_DEFAULT = 0x8000;
		const HAS_FIELD_RVA = 0x0100;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct MethodAttributes: u16 {
		const MEMBER_ACCESS_MASK = 0x0007;
		const PRIVATE = 0x0001;
		const FAM_AND_ASSEM = 0x0002;
		const ASSEM = 0x0003;
		const FAMILY = 0x0004;
		const FAM_OR_ASSEM = 0x0005;
		const PUBLIC = 0x0006;
		const STATIC = 0x0010;
		const FINAL = 0x0020;
		const VIRTUAL = 0x0040;
		const HIDE_BY_SIG = 0x0080;
		const VTABLE_LAYOUT_MASK = 0x0100;
		const NEW_SLOT = 0x0100;
		const STRICT = 0x0200;
		const ABSTRACT = 0x0400;
		const SPECIAL_NAME = 0x0800;
		const UNMANAGED_EXPORT = 0x0008;
		const PINVOKE_IMPL = 0x2000;
		const RT_SPECIAL_NAME = 0x1000;
		const HAS_SECURITY = 0x4000;
		const REQUIRE_SEC_OBJECT = 0x8000;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct MethodImplAttributes: u16 {
		const CODE_TYPE_MASK = 0x0003;
		const NATIVE = 0x0001;
		const OPTIL = 0x0002;
		const RUNTIME = 0x0003;
		const MANAGED_MASK = 0x0004;
		const UNMANAGED = 0x0004;
		const FORWARD_REF = 0x0010;
		const PRESERVE_SIG = 0x0080;
		const INTERNAL_CALL = 0x1000;
		const SYNCHRONIZED = 0x0020;
		const NO_INLINING = 0x0008;
		const NO_OPTIMIZATION = 0x0040;
		const AGGRESSIVE_INLINING = 0x0100;
		const AGGRESSIVE_OPTIMIZATION = 0x0200;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct ParamAttributes: u16 {
		const IN = 0x0001;
		const OUT = 0x0002;
		const OPTIONAL = 0x0010;
		const HAS_DEFAULT = 0x1000;
		const HAS_FIELD_MARSHAL = 0x2000;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct EventAttributes: u16 {
		const SPECIAL_NAME = 0x0200;
		const RT_SPECIAL_NAME = 0x0400;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct PropertyAttributes: u16 {
		const SPECIAL_NAME = 0x0200;
		const RT_SPECIAL_NAME = 0x0400;
		const HAS_DEFAULT = 0x1000;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct MethodSemanticsAttributes: u16 {
		const SETTER = 0x0001;
		const GETTER = 0x0002;
		const OTHER = 0x0004;
		const ADD_ON = 0x0008;
		const REMOVE_ON = 0x0010;
		const FIRE = 0x0020;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct PInvokeAttributes: u16 {
		const NO_MANGLE = 0x0001;
		const CHAR_SET_MASK = 0x0006;
		const CHAR_SET_ANSI = 0x0002;
		const CHAR_SET_UNICODE = 0x0004;
		const CHAR_SET_AUTO = 0x0006;
		const SUPPORTS_LAST_ERROR = 0x0040;
		const CALL_CONV_MASK = 0x0700;
		const CALL_CONV_WINAPI = 0x0100;
		const CALL_CONV_CDECL = 0x0200;
		const CALL_CONV_STDCALL = 0x0300;
		const CALL_CONV_THISCALL = 0x0400;
		const CALL_CONV_FASTCALL = 0x0500;
		const BEST_FIT_ENABLED = 0x0010;
		const BEST_FIT_DISABLED = 0x0020;
		const THROW_ON_UNMAPPABLE_ENABLED = 0x1000;
		const THROW_ON_UNMAPPABLE_DISABLED = 0x2000;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct ManifestResourceAttributes: u32 {
		const VISIBILITY_MASK = 0x0007;
		const PUBLIC = 0x0001;
		const PRIVATE = 0x0002;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct GenericParamAttributes: u16 {
		const VARIANCE_MASK = 0x0003;
		const COVARIANT = 0x0001;
		const CONTRAVARIANT = 0x0002;
		const SPECIAL_CONSTRAINT_MASK = 0x001C;
		const REFERENCE_TYPE_CONSTRAINT = 0x0004;
		const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
		const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct FileAttributes: u32 {
		const CONTAINS_NO_METADATA = 0x0001;
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct AssemblyFlags: u32 {
		const PUBLIC_KEY = 0x0001;
		const RETARGETABLE = 0x0100;
		const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
		const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
	}
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum AssemblyHashAlgorithm {
	None = 0x0000,
	Md5 = 0x8003,
	Sha1 = 0x8004,
	Sha256 = 0x800C,
	Sha384 = 0x800D,
	Sha512 = 0x800E,
}

impl FromByteStream for AssemblyHashAlgorithm {
	fn read(stream: &mut Cursor<&[u8]>, sizes: &IndexSizes) -> std::io::Result<Self> {
		let raw = u32::read(stream, sizes)?;
		AssemblyHashAlgorithm::from_repr(raw).ok_or_else(|| Error::new(ErrorKind::InvalidData, "unknown assembly hash algorithm"))
	}
}

macro_rules! impl_bitflags_read {
	($($ty:ident : $repr:ty),* $(,)?) => {$(
		impl FromByteStream for $ty {
			fn read(stream: &mut Cursor<&[u8]>, sizes: &IndexSizes) -> std::io::Result<Self> {
				Ok(Self::from_bits_retain(<$repr>::read(stream, sizes)?))
			}
		}
	)*};
}

impl_bitflags_read!(
	TypeAttributes: u32, FieldAttributes: u16, MethodAttributes: u16, MethodImplAttributes: u16,
	ParamAttributes: u16, EventAttributes: u16, PropertyAttributes: u16, MethodSemanticsAttributes: u16,
	PInvokeAttributes: u16, ManifestResourceAttributes: u32, GenericParamAttributes: u16,
	FileAttributes: u32, AssemblyFlags: u32,
);

#[derive(Debug, Clone, Table)]
pub struct Module {
	pub generation: u16,
	pub name: StringIndex,
	pub mv_id: GuidIndex,
	pub enc_id: GuidIndex,
	pub enc_base_id: GuidIndex,
}

#[derive(Debug, Clone, Table)]
pub struct TypeRef {
	pub resolution_scope: ResolutionScope,
	pub type_name: StringIndex,
	pub type_namespace: StringIndex,
}

#[derive(Debug, Clone, Table)]
pub struct TypeDef {
	pub flags: TypeAttributes,
	pub type_name: StringIndex,
	pub type_namespace: StringIndex,
	pub extends: TypeDefOrRef,
	pub field_list: FieldIndex,
	pub method_list: MethodDefIndex,
}

#[derive(Debug, Clone, Table)]
pub struct FieldPtr {
	pub field: FieldIndex,
}

#[derive(Debug, Clone, Table)]
pub struct Field {
	pub flags: FieldAttributes,
	pub name: StringIndex,
	pub signature: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct MethodPtr {
	pub method: MethodDefIndex,
}

#[derive(Debug, Clone, Table)]
pub struct MethodDef {
	pub rva: u32,
	pub impl_flags: MethodImplAttributes,
	pub flags: MethodAttributes,
	pub name: StringIndex,
	pub signature: BlobIndex,
	pub param_list: ParamIndex,
}

#[derive(Debug, Clone, Table)]
pub struct ParamPtr {
	pub param: ParamIndex,
}

#[derive(Debug, Clone, Table)]
pub struct Param {
	pub flags: ParamAttributes,
	pub sequence: u16,
	pub name: StringIndex,
}

#[derive(Debug, Clone, Table)]
pub struct InterfaceImpl {
	pub class: TypeDefIndex,
	pub interface: TypeDefOrRef,
}

#[derive(Debug, Clone, Table)]
pub struct MemberRef {
	pub class: MemberRefParent,
	pub name: StringIndex,
	pub signature: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct Constant {
	pub ty: [u8; 2],
	pub parent: HasConstant,
	pub value: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct CustomAttribute {
	pub parent: HasCustomAttribute,
	pub ty: CustomAttributeType,
	pub value: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct FieldMarshal {
	pub parent: HasFieldMarshal,
	pub native_type: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct DeclSecurity {
	pub action: u16,
	pub parent: HasDeclSecurity,
	pub permission_set: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct ClassLayout {
	pub packing_size: u16,
	pub class_size: u32,
	pub parent: TypeDefIndex,
}

#[derive(Debug, Clone, Table)]
pub struct FieldLayout {
	pub offset: u32,
	pub field: FieldIndex,
}

#[derive(Debug, Clone, Table)]
pub struct StandAloneSig {
	pub signature: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct EventMap {
	pub parent: TypeDefIndex,
	pub event_list: EventIndex,
}

#[derive(Debug, Clone, Table)]
pub struct EventPtr {
	pub event: EventIndex,
}

#[derive(Debug, Clone, Table)]
pub struct Event {
	pub flags: EventAttributes,
	pub name: StringIndex,
	pub ty: TypeDefOrRef,
}

#[derive(Debug, Clone, Table)]
pub struct PropertyMap {
	pub parent: TypeDefIndex,
	pub property_list: PropertyIndex,
}

#[derive(Debug, Clone, Table)]
pub struct PropertyPtr {
	pub property: PropertyIndex,
}

#[derive(Debug, Clone, Table)]
pub struct Property {
	pub flags: PropertyAttributes,
	pub name: StringIndex,
	pub ty: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct MethodSemantics {
	pub flags: MethodSemanticsAttributes,
	pub method: MethodDefIndex,
	pub association: HasSemantics,
}

#[derive(Debug, Clone, Table)]
pub struct MethodImpl {
	pub class: TypeDefIndex,
	pub body: MethodDefOrRef,
	pub declaration: MethodDefOrRef,
}

#[derive(Debug, Clone, Table)]
pub struct ModuleRef {
	pub name: StringIndex,
}

#[derive(Debug, Clone, Table)]
pub struct TypeSpec {
	pub signature: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct ImplMap {
	pub flags: PInvokeAttributes,
	pub member_forwarded: MemberForwarded,
	pub import_name: StringIndex,
	pub import_scope: ModuleRefIndex,
}

#[derive(Debug, Clone, Table)]
pub struct FieldRVA {
	pub rva: u32,
	pub field: FieldIndex,
}

#[derive(Debug, Clone, Table)]
pub struct EncLog {
	pub token: u32,
	pub func_code: u32,
}

#[derive(Debug, Clone, Table)]
pub struct EncMap {
	pub token: u32,
}

#[derive(Debug, Clone, Table)]
pub struct Assembly {
	pub hash_algorithm: AssemblyHashAlgorithm,
	pub major_version: u16,
	pub minor_version: u16,
	pub build_number: u16,
	pub revision_number: u16,
	pub flags: AssemblyFlags,
	pub public_key: BlobIndex,
	pub name: StringIndex,
	pub culture: StringIndex,
}

#[derive(Debug, Clone, Table)]
pub struct AssemblyProcessor {
	pub processor: u32,
}

#[derive(Debug, Clone, Table)]
pub struct AssemblyOS {
	pub os_platform_id: u32,
	pub os_major_version: u32,
	pub os_minor_version: u32,
}

#[derive(Debug, Clone, Table)]
pub struct AssemblyRef {
	pub major_version: u16,
	pub minor_version: u16,
	pub build_number: u16,
	pub revision_number: u16,
	pub flags: AssemblyFlags,
	pub public_key_or_token: BlobIndex,
	pub name: StringIndex,
	pub culture: StringIndex,
	pub hash_value: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct AssemblyRefProcessor {
	pub processor: u32,
	pub assembly_ref: AssemblyRefIndex,
}

#[derive(Debug, Clone, Table)]
pub struct AssemblyRefOS {
	pub os_platform_id: u32,
	pub os_major_version: u32,
	pub os_minor_version: u32,
	pub assembly_ref: AssemblyRefIndex,
}

#[derive(Debug, Clone, Table)]
pub struct File {
	pub flags: FileAttributes,
	pub name: StringIndex,
	pub hash_value: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct ExportedType {
	pub flags: TypeAttributes,
	pub type_def_id: u32,
	pub type_name: StringIndex,
	pub type_namespace: StringIndex,
	pub implementation: Implementation,
}

#[derive(Debug, Clone, Table)]
pub struct ManifestResource {
	pub offset: u32,
	pub flags: ManifestResourceAttributes,
	pub name: StringIndex,
	pub implementation: Implementation,
}

#[derive(Debug, Clone, Table)]
pub struct NestedClass {
	pub nested_class: TypeDefIndex,
	pub enclosing_class: TypeDefIndex,
}

#[derive(Debug, Clone, Table)]
pub struct GenericParam {
	pub number: u16,
	pub flags: GenericParamAttributes,
	pub owner: TypeOrMethodDef,
	pub name: StringIndex,
}

#[derive(Debug, Clone, Table)]
pub struct MethodSpec {
	pub method: MethodDefOrRef,
	pub instantiation: BlobIndex,
}

#[derive(Debug, Clone, Table)]
pub struct GenericParamConstraint {
	pub owner: GenericParamIndex,
	pub constraint: TypeDefOrRef,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn stream_header(valid: u64, heap_sizes: u8) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&0u32.to_le_bytes()); // reserved_0
		buf.push(1); // major_version
		buf.push(0); // minor_version
		buf.push(heap_sizes);
		buf.push(0); // reserved_1
		buf.extend_from_slice(&valid.to_le_bytes());
		buf.extend_from_slice(&0u64.to_le_bytes()); // sorted
		buf
	}

	#[test]
	fn empty_table_stream_has_no_tables() {
		let bytes = stream_header(0, 0);
		let heap = TableHeap::read(&bytes).unwrap();
		assert_eq!(heap.major_version(), 1);
		assert!(heap.get_table::<ModuleTable>().is_none());
	}

	#[test]
	fn table_stream_rejects_a_portable_pdb_table_id() {
		// Document = 0x30
		let bytes = stream_header(1u64 << 0x30, 0);
		assert!(TableHeap::read(&bytes).is_err());
	}

	#[test]
	fn table_stream_reads_a_single_module_row() {
		let mut bytes = stream_header(1, 0); // bit 0: Module
		bytes.extend_from_slice(&1u32.to_le_bytes()); // one Module row
		bytes.extend_from_slice(&0u16.to_le_bytes()); // generation
		bytes.extend_from_slice(&7u16.to_le_bytes()); // name (StringIndex, 2-byte width)
		bytes.extend_from_slice(&0u16.to_le_bytes()); // mv_id
		bytes.extend_from_slice(&0u16.to_le_bytes()); // enc_id
		bytes.extend_from_slice(&0u16.to_le_bytes()); // enc_base_id

		let heap = TableHeap::read(&bytes).unwrap();
		let table = heap.get_table::<ModuleTable>().unwrap();
		assert_eq!(table.rows().len(), 1);
		assert_eq!(table.get(0).unwrap().name.0, 7);
	}

	#[test]
	fn type_attributes_interface_bit_is_distinct_from_visibility() {
		let flags = TypeAttributes::INTERFACE | TypeAttributes::PUBLIC;
		assert!(flags.contains(TypeAttributes::INTERFACE));
		assert_eq!(flags & TypeAttributes::VISIBILITY_MASK, TypeAttributes::PUBLIC);
	}

	#[test]
	fn assembly_hash_algorithm_rejects_unknown_values() {
		let mut stream = Cursor::new(&[0xAAu8, 0xAA, 0xAA, 0xAA][..]);
		assert!(AssemblyHashAlgorithm::read(&mut stream, &IndexSizes::ZERO).is_err());
	}
}
