//! Decoding of ECMA-335 type and method signatures (§II.23.2) out of `#Blob` heap entries, and
//! the generic instantiator/comparator built on top of the decoded tree.
//!
//! Signatures are reparsed from their raw blob range on every [`TypeSignature::read`] call
//! rather than decoded once and interned - callers that need the tree repeatedly are expected
//! to hold on to the `TypeNode` themselves. This mirrors how every other metadata view in this
//! crate borrows rather than materialises: a `TypeSignature` is a cheap `(bytes, sizes)` pair,
//! not an owned tree.

use std::io::{Cursor, Error, ErrorKind};

use bitflags::bitflags;

use crate::metadata::indices::coded::TypeDefOrRef;
use crate::metadata::indices::sizes::IndexSizes;
use crate::metadata::indices::MetadataToken;
use crate::utilities::{read_compressed_u32, FromByteStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrimitiveType {
	Void = 0x01,
	Boolean = 0x02,
	Char = 0x03,
	SByte = 0x04,
	Byte = 0x05,
	Int16 = 0x06,
	UInt16 = 0x07,
	Int32 = 0x08,
	UInt32 = 0x09,
	Int64 = 0x0A,
	UInt64 = 0x0B,
	Single = 0x0C,
	Double = 0x0D,
	String = 0x0E,
	IntPtr = 0x18,
	UIntPtr = 0x19,
	Object = 0x1C,
	TypedReference = 0x16,
}

/// The shape of a multi-dimensional array (ECMA-335 §II.23.2.13): a rank plus per-dimension
/// sizes and lower bounds. Lower bounds are read as plain compressed unsigned integers -
/// ECMA's signed encoding for them is vanishingly rare in practice (non-zero lower bounds are a
/// CLR curiosity inherited from COM SAFEARRAY, not something C# or any mainstream language
/// emits) and is not attempted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayShape {
	pub rank: u32,
	pub sizes: Vec<u32>,
	pub lower_bounds: Vec<u32>,
}

/// A fully decoded type signature. Recursive positions use `Box` since the tree is built once
/// per `TypeSignature::read` call and thrown away, not interned.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
	Primitive(PrimitiveType),
	ValueType(TypeDefOrRef),
	Class(TypeDefOrRef),
	/// A type-parameter reference on the declaring type; the index is into that type's own
	/// `GenericParam` rows, not yet resolved to a concrete argument. The second field is the
	/// declaring type's token once known - `None` right after decoding a fresh blob, filled in by
	/// [`annotate_context`] before the node crosses into a new scope, so two `Var`s with the same
	/// ordinal but different owners never compare equal.
	Var(u32, Option<MetadataToken>),
	/// A type-parameter reference on the declaring method, annotated with the declaring method's
	/// own token the same way `Var` is annotated with its declaring type's.
	MVar(u32, Option<MetadataToken>),
	Pointer(Box<TypeNode>),
	ByRef(Box<TypeNode>),
	SzArray(Box<TypeNode>),
	Array(Box<TypeNode>, ArrayShape),
	GenericInst { value_type: bool, generic_type: TypeDefOrRef, args: Vec<TypeNode> },
	FnPointer(Box<MethodSignature>),
	/// A required (`CMOD_REQD`) or optional (`CMOD_OPT`) custom modifier prefixing the
	/// underlying type.
	Modified { required: bool, modifier: TypeDefOrRef, underlying: Box<TypeNode> },
	Pinned(Box<TypeNode>),
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct CallingConvention: u8 {
		const DEFAULT = 0x00;
		const C = 0x01;
		const STD_CALL = 0x02;
		const THIS_CALL = 0x03;
		const FAST_CALL = 0x04;
		const VAR_ARG = 0x05;
		const KIND_MASK = 0x0F;
		const GENERIC = 0x10;
		const HAS_THIS = 0x20;
		const EXPLICIT_THIS = 0x40;
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
	pub calling_convention: CallingConvention,
	pub generic_param_count: u32,
	pub return_type: TypeNode,
	pub parameters: Vec<TypeNode>,
}

/// A lazy view over a signature blob: reparsed on every [`Self::read`], never cached.
#[derive(Clone, Copy)]
pub struct TypeSignature<'l> {
	bytes: &'l [u8],
}

impl<'l> TypeSignature<'l> {
	pub fn new(bytes: &'l [u8]) -> Self {
		Self { bytes }
	}

	pub fn read(&self) -> std::io::Result<TypeNode> {
		let mut stream = Cursor::new(self.bytes);
		decode_type(&mut stream)
	}
}

/// A lazy view over a `MethodDef`/`MemberRef`/`StandAloneSig`/`MethodSpec` method signature blob.
#[derive(Clone, Copy)]
pub struct MethodSignatureView<'l> {
	bytes: &'l [u8],
}

impl<'l> MethodSignatureView<'l> {
	pub fn new(bytes: &'l [u8]) -> Self {
		Self { bytes }
	}

	pub fn read(&self) -> std::io::Result<MethodSignature> {
		let mut stream = Cursor::new(self.bytes);
		decode_method_signature(&mut stream)
	}
}

fn invalid(message: &'static str) -> Error {
	Error::new(ErrorKind::InvalidData, message)
}

fn decode_coded(stream: &mut Cursor<&[u8]>) -> std::io::Result<TypeDefOrRef> {
	// TypeDefOrRef tokens inside signatures are compressed, unlike the same coded index used
	// as a fixed-width table row column: the tag occupies the low 2 bits as usual, but the row
	// id above it is itself compressed rather than a raw 2/4-byte integer (ECMA-335 §II.23.2.8).
	let raw = read_compressed_u32(stream)?;
	if !TypeDefOrRef::is_valid(raw) {
		return Err(invalid("invalid TypeDefOrRef tag in signature"));
	}
	Ok(TypeDefOrRef(raw))
}

fn decode_array_shape(stream: &mut Cursor<&[u8]>) -> std::io::Result<ArrayShape> {
	let rank = read_compressed_u32(stream)?;
	let num_sizes = read_compressed_u32(stream)?;
	let sizes = (0..num_sizes).map(|_| read_compressed_u32(stream)).collect::<std::io::Result<Vec<_>>>()?;
	let num_lower_bounds = read_compressed_u32(stream)?;
	let lower_bounds = (0..num_lower_bounds).map(|_| read_compressed_u32(stream)).collect::<std::io::Result<Vec<_>>>()?;
	Ok(ArrayShape { rank, sizes, lower_bounds })
}

fn decode_type(stream: &mut Cursor<&[u8]>) -> std::io::Result<TypeNode> {
	let tag = u8::read(stream, &IndexSizes::ZERO)?;
	match tag {
		0x01 => Ok(TypeNode::Primitive(PrimitiveType::Void)),
		0x02 => Ok(TypeNode::Primitive(PrimitiveType::Boolean)),
		0x03 => Ok(TypeNode::Primitive(PrimitiveType::Char)),
		0x04 => Ok(TypeNode::Primitive(PrimitiveType::SByte)),
		0x05 => Ok(TypeNode::Primitive(PrimitiveType::Byte)),
		0x06 => Ok(TypeNode::Primitive(PrimitiveType::Int16)),
		0x07 => Ok(TypeNode::Primitive(PrimitiveType::UInt16)),
		0x08 => Ok(TypeNode::Primitive(PrimitiveType::Int32)),
		0x09 => Ok(TypeNode::Primitive(PrimitiveType::UInt32)),
		0x0A => Ok(TypeNode::Primitive(PrimitiveType::Int64)),
		0x0B => Ok(TypeNode::Primitive(PrimitiveType::UInt64)),
		0x0C => Ok(TypeNode::Primitive(PrimitiveType::Single)),
		0x0D => Ok(TypeNode::Primitive(PrimitiveType::Double)),
		0x0E => Ok(TypeNode::Primitive(PrimitiveType::String)),
		0x0F => Ok(TypeNode::Pointer(Box::new(decode_type(stream)?))),
		0x10 => Ok(TypeNode::ByRef(Box::new(decode_type(stream)?))),
		0x11 => Ok(TypeNode::ValueType(decode_coded(stream)?)),
		0x12 => Ok(TypeNode::Class(decode_coded(stream)?)),
		0x13 => Ok(TypeNode::Var(read_compressed_u32(stream)?, None)),
		0x14 => {
			let element = decode_type(stream)?;
			let shape = decode_array_shape(stream)?;
			Ok(TypeNode::Array(Box::new(element), shape))
		}
		0x15 => {
			let sub_tag = u8::read(stream, &IndexSizes::ZERO)?;
			let value_type = match sub_tag {
				0x11 => true,
				0x12 => false,
				_ => return Err(invalid("generic instantiation must name a class or value type")),
			};
			let generic_type = decode_coded(stream)?;
			let arg_count = read_compressed_u32(stream)?;
			let args = (0..arg_count).map(|_| decode_type(stream)).collect::<std::io::Result<Vec<_>>>()?;
			Ok(TypeNode::GenericInst { value_type, generic_type, args })
		}
		0x16 => Ok(TypeNode::Primitive(PrimitiveType::TypedReference)),
		0x18 => Ok(TypeNode::Primitive(PrimitiveType::IntPtr)),
		0x19 => Ok(TypeNode::Primitive(PrimitiveType::UIntPtr)),
		0x1B => Ok(TypeNode::FnPointer(Box::new(decode_method_signature(stream)?))),
		0x1C => Ok(TypeNode::Primitive(PrimitiveType::Object)),
		0x1D => Ok(TypeNode::SzArray(Box::new(decode_type(stream)?))),
		0x1E => Ok(TypeNode::MVar(read_compressed_u32(stream)?, None)),
		0x1F => {
			let modifier = decode_coded(stream)?;
			let underlying = decode_type(stream)?;
			Ok(TypeNode::Modified { required: true, modifier, underlying: Box::new(underlying) })
		}
		0x20 => {
			let modifier = decode_coded(stream)?;
			let underlying = decode_type(stream)?;
			Ok(TypeNode::Modified { required: false, modifier, underlying: Box::new(underlying) })
		}
		0x45 => Ok(TypeNode::Pinned(Box::new(decode_type(stream)?))),
		_ => Err(invalid("unrecognised element type tag in signature")),
	}
}

fn decode_method_signature(stream: &mut Cursor<&[u8]>) -> std::io::Result<MethodSignature> {
	let calling_convention = CallingConvention::from_bits_retain(u8::read(stream, &IndexSizes::ZERO)?);

	let generic_param_count = match calling_convention.contains(CallingConvention::GENERIC) {
		true => read_compressed_u32(stream)?,
		false => 0,
	};

	let param_count = read_compressed_u32(stream)?;
	let return_type = decode_type(stream)?;

	let mut parameters = Vec::with_capacity(param_count as usize);
	for _ in 0..param_count {
		// A 0x41 SENTINEL byte marks the boundary between fixed and variadic arguments in a
		// VARARG call site signature; the remaining parameters are the variadic ones and are
		// decoded the same way, so the sentinel is simply skipped rather than tracked.
		if stream.get_ref().get(stream.position() as usize) == Some(&0x41) {
			stream.set_position(stream.position() + 1);
		}
		parameters.push(decode_type(stream)?);
	}

	Ok(MethodSignature { calling_convention, generic_param_count, return_type, parameters })
}

/// `true` if `node` still contains a free `Var`/`MVar` reference anywhere in its structure, i.e.
/// whether instantiating it against a set of generic arguments could change it.
pub fn would_instantiate(node: &TypeNode) -> bool {
	match node {
		TypeNode::Var(_, _) | TypeNode::MVar(_, _) => true,
		TypeNode::Pointer(inner) | TypeNode::ByRef(inner) | TypeNode::SzArray(inner) | TypeNode::Pinned(inner) => would_instantiate(inner),
		TypeNode::Array(inner, _) => would_instantiate(inner),
		TypeNode::GenericInst { args, .. } => args.iter().any(would_instantiate),
		TypeNode::FnPointer(sig) => would_instantiate(&sig.return_type) || sig.parameters.iter().any(would_instantiate),
		TypeNode::Modified { underlying, .. } => would_instantiate(underlying),
		TypeNode::Primitive(_) | TypeNode::ValueType(_) | TypeNode::Class(_) => false,
	}
}

/// Substitutes every free `Var(n)`/`MVar(n)` in `node` with `type_args[n]`/`method_args[n]`,
/// leaving indices past the end of the corresponding argument list untouched (an
/// under-supplied instantiation is a caller error the loader reports, not something this
/// function silently tolerates - it is expected to only ever be called with complete argument
/// lists).
pub fn instantiate(node: &TypeNode, type_args: &[TypeNode], method_args: &[TypeNode]) -> TypeNode {
	match node {
		TypeNode::Var(n, _) => type_args.get(*n as usize).cloned().unwrap_or_else(|| node.clone()),
		TypeNode::MVar(n, _) => method_args.get(*n as usize).cloned().unwrap_or_else(|| node.clone()),
		TypeNode::Pointer(inner) => TypeNode::Pointer(Box::new(instantiate(inner, type_args, method_args))),
		TypeNode::ByRef(inner) => TypeNode::ByRef(Box::new(instantiate(inner, type_args, method_args))),
		TypeNode::SzArray(inner) => TypeNode::SzArray(Box::new(instantiate(inner, type_args, method_args))),
		TypeNode::Pinned(inner) => TypeNode::Pinned(Box::new(instantiate(inner, type_args, method_args))),
		TypeNode::Array(inner, shape) => TypeNode::Array(Box::new(instantiate(inner, type_args, method_args)), shape.clone()),
		TypeNode::Modified { required, modifier, underlying } => TypeNode::Modified {
			required: *required,
			modifier: *modifier,
			underlying: Box::new(instantiate(underlying, type_args, method_args)),
		},
		TypeNode::GenericInst { value_type, generic_type, args } => TypeNode::GenericInst {
			value_type: *value_type,
			generic_type: *generic_type,
			args: args.iter().map(|a| instantiate(a, type_args, method_args)).collect(),
		},
		TypeNode::FnPointer(sig) => TypeNode::FnPointer(Box::new(MethodSignature {
			calling_convention: sig.calling_convention,
			generic_param_count: sig.generic_param_count,
			return_type: instantiate(&sig.return_type, type_args, method_args),
			parameters: sig.parameters.iter().map(|p| instantiate(p, type_args, method_args)).collect(),
		})),
		TypeNode::Primitive(_) | TypeNode::ValueType(_) | TypeNode::Class(_) => node.clone(),
	}
}

/// Stamps every still-unannotated `Var` in `node` with `type_context` and every still-unannotated
/// `MVar` with `method_context`. Called once, right after a signature is decoded fresh off its
/// blob and before any substitution runs against it, so a `Var`/`MVar` that survives
/// instantiation (because its owner supplied fewer arguments than it references) still carries
/// the token of the type/method it actually belongs to - without this, two free variables with
/// the same ordinal but unrelated owners would compare equal under `signatures_equal`.
///
/// An already-annotated position (context already `Some`) is left untouched: annotation happens
/// once, at the scope boundary where a `Var`/`MVar` first becomes visible, not on every
/// re-instantiation downstream.
pub fn annotate_context(node: &TypeNode, type_context: Option<MetadataToken>, method_context: Option<MetadataToken>) -> TypeNode {
	match node {
		TypeNode::Var(n, ctx) => TypeNode::Var(*n, ctx.or(type_context)),
		TypeNode::MVar(n, ctx) => TypeNode::MVar(*n, ctx.or(method_context)),
		TypeNode::Pointer(inner) => TypeNode::Pointer(Box::new(annotate_context(inner, type_context, method_context))),
		TypeNode::ByRef(inner) => TypeNode::ByRef(Box::new(annotate_context(inner, type_context, method_context))),
		TypeNode::SzArray(inner) => TypeNode::SzArray(Box::new(annotate_context(inner, type_context, method_context))),
		TypeNode::Pinned(inner) => TypeNode::Pinned(Box::new(annotate_context(inner, type_context, method_context))),
		TypeNode::Array(inner, shape) => TypeNode::Array(Box::new(annotate_context(inner, type_context, method_context)), shape.clone()),
		TypeNode::Modified { required, modifier, underlying } => TypeNode::Modified {
			required: *required,
			modifier: *modifier,
			underlying: Box::new(annotate_context(underlying, type_context, method_context)),
		},
		TypeNode::GenericInst { value_type, generic_type, args } => TypeNode::GenericInst {
			value_type: *value_type,
			generic_type: *generic_type,
			args: args.iter().map(|a| annotate_context(a, type_context, method_context)).collect(),
		},
		TypeNode::FnPointer(sig) => TypeNode::FnPointer(Box::new(MethodSignature {
			calling_convention: sig.calling_convention,
			generic_param_count: sig.generic_param_count,
			return_type: annotate_context(&sig.return_type, type_context, method_context),
			parameters: sig.parameters.iter().map(|p| annotate_context(p, type_context, method_context)).collect(),
		})),
		TypeNode::Primitive(_) | TypeNode::ValueType(_) | TypeNode::Class(_) => node.clone(),
	}
}

/// Structural signature equality after substitution - `TypeNode` derives `PartialEq`, so this
/// is the comparator two members need when deciding whether one overrides or hides another once
/// both have had their declaring type's generic arguments substituted in. `Var`/`MVar` equality
/// therefore also requires equal annotated context tokens, not just equal ordinals.
pub fn signatures_equal(a: &TypeNode, b: &TypeNode) -> bool {
	a == b
}
