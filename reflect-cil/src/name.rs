//! Type-name rendering: the three CLR-standard forms a reflection API exposes for a type -
//! `Name` (simple), `FullName` (namespace plus nested-enclosing chain), and
//! `AssemblyQualifiedName` (full name plus the owning assembly's display name).
//!
//! Rendering never touches a signature blob twice: a [`TypeNode`] decoded once by the
//! membership or query layer is handed here as-is, so an array-of-generic-instance-of-nested-type
//! renders in one recursive pass.

use crate::assembly::AssemblyName;
use crate::error::{LoadError, Result};
use crate::loader::Loader;
use crate::membership::resolve_type_def_or_ref;
use crate::metadata::indices::table_index::TypeDefIndex;
use crate::metadata::table::{GenericParamTable, NestedClassTable, TableKind};
use crate::module::Module;
use crate::signature::{PrimitiveType, TypeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMode {
	Simple,
	Full,
	AssemblyQualified,
}

impl AssemblyName {
	/// `Name, Version=M.m.b.r, Culture=neutral, PublicKeyToken=...` - the suffix an
	/// assembly-qualified type name carries after its full name.
	pub fn display_name(&self) -> String {
		let culture = if self.culture.is_empty() { "neutral".to_owned() } else { self.culture.clone() };
		let token = if self.public_key_or_token.is_empty() {
			"null".to_owned()
		} else {
			self.public_key_or_token.iter().map(|b| format!("{b:02x}")).collect::<String>()
		};
		format!(
			"{}, Version={}.{}.{}.{}, Culture={culture}, PublicKeyToken={token}",
			self.name, self.major_version, self.minor_version, self.build_number, self.revision_number,
		)
	}
}

fn enclosing_type(module: &Module<'_>, idx: TypeDefIndex) -> Result<Option<TypeDefIndex>> {
	let Some(nested) = module.root().tables.get_table::<NestedClassTable>() else { return Ok(None) };
	let target = idx.idx();
	for row in nested.rows() {
		if row.nested_class.idx() == target {
			return Ok(Some(row.enclosing_class));
		}
	}
	Ok(None)
}

/// `true` if this type-def itself declares generic parameters, i.e. is an uninstantiated generic
/// definition (`List<T>`'s `TypeDef`, not a `List<int>` instance - instances are `TypeSpec`s and
/// never reach this function as a bare `TypeDefIndex`).
fn is_generic_definition(module: &Module<'_>, idx: TypeDefIndex) -> bool {
	let Some(params) = module.root().tables.get_table::<GenericParamTable>() else { return false };
	let token = idx.token();
	params.rows().iter().any(|row| row.owner.table_kind() == Some(TableKind::TypeDef) && row.owner.token() == Some(token))
}

fn owning_assembly<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>) -> Result<AssemblyName> {
	let assembly = loader.get_or_load_assembly(module.location())?;
	assembly.name().map(|name| name.clone())
}

/// Renders `(module, idx)` in `mode`. Returns `Ok(None)` rather than an error for `Full`/
/// `AssemblyQualified` on an uninstantiated generic definition, since those names do not exist
/// (only an instantiated `TypeSpec` has a full name); `Simple` is always renderable.
pub fn type_def_name<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, idx: TypeDefIndex, mode: NameMode) -> Result<Option<String>> {
	let def = module.type_def(idx).ok_or_else(|| LoadError::invalid_metadata("TypeDef row out of range"))?;
	let simple_name = module.root().strings.get(def.type_name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;

	if mode == NameMode::Simple {
		return Ok(Some(simple_name.to_owned()));
	}
	if is_generic_definition(module, idx) {
		return Ok(None);
	}

	let mut chain = vec![simple_name.to_owned()];
	let mut namespace = module.root().strings.get(def.type_namespace).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?.to_owned();
	let mut current = idx;
	while let Some(parent) = enclosing_type(module, current)? {
		let parent_def = module.type_def(parent).ok_or_else(|| LoadError::invalid_metadata("NestedClass enclosing row out of range"))?;
		chain.push(module.root().strings.get(parent_def.type_name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?.to_owned());
		namespace = module.root().strings.get(parent_def.type_namespace).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?.to_owned();
		current = parent;
	}
	chain.reverse();

	let mut full = String::new();
	if !namespace.is_empty() {
		full.push_str(&namespace);
		full.push('.');
	}
	full.push_str(&chain.join("+"));

	match mode {
		NameMode::Full => Ok(Some(full)),
		NameMode::AssemblyQualified => {
			let assembly_name = owning_assembly(loader, module)?;
			Ok(Some(format!("{full}, {}", assembly_name.display_name())))
		}
		NameMode::Simple => unreachable!("handled above"),
	}
}

/// Renders an already-decoded [`TypeNode`] - a method parameter, return type, or field type -
/// applying array/pointer/by-ref suffixes and the generic-instance bracket syntax
/// `Name[[arg-aqn],[arg-aqn],...]` around whatever `mode` asks for.
pub fn type_node_name<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, node: &TypeNode, mode: NameMode) -> Result<Option<String>> {
	match node {
		TypeNode::Primitive(primitive) => Ok(Some(primitive_name(*primitive, mode, loader)?)),
		TypeNode::Class(coded) | TypeNode::ValueType(coded) => {
			let (target_module, token) = resolve_type_def_or_ref(loader, module, *coded)?;
			let idx = TypeDefIndex(token.rid());
			type_def_name(loader, target_module, idx, mode)
		}
		TypeNode::Var(n, _) => Ok(Some(format!("!{n}"))),
		TypeNode::MVar(n, _) => Ok(Some(format!("!!{n}"))),
		TypeNode::Pointer(inner) => Ok(append_suffix(type_node_name(loader, module, inner, mode)?, "*")),
		TypeNode::ByRef(inner) => Ok(append_suffix(type_node_name(loader, module, inner, mode)?, "&")),
		TypeNode::SzArray(inner) => Ok(append_suffix(type_node_name(loader, module, inner, mode)?, "[]")),
		TypeNode::Array(inner, shape) => {
			let brackets = if shape.rank <= 1 { "[]".to_owned() } else { format!("[{}]", ",".repeat(shape.rank.saturating_sub(1) as usize)) };
			Ok(append_suffix(type_node_name(loader, module, inner, mode)?, &brackets))
		}
		TypeNode::Pinned(inner) => type_node_name(loader, module, inner, mode),
		TypeNode::Modified { underlying, .. } => type_node_name(loader, module, underlying, mode),
		TypeNode::GenericInst { generic_type, args, .. } => {
			let (target_module, token) = resolve_type_def_or_ref(loader, module, *generic_type)?;
			let idx = TypeDefIndex(token.rid());
			let Some(base) = type_def_name(loader, target_module, idx, mode)? else {
				return Ok(None);
			};
			if mode == NameMode::Simple {
				return Ok(Some(base));
			}
			let mut rendered_args = Vec::with_capacity(args.len());
			for arg in args {
				let Some(arg_name) = type_node_name(loader, module, arg, NameMode::AssemblyQualified)? else {
					return Ok(None);
				};
				rendered_args.push(format!("[{arg_name}]"));
			}
			Ok(Some(format!("{base}[{}]", rendered_args.join(","))))
		}
		TypeNode::FnPointer(_) => Ok(Some("(fnptr)".to_owned())),
	}
}

fn append_suffix(name: Option<String>, suffix: &str) -> Option<String> {
	name.map(|mut n| {
		n.push_str(suffix);
		n
	})
}

fn primitive_name<'l>(primitive: PrimitiveType, mode: NameMode, loader: &'l Loader<'l>) -> Result<String> {
	let (module, idx) = loader.resolve_fundamental_type(primitive)?;
	let name = type_def_name(loader, module, idx, mode)?;
	name.ok_or_else(|| LoadError::LogicViolation("fundamental type resolved to a generic definition".into()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn name(culture: &str, token: Vec<u8>) -> AssemblyName {
		AssemblyName {
			name: "System.Private.CoreLib".to_owned(),
			culture: culture.to_owned(),
			major_version: 8,
			minor_version: 0,
			build_number: 0,
			revision_number: 0,
			public_key_or_token: token,
		}
	}

	#[test]
	fn display_name_uses_neutral_for_an_empty_culture() {
		let rendered = name("", vec![0x7c, 0xec, 0x85, 0xd7, 0xbe, 0xa7, 0x79, 0x8e]).display_name();
		assert_eq!(rendered, "System.Private.CoreLib, Version=8.0.0.0, Culture=neutral, PublicKeyToken=7cec85d7bea7798e");
	}

	#[test]
	fn display_name_uses_null_for_an_unsigned_assembly() {
		let rendered = name("en-US", vec![]).display_name();
		assert_eq!(rendered, "System.Private.CoreLib, Version=8.0.0.0, Culture=en-US, PublicKeyToken=null");
	}

	#[test]
	fn append_suffix_passes_through_none() {
		assert_eq!(append_suffix(None, "[]"), None);
	}

	#[test]
	fn append_suffix_appends_to_some() {
		assert_eq!(append_suffix(Some("Int32".to_owned()), "[]"), Some("Int32[]".to_owned()));
	}
}
