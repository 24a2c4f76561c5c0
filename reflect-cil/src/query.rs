//! The public query surface: binding-flags-filtered member enumeration over a flattened
//! [`MemberTable`], plus `GetInterfaces`-style interface enumeration built on
//! [`crate::membership::interface_closure`].
//!
//! Nothing here touches metadata directly - every filter decision is answered from a
//! [`MemberEntry`] plus a lookup against the declaring type's own declared-member list, so this
//! module stays a thin policy layer over the membership engine rather than a second reader of
//! the tables.

use bitflags::bitflags;

use crate::error::Result;
use crate::loader::{Loader, ResolvedToken};
use crate::membership::{self, get_members, MemberEntry, MemberKind};
use crate::metadata::indices::table_index::TypeDefIndex;
use crate::metadata::indices::MetadataToken;
use crate::metadata::table::{EventTable, FieldAttributes, FieldTable, MethodAttributes, MethodDefTable, MethodSemanticsTable, PropertyTable, TableKind};
use crate::signature::TypeNode;

bitflags! {
	/// Mirrors `System.Reflection.BindingFlags`' member-selection bits (the invocation-behavior
	/// bits - `InvokeMethod`, `CreateInstance`, `SetField`, ... - have no meaning for a read-only
	/// reflection engine and are not modeled).
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct BindingFlags: u16 {
		const INSTANCE = 0x01;
		const STATIC = 0x02;
		const PUBLIC = 0x04;
		const NON_PUBLIC = 0x08;
		const DECLARED_ONLY = 0x10;
		const FLATTEN_HIERARCHY = 0x20;
		/// Internal selector used by constructor enumeration: restricts `Method` queries to
		/// `.ctor`/`.cctor` rows instead of excluding them, as `Type.GetConstructors` does
		/// internally against the very same `MethodDef` table `Type.GetMethods` reads.
		const INTERNAL_ONLY_CONSTRUCTOR = 0x40;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemberTraits {
	is_static: bool,
	is_public: bool,
}

fn field_traits(flags: FieldAttributes) -> MemberTraits {
	MemberTraits { is_static: flags.contains(FieldAttributes::STATIC), is_public: (flags & FieldAttributes::FIELD_ACCESS_MASK) == FieldAttributes::PUBLIC }
}

fn method_traits(flags: MethodAttributes) -> MemberTraits {
	MemberTraits { is_static: flags.contains(MethodAttributes::STATIC), is_public: (flags & MethodAttributes::MEMBER_ACCESS_MASK) == MethodAttributes::PUBLIC }
}

/// A property or event carries no accessibility/static-ness of its own (ECMA-335 §II.22.28/34) -
/// both are derived from its accessors, found through the `MethodSemantics` table. Of possibly
/// several accessors (getter, setter, add, remove, ...) the most permissive wins, matching the
/// CLR: a property with a public getter and a private setter is itself reflected as public.
fn accessor_traits(module: &crate::module::Module<'_>, kind: MemberKind, token: MetadataToken) -> MemberTraits {
	let Some(semantics) = module.root().tables.get_table::<MethodSemanticsTable>() else {
		return MemberTraits { is_static: false, is_public: false };
	};
	let methods = module.root().tables.get_table::<MethodDefTable>();

	let expected_association = match kind {
		MemberKind::Property => TableKind::Property,
		MemberKind::Event => TableKind::Event,
		_ => return MemberTraits { is_static: false, is_public: false },
	};

	let mut best = MemberTraits { is_static: true, is_public: false };
	let mut any = false;
	for row in semantics.rows() {
		if row.association.table_kind() != Some(expected_association) || row.association.token() != Some(token) {
			continue;
		}
		let Some(method_row) = methods.and_then(|t| t.get(row.method.idx())) else { continue };
		let traits = method_traits(method_row.flags);
		any = true;
		best.is_static &= traits.is_static;
		best.is_public |= traits.is_public;
	}
	if !any {
		return MemberTraits { is_static: false, is_public: false };
	}
	best
}

fn member_traits(entry: &MemberEntry<'_>) -> MemberTraits {
	let module = entry.module();
	let token = entry.token();
	let Some(idx) = token.index() else { return MemberTraits { is_static: false, is_public: false } };
	match token.kind() {
		Some(TableKind::Field) => module.root().tables.get_table::<FieldTable>().and_then(|t| t.get(idx)).map(|r| field_traits(r.flags)).unwrap_or(MemberTraits { is_static: false, is_public: false }),
		Some(TableKind::MethodDef) => module.root().tables.get_table::<MethodDefTable>().and_then(|t| t.get(idx)).map(|r| method_traits(r.flags)).unwrap_or(MemberTraits { is_static: false, is_public: false }),
		Some(TableKind::Property) => accessor_traits(module, MemberKind::Property, token),
		Some(TableKind::Event) => accessor_traits(module, MemberKind::Event, token),
		_ => MemberTraits { is_static: false, is_public: false },
	}
}

fn is_constructor_name(name: &str) -> bool {
	name == ".ctor" || name == ".cctor"
}

fn member_name(entry: &MemberEntry<'_>) -> Result<String> {
	let module = entry.module();
	let token = entry.token();
	let idx = token.index().ok_or_else(|| crate::error::LoadError::invalid_metadata("nil member token"))?;
	let name = match token.kind() {
		Some(TableKind::Field) => module.root().tables.get_table::<FieldTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		Some(TableKind::MethodDef) => module.root().tables.get_table::<MethodDefTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		Some(TableKind::Property) => module.root().tables.get_table::<PropertyTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		Some(TableKind::Event) => module.root().tables.get_table::<EventTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		_ => None,
	}
	.ok_or_else(|| crate::error::LoadError::invalid_metadata("member token names no row"))?;
	module.root().strings.get(name).map(|s| s.to_owned()).map_err(|err| crate::error::LoadError::InvalidMetadata(err.to_string()))
}

/// Flattens `(type_token, kind)` and filters it down to what `flags` selects, per §4.10's
/// exclusion rules. `type_def` is the queried type's own index, used to tell a returned entry's
/// declared members (this type) from its inherited ones.
pub fn query_members<'l>(
	loader: &'l Loader<'l>,
	type_token: ResolvedToken<'l>,
	type_def: TypeDefIndex,
	kind: MemberKind,
	args: &[TypeNode],
	flags: BindingFlags,
) -> Result<Vec<&'l MemberEntry<'l>>> {
	let (module, _) = type_token;
	let table = get_members(loader, type_token, kind, args)?;
	let declared_here: Vec<MetadataToken> = membership::declared_members(module, type_def, kind)?;

	let mut result = Vec::new();
	for entry in table.entries() {
		if is_excluded(module, &declared_here, entry, kind, flags)? {
			continue;
		}
		result.push(entry);
	}
	Ok(result)
}

fn is_excluded(queried_module: &crate::module::Module<'_>, declared_here: &[MetadataToken], entry: &MemberEntry<'_>, kind: MemberKind, flags: BindingFlags) -> Result<bool> {
	let traits = member_traits(entry);
	if traits.is_static && !flags.contains(BindingFlags::STATIC) {
		return Ok(true);
	}
	if !traits.is_static && !flags.contains(BindingFlags::INSTANCE) {
		return Ok(true);
	}
	if traits.is_public && !flags.contains(BindingFlags::PUBLIC) {
		return Ok(true);
	}
	if !traits.is_public && !flags.contains(BindingFlags::NON_PUBLIC) {
		return Ok(true);
	}

	let is_declared_here = std::ptr::eq(entry.module(), queried_module) && declared_here.contains(&entry.token());

	if !is_declared_here {
		if flags.contains(BindingFlags::DECLARED_ONLY) {
			return Ok(true);
		}
		if traits.is_static && !flags.contains(BindingFlags::FLATTEN_HIERARCHY) {
			return Ok(true);
		}
		if !traits.is_public {
			let name = member_name(entry)?;
			if !name.contains('.') {
				return Ok(true);
			}
		}
	}

	if kind == MemberKind::Method {
		let name = member_name(entry)?;
		let wants_ctors = flags.contains(BindingFlags::INTERNAL_ONLY_CONSTRUCTOR);
		if wants_ctors != is_constructor_name(&name) {
			return Ok(true);
		}
	}

	Ok(false)
}

/// Every interface a type implements, transitively, rendered as the `GetInterfaces` result. Each
/// entry carries the generic arguments it was reached with, so a type implementing
/// `IIterable<Pair<K, V>>` reports that instantiated interface rather than just `IIterable<T>`.
pub fn query_interfaces<'l>(loader: &'l Loader<'l>, type_token: ResolvedToken<'l>, args: &[TypeNode]) -> Result<Vec<(ResolvedToken<'l>, Vec<TypeNode>)>> {
	membership::interface_closure(loader, type_token, args)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn binding_flags_compose() {
		let flags = BindingFlags::INSTANCE | BindingFlags::PUBLIC;
		assert!(flags.contains(BindingFlags::INSTANCE));
		assert!(flags.contains(BindingFlags::PUBLIC));
		assert!(!flags.contains(BindingFlags::STATIC));
	}

	#[test]
	fn constructor_name_detection() {
		assert!(is_constructor_name(".ctor"));
		assert!(is_constructor_name(".cctor"));
		assert!(!is_constructor_name("ToString"));
	}
}
