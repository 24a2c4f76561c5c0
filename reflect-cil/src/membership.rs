//! The membership engine: for a given type (optionally instantiated with concrete generic
//! arguments), computes the flattened set of fields, methods, properties and events a reflection
//! query actually sees - declared members merged with whatever survives from the base-type
//! chain once hiding and overriding have been applied.
//!
//! Each computed table is built once under the loader's master lock (so two threads racing to
//! reflect over the same type don't duplicate the walk) and from then on read lock-free: the
//! loader publishes the finished `&'l MemberTable` into its membership cache and every later
//! lookup is a plain map read.

use crate::error::{LoadError, Result};
use crate::loader::{Loader, ResolvedToken};
use crate::metadata::indices::coded::TypeDefOrRef;
use crate::metadata::indices::table_index::{EventIndex, FieldIndex, GenericParamIndex, MethodDefIndex, PropertyIndex, TypeDefIndex};
use crate::metadata::indices::MetadataToken;
use crate::metadata::table::{
	EventMapTable, EventTable, FieldTable, GenericParamAttributes, GenericParamConstraint, GenericParamConstraintTable, GenericParamTable, InterfaceImplTable,
	MethodDefTable, MethodImplTable, PropertyMapTable, PropertyTable, TableKind, TypeAttributes, TypeDef, TypeDefTable,
};
use crate::module::Module;
use crate::signature::{annotate_context, instantiate, signatures_equal, MethodSignatureView, TypeNode, TypeSignature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
	Field,
	Method,
	Property,
	Event,
}

/// One member reached while flattening a type's membership.
///
/// `owner_args` carries the class type arguments a signature read through this entry must be
/// substituted against (empty for a member reached with no open generic context along the way).
/// `source` records which interface method this entry was actually contributed from, when it
/// differs from the entry's own token - set when an explicit `MethodImpl` override resolves to an
/// interface method (so `C`'s own `F0` remembers it implements `IF.F0`) and when a generic
/// parameter's interface constraint contributes a member into that parameter's fabricated table
/// (where the "declarer" is the constraint itself). `None` means the entry's own declaring type is
/// its own source, the common case.
#[derive(Debug, Clone)]
pub struct MemberEntry<'l> {
	module: &'l Module<'l>,
	token: MetadataToken,
	owner_args: Vec<TypeNode>,
	source: Option<ResolvedToken<'l>>,
}

impl<'l> MemberEntry<'l> {
	fn bare(module: &'l Module<'l>, token: MetadataToken) -> Self {
		Self { module, token, owner_args: Vec::new(), source: None }
	}

	pub fn token(&self) -> MetadataToken {
		self.token
	}

	pub fn module(&self) -> &'l Module<'l> {
		self.module
	}

	pub fn owner_args(&self) -> &[TypeNode] {
		&self.owner_args
	}

	/// The interface (or generic-parameter-constraint) method this entry was contributed from, if
	/// it differs from the entry's own declaring type. See [`interface_declarer`].
	pub fn source(&self) -> Option<ResolvedToken<'l>> {
		self.source
	}

	fn with_source(mut self, source: ResolvedToken<'l>) -> Self {
		self.source = Some(source);
		self
	}

	fn retarget(&self, args: &[TypeNode]) -> Self {
		if args.is_empty() && self.owner_args.is_empty() {
			return self.clone();
		}
		let owner_args = if self.owner_args.is_empty() {
			args.to_vec()
		} else {
			self.owner_args.iter().map(|a| instantiate(a, args, &[])).collect()
		};
		Self { module: self.module, token: self.token, owner_args, source: self.source }
	}
}

/// The flattened member set for one `(type, kind)` pair, as seen after hiding/overriding.
#[derive(Debug)]
pub struct MemberTable<'l> {
	kind: MemberKind,
	entries: Vec<MemberEntry<'l>>,
}

impl<'l> MemberTable<'l> {
	pub fn kind(&self) -> MemberKind {
		self.kind
	}

	pub fn entries(&self) -> &[MemberEntry<'l>] {
		&self.entries
	}

	pub fn by_name<'m>(&'m self, name: &'m str) -> impl Iterator<Item = &'m MemberEntry<'l>> + 'm {
		self.entries.iter().filter(move |e| member_name(e).ok().as_deref() == Some(name))
	}

	/// Which interface member a given entry, reached through an explicit override or a generic
	/// constraint merge, actually implements - the entry's own declaring type, for an entry with
	/// no recorded override source.
	pub fn interface_declarer(&self, entry: &MemberEntry<'l>) -> ResolvedToken<'l> {
		interface_declarer(entry)
	}
}

fn member_name<'l>(entry: &MemberEntry<'l>) -> Result<&'l str> {
	let module = entry.module();
	let root = module.root();
	let idx = entry.token().index().ok_or_else(|| LoadError::invalid_metadata("nil member token"))?;
	let name = match entry.token().kind() {
		Some(TableKind::Field) => root.tables.get_table::<FieldTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		Some(TableKind::MethodDef) => root.tables.get_table::<MethodDefTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		Some(TableKind::Property) => root.tables.get_table::<PropertyTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		Some(TableKind::Event) => root.tables.get_table::<EventTable>().and_then(|t| t.get(idx)).map(|r| r.name),
		_ => None,
	}
	.ok_or_else(|| LoadError::invalid_metadata("member token names no row"))?;
	root.strings.get(name).map_err(|err| LoadError::InvalidMetadata(err.to_string()))
}

/// Step 1 of the membership algorithm for a position that is not already known to be a bare
/// `TypeDef`: a primitive resolves to its fundamental system type, an array to the `Array` system
/// type (no element-specific members - indexers live on `Array` itself), a generic instance to
/// its definition re-instantiated with the instance's own arguments, and a free `Var`/`MVar` to
/// its generic parameter's own constraint set (step 6, see [`get_members_of_generic_param`]).
pub fn get_members_of_signature<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, node: &TypeNode, kind: MemberKind) -> Result<&'l MemberTable<'l>> {
	match node {
		TypeNode::Primitive(primitive) => {
			let (target_module, idx) = loader.resolve_fundamental_type(*primitive)?;
			get_members(loader, (target_module, idx.token()), kind, &[])
		}
		TypeNode::SzArray(_) | TypeNode::Array(_, _) => {
			let (target_module, idx) = loader.resolve_system_type("Array")?;
			get_members(loader, (target_module, idx.token()), kind, &[])
		}
		TypeNode::Class(coded) | TypeNode::ValueType(coded) => {
			let (resolved, args) = resolve_type_spec_aware(loader, module, *coded, &[])?;
			get_members(loader, resolved, kind, &args)
		}
		TypeNode::GenericInst { generic_type, args, .. } => {
			let (resolved, _) = resolve_type_spec_aware(loader, module, *generic_type, &[])?;
			get_members(loader, resolved, kind, args)
		}
		TypeNode::Var(n, ctx) => {
			let owner = ctx.ok_or_else(|| LoadError::invalid_metadata("Var has no annotated declaring-type context"))?;
			get_members_of_generic_param(loader, module, owner, *n, kind)
		}
		TypeNode::MVar(n, ctx) => {
			let owner = ctx.ok_or_else(|| LoadError::invalid_metadata("MVar has no annotated declaring-method context"))?;
			get_members_of_generic_param(loader, module, owner, *n, kind)
		}
		_ => Err(LoadError::invalid_metadata("signature position does not name a queryable type")),
	}
}

/// Computes (or returns the cached) flattened member table for `(module, type_def)`, optionally
/// instantiated with `args` (empty for a non-generic type or an uninstantiated generic
/// definition).
///
/// Follows the seven-step shape the reflection-engine literature uses for this problem:
/// resolve the type and its own generic arguments, recurse into the base type re-instantiating
/// as needed, enumerate this type's own declared members via their contiguous row ranges, then
/// merge declared over inherited applying the per-kind hiding/overriding policy. Callers that
/// don't already know their subject is a bare `TypeDef` - a `TypeSpec`, a primitive, an array, or
/// a free generic parameter - go through [`get_members_of_signature`] instead, which resolves
/// down to this function's `(module, TypeDef token)` shape first.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn get_members<'l>(loader: &'l Loader<'l>, type_token: ResolvedToken<'l>, kind: MemberKind, args: &[TypeNode]) -> Result<&'l MemberTable<'l>> {
	let (module, token) = type_token;
	if let Some(cached) = loader.membership_cache_get((token, kind)) {
		return Ok(cached);
	}

	let idx = token.index().ok_or_else(|| LoadError::invalid_metadata("nil type token"))?;
	let type_def_table = module.root().tables.get_table::<TypeDefTable>().ok_or_else(|| LoadError::invalid_metadata("module has no TypeDef table"))?;
	let row = type_def_table.get(idx).ok_or_else(|| LoadError::invalid_metadata("TypeDef row out of range"))?;

	let inherited = match resolve_base_type(loader, module, row, args)? {
		None => Vec::new(),
		Some((base_module, base_token, base_args)) => get_members(loader, (base_module, base_token), kind, &base_args)?.entries().iter().map(|e| e.retarget(&[])).collect(),
	};

	let declared = declared_members(module, TypeDefIndex(idx as u32 + 1), kind)?;
	let declared: Vec<MemberEntry> = declared.into_iter().map(|token| MemberEntry::bare(module, token)).collect();

	let entries = merge(loader, module, kind, inherited, declared, token, args)?;
	let entries: Vec<MemberEntry> = entries.into_iter().map(|e| e.retarget(args)).collect();

	let table = loader.alloc(MemberTable { kind, entries });
	loader.membership_cache_insert((token, kind), table);
	Ok(table)
}

/// The immediate base type of `type_token`, or `None` for an interface or `System.Object` itself.
/// A convenience wrapper around [`resolve_base_type`] for callers (the CLI harness, in
/// particular) that only want a type's base for display and don't need it re-instantiated with
/// generic arguments.
pub fn base_type<'l>(loader: &'l Loader<'l>, type_token: ResolvedToken<'l>) -> Result<Option<ResolvedToken<'l>>> {
	let (module, token) = type_token;
	let idx = token.index().ok_or_else(|| LoadError::invalid_metadata("nil type token"))?;
	let type_def_table = module.root().tables.get_table::<TypeDefTable>().ok_or_else(|| LoadError::invalid_metadata("module has no TypeDef table"))?;
	let row = type_def_table.get(idx).ok_or_else(|| LoadError::invalid_metadata("TypeDef row out of range"))?;
	Ok(resolve_base_type(loader, module, row, &[])?.map(|(base_module, base_token, _)| (base_module, base_token)))
}

/// Resolves `TypeDef.extends` to a base type, substituting this type's own `args` into the
/// `extends` coded index first if it names a `TypeSpec` (a generic base, e.g. `List<T>` for a
/// `class Foo<T> : List<T>`).
fn resolve_base_type<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, row: &TypeDef, args: &[TypeNode]) -> Result<Option<(&'l Module<'l>, MetadataToken, Vec<TypeNode>)>> {
	match row.extends.table_kind() {
		None => Ok(None),
		Some(TableKind::TypeDef) | Some(TableKind::TypeRef) | Some(TableKind::TypeSpec) => {
			let (resolved, base_args) = resolve_type_spec_aware(loader, module, row.extends, args)?;
			Ok(Some((resolved.0, resolved.1, base_args)))
		}
		_ => Ok(None),
	}
}

/// Resolves a `TypeDefOrRef` coded index to a concrete `(module, token)` pair plus whatever
/// generic arguments it names. `TypeDef`/`TypeRef` resolve with no arguments; `TypeSpec` decodes
/// its signature blob (substituting `args` into it first, for a base type or interface reached
/// through an open generic context - e.g. an `InterfaceImpl` row naming `IIterable<T>` on a type
/// declared as `class Pairs<K, V> : IIterable<Pair<K, V>>`) and expects the result to be a
/// `GenericInst`, `Class` or `ValueType` node.
pub(crate) fn resolve_type_spec_aware<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, coded: TypeDefOrRef, args: &[TypeNode]) -> Result<(ResolvedToken<'l>, Vec<TypeNode>)> {
	match coded.table_kind() {
		Some(TableKind::TypeDef) => Ok(((module, coded.token().expect("checked above")), Vec::new())),
		Some(TableKind::TypeRef) => Ok((loader.resolve_type_ref(module, coded.token().expect("checked above").rid())?, Vec::new())),
		Some(TableKind::TypeSpec) => {
			let rid = coded.token().expect("checked above").rid();
			let spec = module.root().tables.get_table::<crate::metadata::table::TypeSpecTable>().and_then(|t| t.get(rid as usize - 1));
			let spec = spec.ok_or_else(|| LoadError::invalid_metadata("TypeSpec row out of range"))?;
			let bytes = module.root().blobs.get(spec.signature).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
			let node = TypeSignature::new(bytes).read().map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
			let node = if args.is_empty() { node } else { instantiate(&node, args, &[]) };
			match node {
				TypeNode::GenericInst { generic_type, args: inst_args, .. } => {
					let (resolved, _) = resolve_type_spec_aware(loader, module, generic_type, &[])?;
					Ok((resolved, inst_args))
				}
				TypeNode::Class(coded) | TypeNode::ValueType(coded) => {
					let (resolved, _) = resolve_type_spec_aware(loader, module, coded, &[])?;
					Ok((resolved, Vec::new()))
				}
				_ => Err(LoadError::invalid_metadata("TypeSpec did not decode to a class or generic instance")),
			}
		}
		_ => Err(LoadError::invalid_metadata("coded index does not name a TypeDef, TypeRef or TypeSpec")),
	}
}

/// Resolves a `TypeDefOrRef` to a `(module, token)` pair, discarding any generic arguments a
/// `TypeSpec` target carries - for callers (name rendering, in particular) that only need to know
/// which type-def a position ultimately names.
pub(crate) fn resolve_type_def_or_ref<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, coded: TypeDefOrRef) -> Result<ResolvedToken<'l>> {
	Ok(resolve_type_spec_aware(loader, module, coded, &[])?.0)
}

fn is_interface(module: &Module<'_>, token: MetadataToken) -> Result<bool> {
	let idx = token.index().ok_or_else(|| LoadError::invalid_metadata("nil type token"))?;
	let row = module.root().tables.get_table::<TypeDefTable>().and_then(|t| t.get(idx)).ok_or_else(|| LoadError::invalid_metadata("TypeDef row out of range"))?;
	Ok(row.flags.contains(TypeAttributes::INTERFACE))
}

/// Step 6 of the membership algorithm: a free `Var`/`MVar` has no `TypeDef` of its own, so its
/// member table is fabricated from its `GenericParam` row's constraints instead. The base is the
/// constraint set's one non-interface class constraint if present, else `System.ValueType` when
/// the parameter carries the not-nullable-value-type special constraint, else `System.Object`;
/// every interface constraint is then merged in on top, each entry's `source` recording the
/// `GenericParamConstraint` row that contributed it (so `interface_declarer` can answer "which
/// constraint interface does this member come from" the same way it answers for a class's
/// explicit interface overrides).
fn get_members_of_generic_param<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, owner: MetadataToken, number: u32, kind: MemberKind) -> Result<&'l MemberTable<'l>> {
	let params = module.root().tables.get_table::<GenericParamTable>().ok_or_else(|| LoadError::invalid_metadata("module has no GenericParam table"))?;
	let (param_idx, param_row) = params
		.rows()
		.iter()
		.enumerate()
		.find(|(_, r)| r.owner.token() == Some(owner) && r.number as u32 == number)
		.ok_or_else(|| LoadError::invalid_metadata("no GenericParam row for this var/mvar ordinal"))?;
	let param_token = GenericParamIndex(param_idx as u32 + 1).token();

	if let Some(cached) = loader.membership_cache_get((param_token, kind)) {
		return Ok(cached);
	}

	let constraint_rows: Vec<(MetadataToken, &GenericParamConstraint)> = module
		.root()
		.tables
		.get_table::<GenericParamConstraintTable>()
		.map(|t| {
			t.rows()
				.iter()
				.enumerate()
				.filter(|(_, c)| c.owner.idx() == param_idx)
				.map(|(i, c)| (MetadataToken::new(TableKind::GenericParamConstraint, i as u32 + 1), c))
				.collect()
		})
		.unwrap_or_default();

	let mut class_constraint: Option<(ResolvedToken<'l>, Vec<TypeNode>)> = None;
	let mut interface_constraints: Vec<(MetadataToken, ResolvedToken<'l>, Vec<TypeNode>)> = Vec::new();
	for (constraint_token, constraint) in &constraint_rows {
		let (resolved, args) = resolve_type_spec_aware(loader, module, constraint.constraint, &[])?;
		if is_interface(resolved.0, resolved.1)? {
			interface_constraints.push((*constraint_token, resolved, args));
		} else if class_constraint.is_none() {
			class_constraint = Some((resolved, args));
		}
	}

	let base = match class_constraint {
		Some(base) => base,
		None if param_row.flags.contains(GenericParamAttributes::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT) => {
			let (m, idx) = loader.resolve_system_type("ValueType")?;
			((m, idx.token()), Vec::new())
		}
		None => {
			let (m, idx) = loader.resolve_system_type("Object")?;
			((m, idx.token()), Vec::new())
		}
	};

	let base_table = get_members(loader, base.0, kind, &base.1)?;
	let mut entries: Vec<MemberEntry> = base_table.entries().iter().map(|e| e.retarget(&[])).collect();

	for (constraint_token, resolved, args) in interface_constraints {
		let constraint_source = (module, constraint_token);
		let iface_table = get_members(loader, resolved, kind, &args)?;
		for entry in iface_table.entries() {
			if entries.iter().any(|e| e.token() == entry.token() && std::ptr::eq(e.module(), entry.module())) {
				continue;
			}
			entries.push(entry.retarget(&[]).with_source(constraint_source));
		}
	}

	let table = loader.alloc(MemberTable { kind, entries });
	loader.membership_cache_insert((param_token, kind), table);
	Ok(table)
}

/// This type's own declared members of `kind`, read off the contiguous row range its `TypeDef`
/// (or, for properties/events, its `PropertyMap`/`EventMap` row) names. Exposed to the query layer
/// so binding-flags filters that care whether a member is inherited (`DeclaredOnly`,
/// `FlattenHierarchy`) can tell a flattened table's entries apart without re-deriving this range
/// logic: an entry is declared directly on `type_def` iff its token is in this list (`merge`
/// always rewrites a replaced inherited entry's token to the declared/overriding one, so this
/// check alone is enough - no entry can carry an ancestor's token while secretly "belonging" here).
pub(crate) fn declared_members(module: &Module<'_>, type_def: TypeDefIndex, kind: MemberKind) -> Result<Vec<MetadataToken>> {
	let type_defs = module.root().tables.get_table::<TypeDefTable>().ok_or_else(|| LoadError::invalid_metadata("module has no TypeDef table"))?;
	let idx = type_def.idx();
	let row = type_defs.get(idx).ok_or_else(|| LoadError::invalid_metadata("TypeDef row out of range"))?;

	match kind {
		MemberKind::Field => {
			let fields = module.root().tables.get_table::<FieldTable>().map(|t| t.len()).unwrap_or(0);
			let start = row.field_list.idx();
			let end = type_defs.get(idx + 1).map(|next| next.field_list.idx()).unwrap_or(fields);
			Ok((start..end).map(|i| FieldIndex(i as u32 + 1).token()).collect())
		}
		MemberKind::Method => {
			let methods = module.root().tables.get_table::<MethodDefTable>().map(|t| t.len()).unwrap_or(0);
			let start = row.method_list.idx();
			let end = type_defs.get(idx + 1).map(|next| next.method_list.idx()).unwrap_or(methods);
			Ok((start..end).map(|i| MethodDefIndex(i as u32 + 1).token()).collect())
		}
		MemberKind::Property => {
			let Some(maps) = module.root().tables.get_table::<PropertyMapTable>() else { return Ok(Vec::new()) };
			let Some((map_idx, map_row)) = maps.rows().iter().enumerate().find(|(_, m)| m.parent.idx() == idx) else { return Ok(Vec::new()) };
			let properties = module.root().tables.get_table::<PropertyTable>().map(|t| t.len()).unwrap_or(0);
			let start = map_row.property_list.idx();
			let end = maps.get(map_idx + 1).map(|next| next.property_list.idx()).unwrap_or(properties);
			Ok((start..end).map(|i| PropertyIndex(i as u32 + 1).token()).collect())
		}
		MemberKind::Event => {
			let Some(maps) = module.root().tables.get_table::<EventMapTable>() else { return Ok(Vec::new()) };
			let Some((map_idx, map_row)) = maps.rows().iter().enumerate().find(|(_, m)| m.parent.idx() == idx) else { return Ok(Vec::new()) };
			let events = module.root().tables.get_table::<EventTable>().map(|t| t.len()).unwrap_or(0);
			let start = map_row.event_list.idx();
			let end = maps.get(map_idx + 1).map(|next| next.event_list.idx()).unwrap_or(events);
			Ok((start..end).map(|i| EventIndex(i as u32 + 1).token()).collect())
		}
	}
}

/// Merges `declared` over `inherited` per the per-kind hiding policy: fields/properties/events
/// hide an inherited member of the same name outright; methods hide-by-signature, so a declared
/// method only drops the inherited entry it structurally matches (after substituting `args` into
/// both sides), and an explicit `MethodImpl` override row drops whichever inherited entry it
/// names even when the signatures were written differently. At most one inherited entry may match
/// a declared method by signature; a second match is ambiguous metadata, not a silent pick.
fn merge<'l>(
	loader: &'l Loader<'l>,
	module: &'l Module<'l>,
	kind: MemberKind,
	inherited: Vec<MemberEntry<'l>>,
	declared: Vec<MemberEntry<'l>>,
	declaring_type: MetadataToken,
	args: &[TypeNode],
) -> Result<Vec<MemberEntry<'l>>> {
	if kind != MemberKind::Method {
		let declared_names: Vec<&str> = declared.iter().filter_map(|e| member_name(e).ok()).collect();
		let mut entries: Vec<MemberEntry> = inherited.into_iter().filter(|e| member_name(e).ok().map(|n| !declared_names.contains(&n)).unwrap_or(true)).collect();
		entries.extend(declared);
		return Ok(entries);
	}

	let mut entries = inherited;
	let overrides = explicit_overrides(loader, module)?;

	for method in declared {
		let method_token = method.token();
		if let Some(target) = overrides.get(&method_token) {
			entries.retain(|e| !(e.token() == target.1 && std::ptr::eq(e.module(), target.0)));
			entries.push(method.with_source(*target));
			continue;
		}

		let method_name = member_name(&method)?;
		let method_sig = method_signature(method.module(), method.token(), declaring_type, args)?;

		let mut matches: Vec<usize> = Vec::new();
		for (i, existing) in entries.iter().enumerate() {
			if member_name(existing)? != method_name {
				continue;
			}
			let existing_sig = method_signature(existing.module(), existing.token(), existing.token(), existing.owner_args())?;
			if existing_sig.parameters.len() != method_sig.parameters.len() {
				continue;
			}
			if signatures_equal(&existing_sig.return_type, &method_sig.return_type) && existing_sig.parameters.iter().zip(&method_sig.parameters).all(|(a, b)| signatures_equal(a, b)) {
				matches.push(i);
			}
		}

		match matches.len() {
			0 => entries.push(method),
			1 => entries[matches[0]] = method,
			_ => return Err(LoadError::AmbiguousMatch(format!("more than one inherited method named '{method_name}' matches by signature"))),
		}
	}

	Ok(entries)
}

/// `MethodImpl` rows declare an explicit override independent of name/signature matching: `body`
/// is the overriding `MethodDef`, `declaration` the base or interface method it overrides.
/// `declaration` is resolved through [`crate::loader::Loader::resolve_member_ref`] when it names a
/// `MemberRef` rather than a bare `MethodDef` - the usual case for an interface or base method
/// declared in another module, where a raw token comparison against `body`'s own module would
/// never match. Keyed by `body` so `merge` can look up, for a given declared method, which
/// inherited entry it is meant to replace.
fn explicit_overrides<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>) -> Result<fxhash::FxHashMap<MetadataToken, ResolvedToken<'l>>> {
	let mut map = fxhash::FxHashMap::default();
	if let Some(impls) = module.root().tables.get_table::<MethodImplTable>() {
		for row in impls.rows() {
			let Some(body) = row.body.token() else { continue };
			let resolved = match row.declaration.table_kind() {
				Some(TableKind::MethodDef) => (module, row.declaration.token().expect("checked above")),
				Some(TableKind::MemberRef) => loader.resolve_member_ref(module, row.declaration.token().expect("checked above").rid())?,
				_ => continue,
			};
			map.insert(body, resolved);
		}
	}
	Ok(map)
}

/// Reads and, if `args` is non-empty, instantiates a `MethodDef`'s signature, annotating any
/// still-free `Var`/`MVar` with its declaring type/method before substitution so a variable that
/// survives an under-supplied instantiation keeps comparing correctly against unrelated variables
/// sharing the same ordinal.
fn method_signature<'l>(module: &'l Module<'l>, token: MetadataToken, declaring_type: MetadataToken, args: &[TypeNode]) -> Result<crate::signature::MethodSignature> {
	let idx = token.index().ok_or_else(|| LoadError::invalid_metadata("nil method token"))?;
	let row = module.root().tables.get_table::<MethodDefTable>().and_then(|t| t.get(idx)).ok_or_else(|| LoadError::invalid_metadata("MethodDef row out of range"))?;
	let bytes = module.root().blobs.get(row.signature).map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;
	let sig = MethodSignatureView::new(bytes).read().map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;

	let return_type = annotate_context(&sig.return_type, Some(declaring_type), Some(token));
	let parameters: Vec<TypeNode> = sig.parameters.iter().map(|p| annotate_context(p, Some(declaring_type), Some(token))).collect();

	if args.is_empty() {
		Ok(crate::signature::MethodSignature { return_type, parameters, ..sig })
	} else {
		Ok(crate::signature::MethodSignature {
			calling_convention: sig.calling_convention,
			generic_param_count: sig.generic_param_count,
			return_type: instantiate(&return_type, args, &[]),
			parameters: parameters.iter().map(|p| instantiate(p, args, &[])).collect(),
		})
	}
}

/// Every interface a type implements, directly or through another implemented interface,
/// deduplicated by `(module location, token, instantiation)` identity. Used by the query layer to
/// answer `GetInterfaces` without walking `InterfaceImpl` rows itself. Each result carries the
/// generic arguments it was reached with, so a type implementing `IIterable<Pair<K, V>>` through a
/// `TypeSpec`-valued `InterfaceImpl.interface` row reports the instantiated interface, not just its
/// open generic definition.
pub fn interface_closure<'l>(loader: &'l Loader<'l>, type_token: ResolvedToken<'l>, args: &[TypeNode]) -> Result<Vec<(ResolvedToken<'l>, Vec<TypeNode>)>> {
	let mut seen: Vec<(ResolvedToken<'l>, Vec<TypeNode>)> = Vec::new();
	let mut stack: Vec<(ResolvedToken<'l>, Vec<TypeNode>)> = vec![(type_token, args.to_vec())];
	let mut result = Vec::new();

	while let Some(((module, token), current_args)) = stack.pop() {
		let idx = token.index().ok_or_else(|| LoadError::invalid_metadata("nil type token"))?;
		let Some(impls) = module.root().tables.get_table::<InterfaceImplTable>() else { continue };
		for row in impls.rows() {
			if row.class.idx() != idx {
				continue;
			}
			let (resolved, inst_args) = resolve_type_spec_aware(loader, module, row.interface, &current_args)?;
			let already_seen = seen.iter().any(|((m, t), a)| std::ptr::eq(*m, resolved.0) && *t == resolved.1 && a.len() == inst_args.len() && a.iter().zip(&inst_args).all(|(x, y)| signatures_equal(x, y)));
			if already_seen {
				continue;
			}
			seen.push((resolved, inst_args.clone()));
			result.push((resolved, inst_args.clone()));
			stack.push((resolved, inst_args));
		}
	}

	Ok(result)
}

/// Which type in an interface closure actually declares a given interface method, or a generic
/// parameter's constraint. Reported by `explicit_overrides` (an explicit `MethodImpl` override,
/// resolved across `MemberRef` when necessary) or by a generic parameter's interface-constraint
/// merge, both of which stamp `MemberEntry::source` at construction time; falls back to the
/// entry's own module/token when no override source was recorded.
pub fn interface_declarer<'l>(entry: &MemberEntry<'l>) -> ResolvedToken<'l> {
	entry.source().unwrap_or((entry.module(), entry.token()))
}

/// Resolves a `MemberRef`'s `(parent, name, signature)` triple to the concrete `Field` or
/// `MethodDef` it names, by flattening the parent type's membership and matching by name plus
/// (for methods) decoded signature.
pub(crate) fn resolve_member_ref_target<'l>(loader: &'l Loader<'l>, module: &'l Module<'l>, parent: TypeDefIndex, name: &str, signature: &[u8]) -> Result<ResolvedToken<'l>> {
	const FIELD_CALLING_CONVENTION: u8 = 0x06;

	if signature.first() == Some(&FIELD_CALLING_CONVENTION) {
		let table = get_members(loader, (module, parent.token()), MemberKind::Field, &[])?;
		for entry in table.entries() {
			if member_name(entry).ok().as_deref() == Some(name) {
				return Ok((entry.module(), entry.token()));
			}
		}
		return Err(LoadError::UnresolvedReference(format!("field '{name}' not found")));
	}

	let target_sig = MethodSignatureView::new(signature).read().map_err(|err| LoadError::InvalidMetadata(err.to_string()))?;

	let table = get_members(loader, (module, parent.token()), MemberKind::Method, &[])?;
	for entry in table.entries() {
		if member_name(entry).ok().as_deref() != Some(name) {
			continue;
		}
		let candidate_sig = method_signature(entry.module(), entry.token(), entry.token(), entry.owner_args())?;
		if candidate_sig.parameters.len() != target_sig.parameters.len() {
			continue;
		}
		if signatures_equal(&candidate_sig.return_type, &target_sig.return_type) && candidate_sig.parameters.iter().zip(&target_sig.parameters).all(|(a, b)| signatures_equal(a, b)) {
			return Ok((entry.module(), entry.token()));
		}
	}

	Err(LoadError::UnresolvedReference(format!("method '{name}' not found")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::locator::{DefaultLoaderConfiguration, FileSystemLocator};
	use crate::signature::PrimitiveType;

	fn string_heap(entries: &[&str]) -> (Vec<u8>, Vec<u32>) {
		let mut bytes = vec![0u8];
		let mut offsets = Vec::new();
		for s in entries {
			offsets.push(bytes.len() as u32);
			bytes.extend_from_slice(s.as_bytes());
			bytes.push(0);
		}
		(bytes, offsets)
	}

	fn blob_heap(entries: &[&[u8]]) -> (Vec<u8>, Vec<u32>) {
		let mut bytes = vec![0u8];
		let mut offsets = Vec::new();
		for e in entries {
			assert!(e.len() < 0x80);
			offsets.push(bytes.len() as u32);
			bytes.push(e.len() as u8);
			bytes.extend_from_slice(e);
		}
		(bytes, offsets)
	}

	/// Builds a `BSJB` metadata root out of named stream bodies, computing every stream
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

	fn write_temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
		let path = std::env::temp_dir().join(format!("reflect-cil-membership-test-{}-{}", std::process::id(), name));
		std::fs::write(&path, bytes).unwrap();
		path
	}

	fn type_def_row(flags: u32, name: u32, namespace: u32, extends: u16, field_list: u16, method_list: u16) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&flags.to_le_bytes());
		b.extend_from_slice(&(name as u16).to_le_bytes());
		b.extend_from_slice(&(namespace as u16).to_le_bytes());
		b.extend_from_slice(&extends.to_le_bytes());
		b.extend_from_slice(&field_list.to_le_bytes());
		b.extend_from_slice(&method_list.to_le_bytes());
		b
	}

	fn method_def_row(name: u32, signature: u32) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&0u32.to_le_bytes()); // rva
		b.extend_from_slice(&0u16.to_le_bytes()); // impl_flags
		b.extend_from_slice(&0u16.to_le_bytes()); // flags
		b.extend_from_slice(&(name as u16).to_le_bytes());
		b.extend_from_slice(&(signature as u16).to_le_bytes());
		b.extend_from_slice(&1u16.to_le_bytes()); // param_list
		b
	}

	fn field_row(name: u32, signature: u32) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&0u16.to_le_bytes()); // flags
		b.extend_from_slice(&(name as u16).to_le_bytes());
		b.extend_from_slice(&(signature as u16).to_le_bytes());
		b
	}

	fn interface_impl_row(class: u16, interface: u16) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&class.to_le_bytes());
		b.extend_from_slice(&interface.to_le_bytes());
		b
	}

	fn member_ref_row(class: u16, name: u32, signature: u32) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&class.to_le_bytes());
		b.extend_from_slice(&(name as u16).to_le_bytes());
		b.extend_from_slice(&(signature as u16).to_le_bytes());
		b
	}

	fn method_impl_row(class: u16, body: u16, declaration: u16) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&class.to_le_bytes());
		b.extend_from_slice(&body.to_le_bytes());
		b.extend_from_slice(&declaration.to_le_bytes());
		b
	}

	fn type_spec_row(signature: u32) -> Vec<u8> {
		(signature as u16).to_le_bytes().to_vec()
	}

	fn generic_param_row(number: u16, flags: u16, owner: u16, name: u32) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&number.to_le_bytes());
		b.extend_from_slice(&flags.to_le_bytes());
		b.extend_from_slice(&owner.to_le_bytes());
		b.extend_from_slice(&(name as u16).to_le_bytes());
		b
	}

	fn generic_param_constraint_row(owner: u16, constraint: u16) -> Vec<u8> {
		let mut b = Vec::new();
		b.extend_from_slice(&owner.to_le_bytes());
		b.extend_from_slice(&constraint.to_le_bytes());
		b
	}

	/// A `#~` stream header plus, for each `(row count, row bytes)` pair given in ascending
	/// table-id order, its row count and then its row data, matching how `TableHeap::read`
	/// expects both sections laid out.
	fn build_table_stream(valid: u64, tables: &[(u32, Vec<u8>)]) -> Vec<u8> {
		let mut buf = Vec::new();
		buf.extend_from_slice(&0u32.to_le_bytes()); // reserved_0
		buf.push(1); // major_version
		buf.push(0); // minor_version
		buf.push(0); // heap_sizes: all 2-byte indices
		buf.push(0); // reserved_1
		buf.extend_from_slice(&valid.to_le_bytes());
		buf.extend_from_slice(&0u64.to_le_bytes()); // sorted
		for (count, _) in tables {
			buf.extend_from_slice(&count.to_le_bytes());
		}
		for (_, rows) in tables {
			buf.extend_from_slice(rows);
		}
		buf
	}

	/// `Object`, an interface `IFace` with one method `F0`, two independent classes each
	/// implementing `IFace` and overriding `F0` - one via a same-module `MethodDef` declaration,
	/// one via a `MemberRef` declaration naming `IFace.F0` by signature - a third class
	/// implementing `IFace<Object>` through a `TypeSpec`, a `Derived` class to check an
	/// inherited override keeps its recorded source, a `FieldBase`/`FieldDerived` pair for field
	/// hiding, and three standalone same-signature `M` methods used to exercise ambiguous
	/// signature matching directly.
	fn explicit_override_fixture() -> Vec<u8> {
		let (strings, off) = string_heap(&["System", "Object", "IFace", "Base", "Derived", "Base2", "Base3", "FieldBase", "FieldDerived", "F0", "F1", "F2", "M", "X"]);
		let system = off[0];
		let object = off[1];
		let iface = off[2];
		let base = off[3];
		let derived = off[4];
		let base2 = off[5];
		let base3 = off[6];
		let field_base = off[7];
		let field_derived = off[8];
		let f0 = off[9];
		let f1 = off[10];
		let f2 = off[11];
		let m = off[12];
		let x = off[13];
		let empty = 0u32;

		let (blobs, boff) = blob_heap(&[
			&[0x00, 0x00, 0x01],             // DEFAULT, 0 params, return void
			&[0x15, 0x12, 0x08, 0x01, 0x1C], // GENERICINST class TypeDefOrRef(2,TypeDef) <Object>
			&[0x06, 0x08],                   // FIELD, Int32
		]);
		let void_sig = boff[0];
		let type_spec_sig = boff[1];
		let field_sig = boff[2];

		let type_defs = [
			type_def_row(0, object, system, 0, 1, 1),       // 1 Object
			type_def_row(0xA0, iface, empty, 0, 1, 1),      // 2 IFace (interface, abstract)
			type_def_row(0, base, empty, 4, 1, 2),          // 3 Base : Object, implements IFace
			type_def_row(0, derived, empty, 12, 1, 3),      // 4 Derived : Base
			type_def_row(0, base2, empty, 4, 1, 3),         // 5 Base2 : Object, implements IFace
			type_def_row(0, base3, empty, 4, 1, 4),         // 6 Base3 : Object, implements IFace<Object>
			type_def_row(0, field_base, empty, 4, 1, 4),    // 7 FieldBase : Object
			type_def_row(0, field_derived, empty, 28, 2, 4), // 8 FieldDerived : FieldBase
		]
		.concat();

		let fields = [field_row(x, field_sig), field_row(x, field_sig)].concat();

		let methods = [
			method_def_row(f0, void_sig), // 1 IFace.F0
			method_def_row(f1, void_sig), // 2 Base.F1
			method_def_row(f2, void_sig), // 3 Base2.F2
			method_def_row(m, void_sig),  // 4 standalone M
			method_def_row(m, void_sig),  // 5 standalone M
			method_def_row(m, void_sig),  // 6 standalone M
		]
		.concat();

		let interface_impls = [
			interface_impl_row(3, 8), // Base implements IFace (TypeDef, rid 2)
			interface_impl_row(5, 8), // Base2 implements IFace
			interface_impl_row(6, 6), // Base3 implements TypeSpec(rid 1) -> IFace<Object>
		]
		.concat();

		let member_refs = [member_ref_row(16, f0, void_sig)].concat(); // IFace.F0 by name + signature

		let method_impls = [
			method_impl_row(3, 4, 2), // Base.F1 overrides IFace.F0 (bare MethodDef declaration)
			method_impl_row(5, 6, 3), // Base2.F2 overrides MemberRef(1) -> IFace.F0
		]
		.concat();

		let type_specs = [type_spec_row(type_spec_sig)].concat();

		let valid = (1u64 << 0x02) | (1u64 << 0x04) | (1u64 << 0x06) | (1u64 << 0x09) | (1u64 << 0x0A) | (1u64 << 0x19) | (1u64 << 0x1B);
		let table_stream = build_table_stream(
			valid,
			&[(8, type_defs), (2, fields), (6, methods), (3, interface_impls), (1, member_refs), (2, method_impls), (1, type_specs)],
		);

		build_metadata_root(&[("#Strings", &strings), ("#Blob", &blobs), ("#~", &table_stream)])
	}

	/// `Object`, `ValueType`, an interface `IFace2` with one method `G0`, and a `Generic1` type
	/// with two generic parameters: one not-nullable-value-type-constrained with an `IFace2`
	/// constraint, one with no constraints at all.
	fn generic_param_fixture() -> Vec<u8> {
		let (strings, off) = string_heap(&["System", "Object", "ValueType", "IFace2", "Generic1", "G0", "T", "U"]);
		let system = off[0];
		let object = off[1];
		let value_type = off[2];
		let iface2 = off[3];
		let generic1 = off[4];
		let g0 = off[5];
		let t = off[6];
		let u = off[7];
		let empty = 0u32;

		let (blobs, boff) = blob_heap(&[&[0x00, 0x00, 0x01]]);
		let void_sig = boff[0];

		let type_defs = [
			type_def_row(0, object, system, 0, 1, 1),     // 1 Object
			type_def_row(0, value_type, system, 4, 1, 1), // 2 ValueType : Object
			type_def_row(0xA0, iface2, empty, 0, 1, 1),   // 3 IFace2 (interface)
			type_def_row(0, generic1, empty, 4, 1, 2),    // 4 Generic1 : Object
		]
		.concat();

		let methods = [method_def_row(g0, void_sig)].concat(); // 1 IFace2.G0

		let generic_params = [
			generic_param_row(0, 0x0008, 8, t), // T: not-nullable-value-type, owner Generic1 (TypeDef)
			generic_param_row(1, 0x0000, 8, u), // U: unconstrained
		]
		.concat();

		let generic_param_constraints = [generic_param_constraint_row(1, 12)].concat(); // T : IFace2

		let valid = (1u64 << 0x02) | (1u64 << 0x06) | (1u64 << 0x2A) | (1u64 << 0x2C);
		let table_stream = build_table_stream(valid, &[(4, type_defs), (1, methods), (2, generic_params), (1, generic_param_constraints)]);

		build_metadata_root(&[("#Strings", &strings), ("#Blob", &blobs), ("#~", &table_stream)])
	}

	#[test]
	fn explicit_method_impl_with_a_bare_method_def_declaration_records_the_interface_method_as_source() {
		let path = write_temp_file("override-methoddef.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let table = get_members(&loader, (module, TypeDefIndex(3).token()), MemberKind::Method, &[]).unwrap();
		let f1 = table.by_name("F1").next().expect("Base declares F1");
		assert_eq!(interface_declarer(f1).1, MethodDefIndex(1).token());

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn an_inherited_explicit_override_keeps_reporting_its_interface_source() {
		let path = write_temp_file("override-inherited.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let table = get_members(&loader, (module, TypeDefIndex(4).token()), MemberKind::Method, &[]).unwrap();
		let f1 = table.by_name("F1").next().expect("Derived inherits F1");
		assert_eq!(interface_declarer(f1).1, MethodDefIndex(1).token());

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn explicit_method_impl_with_a_member_ref_declaration_resolves_to_the_interface_method() {
		let path = write_temp_file("override-memberref.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let table = get_members(&loader, (module, TypeDefIndex(5).token()), MemberKind::Method, &[]).unwrap();
		let f2 = table.by_name("F2").next().expect("Base2 declares F2");
		assert_eq!(interface_declarer(f2).1, MethodDefIndex(1).token());

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn interface_closure_finds_a_directly_implemented_interface() {
		let path = write_temp_file("closure-direct.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let closure = interface_closure(&loader, (module, TypeDefIndex(3).token()), &[]).unwrap();
		assert_eq!(closure.len(), 1);
		assert_eq!(closure[0].0.1, TypeDefIndex(2).token());
		assert!(closure[0].1.is_empty());

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn interface_closure_resolves_a_generic_interface_reached_through_a_type_spec() {
		let path = write_temp_file("closure-typespec.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let closure = interface_closure(&loader, (module, TypeDefIndex(6).token()), &[]).unwrap();
		assert_eq!(closure.len(), 1);
		assert_eq!(closure[0].0.1, TypeDefIndex(2).token());
		assert_eq!(closure[0].1, vec![TypeNode::Primitive(PrimitiveType::Object)]);

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn a_declared_field_hides_an_inherited_field_of_the_same_name() {
		let path = write_temp_file("field-hiding.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let table = get_members(&loader, (module, TypeDefIndex(8).token()), MemberKind::Field, &[]).unwrap();
		assert_eq!(table.entries().len(), 1);
		assert_eq!(table.entries()[0].token(), FieldIndex(2).token());

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn merge_rejects_two_inherited_methods_matching_the_same_signature_instead_of_picking_one() {
		let path = write_temp_file("ambiguous-merge.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let inherited = vec![MemberEntry::bare(module, MethodDefIndex(4).token()), MemberEntry::bare(module, MethodDefIndex(5).token())];
		let declared = vec![MemberEntry::bare(module, MethodDefIndex(6).token())];
		let result = merge(&loader, module, MemberKind::Method, inherited, declared, TypeDefIndex(1).token(), &[]);
		assert!(matches!(result, Err(LoadError::AmbiguousMatch(_))));

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn get_members_caches_the_computed_table_by_identity() {
		let path = write_temp_file("cache-identity.dll", &explicit_override_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let first = get_members(&loader, (module, TypeDefIndex(3).token()), MemberKind::Method, &[]).unwrap();
		let second = get_members(&loader, (module, TypeDefIndex(3).token()), MemberKind::Method, &[]).unwrap();
		assert!(std::ptr::eq(first, second));

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn generic_param_with_not_nullable_value_type_constraint_falls_back_to_value_type_and_merges_its_interface_constraint() {
		let path = write_temp_file("genericparam-valuetype.dll", &generic_param_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let owner = TypeDefIndex(4).token();
		let table = get_members_of_generic_param(&loader, module, owner, 0, MemberKind::Method).unwrap();
		assert_eq!(table.entries().len(), 1);
		let entry = &table.entries()[0];
		assert_eq!(member_name(entry).unwrap(), "G0");
		assert_eq!(interface_declarer(entry).1, MetadataToken::new(TableKind::GenericParamConstraint, 1));

		std::fs::remove_file(&path).ok();
	}

	#[test]
	fn generic_param_without_any_constraint_falls_back_to_object_with_no_members() {
		let path = write_temp_file("genericparam-object.dll", &generic_param_fixture());
		let loader = Loader::new(FileSystemLocator::new(std::iter::empty()), DefaultLoaderConfiguration);
		let assembly = loader.get_or_load_assembly(path.to_str().unwrap()).unwrap();
		let module = assembly.manifest_module();

		let owner = TypeDefIndex(4).token();
		let table = get_members_of_generic_param(&loader, module, owner, 1, MemberKind::Method).unwrap();
		assert!(table.entries().is_empty());

		std::fs::remove_file(&path).ok();
	}
}
