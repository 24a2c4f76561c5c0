//! Manual-inspection tool, not a product surface the core depends on: loads a single assembly
//! and prints its type table (name, namespace, base type, member counts).

use std::path::{Path, PathBuf};

use reflect_cil::locator::{DefaultLoaderConfiguration, FileSystemLocator};
use reflect_cil::membership::{self, MemberKind};
use reflect_cil::name::{type_def_name, NameMode};
use reflect_cil::Loader;

fn main() {
	let Some(path) = std::env::args().nth(1) else {
		eprintln!("usage: cli-reflect <path-to-assembly>");
		std::process::exit(2);
	};

	let root = PathBuf::from(&path).parent().map(Path::to_path_buf).unwrap_or_default();
	let locator = FileSystemLocator::new([root]);
	let loader = Loader::new(locator, DefaultLoaderConfiguration);

	let assembly = match loader.get_or_load_assembly(&path) {
		Ok(assembly) => assembly,
		Err(err) => {
			eprintln!("failed to load '{path}': {err}");
			std::process::exit(1);
		}
	};

	let module = assembly.manifest_module();
	println!("{:<40} {:<30} {:<40} {:>6} {:>7} {:>9} {:>6}", "Name", "Namespace", "Base type", "Fields", "Methods", "Properties", "Events");

	for (idx, def) in module.type_defs().iter().enumerate() {
		let type_def = reflect_cil::metadata::indices::table_index::TypeDefIndex(idx as u32 + 1);
		let name = module.root().strings.get(def.type_name).unwrap_or("<invalid>");
		let namespace = module.root().strings.get(def.type_namespace).unwrap_or("<invalid>");

		let base = match membership::base_type(&loader, (module, type_def.token())) {
			Ok(Some((base_module, base_token))) => {
				let base_idx = reflect_cil::metadata::indices::table_index::TypeDefIndex(base_token.rid());
				type_def_name(&loader, base_module, base_idx, NameMode::Simple).ok().flatten().unwrap_or_else(|| "<unresolved>".to_owned())
			}
			Ok(None) => String::new(),
			Err(_) => "<unresolved>".to_owned(),
		};

		let count = |kind: MemberKind| membership::get_members(&loader, (module, type_def.token()), kind, &[]).map(|t| t.entries().len()).unwrap_or(0);

		println!(
			"{:<40} {:<30} {:<40} {:>6} {:>7} {:>9} {:>6}",
			name,
			namespace,
			base,
			count(MemberKind::Field),
			count(MemberKind::Method),
			count(MemberKind::Property),
			count(MemberKind::Event),
		);
	}
}
