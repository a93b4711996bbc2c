use buildgraph_rs::{Interner, Item, ItemType, Label, LocalInterner, Origin, RecordMap};

#[derive(Debug)]
struct Declaration {
    kind: ItemType,
}

impl Item for Declaration {
    fn item_type(&self) -> ItemType {
        self.kind
    }
}

// (label, kind, deps) in the order a driver might finish loading them.
const BUILD_FILES: &[(&str, ItemType, &[&str])] = &[
    ("//app:app", ItemType::Target, &["//base:base", "//net:net", "//build:defaults"]),
    ("//net:net", ItemType::Target, &["//base:base"]),
    ("//build:defaults", ItemType::Config, &[]),
    ("//base:base", ItemType::Target, &["//build:defaults"]),
    ("//loop:a", ItemType::Target, &["//loop:b"]),
    ("//loop:b", ItemType::Target, &["//loop:a"]),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let interner = Interner::new();
    let mut atoms = LocalInterner::new(&interner);
    let build_file = atoms.intern("//BUILD.gn");
    let mut map = RecordMap::new();

    for (line, (text, kind, deps)) in BUILD_FILES.iter().enumerate() {
        let label = Label::parse(&mut atoms, text)?;
        let origin = Origin::new(build_file, line as u32 + 1, 1);
        let (_, id) = map.try_emplace(label, origin, *kind);

        for dep in deps.iter() {
            let dep_label = Label::parse(&mut atoms, dep)?;
            let (created, dep_id) = map.try_emplace(dep_label, origin, ItemType::Unknown);
            if created {
                println!("  forward reference to {dep_label} from {origin}");
            }
            map.add_dep(id, dep_id);
        }

        map[id].set_item(Box::new(Declaration { kind: *kind }))?;
        println!("loaded {label}");

        if map[id].can_resolve() {
            map.resolve(id, |record| println!("  resolved {}", record.label()));
        }
    }

    println!("\nRecords that never resolved:");
    for record in map.iter().filter(|record| !record.resolved()) {
        let blockers: Vec<String> = map
            .sorted_unresolved_deps(record.id())
            .into_iter()
            .map(|dep| map[dep].label().to_string())
            .collect();
        println!("  {} waits on [{}]", record.label(), blockers.join(", "));
    }

    println!("\n{} records, {} interned strings", map.len(), interner.len());
    Ok(())
}
