use super::*;
use crate::collect::collect_unit;
use crate::table::SymbolTable;
use rustc_hash::FxHashSet;

fn scan(sources: &[(&str, &str)]) -> ModificationMap {
    let mut table = SymbolTable::new();
    let mut units = Vec::new();
    for (path, source) in sources {
        let result = cnx_parser::parse(source, path, &FxHashSet::default());
        let unit = result.unit.expect("parse");
        collect_unit(&unit, source, &mut table);
        units.push(unit);
    }
    let mut map = ModificationMap::new();
    for unit in &units {
        scan_unit(unit, &table, &mut map);
    }
    map
}

#[test]
fn direct_mutation_is_recorded() {
    let map = scan(&[(
        "a.cnx",
        "void fill(u8 data[]) { data[0] <- 1; }\n\
         void read_only(u8 data[]) { u8 first <- data[0]; }\n",
    )]);
    assert!(map.is_modified("fill", "data"));
    assert!(!map.is_modified("read_only", "data"));
}

#[test]
fn scoped_function_uses_mangled_key() {
    let map = scan(&[(
        "a.cnx",
        "scope Motor { void set(u8 state[]) { state[0] <- 1; } }",
    )]);
    assert!(map.is_modified("Motor_set", "state"));
}

#[test]
fn pass_through_mutation_propagates() {
    let map = scan(&[(
        "a.cnx",
        "void fill(u8 data[]) { data[0] <- 1; }\n\
         void wrapper(u8 buf[]) { fill(buf); }\n",
    )]);
    assert!(map.is_modified("wrapper", "buf"));
}

#[test]
fn passing_to_a_read_only_callee_is_clean() {
    let map = scan(&[(
        "a.cnx",
        "void peek(u8 data[]) { u8 x <- data[0]; }\n\
         void wrapper(u8 buf[]) { peek(buf); }\n",
    )]);
    assert!(!map.is_modified("wrapper", "buf"));
}
