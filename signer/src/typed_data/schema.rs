//! `encodeType` and `typeHash`.

use std::collections::BTreeSet;

use super::{TypeSchema, TypedField};
use crate::crypto::hash::keccak256;

/// Strip array suffixes: `Person[]` → `Person`, `uint8[3][]` → `uint8`.
pub(crate) fn base_type(kind: &str) -> &str {
    match kind.find('[') {
        Some(idx) => &kind[..idx],
        None => kind,
    }
}

/// Every custom type reachable from `primary`, excluding `primary` itself,
/// in lexicographic order.
///
/// Walks the type graph with an explicit worklist; the visited set makes
/// self-referencing and mutually recursive schemas terminate.
pub fn referenced_types(primary: &str, schema: &TypeSchema) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    if !schema.contains_key(primary) {
        return found;
    }

    let mut worklist = vec![primary];
    found.insert(primary.to_string());

    while let Some(current) = worklist.pop() {
        let Some(fields) = schema.get(current) else {
            continue;
        };
        for field in fields {
            let dependency = base_type(&field.kind);
            if schema.contains_key(dependency) && found.insert(dependency.to_string()) {
                worklist.push(dependency);
            }
        }
    }

    found.remove(primary);
    found
}

fn encode_struct_signature(name: &str, fields: &[TypedField], out: &mut String) {
    out.push_str(name);
    out.push('(');
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&field.kind);
        out.push(' ');
        out.push_str(&field.name);
    }
    out.push(')');
}

/// `Primary(type name,...)` followed by each referenced type's signature in
/// sorted order.
///
/// A primary type missing from the schema encodes as `Primary()`.
pub fn encode_type(primary: &str, schema: &TypeSchema) -> String {
    let mut out = String::new();
    let primary_fields = schema.get(primary).map(Vec::as_slice).unwrap_or(&[]);
    encode_struct_signature(primary, primary_fields, &mut out);

    for dependency in referenced_types(primary, schema) {
        if let Some(fields) = schema.get(&dependency) {
            encode_struct_signature(&dependency, fields, &mut out);
        }
    }
    out
}

/// `keccak256(encode_type(primary))`.
pub fn hash_type(primary: &str, schema: &TypeSchema) -> [u8; 32] {
    keccak256(encode_type(primary, schema).as_bytes())
}
