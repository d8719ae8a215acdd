//! Field resolution for record types.
//!
//! A record declares its fields once through a [`RecordType`]; the first
//! encode or decode of that type resolves the declarations into a
//! [`FieldPlan`] and publishes it in a process-wide cache keyed by
//! [`TypeId`]. Plans are immutable after publication. Two threads racing on
//! the first use both build a plan; the first one inserted wins and the other
//! is dropped.
//!
//! # Resolution
//!
//! Embedded records are explored breadth first, one depth level at a time.
//! Every candidate field is sorted by name, depth, tagged-first and path;
//! within a name only the first candidate survives, and only if it is not
//! tied with the second one on both depth and tagging. Survivors are ordered
//! by path, which flattens embedded fields in place.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::{debug, trace};

/// Static description of a record type.
#[derive(Debug, Clone, Copy)]
pub struct RecordType {
    id: TypeId,
    name: &'static str,
    declare: fn() -> Vec<FieldDecl>,
}

impl RecordType {
    pub fn new<T: ?Sized + 'static>(declare: fn() -> Vec<FieldDecl>) -> Self {
        RecordType {
            id: TypeId::of::<T>(),
            name: crate::marshal::short_type_name::<T>(),
            declare,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> Vec<FieldDecl> {
        (self.declare)()
    }
}

/// One declared field of a record, in declaration order.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    name: &'static str,
    exported: bool,
    rename: Option<&'static str>,
    omit_empty: bool,
    quoted: bool,
    skip: bool,
    embedded: Option<RecordType>,
}

impl FieldDecl {
    /// A field emitted as `name` unless renamed; `exported` fields are the
    /// only ones visible outside embedded traversal.
    pub fn new(name: &'static str, exported: bool) -> Self {
        FieldDecl {
            name,
            exported,
            rename: None,
            omit_empty: false,
            quoted: false,
            skip: false,
            embedded: None,
        }
    }

    /// Explicit rename tag. An empty name means "no rename".
    pub fn rename(mut self, name: &'static str) -> Self {
        self.rename = (!name.is_empty()).then_some(name);
        self
    }

    pub fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Marks the field as an embedded record whose fields are promoted.
    pub fn embed(mut self, record: RecordType) -> Self {
        self.embedded = Some(record);
        self
    }
}

/// A resolved field of a [`FieldPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanField {
    /// Member name on the wire.
    pub name: String,
    /// Field indexes from the outer record down to the field.
    pub path: Vec<usize>,
    pub tagged: bool,
    pub omit_empty: bool,
    pub quoted: bool,
}

impl PlanField {
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Ordered, resolved fields of one record type.
#[derive(Debug)]
pub struct FieldPlan {
    record: &'static str,
    fields: Vec<PlanField>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl FieldPlan {
    pub fn build(root: RecordType) -> FieldPlan {
        let fields = resolve(root);
        let mut exact = HashMap::with_capacity(fields.len());
        let mut folded = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            exact.insert(field.name.clone(), i);
            folded.entry(field.name.to_lowercase()).or_insert(i);
        }
        FieldPlan {
            record: root.name(),
            fields,
            exact,
            folded,
        }
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn fields(&self) -> &[PlanField] {
        &self.fields
    }

    /// Field for an input member name: exact match first, then a
    /// case-insensitive one.
    pub fn lookup(&self, key: &str) -> Option<&PlanField> {
        self.exact
            .get(key)
            .or_else(|| self.folded.get(&key.to_lowercase()))
            .map(|&i| &self.fields[i])
    }
}

static PLANS: Lazy<DashMap<TypeId, Arc<FieldPlan>>> = Lazy::new(DashMap::new);

/// Cached plan for `record`, building it on first use.
pub fn plan_for(record: RecordType) -> Arc<FieldPlan> {
    if let Some(plan) = PLANS.get(&record.id()) {
        return Arc::clone(plan.value());
    }
    let plan = Arc::new(FieldPlan::build(record));
    debug!(
        record = record.name(),
        fields = plan.fields().len(),
        "built field plan"
    );
    let published = PLANS.entry(record.id()).or_insert(plan);
    Arc::clone(published.value())
}

struct Level {
    record: RecordType,
    path: Vec<usize>,
}

fn resolve(root: RecordType) -> Vec<PlanField> {
    let mut candidates: Vec<PlanField> = Vec::new();
    let mut visited: HashSet<TypeId> = HashSet::new();
    let mut next = vec![Level {
        record: root,
        path: Vec::new(),
    }];
    let mut next_count: HashMap<TypeId, usize> = HashMap::new();

    while !next.is_empty() {
        let current = std::mem::take(&mut next);
        let count = std::mem::take(&mut next_count);

        for level in current {
            if !visited.insert(level.record.id()) {
                continue;
            }
            // A type embedded more than once at this depth yields every
            // field twice so that dominance drops it as ambiguous.
            let repeated = count.get(&level.record.id()).copied().unwrap_or(0) > 1;

            for (index, decl) in level.record.fields().into_iter().enumerate() {
                if decl.skip || (decl.embedded.is_none() && !decl.exported) {
                    continue;
                }
                let rename = decl.rename.filter(|name| is_valid_tag(name));
                let mut path = level.path.clone();
                path.push(index);

                if let (Some(inner), None) = (decl.embedded, rename) {
                    let seen = next_count.entry(inner.id()).or_insert(0);
                    *seen += 1;
                    if *seen == 1 {
                        next.push(Level {
                            record: inner,
                            path,
                        });
                    }
                    continue;
                }

                let field = PlanField {
                    name: rename.unwrap_or(decl.name).to_string(),
                    path,
                    tagged: rename.is_some(),
                    omit_empty: decl.omit_empty,
                    quoted: decl.quoted,
                };
                if repeated {
                    candidates.push(field.clone());
                }
                candidates.push(field);
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.depth().cmp(&b.depth()))
            .then(b.tagged.cmp(&a.tagged))
            .then(a.path.cmp(&b.path))
    });

    let mut fields: Vec<PlanField> = Vec::with_capacity(candidates.len());
    for group in candidates.chunk_by(|a, b| a.name == b.name) {
        match dominant(group) {
            Some(field) => fields.push(field.clone()),
            None => trace!(
                record = root.name(),
                name = %group[0].name,
                "dropping ambiguous field"
            ),
        }
    }
    fields.sort_by(|a, b| a.path.cmp(&b.path));
    fields
}

/// The candidate that wins a name, if any. `group` is sorted by depth with
/// tagged fields first.
fn dominant(group: &[PlanField]) -> Option<&PlanField> {
    match group {
        [first, second, ..] if first.depth() == second.depth() && first.tagged == second.tagged => None,
        [first, ..] => Some(first),
        [] => None,
    }
}

/// Whether a rename tag only uses characters the wire format allows in
/// field names; other tags are ignored.
fn is_valid_tag(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            "!#$%&()*+-./:;<=>?@[]^_{|}~ ".contains(c) || c.is_alphanumeric()
        })
}
