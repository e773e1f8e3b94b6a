//! Chunk splitting.
//!
//! Production placement, per code module (assets are never chunk members):
//!
//! 1. the first declared named group whose pattern and scope match claims it;
//! 2. statically reachable from an entry and reachable at all from no other entry:
//!    that entry's `initial` chunk;
//! 3. statically reachable from an entry and reachable from several: a `shared` chunk
//!    named by joining those entry names with `~`;
//! 4. otherwise it sits behind dynamic imports: the `async` chunk of the one
//!    dynamic-import boundary that reaches it, or a `shared` chunk when several do.
//!
//! Async and default shared chunks below `min_size` are then folded into another
//! async or default shared chunk holding one of their direct requesters, never
//! crossing from async into initial. Entry chunks never absorb anything: they boot
//! their entry, and no other entry may load one. Named-group and entry chunks are
//! always emitted.
//!
//! Development skips all of this: one self-contained chunk per entry.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use sheaf_config::{BuildProfile, ChunkGroupRule, ChunkScope, SplitSettings};
use sheaf_graph::{ModuleGraph, ModuleId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Loaded up front by an entry.
    Initial,
    /// Loaded on demand behind a dynamic import.
    Async,
    /// Split out because several entries, boundaries or a named group share it.
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    pub kind: ChunkKind,
    /// Entry booted by this chunk.
    pub entry: Option<String>,
    /// Named group that produced this chunk.
    pub group: Option<String>,
    /// Members, sorted by id.
    pub modules: Vec<ModuleId>,
    /// Sum of member source sizes.
    pub size: u64,
}

impl Chunk {
    pub fn is_entry(&self) -> bool {
        self.entry.is_some()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.binary_search(id).is_ok()
    }
}

/// Chunks of one build, in emission order.
#[derive(Debug, Clone, Default)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
    owners: FxHashMap<ModuleId, usize>,
}

impl ChunkSet {
    fn new(chunks: Vec<Chunk>) -> Self {
        let mut owners = FxHashMap::default();
        for (index, chunk) in chunks.iter().enumerate() {
            for id in &chunk.modules {
                owners.entry(id.clone()).or_insert(index);
            }
        }
        Self { chunks, owners }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|chunk| chunk.name == name)
    }

    /// Index of the chunk holding `id`. In development, where a module may appear in
    /// several entry chunks, this is the first of them.
    pub fn owner(&self, id: &ModuleId) -> Option<usize> {
        self.owners.get(id).copied()
    }

    pub fn chunk_of(&self, id: &ModuleId) -> Option<&Chunk> {
        self.owner(id).map(|index| &self.chunks[index])
    }

    /// The chunk that boots `entry`.
    pub fn entry_chunk(&self, entry: &str) -> Option<&Chunk> {
        self.chunks
            .iter()
            .find(|chunk| chunk.entry.as_deref() == Some(entry))
    }
}

/// Partition the code modules of `graph` into chunks. `assets` are left out.
pub fn split(graph: &ModuleGraph, profile: &BuildProfile, assets: &FxHashSet<ModuleId>) -> ChunkSet {
    let chunks = match profile.split() {
        Some(settings) => split_production(graph, settings, assets),
        None => split_per_entry(graph, assets),
    };
    for chunk in &chunks {
        debug!(
            chunk = %chunk.name,
            kind = ?chunk.kind,
            modules = chunk.modules.len(),
            size = chunk.size,
            "chunk"
        );
    }
    ChunkSet::new(chunks)
}

fn split_per_entry(graph: &ModuleGraph, assets: &FxHashSet<ModuleId>) -> Vec<Chunk> {
    graph
        .entries()
        .iter()
        .map(|(name, roots)| {
            let mut modules: Vec<ModuleId> = graph
                .full_closure(roots.iter())
                .into_iter()
                .filter(|id| !assets.contains(id))
                .collect();
            modules.sort();
            Chunk {
                name: name.clone(),
                kind: ChunkKind::Initial,
                entry: Some(name.clone()),
                group: None,
                size: total_size(graph, &modules),
                modules,
            }
        })
        .collect()
}

/// Where a module lands. Variant order is emission order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Slot {
    Entry(usize),
    Group(usize),
    SharedInitial(Vec<String>),
    SharedAsync(Vec<String>),
    Async(usize),
}

impl Slot {
    fn mergeable(&self) -> bool {
        matches!(
            self,
            Slot::SharedInitial(_) | Slot::SharedAsync(_) | Slot::Async(_)
        )
    }

    /// `Some(true)` for chunks loaded on demand, `None` for entry and named-group
    /// chunks, which never absorb a merge.
    fn on_demand(&self) -> Option<bool> {
        match self {
            Slot::SharedInitial(_) => Some(false),
            Slot::Async(_) | Slot::SharedAsync(_) => Some(true),
            Slot::Entry(_) | Slot::Group(_) => None,
        }
    }
}

fn split_production(
    graph: &ModuleGraph,
    settings: &SplitSettings,
    assets: &FxHashSet<ModuleId>,
) -> Vec<Chunk> {
    let is_code = |id: &ModuleId| !assets.contains(id);
    let entries: Vec<String> = graph.entries().keys().cloned().collect();

    // Entry index list per module statically reachable from some entry. An entry that
    // only reaches it through a dynamic import still counts, so the module never lands
    // in a chunk that boots a different entry.
    let eager: FxHashSet<ModuleId> = graph
        .entries()
        .values()
        .flat_map(|roots| graph.static_closure(roots.iter()))
        .filter(|id| is_code(id))
        .collect();
    let mut initial: FxHashMap<ModuleId, Vec<usize>> = FxHashMap::default();
    for (index, roots) in graph.entries().values().enumerate() {
        for id in graph.full_closure(roots.iter()) {
            if eager.contains(&id) {
                initial.entry(id).or_default().push(index);
            }
        }
    }

    // Dynamic-import boundaries, then any stragglers no entry reaches.
    let mut taken: FxHashSet<String> = entries.iter().cloned().collect();
    taken.extend(settings.groups.iter().map(|group| group.name.clone()));
    // Boundary chunk names, by boundary index.
    let mut boundaries: Vec<String> = Vec::new();
    let mut behind: FxHashMap<ModuleId, Vec<usize>> = FxHashMap::default();

    let mut roots: Vec<ModuleId> = graph
        .dynamic_targets()
        .into_iter()
        .filter(|id| is_code(id) && !initial.contains_key(id))
        .collect();
    roots.sort();
    let stragglers: Vec<ModuleId> = graph
        .ids()
        .filter(|id| !assets.contains(*id) && !initial.contains_key(*id))
        .cloned()
        .collect();
    let candidates = roots
        .into_iter()
        .map(|root| (root, true))
        .chain(stragglers.into_iter().map(|id| (id, false)));

    for (root, dynamic) in candidates {
        if !dynamic && behind.contains_key(&root) {
            continue;
        }
        let index = boundaries.len();
        for id in graph.static_closure([&root]) {
            if is_code(&id) && !initial.contains_key(&id) {
                behind.entry(id).or_default().push(index);
            }
        }
        boundaries.push(unique_name(root.file_stem(), &mut taken));
    }

    // Placement.
    let mut slots: BTreeMap<Slot, Vec<ModuleId>> = BTreeMap::new();
    for index in 0..entries.len() {
        slots.insert(Slot::Entry(index), Vec::new());
    }
    for id in graph.ids().filter(|id| !assets.contains(*id)) {
        let entry_hits = initial.get(id);
        let slot = if let Some(group) = claiming_group(&settings.groups, id, entry_hits.is_some()) {
            Slot::Group(group)
        } else if let Some(hits) = entry_hits {
            match hits.as_slice() {
                [single] => Slot::Entry(*single),
                many => Slot::SharedInitial(many.iter().map(|i| entries[*i].clone()).collect()),
            }
        } else {
            match behind.get(id).map(Vec::as_slice) {
                Some([single]) => Slot::Async(*single),
                Some(many) if !many.is_empty() => Slot::SharedAsync(
                    many.iter().map(|i| boundaries[*i].clone()).collect(),
                ),
                _ => continue,
            }
        };
        slots.entry(slot).or_default().push(id.clone());
    }

    merge_small_chunks(graph, &mut slots, settings.min_size);

    let mut chunks: Vec<Chunk> = Vec::with_capacity(slots.len());
    let mut names: FxHashSet<String> = FxHashSet::default();
    for (slot, mut modules) in slots {
        modules.sort();
        let (name, kind, entry, group) = match &slot {
            Slot::Entry(index) => (
                entries[*index].clone(),
                ChunkKind::Initial,
                Some(entries[*index].clone()),
                None,
            ),
            Slot::Group(index) => {
                let name = settings.groups[*index].name.clone();
                (name.clone(), ChunkKind::Shared, None, Some(name))
            }
            Slot::SharedInitial(owners) | Slot::SharedAsync(owners) => {
                (owners.join("~"), ChunkKind::Shared, None, None)
            }
            Slot::Async(index) => (boundaries[*index].clone(), ChunkKind::Async, None, None),
        };
        chunks.push(Chunk {
            name: unique_name(&name, &mut names),
            kind,
            entry,
            group,
            size: total_size(graph, &modules),
            modules,
        });
    }
    chunks
}

/// First declared group matching `id` whose scope admits it.
fn claiming_group(groups: &[ChunkGroupRule], id: &ModuleId, initial: bool) -> Option<usize> {
    groups.iter().position(|group| {
        let in_scope = match group.chunks {
            ChunkScope::All => true,
            ChunkScope::Initial => initial,
            ChunkScope::Async => !initial,
        };
        in_scope && group.test.is_match(id.as_str())
    })
}

/// Fold under-sized mergeable chunks into the chunk of a direct requester, smallest
/// first, until nothing moves.
fn merge_small_chunks(graph: &ModuleGraph, slots: &mut BTreeMap<Slot, Vec<ModuleId>>, min_size: u64) {
    if min_size == 0 {
        return;
    }

    let mut owners: FxHashMap<ModuleId, Slot> = slots
        .iter()
        .flat_map(|(slot, modules)| modules.iter().map(move |id| (id.clone(), slot.clone())))
        .collect();

    loop {
        let mut candidates: Vec<(u64, Slot)> = slots
            .iter()
            .filter(|(slot, _)| slot.mergeable())
            .map(|(slot, modules)| (total_size(graph, modules), slot.clone()))
            .filter(|(size, _)| *size < min_size)
            .collect();
        candidates.sort();

        let target = candidates.into_iter().find_map(|(_, source)| {
            nearest_sibling(graph, &slots[&source], &source, &owners).map(|target| (source, target))
        });
        let Some((source, target)) = target else {
            break;
        };

        let moved = slots.remove(&source).unwrap_or_default();
        debug!(from = ?source, into = ?target, modules = moved.len(), "merged small chunk");
        for id in &moved {
            owners.insert(id.clone(), target.clone());
        }
        slots.entry(target).or_default().extend(moved);
    }
}

fn nearest_sibling(
    graph: &ModuleGraph,
    modules: &[ModuleId],
    source: &Slot,
    owners: &FxHashMap<ModuleId, Slot>,
) -> Option<Slot> {
    let class = source.on_demand();
    modules
        .iter()
        .flat_map(|id| graph.dependents(id))
        .filter_map(|dependent| owners.get(&dependent.importer))
        .find(|slot| *slot != source && slot.on_demand().is_some() && slot.on_demand() == class)
        .cloned()
}

fn unique_name(base: &str, taken: &mut FxHashSet<String>) -> String {
    let base = if base.is_empty() { "chunk" } else { base };
    let mut name = base.to_string();
    let mut counter = 2;
    while !taken.insert(name.clone()) {
        name = format!("{base}-{counter}");
        counter += 1;
    }
    name
}

fn total_size(graph: &ModuleGraph, modules: &[ModuleId]) -> u64 {
    modules
        .iter()
        .filter_map(|id| graph.module(id))
        .map(|module| module.size())
        .sum()
}

/// Chunk names an entry needs at runtime: `(chunk index, loaded up front)`.
///
/// Up-front chunks come first with the entry's own chunk last, so it runs once every
/// shared dependency is defined. On-demand chunks follow in emission order.
pub fn chunks_for_entry(graph: &ModuleGraph, chunks: &ChunkSet, entry: &str) -> Vec<(usize, bool)> {
    let Some(roots) = graph.entries().get(entry) else {
        return Vec::new();
    };
    let eager: FxHashSet<usize> = graph
        .static_closure(roots.iter())
        .iter()
        .filter_map(|id| chunks.owner(id))
        .collect();
    let all: FxHashSet<usize> = graph
        .full_closure(roots.iter())
        .iter()
        .filter_map(|id| chunks.owner(id))
        .collect();
    let own = chunks
        .chunks()
        .iter()
        .position(|chunk| chunk.entry.as_deref() == Some(entry));

    let mut ordered: IndexMap<usize, bool> = IndexMap::new();
    for index in 0..chunks.len() {
        if Some(index) != own && eager.contains(&index) {
            ordered.insert(index, true);
        }
    }
    if let Some(own) = own {
        ordered.insert(own, true);
    }
    for index in 0..chunks.len() {
        if all.contains(&index) && !ordered.contains_key(&index) {
            ordered.insert(index, false);
        }
    }
    ordered.into_iter().collect()
}
