//! Lemma interning
//!
//! Lemmas are stored once and referred to by a compact `LemmaId`, which
//! keeps bigram keys at eight bytes regardless of lemma length.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::NonZeroU32;

pub const INTERNER_CAPACITY: usize = 5000;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct LemmaId(NonZeroU32); // 0 reserved as "invalid"

impl LemmaId {
    /// Dense position of this lemma, starting at 0
    #[inline]
    pub fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(Debug, Clone)]
pub struct LemmaInterner {
    map: FxHashMap<Box<str>, LemmaId>,
    slab: Vec<Box<str>>, // index = LemmaId-1
}

impl Default for LemmaInterner {
    fn default() -> Self {
        Self::with_capacity(INTERNER_CAPACITY)
    }
}

impl LemmaInterner {
    pub fn with_capacity(cap: usize) -> Self {
        let mut map = FxHashMap::default();
        map.reserve(cap);
        Self {
            map,
            slab: Vec::with_capacity(cap),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    #[inline]
    pub fn get_or_intern(&mut self, lemma: &str) -> LemmaId {
        if let Some(&id) = self.map.get(lemma) {
            return id;
        }
        let id = Self::id_for(self.slab.len());
        let owned: Box<str> = lemma.into();
        self.slab.push(owned.clone());
        self.map.insert(owned, id);
        id
    }

    #[inline]
    pub fn get(&self, lemma: &str) -> Option<LemmaId> {
        self.map.get(lemma).copied()
    }

    #[inline]
    pub fn resolve(&self, id: LemmaId) -> &str {
        &self.slab[id.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LemmaId, &str)> + '_ {
        self.slab
            .iter()
            .enumerate()
            .map(|(i, s)| (Self::id_for(i), &**s))
    }

    #[inline]
    fn id_for(index: usize) -> LemmaId {
        // slab length never reaches u32::MAX for a realistic vocabulary
        LemmaId(NonZeroU32::MIN.saturating_add(index as u32))
    }

    fn from_slab(slab: Vec<Box<str>>) -> Self {
        let mut map = FxHashMap::default();
        map.reserve(slab.len());
        for (i, lemma) in slab.iter().enumerate() {
            map.insert(lemma.clone(), Self::id_for(i));
        }
        Self { map, slab }
    }
}

impl PartialEq for LemmaInterner {
    fn eq(&self, other: &Self) -> bool {
        self.slab == other.slab
    }
}

impl Eq for LemmaInterner {}

// Only the slab goes to disk; the lookup map is rebuilt on load.
impl Serialize for LemmaInterner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.slab.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LemmaInterner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Box<str>>::deserialize(deserializer).map(Self::from_slab)
    }
}
